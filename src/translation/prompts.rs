/*!
 * Prompt construction for documentation translation.
 *
 * The system prompt is rendered from the configured template; the user
 * prompt carries the placeholder rules, the glossary terms of the chunk and
 * the masked text itself.
 */

use crate::language_utils::display_name;
use crate::translation::backend::TranslationRequest;
use crate::translation::glossary::GlossaryHints;

/// System prompt template with `{source_language}` and `{target_language}` placeholders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// The default system prompt for documentation translation.
    pub const DOC_TRANSLATOR: &'static str = r#"You are a professional translator of technical documentation from {source_language} to {target_language}.

## Rules
- Keep all links, code, images, markup and special tags unchanged
- Only translate the actual prose
- Tokens like ⟦0⟧ stand for protected content: copy each one exactly once, unchanged
- Keep line breaks where they are
- Return only the translated text, without notes or explanations"#;

    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Render the template, replacing language codes by display names
    pub fn render(&self, source_language: &str, target_language: &str) -> String {
        self.template
            .replace("{source_language}", &display_name(source_language))
            .replace("{target_language}", &display_name(target_language))
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(Self::DOC_TRANSLATOR)
    }
}

/// Builds the user prompt of one backend call
#[derive(Debug, Clone)]
pub struct TranslationPromptBuilder<'a> {
    request: &'a TranslationRequest,
}

impl<'a> TranslationPromptBuilder<'a> {
    pub fn new(request: &'a TranslationRequest) -> Self {
        Self { request }
    }

    pub fn build(&self) -> String {
        let mut prompt = String::new();

        if self.request.text.contains('⟦') {
            prompt.push_str("Keep every ⟦n⟧ token exactly as written, in a sensible position.\n");
        }

        if let Some(section) = glossary_section(&self.request.glossary) {
            prompt.push_str(&section);
        }

        prompt.push_str("\nText to translate:\n");
        prompt.push_str(&self.request.text);
        prompt.push_str("\n\nTranslated text:");
        prompt
    }
}

fn glossary_section(hints: &GlossaryHints) -> Option<String> {
    if hints.is_empty() {
        return None;
    }
    let mut section = String::from("If any of these terms appear, use the specific translations provided:\n");
    for term in &hints.terms {
        section.push_str(&format!("- {} => {}\n", term.source, term.target));
    }
    Some(section)
}
