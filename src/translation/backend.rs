/*!
 * Translation backend interface.
 *
 * A backend turns one masked chunk into the target language. Provider
 * specifics (HTTP client, prompt, model) live in the implementations under
 * `crate::providers`; the engine only sees this trait.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::BackendError;
use crate::translation::glossary::GlossaryHints;

/// One backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationRequest {
    /// Chunk text with inline protected spans replaced by `⟦n⟧` tokens
    pub text: String,
    pub source_language: String,
    pub target_language: String,
    /// Glossary terms present in the chunk
    pub glossary: GlossaryHints,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
            glossary: GlossaryHints::default(),
        }
    }

    pub fn with_glossary(mut self, glossary: GlossaryHints) -> Self {
        self.glossary = glossary;
        self
    }
}

/// Common trait for all translation backends
///
/// Implementations must keep every `⟦n⟧` token of the request text; an
/// answer with lost or duplicated tokens is rejected by the orchestrator.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Translate the text of a request
    async fn translate(&self, request: &TranslationRequest) -> Result<String, BackendError>;

    /// Short name used in logs and reports
    fn name(&self) -> &str;
}
