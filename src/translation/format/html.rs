/*!
 * HTML classification.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use super::{ProtectedKind, Span, SpanBuilder};

/// Elements that start a new block of text
static BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "dd", "details", "dialog",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "head", "header", "hr", "html", "li", "link", "main", "meta", "nav", "ol",
    "p", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr",
    "ul",
];

/// Elements whose content is never prose. `code` stays inline.
static RAW_ELEMENTS: &[&str] = &["script", "style", "pre", "textarea", "code"];

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?s)(?P<comment><!--.*?-->)",
        r"|(?P<decl><![A-Za-z][^>]*>|<\?.*?\?>)",
        r"|(?P<tag></?(?P<name>[A-Za-z][\w:-]*)(?:\s[^<>]*)?/?>)",
        r"|(?P<entity>&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);)",
    ))
    .unwrap()
});

pub(super) fn classify(content: &str) -> Vec<Span> {
    let mut builder = SpanBuilder::new();
    let mut pos = 0;

    while let Some(caps) = TOKEN_RE.captures_at(content, pos) {
        let Some(whole) = caps.get(0) else { break };
        let mut end = whole.end();

        let kind = if caps.name("decl").is_some() {
            ProtectedKind::BlockTag
        } else if caps.name("entity").is_some() {
            ProtectedKind::Entity
        } else if let Some(name) = caps.name("name") {
            let name = name.as_str().to_ascii_lowercase();
            let tag = whole.as_str();
            if !tag.starts_with("</") && !tag.ends_with("/>") && RAW_ELEMENTS.contains(&name.as_str()) {
                end = closing_tag_end(content, end, &name);
                if name == "code" {
                    ProtectedKind::InlineCode
                } else {
                    ProtectedKind::RawTextElement
                }
            } else if BLOCK_TAGS.contains(&name.as_str()) {
                ProtectedKind::BlockTag
            } else {
                ProtectedKind::InlineHtml
            }
        } else {
            ProtectedKind::InlineHtml
        };

        builder.protect(whole.start()..end, kind);
        pos = end;
    }

    builder.finish(content.len())
}

/// End of the first `</name>` after `from`, matched case-insensitively; EOF when missing
fn closing_tag_end(content: &str, from: usize, name: &str) -> usize {
    let bytes = content.as_bytes();
    let mut search = from;
    while let Some(offset) = content[search..].find("</") {
        let start = search + offset + 2;
        let candidate = &bytes[start..];
        if candidate.len() >= name.len() && candidate[..name.len()].eq_ignore_ascii_case(name.as_bytes()) {
            let after = start + name.len();
            if let Some(close) = content[after..].find('>') {
                if content[after..after + close].trim().is_empty() {
                    return after + close + 1;
                }
            }
        }
        search = start;
    }
    content.len()
}
