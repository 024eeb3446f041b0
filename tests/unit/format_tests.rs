/*!
 * Tests for format resolution and span classification
 */

use std::collections::HashMap;
use std::path::Path;

use doctrans::app_config::{CodeMode, FormatOverride, FormatsConfig, UnknownFormatPolicy};
use doctrans::errors::FormatError;
use doctrans::translation::format::{
    CodeSyntax, FormatKind, FormatProfile, FormatRegistry, ProtectedKind, SpanKind, classify,
};

use crate::common::{HTML_DOC, MARKDOWN_DOC, PYTHON_DOC, RST_DOC, RUST_DOC};

fn registry() -> FormatRegistry {
    FormatRegistry::new(FormatsConfig::default())
}

fn corpus() -> Vec<(&'static str, &'static str)> {
    vec![
        ("guide.md", MARKDOWN_DOC),
        ("guide.mdx", MARKDOWN_DOC),
        ("index.rst", RST_DOC),
        ("tool.py", PYTHON_DOC),
        ("page.html", HTML_DOC),
        ("lib.rs", RUST_DOC),
        ("notes.txt", "Plain notes.\nSecond line.\n"),
    ]
}

#[test]
fn test_classify_everyProfile_shouldPartitionDocument() {
    for (name, content) in corpus() {
        let profile = registry().resolve(Path::new(name), content).unwrap();
        let spans = classify(content, &profile);

        let mut offset = 0;
        for span in &spans {
            assert_eq!(span.range.start, offset, "gap or overlap in {}", name);
            assert!(span.range.end > span.range.start, "empty span in {}", name);
            offset = span.range.end;
        }
        assert_eq!(offset, content.len(), "spans of {} stop early", name);

        let rebuilt: String = spans.iter().map(|span| span.text(content)).collect();
        assert_eq!(rebuilt, content);
    }
}

#[test]
fn test_classify_markdown_shouldProtectStructure() {
    let spans = classify(MARKDOWN_DOC, &FormatProfile::Markdown { mdx: false });
    let protected = |needle: &str| {
        spans
            .iter()
            .any(|span| !span.is_translatable() && span.text(MARKDOWN_DOC).contains(needle))
    };

    assert_eq!(spans[0].kind, SpanKind::Protected(ProtectedKind::FrontMatter));
    assert!(protected("doctrans docs/ -t fr"));
    assert!(protected("`cargo install doctrans`"));
    assert!(protected("https://example.com/faq"));
    assert!(protected("[guide]: https://example.com/guide"));
    assert!(
        spans
            .iter()
            .any(|span| span.is_translatable() && span.text(MARKDOWN_DOC).contains("Getting started"))
    );
}

#[test]
fn test_classify_emptyDocument_shouldYieldNoSpans() {
    assert!(classify("", &FormatProfile::PlainText).is_empty());
}

#[test]
fn test_resolve_unknownExtension_shouldBeUnsupported() {
    let error = registry().resolve(Path::new("image.png"), "").unwrap_err();
    assert_eq!(
        error,
        FormatError::UnsupportedFormat {
            path: "image.png".into(),
            extension: "png".into(),
        }
    );
}

#[test]
fn test_resolve_notebook_shouldBeUnsupported() {
    assert!(registry().resolve(Path::new("demo.ipynb"), "{}").is_err());
}

#[test]
fn test_profileFor_protectPolicy_shouldFallBackToOpaque() {
    let config = FormatsConfig {
        unknown_format: UnknownFormatPolicy::Protect,
        ..Default::default()
    };
    let profile = FormatRegistry::new(config).profile_for(Path::new("logo.svg"), "<svg/>").unwrap();
    assert_eq!(profile, FormatProfile::Opaque);
}

#[test]
fn test_resolve_overrides_shouldWinOverTable() {
    let mut overrides = HashMap::new();
    overrides.insert(
        "txt".to_string(),
        FormatOverride {
            format: Some(FormatKind::Markdown),
            whole_file_protected: false,
            code_mode: None,
        },
    );
    overrides.insert(
        "py".to_string(),
        FormatOverride {
            format: None,
            whole_file_protected: false,
            code_mode: Some(CodeMode::DocCommentsOnly),
        },
    );
    overrides.insert(
        "html".to_string(),
        FormatOverride {
            format: None,
            whole_file_protected: true,
            code_mode: None,
        },
    );
    let registry = FormatRegistry::new(FormatsConfig {
        overrides,
        ..Default::default()
    });

    assert_eq!(
        registry.resolve(Path::new("a.txt"), "").unwrap(),
        FormatProfile::Markdown { mdx: false }
    );
    assert_eq!(
        registry.resolve(Path::new("a.py"), "").unwrap(),
        FormatProfile::SourceCode {
            syntax: CodeSyntax::Python,
            mode: CodeMode::DocCommentsOnly,
        }
    );
    assert_eq!(registry.resolve(Path::new("a.html"), "").unwrap(), FormatProfile::Opaque);
}

#[test]
fn test_resolve_extensionlessPythonScript_shouldSniffShebang() {
    let profile = registry().resolve(Path::new("bin/tool"), PYTHON_DOC).unwrap();
    assert!(matches!(profile, FormatProfile::SourceCode { syntax: CodeSyntax::Python, .. }));
}

#[test]
fn test_classify_docCommentsOnly_shouldKeepLineCommentsProtected() {
    let profile = FormatProfile::SourceCode {
        syntax: CodeSyntax::CLike,
        mode: CodeMode::DocCommentsOnly,
    };
    let spans = classify(RUST_DOC, &profile);
    let prose: String = spans
        .iter()
        .filter(|span| span.is_translatable())
        .map(|span| span.text(RUST_DOC))
        .collect();

    assert!(prose.contains("Adds two numbers together."));
    assert!(prose.contains("Crate level docs"));
    assert!(!prose.contains("Simple addition"));
    assert!(!prose.contains("fn add"));
}

#[test]
fn test_classify_rst_shouldProtectCodeBlockBody() {
    let spans = classify(RST_DOC, &FormatProfile::ReStructuredText);
    let prose: String = spans
        .iter()
        .filter(|span| span.is_translatable())
        .map(|span| span.text(RST_DOC))
        .collect();

    assert!(prose.contains("Notes are prose"));
    assert!(prose.contains("This page explains the"));
    assert!(!prose.contains("print('hi')"));
    assert!(!prose.contains("code-block"));
    assert!(!prose.contains("https://example.com"));
}
