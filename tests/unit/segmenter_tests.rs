/*!
 * Tests for chunking invariants over the document corpus
 */

use std::path::Path;
use std::sync::Arc;

use doctrans::app_config::{EngineConfig, FormatsConfig, HardSplitPolicy};
use doctrans::translation::format::{classify, FormatRegistry, Span};
use doctrans::translation::segmenter::{
    chunks, CharRatioEstimator, Segmenter, TokenEstimator,
};

use crate::common::{HTML_DOC, MARKDOWN_DOC, PYTHON_DOC, RST_DOC, RUST_DOC};

const BUDGETS: [usize; 3] = [5, 20, 100];

fn corpus() -> Vec<(&'static str, &'static str)> {
    vec![
        ("guide.md", MARKDOWN_DOC),
        ("index.rst", RST_DOC),
        ("tool.py", PYTHON_DOC),
        ("page.html", HTML_DOC),
        ("lib.rs", RUST_DOC),
    ]
}

fn classified(name: &str, content: &str) -> Vec<Span> {
    let profile = FormatRegistry::new(FormatsConfig::default())
        .resolve(Path::new(name), content)
        .unwrap();
    classify(content, &profile)
}

fn inside_protected(spans: &[Span], offset: usize) -> bool {
    spans
        .iter()
        .any(|s| !s.is_translatable() && s.range.start < offset && offset < s.range.end)
}

/// Test that segments tile every document at every budget
#[test]
fn test_segment_corpusAtEveryBudget_shouldTileDocument() {
    for (name, content) in corpus() {
        let spans = classified(name, content);
        for budget in BUDGETS {
            let segmenter = Segmenter::new(budget, Arc::new(CharRatioEstimator::new(1)), HardSplitPolicy::Whitespace);
            let segments = segmenter.segment(content, &spans);

            let mut offset = 0;
            for segment in &segments {
                assert_eq!(segment.range().start, offset, "{} at budget {}", name, budget);
                offset = segment.range().end;
            }
            assert_eq!(offset, content.len(), "{} at budget {}", name, budget);
        }
    }
}

/// Test that chunking neither drops nor duplicates translatable text
#[test]
fn test_segment_corpusAtEveryBudget_shouldKeepTranslatableText() {
    for (name, content) in corpus() {
        let spans = classified(name, content);
        let from_spans: String = spans
            .iter()
            .filter(|s| s.is_translatable())
            .map(|s| s.text(content))
            .collect();

        for budget in BUDGETS {
            let segments = Segmenter::new(budget, Arc::new(CharRatioEstimator::new(1)), HardSplitPolicy::Whitespace)
                .segment(content, &spans);
            let from_chunks: String = chunks(&segments).map(|c| c.translatable_text(content)).collect();
            assert_eq!(from_chunks, from_spans, "{} at budget {}", name, budget);
        }
    }
}

/// Test the token budget and protected span boundaries
#[test]
fn test_segment_corpusAtEveryBudget_shouldRespectBudgetAndSpans() {
    let estimator = CharRatioEstimator::new(1);
    for (name, content) in corpus() {
        let spans = classified(name, content);
        for budget in BUDGETS {
            let segments = Segmenter::new(budget, Arc::new(estimator.clone()), HardSplitPolicy::Whitespace)
                .segment(content, &spans);

            for chunk in chunks(&segments) {
                if !chunk.overflow {
                    assert!(
                        estimator.estimate(chunk.original(content)) <= budget,
                        "{} chunk {:?} over budget {}",
                        name,
                        chunk.original(content),
                        budget
                    );
                }
                assert!(!inside_protected(&spans, chunk.range.start), "{} chunk starts inside a span", name);
                assert!(!inside_protected(&spans, chunk.range.end), "{} chunk ends inside a span", name);
            }
        }
    }
}

/// Test that chunk sequence numbers follow document order
#[test]
fn test_segment_sequenceNumbers_shouldBeContiguous() {
    let spans = classified("guide.md", MARKDOWN_DOC);
    let segments = Segmenter::new(5, Arc::new(CharRatioEstimator::new(1)), HardSplitPolicy::Whitespace)
        .segment(MARKDOWN_DOC, &spans);
    let seqs: Vec<usize> = chunks(&segments).map(|c| c.seq).collect();
    let expected: Vec<usize> = (0..seqs.len()).collect();
    assert!(seqs.len() > 3);
    assert_eq!(seqs, expected);
}

/// Test the default estimator taken from the engine settings
#[test]
fn test_segmenter_fromConfig_shouldUseEngineBudget() {
    let engine = EngineConfig {
        max_chunk_tokens: 3,
        chars_per_token: 4,
        ..Default::default()
    };
    let segmenter = Segmenter::from_config(&engine);
    assert_eq!(segmenter.max_tokens(), 3);

    let source = "Ten chars. Ten chars.";
    let spans = classified("a.txt", source);
    let originals: Vec<&str> = chunks(&segmenter.segment(source, &spans))
        .map(|c| c.original(source))
        .collect();
    assert_eq!(originals, vec!["Ten chars. ", "Ten chars."]);
}

/// Test a custom estimator plugged into the segmenter
#[test]
fn test_segmenter_withEstimator_shouldCountWithIt() {
    #[derive(Debug)]
    struct WordEstimator;
    impl TokenEstimator for WordEstimator {
        fn estimate(&self, text: &str) -> usize {
            text.split_whitespace().count()
        }
    }

    let source = "one two three. four five six. seven.";
    let spans = classified("a.txt", source);
    let segmenter = Segmenter::new(6, Arc::new(CharRatioEstimator::new(1)), HardSplitPolicy::Whitespace)
        .with_estimator(Arc::new(WordEstimator));
    let originals: Vec<&str> = chunks(&segmenter.segment(source, &spans))
        .map(|c| c.original(source))
        .collect();
    assert_eq!(originals, vec!["one two three. four five six. ", "seven."]);
}
