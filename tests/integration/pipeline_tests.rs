/*!
 * End-to-end tests of the pipeline driver over mock backends
 */

use std::time::Duration;
use tokio_util::sync::CancellationToken;

use doctrans::providers::MockBackend;
use doctrans::translation::format::{classify, FormatRegistry};
use doctrans::translation::glossary::GlossaryTable;
use doctrans::translation::{FileStatus, SourceFile, TranslationRequest};

use crate::common::{self, HTML_DOC, MARKDOWN_DOC, PYTHON_DOC, RST_DOC, RUST_DOC};

const WORKED_EXAMPLE: &str = "Hello **AI** world.\n\n```python\nprint('hi')\n```\n";

const FIVE_PARAGRAPHS: &str = "Para one.\n\n```\na\n```\n\nPara two boom.\n\n```\nb\n```\n\nPara three.\n\n```\nc\n```\n\nPara four.\n\n```\nd\n```\n\nPara five.\n";

fn corpus() -> Vec<SourceFile> {
    vec![
        SourceFile::new("docs/guide.md", MARKDOWN_DOC),
        SourceFile::new("docs/index.rst", RST_DOC),
        SourceFile::new("src/tool.py", PYTHON_DOC),
        SourceFile::new("site/page.html", HTML_DOC),
        SourceFile::new("src/lib.rs", RUST_DOC),
    ]
}

/// Test the markdown example with a pinned term
#[tokio::test]
async fn test_run_workedExample_shouldTranslateProseAndKeepCode() {
    common::init_test_logging();
    let config = common::test_config();
    let glossary = GlossaryTable::from_pairs([("AI", "الذكاء الاصطناعي")]);
    let driver = common::test_driver(&config, MockBackend::uppercase(), glossary);

    let run = driver
        .run(vec![SourceFile::new("intro.md", WORKED_EXAMPLE)], &CancellationToken::new())
        .await;

    let artifact = run.artifact("intro.md").expect("artifact should exist");
    assert_eq!(
        artifact.content,
        "HELLO **الذكاء الاصطناعي** WORLD.\n\n```python\nprint('hi')\n```\n"
    );
    let file = run.report.file("intro.md").unwrap();
    assert_eq!(file.status, FileStatus::Translated);
    assert_eq!(file.format.as_deref(), Some("markdown"));
    assert_eq!(file.glossary_applied, 1);
    assert!(run.report.is_success());
}

/// Test that the glossary overrides what the backend returned
#[tokio::test]
async fn test_run_echoBackendWithGlossary_shouldEnforcePinnedTerms() {
    let config = common::test_config();
    let glossary = GlossaryTable::from_pairs([("Machine Learning", "X"), ("Learning", "Apprentissage")]);
    let backend = MockBackend::echo();
    let driver = common::test_driver(&config, backend.clone(), glossary);

    let run = driver
        .run(
            vec![SourceFile::new("ml.md", "Machine learning is great. Learning is fun.\n")],
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(run.artifacts[0].content, "X is great. Apprentissage is fun.\n");
    assert_eq!(run.report.files[0].glossary_applied, 2);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let sources: Vec<&str> = requests[0].glossary.terms.iter().map(|t| t.source.as_str()).collect();
    assert_eq!(sources, vec!["Machine Learning", "Learning"]);
}

/// Test that one failing chunk keeps its original text and spares the rest
#[tokio::test]
async fn test_run_oneFailingChunk_shouldProducePartialArtifact() {
    common::init_test_logging();
    let config = common::test_config();
    let driver = common::test_driver(&config, MockBackend::failing_on("boom"), GlossaryTable::new());

    let run = driver
        .run(vec![SourceFile::new("five.md", FIVE_PARAGRAPHS)], &CancellationToken::new())
        .await;

    let file = &run.report.files[0];
    assert_eq!(file.status, FileStatus::Partial);
    assert_eq!(file.chunks_failed, 1);
    assert_eq!(file.chunks_translated, 4);
    assert_eq!(file.errors.len(), 1);

    let content = &run.artifact("five.md").unwrap().content;
    assert!(content.contains("PARA ONE."));
    assert!(content.contains("Para two boom."));
    assert!(content.contains("PARA FIVE."));
    assert!(content.contains("```\na\n```"));
    assert!(!run.report.is_success());
}

/// Backend answer that loses Markdown structure
fn strip_structure(request: &TranslationRequest) -> String {
    request.text.replace("# ", "").replace("- ", "").replace("> ", "").to_uppercase()
}

/// Test that headings, bullets and quotes survive a backend that drops them
#[tokio::test]
async fn test_run_backendDroppingMarkers_shouldKeepStructure() {
    let config = common::test_config();
    let backend = MockBackend::uppercase().with_custom_response(strip_structure);
    let driver = common::test_driver(&config, backend.clone(), GlossaryTable::new());
    let source = "# Title\n\nBody text.\n- item one\n- item two\n\n> Quoted line.\n";

    let run = driver
        .run(vec![SourceFile::new("list.md", source)], &CancellationToken::new())
        .await;

    assert_eq!(run.report.files[0].status, FileStatus::Translated);
    assert_eq!(
        run.artifact("list.md").unwrap().content,
        "# TITLE\n\nBODY TEXT.\n- ITEM ONE\n- ITEM TWO\n\n> QUOTED LINE.\n"
    );
    assert!(backend.requests().iter().all(|request| !request.text.contains("# ")));
}

/// Test that translating the same input twice gives the same output
#[tokio::test]
async fn test_run_sameInputTwice_shouldBeIdempotent() {
    let config = common::test_config();
    let first = common::test_driver(&config, MockBackend::uppercase(), GlossaryTable::new())
        .run(corpus(), &CancellationToken::new())
        .await;
    let second = common::test_driver(&config, MockBackend::uppercase(), GlossaryTable::new())
        .run(corpus(), &CancellationToken::new())
        .await;

    assert_eq!(first.artifacts, second.artifacts);
}

/// Test that an identity backend reproduces every document byte for byte
#[tokio::test]
async fn test_run_echoBackend_shouldReproduceCorpus() {
    let config = common::test_config();
    let driver = common::test_driver(&config, MockBackend::echo(), GlossaryTable::new());
    let files = corpus();

    let run = driver.run(files.clone(), &CancellationToken::new()).await;

    assert_eq!(run.artifacts.len(), files.len());
    for file in &files {
        let artifact = run.artifact(&file.path).unwrap();
        assert_eq!(artifact.content, file.content, "{:?} changed", file.path);
    }
}

/// Test that protected bytes survive a backend that rewrites all prose
#[tokio::test]
async fn test_run_uppercaseBackend_shouldPreserveProtectedSpans() {
    let config = common::test_config();
    let driver = common::test_driver(&config, MockBackend::uppercase(), GlossaryTable::new());
    let registry = FormatRegistry::new(config.formats.clone());
    let files = corpus();

    let run = driver.run(files.clone(), &CancellationToken::new()).await;

    for file in &files {
        let artifact = run.artifact(&file.path).unwrap();
        assert_eq!(artifact.status, FileStatus::Translated, "{:?}", file.path);

        let profile = registry.resolve(&file.path, &file.content).unwrap();
        for span in classify(&file.content, &profile).iter().filter(|s| !s.is_translatable()) {
            let text = span.text(&file.content);
            assert!(
                artifact.content.contains(text),
                "{:?} lost protected text {:?}",
                file.path,
                text
            );
        }
    }
}

/// Test that a run cancelled up front leaves no artifacts
#[tokio::test]
async fn test_run_cancelledBeforeStart_shouldReportCancelled() {
    let config = common::test_config();
    let backend = MockBackend::uppercase();
    let driver = common::test_driver(&config, backend.clone(), GlossaryTable::new());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let run = driver.run(corpus(), &cancel).await;

    assert!(run.artifacts.is_empty());
    assert_eq!(run.report.count(FileStatus::Cancelled), corpus().len());
    assert_eq!(backend.request_count(), 0);
}

/// Test that cancelling mid-file stops dispatching chunks
#[tokio::test]
async fn test_run_cancelledMidFile_shouldStopDispatching() {
    common::init_test_logging();
    let mut config = common::test_config();
    config.engine.worker_count = 1;
    let backend = MockBackend::slow(100);
    let driver = common::test_driver(&config, backend.clone(), GlossaryTable::new());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        trigger.cancel();
    });

    let run = driver
        .run(vec![SourceFile::new("five.md", FIVE_PARAGRAPHS)], &cancel)
        .await;

    assert_eq!(run.report.files[0].status, FileStatus::Cancelled);
    assert!(run.artifact("five.md").is_none());
    assert!(backend.request_count() < 5);
}

/// Test that unsupported files are skipped while the batch continues
#[tokio::test]
async fn test_run_unsupportedFileInBatch_shouldSkipItOnly() {
    let config = common::test_config();
    let driver = common::test_driver(&config, MockBackend::uppercase(), GlossaryTable::new());

    let run = driver
        .run(
            vec![
                SourceFile::new("logo.png", "\u{1}PNG"),
                SourceFile::new("readme.md", "Read me.\n"),
            ],
            &CancellationToken::new(),
        )
        .await;

    let skipped = run.report.file("logo.png").unwrap();
    assert_eq!(skipped.status, FileStatus::Skipped);
    assert!(skipped.errors[0].contains("png"));
    assert_eq!(run.artifact("readme.md").unwrap().content, "READ ME.\n");

    let summary = run.report.summary();
    assert_eq!(summary.files, 2);
    assert_eq!(summary.translated, 1);
    assert_eq!(summary.skipped, 1);
}

/// Test that repeated chunks are served from the cache
#[tokio::test]
async fn test_run_repeatedParagraphs_shouldHitCache() {
    let config = common::test_config();
    let backend = MockBackend::uppercase();
    let driver = common::test_driver(&config, backend.clone(), GlossaryTable::new());
    let content = "Same text.\n\n```\nx\n```\n\nSame text.\n";

    let run = driver
        .run(vec![SourceFile::new("twice.md", content)], &CancellationToken::new())
        .await;

    assert_eq!(run.artifacts[0].content, "SAME TEXT.\n\n```\nx\n```\n\nSAME TEXT.\n");
    assert!(backend.request_count() >= 1);
    assert_eq!(run.report.files[0].chunks_translated, 2);
}
