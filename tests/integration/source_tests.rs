/*!
 * Tests for source providers feeding the pipeline driver
 */

use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use doctrans::errors::SourceError;
use doctrans::providers::MockBackend;
use doctrans::source::{LocalSourceProvider, SourceProvider};
use doctrans::translation::glossary::GlossaryTable;
use doctrans::translation::{FileStatus, SourceFile};

use crate::common;

/// In-memory provider keyed by reference, the way a hosted repository would answer
#[derive(Debug, Default)]
struct MemoryProvider {
    refs: HashMap<String, Vec<SourceFile>>,
}

#[async_trait]
impl SourceProvider for MemoryProvider {
    async fn fetch(&self, target: &str, reference: Option<&str>) -> Result<Vec<SourceFile>, SourceError> {
        let reference = reference.unwrap_or("main");
        let files = self
            .refs
            .get(reference)
            .ok_or_else(|| SourceError::AuthRequired(format!("no access to {}", reference)))?;
        let matching: Vec<SourceFile> = files
            .iter()
            .filter(|file| file.path.starts_with(target))
            .cloned()
            .collect();
        if matching.is_empty() {
            return Err(SourceError::NotFound(target.to_string()));
        }
        Ok(matching)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Test translating a local folder with a missing target next to it
#[tokio::test]
async fn test_runFromSource_missingTarget_shouldBeSkipped() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "docs/a.md", "First page.\n")?;
    common::create_test_file(temp_dir.path(), "docs/sub/b.md", "Second page.\n")?;

    let config = common::test_config();
    let driver = common::test_driver(&config, MockBackend::uppercase(), GlossaryTable::new());
    let provider = LocalSourceProvider::new(temp_dir.path());

    let run = driver
        .run_from_source(
            &provider,
            &["docs".to_string(), "missing".to_string()],
            None,
            &CancellationToken::new(),
        )
        .await;

    assert_eq!(run.artifact("docs/a.md").unwrap().content, "FIRST PAGE.\n");
    assert_eq!(run.artifact("docs/sub/b.md").unwrap().content, "SECOND PAGE.\n");
    let missing = run.report.file("missing").unwrap();
    assert_eq!(missing.status, FileStatus::Skipped);
    assert_eq!(missing.errors.len(), 1);
    Ok(())
}

/// Test that the reference is forwarded to the provider
#[tokio::test]
async fn test_runFromSource_withReference_shouldFetchThatReference() {
    let mut provider = MemoryProvider::default();
    provider.refs.insert(
        "v2".to_string(),
        vec![
            SourceFile::new("docs/new.md", "New docs.\n"),
            SourceFile::new("README.md", "Top level.\n"),
        ],
    );

    let config = common::test_config();
    let driver = common::test_driver(&config, MockBackend::uppercase(), GlossaryTable::new());
    let cancel = CancellationToken::new();

    let run = driver
        .run_from_source(&provider, &["docs".to_string()], Some("v2"), &cancel)
        .await;
    assert_eq!(run.artifacts.len(), 1);
    assert_eq!(run.artifacts[0].content, "NEW DOCS.\n");

    let denied = driver
        .run_from_source(&provider, &["docs".to_string()], Some("v1"), &cancel)
        .await;
    assert!(denied.artifacts.is_empty());
    assert_eq!(denied.report.files[0].status, FileStatus::Skipped);
    assert!(denied.report.files[0].errors[0].contains("v1"));
}

/// Test that targets are not fetched once the run is cancelled
#[tokio::test]
async fn test_fetch_cancelledRun_shouldReportTargetsCancelled() {
    let config = common::test_config();
    let driver = common::test_driver(&config, MockBackend::uppercase(), GlossaryTable::new());
    let provider = MemoryProvider::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let (files, unavailable) = driver
        .fetch(&provider, &["docs".to_string(), "api".to_string()], None, &cancel)
        .await;

    assert!(files.is_empty());
    assert_eq!(unavailable.len(), 2);
    assert!(unavailable.iter().all(|report| report.status == FileStatus::Cancelled));
}
