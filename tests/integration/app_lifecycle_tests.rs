/*!
 * Integration tests for application lifecycle
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use doctrans::app_config::{Config, UnknownFormatPolicy};
use doctrans::errors::AppError;
use doctrans::app_controller::{Controller, RunOptions, ISSUES_LOG_FILE};
use doctrans::providers::MockBackend;
use doctrans::translation::FileStatus;
use crate::common;

/// Test the controller with custom configuration
#[test]
fn test_controller_withCustomConfig_shouldKeepIt() -> Result<()> {
    let mut config = Config::default();
    config.source_language = "es".to_string();
    config.target_language = "de".to_string();

    let controller = Controller::with_config(config)?;
    assert_eq!(controller.config().source_language, "es");
    assert_eq!(controller.config().target_language, "de");
    Ok(())
}

/// Test a full run with a glossary file loaded by the controller
#[test]
fn test_controller_withGlossaryFile_shouldPinTermsInOutput() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    common::create_test_file(input.path(), "guide/intro.md", "Hello **AI** world.\n\n```python\nprint('hi')\n```\n")?;
    let glossary_path = common::create_test_file(input.path(), "terms.yaml", "terms:\n  AI: الذكاء الاصطناعي\n")?;

    let mut config = common::test_config();
    config.glossary_path = Some(glossary_path);
    let controller = Controller::with_config(config)?;
    let options = RunOptions::new(input.path(), output.path());

    let report = tokio_test::block_on(async {
        controller
            .run_with_backend(Arc::new(MockBackend::uppercase()), &options, &CancellationToken::new())
            .await
    })?;

    // The glossary file itself has no translatable profile and is filtered out
    assert_eq!(report.files.len(), 1);
    assert!(report.is_success());
    assert_eq!(
        fs::read_to_string(output.path().join("guide/intro.md"))?,
        "HELLO **الذكاء الاصطناعي** WORLD.\n\n```python\nprint('hi')\n```\n"
    );
    assert!(!output.path().join(ISSUES_LOG_FILE).exists());
    Ok(())
}

/// Test that unknown formats are copied through under the protect policy
#[tokio::test]
async fn test_controller_protectPolicy_shouldCopyUnknownFiles() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    common::create_test_file(input.path(), "Makefile", "all:\n\techo done\n")?;
    common::create_test_file(input.path(), "docs/readme.txt", "Plain words.\n")?;

    let mut config = common::test_config();
    config.formats.unknown_format = UnknownFormatPolicy::Protect;
    let controller = Controller::with_config(config)?;
    let options = RunOptions::new(input.path(), output.path());

    let report = controller
        .run_with_backend(Arc::new(MockBackend::uppercase()), &options, &CancellationToken::new())
        .await?;

    assert_eq!(report.file("Makefile").unwrap().status, FileStatus::PassThrough);
    assert_eq!(fs::read_to_string(output.path().join("Makefile"))?, "all:\n\techo done\n");
    assert_eq!(fs::read_to_string(output.path().join("docs/readme.txt"))?, "PLAIN WORDS.\n");
    Ok(())
}

/// Test selecting targets below the input root
#[tokio::test]
async fn test_controller_withTargets_shouldOnlyTranslateThem() -> Result<()> {
    let input = common::create_temp_dir()?;
    let output = common::create_temp_dir()?;
    common::create_test_file(input.path(), "docs/a.md", "Wanted.\n")?;
    common::create_test_file(input.path(), "blog/b.md", "Not wanted.\n")?;

    let controller = Controller::with_config(common::test_config())?;
    let mut options = RunOptions::new(input.path(), output.path());
    options.targets = vec!["docs".to_string(), "missing.md".to_string()];

    let report = controller
        .run_with_backend(Arc::new(MockBackend::uppercase()), &options, &CancellationToken::new())
        .await?;

    assert!(output.path().join("docs/a.md").exists());
    assert!(!output.path().join("blog/b.md").exists());
    assert_eq!(report.file("missing.md").unwrap().status, FileStatus::Skipped);

    let issues = fs::read_to_string(output.path().join(ISSUES_LOG_FILE))?;
    assert!(issues.contains("missing.md [skipped]"));
    Ok(())
}

/// Test that a missing input directory is rejected
#[tokio::test]
async fn test_controller_missingInputDir_shouldFail() -> Result<()> {
    let output = common::create_temp_dir()?;
    let controller = Controller::with_config(common::test_config())?;
    let options = RunOptions::new("/nonexistent/input", output.path());

    let result = controller
        .run_with_backend(Arc::new(MockBackend::uppercase()), &options, &CancellationToken::new())
        .await;
    let error = result.unwrap_err();
    assert!(matches!(error.downcast_ref::<AppError>(), Some(AppError::File(_))));
    Ok(())
}
