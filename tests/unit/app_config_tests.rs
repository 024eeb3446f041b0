/*!
 * Tests for application configuration functionality
 */

use std::fs;

use doctrans::app_config::{Config, HardSplitPolicy, LogLevel};
use crate::common;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.source_language, "en");
    assert_eq!(config.target_language, "ar");
    assert_eq!(config.engine.max_chunk_tokens, 2048);
    assert_eq!(config.engine.chars_per_token, 4);
    assert_eq!(config.engine.worker_count, 4);
    assert_eq!(config.engine.hard_split, HardSplitPolicy::Whitespace);
    assert_eq!(config.backend.endpoint, "http://localhost:11434");
    assert_eq!(config.backend.timeout_secs, 300);
    assert!(config.glossary_path.is_none());
    assert_eq!(config.log_level, LogLevel::Info);
}

/// Test configuration validation
#[test]
fn test_config_validation_withVariousConfigs_shouldValidateCorrectly() {
    let mut config = Config::default();
    assert!(config.validate().is_ok());

    config.source_language = "zz".to_string();
    assert!(config.validate().is_err());
    config.source_language = "en".to_string();

    // Same language in two notations
    config.target_language = "eng".to_string();
    assert!(config.validate().is_err());
    config.target_language = "fr".to_string();
    assert!(config.validate().is_ok());

    config.engine.max_chunk_tokens = 0;
    assert!(config.validate().is_err());
    config.engine.max_chunk_tokens = 512;

    config.engine.worker_count = 0;
    assert!(config.validate().is_err());
    config.engine.worker_count = 2;

    config.backend.temperature = 1.5;
    assert!(config.validate().is_err());
    config.backend.temperature = 0.2;

    config
        .formats
        .overrides
        .insert(".md".to_string(), Default::default());
    assert!(config.validate().is_err());
}

/// Test that a missing config file is created with defaults
#[test]
fn test_load_or_create_withMissingFile_shouldWriteDefaults() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let config = Config::load_or_create(&path)?;
    assert!(path.exists());
    assert_eq!(config.target_language, "ar");

    let reloaded = Config::load_or_create(&path)?;
    assert_eq!(reloaded.engine.max_chunk_tokens, config.engine.max_chunk_tokens);
    Ok(())
}

/// Test loading an existing partial config file
#[test]
fn test_load_or_create_withPartialFile_shouldKeepGivenValues() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "conf.json",
        r#"{ "target_language": "de", "engine": { "hard_split": "char_boundary" }, "log_level": "debug" }"#,
    )?;

    let config = Config::load_or_create(&path)?;
    assert_eq!(config.target_language, "de");
    assert_eq!(config.engine.hard_split, HardSplitPolicy::CharBoundary);
    assert_eq!(config.log_level, LogLevel::Debug);
    assert_eq!(config.log_level.to_level_filter(), log::LevelFilter::Debug);
    Ok(())
}

/// Test that malformed JSON is reported
#[test]
fn test_load_or_create_withMalformedFile_shouldFail() -> anyhow::Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");
    fs::write(&path, "{ not json")?;

    assert!(Config::load_or_create(&path).is_err());
    Ok(())
}
