/*!
 * Common test utilities for the doctrans test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use doctrans::Config;
use doctrans::providers::MockBackend;
use doctrans::translation::glossary::GlossaryTable;
use doctrans::translation::orchestrator::RetryPolicy;
use doctrans::translation::PipelineDriver;

/// Markdown with front matter, a fence, inline code, links and a bare URL
pub const MARKDOWN_DOC: &str = r#"---
title: Getting started
---
# Getting started

Install the tool with `cargo install doctrans` first. Read the [guide](https://example.com/guide "Guide") for details.

```bash
doctrans docs/ -t fr
```

See https://example.com/faq or <https://example.com/help>.

[guide]: https://example.com/guide
"#;

/// reStructuredText with a directive, a code block and roles
pub const RST_DOC: &str = r#"Overview
========

This page explains the :func:`translate` entry point.

.. note::

   Notes are prose and get translated.

.. code-block:: python

   print('hi')

Use ``doctrans`` from the shell. Visit https://example.com for more.
"#;

pub const PYTHON_DOC: &str = r#"#!/usr/bin/env python3
import os


def greet(name):
    """Return a greeting for the given name."""
    # Build the message
    message = f"Hello, {name}!"
    return message
"#;

pub const HTML_DOC: &str = "<!DOCTYPE html>\n<html><body>\n<h1>Welcome &amp; hello</h1>\n<p>Click <a href=\"/x\">here</a> to start.</p>\n<pre>keep   this</pre>\n</body></html>\n";

pub const RUST_DOC: &str = r#"//! Crate level docs describing the tool.

/// Adds two numbers together.
fn add(a: i32, b: i32) -> i32 {
    // Simple addition here
    a + b
}
"#;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content, including parent directories
pub fn create_test_file(dir: &Path, relative: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(relative);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Route library logs through the test harness, once per process
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Default configuration without retries, so failures surface immediately
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.engine.retry_count = 0;
    config
}

/// Driver around a mock backend and an optional glossary
pub fn test_driver(config: &Config, backend: MockBackend, glossary: GlossaryTable) -> PipelineDriver {
    PipelineDriver::new(config, Arc::new(backend), Arc::new(glossary)).with_retry_policy(RetryPolicy::none())
}
