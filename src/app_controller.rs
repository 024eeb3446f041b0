use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::app_config::{Config, UnknownFormatPolicy};
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::providers::OllamaBackend;
use crate::source::LocalSourceProvider;
use crate::translation::backend::TranslationBackend;
use crate::translation::glossary::GlossaryTable;
use crate::translation::pipeline::{Artifact, PipelineDriver, PipelineRun};
use crate::translation::report::{FileReport, FileStatus, RunReport};

// @module: Application controller for documentation translation

/// Name of the per-run issues log written in the output directory
pub const ISSUES_LOG_FILE: &str = "doctrans.issues.log";

/// What to translate and where to put the results
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Root the relative paths are taken from
    pub input_root: PathBuf,
    /// Files or folders below the root; empty means the whole root
    pub targets: Vec<String>,
    /// Revision to fetch, for providers that know about revisions
    pub reference: Option<String>,
    /// Directory receiving the mirrored tree
    pub output_dir: PathBuf,
    pub force_overwrite: bool,
    /// Delete inputs whose translation completed without fallback
    pub remove_translated: bool,
}

impl RunOptions {
    pub fn new(input_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            targets: Vec::new(),
            reference: None,
            output_dir: output_dir.into(),
            force_overwrite: false,
            remove_translated: false,
        }
    }
}

/// Main application controller for documentation translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Glossary shared by every file of a run
    glossary: Arc<GlossaryTable>,
}

impl Controller {
    // @method: Create a new controller, loading the configured glossary
    pub fn with_config(config: Config) -> Result<Self> {
        let glossary = match &config.glossary_path {
            Some(path) => GlossaryTable::load(path)
                .with_context(|| format!("Failed to load glossary from {:?}", path))?,
            None => GlossaryTable::new(),
        };
        if !glossary.is_empty() {
            info!("Loaded {} glossary terms", glossary.len());
        }

        Ok(Self {
            config,
            glossary: Arc::new(glossary),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run with the configured Ollama backend, cancelling on Ctrl-C
    pub async fn run(&self, options: &RunOptions) -> Result<RunReport> {
        let backend = Arc::new(OllamaBackend::new(&self.config.backend)?);
        info!(
            "Translating {} -> {} with {} ({})",
            self.config.source_language,
            self.config.target_language,
            self.config.backend.model,
            backend.base_url()
        );

        let cancel = CancellationToken::new();
        let listener = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, finishing in-flight chunks and stopping");
                    cancel.cancel();
                }
            })
        };

        let result = self.run_with_backend(backend, options, &cancel).await;
        listener.abort();
        result
    }

    /// Run the whole workflow with the given backend
    pub async fn run_with_backend(
        &self,
        backend: Arc<dyn TranslationBackend>,
        options: &RunOptions,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        if !options.input_root.is_dir() {
            return Err(AppError::File(format!("Input directory does not exist: {:?}", options.input_root)).into());
        }
        FileManager::ensure_dir(&options.output_dir)?;

        let driver = PipelineDriver::new(&self.config, backend, Arc::clone(&self.glossary));
        let mut provider = LocalSourceProvider::new(&options.input_root);
        if self.config.formats.unknown_format == UnknownFormatPolicy::Skip {
            provider = provider.with_format_filter(driver.registry().clone());
        }

        let targets = if options.targets.is_empty() {
            vec![String::new()]
        } else {
            options.targets.clone()
        };
        let (files, unavailable) = driver
            .fetch(&provider, &targets, options.reference.as_deref(), cancel)
            .await;

        let mut pending = Vec::with_capacity(files.len());
        let mut existing = Vec::new();
        for file in files {
            let output = FileManager::mirrored_output_path(&options.output_dir, &file.path)?;
            if FileManager::file_exists(&output) && !options.force_overwrite {
                warn!("Skipping {:?}, translation already exists (use -f to force overwrite)", file.path);
                existing.push(FileReport::without_chunks(
                    file.path,
                    FileStatus::Skipped,
                    Some("output exists".to_string()),
                ));
                continue;
            }
            pending.push(file);
        }

        let progress_bar = Self::progress_bar(pending.len() as u64);
        let mut run = driver
            .run_with_progress(pending, cancel, |file| {
                progress_bar.inc(1);
                progress_bar.set_message(format!("{}", file.path.display()));
            })
            .await;
        progress_bar.finish_and_clear();
        run.report.files.extend(existing);
        run.report.files.extend(unavailable);

        self.write_artifacts(&mut run, options);
        self.write_issues_log(&run.report, &options.output_dir)?;

        info!("{}", run.report);
        Ok(run.report)
    }

    fn progress_bar(length: u64) -> ProgressBar {
        let progress_bar = ProgressBar::new(length);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    /// Write every artifact; a file that cannot be written is reported failed
    fn write_artifacts(&self, run: &mut PipelineRun, options: &RunOptions) {
        let PipelineRun { report, artifacts } = run;
        for artifact in artifacts.iter() {
            if let Err(e) = Self::write_artifact(artifact, &options.output_dir) {
                let failure = AppError::File(format!("{:#}", e));
                error!("{:?}: {}", artifact.path, failure);
                if let Some(file) = report.file_mut(&artifact.path) {
                    file.status = FileStatus::Failed;
                    file.errors.push(failure.to_string());
                }
                continue;
            }

            if options.remove_translated && artifact.status == FileStatus::Translated {
                let input = options.input_root.join(&artifact.path);
                if let Err(e) = FileManager::remove_file(&input) {
                    error!("{}", e);
                }
            }
        }
    }

    fn write_artifact(artifact: &Artifact, output_dir: &Path) -> Result<()> {
        let output = FileManager::mirrored_output_path(output_dir, &artifact.path)?;
        FileManager::write_atomic(&output, &artifact.content)?;
        debug!("Wrote {:?}", output);
        Ok(())
    }

    fn write_issues_log(&self, report: &RunReport, output_dir: &Path) -> Result<()> {
        let issues: Vec<_> = report.issues().collect();
        if issues.is_empty() {
            return Ok(());
        }

        let log_path = output_dir.join(ISSUES_LOG_FILE);
        FileManager::append_to_log_file(&log_path, &format!("Run {}: {} file(s) with issues", report.run_id, issues.len()))?;
        for file in issues {
            let detail = if file.errors.is_empty() {
                String::new()
            } else {
                format!(": {}", file.errors.join("; "))
            };
            FileManager::append_to_log_file(&log_path, &format!("{} [{}]{}", file.path.display(), file.status, detail))?;
        }
        warn!("Some files had issues, see {:?}", log_path);
        Ok(())
    }
}
