/*!
 * Pipeline driver.
 *
 * Runs Classifier, Segmenter, Orchestrator and Reassembler for each file of
 * a batch. A failing file is reported and never stops the others.
 */

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::errors::FileError;
use crate::source::SourceProvider;
use crate::translation::backend::TranslationBackend;
use crate::translation::document::{Document, SourceFile};
use crate::translation::format::{FormatProfile, FormatRegistry, classify};
use crate::translation::glossary::GlossaryTable;
use crate::translation::orchestrator::{Orchestrator, RetryPolicy};
use crate::translation::reassembler::reassemble;
use crate::translation::report::{FileReport, FileStatus, RunReport};
use crate::translation::segmenter::{Chunk, Segmenter, TokenEstimator, chunks};

/// Translated file content at its mirrored relative path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub content: String,
    pub status: FileStatus,
}

/// Everything a batch produced
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub report: RunReport,
    /// Artifacts in input order; files without one are only in the report
    pub artifacts: Vec<Artifact>,
}

impl PipelineRun {
    pub fn artifact(&self, path: impl AsRef<Path>) -> Option<&Artifact> {
        self.artifacts.iter().find(|artifact| artifact.path == path.as_ref())
    }
}

/// Composes the engine stages per file and across a batch
#[derive(Debug, Clone)]
pub struct PipelineDriver {
    registry: FormatRegistry,
    segmenter: Segmenter,
    orchestrator: Orchestrator,
    file_concurrency: usize,
}

impl PipelineDriver {
    pub fn new(config: &Config, backend: Arc<dyn TranslationBackend>, glossary: Arc<GlossaryTable>) -> Self {
        Self {
            registry: FormatRegistry::new(config.formats.clone()),
            segmenter: Segmenter::from_config(&config.engine),
            orchestrator: Orchestrator::from_config(config, backend, glossary),
            file_concurrency: config.engine.file_concurrency.max(1),
        }
    }

    /// Replace the character ratio token estimator
    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.segmenter = self.segmenter.with_estimator(estimator);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.orchestrator = self.orchestrator.with_retry_policy(retry);
        self
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Resolve the profile of a file
    pub fn prepare(&self, file: SourceFile) -> Result<Document, FileError> {
        let profile = self.registry.profile_for(&file.path, &file.content)?;
        Ok(Document::new(file, profile))
    }

    /// Translate a batch of files
    pub async fn run(&self, files: Vec<SourceFile>, cancel: &CancellationToken) -> PipelineRun {
        self.run_with_progress(files, cancel, |_| {}).await
    }

    /// Same as `run`, calling `on_file` as each file completes
    pub async fn run_with_progress<F>(&self, files: Vec<SourceFile>, cancel: &CancellationToken, on_file: F) -> PipelineRun
    where
        F: Fn(&FileReport),
    {
        let start = Instant::now();
        let mut report = RunReport::new();
        info!(
            "Run {}: translating {} files with {}",
            report.run_id,
            files.len(),
            self.orchestrator.backend_name()
        );

        let mut outcomes: Vec<(usize, FileReport, Option<Artifact>)> = stream::iter(files.into_iter().enumerate())
            .map(|(index, file)| async move {
                let (file_report, artifact) = self.process_file(file, cancel).await;
                (index, file_report, artifact)
            })
            .buffer_unordered(self.file_concurrency)
            .inspect(|(_, file_report, _)| on_file(file_report))
            .collect()
            .await;
        outcomes.sort_by_key(|(index, _, _)| *index);

        let mut artifacts = Vec::new();
        for (_, file_report, artifact) in outcomes {
            if file_report.status.has_artifact() {
                artifacts.extend(artifact);
            }
            report.files.push(file_report);
        }

        report.cache = self.orchestrator.cache().stats();
        report.duration = start.elapsed();
        let summary = report.summary();
        info!(
            "Run {} finished in {:.1}s: {} translated, {} partial, {} failed, {} skipped",
            report.run_id,
            report.duration.as_secs_f64(),
            summary.translated,
            summary.partial,
            summary.failed,
            summary.skipped
        );

        PipelineRun { report, artifacts }
    }

    /// Fetch targets through a source provider and translate them
    ///
    /// Targets the provider cannot deliver are reported as skipped.
    pub async fn run_from_source(
        &self,
        provider: &dyn SourceProvider,
        targets: &[String],
        reference: Option<&str>,
        cancel: &CancellationToken,
    ) -> PipelineRun {
        let (files, unavailable) = self.fetch(provider, targets, reference, cancel).await;
        let mut run = self.run(files, cancel).await;
        run.report.files.extend(unavailable);
        run
    }

    /// Fetch targets, returning the delivered files and a report per target that failed
    pub async fn fetch(
        &self,
        provider: &dyn SourceProvider,
        targets: &[String],
        reference: Option<&str>,
        cancel: &CancellationToken,
    ) -> (Vec<SourceFile>, Vec<FileReport>) {
        let mut files = Vec::new();
        let mut unavailable = Vec::new();

        for target in targets {
            if cancel.is_cancelled() {
                unavailable.push(FileReport::without_chunks(target, FileStatus::Cancelled, None));
                continue;
            }
            match provider.fetch(target, reference).await {
                Ok(fetched) => {
                    debug!("{} delivered {} files for {:?}", provider.name(), fetched.len(), target);
                    files.extend(fetched);
                }
                Err(e) => {
                    warn!("Skipping {:?}: {}", target, e);
                    unavailable.push(FileReport::without_chunks(
                        target,
                        FileStatus::Skipped,
                        Some(FileError::from(e).to_string()),
                    ));
                }
            }
        }

        (files, unavailable)
    }

    async fn process_file(&self, file: SourceFile, cancel: &CancellationToken) -> (FileReport, Option<Artifact>) {
        if cancel.is_cancelled() {
            return (FileReport::without_chunks(file.path, FileStatus::Cancelled, None), None);
        }

        let path = file.path.clone();
        match self.prepare(file) {
            Ok(document) => self.translate_document(&document, cancel).await,
            Err(e) => {
                warn!("Skipping {:?}: {}", path, e);
                (FileReport::without_chunks(path, FileStatus::Skipped, Some(e.to_string())), None)
            }
        }
    }

    /// Translate one document into its artifact
    pub async fn translate_document(
        &self,
        document: &Document,
        cancel: &CancellationToken,
    ) -> (FileReport, Option<Artifact>) {
        let start = Instant::now();
        let source = document.content();
        let profile = document.profile();
        let mut report = FileReport::without_chunks(document.path(), FileStatus::Translated, None);
        report.format = Some(profile.name().to_string());

        if profile == FormatProfile::Opaque {
            debug!("{:?} is protected as a whole", document.path());
            report.status = FileStatus::PassThrough;
            report.duration = start.elapsed();
            let artifact = self.artifact(document, source.to_string(), report.status);
            return (report, Some(artifact));
        }

        let spans = classify(source, &profile);
        let segments = self.segmenter.segment(source, &spans);
        let chunk_list: Vec<Chunk> = chunks(&segments).cloned().collect();
        report.overflow_chunks = chunk_list.iter().filter(|chunk| chunk.overflow).count();
        debug!(
            "{:?} ({}): {} spans, {} segments, {} chunks",
            document.path(),
            profile.name(),
            spans.len(),
            segments.len(),
            chunk_list.len()
        );

        let results = self.orchestrator.translate_all(source, &chunk_list, cancel).await;
        report.record_results(&results);
        report.duration = start.elapsed();

        // A cancelled run leaves unfinished files without an artifact
        if cancel.is_cancelled() && report.chunks_failed > 0 {
            info!("{:?} cancelled before completion", document.path());
            report.status = FileStatus::Cancelled;
            return (report, None);
        }

        let dispatched = results.iter().filter(|result| !result.skipped).count();
        if dispatched > 0 && report.chunks_failed == dispatched {
            let failure = FileError::AllChunksFailed(dispatched);
            error!("{:?}: {}", document.path(), failure);
            report.status = FileStatus::Failed;
            report.errors.push(failure.to_string());
            return (report, None);
        }

        match reassemble(source, &spans, &segments, &results) {
            Ok(reassembled) => {
                report.status = if reassembled.partial {
                    FileStatus::Partial
                } else {
                    FileStatus::Translated
                };
                info!(
                    "{:?}: {} ({} of {} chunks translated)",
                    document.path(),
                    report.status,
                    reassembled.translated_chunks,
                    report.chunks_total
                );
                let artifact = self.artifact(document, reassembled.text, report.status);
                (report, Some(artifact))
            }
            Err(e) => {
                let failure = FileError::from(e);
                error!("{:?}: {}", document.path(), failure);
                report.status = FileStatus::IntegrityError;
                report.errors.push(failure.to_string());
                (report, None)
            }
        }
    }

    fn artifact(&self, document: &Document, content: String, status: FileStatus) -> Artifact {
        Artifact {
            path: document.path().to_path_buf(),
            content,
            status,
        }
    }
}
