/*!
 * Run reporting.
 *
 * Every file of a batch ends with a `FileReport`; the `RunReport` gathers
 * them with the cache statistics once the batch is over.
 */

use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::translation::cache::CacheStats;
use crate::translation::orchestrator::TranslationResult;

/// Final state of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// Every chunk translated
    Translated,
    /// Some chunks kept their original text
    Partial,
    /// Every dispatched chunk failed, no artifact
    Failed,
    /// Whole file protected and copied as is
    PassThrough,
    /// Unsupported format or provider failure
    Skipped,
    /// Run cancelled before the file completed, no artifact
    Cancelled,
    /// Spans, segments and results disagreed, no artifact
    IntegrityError,
}

impl FileStatus {
    /// Whether the file produced an artifact
    pub fn has_artifact(&self) -> bool {
        matches!(self, Self::Translated | Self::Partial | Self::PassThrough)
    }

    /// Whether the file should be listed in the issues log
    pub fn is_issue(&self) -> bool {
        !matches!(self, Self::Translated | Self::PassThrough)
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Translated => "translated",
            Self::Partial => "partial",
            Self::Failed => "failed",
            Self::PassThrough => "pass-through",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
            Self::IntegrityError => "integrity error",
        };
        f.write_str(label)
    }
}

/// Outcome of one file
#[derive(Debug, Clone, PartialEq)]
pub struct FileReport {
    /// Relative path of the file
    pub path: PathBuf,
    pub status: FileStatus,
    /// Profile name, absent when the format was rejected
    pub format: Option<String>,
    pub chunks_total: usize,
    pub chunks_translated: usize,
    pub chunks_failed: usize,
    /// Chunks without prose that were never sent
    pub chunks_unchanged: usize,
    pub chunks_cached: usize,
    /// Chunks that could not be kept within the token budget
    pub overflow_chunks: usize,
    /// Glossary terms applied anywhere in the file
    pub glossary_applied: usize,
    /// Human readable problems, one per failed chunk or file error
    pub errors: Vec<String>,
    pub duration: Duration,
}

impl FileReport {
    /// Report for a file that ended before translation
    pub fn without_chunks(path: impl Into<PathBuf>, status: FileStatus, error: Option<String>) -> Self {
        Self {
            path: path.into(),
            status,
            format: None,
            chunks_total: 0,
            chunks_translated: 0,
            chunks_failed: 0,
            chunks_unchanged: 0,
            chunks_cached: 0,
            overflow_chunks: 0,
            glossary_applied: 0,
            errors: error.into_iter().collect(),
            duration: Duration::ZERO,
        }
    }

    /// Fold chunk results into the counters
    pub fn record_results(&mut self, results: &[TranslationResult]) {
        self.chunks_total = results.len();
        for result in results {
            if result.skipped {
                self.chunks_unchanged += 1;
            } else if result.success {
                self.chunks_translated += 1;
                if result.from_cache {
                    self.chunks_cached += 1;
                }
                self.glossary_applied += result.glossary_applied.len();
            } else {
                self.chunks_failed += 1;
                if let Some(error) = &result.error {
                    self.errors.push(format!("chunk {}: {}", result.seq, error));
                }
            }
        }
    }
}

/// Totals of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSummary {
    pub files: usize,
    pub translated: usize,
    pub partial: usize,
    pub failed: usize,
    pub pass_through: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub integrity_errors: usize,
    pub chunks_total: usize,
    pub chunks_failed: usize,
    pub overflow_chunks: usize,
}

/// Aggregate of a batch, handed to the caller after the run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Local>,
    pub duration: Duration,
    pub files: Vec<FileReport>,
    pub cache: CacheStats,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Local::now(),
            duration: Duration::ZERO,
            files: Vec::new(),
            cache: CacheStats::default(),
        }
    }

    /// Report of a file by relative path
    pub fn file(&self, path: impl Into<PathBuf>) -> Option<&FileReport> {
        let path = path.into();
        self.files.iter().find(|file| file.path == path)
    }

    pub fn file_mut(&mut self, path: impl Into<PathBuf>) -> Option<&mut FileReport> {
        let path = path.into();
        self.files.iter_mut().find(|file| file.path == path)
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|file| file.status == status).count()
    }

    /// Whether every file ended translated or passed through
    pub fn is_success(&self) -> bool {
        self.files.iter().all(|file| !file.status.is_issue())
    }

    pub fn issues(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|file| file.status.is_issue())
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            files: self.files.len(),
            ..Default::default()
        };
        for file in &self.files {
            match file.status {
                FileStatus::Translated => summary.translated += 1,
                FileStatus::Partial => summary.partial += 1,
                FileStatus::Failed => summary.failed += 1,
                FileStatus::PassThrough => summary.pass_through += 1,
                FileStatus::Skipped => summary.skipped += 1,
                FileStatus::Cancelled => summary.cancelled += 1,
                FileStatus::IntegrityError => summary.integrity_errors += 1,
            }
            summary.chunks_total += file.chunks_total;
            summary.chunks_failed += file.chunks_failed;
            summary.overflow_chunks += file.overflow_chunks;
        }
        summary
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        writeln!(
            f,
            "Run {} started {} took {:.1}s",
            self.run_id,
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.duration.as_secs_f64()
        )?;
        writeln!(
            f,
            "Files: {} ({} translated, {} partial, {} failed, {} pass-through, {} skipped, {} cancelled, {} integrity errors)",
            summary.files,
            summary.translated,
            summary.partial,
            summary.failed,
            summary.pass_through,
            summary.skipped,
            summary.cancelled,
            summary.integrity_errors
        )?;
        writeln!(
            f,
            "Chunks: {} ({} failed, {} over budget)",
            summary.chunks_total, summary.chunks_failed, summary.overflow_chunks
        )?;
        write!(
            f,
            "Cache: {} hits, {} misses ({:.1}% hit rate)",
            self.cache.hits,
            self.cache.misses,
            self.cache.hit_rate() * 100.0
        )
    }
}
