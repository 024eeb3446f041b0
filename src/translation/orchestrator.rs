/*!
 * Translation orchestration.
 *
 * Drives one backend call per chunk with bounded concurrency. A failing
 * chunk is recorded in its result and never aborts its siblings; results
 * come back sorted by sequence index.
 */

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::errors::BackendError;
use crate::translation::backend::{TranslationBackend, TranslationRequest};
use crate::translation::cache::{TranslationCache, truncate_text};
use crate::translation::glossary::{GlossaryHints, GlossaryTable};
use crate::translation::segmenter::{Chunk, MaskedChunk};

/// How often and how patiently a failed call is attempted again
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of calls, first one included
    pub max_attempts: u32,
    /// Wait before the second attempt, doubled for each further one
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Single attempt, no retry
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
            max_backoff: Duration::from_secs(30),
        }
    }

    /// Wait before attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u32.checked_shl(attempt - 2).unwrap_or(u32::MAX);
        self.base_backoff.saturating_mul(factor).min(self.max_backoff)
    }

    /// Whether another attempt may follow a failed attempt number `attempt`
    pub fn should_retry(&self, error: &BackendError, attempt: u32) -> bool {
        attempt < self.max_attempts && error.is_retryable()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Outcome of translating one chunk
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    /// Sequence index of the chunk
    pub seq: usize,
    /// Original chunk bytes
    pub original: String,
    /// Translated chunk with protected bytes restored, or the original on failure
    pub translated: String,
    pub success: bool,
    pub error: Option<BackendError>,
    /// Backend calls made for this chunk
    pub attempts: u32,
    /// Glossary terms whose pinned target ended up in the translation
    pub glossary_applied: Vec<String>,
    /// Served from the translation cache
    pub from_cache: bool,
    /// Nothing to translate, the chunk was never sent
    pub skipped: bool,
}

impl TranslationResult {
    fn unchanged(seq: usize, original: String) -> Self {
        Self {
            seq,
            translated: original.clone(),
            original,
            success: true,
            error: None,
            attempts: 0,
            glossary_applied: Vec::new(),
            from_cache: false,
            skipped: true,
        }
    }

    fn failed(seq: usize, original: String, error: BackendError, attempts: u32) -> Self {
        Self {
            seq,
            translated: original.clone(),
            original,
            success: false,
            error: Some(error),
            attempts,
            glossary_applied: Vec::new(),
            from_cache: false,
            skipped: false,
        }
    }
}

/// Translates the chunks of a document through a backend
#[derive(Debug, Clone)]
pub struct Orchestrator {
    backend: Arc<dyn TranslationBackend>,
    glossary: Arc<GlossaryTable>,
    cache: TranslationCache,
    retry: RetryPolicy,
    worker_count: usize,
    timeout: Option<Duration>,
    source_language: String,
    target_language: String,
}

impl Orchestrator {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        glossary: Arc<GlossaryTable>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            glossary,
            cache: TranslationCache::new(false),
            retry: RetryPolicy::none(),
            worker_count: 4,
            timeout: None,
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }

    /// Orchestrator using the engine settings of a configuration
    pub fn from_config(config: &Config, backend: Arc<dyn TranslationBackend>, glossary: Arc<GlossaryTable>) -> Self {
        let engine = &config.engine;
        Self::new(backend, glossary, &config.source_language, &config.target_language)
            .with_worker_count(engine.worker_count)
            .with_timeout(engine.chunk_timeout())
            .with_retry_policy(RetryPolicy::new(
                engine.retry_count + 1,
                Duration::from_millis(engine.retry_backoff_ms),
            ))
            .with_cache(TranslationCache::new(engine.cache_enabled))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache(mut self, cache: TranslationCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Translate every chunk of a document, results sorted by sequence index
    pub async fn translate_all(
        &self,
        source: &str,
        chunks: &[Chunk],
        cancel: &CancellationToken,
    ) -> Vec<TranslationResult> {
        self.translate_all_with_progress(source, chunks, cancel, |_| {}).await
    }

    /// Same as `translate_all`, calling `on_result` as each chunk completes
    pub async fn translate_all_with_progress<F>(
        &self,
        source: &str,
        chunks: &[Chunk],
        cancel: &CancellationToken,
        on_result: F,
    ) -> Vec<TranslationResult>
    where
        F: Fn(&TranslationResult),
    {
        let start = Instant::now();

        // Chunks are pulled from the stream only when a worker slot frees up,
        // so a cancelled token stops every chunk not yet dispatched.
        let mut results: Vec<TranslationResult> = stream::iter(chunks)
            .map(|chunk| self.translate_chunk(source, chunk, cancel))
            .buffer_unordered(self.worker_count)
            .inspect(|result| on_result(result))
            .collect()
            .await;

        results.sort_by_key(|result| result.seq);

        let failed = results.iter().filter(|r| !r.success).count();
        debug!(
            "Translated {} chunks with {} ({} failed) in {:?}",
            results.len(),
            self.backend.name(),
            failed,
            start.elapsed()
        );
        results
    }

    /// Translate a single chunk; failures end up in the result
    pub async fn translate_chunk(&self, source: &str, chunk: &Chunk, cancel: &CancellationToken) -> TranslationResult {
        let original = chunk.original(source).to_string();

        if !chunk.has_translatable_content(source) {
            debug!("Chunk {} has no prose, keeping it as is", chunk.seq);
            return TranslationResult::unchanged(chunk.seq, original);
        }
        if cancel.is_cancelled() {
            return TranslationResult::failed(chunk.seq, original, BackendError::Cancelled, 0);
        }

        let masked = chunk.mask(source);
        let hints = self.glossary.resolve(&masked.text);

        if let Some(answer) = self
            .cache
            .get(&masked.text, &self.source_language, &self.target_language, &hints)
        {
            let mut result = self.finish(chunk.seq, original, &masked, &hints, &answer, 0);
            result.from_cache = result.success;
            return result;
        }

        let request = TranslationRequest::new(masked.text.clone(), &self.source_language, &self.target_language)
            .with_glossary(hints.clone());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let outcome = self.call_backend(&request).await.and_then(|answer| {
                if answer.trim().is_empty() {
                    Err(BackendError::InvalidResponse("Empty translation".to_string()))
                } else {
                    Ok(answer)
                }
            });

            let error = match outcome {
                Ok(answer) => {
                    let result = self.finish(chunk.seq, original, &masked, &hints, &answer, attempt);
                    if result.success {
                        self.cache.store(
                            &masked.text,
                            &self.source_language,
                            &self.target_language,
                            &hints,
                            &answer,
                        );
                    }
                    return result;
                }
                Err(error) => error,
            };

            if !self.retry.should_retry(&error, attempt) {
                warn!(
                    "Chunk {} failed after {} attempt(s): {} ('{}')",
                    chunk.seq,
                    attempt,
                    error,
                    truncate_text(&masked.text, 40)
                );
                return TranslationResult::failed(chunk.seq, original, error, attempt);
            }

            let backoff = self.retry.backoff(attempt + 1);
            debug!(
                "Chunk {} attempt {}/{} failed: {}. Retrying in {:?}",
                chunk.seq, attempt, self.retry.max_attempts, error, backoff
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    return TranslationResult::failed(chunk.seq, original, error, attempt);
                }
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }

    async fn call_backend(&self, request: &TranslationRequest) -> Result<String, BackendError> {
        match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, self.backend.translate(request)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(BackendError::Timeout(timeout.as_millis() as u64)),
            },
            None => self.backend.translate(request).await,
        }
    }

    // Glossary pins first, placeholders last; tokens carry no letters a term could match
    fn finish(
        &self,
        seq: usize,
        original: String,
        masked: &MaskedChunk,
        hints: &GlossaryHints,
        answer: &str,
        attempts: u32,
    ) -> TranslationResult {
        let enforcement = self.glossary.enforce(answer, hints);
        if enforcement.replaced > 0 {
            debug!("Chunk {}: forced {} glossary replacement(s)", seq, enforcement.replaced);
        }

        match masked.restore(&enforcement.text) {
            Ok(translated) => TranslationResult {
                seq,
                original,
                translated,
                success: true,
                error: None,
                attempts,
                glossary_applied: enforcement.applied,
                from_cache: false,
                skipped: false,
            },
            Err(error) => {
                warn!("Chunk {} rejected: {}", seq, error);
                TranslationResult::failed(seq, original, error, attempts)
            }
        }
    }
}
