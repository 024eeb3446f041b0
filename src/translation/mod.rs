/*!
 * Structure-preserving translation engine.
 *
 * This module contains the stages a document goes through. It is split into
 * several submodules:
 *
 * - `format`: format profiles and span classification
 * - `segmenter`: token-bounded chunking with placeholder masking
 * - `glossary`: term resolution and enforcement
 * - `orchestrator`: bounded-concurrent backend calls with retries
 * - `reassembler`: lossless reconstruction of translated documents
 * - `pipeline`: per-file and per-batch driver
 * - `cache`: in-memory translation cache
 * - `prompts`: prompt templates for LLM backends
 */

pub use self::backend::{TranslationBackend, TranslationRequest};
pub use self::document::{Document, SourceFile};
pub use self::format::{FormatProfile, FormatRegistry, Span, SpanKind, classify};
pub use self::glossary::{GlossaryHints, GlossaryTable};
pub use self::orchestrator::{Orchestrator, RetryPolicy, TranslationResult};
pub use self::pipeline::{Artifact, PipelineDriver, PipelineRun};
pub use self::reassembler::{Reassembled, reassemble};
pub use self::report::{FileReport, FileStatus, RunReport};
pub use self::segmenter::{CharRatioEstimator, Chunk, Segment, Segmenter, TokenEstimator};

pub mod backend;
pub mod cache;
pub mod document;
pub mod format;
pub mod glossary;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod reassembler;
pub mod report;
pub mod segmenter;
