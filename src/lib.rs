/*!
 * # doctrans - structure-preserving documentation translation
 *
 * A Rust library for translating documentation trees with LLM backends
 * while code, links and markup survive byte for byte.
 *
 * ## Features
 *
 * - Format profiles for Markdown/MDX, reStructuredText, HTML, source code
 *   comments and plain text
 * - Token-bounded chunking that never splits protected spans
 * - Placeholder masking of inline code, links and tags
 * - Glossary pinning with post-hoc enforcement
 * - Bounded-concurrent translation with retries, timeouts and cancellation
 * - Lossless reassembly with integrity checks
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `translation`: the translation engine:
 *   - `translation::format`: Format classification into spans
 *   - `translation::segmenter`: Chunking under a token budget
 *   - `translation::glossary`: Glossary resolution and enforcement
 *   - `translation::orchestrator`: Per-chunk backend calls
 *   - `translation::reassembler`: Document reconstruction
 *   - `translation::pipeline`: Per-file and per-batch driver
 * - `source`: Source providers delivering the files
 * - `providers`: Translation backends (Ollama, mock)
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `language_utils`: ISO language code utilities
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod language_utils;
pub mod providers;
pub mod source;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, BackendError, FileError, FormatError, ReassemblyError, SourceError};
pub use language_utils::{display_name, get_language_name, language_codes_match, normalize_to_part2t};
pub use source::{LocalSourceProvider, SourceProvider};
pub use translation::{PipelineDriver, PipelineRun, RunReport, TranslationBackend};
