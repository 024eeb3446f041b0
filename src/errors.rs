/*!
 * Error types for the doctrans application.
 *
 * Each stage of the translation engine owns its own error enum so that a
 * failure can be attributed to a chunk, a file, or the run as a whole,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by a translation backend for a single call
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The backend refused the call because of rate limiting
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The backend answered, but the answer cannot be used
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The call did not finish within the allotted time
    #[error("Timed out after {0} ms")]
    Timeout(u64),

    /// The request could not be sent or the backend reported a failure
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// The chunk was never dispatched because the run was cancelled
    #[error("Cancelled before dispatch")]
    Cancelled,
}

impl BackendError {
    /// Whether a retry policy may attempt the call again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited(_) | Self::Timeout(_) | Self::RequestFailed(_)
        )
    }
}

/// Errors raised by a source provider while fetching files
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    /// The requested path does not exist at the requested reference
    #[error("Not found: {0}")]
    NotFound(String),

    /// The source refused access
    #[error("Authentication required: {0}")]
    AuthRequired(String),

    /// The source could not be reached or read
    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Errors raised while choosing a format profile for a file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    /// No profile is registered for the file extension
    #[error("Unsupported format: {extension:?} ({path})")]
    UnsupportedFormat {
        /// Path of the rejected file
        path: PathBuf,
        /// Lowercased extension, empty when the file has none
        extension: String,
    },
}

/// Internal consistency failures detected while reassembling a document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReassemblyError {
    /// Segments do not tile the document or disagree with span boundaries
    #[error("Segment coverage mismatch at byte {offset}: {detail}")]
    Coverage {
        /// Byte offset where the mismatch was found
        offset: usize,
        /// Description of the mismatch
        detail: String,
    },

    /// Chunk results do not line up with the chunks that were produced
    #[error("Result mismatch: expected {expected} results, found {found}")]
    ResultCount {
        /// Number of chunks emitted by the segmenter
        expected: usize,
        /// Number of results handed to the reassembler
        found: usize,
    },

    /// A result carries a sequence index other than the chunk it replaces
    #[error("Result out of order: chunk {expected} received result {found}")]
    ResultOrder {
        /// Sequence index of the chunk
        expected: usize,
        /// Sequence index carried by the result
        found: usize,
    },
}

/// Errors that end the processing of a single file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FileError {
    /// The format classifier rejected the file
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The source provider could not deliver the file
    #[error("Provider failure: {0}")]
    Provider(#[from] SourceError),

    /// The reassembler detected an internal inconsistency
    #[error("Reassembly integrity error: {0}")]
    Integrity(#[from] ReassemblyError),

    /// Every chunk of the file failed
    #[error("All {0} chunks failed to translate")]
    AllChunksFailed(usize),
}

/// Errors that stop a run before any file is processed
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(String),
}
