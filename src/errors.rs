//! Error types for s3upload
//!
//! Provides structured error handling using thiserror for all error cases
//! encountered during uploads: session initiation, per-part failures,
//! finalization, abort rollback, and configuration errors.

use thiserror::Error;

use crate::multipart::SessionState;

/// Error returned by the storage collaborator for a single store call.
///
/// The multipart core never inspects the cause beyond the operation name;
/// retry and escalation decisions are driven by which call failed, not by
/// backend-specific error codes.
#[derive(Error, Debug)]
#[error("{operation} failed: {message}")]
pub struct StorageError {
    /// Store operation that failed (e.g. "UploadPart")
    pub operation: &'static str,
    /// Backend-provided failure description
    pub message: String,
}

impl StorageError {
    /// Wrap a backend error under the given store operation name
    pub fn new(operation: &'static str, cause: impl std::fmt::Display) -> Self {
        Self {
            operation,
            message: cause.to_string(),
        }
    }
}

/// Main error type for upload operations
#[derive(Error, Debug)]
pub enum UploadError {
    /// The store rejected opening a multipart session (fatal, never retried)
    #[error("multipart initiation failed for {key}: {source}")]
    Initiation {
        key: String,
        #[source]
        source: StorageError,
    },

    /// A part exhausted its retry budget
    ///
    /// `abort_error` carries the secondary failure when the follow-up abort
    /// call itself failed; it never replaces the originating error.
    #[error("part {part_number} failed after {attempts} attempts: {source}")]
    PartUploadFailed {
        part_number: i32,
        attempts: u32,
        #[source]
        source: StorageError,
        abort_error: Option<StorageError>,
    },

    /// The store rejected finalization (fatal, not retried)
    #[error("multipart completion rejected: {0}")]
    Completion(#[source] StorageError),

    /// Session rollback failed
    #[error("multipart abort failed: {0}")]
    Abort(#[source] StorageError),

    /// Programmer error: the session handle was reused after reaching a
    /// terminal state, or Run re-entered mid-flight
    #[error("session is {state:?}; a fresh initiation is required")]
    InvalidState { state: SessionState },

    /// Invalid request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend operation failed outside a multipart session
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, UploadError>;
