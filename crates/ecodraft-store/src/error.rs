// error.rs — Error types for draft persistence and sessions.

use std::path::PathBuf;

use ecodraft_schema::DraftError;
use thiserror::Error;

/// Errors that can occur while reading or writing the draft snapshot.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A file I/O operation on the backing medium failed.
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backing medium could not be reached (network, timeout).
    #[error("storage medium unavailable: {0}")]
    Unavailable(String),

    /// The stored bytes do not parse as a document at all.
    #[error("draft snapshot is corrupt: {detail}")]
    CorruptSnapshot { detail: String },

    /// Failed to serialize a draft document.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A configuration file could not be parsed.
    #[error("invalid config at {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },
}

impl StoreError {
    /// Whether the failure came from the medium itself, as opposed to the
    /// data it returned. Callers retry these; a medium failure must never be
    /// mistaken for an empty store.
    pub fn is_medium_failure(&self) -> bool {
        matches!(
            self,
            StoreError::IoError { .. } | StoreError::Unavailable(_)
        )
    }
}

/// Errors raised by a [`crate::DraftSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Draft(#[from] DraftError),

    /// The operation is not allowed in the session's current state.
    #[error("invalid session transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The stored draft is unusable and the user has not yet chosen to
    /// discard or salvage it.
    #[error("draft conflict pending: {0}")]
    ConflictPending(String),
}
