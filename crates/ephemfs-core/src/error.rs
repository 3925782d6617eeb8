//! Error types for the ephemfs lifecycle core

/// Rejections raised synchronously on the write path or by predicate operations.
/// Never retried automatically; the caller must correct the input first.
#[derive(Debug, thiserror::Error)]
pub enum ValidateError {
    /// Record id fails the character-class or length check
    #[error("Invalid record id: {0:?}")]
    InvalidId(String),
    /// Target meta file name fails path-component sanitization
    #[error("Invalid meta file name: {0:?}")]
    InvalidMetaFile(String),
    /// Path component contains traversal sequences, separators, or a bad length
    #[error("Invalid path component: {0:?}")]
    InvalidComponent(String),
}

/// Failures surfaced by a backend adapter implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backend-specific failure (network, consistency, quota, ...)
    #[error("Backend error: {0}")]
    Backend(String),
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Record failed the write-path validation gate
    #[error(transparent)]
    Validate(#[from] ValidateError),
    /// Record could not be serialized for storage
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failures from one GC sweep.
///
/// A failing expire callback never aborts the sweep; the first failure is
/// reported here once every record has been attempted, with the sweep's
/// expired count carried alongside so it is not lost.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    /// The backend could not enumerate the candidate set
    #[error("Failed to enumerate records: {0}")]
    List(#[source] StoreError),
    /// One or more expire callbacks failed after the sweep completed
    #[error("Expire callback failed for {failed} of {expired} expired records: {source}")]
    Expire {
        /// Records judged expired in the sweep.
        expired: usize,
        /// Expire callbacks that returned an error.
        failed: usize,
        /// First callback failure observed.
        #[source]
        source: StoreError,
    },
}
