use std::error::Error;
use thiserror::Error;

/// Result alias for remote store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Failure of a remote store call, independent of the backend behind it.
///
/// Either way the caller keeps its local data and retries on the next reconciliation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or answered with a server-side failure.
    #[error("remote store unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The store answered but refused the request (bad credentials, malformed document, ...).
    #[error("remote store rejected the request: {message}")]
    Rejected { message: String },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Whether retrying later may succeed without changing the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Unavailable { .. })
    }
}
