//! Errors of the CouchDB stats backend.

use reqwest::StatusCode;
use thiserror::Error;

/// Result of CouchDB backend calls.
pub type CouchResult<T> = Result<T, CouchDaoError>;

/// What went wrong while talking to the stats database.
///
/// `target` is the document id, `_all_docs`, or the database name for database-level calls.
#[derive(Debug, Error)]
pub enum CouchDaoError {
    /// A required environment variable is not set.
    #[error("missing CouchDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    /// The base URL cannot carry a database path.
    #[error("invalid CouchDB base URL `{url}`")]
    InvalidBaseUrl { url: String },
    /// The HTTP client could not be built.
    #[error("failed to build CouchDB client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request never completed or its body could not be read.
    #[error("CouchDB request for `{target}` failed")]
    Transport {
        target: String,
        #[source]
        source: reqwest::Error,
    },
    /// CouchDB answered with an unexpected status.
    #[error("CouchDB answered {status} for `{target}`")]
    Status { target: String, status: StatusCode },
    /// A stored document does not have the expected shape.
    #[error("unexpected CouchDB document shape for `{target}`")]
    Document {
        target: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CouchDaoError {
    pub(super) fn transport(target: impl Into<String>) -> impl FnOnce(reqwest::Error) -> Self {
        let target = target.into();
        move |source| CouchDaoError::Transport { target, source }
    }

    pub(super) fn status(target: impl Into<String>, status: StatusCode) -> Self {
        CouchDaoError::Status {
            target: target.into(),
            status,
        }
    }
}
