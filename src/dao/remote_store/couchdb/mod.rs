mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::CouchDaoError;
pub use store::CouchRemoteStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        match err {
            CouchDaoError::Status { status, .. } if status.is_client_error() => {
                StorageError::Rejected {
                    message: err.to_string(),
                }
            }
            err => StorageError::unavailable(err.to_string(), err),
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn client_errors_are_not_transient() {
        let rejected = StorageError::from(CouchDaoError::status(
            "stats::u1::All",
            StatusCode::UNAUTHORIZED,
        ));
        assert!(!rejected.is_transient());

        let down = StorageError::from(CouchDaoError::status(
            "trialcards",
            StatusCode::SERVICE_UNAVAILABLE,
        ));
        assert!(down.is_transient());
    }
}
