use std::{env, time::Duration};

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const ENV_BASE_URL: &str = "COUCH_BASE_URL";
const ENV_DATABASE: &str = "COUCH_DB";
const ENV_USERNAME: &str = "COUCH_USERNAME";
const ENV_PASSWORD: &str = "COUCH_PASSWORD";

/// Basic-auth credentials for the stats database.
#[derive(Debug, Clone)]
pub struct CouchCredentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

/// Where the per-user stats database lives and how to reach it.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server URL without the database path.
    pub base_url: String,
    /// Database holding the stats documents.
    pub database: String,
    /// Basic-auth credentials, if the server requires them.
    pub credentials: Option<CouchCredentials>,
    /// Per-request timeout of the HTTP client.
    pub timeout: Duration,
}

impl CouchConfig {
    /// Target `database` on the server at `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Authenticate with basic auth.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some(CouchCredentials {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read `COUCH_BASE_URL` and `COUCH_DB`, plus `COUCH_USERNAME`/`COUCH_PASSWORD` when both are
    /// set.
    pub fn from_env() -> CouchResult<Self> {
        let config = Self::new(required(ENV_BASE_URL)?, required(ENV_DATABASE)?);
        Ok(match (env::var(ENV_USERNAME), env::var(ENV_PASSWORD)) {
            (Ok(username), Ok(password)) => config.with_credentials(username, password),
            _ => config,
        })
    }
}

fn required(var: &'static str) -> CouchResult<String> {
    env::var(var).map_err(|_| CouchDaoError::MissingEnvVar { var })
}
