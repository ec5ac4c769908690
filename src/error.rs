#[cfg(feature = "backtrace")]
use backtrace::Backtrace;
use reqwest::StatusCode;
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    reason: ErrorReason,
    #[cfg(feature = "backtrace")]
    bt: Backtrace,
}

impl AppError {
    pub(crate) fn new(reason: ErrorReason) -> Self {
        Self {
            reason,
            #[cfg(feature = "backtrace")]
            bt: Backtrace::new(),
        }
    }

    pub fn reason(&self) -> &ErrorReason {
        &self.reason
    }
}

impl<E> From<E> for AppError
where
    E: Into<ErrorReason>,
{
    fn from(reason: E) -> Self {
        Self::new(reason.into())
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", &self.reason)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.reason.source()
    }
}

#[derive(Debug, Error)]
pub enum ErrorReason {
    #[error("failed to load the configuration")]
    Config(#[from] config::ConfigError),
    #[error("invalid certificate source URL: {0}")]
    InvalidSourceUrl(String),
    #[error("fetch timeout must be greater than zero")]
    InvalidFetchTimeout,
    #[error("refresh interval must be greater than zero")]
    InvalidRefreshInterval,
    #[error("failed to build the HTTP client")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to fetch the initial certificates")]
    Fetch(#[from] FetchError),
    #[error("metrics registry error")]
    Metrics(#[from] prometheus::Error),
}

/// Failure of a single certificate fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unexpected response status: {0}")]
    BadStatus(StatusCode),
    #[error("transport error")]
    Transport(#[source] reqwest::Error),
    #[error("response body is not a JSON object of strings")]
    Decode(#[source] serde_json::Error),
    #[error("fetch cancelled")]
    Cancelled,
}
