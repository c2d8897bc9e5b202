//! HTTP client error types with retry classification

use std::time::Duration;

use brigade_domain::{BrigadeError, ErrorClass};
use reqwest::StatusCode;
use thiserror::Error;

/// Errors surfaced by [`HttpClient`](super::HttpClient) requests.
///
/// Every variant maps to exactly one [`ErrorClass`], which is the only
/// thing the sync job looks at when deciding between `Retry` and
/// `Failure`. The client itself never retries.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection-level failure: refused, reset, DNS, TLS.
    #[error("transport error: {source}")]
    Transport {
        #[source]
        source: reqwest::Error,
    },

    /// The configured deadline elapsed before a response arrived.
    #[error("request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The server answered with a non-success status.
    #[error("{message}")]
    Status {
        status: StatusCode,
        message: String,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// Client-side misconfiguration (bad base URL, builder failure).
    #[error("http configuration error: {0}")]
    Config(String),
}

impl HttpError {
    /// Retry classification.
    ///
    /// Timeouts, transport failures, 5xx responses and 429 are transient.
    /// Every other status, decode failures and configuration problems are
    /// permanent.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Transport { .. } | Self::Timeout { .. } => ErrorClass::Transient,
            Self::Status { status, .. } => {
                if status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS {
                    ErrorClass::Transient
                } else {
                    ErrorClass::Permanent
                }
            }
            Self::Decode { .. } | Self::Config(_) => ErrorClass::Permanent,
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    /// Status code of a `Status` error, if that is what this is.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<HttpError> for BrigadeError {
    fn from(err: HttpError) -> Self {
        match &err {
            HttpError::Config(message) => Self::Config(message.clone()),
            HttpError::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN =>
            {
                Self::Auth(err.to_string())
            }
            _ => Self::Network(err.to_string()),
        }
    }
}
