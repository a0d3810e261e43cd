//! Error types for the lottopro library.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the prediction backend or serving
/// requests through the offline cache worker.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP transport error (connection refused, DNS, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("HTTP error! status: {status}")]
    Status {
        /// Numeric HTTP status code.
        status: u16,
    },

    /// The backend answered `success: false`.
    #[error("{0}")]
    Api(String),

    /// The request did not complete before its deadline.
    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The owning task was torn down while the request was in flight.
    #[error("request cancelled")]
    Cancelled,

    /// The network is unreachable and no usable cached copy exists.
    #[error("offline: {0}")]
    Offline(String),

    /// Pre-caching the static resource list failed.
    #[error("install failed: {0}")]
    Install(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed.
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML serialization failed.
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns the message shown to the user when a request fails.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { status } => status_message(*status).to_string(),
            Self::Api(message) if !message.is_empty() => message.clone(),
            Self::Api(_) => "An error occurred while predicting".to_string(),
            Self::Timeout(_) => "The request timed out. Please try again.".to_string(),
            Self::Cancelled => "The request was cancelled".to_string(),
            Self::Offline(_) => "You are offline. Check your connection and try again.".to_string(),
            Self::Http(e) if e.is_timeout() => {
                "The request timed out. Please try again.".to_string()
            }
            Self::Http(e) if e.is_connect() => {
                "Could not reach the server. Check your connection.".to_string()
            }
            _ => "Request failed. Please try again later.".to_string(),
        }
    }

    /// Returns true for failures caused by the network rather than the server.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Timeout(_) | Self::Offline(_) | Self::Cancelled
        )
    }
}

/// Maps an HTTP status code to a user-facing message.
#[must_use]
pub const fn status_message(status: u16) -> &'static str {
    match status {
        400 => "Bad request. Please check the numbers you entered.",
        404 => "The prediction service was not found.",
        500 => "The server hit an internal error.",
        503 => "The prediction service is temporarily unavailable.",
        _ => "Request failed. Please try again later.",
    }
}

/// A specialized `Result` type for lottopro operations.
pub type Result<T> = std::result::Result<T, Error>;
