//! Error types for backend requests.

use thiserror::Error;

/// Errors that can occur while talking to the analytics backend.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The configured base URL (or a derived URL) does not parse
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl {
        /// The offending URL text
        url: String,
        /// Parser message
        message: String,
    },

    /// Connection, TLS or body transfer failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status
    #[error("Backend returned {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// A 2xx response whose payload carries an `error` field
    #[error("Backend error: {0}")]
    Backend(String),

    /// A 2xx response missing a field the client needs
    #[error("Missing field in backend response: {field}")]
    MissingField {
        /// Name of the missing field
        field: String,
    },

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a local file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Whether the backend was reached and rejected the request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Status { .. } | Self::Backend(_))
    }
}
