//! Error types for the feeds crate.

use std::fmt;

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the data feeds.
///
/// Everything here is a recoverable, per-cycle failure from the engine's
/// point of view: the cycle is skipped and the next camera movement retries
/// naturally. Cancellation is deliberately *not* a variant; it is carried by
/// [`crate::FetchOutcome::Cancelled`] instead.
#[derive(Debug)]
pub enum Error {
    /// HTTP request failed (connection, TLS, timeout).
    Http {
        /// The URL that failed.
        url: String,
        /// The error message.
        message: String,
    },
    /// HTTP response had a non-success status code.
    HttpStatus {
        /// The URL that returned the error.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
    /// Response body failed to deserialize.
    Json {
        /// Context for where the error occurred.
        context: &'static str,
        /// The error message.
        message: String,
    },
    /// Invalid data in an otherwise well-formed response.
    InvalidData {
        /// Context for where the error occurred.
        context: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Http { url, message } => {
                write!(f, "http request to {url} failed: {message}")
            }
            Error::HttpStatus { url, status } => {
                write!(f, "http request to {url} returned status {status}")
            }
            Error::Json { context, message } => {
                write!(f, "failed to decode {context}: {message}")
            }
            Error::InvalidData { context, detail } => {
                write!(f, "invalid {context}: {detail}")
            }
        }
    }
}

impl std::error::Error for Error {}
