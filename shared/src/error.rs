//! Error types for the assistant action backend.

use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to a caller whose token could not be turned into an identity.
pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed. Please try again later.";

/// Message shown to a caller when a knowledge search turn fails at any stage.
pub const SEARCH_FAILED_MESSAGE: &str =
    "I encountered an error while processing your request. Please try again later.";

/// Errors that can occur in the assistant pipelines.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (startup only)
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Token verification or claim decryption failed
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// External API call failed
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Unexpected payload shape from an external service or the model
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Caller input was incomplete
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Short, non-technical message safe to show to the caller.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Auth(_) => AUTH_FAILED_MESSAGE,
            _ => SEARCH_FAILED_MESSAGE,
        }
    }
}

/// Failure talking to an external dependency (embedding, vector store, completion).
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{service} returned HTTP {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },

    /// The service answered 2xx but reported a failure in its envelope.
    #[error("{service} rejected the request (code {code}): {message}")]
    Rejected {
        service: &'static str,
        code: i64,
        message: String,
    },
}

impl ApiError {
    /// Classify a reqwest failure, keeping timeouts distinct.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout { service }
        } else {
            ApiError::Transport {
                service,
                message: err.to_string(),
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{service} response did not match the expected shape: {message}")]
    Envelope {
        service: &'static str,
        message: String,
    },

    #[error("model reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("model reply is missing `text`")]
    MissingText,
}
