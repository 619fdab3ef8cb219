//! Error types shared by the API client, the session store and the views.

use reqwest::StatusCode;
use thiserror::Error;

/// Rejected user input, caught before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error("Invalid difficulty '{0}'. Use: easy, medium, or hard")]
    Difficulty(String),
}

/// Errors emitted by `TrackerApi` implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Missing, expired or rejected bearer token. Routed to the session gate,
    /// never shown as a failure.
    #[error("not authenticated")]
    Unauthorized,
    #[error("request failed with status {status}: {message}")]
    HttpStatus { status: StatusCode, message: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Message suitable for an inline form error.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized => "Invalid email or password".to_string(),
            ApiError::HttpStatus { message, .. } => message.clone(),
            ApiError::Http(_) => "Could not reach the server".to_string(),
        }
    }
}

/// Errors emitted by the on-disk session store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionStoreError {
    #[error("session file: {0}")]
    Io(#[from] std::io::Error),
    #[error("session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}
