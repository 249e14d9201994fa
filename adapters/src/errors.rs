//! Custom error types specific to the `adapters` crate.
//!
//! This module defines errors that can occur while talking to the hosted
//! voting backend: transport failures, rejections returned by the backend,
//! and responses that do not decode into the typed models.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The request never produced a response (connection refused, reset, timeout).
    #[error("Network error: {0}")]
    Transport(String),

    /// The backend answered with an error object. The message is shown to users verbatim.
    #[error("{message}")]
    Rejected {
        message: String,
        code: Option<String>,
    },

    #[error("Unexpected response from server: {0}")]
    Decode(String),

    #[error("Backend misconfigured: {0}")]
    InvalidConfig(String),
}

impl ServiceError {
    pub fn rejected(message: impl Into<String>) -> Self {
        ServiceError::Rejected {
            message: message.into(),
            code: None,
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::Decode(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Decode(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
