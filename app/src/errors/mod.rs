//! Global application error types.
//!
//! This module defines the error type used across the application crate. Each
//! layer keeps its own `thiserror` enum; `AppError` wraps them so the CLI can
//! print a single user-facing message.

use adapters::ServiceError;
use thiserror::Error;

use crate::auth::AuthError;
use crate::device::StorageError;
use crate::services::VoteError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    NotFound(String),
}

impl AppError {
    /// Message shown to the user. Backend rejections come through unchanged.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
