//! Error types specific to admin sign-in.
//!
//! Missing input is caught before any remote call. A `false` answer from the
//! password check is its own variant so callers never open a session on it.

use adapters::ServiceError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("Please select a university and enter password.")]
    MissingInput,

    #[error("Invalid password.")]
    InvalidPassword,

    #[error(transparent)]
    Service(#[from] ServiceError),
}
