//! Admin authentication for the per-university results dashboard.
//!
//! This module provides sign-in against the backend's password procedure and
//! the session object that unlocks the full vote tallies.

pub mod errors;
pub mod models;
pub mod service;

// Re-exports for convenience
pub use errors::*;
pub use models::*;
pub use service::*;
