//! Client library for campus king and queen voting.
//!
//! Users browse universities and candidates and cast votes; admins sign in per
//! university to see the full tallies. Persistence, authentication, quota
//! enforcement and counting all live in the hosted backend, reached through
//! the `adapters::VotingService` contract injected into every service here.

pub mod auth;
pub mod config;
pub mod device;
pub mod errors;
pub mod services;
pub mod utils;

pub use errors::AppError;
