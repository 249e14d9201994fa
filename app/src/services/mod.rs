//! Module for core client-side services.
//!
//! This module encapsulates the flows that sit between the user and the hosted
//! backend: browsing the catalog, casting a vote, and shaping vote tallies.

pub mod catalog;
pub mod results;
pub mod voting_flow;

pub use catalog::{CandidateDetail, CandidateLookup, Catalog, Neighbor};
pub use results::{live_results, AdminResults, LiveCategory, LiveResults, ResultGroup};
pub use voting_flow::{CategoryOption, FlowState, VoteError, VotingFlow, VOTE_THANKS};
