//! Core `adapters` crate for abstracting the hosted voting backend.
//!
//! This crate defines the `VotingService` trait, which outlines every read,
//! write and remote procedure the client needs, and provides the concrete
//! implementations (the Supabase HTTP backend and an in-process service).

use async_trait::async_trait;

pub mod errors;
pub mod memory;
pub mod models;
pub mod supabase;

pub use errors::{ServiceError, ServiceResult};
pub use memory::InMemoryService;
pub use models::*;
pub use supabase::{SupabaseAdapter, SupabaseConfig};

/// Operation contract of the remote data and procedure service.
///
/// Not-found is `Ok(None)`. Any error object the backend returns surfaces as
/// [`ServiceError::Rejected`] with its message untouched. Implementations do
/// not retry.
#[async_trait]
pub trait VotingService: Send + Sync {
    /// Universities ordered by name ascending.
    async fn list_universities(&self, active_only: bool) -> ServiceResult<Vec<University>>;

    async fn get_university(&self, id: UniversityId) -> ServiceResult<Option<University>>;

    /// Categories of a university. `None` for gender returns every bucket.
    async fn list_categories(
        &self,
        university: UniversityId,
        gender: Option<&Gender>,
        active_only: bool,
    ) -> ServiceResult<Vec<Category>>;

    /// Candidates ordered by waist number ascending.
    async fn list_candidates(
        &self,
        university: UniversityId,
        gender: &Gender,
        active_only: bool,
    ) -> ServiceResult<Vec<Candidate>>;

    async fn get_candidate(&self, id: CandidateId) -> ServiceResult<Option<Candidate>>;

    async fn get_candidates(&self, ids: &[CandidateId]) -> ServiceResult<Vec<CandidatePreview>>;

    /// Nearest active candidate of the same university and gender whose waist
    /// number is strictly after (`Next`) or before (`Prev`) `waist_number`.
    async fn find_neighbor(
        &self,
        university: UniversityId,
        gender: &Gender,
        waist_number: i32,
        direction: Direction,
    ) -> ServiceResult<Option<CandidateId>>;

    async fn get_device_ticket_usage(
        &self,
        university: UniversityId,
        device: DeviceId,
    ) -> ServiceResult<Vec<TicketUsage>>;

    async fn insert_vote(&self, vote: &NewVote) -> ServiceResult<()>;

    async fn admin_verify_password(
        &self,
        university: UniversityId,
        password: &str,
    ) -> ServiceResult<bool>;

    async fn get_admin_full_results(
        &self,
        university: UniversityId,
        password: &str,
    ) -> ServiceResult<Vec<AdminResultRow>>;

    /// Top row per category. An empty id set yields an empty result.
    async fn get_top_results(&self, category_ids: &[CategoryId]) -> ServiceResult<Vec<TopResult>>;
}
