//! Voting flow for one candidate.
//!
//! Drives the sequence from pressing "Vote" to an acknowledged vote row:
//! fetch the device's remaining tickets for the candidate's gender bucket,
//! let the user pick exactly one category, then insert exactly one vote.
//! The backend is the only judge of the quota. The remaining count shown here
//! is a snapshot, re-queried on every open and never decremented locally.

use std::sync::Arc;

use adapters::{
    Candidate, Category, CategoryId, CategoryType, Gender, NewVote, ServiceError, TicketUsage,
    VotingService,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::device::{DeviceIdentity, StorageError};
use crate::services::catalog::CandidateDetail;
use crate::utils::{category_label, LabelContext};

pub const VOTE_THANKS: &str = "Thank you for your vote!";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VoteError {
    #[error("No voting categories available for this candidate.")]
    NoCategories,

    #[error("Please choose a category first.")]
    NoSelection,

    #[error("No tickets left for this candidate.")]
    NoTicketsLeft,

    #[error("This category is not open to this candidate.")]
    UnknownCategory,

    #[error("Open the category selection before voting.")]
    NotReady,

    #[error("A vote is already being submitted.")]
    SubmissionInProgress,

    #[error("Unable to read device identity: {0}")]
    Device(#[from] StorageError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Observable state of the flow.
///
/// A failed step is reported through the returned error and `last_error`; the
/// state itself falls back to the point the user can retry from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    /// Nothing shown yet, or the selection was dismissed.
    #[default]
    Idle,

    /// Device identity and ticket balance are being fetched.
    LoadingCategories,

    /// Balance known and categories on screen. Selection and submit are gated here.
    AwaitingCategorySelection,

    /// One insert in flight. Cannot be cancelled.
    Submitting,

    /// The backend acknowledged the vote.
    Succeeded,
}

/// One selectable tile of the category choice.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryOption {
    pub id: CategoryId,
    pub category_type: CategoryType,
    pub label: String,
    pub selected: bool,
    pub enabled: bool,
}

pub struct VotingFlow {
    service: Arc<dyn VotingService>,
    identity: Arc<DeviceIdentity>,
    candidate: Candidate,
    categories: Vec<Category>,
    state: FlowState,
    tickets_left: Option<i64>,
    selected: Option<CategoryId>,
    last_error: Option<String>,
}

/// Remaining tickets for `gender`, matched case-insensitively. A missing row means none left.
fn remaining_for(usage: &[TicketUsage], gender: &Gender) -> i64 {
    usage
        .iter()
        .find(|row| &row.gender == gender)
        .map_or(0, |row| row.remaining_tickets.max(0))
}

impl VotingFlow {
    pub fn new(
        service: Arc<dyn VotingService>,
        identity: Arc<DeviceIdentity>,
        detail: CandidateDetail,
    ) -> Self {
        Self {
            service,
            identity,
            candidate: detail.candidate,
            categories: detail.categories,
            state: FlowState::default(),
            tickets_left: None,
            selected: None,
            last_error: None,
        }
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn candidate(&self) -> &Candidate {
        &self.candidate
    }

    pub fn tickets_left(&self) -> Option<i64> {
        self.tickets_left
    }

    pub fn selected_category(&self) -> Option<CategoryId> {
        self.selected
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Voting is offered only when at least one category exists.
    pub fn voting_enabled(&self) -> bool {
        !self.categories.is_empty()
    }

    fn has_tickets(&self) -> bool {
        self.tickets_left.unwrap_or(0) > 0
    }

    /// Handles the "Vote" press: loads the ticket balance and shows the categories.
    pub async fn open(&mut self) -> Result<i64, VoteError> {
        if self.state == FlowState::Submitting {
            return Err(VoteError::SubmissionInProgress);
        }
        if self.categories.is_empty() {
            return self.fail(VoteError::NoCategories);
        }

        // A refresh of an open selection keeps the known balance if it fails.
        let known = match self.state {
            FlowState::AwaitingCategorySelection => self.tickets_left,
            _ => None,
        };

        self.last_error = None;
        self.state = FlowState::LoadingCategories;

        match self.load_tickets().await {
            Ok(remaining) => {
                self.tickets_left = Some(remaining);
                self.selected = None;
                self.state = FlowState::AwaitingCategorySelection;
                info!(
                    "Ticket balance for candidate {}: {remaining}",
                    self.candidate.id
                );
                Ok(remaining)
            }
            Err(err) => {
                self.tickets_left = known;
                self.state = match known {
                    Some(_) => FlowState::AwaitingCategorySelection,
                    None => FlowState::Idle,
                };
                warn!("Unable to load ticket info: {err}");
                self.fail(err)
            }
        }
    }

    async fn load_tickets(&self) -> Result<i64, VoteError> {
        let device = self.identity.get_device_id().await?;
        let usage = self
            .service
            .get_device_ticket_usage(self.candidate.university_id, device)
            .await?;

        debug!("ticket usage rows: {}", usage.len());
        Ok(remaining_for(&usage, &self.candidate.gender))
    }

    pub fn category_options(&self) -> Vec<CategoryOption> {
        let enabled = self.has_tickets();

        self.categories
            .iter()
            .map(|category| CategoryOption {
                id: category.id,
                category_type: category.category_type.clone(),
                label: category_label(
                    &self.candidate.gender,
                    &category.category_type,
                    LabelContext::Ballot,
                ),
                selected: self.selected == Some(category.id),
                enabled,
            })
            .collect()
    }

    /// Finds a category by id, by type (`king`, `popular`, ...) or by its display label.
    pub fn find_option(&self, query: &str) -> Option<CategoryOption> {
        let query = query.trim();

        self.category_options().into_iter().find(|option| {
            option.id.to_string().eq_ignore_ascii_case(query)
                || option.category_type.as_str().eq_ignore_ascii_case(query)
                || option.label.eq_ignore_ascii_case(query)
        })
    }

    pub fn select_category(&mut self, id: CategoryId) -> Result<(), VoteError> {
        if self.state != FlowState::AwaitingCategorySelection {
            return Err(VoteError::NotReady);
        }
        if !self.has_tickets() {
            return Err(VoteError::NoTicketsLeft);
        }
        if !self.categories.iter().any(|category| category.id == id) {
            return Err(VoteError::UnknownCategory);
        }

        self.selected = Some(id);
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.state == FlowState::AwaitingCategorySelection
            && self.selected.is_some()
            && self.has_tickets()
    }

    /// Casts the vote. Exactly one insert is attempted; failures are not retried.
    pub async fn submit(&mut self) -> Result<(), VoteError> {
        match self.state {
            FlowState::AwaitingCategorySelection => {}
            FlowState::Submitting => return Err(VoteError::SubmissionInProgress),
            _ => return Err(VoteError::NotReady),
        }
        let Some(category_id) = self.selected else {
            return Err(VoteError::NoSelection);
        };
        if !self.has_tickets() {
            return Err(VoteError::NoTicketsLeft);
        }

        self.state = FlowState::Submitting;
        self.last_error = None;

        match self.cast(category_id).await {
            Ok(()) => {
                self.state = FlowState::Succeeded;
                self.selected = None;
                self.tickets_left = None;
                info!(
                    "Vote submitted for candidate {} in category {category_id}",
                    self.candidate.id
                );
                Ok(())
            }
            Err(err) => {
                self.state = FlowState::AwaitingCategorySelection;
                warn!("Unable to cast vote: {err}");
                self.fail(err)
            }
        }
    }

    async fn cast(&self, category_id: CategoryId) -> Result<(), VoteError> {
        let device_id = self.identity.get_device_id().await?;
        let vote = NewVote {
            university_id: self.candidate.university_id,
            category_id,
            candidate_id: self.candidate.id,
            device_id,
        };

        self.service.insert_vote(&vote).await?;
        Ok(())
    }

    /// Dismisses the category selection. No side effects.
    pub fn cancel(&mut self) -> Result<(), VoteError> {
        match self.state {
            FlowState::Submitting => Err(VoteError::SubmissionInProgress),
            FlowState::AwaitingCategorySelection => {
                self.state = FlowState::Idle;
                self.selected = None;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn fail<T>(&mut self, err: VoteError) -> Result<T, VoteError> {
        self.last_error = Some(err.to_string());
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapters::memory::Operation;
    use adapters::{CategoryType, InMemoryService};

    use crate::device::MemoryStore;

    struct Fixture {
        service: Arc<InMemoryService>,
        identity: Arc<DeviceIdentity>,
        detail: CandidateDetail,
    }

    impl Fixture {
        fn flow(&self) -> VotingFlow {
            VotingFlow::new(self.service.clone(), self.identity.clone(), self.detail.clone())
        }
    }

    async fn fixture(quota: Option<i64>) -> Fixture {
        let service = Arc::new(InMemoryService::new());
        let university = service.add_university("Hlaing Campus", true).await;
        let candidate = service
            .add_candidate(university.id, "Mg Mg", Gender::parse("Male"), Some(7), true)
            .await;
        let king = service
            .add_category(university.id, Gender::Male, CategoryType::King, true)
            .await;
        let style = service
            .add_category(university.id, Gender::Male, CategoryType::Style, true)
            .await;
        if let Some(quota) = quota {
            service
                .set_ticket_quota(university.id, Gender::parse("male"), quota)
                .await;
        }

        Fixture {
            service,
            identity: Arc::new(DeviceIdentity::new(Arc::new(MemoryStore::new()))),
            detail: CandidateDetail {
                candidate,
                categories: vec![king, style],
            },
        }
    }

    #[test]
    fn test_remaining_matches_gender_case_insensitively() {
        let usage = vec![TicketUsage {
            gender: Gender::parse("male"),
            remaining_tickets: 2,
        }];

        assert_eq!(remaining_for(&usage, &Gender::parse("Male")), 2);
        assert_eq!(remaining_for(&usage, &Gender::Female), 0);
        assert_eq!(remaining_for(&[], &Gender::Male), 0);
    }

    #[tokio::test]
    async fn test_open_enables_selection_when_tickets_remain() {
        let fx = fixture(Some(2)).await;
        let mut flow = fx.flow();

        assert_eq!(flow.open().await.unwrap(), 2);
        assert_eq!(flow.state(), FlowState::AwaitingCategorySelection);
        assert!(flow.category_options().iter().all(|option| option.enabled));
        assert_eq!(
            flow.category_options()
                .iter()
                .map(|option| option.label.as_str())
                .collect::<Vec<_>>(),
            vec!["King", "Style"]
        );
    }

    #[tokio::test]
    async fn test_missing_gender_row_means_zero_and_disabled_tiles() {
        let fx = fixture(None).await;
        let mut flow = fx.flow();

        assert_eq!(flow.open().await.unwrap(), 0);
        assert!(flow.category_options().iter().all(|option| !option.enabled));

        let king = fx.detail.categories[0].id;
        assert_eq!(flow.select_category(king), Err(VoteError::NoTicketsLeft));
        assert!(!flow.can_submit());
    }

    #[tokio::test]
    async fn test_no_categories_skips_ticket_endpoint() {
        let mut fx = fixture(Some(2)).await;
        fx.detail.categories.clear();
        let mut flow = fx.flow();

        assert!(!flow.voting_enabled());
        assert_eq!(flow.open().await, Err(VoteError::NoCategories));
        assert_eq!(
            flow.last_error(),
            Some("No voting categories available for this candidate.")
        );
        assert_eq!(fx.service.calls(Operation::TicketUsage).await, 0);
    }

    #[tokio::test]
    async fn test_submit_without_selection_is_local() {
        let fx = fixture(Some(2)).await;
        let mut flow = fx.flow();
        flow.open().await.unwrap();

        assert!(!flow.can_submit());
        assert_eq!(flow.submit().await, Err(VoteError::NoSelection));
        assert_eq!(fx.service.calls(Operation::InsertVote).await, 0);
        assert_eq!(flow.state(), FlowState::AwaitingCategorySelection);
    }

    #[tokio::test]
    async fn test_submit_before_open_is_rejected() {
        let fx = fixture(Some(2)).await;
        let mut flow = fx.flow();

        assert_eq!(flow.submit().await, Err(VoteError::NotReady));
        assert_eq!(
            flow.select_category(fx.detail.categories[0].id),
            Err(VoteError::NotReady)
        );
        assert_eq!(fx.service.calls(Operation::InsertVote).await, 0);
    }

    #[tokio::test]
    async fn test_successful_vote_inserts_one_row() {
        let fx = fixture(Some(2)).await;
        let mut flow = fx.flow();
        let style = fx.detail.categories[1].id;

        flow.open().await.unwrap();
        flow.select_category(style).unwrap();
        assert!(flow.can_submit());
        flow.submit().await.unwrap();

        assert_eq!(flow.state(), FlowState::Succeeded);
        assert_eq!(flow.tickets_left(), None);

        let votes = fx.service.votes().await;
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].category_id, style);
        assert_eq!(votes[0].candidate_id, fx.detail.candidate.id);
        assert_eq!(votes[0].university_id, fx.detail.candidate.university_id);
        assert_eq!(
            votes[0].device_id,
            fx.identity.get_device_id().await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_second_vote_blocked_locally_once_balance_is_zero() {
        let fx = fixture(Some(1)).await;
        let mut flow = fx.flow();
        let king = fx.detail.categories[0].id;

        flow.open().await.unwrap();
        flow.select_category(king).unwrap();
        flow.submit().await.unwrap();

        assert_eq!(flow.open().await.unwrap(), 0);
        assert_eq!(flow.select_category(king), Err(VoteError::NoTicketsLeft));
        assert_eq!(flow.submit().await, Err(VoteError::NoSelection));

        assert_eq!(fx.service.calls(Operation::InsertVote).await, 1);
        assert_eq!(fx.service.calls(Operation::TicketUsage).await, 2);
    }

    #[tokio::test]
    async fn test_server_rejection_returns_to_selection() {
        let fx = fixture(Some(2)).await;
        let mut flow = fx.flow();
        let king = fx.detail.categories[0].id;
        fx.service
            .fail_next(
                Operation::InsertVote,
                ServiceError::rejected("Vote limit reached for this device"),
            )
            .await;

        flow.open().await.unwrap();
        flow.select_category(king).unwrap();
        let result = flow.submit().await;

        assert!(matches!(result, Err(VoteError::Service(_))));
        assert_eq!(flow.state(), FlowState::AwaitingCategorySelection);
        assert_eq!(flow.last_error(), Some("Vote limit reached for this device"));
        assert_eq!(flow.selected_category(), Some(king));
        assert!(fx.service.votes().await.is_empty());

        flow.submit().await.unwrap();
        assert_eq!(fx.service.calls(Operation::InsertVote).await, 2);
    }

    #[tokio::test]
    async fn test_ticket_lookup_failure_returns_to_idle() {
        let fx = fixture(Some(2)).await;
        let mut flow = fx.flow();
        fx.service
            .fail_next(Operation::TicketUsage, ServiceError::Transport("timed out".into()))
            .await;

        assert!(flow.open().await.is_err());
        assert_eq!(flow.state(), FlowState::Idle);
        assert_eq!(flow.last_error(), Some("Network error: timed out"));

        assert_eq!(flow.open().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_known_balance() {
        let fx = fixture(Some(2)).await;
        let mut flow = fx.flow();
        let king = fx.detail.categories[0].id;

        flow.open().await.unwrap();
        flow.select_category(king).unwrap();
        fx.service
            .fail_next(Operation::TicketUsage, ServiceError::Transport("timed out".into()))
            .await;

        assert!(flow.open().await.is_err());
        assert_eq!(flow.state(), FlowState::AwaitingCategorySelection);
        assert_eq!(flow.tickets_left(), Some(2));
        assert_eq!(flow.selected_category(), Some(king));
        assert_eq!(flow.last_error(), Some("Network error: timed out"));
        assert!(flow.can_submit());
    }

    #[tokio::test]
    async fn test_find_option_by_type_id_or_label() {
        let service = Arc::new(InMemoryService::new());
        let university = service.add_university("Hlaing Campus", true).await;
        let candidate = service
            .add_candidate(university.id, "Ma Ma", Gender::Female, Some(3), true)
            .await;
        let queen = service
            .add_category(university.id, Gender::Female, CategoryType::King, true)
            .await;
        let smart = service
            .add_category(university.id, Gender::Female, CategoryType::Popular, true)
            .await;
        service
            .set_ticket_quota(university.id, Gender::Female, 2)
            .await;

        let identity = Arc::new(DeviceIdentity::new(Arc::new(MemoryStore::new())));
        let detail = CandidateDetail {
            candidate,
            categories: vec![queen.clone(), smart.clone()],
        };
        let mut flow = VotingFlow::new(service.clone(), identity, detail);
        flow.open().await.unwrap();

        let find = |query: &str| flow.find_option(query).map(|option| option.id);
        assert_eq!(find("king"), Some(queen.id));
        assert_eq!(find("Queen"), Some(queen.id));
        assert_eq!(find("popular"), Some(smart.id));
        assert_eq!(find("smart"), Some(smart.id));
        assert_eq!(find(&smart.id.to_string()), Some(smart.id));
        assert_eq!(find("style"), None);
    }

    #[tokio::test]
    async fn test_unavailable_storage_blocks_voting() {
        let fx = fixture(Some(2)).await;
        let identity = Arc::new(DeviceIdentity::new(Arc::new(MemoryStore::unavailable())));
        let mut flow = VotingFlow::new(fx.service.clone(), identity, fx.detail.clone());

        assert!(matches!(flow.open().await, Err(VoteError::Device(_))));
        assert_eq!(fx.service.calls(Operation::TicketUsage).await, 0);
    }

    #[tokio::test]
    async fn test_cancel_clears_selection_without_calls() {
        let fx = fixture(Some(2)).await;
        let mut flow = fx.flow();

        flow.open().await.unwrap();
        flow.select_category(fx.detail.categories[0].id).unwrap();
        flow.cancel().unwrap();

        assert_eq!(flow.state(), FlowState::Idle);
        assert_eq!(flow.selected_category(), None);
        assert_eq!(fx.service.calls(Operation::InsertVote).await, 0);
    }
}
