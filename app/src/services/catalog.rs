//! Read-only browsing of universities and candidates.
//!
//! Loads the university list, the candidate list of one gender bucket, the
//! detail of one candidate together with the categories it can be voted in,
//! and the previous/next sibling by waist number.

use std::sync::Arc;

use adapters::{
    Candidate, CandidateId, Category, Direction, Gender, ServiceResult, University, UniversityId,
    VotingService,
};
use tracing::{debug, warn};

use crate::device::DeviceIdentity;
use crate::services::voting_flow::VotingFlow;

/// A candidate with the active categories of its university and gender.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateDetail {
    pub candidate: Candidate,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CandidateLookup {
    Found(CandidateDetail),
    NotFound,
}

/// Outcome of a previous/next lookup. Neither case is an error for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Neighbor {
    Found(CandidateId),
    None { message: String },
}

#[derive(Clone)]
pub struct Catalog {
    service: Arc<dyn VotingService>,
}

impl Catalog {
    pub fn new(service: Arc<dyn VotingService>) -> Self {
        Self { service }
    }

    pub async fn universities(&self) -> ServiceResult<Vec<University>> {
        self.service.list_universities(true).await
    }

    pub async fn candidates(
        &self,
        university: UniversityId,
        gender: &Gender,
    ) -> ServiceResult<Vec<Candidate>> {
        self.service.list_candidates(university, gender, true).await
    }

    pub async fn candidate_detail(&self, id: CandidateId) -> ServiceResult<CandidateLookup> {
        let Some(candidate) = self.service.get_candidate(id).await? else {
            debug!("candidate {id} not found");
            return Ok(CandidateLookup::NotFound);
        };

        let categories = self
            .service
            .list_categories(candidate.university_id, Some(&candidate.gender), true)
            .await?;

        Ok(CandidateLookup::Found(CandidateDetail {
            candidate,
            categories,
        }))
    }

    pub async fn neighbor(&self, candidate: &Candidate, direction: Direction) -> Neighbor {
        let edge = match direction {
            Direction::Next => "You are at the last candidate.",
            Direction::Prev => "You are at the first candidate.",
        };

        let Some(waist_number) = candidate.waist_number else {
            return Neighbor::None {
                message: edge.to_string(),
            };
        };

        match self
            .service
            .find_neighbor(
                candidate.university_id,
                &candidate.gender,
                waist_number,
                direction,
            )
            .await
        {
            Ok(Some(id)) => Neighbor::Found(id),
            Ok(None) => Neighbor::None {
                message: edge.to_string(),
            },
            Err(err) => {
                warn!("Neighbor lookup failed: {err}");
                Neighbor::None {
                    message: err.to_string(),
                }
            }
        }
    }

    pub fn voting_flow(&self, detail: CandidateDetail, identity: Arc<DeviceIdentity>) -> VotingFlow {
        VotingFlow::new(self.service.clone(), identity, detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adapters::{CategoryType, InMemoryService, ServiceError};
    use adapters::memory::Operation;
    use uuid::Uuid;

    async fn seeded() -> (Arc<InMemoryService>, Catalog, UniversityId, Vec<Candidate>) {
        let service = Arc::new(InMemoryService::new());
        let university = service.add_university("Dagon", true).await;
        let mut candidates = Vec::new();
        for number in [1, 2, 3] {
            candidates.push(
                service
                    .add_candidate(university.id, &format!("Ko {number}"), Gender::Male, Some(number), true)
                    .await,
            );
        }
        let catalog = Catalog::new(service.clone());
        (service, catalog, university.id, candidates)
    }

    #[tokio::test]
    async fn test_next_neighbor_in_waist_order() {
        let (_, catalog, _, candidates) = seeded().await;

        assert_eq!(
            catalog.neighbor(&candidates[1], Direction::Next).await,
            Neighbor::Found(candidates[2].id)
        );
        assert_eq!(
            catalog.neighbor(&candidates[1], Direction::Prev).await,
            Neighbor::Found(candidates[0].id)
        );
    }

    #[tokio::test]
    async fn test_last_candidate_has_no_next() {
        let (_, catalog, _, candidates) = seeded().await;

        assert_eq!(
            catalog.neighbor(&candidates[2], Direction::Next).await,
            Neighbor::None {
                message: "You are at the last candidate.".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_neighbor_network_error_is_not_fatal() {
        let (service, catalog, _, candidates) = seeded().await;
        service
            .fail_next(Operation::FindNeighbor, ServiceError::Transport("offline".into()))
            .await;

        assert_eq!(
            catalog.neighbor(&candidates[0], Direction::Next).await,
            Neighbor::None {
                message: "Network error: offline".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_candidate_without_number_skips_lookup() {
        let (service, catalog, university, _) = seeded().await;
        let unnumbered = service
            .add_candidate(university, "Ko Zero", Gender::Male, None, true)
            .await;

        assert!(matches!(
            catalog.neighbor(&unnumbered, Direction::Prev).await,
            Neighbor::None { .. }
        ));
        assert_eq!(service.calls(Operation::FindNeighbor).await, 0);
    }

    #[tokio::test]
    async fn test_detail_includes_matching_active_categories() {
        let (service, catalog, university, candidates) = seeded().await;
        let king = service
            .add_category(university, Gender::parse("MALE"), CategoryType::King, true)
            .await;
        service
            .add_category(university, Gender::Female, CategoryType::King, true)
            .await;
        service
            .add_category(university, Gender::Male, CategoryType::Style, false)
            .await;

        let CandidateLookup::Found(detail) = catalog.candidate_detail(candidates[0].id).await.unwrap()
        else {
            panic!("candidate should exist");
        };
        assert_eq!(detail.categories, vec![king]);

        assert_eq!(
            catalog.candidate_detail(Uuid::new_v4()).await.unwrap(),
            CandidateLookup::NotFound
        );
    }

    #[tokio::test]
    async fn test_candidates_ordered_by_waist_number() {
        let (service, catalog, university, _) = seeded().await;
        service
            .add_candidate(university, "Ko Zero", Gender::Male, Some(0), true)
            .await;

        let numbers: Vec<Option<i32>> = catalog
            .candidates(university, &Gender::Male)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.waist_number)
            .collect();
        assert_eq!(numbers, vec![Some(0), Some(1), Some(2), Some(3)]);
    }
}
