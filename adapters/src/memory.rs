//! In-process implementation of the `VotingService` trait.
//!
//! Holds universities, categories, candidates and votes in memory behind a
//! `tokio::sync::Mutex`, and counts every call per operation. Used as the
//! substitute backend in tests. Ticket quotas
//! are configured per university and gender bucket, and inserts beyond the
//! quota are rejected the way the hosted backend rejects them.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::*;
use crate::VotingService;

/// One entry per `VotingService` method, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListUniversities,
    GetUniversity,
    ListCategories,
    ListCandidates,
    GetCandidate,
    GetCandidates,
    FindNeighbor,
    TicketUsage,
    InsertVote,
    VerifyPassword,
    FullResults,
    TopResults,
}

#[derive(Default)]
struct Tables {
    universities: Vec<(University, bool)>,
    categories: Vec<(Category, bool)>,
    candidates: Vec<(Candidate, bool)>,
    votes: Vec<NewVote>,
    quotas: HashMap<(UniversityId, Gender), i64>,
    admin_passwords: HashMap<UniversityId, String>,
    failures: HashMap<Operation, ServiceError>,
    calls: HashMap<Operation, usize>,
}

impl Tables {
    fn active_candidate(&self, id: CandidateId) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|(candidate, active)| *active && candidate.id == id)
            .map(|(candidate, _)| candidate)
    }

    fn votes_for(&self, category: CategoryId, candidate: CandidateId) -> i64 {
        self.votes
            .iter()
            .filter(|vote| vote.category_id == category && vote.candidate_id == candidate)
            .count() as i64
    }

    fn remaining(&self, university: UniversityId, device: DeviceId, gender: &Gender) -> Option<i64> {
        let quota = *self.quotas.get(&(university, gender.clone()))?;
        let used = self
            .votes
            .iter()
            .filter(|vote| vote.university_id == university && vote.device_id == device)
            .filter(|vote| {
                self.candidates
                    .iter()
                    .any(|(c, _)| c.id == vote.candidate_id && &c.gender == gender)
            })
            .count() as i64;

        Some((quota - used).max(0))
    }

    fn check_password(&self, university: UniversityId, password: &str) -> bool {
        self.admin_passwords
            .get(&university)
            .is_some_and(|stored| stored == password)
    }
}

#[derive(Default)]
pub struct InMemoryService {
    tables: Mutex<Tables>,
}

impl InMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_university(&self, name: &str, active: bool) -> University {
        let university = University {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        self.tables
            .lock()
            .await
            .universities
            .push((university.clone(), active));
        university
    }

    pub async fn add_category(
        &self,
        university: UniversityId,
        gender: Gender,
        category_type: CategoryType,
        active: bool,
    ) -> Category {
        let category = Category {
            id: Uuid::new_v4(),
            university_id: university,
            gender,
            category_type,
        };
        self.tables
            .lock()
            .await
            .categories
            .push((category.clone(), active));
        category
    }

    pub async fn add_candidate(
        &self,
        university: UniversityId,
        name: &str,
        gender: Gender,
        waist_number: Option<i32>,
        active: bool,
    ) -> Candidate {
        let candidate = Candidate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            waist_number,
            gender,
            university_id: university,
            height_cm: None,
            birthday: None,
            hobby: None,
            image_url: None,
        };
        self.tables
            .lock()
            .await
            .candidates
            .push((candidate.clone(), active));
        candidate
    }

    /// Votes each device may cast in one gender bucket of a university.
    pub async fn set_ticket_quota(&self, university: UniversityId, gender: Gender, quota: i64) {
        self.tables
            .lock()
            .await
            .quotas
            .insert((university, gender), quota);
    }

    pub async fn set_admin_password(&self, university: UniversityId, password: &str) {
        self.tables
            .lock()
            .await
            .admin_passwords
            .insert(university, password.to_string());
    }

    /// Makes the next call of `operation` fail with `error`.
    pub async fn fail_next(&self, operation: Operation, error: ServiceError) {
        self.tables.lock().await.failures.insert(operation, error);
    }

    pub async fn calls(&self, operation: Operation) -> usize {
        self.tables
            .lock()
            .await
            .calls
            .get(&operation)
            .copied()
            .unwrap_or(0)
    }

    pub async fn votes(&self) -> Vec<NewVote> {
        self.tables.lock().await.votes.clone()
    }

    /// Records the call and pops an injected failure, if any.
    fn enter(tables: &mut Tables, operation: Operation) -> ServiceResult<()> {
        debug!("in-memory backend: {operation:?}");
        *tables.calls.entry(operation).or_insert(0) += 1;

        match tables.failures.remove(&operation) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VotingService for InMemoryService {
    async fn list_universities(&self, active_only: bool) -> ServiceResult<Vec<University>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::ListUniversities)?;

        let mut universities: Vec<University> = tables
            .universities
            .iter()
            .filter(|(_, active)| *active || !active_only)
            .map(|(university, _)| university.clone())
            .collect();
        universities.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(universities)
    }

    async fn get_university(&self, id: UniversityId) -> ServiceResult<Option<University>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::GetUniversity)?;

        Ok(tables
            .universities
            .iter()
            .find(|(university, _)| university.id == id)
            .map(|(university, _)| university.clone()))
    }

    async fn list_categories(
        &self,
        university: UniversityId,
        gender: Option<&Gender>,
        active_only: bool,
    ) -> ServiceResult<Vec<Category>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::ListCategories)?;

        Ok(tables
            .categories
            .iter()
            .filter(|(category, active)| {
                category.university_id == university
                    && gender.map_or(true, |g| &category.gender == g)
                    && (*active || !active_only)
            })
            .map(|(category, _)| category.clone())
            .collect())
    }

    async fn list_candidates(
        &self,
        university: UniversityId,
        gender: &Gender,
        active_only: bool,
    ) -> ServiceResult<Vec<Candidate>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::ListCandidates)?;

        let mut candidates: Vec<Candidate> = tables
            .candidates
            .iter()
            .filter(|(candidate, active)| {
                candidate.university_id == university
                    && &candidate.gender == gender
                    && (*active || !active_only)
            })
            .map(|(candidate, _)| candidate.clone())
            .collect();
        // Rows without a waist number sort last, like NULLS LAST.
        candidates.sort_by_key(|candidate| (candidate.waist_number.is_none(), candidate.waist_number));

        Ok(candidates)
    }

    async fn get_candidate(&self, id: CandidateId) -> ServiceResult<Option<Candidate>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::GetCandidate)?;

        Ok(tables
            .candidates
            .iter()
            .find(|(candidate, _)| candidate.id == id)
            .map(|(candidate, _)| candidate.clone()))
    }

    async fn get_candidates(&self, ids: &[CandidateId]) -> ServiceResult<Vec<CandidatePreview>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::GetCandidates)?;

        Ok(tables
            .candidates
            .iter()
            .filter(|(candidate, _)| ids.contains(&candidate.id))
            .map(|(candidate, _)| CandidatePreview::from(candidate))
            .collect())
    }

    async fn find_neighbor(
        &self,
        university: UniversityId,
        gender: &Gender,
        waist_number: i32,
        direction: Direction,
    ) -> ServiceResult<Option<CandidateId>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::FindNeighbor)?;

        let siblings = tables.candidates.iter().filter_map(|(candidate, active)| {
            let number = candidate.waist_number?;
            (*active && candidate.university_id == university && &candidate.gender == gender)
                .then_some((number, candidate.id))
        });

        let neighbor = match direction {
            Direction::Next => siblings.filter(|(n, _)| *n > waist_number).min_by_key(|(n, _)| *n),
            Direction::Prev => siblings.filter(|(n, _)| *n < waist_number).max_by_key(|(n, _)| *n),
        };

        Ok(neighbor.map(|(_, id)| id))
    }

    async fn get_device_ticket_usage(
        &self,
        university: UniversityId,
        device: DeviceId,
    ) -> ServiceResult<Vec<TicketUsage>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::TicketUsage)?;

        let mut rows: Vec<TicketUsage> = tables
            .quotas
            .keys()
            .filter(|(univ, _)| *univ == university)
            .filter_map(|(_, gender)| {
                tables
                    .remaining(university, device, gender)
                    .map(|remaining_tickets| TicketUsage {
                        gender: gender.clone(),
                        remaining_tickets,
                    })
            })
            .collect();
        rows.sort_by(|a, b| a.gender.key().cmp(&b.gender.key()));

        Ok(rows)
    }

    async fn insert_vote(&self, vote: &NewVote) -> ServiceResult<()> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::InsertVote)?;

        let Some(candidate) = tables.active_candidate(vote.candidate_id) else {
            return Err(ServiceError::rejected("Candidate is not open for voting"));
        };
        let gender = candidate.gender.clone();

        let category_matches = tables.categories.iter().any(|(category, active)| {
            *active
                && category.id == vote.category_id
                && category.university_id == vote.university_id
                && category.gender == gender
        });
        if !category_matches {
            return Err(ServiceError::rejected("Category does not accept this candidate"));
        }

        match tables.remaining(vote.university_id, vote.device_id, &gender) {
            Some(remaining) if remaining > 0 => {}
            _ => return Err(ServiceError::rejected("No tickets left for this device")),
        }

        tables.votes.push(vote.clone());
        Ok(())
    }

    async fn admin_verify_password(
        &self,
        university: UniversityId,
        password: &str,
    ) -> ServiceResult<bool> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::VerifyPassword)?;

        Ok(tables.check_password(university, password))
    }

    async fn get_admin_full_results(
        &self,
        university: UniversityId,
        password: &str,
    ) -> ServiceResult<Vec<AdminResultRow>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::FullResults)?;

        if !tables.check_password(university, password) {
            return Err(ServiceError::rejected("Invalid admin password"));
        }

        let mut rows = Vec::new();
        for (category, _) in tables
            .categories
            .iter()
            .filter(|(c, active)| *active && c.university_id == university)
        {
            for (candidate, _) in tables.candidates.iter().filter(|(c, active)| {
                *active && c.university_id == university && c.gender == category.gender
            }) {
                rows.push(AdminResultRow {
                    university_id: university,
                    category_id: category.id,
                    gender: category.gender.clone(),
                    category_type: category.category_type.clone(),
                    candidate_id: candidate.id,
                    waist_number: candidate.waist_number,
                    name: candidate.name.clone(),
                    votes: tables.votes_for(category.id, candidate.id),
                });
            }
        }

        Ok(rows)
    }

    async fn get_top_results(&self, category_ids: &[CategoryId]) -> ServiceResult<Vec<TopResult>> {
        let mut tables = self.tables.lock().await;
        Self::enter(&mut tables, Operation::TopResults)?;

        let mut tops = Vec::new();
        for category_id in category_ids {
            let leader = tables
                .candidates
                .iter()
                .map(|(candidate, _)| (tables.votes_for(*category_id, candidate.id), candidate.id))
                .filter(|(votes, _)| *votes > 0)
                .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

            if let Some((votes, candidate_id)) = leader {
                tops.push(TopResult {
                    category_id: *category_id,
                    candidate_id,
                    votes,
                });
            }
        }

        Ok(tops)
    }
}
