//! Core logic for admin sign-in and the secure results fetch.
//!
//! Password verification is delegated entirely to the backend procedure. This
//! service validates input, interprets the boolean answer, and hands out an
//! `AdminSession` only on `true`.

use std::sync::Arc;

use adapters::{UniversityId, VotingService};
use tracing::{info, warn};

use super::errors::AuthError;
use super::models::AdminSession;
use crate::services::results::{group_results, total_votes, AdminResults};

#[derive(Clone)]
pub struct AdminAuth {
    service: Arc<dyn VotingService>,
}

impl AdminAuth {
    pub fn new(service: Arc<dyn VotingService>) -> Self {
        Self { service }
    }

    pub async fn sign_in(
        &self,
        university: Option<UniversityId>,
        password: &str,
    ) -> Result<AdminSession, AuthError> {
        let Some(university_id) = university else {
            return Err(AuthError::MissingInput);
        };
        if password.is_empty() {
            return Err(AuthError::MissingInput);
        }

        if !self
            .service
            .admin_verify_password(university_id, password)
            .await?
        {
            warn!("Admin sign-in rejected for university {university_id}");
            return Err(AuthError::InvalidPassword);
        }

        info!("Admin signed in for university {university_id}");
        Ok(AdminSession {
            service: self.service.clone(),
            university_id,
            password: password.to_string(),
        })
    }
}

impl AdminSession {
    /// Full tallies grouped per contest. The university name is best effort.
    pub async fn results(&self) -> Result<AdminResults, AuthError> {
        let university_name = match self.service.get_university(self.university_id).await {
            Ok(university) => university.map(|u| u.name),
            Err(err) => {
                warn!("Unable to load university name: {err}");
                None
            }
        };

        let rows = self
            .service
            .get_admin_full_results(self.university_id, &self.password)
            .await?;
        let total_votes = total_votes(&rows);

        Ok(AdminResults {
            university_name,
            groups: group_results(rows),
            total_votes,
        })
    }
}
