//! Data structures for an authenticated admin session.

use std::{fmt, sync::Arc};

use adapters::{UniversityId, VotingService};

/// Proof that the admin password of one university was accepted.
///
/// The secure results procedure re-checks the password on every call, so the
/// session keeps it for the lifetime of the dashboard.
pub struct AdminSession {
    pub(crate) service: Arc<dyn VotingService>,
    pub(crate) university_id: UniversityId,
    pub(crate) password: String,
}

impl AdminSession {
    pub fn university_id(&self) -> UniversityId {
        self.university_id
    }
}

impl fmt::Debug for AdminSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminSession")
            .field("university_id", &self.university_id)
            .field("password", &"<redacted>")
            .finish()
    }
}
