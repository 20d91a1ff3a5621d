//! Driving port for the identity and role directory.

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::domain::{Affiliation, Error, Principal, PrincipalId, Role, StudentId, StudentProfile};

/// Request to create a principal.
#[derive(Debug, Clone)]
pub struct RegisterPrincipalRequest {
    /// Login name.
    pub username: String,
    /// Initial password.
    pub password: Zeroizing<String>,
    /// Display name.
    pub full_name: String,
    /// Contact email.
    pub email: String,
    /// Role, fixed for the principal's lifetime.
    pub role: Role,
    /// Academic link matching the role.
    pub affiliation: Affiliation,
}

/// Directory use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    /// Create a principal with an immutable role.
    async fn register(
        &self,
        actor: &Principal,
        request: RegisterPrincipalRequest,
    ) -> Result<Principal, Error>;

    /// Resolve a session's principal id.
    async fn resolve(&self, id: &PrincipalId) -> Result<Principal, Error>;

    /// Look up a student's profile by student id.
    async fn student(&self, id: &StudentId) -> Result<StudentProfile, Error>;
}
