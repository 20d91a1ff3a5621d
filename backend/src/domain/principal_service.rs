//! Identity and role directory service.
//!
//! Implements the login and directory driving ports over a
//! [`PrincipalRepository`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::domain::ports::{
    LoginService, PrincipalDirectory, PrincipalRepository, PrincipalRepositoryError,
    RegisterPrincipalRequest,
};
use crate::domain::{
    Action, Affiliation, Error, LoginCredentials, PasswordDigest, Principal, PrincipalDraft,
    PrincipalId, Resource, Role, StudentId, StudentProfile, authorize,
};

const MIN_PASSWORD_LEN: usize = 8;

fn map_repository_error(error: PrincipalRepositoryError) -> Error {
    match error {
        PrincipalRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("principal repository unavailable: {message}"))
        }
        PrincipalRepositoryError::Query { message } => {
            Error::internal(format!("principal repository error: {message}"))
        }
        PrincipalRepositoryError::Duplicate { message } => {
            Error::conflict(format!("principal already exists: {message}"))
                .with_details(json!({ "code": "principal_exists" }))
        }
    }
}

/// Directory service implementing [`LoginService`] and
/// [`PrincipalDirectory`].
#[derive(Clone)]
pub struct PrincipalDirectoryService<P> {
    principal_repo: Arc<P>,
}

impl<P> PrincipalDirectoryService<P> {
    /// Create a new service with the principal repository.
    pub fn new(principal_repo: Arc<P>) -> Self {
        Self { principal_repo }
    }
}

impl<P> PrincipalDirectoryService<P>
where
    P: PrincipalRepository,
{
    /// Create the first super admin unless the username is already taken.
    ///
    /// Returns the created principal, or `None` when it already existed.
    pub async fn ensure_bootstrap_admin(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<Principal>, Error> {
        let existing = self
            .principal_repo
            .find_credentials(username.trim())
            .await
            .map_err(map_repository_error)?;
        if existing.is_some() {
            return Ok(None);
        }

        let principal = Principal::try_new(PrincipalDraft {
            id: PrincipalId::random(),
            username: username.to_owned(),
            full_name: "Super Administrator".to_owned(),
            email: format!("{}@college.local", username.trim()),
            role: Role::SuperAdmin,
            affiliation: Affiliation::None,
        })
        .map_err(|err| Error::invalid_request(format!("invalid bootstrap admin: {err}")))?;
        let digest = digest_for(password)?;

        self.principal_repo
            .insert(&principal, &digest)
            .await
            .map_err(map_repository_error)?;
        info!(principal = %principal.id(), "bootstrap super admin created");
        Ok(Some(principal))
    }
}

fn digest_for(password: &str) -> Result<PasswordDigest, Error> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::invalid_request(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        ))
        .with_details(json!({ "field": "password", "code": "too_short" })));
    }
    Ok(PasswordDigest::derive(password))
}

#[async_trait]
impl<P> LoginService for PrincipalDirectoryService<P>
where
    P: PrincipalRepository,
{
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<PrincipalId, Error> {
        let stored = self
            .principal_repo
            .find_credentials(credentials.username())
            .await
            .map_err(map_repository_error)?;
        match stored {
            Some(stored) if stored.digest.matches(credentials.password()) => Ok(stored.principal),
            _ => Err(Error::unauthorized("invalid credentials")),
        }
    }
}

#[async_trait]
impl<P> PrincipalDirectory for PrincipalDirectoryService<P>
where
    P: PrincipalRepository,
{
    async fn register(
        &self,
        actor: &Principal,
        request: RegisterPrincipalRequest,
    ) -> Result<Principal, Error> {
        authorize(actor, Action::RegisterPrincipal, Resource::Institution)?;

        let RegisterPrincipalRequest {
            username,
            password,
            full_name,
            email,
            role,
            affiliation,
        } = request;
        let principal = Principal::try_new(PrincipalDraft {
            id: PrincipalId::random(),
            username,
            full_name,
            email,
            role,
            affiliation,
        })
        .map_err(|err| Error::invalid_request(err.to_string()))?;
        let digest = digest_for(password.as_str())?;

        self.principal_repo
            .insert(&principal, &digest)
            .await
            .map_err(map_repository_error)?;
        info!(
            principal = %principal.id(),
            role = principal.role().as_str(),
            actor = %actor.id(),
            "principal registered"
        );
        Ok(principal)
    }

    async fn resolve(&self, id: &PrincipalId) -> Result<Principal, Error> {
        self.principal_repo
            .find(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::unauthorized("session principal no longer exists"))
    }

    async fn student(&self, id: &StudentId) -> Result<StudentProfile, Error> {
        let principal = self
            .principal_repo
            .find_by_student(id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("student {id} not found")))?;
        principal
            .student()
            .cloned()
            .ok_or_else(|| Error::internal(format!("principal for student {id} has no profile")))
    }
}

#[cfg(test)]
#[path = "principal_service_tests.rs"]
mod tests;
