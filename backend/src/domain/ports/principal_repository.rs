//! Port for principal and credential persistence.

use async_trait::async_trait;

use crate::domain::{LecturerId, PasswordDigest, Principal, PrincipalId, StudentId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by principal repository adapters.
    pub enum PrincipalRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "principal repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "principal repository query failed: {message}",
        /// Identifier, username, or profile identifier already taken.
        Duplicate { message: String } =>
            "principal already exists: {message}",
    }
}

/// Credentials stored for a username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    /// Owning principal.
    pub principal: PrincipalId,
    /// Salted digest of the password.
    pub digest: PasswordDigest,
}

/// Port for reading and writing principals.
///
/// Principals are insert-only: a role cannot be reassigned by writing the
/// same identifier again.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// Persist a new principal and its credential digest.
    async fn insert(
        &self,
        principal: &Principal,
        digest: &PasswordDigest,
    ) -> Result<(), PrincipalRepositoryError>;

    /// Find a principal by id.
    async fn find(&self, id: &PrincipalId) -> Result<Option<Principal>, PrincipalRepositoryError>;

    /// Look up stored credentials by username.
    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StoredCredentials>, PrincipalRepositoryError>;

    /// Find the principal holding a student profile.
    async fn find_by_student(
        &self,
        student: &StudentId,
    ) -> Result<Option<Principal>, PrincipalRepositoryError>;

    /// Find the principal holding a lecturer profile.
    async fn find_by_lecturer(
        &self,
        lecturer: &LecturerId,
    ) -> Result<Option<Principal>, PrincipalRepositoryError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn duplicate_error_formats_message() {
        let err = PrincipalRepositoryError::duplicate("username registrar");
        assert_eq!(err.to_string(), "principal already exists: username registrar");
    }
}
