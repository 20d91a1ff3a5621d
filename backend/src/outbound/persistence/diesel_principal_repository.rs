//! PostgreSQL-backed principal and credential adapter.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{PrincipalRepository, PrincipalRepositoryError, StoredCredentials};
use crate::domain::{LecturerId, PasswordDigest, Principal, PrincipalId, StudentId};

use super::diesel_error_mapping::RepositoryError;
use super::models::{NewPrincipalRow, PrincipalRow};
use super::pool::DbPool;
use super::schema::principals;

/// Diesel-backed implementation of [`PrincipalRepository`].
#[derive(Clone)]
pub struct DieselPrincipalRepository {
    pool: DbPool,
}

impl DieselPrincipalRepository {
    /// Create a repository over the given pool.
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn into_principal(
    row: Option<PrincipalRow>,
) -> Result<Option<Principal>, PrincipalRepositoryError> {
    row.map(PrincipalRow::into_domain)
        .transpose()
        .map_err(PrincipalRepositoryError::query)
}

macro_rules! find_principal_by {
    ($self:ident, $filter:expr) => {{
        let mut conn = $self
            .pool
            .get()
            .await
            .map_err(PrincipalRepositoryError::from_pool)?;
        let row = principals::table
            .filter($filter)
            .select(PrincipalRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(PrincipalRepositoryError::from_diesel)?;
        into_principal(row)
    }};
}

#[async_trait]
impl PrincipalRepository for DieselPrincipalRepository {
    async fn insert(
        &self,
        principal: &Principal,
        digest: &PasswordDigest,
    ) -> Result<(), PrincipalRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(PrincipalRepositoryError::from_pool)?;
        let row = NewPrincipalRow::from_domain(principal, digest.encode());
        diesel::insert_into(principals::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(PrincipalRepositoryError::from_diesel)
    }

    async fn find(&self, id: &PrincipalId) -> Result<Option<Principal>, PrincipalRepositoryError> {
        find_principal_by!(self, principals::id.eq(*id.as_uuid()))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<StoredCredentials>, PrincipalRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(PrincipalRepositoryError::from_pool)?;
        let found: Option<(uuid::Uuid, String)> = principals::table
            .filter(principals::username.eq(username))
            .select((principals::id, principals::password_digest))
            .first(&mut conn)
            .await
            .optional()
            .map_err(PrincipalRepositoryError::from_diesel)?;

        let Some((id, encoded)) = found else {
            return Ok(None);
        };
        match PasswordDigest::decode(&encoded) {
            Ok(digest) => Ok(Some(StoredCredentials {
                principal: PrincipalId::from_uuid(id),
                digest,
            })),
            Err(err) => {
                warn!(principal = %id, error = %err, "stored password digest is malformed");
                Err(PrincipalRepositoryError::query("malformed password digest"))
            }
        }
    }

    async fn find_by_student(
        &self,
        student: &StudentId,
    ) -> Result<Option<Principal>, PrincipalRepositoryError> {
        find_principal_by!(self, principals::student_id.eq(*student.as_uuid()))
    }

    async fn find_by_lecturer(
        &self,
        lecturer: &LecturerId,
    ) -> Result<Option<Principal>, PrincipalRepositoryError> {
        find_principal_by!(self, principals::lecturer_id.eq(*lecturer.as_uuid()))
    }
}
