//! PostgreSQL-backed course offering adapter.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{CatalogueRepository, CatalogueRepositoryError};
use crate::domain::{CourseOffering, OfferingId, Term};

use super::diesel_error_mapping::RepositoryError;
use super::models::{OfferingRow, term_columns};
use super::pool::DbPool;
use super::schema::offerings;

/// Diesel-backed implementation of [`CatalogueRepository`].
#[derive(Clone)]
pub struct DieselCatalogueRepository {
    pool: DbPool,
}

impl DieselCatalogueRepository {
    /// Create a repository over the given pool.
    pub const fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogueRepository for DieselCatalogueRepository {
    async fn insert(&self, offering: &CourseOffering) -> Result<(), CatalogueRepositoryError> {
        let row = OfferingRow::from_domain(offering).map_err(CatalogueRepositoryError::query)?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(CatalogueRepositoryError::from_pool)?;
        diesel::insert_into(offerings::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(CatalogueRepositoryError::from_diesel)
    }

    async fn find(
        &self,
        id: &OfferingId,
    ) -> Result<Option<CourseOffering>, CatalogueRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(CatalogueRepositoryError::from_pool)?;
        let row = offerings::table
            .find(*id.as_uuid())
            .select(OfferingRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(CatalogueRepositoryError::from_diesel)?;
        row.map(OfferingRow::into_domain)
            .transpose()
            .map_err(CatalogueRepositoryError::query)
    }

    async fn list_for_term(
        &self,
        term: &Term,
    ) -> Result<Vec<CourseOffering>, CatalogueRepositoryError> {
        let (session_start, semester) = term_columns(term);
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(CatalogueRepositoryError::from_pool)?;
        let rows: Vec<OfferingRow> = offerings::table
            .filter(offerings::session_start.eq(session_start))
            .filter(offerings::semester.eq(semester))
            .select(OfferingRow::as_select())
            .order_by(offerings::code.asc())
            .load(&mut conn)
            .await
            .map_err(CatalogueRepositoryError::from_diesel)?;
        rows.into_iter()
            .map(OfferingRow::into_domain)
            .collect::<Result<Vec<_>, _>>()
            .map_err(CatalogueRepositoryError::query)
    }
}
