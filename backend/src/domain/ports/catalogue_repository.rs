//! Port for course offering persistence.

use async_trait::async_trait;

use crate::domain::{CourseOffering, OfferingId, Term};

use super::define_port_error;

define_port_error! {
    /// Errors raised by catalogue repository adapters.
    pub enum CatalogueRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "catalogue repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "catalogue repository query failed: {message}",
        /// The course already has an offering in the term.
        Duplicate { message: String } =>
            "offering already exists: {message}",
    }
}

/// Port for reading and opening course offerings.
///
/// Enrolment counts are only changed by the registration repository's
/// finalisation, never through this port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogueRepository: Send + Sync {
    /// Persist a new offering.
    async fn insert(&self, offering: &CourseOffering) -> Result<(), CatalogueRepositoryError>;

    /// Find an offering by id.
    async fn find(
        &self,
        id: &OfferingId,
    ) -> Result<Option<CourseOffering>, CatalogueRepositoryError>;

    /// List offerings of a term ordered by course code.
    async fn list_for_term(
        &self,
        term: &Term,
    ) -> Result<Vec<CourseOffering>, CatalogueRepositoryError>;
}
