//! Driving port for course offerings.

use async_trait::async_trait;

use crate::domain::{CourseOffering, Error, OfferingDraft, OfferingId, Principal, Term};

/// Offering use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OfferingCatalogue: Send + Sync {
    /// Open an offering for a term.
    async fn open(
        &self,
        actor: &Principal,
        draft: OfferingDraft,
    ) -> Result<CourseOffering, Error>;

    /// Fetch one offering.
    async fn get(&self, id: &OfferingId) -> Result<CourseOffering, Error>;

    /// List a term's offerings.
    async fn list(&self, term: &Term) -> Result<Vec<CourseOffering>, Error>;
}
