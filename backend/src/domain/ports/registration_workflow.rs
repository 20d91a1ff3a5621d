//! Driving port for the course registration workflow.

use async_trait::async_trait;

use crate::domain::{
    CourseRegistration, Error, OfferingId, Principal, RegistrationId, RegistrationStatus,
    RegistrationSummary, Term,
};

/// Registration use-cases.
///
/// Every call names the acting principal; authorisation happens inside.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationWorkflow: Send + Sync {
    /// Request a seat in an offering.
    async fn submit(
        &self,
        actor: &Principal,
        offering: &OfferingId,
    ) -> Result<CourseRegistration, Error>;

    /// `pending -> lecturer_approved`.
    async fn approve_as_lecturer(
        &self,
        actor: &Principal,
        id: &RegistrationId,
    ) -> Result<CourseRegistration, Error>;

    /// `pending -> rejected_by_lecturer`.
    async fn reject_as_lecturer(
        &self,
        actor: &Principal,
        id: &RegistrationId,
        reason: String,
    ) -> Result<CourseRegistration, Error>;

    /// `lecturer_approved -> registered`, taking a seat.
    async fn approve_as_exam_officer(
        &self,
        actor: &Principal,
        id: &RegistrationId,
    ) -> Result<CourseRegistration, Error>;

    /// `lecturer_approved -> rejected_by_exam_officer`.
    async fn reject_as_exam_officer(
        &self,
        actor: &Principal,
        id: &RegistrationId,
        reason: String,
    ) -> Result<CourseRegistration, Error>;

    /// Fetch one registration.
    async fn get(
        &self,
        actor: &Principal,
        id: &RegistrationId,
    ) -> Result<CourseRegistration, Error>;

    /// The acting student's registrations, optionally for one term.
    async fn list_own(
        &self,
        actor: &Principal,
        term: Option<Term>,
    ) -> Result<Vec<CourseRegistration>, Error>;

    /// Counts per status for the acting student's term.
    async fn summary(&self, actor: &Principal, term: Term) -> Result<RegistrationSummary, Error>;

    /// Registrations of an offering, optionally filtered by status.
    async fn list_for_offering(
        &self,
        actor: &Principal,
        offering: &OfferingId,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<CourseRegistration>, Error>;
}
