//! Port for course registration persistence.
//!
//! Status changes are compare-and-set on the expected current status. The
//! final transition is a single atomic unit that also checks capacity,
//! counts waivers, and increments the offering's enrolled count.

use async_trait::async_trait;

use crate::domain::{
    CourseRegistration, Finalization, OfferingId, RegistrationId, RegistrationStatus,
    StatusChange, StudentId, Term,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by registration repository adapters.
    pub enum RegistrationRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "registration repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "registration repository query failed: {message}",
        /// An active registration already exists for the student and offering.
        Duplicate { message: String } =>
            "registration already exists: {message}",
        /// The registration does not exist.
        Missing { message: String } =>
            "registration not found: {message}",
        /// The registration was no longer in the expected status.
        StaleStatus { expected: RegistrationStatus } =>
            "registration is no longer {expected}",
        /// The offering filled up before finalisation.
        CapacityExceeded { offering: OfferingId } =>
            "offering {offering} has no free seats",
        /// The student has used every payment waiver in scope.
        WaiverExhausted { limit: u32 } =>
            "payment waiver limit of {limit} reached",
    }
}

/// Port for reading and transitioning course registrations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegistrationRepository: Send + Sync {
    /// Find a registration by id.
    async fn find(
        &self,
        id: &RegistrationId,
    ) -> Result<Option<CourseRegistration>, RegistrationRepositoryError>;

    /// Find the non-rejected registration for a student and offering.
    async fn find_active(
        &self,
        student: &StudentId,
        offering: &OfferingId,
    ) -> Result<Option<CourseRegistration>, RegistrationRepositoryError>;

    /// Count a student's non-rejected registrations in a term.
    async fn count_active_in_term(
        &self,
        student: &StudentId,
        term: &Term,
    ) -> Result<u32, RegistrationRepositoryError>;

    /// Persist a pending registration.
    ///
    /// Fails with `Duplicate` when an active registration already exists.
    async fn insert(
        &self,
        registration: &CourseRegistration,
    ) -> Result<(), RegistrationRepositoryError>;

    /// List a student's registrations, optionally for one term.
    async fn list_for_student(
        &self,
        student: &StudentId,
        term: Option<Term>,
    ) -> Result<Vec<CourseRegistration>, RegistrationRepositoryError>;

    /// List an offering's registrations, optionally filtered by status.
    async fn list_for_offering(
        &self,
        offering: &OfferingId,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<CourseRegistration>, RegistrationRepositoryError>;

    /// Apply a non-final status change if the registration is still in
    /// `expected`.
    async fn apply_decision(
        &self,
        id: &RegistrationId,
        expected: RegistrationStatus,
        change: &StatusChange,
    ) -> Result<CourseRegistration, RegistrationRepositoryError>;

    /// Move a `lecturer_approved` registration to `registered` and take a
    /// seat in the offering, atomically.
    async fn finalize(
        &self,
        id: &RegistrationId,
        finalization: &Finalization,
    ) -> Result<CourseRegistration, RegistrationRepositoryError>;
}
