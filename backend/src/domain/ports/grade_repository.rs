//! Port for grade record persistence.

use async_trait::async_trait;

use crate::domain::{GradeRecord, GradeRecordId, GradeStage, OfferingId, StageChange, StudentId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by grade repository adapters.
    pub enum GradeRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "grade repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "grade repository query failed: {message}",
        /// A live record already exists for the student and offering.
        Duplicate { message: String } =>
            "grade record already exists: {message}",
        /// The record does not exist.
        Missing { message: String } =>
            "grade record not found: {message}",
        /// The record was no longer in the expected stage.
        StaleStage { expected: GradeStage } =>
            "grade record is no longer {expected}",
    }
}

/// Port for reading and transitioning grade records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GradeRepository: Send + Sync {
    /// Find a record by id.
    async fn find(&self, id: &GradeRecordId) -> Result<Option<GradeRecord>, GradeRepositoryError>;

    /// Find the newest non-rejected record for a student and offering.
    async fn find_current(
        &self,
        student: &StudentId,
        offering: &OfferingId,
    ) -> Result<Option<GradeRecord>, GradeRepositoryError>;

    /// Persist a new draft.
    ///
    /// Fails with `Duplicate` when a non-rejected record already exists.
    async fn insert(&self, record: &GradeRecord) -> Result<(), GradeRepositoryError>;

    /// Overwrite the score of a record that is still a draft.
    async fn update_draft(&self, record: &GradeRecord) -> Result<GradeRecord, GradeRepositoryError>;

    /// Move a record from `expected` to the change's target stage.
    async fn advance(
        &self,
        id: &GradeRecordId,
        expected: GradeStage,
        change: &StageChange,
    ) -> Result<GradeRecord, GradeRepositoryError>;

    /// List every record of an offering.
    async fn list_for_offering(
        &self,
        offering: &OfferingId,
    ) -> Result<Vec<GradeRecord>, GradeRepositoryError>;

    /// List a student's published records.
    async fn list_published_for_student(
        &self,
        student: &StudentId,
    ) -> Result<Vec<GradeRecord>, GradeRepositoryError>;
}
