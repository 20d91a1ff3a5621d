//! Driving port for the grade approval workflow.

use async_trait::async_trait;

use crate::domain::{
    AcademicStanding, Error, GradeRecord, GradeRecordId, OfferingId, Principal, ScoreBreakdown,
    StudentId,
};

/// Score entered by the teaching lecturer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEntry {
    /// Offering graded.
    pub offering: OfferingId,
    /// Student graded.
    pub student: StudentId,
    /// Score.
    pub score: ScoreBreakdown,
}

/// Grade use-cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GradeWorkflow: Send + Sync {
    /// Create or update a draft.
    async fn enter_score(
        &self,
        actor: &Principal,
        entry: ScoreEntry,
    ) -> Result<GradeRecord, Error>;

    /// `draft -> submitted`.
    async fn submit(&self, actor: &Principal, id: &GradeRecordId) -> Result<GradeRecord, Error>;

    /// `submitted -> hod_approved`.
    async fn hod_approve(
        &self,
        actor: &Principal,
        id: &GradeRecordId,
    ) -> Result<GradeRecord, Error>;

    /// `hod_approved -> verified`.
    async fn verify(&self, actor: &Principal, id: &GradeRecordId) -> Result<GradeRecord, Error>;

    /// `verified -> published`.
    async fn publish(&self, actor: &Principal, id: &GradeRecordId) -> Result<GradeRecord, Error>;

    /// Send a record in review to `rejected`.
    async fn reject(
        &self,
        actor: &Principal,
        id: &GradeRecordId,
        reason: String,
    ) -> Result<GradeRecord, Error>;

    /// Fetch one record.
    async fn get(&self, actor: &Principal, id: &GradeRecordId) -> Result<GradeRecord, Error>;

    /// Grade sheet of an offering.
    async fn list_for_offering(
        &self,
        actor: &Principal,
        offering: &OfferingId,
    ) -> Result<Vec<GradeRecord>, Error>;

    /// A student's published grades.
    async fn published_for_student(
        &self,
        actor: &Principal,
        student: &StudentId,
    ) -> Result<Vec<GradeRecord>, Error>;

    /// GPA, CGPA and classification.
    async fn standing(
        &self,
        actor: &Principal,
        student: &StudentId,
    ) -> Result<AcademicStanding, Error>;
}
