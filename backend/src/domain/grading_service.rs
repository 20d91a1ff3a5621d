//! Grade approval workflow service.
//!
//! Scores are entered as drafts by the teaching lecturer and then climb the
//! approval chain one gate at a time. Published records are immutable and
//! the only ones students see or that count towards standing.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    CatalogueRepository, CatalogueRepositoryError, GradeRepository, GradeRepositoryError,
    GradeWorkflow, PrincipalRepository, PrincipalRepositoryError, RegistrationRepository,
    RegistrationRepositoryError, ScoreEntry, Workflow, WorkflowEvent, WorkflowMetrics,
};
use crate::domain::{
    AcademicStanding, Action, CourseOffering, Error, Gate, GradeRecord, GradeRecordId, GradeStage,
    GradingScale, OfferingId, Principal, RegistrationStatus, Resource, StageChange, StudentId,
    StudentProfile, authorize,
};

/// Driven ports used by [`GradingService`].
#[derive(Clone)]
pub struct GradingServicePorts {
    /// Grade record persistence.
    pub grades: Arc<dyn GradeRepository>,
    /// Offering lookups.
    pub catalogue: Arc<dyn CatalogueRepository>,
    /// Registration lookups for score entry.
    pub registrations: Arc<dyn RegistrationRepository>,
    /// Student profile lookups.
    pub principals: Arc<dyn PrincipalRepository>,
    /// Outcome counters.
    pub metrics: Arc<dyn WorkflowMetrics>,
}

fn map_grade_error(error: GradeRepositoryError) -> Error {
    match error {
        GradeRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("grade repository unavailable: {message}"))
        }
        GradeRepositoryError::Query { message } => {
            Error::internal(format!("grade repository error: {message}"))
        }
        GradeRepositoryError::Duplicate { message } => {
            Error::conflict(format!("a live grade record already exists: {message}"))
                .with_details(json!({ "code": "grade_exists" }))
        }
        GradeRepositoryError::Missing { message } => {
            Error::not_found(format!("grade record not found: {message}"))
        }
        GradeRepositoryError::StaleStage { expected } => {
            Error::conflict(format!("grade record is no longer {expected}"))
                .with_details(json!({ "code": "stale_stage", "expected": expected.as_str() }))
        }
    }
}

fn map_catalogue_error(error: CatalogueRepositoryError) -> Error {
    match error {
        CatalogueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("catalogue repository unavailable: {message}"))
        }
        other => Error::internal(format!("catalogue repository error: {other}")),
    }
}

fn map_registration_error(error: RegistrationRepositoryError) -> Error {
    match error {
        RegistrationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("registration repository unavailable: {message}"))
        }
        other => Error::internal(format!("registration repository error: {other}")),
    }
}

fn map_principal_error(error: PrincipalRepositoryError) -> Error {
    match error {
        PrincipalRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("principal repository unavailable: {message}"))
        }
        other => Error::internal(format!("principal repository error: {other}")),
    }
}

fn invalid_transition(from: GradeStage, to: GradeStage) -> Error {
    Error::conflict(format!("grade record is {from}, cannot move to {to}")).with_details(json!({
        "code": "invalid_transition",
        "from": from.as_str(),
        "to": to.as_str(),
    }))
}

/// Grade workflow over the driven ports.
pub struct GradingService {
    grades: Arc<dyn GradeRepository>,
    catalogue: Arc<dyn CatalogueRepository>,
    registrations: Arc<dyn RegistrationRepository>,
    principals: Arc<dyn PrincipalRepository>,
    metrics: Arc<dyn WorkflowMetrics>,
    clock: Arc<dyn Clock>,
    scale: GradingScale,
}

impl GradingService {
    /// Build the service.
    pub fn new(ports: GradingServicePorts, clock: Arc<dyn Clock>, scale: GradingScale) -> Self {
        Self {
            grades: ports.grades,
            catalogue: ports.catalogue,
            registrations: ports.registrations,
            principals: ports.principals,
            metrics: ports.metrics,
            clock,
            scale,
        }
    }

    async fn offering(&self, id: &OfferingId) -> Result<CourseOffering, Error> {
        self.catalogue
            .find(id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("offering {id} not found")))
    }

    async fn record(&self, id: &GradeRecordId) -> Result<GradeRecord, Error> {
        self.grades
            .find(id)
            .await
            .map_err(map_grade_error)?
            .ok_or_else(|| Error::not_found(format!("grade record {id} not found")))
    }

    async fn student_profile(&self, id: &StudentId) -> Result<StudentProfile, Error> {
        self.principals
            .find_by_student(id)
            .await
            .map_err(map_principal_error)?
            .and_then(|principal| principal.student().cloned())
            .ok_or_else(|| Error::not_found(format!("student {id} not found")))
    }

    async fn count(&self, outcome: &'static str) {
        let event = WorkflowEvent::new(Workflow::Grading, outcome);
        if let Err(err) = self.metrics.record(event).await {
            warn!(error = %err, outcome, "failed to record grading metric");
        }
    }

    /// Move a record along `from -> to` after checking the owning gate.
    async fn advance(
        &self,
        actor: &Principal,
        id: &GradeRecordId,
        from: GradeStage,
        to: GradeStage,
        reason: Option<String>,
    ) -> Result<GradeRecord, Error> {
        let gate = from
            .gate_for(to)
            .ok_or_else(|| Error::internal(format!("no gate owns {from} -> {to}")))?;
        let record = self.record(id).await?;
        self.authorize_gate(actor, gate, &record).await?;
        if record.stage != from {
            return Err(invalid_transition(record.stage, to));
        }
        self.apply(actor, record, to, reason).await
    }

    async fn authorize_gate(
        &self,
        actor: &Principal,
        gate: Gate,
        record: &GradeRecord,
    ) -> Result<(), Error> {
        let offering = self.offering(&record.offering).await?;
        authorize(actor, Action::PassGate(gate), Resource::Offering(&offering))
    }

    async fn apply(
        &self,
        actor: &Principal,
        record: GradeRecord,
        to: GradeStage,
        reason: Option<String>,
    ) -> Result<GradeRecord, Error> {
        let change = StageChange {
            to,
            by: actor.id(),
            at: self.clock.utc(),
            reason,
        };
        let updated = self
            .grades
            .advance(&record.id, record.stage, &change)
            .await
            .map_err(map_grade_error)?;
        info!(
            grade = %updated.id,
            from = record.stage.as_str(),
            to = to.as_str(),
            actor = %actor.id(),
            "grade record transitioned"
        );
        self.count(to.as_str()).await;
        Ok(updated)
    }
}

#[async_trait]
impl GradeWorkflow for GradingService {
    async fn enter_score(
        &self,
        actor: &Principal,
        entry: ScoreEntry,
    ) -> Result<GradeRecord, Error> {
        let offering = self.offering(&entry.offering).await?;
        authorize(
            actor,
            Action::PassGate(Gate::OfferingLecturer),
            Resource::Offering(&offering),
        )?;

        let registration = self
            .registrations
            .find_active(&entry.student, &offering.id)
            .await
            .map_err(map_registration_error)?;
        let registered = matches!(
            registration,
            Some(ref registration) if registration.status == RegistrationStatus::Registered
        );
        if !registered {
            return Err(Error::conflict(format!(
                "student {} is not registered for {}",
                entry.student,
                offering.code.as_str()
            ))
            .with_details(json!({ "code": "student_not_registered" })));
        }

        let now = self.clock.utc();
        let current = self
            .grades
            .find_current(&entry.student, &offering.id)
            .await
            .map_err(map_grade_error)?;
        let record = match current {
            None => {
                let record = GradeRecord::draft(
                    GradeRecordId::random(),
                    &offering,
                    entry.student,
                    entry.score,
                    &self.scale,
                    actor.id(),
                    now,
                );
                self.grades.insert(&record).await.map_err(map_grade_error)?;
                record
            }
            Some(existing) if existing.stage == GradeStage::Draft => {
                let rescored = existing.rescore(entry.score, &self.scale, actor.id(), now);
                self.grades
                    .update_draft(&rescored)
                    .await
                    .map_err(map_grade_error)?
            }
            Some(existing) => {
                return Err(Error::conflict(format!(
                    "grade record {} is {} and can no longer be edited",
                    existing.id, existing.stage
                ))
                .with_details(json!({ "code": "grade_locked", "stage": existing.stage.as_str() })));
            }
        };
        info!(
            grade = %record.id,
            letter = record.letter.as_str(),
            total = %record.score.total(),
            "score entered"
        );
        Ok(record)
    }

    async fn submit(&self, actor: &Principal, id: &GradeRecordId) -> Result<GradeRecord, Error> {
        self.advance(actor, id, GradeStage::Draft, GradeStage::Submitted, None)
            .await
    }

    async fn hod_approve(
        &self,
        actor: &Principal,
        id: &GradeRecordId,
    ) -> Result<GradeRecord, Error> {
        self.advance(actor, id, GradeStage::Submitted, GradeStage::HodApproved, None)
            .await
    }

    async fn verify(&self, actor: &Principal, id: &GradeRecordId) -> Result<GradeRecord, Error> {
        self.advance(actor, id, GradeStage::HodApproved, GradeStage::Verified, None)
            .await
    }

    async fn publish(&self, actor: &Principal, id: &GradeRecordId) -> Result<GradeRecord, Error> {
        self.advance(actor, id, GradeStage::Verified, GradeStage::Published, None)
            .await
    }

    async fn reject(
        &self,
        actor: &Principal,
        id: &GradeRecordId,
        reason: String,
    ) -> Result<GradeRecord, Error> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(Error::invalid_request("a rejection reason is required")
                .with_details(json!({ "field": "reason", "code": "missing_reason" })));
        }
        let record = self.record(id).await?;
        let gate = record
            .stage
            .gate_for(GradeStage::Rejected)
            .ok_or_else(|| invalid_transition(record.stage, GradeStage::Rejected))?;
        self.authorize_gate(actor, gate, &record).await?;
        self.apply(actor, record, GradeStage::Rejected, Some(reason.to_owned()))
            .await
    }

    async fn get(&self, actor: &Principal, id: &GradeRecordId) -> Result<GradeRecord, Error> {
        let record = self.record(id).await?;
        if let Some(profile) = actor.student() {
            // Students never learn that unpublished records exist.
            if profile.id == record.student && record.stage == GradeStage::Published {
                return Ok(record);
            }
            return Err(Error::not_found(format!("grade record {id} not found")));
        }
        let offering = self.offering(&record.offering).await?;
        authorize(
            actor,
            Action::ViewOfferingRecords,
            Resource::Offering(&offering),
        )?;
        Ok(record)
    }

    async fn list_for_offering(
        &self,
        actor: &Principal,
        offering: &OfferingId,
    ) -> Result<Vec<GradeRecord>, Error> {
        let offering = self.offering(offering).await?;
        authorize(
            actor,
            Action::ViewOfferingRecords,
            Resource::Offering(&offering),
        )?;
        self.grades
            .list_for_offering(&offering.id)
            .await
            .map_err(map_grade_error)
    }

    async fn published_for_student(
        &self,
        actor: &Principal,
        student: &StudentId,
    ) -> Result<Vec<GradeRecord>, Error> {
        let profile = self.student_profile(student).await?;
        authorize(actor, Action::ViewStudentRecord, Resource::Student(&profile))?;
        self.grades
            .list_published_for_student(&profile.id)
            .await
            .map_err(map_grade_error)
    }

    async fn standing(
        &self,
        actor: &Principal,
        student: &StudentId,
    ) -> Result<AcademicStanding, Error> {
        let records = self.published_for_student(actor, student).await?;
        Ok(AcademicStanding::compute(&records))
    }
}

#[cfg(test)]
#[path = "grading_service_tests.rs"]
mod tests;
