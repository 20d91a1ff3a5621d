//! Course registration workflow service.
//!
//! Each use-case names the transition it performs as a [`Step`]; the gate
//! owning the step comes from [`RegistrationStatus::gate_for`] and is checked
//! through [`authorize`] before the repository applies the change with
//! compare-and-set on the step's source status.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    CatalogueRepository, CatalogueRepositoryError, GradeRepository, GradeRepositoryError,
    RegistrationRepository, RegistrationRepositoryError, RegistrationWorkflow, TuitionStatus,
    Workflow, WorkflowEvent, WorkflowMetrics,
};
use crate::domain::{
    Action, CourseOffering, CourseRegistration, Error, ErrorCode, Finalization, OfferingId,
    Principal, RegistrationId, RegistrationPolicy, RegistrationStatus, RegistrationSummary,
    Resource, StatusChange, StudentProfile, Term, WaiverAllowance, authorize,
};

/// Driven ports used by [`RegistrationService`].
#[derive(Clone)]
pub struct RegistrationServicePorts {
    /// Registration persistence.
    pub registrations: Arc<dyn RegistrationRepository>,
    /// Offering lookups.
    pub catalogue: Arc<dyn CatalogueRepository>,
    /// Published grades for prerequisite checks.
    pub grades: Arc<dyn GradeRepository>,
    /// Paid signal from the fee ledger.
    pub tuition: Arc<dyn TuitionStatus>,
    /// Outcome counters.
    pub metrics: Arc<dyn WorkflowMetrics>,
}

#[derive(Debug, Clone, Copy)]
struct Step {
    from: RegistrationStatus,
    to: RegistrationStatus,
}

const LECTURER_APPROVAL: Step = Step {
    from: RegistrationStatus::Pending,
    to: RegistrationStatus::LecturerApproved,
};
const LECTURER_REJECTION: Step = Step {
    from: RegistrationStatus::Pending,
    to: RegistrationStatus::RejectedByLecturer,
};
const FINALISATION: Step = Step {
    from: RegistrationStatus::LecturerApproved,
    to: RegistrationStatus::Registered,
};
const EXAM_OFFICER_REJECTION: Step = Step {
    from: RegistrationStatus::LecturerApproved,
    to: RegistrationStatus::RejectedByExamOfficer,
};

fn map_registration_error(error: RegistrationRepositoryError) -> Error {
    match error {
        RegistrationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("registration repository unavailable: {message}"))
        }
        RegistrationRepositoryError::Query { message } => {
            Error::internal(format!("registration repository error: {message}"))
        }
        RegistrationRepositoryError::Duplicate { message } => {
            Error::conflict(format!("an active registration already exists: {message}"))
                .with_details(json!({ "code": "already_registered" }))
        }
        RegistrationRepositoryError::Missing { message } => {
            Error::not_found(format!("registration not found: {message}"))
        }
        RegistrationRepositoryError::StaleStatus { expected } => Error::conflict(format!(
            "registration is no longer {expected}"
        ))
        .with_details(json!({ "code": "stale_status", "expected": expected.as_str() })),
        RegistrationRepositoryError::CapacityExceeded { offering } => {
            Error::capacity_exceeded(format!("offering {offering} has no free seats"))
                .with_details(json!({ "offeringId": offering }))
        }
        RegistrationRepositoryError::WaiverExhausted { limit } => Error::payment_required(
            format!("tuition is unpaid and the {limit} payment waivers are used up"),
        )
        .with_details(json!({ "code": "tuition_unpaid", "waiverLimit": limit })),
    }
}

fn map_catalogue_error(error: CatalogueRepositoryError) -> Error {
    match error {
        CatalogueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("catalogue repository unavailable: {message}"))
        }
        CatalogueRepositoryError::Query { message }
        | CatalogueRepositoryError::Duplicate { message } => {
            Error::internal(format!("catalogue repository error: {message}"))
        }
    }
}

fn map_grade_error(error: GradeRepositoryError) -> Error {
    match error {
        GradeRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("grade repository unavailable: {message}"))
        }
        other => Error::internal(format!("grade repository error: {other}")),
    }
}

fn rejection_reason(reason: &str) -> Result<String, Error> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_request("a rejection reason is required")
            .with_details(json!({ "field": "reason", "code": "missing_reason" })));
    }
    Ok(trimmed.to_owned())
}

/// Resolve the acting student's own profile, or fail with `Forbidden`.
fn own_profile(actor: &Principal, action: Action) -> Result<&StudentProfile, Error> {
    if let Some(profile) = actor.student() {
        authorize(actor, action, Resource::Student(profile))?;
        return Ok(profile);
    }
    authorize(actor, action, Resource::Institution)?;
    Err(Error::forbidden("only students hold registrations"))
}

/// Registration workflow over the driven ports.
pub struct RegistrationService {
    registrations: Arc<dyn RegistrationRepository>,
    catalogue: Arc<dyn CatalogueRepository>,
    grades: Arc<dyn GradeRepository>,
    tuition: Arc<dyn TuitionStatus>,
    metrics: Arc<dyn WorkflowMetrics>,
    clock: Arc<dyn Clock>,
    policy: RegistrationPolicy,
}

impl RegistrationService {
    /// Build the service.
    pub fn new(
        ports: RegistrationServicePorts,
        clock: Arc<dyn Clock>,
        policy: RegistrationPolicy,
    ) -> Self {
        Self {
            registrations: ports.registrations,
            catalogue: ports.catalogue,
            grades: ports.grades,
            tuition: ports.tuition,
            metrics: ports.metrics,
            clock,
            policy,
        }
    }

    async fn offering(&self, id: &OfferingId) -> Result<CourseOffering, Error> {
        self.catalogue
            .find(id)
            .await
            .map_err(map_catalogue_error)?
            .ok_or_else(|| Error::not_found(format!("offering {id} not found")))
    }

    async fn registration(&self, id: &RegistrationId) -> Result<CourseRegistration, Error> {
        self.registrations
            .find(id)
            .await
            .map_err(map_registration_error)?
            .ok_or_else(|| Error::not_found(format!("registration {id} not found")))
    }

    async fn record(&self, outcome: &'static str) {
        let event = WorkflowEvent::new(Workflow::Registration, outcome);
        if let Err(err) = self.metrics.record(event).await {
            warn!(error = %err, outcome, "failed to record registration metric");
        }
    }

    async fn ensure_prerequisites(
        &self,
        profile: &StudentProfile,
        offering: &CourseOffering,
    ) -> Result<(), Error> {
        if offering.prerequisites.is_empty() {
            return Ok(());
        }
        let published = self
            .grades
            .list_published_for_student(&profile.id)
            .await
            .map_err(map_grade_error)?;
        let passed: BTreeSet<_> = published
            .iter()
            .filter(|record| record.letter.satisfies_prerequisite())
            .map(|record| &record.course)
            .collect();
        let missing: Vec<&str> = offering
            .prerequisites
            .iter()
            .filter(|code| !passed.contains(code))
            .map(|code| code.as_str())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(Error::prerequisite_not_met(format!(
            "{} requires passing {}",
            offering.code.as_str(),
            missing.join(", ")
        ))
        .with_details(json!({ "missing": missing })))
    }

    /// Authorise and apply one non-final step.
    async fn decide(
        &self,
        actor: &Principal,
        id: &RegistrationId,
        step: Step,
        reason: Option<String>,
    ) -> Result<CourseRegistration, Error> {
        let (registration, _offering) = self.load_for_step(actor, id, step).await?;
        let change = StatusChange {
            to: step.to,
            by: actor.id(),
            at: self.clock.utc(),
            reason,
        };
        let updated = self
            .registrations
            .apply_decision(&registration.id, step.from, &change)
            .await
            .map_err(map_registration_error)?;
        info!(
            registration = %updated.id,
            from = step.from.as_str(),
            to = step.to.as_str(),
            actor = %actor.id(),
            "registration transitioned"
        );
        self.record(step.to.as_str()).await;
        Ok(updated)
    }

    async fn load_for_step(
        &self,
        actor: &Principal,
        id: &RegistrationId,
        step: Step,
    ) -> Result<(CourseRegistration, CourseOffering), Error> {
        let gate = step.from.gate_for(step.to).ok_or_else(|| {
            Error::internal(format!(
                "no gate owns {} -> {}",
                step.from.as_str(),
                step.to.as_str()
            ))
        })?;
        let registration = self.registration(id).await?;
        let offering = self.offering(&registration.offering).await?;
        authorize(actor, Action::PassGate(gate), Resource::Offering(&offering))?;

        if registration.status != step.from {
            return Err(Error::conflict(format!(
                "registration is {}, cannot move to {}",
                registration.status,
                step.to
            ))
            .with_details(json!({
                "code": "invalid_transition",
                "from": registration.status.as_str(),
                "to": step.to.as_str(),
            })));
        }
        Ok((registration, offering))
    }
}

#[async_trait]
impl RegistrationWorkflow for RegistrationService {
    async fn submit(
        &self,
        actor: &Principal,
        offering_id: &OfferingId,
    ) -> Result<CourseRegistration, Error> {
        let profile = own_profile(actor, Action::SubmitRegistration)?;
        let offering = self.offering(offering_id).await?;

        self.ensure_prerequisites(profile, &offering).await?;
        if !offering.has_free_seat() {
            self.record("capacity_exceeded").await;
            return Err(Error::capacity_exceeded(format!(
                "offering {} is full",
                offering.code.as_str()
            ))
            .with_details(json!({ "offeringId": offering.id, "capacity": offering.capacity })));
        }
        let existing = self
            .registrations
            .find_active(&profile.id, &offering.id)
            .await
            .map_err(map_registration_error)?;
        if let Some(existing) = existing {
            return Err(Error::conflict(format!(
                "registration {} for this offering is already {}",
                existing.id, existing.status
            ))
            .with_details(json!({ "code": "already_registered", "registrationId": existing.id })));
        }
        let active = self
            .registrations
            .count_active_in_term(&profile.id, &offering.term)
            .await
            .map_err(map_registration_error)?;
        if active >= self.policy.course_load_limit {
            return Err(Error::invalid_request(format!(
                "course load limit of {} registrations reached for {}",
                self.policy.course_load_limit, offering.term
            ))
            .with_details(json!({
                "code": "course_load_exceeded",
                "limit": self.policy.course_load_limit,
            })));
        }

        let registration = CourseRegistration::submit(
            RegistrationId::random(),
            profile.id,
            offering.id,
            offering.term,
            self.clock.utc(),
        );
        self.registrations
            .insert(&registration)
            .await
            .map_err(map_registration_error)?;
        info!(
            registration = %registration.id,
            offering = %offering.id,
            student = %profile.id,
            "registration submitted"
        );
        self.record(RegistrationStatus::Pending.as_str()).await;
        Ok(registration)
    }

    async fn approve_as_lecturer(
        &self,
        actor: &Principal,
        id: &RegistrationId,
    ) -> Result<CourseRegistration, Error> {
        self.decide(actor, id, LECTURER_APPROVAL, None).await
    }

    async fn reject_as_lecturer(
        &self,
        actor: &Principal,
        id: &RegistrationId,
        reason: String,
    ) -> Result<CourseRegistration, Error> {
        let reason = rejection_reason(&reason)?;
        self.decide(actor, id, LECTURER_REJECTION, Some(reason)).await
    }

    async fn approve_as_exam_officer(
        &self,
        actor: &Principal,
        id: &RegistrationId,
    ) -> Result<CourseRegistration, Error> {
        let (registration, _offering) = self.load_for_step(actor, id, FINALISATION).await?;
        let paid = self
            .tuition
            .tuition_paid(&registration.student, &registration.term)
            .await?;
        let finalization = Finalization {
            change: StatusChange {
                to: FINALISATION.to,
                by: actor.id(),
                at: self.clock.utc(),
                reason: None,
            },
            waiver: (!paid).then_some(WaiverAllowance {
                limit: self.policy.waiver_limit,
                scope: self.policy.waiver_scope,
            }),
        };

        match self.registrations.finalize(&registration.id, &finalization).await {
            Ok(updated) => {
                info!(
                    registration = %updated.id,
                    offering = %updated.offering,
                    payment_waived = updated.payment_waived,
                    "registration finalised"
                );
                self.record(RegistrationStatus::Registered.as_str()).await;
                Ok(updated)
            }
            Err(err) => {
                let error = map_registration_error(err);
                match error.code() {
                    ErrorCode::CapacityExceeded => self.record("capacity_exceeded").await,
                    ErrorCode::PaymentRequired => self.record("payment_required").await,
                    _ => {}
                }
                info!(
                    registration = %registration.id,
                    code = ?error.code(),
                    "registration finalisation refused"
                );
                Err(error)
            }
        }
    }

    async fn reject_as_exam_officer(
        &self,
        actor: &Principal,
        id: &RegistrationId,
        reason: String,
    ) -> Result<CourseRegistration, Error> {
        let reason = rejection_reason(&reason)?;
        self.decide(actor, id, EXAM_OFFICER_REJECTION, Some(reason))
            .await
    }

    async fn get(
        &self,
        actor: &Principal,
        id: &RegistrationId,
    ) -> Result<CourseRegistration, Error> {
        let registration = self.registration(id).await?;
        let owns = actor
            .student()
            .is_some_and(|profile| profile.id == registration.student);
        if !owns {
            let offering = self.offering(&registration.offering).await?;
            authorize(
                actor,
                Action::ViewOfferingRecords,
                Resource::Offering(&offering),
            )?;
        }
        Ok(registration)
    }

    async fn list_own(
        &self,
        actor: &Principal,
        term: Option<Term>,
    ) -> Result<Vec<CourseRegistration>, Error> {
        let profile = own_profile(actor, Action::ViewStudentRecord)?;
        self.registrations
            .list_for_student(&profile.id, term)
            .await
            .map_err(map_registration_error)
    }

    async fn summary(&self, actor: &Principal, term: Term) -> Result<RegistrationSummary, Error> {
        let registrations = self.list_own(actor, Some(term)).await?;
        Ok(RegistrationSummary::tally(&registrations))
    }

    async fn list_for_offering(
        &self,
        actor: &Principal,
        offering_id: &OfferingId,
        status: Option<RegistrationStatus>,
    ) -> Result<Vec<CourseRegistration>, Error> {
        let offering = self.offering(offering_id).await?;
        authorize(
            actor,
            Action::ViewOfferingRecords,
            Resource::Offering(&offering),
        )?;
        self.registrations
            .list_for_offering(&offering.id, status)
            .await
            .map_err(map_registration_error)
    }
}

#[cfg(test)]
#[path = "registration_service_tests.rs"]
mod tests;
