//! Course registration state machine.
//!
//! A registration moves `pending -> lecturer_approved -> registered`, or
//! stops in one of two terminal rejection states. Every permitted step is
//! listed once in [`RegistrationStatus::gate_for`]; anything absent from
//! that table is an invalid transition.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::academic::Term;
use super::access::Gate;
use super::ids::{OfferingId, PrincipalId, RegistrationId, StudentId};

/// Status of a course registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// Awaiting the teaching lecturer.
    Pending,
    /// Approved by the lecturer, awaiting the exam officer.
    LecturerApproved,
    /// Final: the student holds a seat.
    Registered,
    /// Terminal: rejected by the lecturer.
    RejectedByLecturer,
    /// Terminal: rejected by the exam officer.
    RejectedByExamOfficer,
}

impl RegistrationStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::LecturerApproved,
        Self::Registered,
        Self::RejectedByLecturer,
        Self::RejectedByExamOfficer,
    ];

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::LecturerApproved => "lecturer_approved",
            Self::Registered => "registered",
            Self::RejectedByLecturer => "rejected_by_lecturer",
            Self::RejectedByExamOfficer => "rejected_by_exam_officer",
        }
    }

    /// Whether the registration still occupies the student's slot for the
    /// offering.
    pub const fn is_active(self) -> bool {
        !self.is_rejection()
    }

    /// Whether this is one of the terminal rejection states.
    pub const fn is_rejection(self) -> bool {
        matches!(self, Self::RejectedByLecturer | Self::RejectedByExamOfficer)
    }

    /// Gate owning the step from `self` to `to`, or `None` when the step is
    /// not part of the workflow.
    ///
    /// # Examples
    /// ```
    /// use college_backend::domain::{Gate, RegistrationStatus};
    ///
    /// assert_eq!(
    ///     RegistrationStatus::Pending.gate_for(RegistrationStatus::LecturerApproved),
    ///     Some(Gate::OfferingLecturer)
    /// );
    /// assert_eq!(
    ///     RegistrationStatus::Pending.gate_for(RegistrationStatus::Registered),
    ///     None
    /// );
    /// ```
    pub const fn gate_for(self, to: Self) -> Option<Gate> {
        match (self, to) {
            (Self::Pending, Self::LecturerApproved | Self::RejectedByLecturer) => {
                Some(Gate::OfferingLecturer)
            }
            (Self::LecturerApproved, Self::Registered | Self::RejectedByExamOfficer) => {
                Some(Gate::ExamOfficer)
            }
            _ => None,
        }
    }
}

impl fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown registration status `{0}`")]
pub struct UnknownRegistrationStatus(pub String);

impl FromStr for RegistrationStatus {
    type Err = UnknownRegistrationStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| UnknownRegistrationStatus(s.to_owned()))
    }
}

/// Who moved a registration and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Acting principal.
    pub by: PrincipalId,
    /// Time the decision was applied.
    pub at: DateTime<Utc>,
}

/// A student's request for a seat in one offering.
///
/// ## Invariants
/// - `lecturer_decision` is set once the status leaves `pending`.
/// - `exam_officer_decision` is set only for `registered` and
///   `rejected_by_exam_officer`.
/// - `rejection_reason` is set exactly for the rejection states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRegistration {
    /// Registration identifier.
    pub id: RegistrationId,
    /// Requesting student.
    pub student: StudentId,
    /// Target offering.
    pub offering: OfferingId,
    /// Term of the offering.
    pub term: Term,
    /// Current status.
    pub status: RegistrationStatus,
    /// Whether the tuition check was waived at finalisation.
    pub payment_waived: bool,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// Submission time.
    pub submitted_at: DateTime<Utc>,
    /// Lecturer approval or rejection.
    pub lecturer_decision: Option<Decision>,
    /// Exam officer finalisation or rejection.
    pub exam_officer_decision: Option<Decision>,
}

impl CourseRegistration {
    /// Create a pending registration.
    pub fn submit(
        id: RegistrationId,
        student: StudentId,
        offering: OfferingId,
        term: Term,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            student,
            offering,
            term,
            status: RegistrationStatus::Pending,
            payment_waived: false,
            rejection_reason: None,
            submitted_at,
            lecturer_decision: None,
            exam_officer_decision: None,
        }
    }

    /// Return the registration as it looks after `change` is applied.
    ///
    /// Callers check the transition table first; this only records the
    /// outcome on the right decision slot.
    pub fn with_change(mut self, change: &StatusChange) -> Self {
        let decision = Some(Decision {
            by: change.by,
            at: change.at,
        });
        match change.to {
            RegistrationStatus::LecturerApproved | RegistrationStatus::RejectedByLecturer => {
                self.lecturer_decision = decision;
            }
            RegistrationStatus::Registered | RegistrationStatus::RejectedByExamOfficer => {
                self.exam_officer_decision = decision;
            }
            RegistrationStatus::Pending => {}
        }
        self.status = change.to;
        self.rejection_reason.clone_from(&change.reason);
        self
    }
}

/// A requested status change, applied by the repository with
/// compare-and-set on the expected current status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Target status.
    pub to: RegistrationStatus,
    /// Acting principal.
    pub by: PrincipalId,
    /// Time of the decision.
    pub at: DateTime<Utc>,
    /// Rejection reason, required for rejection targets.
    pub reason: Option<String>,
}

/// Scope over which waived finalisations are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaiverScope {
    /// Count waived registrations within the offering's term.
    #[default]
    PerTerm,
    /// Count waived registrations across the student's whole record.
    Lifetime,
}

/// Error returned when parsing an unknown waiver scope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("waiver scope must be `per_term` or `lifetime`, got `{0}`")]
pub struct UnknownWaiverScope(pub String);

impl FromStr for WaiverScope {
    type Err = UnknownWaiverScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_term" | "term" => Ok(Self::PerTerm),
            "lifetime" => Ok(Self::Lifetime),
            other => Err(UnknownWaiverScope(other.to_owned())),
        }
    }
}

/// Tunables for the registration workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationPolicy {
    /// Registrations per student allowed to finalise without paid tuition.
    pub waiver_limit: u32,
    /// How waived registrations are counted.
    pub waiver_scope: WaiverScope,
    /// Maximum active registrations per student per term.
    pub course_load_limit: u32,
}

impl Default for RegistrationPolicy {
    fn default() -> Self {
        Self {
            waiver_limit: 2,
            waiver_scope: WaiverScope::PerTerm,
            course_load_limit: 15,
        }
    }
}

/// Instruction passed to the repository for the final transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalization {
    /// Status change to apply (`registered`).
    pub change: StatusChange,
    /// `None` when tuition is paid; otherwise the waiver budget to consume.
    pub waiver: Option<WaiverAllowance>,
}

/// Waiver budget checked atomically with the final transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaiverAllowance {
    /// Maximum waived registrations.
    pub limit: u32,
    /// Counting scope.
    pub scope: WaiverScope,
}

/// Counts per status for one student's term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSummary {
    /// Registrations awaiting the lecturer.
    pub pending: u32,
    /// Registrations awaiting the exam officer.
    pub lecturer_approved: u32,
    /// Finalised registrations.
    pub registered: u32,
    /// Rejected registrations of either kind.
    pub rejected: u32,
    /// Finalised registrations that used the payment waiver.
    pub payment_waived: u32,
}

impl RegistrationSummary {
    /// Tally a set of registrations.
    pub fn tally<'a>(registrations: impl IntoIterator<Item = &'a CourseRegistration>) -> Self {
        registrations
            .into_iter()
            .fold(Self::default(), |mut summary, registration| {
                match registration.status {
                    RegistrationStatus::Pending => summary.pending += 1,
                    RegistrationStatus::LecturerApproved => summary.lecturer_approved += 1,
                    RegistrationStatus::Registered => summary.registered += 1,
                    RegistrationStatus::RejectedByLecturer
                    | RegistrationStatus::RejectedByExamOfficer => summary.rejected += 1,
                }
                if registration.payment_waived {
                    summary.payment_waived += 1;
                }
                summary
            })
    }
}
