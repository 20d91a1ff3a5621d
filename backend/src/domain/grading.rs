//! Grade records, the score-to-letter scale, and the approval chain.
//!
//! Scores are exact decimals with two places. The letter and grade points
//! are derived whenever the score changes and never stored independently of
//! it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::academic::{CourseCode, CreditUnits, Term};
use super::access::Gate;
use super::catalogue::CourseOffering;
use super::ids::{GradeRecordId, OfferingId, PrincipalId, StudentId};
use super::registration::Decision;

/// Letter grade on the five-pass-band scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GradeLetter {
    /// Excellent.
    A,
    /// Very good.
    B,
    /// Good.
    C,
    /// Fair.
    D,
    /// Pass.
    E,
    /// Fail.
    F,
}

impl GradeLetter {
    /// Every letter from best to worst.
    pub const ALL: [Self; 6] = [Self::A, Self::B, Self::C, Self::D, Self::E, Self::F];

    /// Grade points on the 4.0 scale.
    pub fn points(self) -> Decimal {
        match self {
            Self::A => Decimal::new(40, 1),
            Self::B => Decimal::new(30, 1),
            Self::C => Decimal::new(20, 1),
            Self::D => Decimal::new(10, 1),
            Self::E => Decimal::new(5, 1),
            Self::F => Decimal::ZERO,
        }
    }

    /// Whether the letter satisfies a prerequisite (`A` to `D`).
    pub const fn satisfies_prerequisite(self) -> bool {
        matches!(self, Self::A | Self::B | Self::C | Self::D)
    }

    /// Single-letter wire form.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        }
    }
}

impl fmt::Display for GradeLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeLetter {
    type Err = GradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|letter| letter.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| GradingError::UnknownLetter(s.to_owned()))
    }
}

/// Validation failures for scores, scales, and stages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradingError {
    /// A score component was negative.
    #[error("{component} must not be negative")]
    NegativeComponent {
        /// Offending component.
        component: &'static str,
    },
    /// A score component had more than two decimal places.
    #[error("{component} must have at most two decimal places")]
    TooPrecise {
        /// Offending component.
        component: &'static str,
    },
    /// Continuous assessment plus exam exceeded 100.
    #[error("total score must not exceed 100, got {total}")]
    TotalOutOfRange {
        /// Computed total.
        total: Decimal,
    },
    /// Scale thresholds were not strictly descending within 0..=100.
    #[error("grade thresholds must be five strictly descending values between 0 and 100")]
    InvalidScale,
    /// Letter string was not recognised.
    #[error("unknown grade letter `{0}`")]
    UnknownLetter(String),
    /// Stage string was not recognised.
    #[error("unknown grade stage `{0}`")]
    UnknownStage(String),
}

/// Score split into continuous assessment and examination.
///
/// ## Invariants
/// - Both components are non-negative with at most two decimal places.
/// - `continuous_assessment + exam <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    continuous_assessment: Decimal,
    exam: Decimal,
}

const MAX_TOTAL: Decimal = Decimal::ONE_HUNDRED;

impl ScoreBreakdown {
    /// Validate a score.
    ///
    /// # Examples
    /// ```
    /// use college_backend::domain::ScoreBreakdown;
    /// use rust_decimal::Decimal;
    ///
    /// let score = ScoreBreakdown::try_new(Decimal::new(25, 0), Decimal::new(5050, 2)).unwrap();
    /// assert_eq!(score.total(), Decimal::new(7550, 2));
    /// ```
    pub fn try_new(continuous_assessment: Decimal, exam: Decimal) -> Result<Self, GradingError> {
        check_component("continuousAssessment", continuous_assessment)?;
        check_component("exam", exam)?;
        let total = continuous_assessment + exam;
        if total > MAX_TOTAL {
            return Err(GradingError::TotalOutOfRange { total });
        }
        Ok(Self {
            continuous_assessment: continuous_assessment.normalize(),
            exam: exam.normalize(),
        })
    }

    /// Rebuild a stored score from integer hundredths.
    pub fn from_hundredths(continuous_assessment: i32, exam: i32) -> Result<Self, GradingError> {
        Self::try_new(
            Decimal::new(i64::from(continuous_assessment), 2),
            Decimal::new(i64::from(exam), 2),
        )
    }

    /// Integer hundredths for storage.
    pub fn to_hundredths(self) -> (i32, i32) {
        (hundredths(self.continuous_assessment), hundredths(self.exam))
    }

    /// Continuous assessment component.
    pub fn continuous_assessment(self) -> Decimal {
        self.continuous_assessment
    }

    /// Examination component.
    pub fn exam(self) -> Decimal {
        self.exam
    }

    /// Total out of 100.
    pub fn total(self) -> Decimal {
        self.continuous_assessment + self.exam
    }
}

fn check_component(component: &'static str, value: Decimal) -> Result<(), GradingError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(GradingError::NegativeComponent { component });
    }
    if value.normalize().scale() > 2 {
        return Err(GradingError::TooPrecise { component });
    }
    Ok(())
}

fn hundredths(value: Decimal) -> i32 {
    // Components are bounded by 100.00, so the scaled value always fits.
    (value * Decimal::ONE_HUNDRED).to_i32().unwrap_or(i32::MAX)
}

/// Score-to-letter table.
///
/// Holds the lower bound of each band from `A` to `E`; anything below the
/// `E` bound is `F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradingScale {
    thresholds: [Decimal; 5],
}

impl GradingScale {
    /// Build a scale from the `A`..`E` lower bounds.
    pub fn try_new(thresholds: [Decimal; 5]) -> Result<Self, GradingError> {
        let in_range = thresholds
            .iter()
            .all(|t| *t > Decimal::ZERO && *t <= MAX_TOTAL);
        let descending = thresholds.windows(2).all(|pair| pair[0] > pair[1]);
        if !in_range || !descending {
            return Err(GradingError::InvalidScale);
        }
        Ok(Self { thresholds })
    }

    /// Parse a comma-separated list such as `70,60,50,45,40`.
    pub fn parse(raw: &str) -> Result<Self, GradingError> {
        let values = raw
            .split(',')
            .map(|part| Decimal::from_str(part.trim()).map_err(|_| GradingError::InvalidScale))
            .collect::<Result<Vec<_>, _>>()?;
        let thresholds: [Decimal; 5] = values
            .try_into()
            .map_err(|_| GradingError::InvalidScale)?;
        Self::try_new(thresholds)
    }

    /// Letter for a total score.
    pub fn letter_for(&self, total: Decimal) -> GradeLetter {
        GradeLetter::ALL
            .into_iter()
            .zip(self.thresholds)
            .find(|(_, threshold)| total >= *threshold)
            .map_or(GradeLetter::F, |(letter, _)| letter)
    }
}

impl Default for GradingScale {
    fn default() -> Self {
        Self {
            thresholds: [
                Decimal::from(70),
                Decimal::from(60),
                Decimal::from(50),
                Decimal::from(45),
                Decimal::from(40),
            ],
        }
    }
}

/// Stage of a grade record in the approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeStage {
    /// Editable by the lecturer.
    Draft,
    /// Awaiting the head of department.
    Submitted,
    /// Awaiting the exam officer.
    HodApproved,
    /// Awaiting the registrar.
    Verified,
    /// Visible to the student; immutable.
    Published,
    /// Terminal: sent back; the lecturer starts a fresh draft.
    Rejected,
}

impl GradeStage {
    /// Every stage in chain order.
    pub const ALL: [Self; 6] = [
        Self::Draft,
        Self::Submitted,
        Self::HodApproved,
        Self::Verified,
        Self::Published,
        Self::Rejected,
    ];

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::HodApproved => "hod_approved",
            Self::Verified => "verified",
            Self::Published => "published",
            Self::Rejected => "rejected",
        }
    }

    /// Gate owning the step from `self` to `to`.
    pub const fn gate_for(self, to: Self) -> Option<Gate> {
        match (self, to) {
            (Self::Draft, Self::Submitted) => Some(Gate::OfferingLecturer),
            (Self::Submitted, Self::HodApproved | Self::Rejected) => Some(Gate::DepartmentHead),
            (Self::HodApproved, Self::Verified | Self::Rejected) => Some(Gate::ExamOfficer),
            (Self::Verified, Self::Published | Self::Rejected) => Some(Gate::Registrar),
            _ => None,
        }
    }
}

impl fmt::Display for GradeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GradeStage {
    type Err = GradingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s.trim())
            .ok_or_else(|| GradingError::UnknownStage(s.to_owned()))
    }
}

/// Requested stage change, applied with compare-and-set on the current
/// stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageChange {
    /// Target stage.
    pub to: GradeStage,
    /// Acting principal.
    pub by: PrincipalId,
    /// Time of the change.
    pub at: DateTime<Utc>,
    /// Reason, required when rejecting.
    pub reason: Option<String>,
}

/// Stage stamps recorded as a record moves through the chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageHistory {
    /// Lecturer submission.
    pub submitted: Option<Decision>,
    /// HOD approval.
    pub hod_approved: Option<Decision>,
    /// Exam officer verification.
    pub verified: Option<Decision>,
    /// Registrar publication.
    pub published: Option<Decision>,
    /// Rejection at any gate.
    pub rejected: Option<Decision>,
}

/// One student's grade for one offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeRecord {
    /// Record identifier.
    pub id: GradeRecordId,
    /// Graded student.
    pub student: StudentId,
    /// Offering graded.
    pub offering: OfferingId,
    /// Course code of the offering.
    pub course: CourseCode,
    /// Credit weight used for GPA.
    pub credit_units: CreditUnits,
    /// Term of the offering.
    pub term: Term,
    /// Raw score.
    pub score: ScoreBreakdown,
    /// Letter derived from the score.
    pub letter: GradeLetter,
    /// Points derived from the letter.
    pub points: Decimal,
    /// Current stage.
    pub stage: GradeStage,
    /// Reason recorded on rejection.
    pub rejection_reason: Option<String>,
    /// Lecturer who last entered the score.
    pub entered_by: PrincipalId,
    /// Time the score was last entered.
    pub entered_at: DateTime<Utc>,
    /// Approval stamps.
    pub history: StageHistory,
}

impl GradeRecord {
    /// Start a draft record for `student` in `offering`.
    pub fn draft(
        id: GradeRecordId,
        offering: &CourseOffering,
        student: StudentId,
        score: ScoreBreakdown,
        scale: &GradingScale,
        by: PrincipalId,
        at: DateTime<Utc>,
    ) -> Self {
        let letter = scale.letter_for(score.total());
        Self {
            id,
            student,
            offering: offering.id,
            course: offering.code.clone(),
            credit_units: offering.credit_units,
            term: offering.term,
            score,
            letter,
            points: letter.points(),
            stage: GradeStage::Draft,
            rejection_reason: None,
            entered_by: by,
            entered_at: at,
            history: StageHistory::default(),
        }
    }

    /// Replace the score of a draft and re-derive the letter.
    pub fn rescore(
        mut self,
        score: ScoreBreakdown,
        scale: &GradingScale,
        by: PrincipalId,
        at: DateTime<Utc>,
    ) -> Self {
        self.letter = scale.letter_for(score.total());
        self.points = self.letter.points();
        self.score = score;
        self.entered_by = by;
        self.entered_at = at;
        self
    }

    /// Return the record as it looks after `change`.
    pub fn with_stage(mut self, change: &StageChange) -> Self {
        let stamp = Some(Decision {
            by: change.by,
            at: change.at,
        });
        match change.to {
            GradeStage::Submitted => self.history.submitted = stamp,
            GradeStage::HodApproved => self.history.hod_approved = stamp,
            GradeStage::Verified => self.history.verified = stamp,
            GradeStage::Published => self.history.published = stamp,
            GradeStage::Rejected => self.history.rejected = stamp,
            GradeStage::Draft => {}
        }
        self.stage = change.to;
        self.rejection_reason.clone_from(&change.reason);
        self
    }

    /// Weighted points contributed to a GPA.
    pub fn quality_points(&self) -> Decimal {
        self.points * Decimal::from(self.credit_units.value())
    }
}
