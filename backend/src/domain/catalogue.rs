//! Course offerings: a course taught in one term with finite capacity.

use serde::{Deserialize, Serialize};

use super::academic::{CourseCode, CreditUnits, DepartmentCode, Term};
use super::ids::{LecturerId, OfferingId};

/// Validation failures for offering drafts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OfferingValidationError {
    /// Title was blank.
    #[error("title must not be empty")]
    EmptyTitle,
    /// A course listed itself as a prerequisite.
    #[error("course {0} cannot be its own prerequisite")]
    SelfPrerequisite(CourseCode),
}

/// Fields supplied when academic staff open an offering.
#[derive(Debug, Clone)]
pub struct OfferingDraft {
    /// Course code.
    pub code: CourseCode,
    /// Course title.
    pub title: String,
    /// Credit weight.
    pub credit_units: CreditUnits,
    /// Owning department.
    pub department: DepartmentCode,
    /// Term the course runs in.
    pub term: Term,
    /// Teaching lecturer.
    pub lecturer: LecturerId,
    /// Maximum number of registered students.
    pub capacity: u32,
    /// Courses that must be passed first.
    pub prerequisites: Vec<CourseCode>,
}

/// A course taught in a specific term.
///
/// ## Invariants
/// - `enrolled_count <= capacity`.
/// - Only the final registration transition changes `enrolled_count`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOffering {
    /// Offering identifier.
    pub id: OfferingId,
    /// Course code.
    pub code: CourseCode,
    /// Course title.
    pub title: String,
    /// Credit weight.
    pub credit_units: CreditUnits,
    /// Owning department.
    pub department: DepartmentCode,
    /// Term the course runs in.
    pub term: Term,
    /// Teaching lecturer.
    pub lecturer: LecturerId,
    /// Maximum number of registered students.
    pub capacity: u32,
    /// Students currently registered.
    pub enrolled_count: u32,
    /// Courses that must be passed first.
    pub prerequisites: Vec<CourseCode>,
}

impl CourseOffering {
    /// Open a new offering with no enrolments.
    pub fn open(id: OfferingId, draft: OfferingDraft) -> Result<Self, OfferingValidationError> {
        let OfferingDraft {
            code,
            title,
            credit_units,
            department,
            term,
            lecturer,
            capacity,
            mut prerequisites,
        } = draft;

        let title = title.trim().to_owned();
        if title.is_empty() {
            return Err(OfferingValidationError::EmptyTitle);
        }
        if prerequisites.contains(&code) {
            return Err(OfferingValidationError::SelfPrerequisite(code));
        }
        prerequisites.sort();
        prerequisites.dedup();

        Ok(Self {
            id,
            code,
            title,
            credit_units,
            department,
            term,
            lecturer,
            capacity,
            enrolled_count: 0,
            prerequisites,
        })
    }

    /// Seats still available.
    pub fn seats_remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.enrolled_count)
    }

    /// Whether at least one seat is free.
    pub fn has_free_seat(&self) -> bool {
        self.enrolled_count < self.capacity
    }
}
