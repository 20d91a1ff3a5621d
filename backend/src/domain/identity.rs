//! Identity and role directory model.
//!
//! A [`Principal`] holds exactly one [`Role`]. Students and lecturers carry
//! a profile linking them to their department; heads of department carry
//! the department they head. The pairing of role and affiliation is
//! validated once at construction and never changes afterwards.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::academic::{DepartmentCode, Level};
use super::ids::{LecturerId, PrincipalId, StudentId};

/// Fixed role enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Enrolled student.
    Student,
    /// Teaching staff.
    Lecturer,
    /// Head of department.
    Hod,
    /// Examinations officer.
    ExamOfficer,
    /// Registrar.
    Registrar,
    /// Bursar.
    Bursar,
    /// Front desk officer.
    DeskOfficer,
    /// IT officer.
    Ict,
    /// Super administrator.
    SuperAdmin,
}

impl Role {
    /// All roles in declaration order.
    pub const ALL: [Role; 9] = [
        Role::Student,
        Role::Lecturer,
        Role::Hod,
        Role::ExamOfficer,
        Role::Registrar,
        Role::Bursar,
        Role::DeskOfficer,
        Role::Ict,
        Role::SuperAdmin,
    ];

    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Lecturer => "lecturer",
            Self::Hod => "hod",
            Self::ExamOfficer => "exam_officer",
            Self::Registrar => "registrar",
            Self::Bursar => "bursar",
            Self::DeskOfficer => "desk_officer",
            Self::Ict => "ict",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = PrincipalValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == wanted)
            .ok_or_else(|| PrincipalValidationError::UnknownRole(wanted.to_owned()))
    }
}

/// Validation failures for principals.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrincipalValidationError {
    /// Role string is not one of the enumerated roles.
    #[error("unknown role `{0}`")]
    UnknownRole(String),
    /// Username was blank.
    #[error("username must not be empty")]
    EmptyUsername,
    /// Full name was blank.
    #[error("full name must not be empty")]
    EmptyFullName,
    /// Email did not look like an address.
    #[error("email must contain a local part and a domain")]
    InvalidEmail,
    /// Matric number was blank.
    #[error("matric number must not be empty")]
    EmptyMatricNumber,
    /// Affiliation does not fit the role.
    #[error("role {role} requires {expected}")]
    AffiliationMismatch {
        /// Role being assigned.
        role: Role,
        /// Description of the affiliation the role needs.
        expected: &'static str,
    },
}

/// Student profile linked to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    /// Student identifier.
    pub id: StudentId,
    /// Matriculation number.
    pub matric_number: String,
    /// Home department.
    pub department: DepartmentCode,
    /// Current level of study.
    pub level: Level,
}

/// Lecturer profile linked to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LecturerProfile {
    /// Lecturer identifier.
    pub id: LecturerId,
    /// Department the lecturer teaches in.
    pub department: DepartmentCode,
}

/// Link between a principal and the academic structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Affiliation {
    /// No academic link (administrative roles).
    None,
    /// Student profile.
    Student(StudentProfile),
    /// Lecturer profile.
    Lecturer(LecturerProfile),
    /// Department headed by an HOD.
    Department {
        /// Department code.
        department: DepartmentCode,
    },
}

/// Unvalidated principal fields supplied by an administrator.
#[derive(Debug, Clone)]
pub struct PrincipalDraft {
    /// Identifier to assign.
    pub id: PrincipalId,
    /// Login name.
    pub username: String,
    /// Display name.
    pub full_name: String,
    /// Contact email, also used for gateway receipts.
    pub email: String,
    /// Role to assign.
    pub role: Role,
    /// Academic link.
    pub affiliation: Affiliation,
}

/// An authenticated actor with exactly one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: PrincipalId,
    username: String,
    full_name: String,
    email: String,
    role: Role,
    affiliation: Affiliation,
}

impl Principal {
    /// Validate a draft into a principal.
    ///
    /// # Examples
    /// ```
    /// use college_backend::domain::{Affiliation, Principal, PrincipalDraft, PrincipalId, Role};
    ///
    /// let principal = Principal::try_new(PrincipalDraft {
    ///     id: PrincipalId::random(),
    ///     username: " bursar ".into(),
    ///     full_name: "Ada Obi".into(),
    ///     email: "bursar@college.test".into(),
    ///     role: Role::Bursar,
    ///     affiliation: Affiliation::None,
    /// })
    /// .unwrap();
    /// assert_eq!(principal.username(), "bursar");
    /// ```
    pub fn try_new(draft: PrincipalDraft) -> Result<Self, PrincipalValidationError> {
        let PrincipalDraft {
            id,
            username,
            full_name,
            email,
            role,
            affiliation,
        } = draft;

        let username = username.trim().to_owned();
        if username.is_empty() {
            return Err(PrincipalValidationError::EmptyUsername);
        }
        let full_name = full_name.trim().to_owned();
        if full_name.is_empty() {
            return Err(PrincipalValidationError::EmptyFullName);
        }
        let email = email.trim().to_owned();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(PrincipalValidationError::InvalidEmail),
        }
        validate_affiliation(role, &affiliation)?;

        Ok(Self {
            id,
            username,
            full_name,
            email,
            role,
            affiliation,
        })
    }

    /// Principal identifier.
    pub fn id(&self) -> PrincipalId {
        self.id
    }

    /// Login name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Display name.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Contact email.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Assigned role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Academic link.
    pub fn affiliation(&self) -> &Affiliation {
        &self.affiliation
    }

    /// Student profile when the principal is a student.
    pub fn student(&self) -> Option<&StudentProfile> {
        match &self.affiliation {
            Affiliation::Student(profile) => Some(profile),
            _ => None,
        }
    }

    /// Lecturer profile when the principal is a lecturer.
    pub fn lecturer(&self) -> Option<&LecturerProfile> {
        match &self.affiliation {
            Affiliation::Lecturer(profile) => Some(profile),
            _ => None,
        }
    }

    /// Department headed by an HOD.
    pub fn headed_department(&self) -> Option<&DepartmentCode> {
        match &self.affiliation {
            Affiliation::Department { department } if self.role == Role::Hod => Some(department),
            _ => None,
        }
    }
}

fn validate_affiliation(
    role: Role,
    affiliation: &Affiliation,
) -> Result<(), PrincipalValidationError> {
    let mismatch = |expected| PrincipalValidationError::AffiliationMismatch { role, expected };
    match (role, affiliation) {
        (Role::Student, Affiliation::Student(profile)) => {
            if profile.matric_number.trim().is_empty() {
                return Err(PrincipalValidationError::EmptyMatricNumber);
            }
            Ok(())
        }
        (Role::Student, _) => Err(mismatch("a student profile")),
        (Role::Lecturer, Affiliation::Lecturer(_)) => Ok(()),
        (Role::Lecturer, _) => Err(mismatch("a lecturer profile")),
        (Role::Hod, Affiliation::Department { .. }) => Ok(()),
        (Role::Hod, _) => Err(mismatch("a department")),
        (_, Affiliation::None) => Ok(()),
        (_, _) => Err(mismatch("no academic affiliation")),
    }
}
