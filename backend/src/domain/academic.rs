//! Academic calendar and catalogue primitives.
//!
//! Every value here is validated on construction so workflows can rely on
//! well-formed department codes, levels, sessions, and course codes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Validation failures for academic primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcademicValidationError {
    /// Department code was blank or not alphanumeric.
    #[error("department code must be 2-10 letters or digits")]
    InvalidDepartment,
    /// Level was not a positive multiple of 100 up to 900.
    #[error("level must be a multiple of 100 between 100 and 900")]
    InvalidLevel,
    /// Semester was neither `first` nor `second`.
    #[error("semester must be `first` or `second`")]
    InvalidSemester,
    /// Session was not two consecutive years such as `2024/2025`.
    #[error("session must look like 2024/2025 with consecutive years")]
    InvalidSession,
    /// Course code was blank or not alphanumeric.
    #[error("course code must be 3-12 letters or digits")]
    InvalidCourseCode,
    /// Credit units were outside the supported range.
    #[error("credit units must be between 1 and 12")]
    InvalidCreditUnits,
}

/// Upper-case department code such as `CSC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DepartmentCode(String);

impl DepartmentCode {
    /// Validate and normalise a department code.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AcademicValidationError> {
        let code = raw.as_ref().trim().to_ascii_uppercase();
        let len = code.chars().count();
        if !(2..=10).contains(&len) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AcademicValidationError::InvalidDepartment);
        }
        Ok(Self(code))
    }

    /// Borrow the normalised code.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DepartmentCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DepartmentCode {
    type Error = AcademicValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DepartmentCode> for String {
    fn from(value: DepartmentCode) -> Self {
        value.0
    }
}

/// Year of study expressed as 100, 200, ... 900.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Level(u16);

impl Level {
    /// Validate a level value.
    pub fn new(value: u16) -> Result<Self, AcademicValidationError> {
        if !(100..=900).contains(&value) || value % 100 != 0 {
            return Err(AcademicValidationError::InvalidLevel);
        }
        Ok(Self(value))
    }

    /// Raw numeric level.
    pub const fn value(self) -> u16 {
        self.0
    }
}

impl TryFrom<u16> for Level {
    type Error = AcademicValidationError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Level> for u16 {
    fn from(value: Level) -> Self {
        value.0
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Half of an academic session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semester {
    /// First (harmattan) semester.
    First,
    /// Second (rain) semester.
    Second,
}

impl Semester {
    /// Wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::First => "first",
            Self::Second => "second",
        }
    }
}

impl FromStr for Semester {
    type Err = AcademicValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "second" => Ok(Self::Second),
            _ => Err(AcademicValidationError::InvalidSemester),
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Academic session spanning two consecutive calendar years, e.g. `2024/2025`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AcademicSession {
    start_year: u16,
}

impl AcademicSession {
    /// Build a session from its starting year.
    pub fn starting(start_year: u16) -> Result<Self, AcademicValidationError> {
        if !(1900..=9998).contains(&start_year) {
            return Err(AcademicValidationError::InvalidSession);
        }
        Ok(Self { start_year })
    }

    /// First calendar year of the session.
    pub const fn start_year(self) -> u16 {
        self.start_year
    }
}

impl FromStr for AcademicSession {
    type Err = AcademicValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .trim()
            .split_once('/')
            .ok_or(AcademicValidationError::InvalidSession)?;
        let parse = |part: &str| {
            if part.len() != 4 {
                return Err(AcademicValidationError::InvalidSession);
            }
            part.parse::<u16>()
                .map_err(|_| AcademicValidationError::InvalidSession)
        };
        let start_year = parse(start)?;
        let end_year = parse(end)?;
        if end_year != start_year + 1 {
            return Err(AcademicValidationError::InvalidSession);
        }
        Self::starting(start_year)
    }
}

impl TryFrom<String> for AcademicSession {
    type Error = AcademicValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AcademicSession> for String {
    fn from(value: AcademicSession) -> Self {
        value.to_string()
    }
}

impl fmt::Display for AcademicSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.start_year, self.start_year + 1)
    }
}

/// A session and semester pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Term {
    /// Academic session.
    pub session: AcademicSession,
    /// Semester within the session.
    pub semester: Semester,
}

impl Term {
    /// Pair a session with a semester.
    pub const fn new(session: AcademicSession, semester: Semester) -> Self {
        Self { session, semester }
    }

    /// Parse both halves from their wire forms.
    pub fn parse(session: &str, semester: &str) -> Result<Self, AcademicValidationError> {
        Ok(Self::new(session.parse()?, semester.parse()?))
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.session, self.semester)
    }
}

/// Upper-case course code such as `CSC101`; internal spaces are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CourseCode(String);

impl CourseCode {
    /// Validate and normalise a course code.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, AcademicValidationError> {
        let code: String = raw
            .as_ref()
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let len = code.chars().count();
        if !(3..=12).contains(&len) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AcademicValidationError::InvalidCourseCode);
        }
        Ok(Self(code))
    }

    /// Borrow the normalised code.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CourseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CourseCode {
    type Error = AcademicValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CourseCode> for String {
    fn from(value: CourseCode) -> Self {
        value.0
    }
}

/// Credit weight of a course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct CreditUnits(u8);

impl CreditUnits {
    /// Validate a credit weight.
    pub fn new(value: u8) -> Result<Self, AcademicValidationError> {
        if !(1..=12).contains(&value) {
            return Err(AcademicValidationError::InvalidCreditUnits);
        }
        Ok(Self(value))
    }

    /// Raw credit value.
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for CreditUnits {
    type Error = AcademicValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CreditUnits> for u8 {
    fn from(value: CreditUnits) -> Self {
        value.0
    }
}
