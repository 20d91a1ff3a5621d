//! Domain primitives, aggregates, and workflow services.
//!
//! Purpose: model the college's identity directory, course catalogue,
//! registration and grade approval chains, and the fee ledger without
//! knowledge of HTTP, SQL, or the payment gateway's wire format. Inbound
//! adapters call the driving ports in [`ports`]; outbound adapters implement
//! the driven ones.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic failure payload.
//! - authorize (alias to `access::authorize`): the single capability check.
//! - Principal, Role: the acting identity and its fixed role.
//! - CourseRegistration, GradeRecord, Invoice, Payment: workflow records.
//! - RegistrationService, GradingService, LedgerService: workflow services.

pub mod academic;
pub mod access;
pub mod auth;
pub mod catalogue;
pub mod catalogue_service;
pub mod error;
pub mod grading;
pub mod grading_service;
pub mod identity;
pub mod ids;
pub mod ledger;
pub mod ledger_service;
pub mod ports;
pub mod principal_service;
pub mod registration;
pub mod registration_service;
pub mod standing;
pub mod trace_id;

#[cfg(test)]
pub(crate) mod fixtures;

pub use self::academic::{
    AcademicSession, AcademicValidationError, CourseCode, CreditUnits, DepartmentCode, Level,
    Semester, Term,
};
pub use self::access::{Action, Gate, Resource, authorize};
pub use self::auth::{LoginCredentials, LoginValidationError, MalformedDigest, PasswordDigest};
pub use self::catalogue::{CourseOffering, OfferingDraft, OfferingValidationError};
pub use self::catalogue_service::CatalogueService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::grading::{
    GradeLetter, GradeRecord, GradeStage, GradingError, GradingScale, ScoreBreakdown,
    StageChange, StageHistory,
};
pub use self::grading_service::{GradingService, GradingServicePorts};
pub use self::identity::{
    Affiliation, LecturerProfile, Principal, PrincipalDraft, PrincipalValidationError, Role,
    StudentProfile,
};
pub use self::ids::{
    FeeStructureId, GradeRecordId, IdParseError, InvoiceId, LecturerId, OfferingId, PaymentId,
    PrincipalId, RegistrationId, StudentId,
};
pub use self::ledger::{
    FeeComponents, FeeStructure, FeeStructureDraft, Invoice, InvoiceStatus, LedgerSummary,
    LedgerValidationError, Money, Payment, PaymentReference, PaymentStatus, PaymentTotals,
    receipt_number,
};
pub use self::ledger_service::{LedgerService, LedgerServicePorts};
pub use self::principal_service::PrincipalDirectoryService;
pub use self::registration::{
    CourseRegistration, Decision, Finalization, RegistrationPolicy, RegistrationStatus,
    RegistrationSummary, StatusChange, UnknownRegistrationStatus, UnknownWaiverScope,
    WaiverAllowance, WaiverScope,
};
pub use self::registration_service::{RegistrationService, RegistrationServicePorts};
pub use self::standing::{AcademicStanding, Classification, TermGpa};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
