//! Central capability check.
//!
//! Every workflow action passes through [`authorize`], which decides from
//! the principal's role and its ownership of the resource alone. Workflow
//! transition tables name the [`Gate`] that owns each step; the gate is then
//! checked here like any other action.

use serde_json::json;

use super::academic::DepartmentCode;
use super::catalogue::CourseOffering;
use super::error::Error;
use super::identity::{Principal, Role, StudentProfile};

/// Approval gate owning a workflow transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// The lecturer teaching the offering.
    OfferingLecturer,
    /// The head of the offering's department.
    DepartmentHead,
    /// Any exam officer.
    ExamOfficer,
    /// Any registrar.
    Registrar,
}

impl Gate {
    /// Stable label for logs and error details.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OfferingLecturer => "offering_lecturer",
            Self::DepartmentHead => "department_head",
            Self::ExamOfficer => "exam_officer",
            Self::Registrar => "registrar",
        }
    }
}

/// Operations subject to authorisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Create principals and assign their role.
    RegisterPrincipal,
    /// Open course offerings.
    ManageOfferings,
    /// Request a seat in an offering.
    SubmitRegistration,
    /// Pass a workflow approval gate.
    PassGate(Gate),
    /// Read registrations and grade sheets for an offering.
    ViewOfferingRecords,
    /// Read a student's academic record.
    ViewStudentRecord,
    /// Define fee structures.
    DefineFeeStructure,
    /// Generate an invoice for a student.
    GenerateInvoice,
    /// Read a student's invoices and tuition status.
    ViewFinance,
    /// Start a gateway payment.
    InitiatePayment,
    /// Ask the gateway to confirm a payment.
    ReconcilePayment,
    /// Read term-wide ledger totals.
    ViewLedgerSummary,
}

impl Action {
    fn label(self) -> &'static str {
        match self {
            Self::RegisterPrincipal => "register_principal",
            Self::ManageOfferings => "manage_offerings",
            Self::SubmitRegistration => "submit_registration",
            Self::PassGate(gate) => gate.as_str(),
            Self::ViewOfferingRecords => "view_offering_records",
            Self::ViewStudentRecord => "view_student_record",
            Self::DefineFeeStructure => "define_fee_structure",
            Self::GenerateInvoice => "generate_invoice",
            Self::ViewFinance => "view_finance",
            Self::InitiatePayment => "initiate_payment",
            Self::ReconcilePayment => "reconcile_payment",
            Self::ViewLedgerSummary => "view_ledger_summary",
        }
    }
}

/// The record an action targets.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    /// Institution-wide operations.
    Institution,
    /// Operations scoped to one department.
    Department(&'a DepartmentCode),
    /// Operations on one offering.
    Offering(&'a CourseOffering),
    /// Operations on one student's records.
    Student(&'a StudentProfile),
}

/// Decide whether `principal` may perform `action` on `resource`.
///
/// Returns [`crate::domain::ErrorCode::Forbidden`] when the role or
/// ownership does not match.
///
/// # Examples
/// ```
/// use college_backend::domain::{
///     authorize, Action, Affiliation, Principal, PrincipalDraft, PrincipalId, Resource, Role,
/// };
///
/// let bursar = Principal::try_new(PrincipalDraft {
///     id: PrincipalId::random(),
///     username: "bursar".into(),
///     full_name: "B. Ursar".into(),
///     email: "bursar@college.test".into(),
///     role: Role::Bursar,
///     affiliation: Affiliation::None,
/// })
/// .unwrap();
/// assert!(authorize(&bursar, Action::DefineFeeStructure, Resource::Institution).is_ok());
/// assert!(authorize(&bursar, Action::RegisterPrincipal, Resource::Institution).is_err());
/// ```
pub fn authorize(
    principal: &Principal,
    action: Action,
    resource: Resource<'_>,
) -> Result<(), Error> {
    if permits(principal, action, resource) {
        Ok(())
    } else {
        Err(Error::forbidden(format!(
            "role {} may not perform {}",
            principal.role(),
            action.label()
        ))
        .with_details(json!({
            "code": "role_mismatch",
            "role": principal.role().as_str(),
            "action": action.label(),
        })))
    }
}

fn permits(principal: &Principal, action: Action, resource: Resource<'_>) -> bool {
    let role = principal.role();
    match action {
        Action::RegisterPrincipal => matches!(role, Role::SuperAdmin | Role::Ict),
        Action::ManageOfferings => match role {
            Role::SuperAdmin | Role::Registrar => true,
            Role::Hod => heads(principal, department_of(resource)),
            _ => false,
        },
        Action::SubmitRegistration => owns_student(principal, resource),
        Action::PassGate(gate) => passes_gate(principal, gate, resource),
        Action::ViewOfferingRecords => match role {
            Role::SuperAdmin | Role::ExamOfficer | Role::Registrar => true,
            Role::Lecturer => teaches(principal, resource),
            Role::Hod => heads(principal, department_of(resource)),
            _ => false,
        },
        Action::ViewStudentRecord => match role {
            Role::Student => owns_student(principal, resource),
            Role::SuperAdmin | Role::ExamOfficer | Role::Registrar | Role::DeskOfficer => true,
            Role::Hod => heads(principal, department_of(resource)),
            _ => false,
        },
        Action::DefineFeeStructure | Action::ViewLedgerSummary => {
            matches!(role, Role::SuperAdmin | Role::Bursar)
        }
        Action::GenerateInvoice | Action::ReconcilePayment => match role {
            Role::Student => owns_student(principal, resource),
            Role::SuperAdmin | Role::Bursar => true,
            _ => false,
        },
        Action::ViewFinance => match role {
            Role::Student => owns_student(principal, resource),
            Role::SuperAdmin
            | Role::Bursar
            | Role::DeskOfficer
            | Role::Registrar
            | Role::ExamOfficer => true,
            _ => false,
        },
        Action::InitiatePayment => owns_student(principal, resource),
    }
}

fn passes_gate(principal: &Principal, gate: Gate, resource: Resource<'_>) -> bool {
    match (gate, principal.role()) {
        (Gate::OfferingLecturer, Role::Lecturer) => teaches(principal, resource),
        (Gate::DepartmentHead, Role::Hod) => heads(principal, department_of(resource)),
        (Gate::ExamOfficer, Role::ExamOfficer) | (Gate::Registrar, Role::Registrar) => true,
        _ => false,
    }
}

fn department_of<'a>(resource: Resource<'a>) -> Option<&'a DepartmentCode> {
    match resource {
        Resource::Institution => None,
        Resource::Department(department) => Some(department),
        Resource::Offering(offering) => Some(&offering.department),
        Resource::Student(student) => Some(&student.department),
    }
}

fn heads(principal: &Principal, department: Option<&DepartmentCode>) -> bool {
    matches!(
        (principal.headed_department(), department),
        (Some(headed), Some(target)) if headed == target
    )
}

fn teaches(principal: &Principal, resource: Resource<'_>) -> bool {
    match (principal.lecturer(), resource) {
        (Some(lecturer), Resource::Offering(offering)) => lecturer.id == offering.lecturer,
        _ => false,
    }
}

fn owns_student(principal: &Principal, resource: Resource<'_>) -> bool {
    match (principal.student(), resource) {
        (Some(own), Resource::Student(target)) => own.id == target.id,
        _ => false,
    }
}

#[cfg(test)]
mod tests;
