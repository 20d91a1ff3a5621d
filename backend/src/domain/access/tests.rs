//! Capability table coverage.

use super::*;
use crate::domain::ErrorCode;
use crate::domain::fixtures::{
    dept, hod_of, lecturer, lecturer_in, offering_taught_by, staff, student, student_profile,
};
use rstest::rstest;

#[rstest]
#[case(Role::SuperAdmin, true)]
#[case(Role::Ict, true)]
#[case(Role::Registrar, false)]
#[case(Role::Bursar, false)]
#[case(Role::DeskOfficer, false)]
fn only_administrators_register_principals(#[case] role: Role, #[case] allowed: bool) {
    let result = authorize(&staff(role), Action::RegisterPrincipal, Resource::Institution);
    assert_eq!(result.is_ok(), allowed);
}

#[rstest]
fn forbidden_errors_carry_role_and_action() {
    let err = authorize(
        &staff(Role::Bursar),
        Action::PassGate(Gate::Registrar),
        Resource::Institution,
    )
    .expect_err("bursar is not registrar");
    assert_eq!(err.code(), ErrorCode::Forbidden);
    let details = err.details().expect("details");
    assert_eq!(details["role"], "bursar");
    assert_eq!(details["action"], "registrar");
}

#[rstest]
fn only_the_teaching_lecturer_passes_the_lecturer_gate() {
    let tutor = lecturer();
    let colleague = lecturer();
    let offering = offering_taught_by(&tutor, 10, &[]);
    let gate = Action::PassGate(Gate::OfferingLecturer);

    assert!(authorize(&tutor, gate, Resource::Offering(&offering)).is_ok());
    assert!(authorize(&colleague, gate, Resource::Offering(&offering)).is_err());
    assert!(authorize(&staff(Role::SuperAdmin), gate, Resource::Offering(&offering)).is_err());
}

#[rstest]
fn department_head_gate_requires_matching_department() {
    let offering = offering_taught_by(&lecturer_in("CSC"), 10, &[]);
    let gate = Action::PassGate(Gate::DepartmentHead);

    assert!(authorize(&hod_of("CSC"), gate, Resource::Offering(&offering)).is_ok());
    assert!(authorize(&hod_of("MTH"), gate, Resource::Offering(&offering)).is_err());
}

#[rstest]
#[case(Gate::ExamOfficer, Role::ExamOfficer, true)]
#[case(Gate::ExamOfficer, Role::Registrar, false)]
#[case(Gate::Registrar, Role::Registrar, true)]
#[case(Gate::Registrar, Role::SuperAdmin, false)]
fn role_gates(#[case] gate: Gate, #[case] role: Role, #[case] allowed: bool) {
    let offering = offering_taught_by(&lecturer(), 10, &[]);
    let result = authorize(
        &staff(role),
        Action::PassGate(gate),
        Resource::Offering(&offering),
    );
    assert_eq!(result.is_ok(), allowed);
}

#[rstest]
fn students_act_only_on_their_own_records() {
    let me = student();
    let someone_else = student();
    let mine = student_profile(&me);
    let theirs = student_profile(&someone_else);

    for action in [
        Action::SubmitRegistration,
        Action::ViewStudentRecord,
        Action::GenerateInvoice,
        Action::ViewFinance,
        Action::InitiatePayment,
    ] {
        assert!(authorize(&me, action, Resource::Student(&mine)).is_ok());
        assert!(authorize(&me, action, Resource::Student(&theirs)).is_err());
    }
}

#[rstest]
fn staff_cannot_initiate_payments_for_students() {
    let profile = student_profile(&student());
    assert!(
        authorize(
            &staff(Role::Bursar),
            Action::InitiatePayment,
            Resource::Student(&profile)
        )
        .is_err()
    );
}

#[rstest]
#[case(Role::Registrar, true)]
#[case(Role::SuperAdmin, true)]
#[case(Role::Bursar, false)]
fn offering_management(#[case] role: Role, #[case] allowed: bool) {
    let csc = dept("CSC");
    let result = authorize(&staff(role), Action::ManageOfferings, Resource::Department(&csc));
    assert_eq!(result.is_ok(), allowed);
}

#[rstest]
fn hod_manages_offerings_of_own_department_only() {
    let csc = dept("CSC");
    let mth = dept("MTH");
    let hod = hod_of("CSC");
    assert!(authorize(&hod, Action::ManageOfferings, Resource::Department(&csc)).is_ok());
    assert!(authorize(&hod, Action::ManageOfferings, Resource::Department(&mth)).is_err());
}

#[rstest]
#[case(Role::Bursar, true)]
#[case(Role::SuperAdmin, true)]
#[case(Role::Registrar, false)]
#[case(Role::Student, false)]
fn fee_structures_are_defined_by_finance(#[case] role: Role, #[case] allowed: bool) {
    let principal = if role == Role::Student {
        student()
    } else {
        staff(role)
    };
    let result = authorize(&principal, Action::DefineFeeStructure, Resource::Institution);
    assert_eq!(result.is_ok(), allowed);
}

#[rstest]
#[case(Role::Bursar, true)]
#[case(Role::SuperAdmin, true)]
#[case(Role::DeskOfficer, false)]
#[case(Role::Student, false)]
fn ledger_totals_are_for_the_bursary(#[case] role: Role, #[case] allowed: bool) {
    let principal = if role == Role::Student {
        student()
    } else {
        staff(role)
    };
    let result = authorize(&principal, Action::ViewLedgerSummary, Resource::Institution);
    assert_eq!(result.is_ok(), allowed);
}
