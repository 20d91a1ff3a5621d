//! Shared builders for domain unit tests.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone, Utc};
use mockable::Clock;

use super::academic::{CourseCode, CreditUnits, DepartmentCode, Level, Term};
use super::catalogue::{CourseOffering, OfferingDraft};
use super::grading::{GradeRecord, GradeStage, GradingScale, ScoreBreakdown, StageChange};
use super::identity::{
    Affiliation, LecturerProfile, Principal, PrincipalDraft, Role, StudentProfile,
};
use super::ids::{
    FeeStructureId, GradeRecordId, LecturerId, OfferingId, PrincipalId, StudentId,
};
use super::ledger::{FeeComponents, FeeStructure, FeeStructureDraft, Money};

pub(crate) fn dept(code: &str) -> DepartmentCode {
    DepartmentCode::new(code).expect("fixture department")
}

pub(crate) fn course(code: &str) -> CourseCode {
    CourseCode::new(code).expect("fixture course code")
}

pub(crate) fn term() -> Term {
    Term::parse("2024/2025", "first").expect("fixture term")
}

pub(crate) fn other_term() -> Term {
    Term::parse("2024/2025", "second").expect("fixture term")
}

fn principal(role: Role, username: &str, affiliation: Affiliation) -> Principal {
    Principal::try_new(PrincipalDraft {
        id: PrincipalId::random(),
        username: username.to_owned(),
        full_name: format!("Fixture {username}"),
        email: format!("{username}@college.test"),
        role,
        affiliation,
    })
    .expect("fixture principal")
}

pub(crate) fn staff(role: Role) -> Principal {
    principal(role, role.as_str(), Affiliation::None)
}

pub(crate) fn student_in(department: &str, level: u16) -> Principal {
    principal(
        Role::Student,
        "student",
        Affiliation::Student(StudentProfile {
            id: StudentId::random(),
            matric_number: format!("{department}/2024/001"),
            department: dept(department),
            level: Level::new(level).expect("fixture level"),
        }),
    )
}

pub(crate) fn student() -> Principal {
    student_in("CSC", 100)
}

pub(crate) fn lecturer_in(department: &str) -> Principal {
    principal(
        Role::Lecturer,
        "lecturer",
        Affiliation::Lecturer(LecturerProfile {
            id: LecturerId::random(),
            department: dept(department),
        }),
    )
}

pub(crate) fn lecturer() -> Principal {
    lecturer_in("CSC")
}

pub(crate) fn hod_of(department: &str) -> Principal {
    principal(
        Role::Hod,
        "hod",
        Affiliation::Department {
            department: dept(department),
        },
    )
}

pub(crate) fn student_profile(principal: &Principal) -> StudentProfile {
    principal.student().cloned().expect("fixture student profile")
}

pub(crate) fn offering_taught_by(
    lecturer: &Principal,
    capacity: u32,
    prerequisites: &[&str],
) -> CourseOffering {
    let profile = lecturer.lecturer().expect("fixture lecturer profile");
    CourseOffering::open(
        OfferingId::random(),
        OfferingDraft {
            code: course("CSC201"),
            title: "Data Structures".to_owned(),
            credit_units: CreditUnits::new(3).expect("fixture units"),
            department: profile.department.clone(),
            term: term(),
            lecturer: profile.id,
            capacity,
            prerequisites: prerequisites.iter().map(|code| course(code)).collect(),
        },
    )
    .expect("fixture offering")
}

pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 10, 1, 9, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

struct FixtureClock {
    utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_timestamp(),
    })
}

pub(crate) fn published_grade(
    student: StudentId,
    course_code: &str,
    continuous_assessment: i32,
    exam: i32,
) -> GradeRecord {
    let tutor = lecturer();
    let mut offering = offering_taught_by(&tutor, 10, &[]);
    offering.code = course(course_code);
    let score = ScoreBreakdown::from_hundredths(continuous_assessment * 100, exam * 100)
        .expect("fixture score");
    GradeRecord::draft(
        GradeRecordId::random(),
        &offering,
        student,
        score,
        &GradingScale::default(),
        tutor.id(),
        fixture_timestamp(),
    )
    .with_stage(&StageChange {
        to: GradeStage::Published,
        by: tutor.id(),
        at: fixture_timestamp(),
        reason: None,
    })
}

pub(crate) fn fee_structure(tuition_naira: i64) -> FeeStructure {
    FeeStructure::define(
        FeeStructureId::random(),
        FeeStructureDraft {
            name: "CSC 100L".to_owned(),
            department: dept("CSC"),
            level: Level::new(100).expect("fixture level"),
            term: term(),
            components: FeeComponents {
                tuition: Money::naira(tuition_naira),
                ..FeeComponents::default()
            },
        },
        fixture_timestamp(),
    )
    .expect("fixture fee structure")
}
