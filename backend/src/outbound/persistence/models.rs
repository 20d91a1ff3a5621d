//! Internal Diesel row structs and their conversion into domain types.
//!
//! Rows never leave the persistence layer. Conversions return `String`
//! errors that each repository maps into its own error type.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{
    fee_structures, grade_records, invoices, offerings, payments, principals, registrations,
};
use crate::domain::{
    AcademicSession, Affiliation, CourseCode, CourseOffering, CourseRegistration, CreditUnits,
    Decision, DepartmentCode, FeeComponents, FeeStructure, FeeStructureId, GradeLetter,
    GradeRecord, GradeRecordId, GradeStage, Invoice, InvoiceId, LecturerId, LecturerProfile,
    Level, Money, OfferingId, Payment, PaymentId, PaymentReference, PaymentStatus, Principal,
    PrincipalDraft, PrincipalId, RegistrationId, RegistrationStatus, Role, ScoreBreakdown,
    Semester, StageHistory, StudentId, StudentProfile, Term,
};

fn term_from_columns(session_start: i32, semester: &str) -> Result<Term, String> {
    let start = u16::try_from(session_start)
        .map_err(|_| format!("session start {session_start} out of range"))?;
    let session = AcademicSession::starting(start).map_err(|err| err.to_string())?;
    let semester = semester
        .parse::<Semester>()
        .map_err(|err| err.to_string())?;
    Ok(Term::new(session, semester))
}

/// `(session_start, semester)` column values for a term.
pub(crate) fn term_columns(term: &Term) -> (i32, &'static str) {
    (i32::from(term.session.start_year()), term.semester.as_str())
}

fn decision(by: Option<Uuid>, at: Option<DateTime<Utc>>) -> Option<Decision> {
    match (by, at) {
        (Some(by), Some(at)) => Some(Decision {
            by: PrincipalId::from_uuid(by),
            at,
        }),
        _ => None,
    }
}

fn credit_units(value: i32) -> Result<CreditUnits, String> {
    let value = u8::try_from(value).map_err(|_| format!("credit units {value} out of range"))?;
    CreditUnits::new(value).map_err(|err| err.to_string())
}

fn count(value: i32, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("{column} {value} is negative"))
}

// ---------------------------------------------------------------------------
// Principals
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = principals)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PrincipalRow {
    pub id: Uuid,
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub student_id: Option<Uuid>,
    pub matric_number: Option<String>,
    pub lecturer_id: Option<Uuid>,
    pub department: Option<String>,
    pub level: Option<i32>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = principals)]
pub(crate) struct NewPrincipalRow<'a> {
    pub id: Uuid,
    pub username: &'a str,
    pub full_name: &'a str,
    pub email: &'a str,
    pub role: &'a str,
    pub password_digest: String,
    pub student_id: Option<Uuid>,
    pub matric_number: Option<&'a str>,
    pub lecturer_id: Option<Uuid>,
    pub department: Option<&'a str>,
    pub level: Option<i32>,
}

impl<'a> NewPrincipalRow<'a> {
    pub(crate) fn from_domain(principal: &'a Principal, password_digest: String) -> Self {
        let mut row = Self {
            id: *principal.id().as_uuid(),
            username: principal.username(),
            full_name: principal.full_name(),
            email: principal.email(),
            role: principal.role().as_str(),
            password_digest,
            student_id: None,
            matric_number: None,
            lecturer_id: None,
            department: None,
            level: None,
        };
        match principal.affiliation() {
            Affiliation::None => {}
            Affiliation::Student(profile) => {
                row.student_id = Some(*profile.id.as_uuid());
                row.matric_number = Some(&profile.matric_number);
                row.department = Some(profile.department.as_str());
                row.level = Some(i32::from(profile.level.value()));
            }
            Affiliation::Lecturer(profile) => {
                row.lecturer_id = Some(*profile.id.as_uuid());
                row.department = Some(profile.department.as_str());
            }
            Affiliation::Department { department } => {
                row.department = Some(department.as_str());
            }
        }
        row
    }
}

impl PrincipalRow {
    fn affiliation(&self) -> Result<Affiliation, String> {
        let department = self
            .department
            .as_deref()
            .map(DepartmentCode::new)
            .transpose()
            .map_err(|err| err.to_string())?;
        match (self.student_id, self.lecturer_id, department) {
            (Some(student), _, Some(department)) => {
                let matric_number = self
                    .matric_number
                    .clone()
                    .ok_or_else(|| format!("student {student} has no matric number"))?;
                let level = self
                    .level
                    .and_then(|level| u16::try_from(level).ok())
                    .ok_or_else(|| format!("student {student} has no valid level"))?;
                Ok(Affiliation::Student(StudentProfile {
                    id: StudentId::from_uuid(student),
                    matric_number,
                    department,
                    level: Level::new(level).map_err(|err| err.to_string())?,
                }))
            }
            (None, Some(lecturer), Some(department)) => Ok(Affiliation::Lecturer(LecturerProfile {
                id: LecturerId::from_uuid(lecturer),
                department,
            })),
            (None, None, Some(department)) => Ok(Affiliation::Department { department }),
            (None, None, None) => Ok(Affiliation::None),
            _ => Err(format!("principal {} has an incomplete profile", self.id)),
        }
    }

    pub(crate) fn into_domain(self) -> Result<Principal, String> {
        let role = self
            .role
            .parse::<Role>()
            .map_err(|err| err.to_string())?;
        let affiliation = self.affiliation()?;
        Principal::try_new(PrincipalDraft {
            id: PrincipalId::from_uuid(self.id),
            username: self.username,
            full_name: self.full_name,
            email: self.email,
            role,
            affiliation,
        })
        .map_err(|err| err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Offerings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = offerings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct OfferingRow {
    pub id: Uuid,
    pub code: String,
    pub title: String,
    pub credit_units: i32,
    pub department: String,
    pub session_start: i32,
    pub semester: String,
    pub lecturer_id: Uuid,
    pub capacity: i32,
    pub enrolled_count: i32,
    pub prerequisites: Vec<String>,
}

impl OfferingRow {
    pub(crate) fn from_domain(offering: &CourseOffering) -> Result<Self, String> {
        let (session_start, semester) = term_columns(&offering.term);
        Ok(Self {
            id: *offering.id.as_uuid(),
            code: offering.code.as_str().to_owned(),
            title: offering.title.clone(),
            credit_units: i32::from(offering.credit_units.value()),
            department: offering.department.as_str().to_owned(),
            session_start,
            semester: semester.to_owned(),
            lecturer_id: *offering.lecturer.as_uuid(),
            capacity: i32::try_from(offering.capacity)
                .map_err(|_| format!("capacity {} too large", offering.capacity))?,
            enrolled_count: i32::try_from(offering.enrolled_count)
                .map_err(|_| format!("enrolment {} too large", offering.enrolled_count))?,
            prerequisites: offering
                .prerequisites
                .iter()
                .map(|code| code.as_str().to_owned())
                .collect(),
        })
    }

    pub(crate) fn into_domain(self) -> Result<CourseOffering, String> {
        let prerequisites = self
            .prerequisites
            .iter()
            .map(CourseCode::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| err.to_string())?;
        Ok(CourseOffering {
            id: OfferingId::from_uuid(self.id),
            code: CourseCode::new(&self.code).map_err(|err| err.to_string())?,
            title: self.title,
            credit_units: credit_units(self.credit_units)?,
            department: DepartmentCode::new(&self.department).map_err(|err| err.to_string())?,
            term: term_from_columns(self.session_start, &self.semester)?,
            lecturer: LecturerId::from_uuid(self.lecturer_id),
            capacity: count(self.capacity, "capacity")?,
            enrolled_count: count(self.enrolled_count, "enrolled count")?,
            prerequisites,
        })
    }
}

// ---------------------------------------------------------------------------
// Registrations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = registrations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct RegistrationRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub offering_id: Uuid,
    pub session_start: i32,
    pub semester: String,
    pub status: String,
    pub payment_waived: bool,
    pub rejection_reason: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub lecturer_decision_by: Option<Uuid>,
    pub lecturer_decision_at: Option<DateTime<Utc>>,
    pub exam_officer_decision_by: Option<Uuid>,
    pub exam_officer_decision_at: Option<DateTime<Utc>>,
}

/// Columns rewritten by a status transition.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = registrations)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct RegistrationStatusUpdate {
    pub status: String,
    pub payment_waived: bool,
    pub rejection_reason: Option<String>,
    pub lecturer_decision_by: Option<Uuid>,
    pub lecturer_decision_at: Option<DateTime<Utc>>,
    pub exam_officer_decision_by: Option<Uuid>,
    pub exam_officer_decision_at: Option<DateTime<Utc>>,
}

impl RegistrationRow {
    pub(crate) fn from_domain(registration: &CourseRegistration) -> Self {
        let (session_start, semester) = term_columns(&registration.term);
        let update = RegistrationStatusUpdate::from_domain(registration);
        Self {
            id: *registration.id.as_uuid(),
            student_id: *registration.student.as_uuid(),
            offering_id: *registration.offering.as_uuid(),
            session_start,
            semester: semester.to_owned(),
            status: update.status,
            payment_waived: update.payment_waived,
            rejection_reason: update.rejection_reason,
            submitted_at: registration.submitted_at,
            lecturer_decision_by: update.lecturer_decision_by,
            lecturer_decision_at: update.lecturer_decision_at,
            exam_officer_decision_by: update.exam_officer_decision_by,
            exam_officer_decision_at: update.exam_officer_decision_at,
        }
    }

    pub(crate) fn into_domain(self) -> Result<CourseRegistration, String> {
        let status = self
            .status
            .parse::<RegistrationStatus>()
            .map_err(|err| err.to_string())?;
        Ok(CourseRegistration {
            id: RegistrationId::from_uuid(self.id),
            student: StudentId::from_uuid(self.student_id),
            offering: OfferingId::from_uuid(self.offering_id),
            term: term_from_columns(self.session_start, &self.semester)?,
            status,
            payment_waived: self.payment_waived,
            rejection_reason: self.rejection_reason,
            submitted_at: self.submitted_at,
            lecturer_decision: decision(self.lecturer_decision_by, self.lecturer_decision_at),
            exam_officer_decision: decision(
                self.exam_officer_decision_by,
                self.exam_officer_decision_at,
            ),
        })
    }
}

impl RegistrationStatusUpdate {
    pub(crate) fn from_domain(registration: &CourseRegistration) -> Self {
        let lecturer = registration.lecturer_decision.as_ref();
        let officer = registration.exam_officer_decision.as_ref();
        Self {
            status: registration.status.as_str().to_owned(),
            payment_waived: registration.payment_waived,
            rejection_reason: registration.rejection_reason.clone(),
            lecturer_decision_by: lecturer.map(|d| *d.by.as_uuid()),
            lecturer_decision_at: lecturer.map(|d| d.at),
            exam_officer_decision_by: officer.map(|d| *d.by.as_uuid()),
            exam_officer_decision_at: officer.map(|d| d.at),
        }
    }
}

// ---------------------------------------------------------------------------
// Grade records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = grade_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct GradeRecordRow {
    pub id: Uuid,
    pub student_id: Uuid,
    pub offering_id: Uuid,
    pub course_code: String,
    pub credit_units: i32,
    pub session_start: i32,
    pub semester: String,
    pub ca_hundredths: i32,
    pub exam_hundredths: i32,
    pub letter: String,
    pub stage: String,
    pub rejection_reason: Option<String>,
    pub entered_by: Uuid,
    pub entered_at: DateTime<Utc>,
    pub history: serde_json::Value,
}

/// Columns a draft edit may rewrite.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = grade_records)]
pub(crate) struct GradeScoreUpdate<'a> {
    pub ca_hundredths: i32,
    pub exam_hundredths: i32,
    pub letter: &'a str,
    pub entered_by: Uuid,
    pub entered_at: DateTime<Utc>,
}

/// Columns a stage transition rewrites.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = grade_records)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct GradeStageUpdate {
    pub stage: String,
    pub rejection_reason: Option<String>,
    pub history: serde_json::Value,
}

impl GradeRecordRow {
    pub(crate) fn from_domain(record: &GradeRecord) -> Result<Self, String> {
        let (session_start, semester) = term_columns(&record.term);
        let (ca_hundredths, exam_hundredths) = record.score.to_hundredths();
        Ok(Self {
            id: *record.id.as_uuid(),
            student_id: *record.student.as_uuid(),
            offering_id: *record.offering.as_uuid(),
            course_code: record.course.as_str().to_owned(),
            credit_units: i32::from(record.credit_units.value()),
            session_start,
            semester: semester.to_owned(),
            ca_hundredths,
            exam_hundredths,
            letter: record.letter.as_str().to_owned(),
            stage: record.stage.as_str().to_owned(),
            rejection_reason: record.rejection_reason.clone(),
            entered_by: *record.entered_by.as_uuid(),
            entered_at: record.entered_at,
            history: history_value(&record.history)?,
        })
    }

    pub(crate) fn into_domain(self) -> Result<GradeRecord, String> {
        let letter = self
            .letter
            .parse::<GradeLetter>()
            .map_err(|err| err.to_string())?;
        let stage = self
            .stage
            .parse::<GradeStage>()
            .map_err(|err| err.to_string())?;
        let history: StageHistory =
            serde_json::from_value(self.history).map_err(|err| err.to_string())?;
        Ok(GradeRecord {
            id: GradeRecordId::from_uuid(self.id),
            student: StudentId::from_uuid(self.student_id),
            offering: OfferingId::from_uuid(self.offering_id),
            course: CourseCode::new(&self.course_code).map_err(|err| err.to_string())?,
            credit_units: credit_units(self.credit_units)?,
            term: term_from_columns(self.session_start, &self.semester)?,
            score: ScoreBreakdown::from_hundredths(self.ca_hundredths, self.exam_hundredths)
                .map_err(|err| err.to_string())?,
            letter,
            points: letter.points(),
            stage,
            rejection_reason: self.rejection_reason,
            entered_by: PrincipalId::from_uuid(self.entered_by),
            entered_at: self.entered_at,
            history,
        })
    }
}

/// Serialise a stage history for the `history` column.
pub(crate) fn history_value(history: &StageHistory) -> Result<serde_json::Value, String> {
    serde_json::to_value(history).map_err(|err| err.to_string())
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = fee_structures)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct FeeStructureRow {
    pub id: Uuid,
    pub name: String,
    pub department: String,
    pub level: i32,
    pub session_start: i32,
    pub semester: String,
    pub tuition_kobo: i64,
    pub library_kobo: i64,
    pub lab_kobo: i64,
    pub sports_kobo: i64,
    pub medical_kobo: i64,
    pub other_kobo: i64,
    pub total_kobo: i64,
    pub created_at: DateTime<Utc>,
}

impl FeeStructureRow {
    pub(crate) fn from_domain(structure: &FeeStructure) -> Self {
        let (session_start, semester) = term_columns(&structure.term);
        let components = &structure.components;
        Self {
            id: *structure.id.as_uuid(),
            name: structure.name.clone(),
            department: structure.department.as_str().to_owned(),
            level: i32::from(structure.level.value()),
            session_start,
            semester: semester.to_owned(),
            tuition_kobo: components.tuition.kobo(),
            library_kobo: components.library.kobo(),
            lab_kobo: components.lab.kobo(),
            sports_kobo: components.sports.kobo(),
            medical_kobo: components.medical.kobo(),
            other_kobo: components.other.kobo(),
            total_kobo: structure.total.kobo(),
            created_at: structure.created_at,
        }
    }

    pub(crate) fn into_domain(self) -> Result<FeeStructure, String> {
        let level =
            u16::try_from(self.level).map_err(|_| format!("level {} out of range", self.level))?;
        Ok(FeeStructure {
            id: FeeStructureId::from_uuid(self.id),
            name: self.name,
            department: DepartmentCode::new(&self.department).map_err(|err| err.to_string())?,
            level: Level::new(level).map_err(|err| err.to_string())?,
            term: term_from_columns(self.session_start, &self.semester)?,
            components: FeeComponents {
                tuition: Money::from_kobo(self.tuition_kobo),
                library: Money::from_kobo(self.library_kobo),
                lab: Money::from_kobo(self.lab_kobo),
                sports: Money::from_kobo(self.sports_kobo),
                medical: Money::from_kobo(self.medical_kobo),
                other: Money::from_kobo(self.other_kobo),
            },
            total: Money::from_kobo(self.total_kobo),
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = invoices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct InvoiceRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub student_id: Uuid,
    pub session_start: i32,
    pub semester: String,
    pub fee_structure_id: Uuid,
    pub amount_due_kobo: i64,
    pub amount_paid_kobo: i64,
    pub issued_at: DateTime<Utc>,
}

impl InvoiceRow {
    pub(crate) fn from_domain(invoice: &Invoice) -> Self {
        let (session_start, semester) = term_columns(&invoice.term);
        Self {
            id: *invoice.id.as_uuid(),
            invoice_number: invoice.invoice_number.clone(),
            student_id: *invoice.student.as_uuid(),
            session_start,
            semester: semester.to_owned(),
            fee_structure_id: *invoice.fee_structure.as_uuid(),
            amount_due_kobo: invoice.amount_due.kobo(),
            amount_paid_kobo: invoice.amount_paid.kobo(),
            issued_at: invoice.issued_at,
        }
    }

    pub(crate) fn into_domain(self) -> Result<Invoice, String> {
        Ok(Invoice {
            id: InvoiceId::from_uuid(self.id),
            invoice_number: self.invoice_number,
            student: StudentId::from_uuid(self.student_id),
            term: term_from_columns(self.session_start, &self.semester)?,
            fee_structure: FeeStructureId::from_uuid(self.fee_structure_id),
            amount_due: Money::from_kobo(self.amount_due_kobo),
            amount_paid: Money::from_kobo(self.amount_paid_kobo),
            issued_at: self.issued_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PaymentRow {
    pub id: Uuid,
    pub reference: String,
    pub student_id: Uuid,
    pub invoice_id: Uuid,
    pub amount_kobo: i64,
    pub status: String,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    pub receipt_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
}

impl PaymentRow {
    pub(crate) fn from_domain(payment: &Payment) -> Self {
        Self {
            id: *payment.id.as_uuid(),
            reference: payment.reference.as_str().to_owned(),
            student_id: *payment.student.as_uuid(),
            invoice_id: *payment.invoice.as_uuid(),
            amount_kobo: payment.amount.kobo(),
            status: payment.status.as_str().to_owned(),
            authorization_url: payment.authorization_url.clone(),
            access_code: payment.access_code.clone(),
            gateway_transaction_id: payment.gateway_transaction_id.clone(),
            failure_reason: payment.failure_reason.clone(),
            receipt_number: payment.receipt_number.clone(),
            created_at: payment.created_at,
            settled_at: payment.settled_at,
        }
    }

    pub(crate) fn into_domain(self) -> Result<Payment, String> {
        let reference = self
            .reference
            .parse::<PaymentReference>()
            .map_err(|err| err.to_string())?;
        let status = self
            .status
            .parse::<PaymentStatus>()
            .map_err(|err| err.to_string())?;
        Ok(Payment {
            id: PaymentId::from_uuid(self.id),
            reference,
            student: StudentId::from_uuid(self.student_id),
            invoice: InvoiceId::from_uuid(self.invoice_id),
            amount: Money::from_kobo(self.amount_kobo),
            status,
            authorization_url: self.authorization_url,
            access_code: self.access_code,
            gateway_transaction_id: self.gateway_transaction_id,
            failure_reason: self.failure_reason,
            receipt_number: self.receipt_number,
            created_at: self.created_at,
            settled_at: self.settled_at,
        })
    }
}
