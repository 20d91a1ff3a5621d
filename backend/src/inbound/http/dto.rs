//! Response payloads for the college API.
//!
//! Domain records stay free of HTTP concerns; these camelCase views carry
//! identifiers, amounts, and timestamps as strings so clients never lose
//! precision.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    AcademicStanding, Affiliation, CourseOffering, CourseRegistration, Decision, FeeStructure,
    GradeRecord, Invoice, LedgerSummary, Payment, PaymentTotals, Principal, RegistrationSummary,
    StageHistory, Term, TermGpa,
};

/// Session and semester of a record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TermResponse {
    #[schema(example = "2024/2025")]
    pub session: String,
    #[schema(example = "first")]
    pub semester: String,
}

impl From<Term> for TermResponse {
    fn from(term: Term) -> Self {
        Self {
            session: term.session.to_string(),
            semester: term.semester.as_str().to_owned(),
        }
    }
}

/// Who applied a workflow step and when.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DecisionResponse {
    pub by: String,
    pub at: String,
}

impl From<Decision> for DecisionResponse {
    fn from(decision: Decision) -> Self {
        Self {
            by: decision.by.to_string(),
            at: decision.at.to_rfc3339(),
        }
    }
}

/// Student profile attached to a principal.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileResponse {
    pub student_id: String,
    pub matric_number: String,
    pub department: String,
    pub level: u16,
}

/// Authenticated or registered principal.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalResponse {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub email: String,
    #[schema(example = "exam_officer")]
    pub role: String,
    pub department: Option<String>,
    pub student: Option<StudentProfileResponse>,
    pub lecturer_id: Option<String>,
}

impl From<Principal> for PrincipalResponse {
    fn from(principal: Principal) -> Self {
        let (department, student, lecturer_id) = match principal.affiliation() {
            Affiliation::None => (None, None, None),
            Affiliation::Student(profile) => (
                Some(profile.department.to_string()),
                Some(StudentProfileResponse {
                    student_id: profile.id.to_string(),
                    matric_number: profile.matric_number.clone(),
                    department: profile.department.to_string(),
                    level: profile.level.value(),
                }),
                None,
            ),
            Affiliation::Lecturer(profile) => (
                Some(profile.department.to_string()),
                None,
                Some(profile.id.to_string()),
            ),
            Affiliation::Department { department } => (Some(department.to_string()), None, None),
        };
        Self {
            id: principal.id().to_string(),
            username: principal.username().to_owned(),
            full_name: principal.full_name().to_owned(),
            email: principal.email().to_owned(),
            role: principal.role().as_str().to_owned(),
            department,
            student,
            lecturer_id,
        }
    }
}

/// Course offering.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OfferingResponse {
    pub id: String,
    #[schema(example = "CSC201")]
    pub code: String,
    pub title: String,
    pub credit_units: u8,
    pub department: String,
    pub term: TermResponse,
    pub lecturer_id: String,
    pub capacity: u32,
    pub enrolled_count: u32,
    pub prerequisites: Vec<String>,
}

impl From<CourseOffering> for OfferingResponse {
    fn from(offering: CourseOffering) -> Self {
        Self {
            id: offering.id.to_string(),
            code: offering.code.to_string(),
            title: offering.title,
            credit_units: offering.credit_units.value(),
            department: offering.department.to_string(),
            term: offering.term.into(),
            lecturer_id: offering.lecturer.to_string(),
            capacity: offering.capacity,
            enrolled_count: offering.enrolled_count,
            prerequisites: offering
                .prerequisites
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Course registration.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    pub student_id: String,
    pub offering_id: String,
    pub term: TermResponse,
    #[schema(example = "lecturer_approved")]
    pub status: String,
    pub payment_waived: bool,
    pub rejection_reason: Option<String>,
    pub submitted_at: String,
    pub lecturer_decision: Option<DecisionResponse>,
    pub exam_officer_decision: Option<DecisionResponse>,
}

impl From<CourseRegistration> for RegistrationResponse {
    fn from(registration: CourseRegistration) -> Self {
        Self {
            id: registration.id.to_string(),
            student_id: registration.student.to_string(),
            offering_id: registration.offering.to_string(),
            term: registration.term.into(),
            status: registration.status.as_str().to_owned(),
            payment_waived: registration.payment_waived,
            rejection_reason: registration.rejection_reason,
            submitted_at: registration.submitted_at.to_rfc3339(),
            lecturer_decision: registration.lecturer_decision.map(Into::into),
            exam_officer_decision: registration.exam_officer_decision.map(Into::into),
        }
    }
}

/// Registration counts for one student's term.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationSummaryResponse {
    pub pending: u32,
    pub lecturer_approved: u32,
    pub registered: u32,
    pub rejected: u32,
    pub payment_waived: u32,
}

impl From<RegistrationSummary> for RegistrationSummaryResponse {
    fn from(summary: RegistrationSummary) -> Self {
        Self {
            pending: summary.pending,
            lecturer_approved: summary.lecturer_approved,
            registered: summary.registered,
            rejected: summary.rejected,
            payment_waived: summary.payment_waived,
        }
    }
}

/// Stage stamps of a grade record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StageHistoryResponse {
    pub submitted: Option<DecisionResponse>,
    pub hod_approved: Option<DecisionResponse>,
    pub verified: Option<DecisionResponse>,
    pub published: Option<DecisionResponse>,
    pub rejected: Option<DecisionResponse>,
}

impl From<StageHistory> for StageHistoryResponse {
    fn from(history: StageHistory) -> Self {
        Self {
            submitted: history.submitted.map(Into::into),
            hod_approved: history.hod_approved.map(Into::into),
            verified: history.verified.map(Into::into),
            published: history.published.map(Into::into),
            rejected: history.rejected.map(Into::into),
        }
    }
}

/// Grade record.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub id: String,
    pub student_id: String,
    pub offering_id: String,
    pub course_code: String,
    pub credit_units: u8,
    pub term: TermResponse,
    #[schema(example = "25")]
    pub continuous_assessment: String,
    #[schema(example = "50")]
    pub exam: String,
    #[schema(example = "75")]
    pub total: String,
    #[schema(example = "A")]
    pub letter: String,
    #[schema(example = "4.0")]
    pub points: String,
    #[schema(example = "submitted")]
    pub stage: String,
    pub rejection_reason: Option<String>,
    pub entered_by: String,
    pub entered_at: String,
    pub history: StageHistoryResponse,
}

impl From<GradeRecord> for GradeResponse {
    fn from(record: GradeRecord) -> Self {
        Self {
            id: record.id.to_string(),
            student_id: record.student.to_string(),
            offering_id: record.offering.to_string(),
            course_code: record.course.to_string(),
            credit_units: record.credit_units.value(),
            term: record.term.into(),
            continuous_assessment: record.score.continuous_assessment().to_string(),
            exam: record.score.exam().to_string(),
            total: record.score.total().to_string(),
            letter: record.letter.to_string(),
            points: record.points.to_string(),
            stage: record.stage.as_str().to_owned(),
            rejection_reason: record.rejection_reason,
            entered_by: record.entered_by.to_string(),
            entered_at: record.entered_at.to_rfc3339(),
            history: record.history.into(),
        }
    }
}

/// GPA for one term.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TermGpaResponse {
    pub term: TermResponse,
    #[schema(example = "3.50")]
    pub gpa: String,
    pub credits: u32,
}

impl From<TermGpa> for TermGpaResponse {
    fn from(term: TermGpa) -> Self {
        Self {
            term: term.term.into(),
            gpa: format!("{:.2}", term.gpa),
            credits: term.credits,
        }
    }
}

/// GPA, CGPA, and degree class.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StandingResponse {
    #[schema(example = "3.75")]
    pub cgpa: String,
    pub total_credits: u32,
    #[schema(example = "first_class")]
    pub classification: String,
    pub terms: Vec<TermGpaResponse>,
}

impl From<AcademicStanding> for StandingResponse {
    fn from(standing: AcademicStanding) -> Self {
        Self {
            cgpa: format!("{:.2}", standing.cgpa),
            total_credits: standing.total_credits,
            classification: standing.classification.as_str().to_owned(),
            terms: standing.terms.into_iter().map(Into::into).collect(),
        }
    }
}

/// Fee line items, in naira.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeeComponentsResponse {
    #[schema(example = "50000.00")]
    pub tuition: String,
    pub library: String,
    pub lab: String,
    pub sports: String,
    pub medical: String,
    pub other: String,
}

/// Fee structure.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeeStructureResponse {
    pub id: String,
    pub name: String,
    pub department: String,
    pub level: u16,
    pub term: TermResponse,
    pub components: FeeComponentsResponse,
    #[schema(example = "50000.00")]
    pub total: String,
    pub created_at: String,
}

impl From<FeeStructure> for FeeStructureResponse {
    fn from(structure: FeeStructure) -> Self {
        let components = structure.components;
        Self {
            id: structure.id.to_string(),
            name: structure.name,
            department: structure.department.to_string(),
            level: structure.level.value(),
            term: structure.term.into(),
            components: FeeComponentsResponse {
                tuition: components.tuition.to_string(),
                library: components.library.to_string(),
                lab: components.lab.to_string(),
                sports: components.sports.to_string(),
                medical: components.medical.to_string(),
                other: components.other.to_string(),
            },
            total: structure.total.to_string(),
            created_at: structure.created_at.to_rfc3339(),
        }
    }
}

/// Invoice with its derived status and balance.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceResponse {
    pub id: String,
    #[schema(example = "INV-2024-1A2B3C4D")]
    pub invoice_number: String,
    pub student_id: String,
    pub term: TermResponse,
    pub fee_structure_id: String,
    pub amount_due: String,
    pub amount_paid: String,
    pub balance: String,
    #[schema(example = "partial")]
    pub status: String,
    pub issued_at: String,
}

impl From<Invoice> for InvoiceResponse {
    fn from(invoice: Invoice) -> Self {
        let status = invoice.status().as_str().to_owned();
        let balance = invoice.balance().to_string();
        Self {
            id: invoice.id.to_string(),
            invoice_number: invoice.invoice_number,
            student_id: invoice.student.to_string(),
            term: invoice.term.into(),
            fee_structure_id: invoice.fee_structure.to_string(),
            amount_due: invoice.amount_due.to_string(),
            amount_paid: invoice.amount_paid.to_string(),
            balance,
            status,
            issued_at: invoice.issued_at.to_rfc3339(),
        }
    }
}

/// Payment attempt.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    #[schema(example = "PAY-0A1B2C3D4E")]
    pub reference: String,
    pub student_id: String,
    pub invoice_id: String,
    pub amount: String,
    #[schema(example = "pending")]
    pub status: String,
    pub authorization_url: Option<String>,
    pub access_code: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub failure_reason: Option<String>,
    #[schema(example = "REC-1A2B3C4D")]
    pub receipt_number: Option<String>,
    pub created_at: String,
    pub settled_at: Option<String>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            reference: payment.reference.to_string(),
            student_id: payment.student.to_string(),
            invoice_id: payment.invoice.to_string(),
            amount: payment.amount.to_string(),
            status: payment.status.as_str().to_owned(),
            authorization_url: payment.authorization_url,
            access_code: payment.access_code,
            gateway_transaction_id: payment.gateway_transaction_id,
            failure_reason: payment.failure_reason,
            receipt_number: payment.receipt_number,
            created_at: payment.created_at.to_rfc3339(),
            settled_at: payment.settled_at.map(|at| at.to_rfc3339()),
        }
    }
}

/// Count and naira sum of a group of payments.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotalsResponse {
    pub count: u32,
    #[schema(example = "150000.00")]
    pub amount: String,
}

impl From<PaymentTotals> for PaymentTotalsResponse {
    fn from(totals: PaymentTotals) -> Self {
        Self {
            count: totals.count,
            amount: totals.amount.to_string(),
        }
    }
}

/// Invoices per status.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceStatusBreakdown {
    pub unpaid: u32,
    pub partial: u32,
    pub paid: u32,
}

/// Bursary totals for one term.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummaryResponse {
    pub term: TermResponse,
    pub total_invoices: u32,
    pub total_amount: String,
    pub total_paid: String,
    pub total_outstanding: String,
    pub status_breakdown: InvoiceStatusBreakdown,
    pub completed_payments: PaymentTotalsResponse,
    pub pending_payments: PaymentTotalsResponse,
    pub failed_payments: PaymentTotalsResponse,
}

impl LedgerSummaryResponse {
    /// Attach the term to a tallied summary.
    pub fn new(term: Term, summary: LedgerSummary) -> Self {
        Self {
            term: term.into(),
            total_invoices: summary.invoices,
            total_amount: summary.total_due.to_string(),
            total_paid: summary.total_paid.to_string(),
            total_outstanding: summary.total_outstanding.to_string(),
            status_breakdown: InvoiceStatusBreakdown {
                unpaid: summary.unpaid,
                partial: summary.partial,
                paid: summary.paid,
            },
            completed_payments: summary.completed.into(),
            pending_payments: summary.pending.into(),
            failed_payments: summary.failed.into(),
        }
    }
}

/// Whether a student's term tuition is settled.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TuitionStatusResponse {
    pub student_id: String,
    pub term: TermResponse,
    pub paid: bool,
}
