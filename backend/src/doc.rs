//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every `/api/v1` handler, the health checks, the
//! request and response bodies, and the wrapper schemas that describe
//! domain errors without coupling domain types to utoipa. Swagger UI serves
//! it in debug builds and `openapi-dump` prints it for external tooling.

use crate::inbound::http::catalogue::OpenOfferingBody;
use crate::inbound::http::dto::{
    DecisionResponse, FeeComponentsResponse, FeeStructureResponse, GradeResponse, InvoiceResponse,
    InvoiceStatusBreakdown, LedgerSummaryResponse, OfferingResponse, PaymentResponse,
    PaymentTotalsResponse, PrincipalResponse, RegistrationResponse, RegistrationSummaryResponse,
    StageHistoryResponse, StandingResponse, StudentProfileResponse, TermGpaResponse, TermResponse,
    TuitionStatusResponse,
};
use crate::inbound::http::grades::EnterScoreBody;
use crate::inbound::http::ledger::{
    DefineFeeStructureBody, FeeComponentsBody, GenerateInvoiceBody, InitiatePaymentBody,
};
use crate::inbound::http::principals::{LoginRequest, RegisterPrincipalBody};
use crate::inbound::http::registrations::{RejectionBody, SubmitRegistrationBody};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "College administration API",
        description = "Course registration, grade approval, and fee ledger workflows.",
        license(
            name = "ISC",
            url = "https://opensource.org/license/isc-license-txt"
        )
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::principals::login,
        crate::inbound::http::principals::logout,
        crate::inbound::http::principals::current_principal,
        crate::inbound::http::principals::register_principal,
        crate::inbound::http::catalogue::open_offering,
        crate::inbound::http::catalogue::list_offerings,
        crate::inbound::http::registrations::submit_registration,
        crate::inbound::http::registrations::list_own_registrations,
        crate::inbound::http::registrations::registration_summary,
        crate::inbound::http::registrations::get_registration,
        crate::inbound::http::registrations::approve_as_lecturer,
        crate::inbound::http::registrations::reject_as_lecturer,
        crate::inbound::http::registrations::approve_as_exam_officer,
        crate::inbound::http::registrations::reject_as_exam_officer,
        crate::inbound::http::registrations::list_offering_registrations,
        crate::inbound::http::grades::enter_score,
        crate::inbound::http::grades::get_grade,
        crate::inbound::http::grades::submit_grade,
        crate::inbound::http::grades::hod_approve_grade,
        crate::inbound::http::grades::verify_grade,
        crate::inbound::http::grades::publish_grade,
        crate::inbound::http::grades::reject_grade,
        crate::inbound::http::grades::list_offering_grades,
        crate::inbound::http::grades::list_student_grades,
        crate::inbound::http::grades::student_standing,
        crate::inbound::http::ledger::define_fee_structure,
        crate::inbound::http::ledger::list_fee_structures,
        crate::inbound::http::ledger::generate_invoice,
        crate::inbound::http::ledger::list_invoices,
        crate::inbound::http::ledger::get_invoice,
        crate::inbound::http::ledger::initiate_payment,
        crate::inbound::http::ledger::list_payments,
        crate::inbound::http::ledger::get_payment,
        crate::inbound::http::ledger::reconcile_payment,
        crate::inbound::http::ledger::payment_webhook,
        crate::inbound::http::ledger::tuition_status,
        crate::inbound::http::ledger::ledger_summary,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        LoginRequest,
        RegisterPrincipalBody,
        OpenOfferingBody,
        SubmitRegistrationBody,
        RejectionBody,
        EnterScoreBody,
        FeeComponentsBody,
        DefineFeeStructureBody,
        GenerateInvoiceBody,
        InitiatePaymentBody,
        TermResponse,
        DecisionResponse,
        StudentProfileResponse,
        PrincipalResponse,
        OfferingResponse,
        RegistrationResponse,
        RegistrationSummaryResponse,
        StageHistoryResponse,
        GradeResponse,
        TermGpaResponse,
        StandingResponse,
        FeeComponentsResponse,
        FeeStructureResponse,
        InvoiceResponse,
        PaymentResponse,
        PaymentTotalsResponse,
        InvoiceStatusBreakdown,
        LedgerSummaryResponse,
        TuitionStatusResponse,
    )),
    tags(
        (name = "auth", description = "Session login and logout"),
        (name = "principals", description = "Identity and role directory"),
        (name = "offerings", description = "Course offerings per term"),
        (name = "registrations", description = "Course registration approval chain"),
        (name = "grades", description = "Grade approval chain and academic standing"),
        (name = "ledger", description = "Fee structures, invoices, and tuition status"),
        (name = "payments", description = "Payment initiation and reconciliation"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
