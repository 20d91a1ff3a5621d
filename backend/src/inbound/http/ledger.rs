//! Fee structure, invoice, and payment endpoints.
//!
//! ```text
//! POST /api/v1/fee-structures {"name":"CSC 100L","department":"CSC","level":100,...}
//! GET /api/v1/fee-structures?session=2024/2025&semester=first
//! POST /api/v1/invoices {"session":"2024/2025","semester":"first"}
//! GET /api/v1/invoices?studentId=...
//! GET /api/v1/invoices/{id}
//! POST /api/v1/payments {"invoiceId":"...","amount":30000}
//! GET /api/v1/payments?studentId=...
//! GET /api/v1/payments/{reference}
//! POST /api/v1/payments/{reference}/verification
//! POST /api/v1/payments/webhook
//! GET /api/v1/students/{id}/tuition-status?session=2024/2025&semester=first
//! GET /api/v1/ledger/summary?session=2024/2025&semester=first
//! ```
//!
//! Amounts are naira and accept JSON numbers or decimal strings. Where a
//! `studentId` is optional it defaults to the acting student's own profile.

use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::WEBHOOK_SIGNATURE_HEADER;
use crate::domain::{
    DepartmentCode, Error, FeeComponents, FeeStructureDraft, InvoiceId, Level, Money,
    PaymentReference, Principal, StudentId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::CachePolicy;
use crate::inbound::http::catalogue::TermQuery;
use crate::inbound::http::dto::{
    FeeStructureResponse, InvoiceResponse, LedgerSummaryResponse, PaymentResponse,
    TuitionStatusResponse,
};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, missing_field_error, numeric_text, parse_field, parse_id,
    parse_money, parse_term, require,
};

/// Fee line items in a fee structure request; absent items are zero.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeeComponentsBody {
    #[schema(value_type = Option<f64>, example = 45000)]
    pub tuition: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub library: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub lab: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub sports: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub medical: Option<Value>,
    #[schema(value_type = Option<f64>)]
    pub other: Option<Value>,
}

/// Request body for `POST /api/v1/fee-structures`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DefineFeeStructureBody {
    pub name: Option<String>,
    #[schema(example = "CSC")]
    pub department: Option<String>,
    #[schema(example = 100)]
    pub level: Option<u16>,
    #[schema(example = "2024/2025")]
    pub session: Option<String>,
    #[schema(example = "first")]
    pub semester: Option<String>,
    #[serde(default)]
    pub components: FeeComponentsBody,
}

/// Request body for `POST /api/v1/invoices`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateInvoiceBody {
    pub student_id: Option<String>,
    #[schema(example = "2024/2025")]
    pub session: Option<String>,
    #[schema(example = "first")]
    pub semester: Option<String>,
}

/// Student filter for invoice and payment listing.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct StudentQuery {
    pub student_id: Option<String>,
}

/// Request body for `POST /api/v1/payments`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentBody {
    pub invoice_id: Option<String>,
    /// Defaults to the outstanding balance.
    #[schema(value_type = Option<f64>, example = 30000)]
    pub amount: Option<Value>,
}

fn component(raw: Option<&Value>, field: FieldName) -> Result<Money, Error> {
    raw.map_or(Ok(Money::ZERO), |value| {
        parse_money(&numeric_text(value, field)?, field)
    })
}

fn parse_components(body: &FeeComponentsBody) -> Result<FeeComponents, Error> {
    Ok(FeeComponents {
        tuition: component(body.tuition.as_ref(), FieldName::new("components.tuition"))?,
        library: component(body.library.as_ref(), FieldName::new("components.library"))?,
        lab: component(body.lab.as_ref(), FieldName::new("components.lab"))?,
        sports: component(body.sports.as_ref(), FieldName::new("components.sports"))?,
        medical: component(body.medical.as_ref(), FieldName::new("components.medical"))?,
        other: component(body.other.as_ref(), FieldName::new("components.other"))?,
    })
}

fn parse_fee_structure_body(body: DefineFeeStructureBody) -> Result<FeeStructureDraft, Error> {
    let department_field = FieldName::new("department");
    let level_field = FieldName::new("level");
    let raw_department = require(body.department.as_deref(), department_field)?;
    let department = DepartmentCode::new(raw_department)
        .map_err(|err| invalid_value_error(department_field, raw_department, err.to_string()))?;
    let raw_level = require(body.level, level_field)?;
    let level = Level::new(raw_level)
        .map_err(|err| invalid_value_error(level_field, &raw_level.to_string(), err.to_string()))?;
    Ok(FeeStructureDraft {
        name: require(body.name, FieldName::new("name"))?,
        department,
        level,
        term: parse_term(body.session.as_deref(), body.semester.as_deref())?,
        components: parse_components(&body.components)?,
    })
}

/// Resolve an explicit student id, falling back to the actor's own profile.
fn student_or_self(actor: &Principal, raw: Option<&str>) -> Result<StudentId, Error> {
    let field = FieldName::new("studentId");
    match (raw, actor.student()) {
        (Some(raw), _) => parse_id(raw, field),
        (None, Some(profile)) => Ok(profile.id),
        (None, None) => Err(missing_field_error(field)),
    }
}

/// Define the fees for a department, level, and term.
#[utoipa::path(
    post,
    path = "/api/v1/fee-structures",
    request_body = DefineFeeStructureBody,
    responses(
        (status = 201, description = "Fee structure defined", body = FeeStructureResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Already defined for the term", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "defineFeeStructure"
)]
#[post("/fee-structures")]
pub async fn define_fee_structure(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<DefineFeeStructureBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let draft = parse_fee_structure_body(payload.into_inner())?;
    let structure = state.ledger.define_fee_structure(&actor, draft).await?;
    Ok(HttpResponse::Created().json(FeeStructureResponse::from(structure)))
}

/// List a term's fee structures.
#[utoipa::path(
    get,
    path = "/api/v1/fee-structures",
    params(TermQuery),
    responses(
        (status = 200, description = "Fee structures", body = [FeeStructureResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "listFeeStructures"
)]
#[get("/fee-structures")]
pub async fn list_fee_structures(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TermQuery>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let term = parse_term(query.session.as_deref(), query.semester.as_deref())?;
    let structures = state.ledger.list_fee_structures(&actor, term).await?;
    let body: Vec<FeeStructureResponse> = structures
        .into_iter()
        .map(FeeStructureResponse::from)
        .collect();
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::PrivateRevalidate.header())
        .json(body))
}

/// Issue, or return the existing, invoice for a student's term.
#[utoipa::path(
    post,
    path = "/api/v1/invoices",
    request_body = GenerateInvoiceBody,
    responses(
        (status = 200, description = "Invoice", body = InvoiceResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 422, description = "No fee structure defined", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "generateInvoice"
)]
#[post("/invoices")]
pub async fn generate_invoice(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<GenerateInvoiceBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let body = payload.into_inner();
    let student = student_or_self(&actor, body.student_id.as_deref())?;
    let term = parse_term(body.session.as_deref(), body.semester.as_deref())?;
    let invoice = state.ledger.generate_invoice(&actor, &student, term).await?;
    Ok(HttpResponse::Ok().json(InvoiceResponse::from(invoice)))
}

/// A student's invoices.
#[utoipa::path(
    get,
    path = "/api/v1/invoices",
    params(StudentQuery),
    responses(
        (status = 200, description = "Invoices", body = [InvoiceResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "listInvoices"
)]
#[get("/invoices")]
pub async fn list_invoices(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<StudentQuery>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let student = student_or_self(&actor, query.student_id.as_deref())?;
    let invoices = state.ledger.list_invoices(&actor, &student).await?;
    let body: Vec<InvoiceResponse> = invoices.into_iter().map(InvoiceResponse::from).collect();
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::NoStore.header())
        .json(body))
}

/// Fetch one invoice.
#[utoipa::path(
    get,
    path = "/api/v1/invoices/{id}",
    params(("id" = String, Path, description = "Invoice id")),
    responses(
        (status = 200, description = "Invoice", body = InvoiceResponse),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "getInvoice"
)]
#[get("/invoices/{id}")]
pub async fn get_invoice(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id: InvoiceId = parse_id(&path, FieldName::new("id"))?;
    let invoice = state.ledger.get_invoice(&actor, &id).await?;
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::NoStore.header())
        .json(InvoiceResponse::from(invoice)))
}

/// Open a pending payment and its gateway checkout.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    request_body = InitiatePaymentBody,
    responses(
        (status = 201, description = "Payment opened", body = PaymentResponse),
        (status = 400, description = "Invalid amount", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Invoice not found", body = ErrorSchema),
        (status = 409, description = "Paid, or another payment pending", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "initiatePayment"
)]
#[post("/payments")]
pub async fn initiate_payment(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<InitiatePaymentBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let body = payload.into_inner();
    let invoice_field = FieldName::new("invoiceId");
    let amount_field = FieldName::new("amount");
    let invoice: InvoiceId =
        parse_id(require(body.invoice_id.as_deref(), invoice_field)?, invoice_field)?;
    let amount = body
        .amount
        .as_ref()
        .map(|value| parse_money(&numeric_text(value, amount_field)?, amount_field))
        .transpose()?;
    let payment = state
        .ledger
        .initiate_payment(&actor, &invoice, amount)
        .await?;
    Ok(HttpResponse::Created().json(PaymentResponse::from(payment)))
}

/// A student's payments, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    params(StudentQuery),
    responses(
        (status = 200, description = "Payments", body = [PaymentResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "listPayments"
)]
#[get("/payments")]
pub async fn list_payments(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<StudentQuery>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let student = student_or_self(&actor, query.student_id.as_deref())?;
    let payments = state.ledger.list_payments(&actor, &student).await?;
    let body: Vec<PaymentResponse> = payments.into_iter().map(PaymentResponse::from).collect();
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::NoStore.header())
        .json(body))
}

/// Fetch one payment by reference.
#[utoipa::path(
    get,
    path = "/api/v1/payments/{reference}",
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Payment", body = PaymentResponse),
        (status = 400, description = "Malformed reference", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Unknown reference", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "getPayment"
)]
#[get("/payments/{reference}")]
pub async fn get_payment(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let reference: PaymentReference = parse_field(&path, FieldName::new("reference"))?;
    let payment = state.ledger.get_payment(&actor, &reference).await?;
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::NoStore.header())
        .json(PaymentResponse::from(payment)))
}

/// Verify a reference with the gateway and record the outcome.
#[utoipa::path(
    post,
    path = "/api/v1/payments/{reference}/verification",
    params(("reference" = String, Path, description = "Payment reference")),
    responses(
        (status = 200, description = "Payment after reconciliation", body = PaymentResponse),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Unknown reference", body = ErrorSchema),
        (status = 503, description = "Gateway unreachable", body = ErrorSchema),
        (status = 504, description = "Gateway timed out", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "reconcilePayment"
)]
#[post("/payments/{reference}/verification")]
pub async fn reconcile_payment(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let reference: PaymentReference = parse_field(&path, FieldName::new("reference"))?;
    let payment = state.ledger.reconcile_payment(&actor, &reference).await?;
    Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
}

/// Signed gateway callback.
///
/// Authenticated by the HMAC signature header rather than a session.
#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    request_body(content = Object, description = "Gateway event"),
    params((
        "x-paystack-signature" = String,
        Header,
        description = "Hex HMAC-SHA512 of the raw body"
    )),
    responses(
        (status = 200, description = "Event accepted"),
        (status = 401, description = "Signature rejected", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "paymentWebhook",
    security([])
)]
#[post("/payments/webhook")]
pub async fn payment_webhook(
    state: web::Data<HttpState>,
    request: HttpRequest,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let signature = request
        .headers()
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    let outcome = state.ledger.accept_webhook(&body, signature).await?;
    match outcome {
        Some(payment) => {
            info!(
                reference = %payment.reference,
                status = payment.status.as_str(),
                "webhook applied"
            );
            Ok(HttpResponse::Ok().json(PaymentResponse::from(payment)))
        }
        None => Ok(HttpResponse::Ok().json(json!({ "received": true }))),
    }
}

/// Whether the student's invoice for the term is paid.
#[utoipa::path(
    get,
    path = "/api/v1/students/{id}/tuition-status",
    params(("id" = String, Path, description = "Student id"), TermQuery),
    responses(
        (status = 200, description = "Tuition status", body = TuitionStatusResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "tuitionStatus"
)]
#[get("/students/{id}/tuition-status")]
pub async fn tuition_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<TermQuery>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let student: StudentId = parse_id(&path, FieldName::new("id"))?;
    let term = parse_term(query.session.as_deref(), query.semester.as_deref())?;
    let paid = state.ledger.is_tuition_paid(&actor, &student, term).await?;
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::NoStore.header())
        .json(TuitionStatusResponse {
            student_id: student.to_string(),
            term: term.into(),
            paid,
        }))
}

/// Invoice and payment totals for a term.
#[utoipa::path(
    get,
    path = "/api/v1/ledger/summary",
    params(TermQuery),
    responses(
        (status = 200, description = "Term totals", body = LedgerSummaryResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["ledger"],
    operation_id = "ledgerSummary"
)]
#[get("/ledger/summary")]
pub async fn ledger_summary(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TermQuery>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let term = parse_term(query.session.as_deref(), query.semester.as_deref())?;
    let summary = state.ledger.ledger_summary(&actor, term).await?;
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::NoStore.header())
        .json(LedgerSummaryResponse::new(term, summary)))
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
