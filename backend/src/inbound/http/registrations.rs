//! Course registration endpoints.
//!
//! ```text
//! POST /api/v1/registrations {"offeringId":"..."}
//! GET /api/v1/registrations?session=2024/2025&semester=first
//! GET /api/v1/registrations/summary?session=2024/2025&semester=first
//! GET /api/v1/registrations/{id}
//! POST /api/v1/registrations/{id}/lecturer-approval
//! POST /api/v1/registrations/{id}/lecturer-rejection {"reason":"..."}
//! POST /api/v1/registrations/{id}/exam-officer-approval
//! POST /api/v1/registrations/{id}/exam-officer-rejection {"reason":"..."}
//! GET /api/v1/offerings/{id}/registrations?status=pending
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::domain::{CourseRegistration, OfferingId, RegistrationId, RegistrationStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::CachePolicy;
use crate::inbound::http::catalogue::TermQuery;
use crate::inbound::http::dto::{RegistrationResponse, RegistrationSummaryResponse};
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_field, parse_id, parse_optional_term, parse_term, require,
};

/// Request body for `POST /api/v1/registrations`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRegistrationBody {
    pub offering_id: Option<String>,
}

/// Request body for rejection endpoints.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RejectionBody {
    #[schema(example = "Prerequisite evidence missing")]
    pub reason: Option<String>,
}

impl RejectionBody {
    pub(crate) fn into_reason(self) -> ApiResult<String> {
        require(self.reason, FieldName::new("reason"))
    }
}

/// Status filter for an offering's registrations.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusQuery {
    #[param(example = "pending")]
    pub status: Option<String>,
}

fn registration_id(raw: &str) -> ApiResult<RegistrationId> {
    parse_id(raw, FieldName::new("id"))
}

fn ok_registration(
    registration: CourseRegistration,
) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(RegistrationResponse::from(registration)))
}

fn registration_list(
    registrations: Vec<CourseRegistration>,
) -> ApiResult<HttpResponse> {
    let body: Vec<RegistrationResponse> = registrations
        .into_iter()
        .map(RegistrationResponse::from)
        .collect();
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::PrivateRevalidate.header())
        .json(body))
}

/// Request a seat in an offering.
#[utoipa::path(
    post,
    path = "/api/v1/registrations",
    request_body = SubmitRegistrationBody,
    responses(
        (status = 201, description = "Registration pending", body = RegistrationResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Offering not found", body = ErrorSchema),
        (status = 409, description = "Duplicate or full offering", body = ErrorSchema),
        (status = 422, description = "Prerequisite not met", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "submitRegistration"
)]
#[post("/registrations")]
pub async fn submit_registration(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SubmitRegistrationBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let field = FieldName::new("offeringId");
    let offering: OfferingId = parse_id(require(payload.offering_id.as_deref(), field)?, field)?;
    let registration = state.registrations.submit(&actor, &offering).await?;
    Ok(HttpResponse::Created().json(RegistrationResponse::from(registration)))
}

/// The acting student's registrations.
#[utoipa::path(
    get,
    path = "/api/v1/registrations",
    params(TermQuery),
    responses(
        (status = 200, description = "Registrations", body = [RegistrationResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "listOwnRegistrations"
)]
#[get("/registrations")]
pub async fn list_own_registrations(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TermQuery>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let term = parse_optional_term(query.session.as_deref(), query.semester.as_deref())?;
    registration_list(state.registrations.list_own(&actor, term).await?)
}

/// Counts per status for the acting student's term.
#[utoipa::path(
    get,
    path = "/api/v1/registrations/summary",
    params(TermQuery),
    responses(
        (status = 200, description = "Summary", body = RegistrationSummaryResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "registrationSummary"
)]
#[get("/registrations/summary")]
pub async fn registration_summary(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TermQuery>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let term = parse_term(query.session.as_deref(), query.semester.as_deref())?;
    let summary = state.registrations.summary(&actor, term).await?;
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::PrivateRevalidate.header())
        .json(RegistrationSummaryResponse::from(summary)))
}

/// Fetch one registration.
#[utoipa::path(
    get,
    path = "/api/v1/registrations/{id}",
    params(("id" = String, Path, description = "Registration id")),
    responses(
        (status = 200, description = "Registration", body = RegistrationResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "getRegistration"
)]
#[get("/registrations/{id}")]
pub async fn get_registration(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = registration_id(&path)?;
    ok_registration(state.registrations.get(&actor, &id).await?)
}

/// `pending -> lecturer_approved`.
#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/lecturer-approval",
    params(("id" = String, Path, description = "Registration id")),
    responses(
        (status = 200, description = "Approved", body = RegistrationResponse),
        (status = 403, description = "Not the teaching lecturer", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema),
        (status = 409, description = "Illegal transition", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "approveAsLecturer"
)]
#[post("/registrations/{id}/lecturer-approval")]
pub async fn approve_as_lecturer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = registration_id(&path)?;
    ok_registration(state.registrations.approve_as_lecturer(&actor, &id).await?)
}

/// `pending -> rejected_by_lecturer`.
#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/lecturer-rejection",
    params(("id" = String, Path, description = "Registration id")),
    request_body = RejectionBody,
    responses(
        (status = 200, description = "Rejected", body = RegistrationResponse),
        (status = 400, description = "Reason missing", body = ErrorSchema),
        (status = 403, description = "Not the teaching lecturer", body = ErrorSchema),
        (status = 409, description = "Illegal transition", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "rejectAsLecturer"
)]
#[post("/registrations/{id}/lecturer-rejection")]
pub async fn reject_as_lecturer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RejectionBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = registration_id(&path)?;
    let reason = payload.into_inner().into_reason()?;
    ok_registration(
        state
            .registrations
            .reject_as_lecturer(&actor, &id, reason)
            .await?,
    )
}

/// `lecturer_approved -> registered`.
#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/exam-officer-approval",
    params(("id" = String, Path, description = "Registration id")),
    responses(
        (status = 200, description = "Registered", body = RegistrationResponse),
        (status = 402, description = "Tuition unpaid and no waiver left", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Illegal transition or offering full", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "approveAsExamOfficer"
)]
#[post("/registrations/{id}/exam-officer-approval")]
pub async fn approve_as_exam_officer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = registration_id(&path)?;
    let registration = state
        .registrations
        .approve_as_exam_officer(&actor, &id)
        .await?;
    debug!(
        registration = %registration.id,
        waived = registration.payment_waived,
        "registration finalised"
    );
    ok_registration(registration)
}

/// `lecturer_approved -> rejected_by_exam_officer`.
#[utoipa::path(
    post,
    path = "/api/v1/registrations/{id}/exam-officer-rejection",
    params(("id" = String, Path, description = "Registration id")),
    request_body = RejectionBody,
    responses(
        (status = 200, description = "Rejected", body = RegistrationResponse),
        (status = 400, description = "Reason missing", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Illegal transition", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "rejectAsExamOfficer"
)]
#[post("/registrations/{id}/exam-officer-rejection")]
pub async fn reject_as_exam_officer(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RejectionBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = registration_id(&path)?;
    let reason = payload.into_inner().into_reason()?;
    ok_registration(
        state
            .registrations
            .reject_as_exam_officer(&actor, &id, reason)
            .await?,
    )
}

/// Registrations of an offering.
#[utoipa::path(
    get,
    path = "/api/v1/offerings/{id}/registrations",
    params(("id" = String, Path, description = "Offering id"), StatusQuery),
    responses(
        (status = 200, description = "Registrations", body = [RegistrationResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Offering not found", body = ErrorSchema)
    ),
    tags = ["registrations"],
    operation_id = "listOfferingRegistrations"
)]
#[get("/offerings/{id}/registrations")]
pub async fn list_offering_registrations(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<StatusQuery>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let offering: OfferingId = parse_id(&path, FieldName::new("id"))?;
    let status = query
        .status
        .as_deref()
        .map(|raw| parse_field::<RegistrationStatus>(raw, FieldName::new("status")))
        .transpose()?;
    registration_list(
        state
            .registrations
            .list_for_offering(&actor, &offering, status)
            .await?,
    )
}

#[cfg(test)]
#[path = "registrations_tests.rs"]
mod tests;
