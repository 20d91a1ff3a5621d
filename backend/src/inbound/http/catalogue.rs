//! Course offering endpoints.
//!
//! ```text
//! POST /api/v1/offerings {"code":"CSC201","title":"Data Structures",...}
//! GET /api/v1/offerings?session=2024/2025&semester=first
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    CourseCode, CreditUnits, DepartmentCode, Error, LecturerId, OfferingDraft,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::CachePolicy;
use crate::inbound::http::dto::OfferingResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, parse_id, parse_term, require,
};

/// Request body for `POST /api/v1/offerings`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenOfferingBody {
    #[schema(example = "CSC201")]
    pub code: Option<String>,
    pub title: Option<String>,
    #[schema(example = 3)]
    pub credit_units: Option<u8>,
    #[schema(example = "CSC")]
    pub department: Option<String>,
    #[schema(example = "2024/2025")]
    pub session: Option<String>,
    #[schema(example = "first")]
    pub semester: Option<String>,
    pub lecturer_id: Option<String>,
    #[schema(example = 60)]
    pub capacity: Option<u32>,
    /// Course codes that need a passing published grade.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

/// Term filter shared by list endpoints.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TermQuery {
    #[param(example = "2024/2025")]
    pub session: Option<String>,
    #[param(example = "first")]
    pub semester: Option<String>,
}

fn course_code(raw: &str, field: FieldName) -> Result<CourseCode, Error> {
    CourseCode::new(raw).map_err(|err| invalid_value_error(field, raw, err.to_string()))
}

fn parse_offering_body(body: OpenOfferingBody) -> Result<OfferingDraft, Error> {
    let code_field = FieldName::new("code");
    let units_field = FieldName::new("creditUnits");
    let department_field = FieldName::new("department");
    let lecturer_field = FieldName::new("lecturerId");

    let code = course_code(require(body.code.as_deref(), code_field)?, code_field)?;
    let raw_units = require(body.credit_units, units_field)?;
    let credit_units = CreditUnits::new(raw_units)
        .map_err(|err| invalid_value_error(units_field, &raw_units.to_string(), err.to_string()))?;
    let raw_department = require(body.department.as_deref(), department_field)?;
    let department = DepartmentCode::new(raw_department)
        .map_err(|err| invalid_value_error(department_field, raw_department, err.to_string()))?;
    let lecturer: LecturerId =
        parse_id(require(body.lecturer_id.as_deref(), lecturer_field)?, lecturer_field)?;
    let prerequisites_field = FieldName::new("prerequisites");
    let prerequisites = body
        .prerequisites
        .iter()
        .map(|raw| course_code(raw, prerequisites_field))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(OfferingDraft {
        code,
        title: require(body.title, FieldName::new("title"))?,
        credit_units,
        department,
        term: parse_term(body.session.as_deref(), body.semester.as_deref())?,
        lecturer,
        capacity: require(body.capacity, FieldName::new("capacity"))?,
        prerequisites,
    })
}

/// Open a course offering for a term.
#[utoipa::path(
    post,
    path = "/api/v1/offerings",
    request_body = OpenOfferingBody,
    responses(
        (status = 201, description = "Offering opened", body = OfferingResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Offering already exists", body = ErrorSchema)
    ),
    tags = ["offerings"],
    operation_id = "openOffering"
)]
#[post("/offerings")]
pub async fn open_offering(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<OpenOfferingBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let draft = parse_offering_body(payload.into_inner())?;
    let offering = state.catalogue.open(&actor, draft).await?;
    Ok(HttpResponse::Created().json(OfferingResponse::from(offering)))
}

/// List the offerings of a term.
#[utoipa::path(
    get,
    path = "/api/v1/offerings",
    params(TermQuery),
    responses(
        (status = 200, description = "Offerings", body = [OfferingResponse]),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["offerings"],
    operation_id = "listOfferings"
)]
#[get("/offerings")]
pub async fn list_offerings(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<TermQuery>,
) -> ApiResult<HttpResponse> {
    session.require_principal(state.directory.as_ref()).await?;
    let term = parse_term(query.session.as_deref(), query.semester.as_deref())?;
    let offerings = state.catalogue.list(&term).await?;
    let body: Vec<OfferingResponse> = offerings.into_iter().map(OfferingResponse::from).collect();
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::PrivateRevalidate.header())
        .json(body))
}
