//! Grade approval and academic standing endpoints.
//!
//! ```text
//! PUT /api/v1/grades {"offeringId":"...","studentId":"...","continuousAssessment":30,"exam":45}
//! GET /api/v1/grades/{id}
//! POST /api/v1/grades/{id}/submission
//! POST /api/v1/grades/{id}/hod-approval
//! POST /api/v1/grades/{id}/verification
//! POST /api/v1/grades/{id}/publication
//! POST /api/v1/grades/{id}/rejection {"reason":"..."}
//! GET /api/v1/offerings/{id}/grades
//! GET /api/v1/students/{id}/grades
//! GET /api/v1/students/{id}/standing
//! ```

use actix_web::{HttpResponse, get, post, put, web};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::domain::ports::ScoreEntry;
use crate::domain::{Error, GradeRecord, GradeRecordId, OfferingId, StudentId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::CachePolicy;
use crate::inbound::http::dto::{GradeResponse, StandingResponse};
use crate::inbound::http::registrations::RejectionBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, numeric_text, parse_id, parse_score, require};

/// Request body for `PUT /api/v1/grades`.
///
/// Score components accept JSON numbers or numeric strings.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnterScoreBody {
    pub offering_id: Option<String>,
    pub student_id: Option<String>,
    #[schema(value_type = Option<f64>, example = 28.5)]
    pub continuous_assessment: Option<Value>,
    #[schema(value_type = Option<f64>, example = 46.5)]
    pub exam: Option<Value>,
}

fn parse_score_body(body: EnterScoreBody) -> Result<ScoreEntry, Error> {
    let offering_field = FieldName::new("offeringId");
    let student_field = FieldName::new("studentId");
    let ca_field = FieldName::new("continuousAssessment");
    let exam_field = FieldName::new("exam");

    let offering: OfferingId =
        parse_id(require(body.offering_id.as_deref(), offering_field)?, offering_field)?;
    let student: StudentId =
        parse_id(require(body.student_id.as_deref(), student_field)?, student_field)?;
    let ca = numeric_text(&require(body.continuous_assessment, ca_field)?, ca_field)?;
    let exam = numeric_text(&require(body.exam, exam_field)?, exam_field)?;
    Ok(ScoreEntry {
        offering,
        student,
        score: parse_score(&ca, &exam)?,
    })
}

fn grade_id(raw: &str) -> ApiResult<GradeRecordId> {
    parse_id(raw, FieldName::new("id"))
}

fn student_id(raw: &str) -> ApiResult<StudentId> {
    parse_id(raw, FieldName::new("id"))
}

fn ok_grade(record: GradeRecord) -> ApiResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(GradeResponse::from(record)))
}

fn grade_list(records: Vec<GradeRecord>) -> ApiResult<HttpResponse> {
    let body: Vec<GradeResponse> = records.into_iter().map(GradeResponse::from).collect();
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::PrivateRevalidate.header())
        .json(body))
}

/// Create or update a draft grade.
#[utoipa::path(
    put,
    path = "/api/v1/grades",
    request_body = EnterScoreBody,
    responses(
        (status = 200, description = "Draft saved", body = GradeResponse),
        (status = 400, description = "Invalid score", body = ErrorSchema),
        (status = 403, description = "Not the teaching lecturer", body = ErrorSchema),
        (status = 404, description = "Offering or registration not found", body = ErrorSchema),
        (status = 409, description = "Record already beyond draft", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "enterScore"
)]
#[put("/grades")]
pub async fn enter_score(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<EnterScoreBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let entry = parse_score_body(payload.into_inner())?;
    ok_grade(state.grades.enter_score(&actor, entry).await?)
}

/// Fetch one grade record.
#[utoipa::path(
    get,
    path = "/api/v1/grades/{id}",
    params(("id" = String, Path, description = "Grade record id")),
    responses(
        (status = 200, description = "Grade record", body = GradeResponse),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Not found", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "getGrade"
)]
#[get("/grades/{id}")]
pub async fn get_grade(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = grade_id(&path)?;
    ok_grade(state.grades.get(&actor, &id).await?)
}

/// `draft -> submitted`.
#[utoipa::path(
    post,
    path = "/api/v1/grades/{id}/submission",
    params(("id" = String, Path, description = "Grade record id")),
    responses(
        (status = 200, description = "Submitted", body = GradeResponse),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Illegal transition", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "submitGrade"
)]
#[post("/grades/{id}/submission")]
pub async fn submit_grade(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = grade_id(&path)?;
    ok_grade(state.grades.submit(&actor, &id).await?)
}

/// `submitted -> hod_approved`.
#[utoipa::path(
    post,
    path = "/api/v1/grades/{id}/hod-approval",
    params(("id" = String, Path, description = "Grade record id")),
    responses(
        (status = 200, description = "Approved", body = GradeResponse),
        (status = 403, description = "Not the department's HOD", body = ErrorSchema),
        (status = 409, description = "Illegal transition", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "hodApproveGrade"
)]
#[post("/grades/{id}/hod-approval")]
pub async fn hod_approve_grade(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = grade_id(&path)?;
    ok_grade(state.grades.hod_approve(&actor, &id).await?)
}

/// `hod_approved -> verified`.
#[utoipa::path(
    post,
    path = "/api/v1/grades/{id}/verification",
    params(("id" = String, Path, description = "Grade record id")),
    responses(
        (status = 200, description = "Verified", body = GradeResponse),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Illegal transition", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "verifyGrade"
)]
#[post("/grades/{id}/verification")]
pub async fn verify_grade(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = grade_id(&path)?;
    ok_grade(state.grades.verify(&actor, &id).await?)
}

/// `verified -> published`.
#[utoipa::path(
    post,
    path = "/api/v1/grades/{id}/publication",
    params(("id" = String, Path, description = "Grade record id")),
    responses(
        (status = 200, description = "Published", body = GradeResponse),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Illegal transition", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "publishGrade"
)]
#[post("/grades/{id}/publication")]
pub async fn publish_grade(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = grade_id(&path)?;
    ok_grade(state.grades.publish(&actor, &id).await?)
}

/// Reject a record under review.
#[utoipa::path(
    post,
    path = "/api/v1/grades/{id}/rejection",
    params(("id" = String, Path, description = "Grade record id")),
    request_body = RejectionBody,
    responses(
        (status = 200, description = "Rejected", body = GradeResponse),
        (status = 400, description = "Reason missing", body = ErrorSchema),
        (status = 403, description = "Actor does not own the current stage", body = ErrorSchema),
        (status = 409, description = "Illegal transition", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "rejectGrade"
)]
#[post("/grades/{id}/rejection")]
pub async fn reject_grade(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<RejectionBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let id = grade_id(&path)?;
    let reason = payload.into_inner().into_reason()?;
    ok_grade(state.grades.reject(&actor, &id, reason).await?)
}

/// Grade sheet of an offering.
#[utoipa::path(
    get,
    path = "/api/v1/offerings/{id}/grades",
    params(("id" = String, Path, description = "Offering id")),
    responses(
        (status = 200, description = "Grade sheet", body = [GradeResponse]),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 404, description = "Offering not found", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "listOfferingGrades"
)]
#[get("/offerings/{id}/grades")]
pub async fn list_offering_grades(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let offering: OfferingId = parse_id(&path, FieldName::new("id"))?;
    grade_list(state.grades.list_for_offering(&actor, &offering).await?)
}

/// A student's published grades.
#[utoipa::path(
    get,
    path = "/api/v1/students/{id}/grades",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "Published grades", body = [GradeResponse]),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "listStudentGrades"
)]
#[get("/students/{id}/grades")]
pub async fn list_student_grades(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let student = student_id(&path)?;
    grade_list(state.grades.published_for_student(&actor, &student).await?)
}

/// Term GPAs, CGPA, and classification.
#[utoipa::path(
    get,
    path = "/api/v1/students/{id}/standing",
    params(("id" = String, Path, description = "Student id")),
    responses(
        (status = 200, description = "Academic standing", body = StandingResponse),
        (status = 403, description = "Forbidden", body = ErrorSchema)
    ),
    tags = ["grades"],
    operation_id = "studentStanding"
)]
#[get("/students/{id}/standing")]
pub async fn student_standing(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let student = student_id(&path)?;
    let standing = state.grades.standing(&actor, &student).await?;
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::PrivateRevalidate.header())
        .json(StandingResponse::from(standing)))
}
