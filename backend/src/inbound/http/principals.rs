//! Authentication and principal directory handlers.
//!
//! ```text
//! POST /api/v1/login {"username":"bursar","password":"correct horse"}
//! POST /api/v1/logout
//! GET /api/v1/me
//! POST /api/v1/principals
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use zeroize::Zeroizing;

use crate::domain::ports::RegisterPrincipalRequest;
use crate::domain::{
    Affiliation, DepartmentCode, Error, LecturerId, LecturerProfile, Level, LoginCredentials,
    LoginValidationError, Role, StudentId, StudentProfile,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::CachePolicy;
use crate::inbound::http::dto::PrincipalResponse;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, invalid_value_error, parse_field, require};

/// Login request body for `POST /api/v1/login`.
#[derive(Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.username, &value.password)
    }
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyUsername => Error::invalid_request("username must not be empty")
            .with_details(json!({ "field": "username", "code": "empty_username" })),
        LoginValidationError::EmptyPassword => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "empty_password" })),
    }
}

/// Authenticate a principal and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = PrincipalResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 500, description = "Internal server error", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let id = state.login.authenticate(&credentials).await?;
    let principal = state.directory.resolve(&id).await?;
    session.persist_principal(&id)?;
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::PrivateRevalidate.header())
        .json(PrincipalResponse::from(principal)))
}

/// Clear the session.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 204, description = "Session cleared")),
    tags = ["auth"],
    operation_id = "logout"
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::NoContent().finish()
}

/// Return the principal behind the current session.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current principal", body = PrincipalResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema)
    ),
    tags = ["auth"],
    operation_id = "currentPrincipal"
)]
#[get("/me")]
pub async fn current_principal(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let principal = session.require_principal(state.directory.as_ref()).await?;
    Ok(HttpResponse::Ok()
        .insert_header(CachePolicy::PrivateRevalidate.header())
        .json(PrincipalResponse::from(principal)))
}

/// Request body for `POST /api/v1/principals`.
///
/// Students need `matricNumber`, `department`, and `level`; lecturers and
/// HODs need `department`. Other roles carry no academic link.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPrincipalBody {
    pub username: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[schema(example = "lecturer")]
    pub role: Option<String>,
    pub matric_number: Option<String>,
    #[schema(example = "CSC")]
    pub department: Option<String>,
    #[schema(example = 100)]
    pub level: Option<u16>,
}

fn parse_department(raw: Option<&str>) -> Result<DepartmentCode, Error> {
    let field = FieldName::new("department");
    let raw = require(raw, field)?;
    DepartmentCode::new(raw).map_err(|err| invalid_value_error(field, raw, err.to_string()))
}

fn affiliation_for(role: Role, body: &RegisterPrincipalBody) -> Result<Affiliation, Error> {
    match role {
        Role::Student => {
            let matric_number =
                require(body.matric_number.clone(), FieldName::new("matricNumber"))?;
            let level_field = FieldName::new("level");
            let raw_level = require(body.level, level_field)?;
            let level = Level::new(raw_level).map_err(|err| {
                invalid_value_error(level_field, &raw_level.to_string(), err.to_string())
            })?;
            Ok(Affiliation::Student(StudentProfile {
                id: StudentId::random(),
                matric_number,
                department: parse_department(body.department.as_deref())?,
                level,
            }))
        }
        Role::Lecturer => Ok(Affiliation::Lecturer(LecturerProfile {
            id: LecturerId::random(),
            department: parse_department(body.department.as_deref())?,
        })),
        Role::Hod => Ok(Affiliation::Department {
            department: parse_department(body.department.as_deref())?,
        }),
        _ => Ok(Affiliation::None),
    }
}

fn parse_register_body(body: RegisterPrincipalBody) -> Result<RegisterPrincipalRequest, Error> {
    let role_field = FieldName::new("role");
    let role: Role = parse_field(require(body.role.as_deref(), role_field)?, role_field)?;
    let affiliation = affiliation_for(role, &body)?;
    Ok(RegisterPrincipalRequest {
        username: require(body.username, FieldName::new("username"))?,
        password: Zeroizing::new(require(body.password, FieldName::new("password"))?),
        full_name: require(body.full_name, FieldName::new("fullName"))?,
        email: require(body.email, FieldName::new("email"))?,
        role,
        affiliation,
    })
}

/// Register a principal with a fixed role.
#[utoipa::path(
    post,
    path = "/api/v1/principals",
    request_body = RegisterPrincipalBody,
    responses(
        (status = 201, description = "Principal created", body = PrincipalResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 403, description = "Forbidden", body = ErrorSchema),
        (status = 409, description = "Username or profile taken", body = ErrorSchema)
    ),
    tags = ["principals"],
    operation_id = "registerPrincipal"
)]
#[post("/principals")]
pub async fn register_principal(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<RegisterPrincipalBody>,
) -> ApiResult<HttpResponse> {
    let actor = session.require_principal(state.directory.as_ref()).await?;
    let request = parse_register_body(payload.into_inner())?;
    let principal = state.directory.register(&actor, request).await?;
    Ok(HttpResponse::Created().json(PrincipalResponse::from(principal)))
}

#[cfg(test)]
#[path = "principals_tests.rs"]
mod tests;
