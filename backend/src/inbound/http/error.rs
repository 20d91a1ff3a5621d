//! HTTP rendering of domain errors.
//!
//! Each [`ErrorCode`] has one status. Internal failures are logged with
//! their original message and reach clients redacted. Gateway and store
//! outages carry `Retry-After`, since reconciliation may be retried with the
//! same payment reference.

use actix_web::http::header::RETRY_AFTER;
use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use tracing::{debug, error, warn};

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Result type returned by every handler.
pub type ApiResult<T> = Result<T, Error>;

/// Seconds clients should wait before retrying an outage response.
pub const RETRY_AFTER_SECS: u32 = 5;

const REDACTED_MESSAGE: &str = "Internal server error";

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict | ErrorCode::CapacityExceeded => StatusCode::CONFLICT,
        ErrorCode::PrerequisiteNotMet | ErrorCode::NoFeeStructureDefined => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

const fn is_retryable(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::ServiceUnavailable | ErrorCode::GatewayTimeout
    )
}

/// The body a client may see: internal errors lose message and details.
fn client_view(error: &Error) -> Error {
    if error.code() != ErrorCode::InternalError {
        return error.clone();
    }
    let redacted = Error::internal(REDACTED_MESSAGE);
    match error.trace_id() {
        Some(id) => redacted.with_trace_id(id.to_owned()),
        None => redacted,
    }
}

fn log_outcome(error: &Error, status: StatusCode) {
    let trace_id = error.trace_id().unwrap_or("-");
    if status.is_server_error() {
        if error.code() == ErrorCode::InternalError {
            error!(
                %trace_id,
                status = status.as_u16(),
                message = error.message(),
                "request failed"
            );
        } else {
            warn!(
                %trace_id,
                status = status.as_u16(),
                message = error.message(),
                "dependency unavailable"
            );
        }
    } else {
        debug!(%trace_id, status = status.as_u16(), code = ?error.code(), "request refused");
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        log_outcome(self, status);

        let mut builder = HttpResponse::build(status);
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        if is_retryable(self.code()) {
            builder.insert_header((RETRY_AFTER, RETRY_AFTER_SECS.to_string()));
        }
        builder.json(client_view(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        error!(error = %err, "framework error surfaced in a handler");
        Self::internal(REDACTED_MESSAGE)
    }
}
