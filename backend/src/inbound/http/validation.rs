//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper returns an `invalid_request` error whose details name the
//! offending field and a stable machine-readable code.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Value, json};

use crate::domain::{AcademicSession, Error, Money, ScoreBreakdown, Semester, Term};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidValue,
    InvalidAmount,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidValue => "invalid_value",
            ErrorCode::InvalidAmount => "invalid_amount",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

/// Builder for validation errors with field context.
struct ValidationError {
    field: String,
    message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    fn with_code(self, code: ErrorCode) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "code": code.as_str(),
        }))
    }

    fn with_value(self, code: ErrorCode, value: impl Into<String>) -> Error {
        Error::invalid_request(self.message).with_details(json!({
            "field": self.field,
            "value": value.into(),
            "code": code.as_str(),
        }))
    }
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    let field = field.as_str();
    ValidationError::new(field, format!("missing required field: {field}"))
        .with_code(ErrorCode::MissingField)
}

pub(crate) fn invalid_value_error(field: FieldName, value: &str, reason: impl AsRef<str>) -> Error {
    let name = field.as_str();
    ValidationError::new(name, format!("{name} is invalid: {}", reason.as_ref()))
        .with_value(ErrorCode::InvalidValue, value)
}

/// Require an optional body field.
pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

/// Accept a JSON number or numeric string and return its text form.
pub(crate) fn numeric_text(value: &Value, field: FieldName) -> Result<String, Error> {
    match value {
        Value::Number(number) => Ok(number.to_string()),
        Value::String(text) => Ok(text.trim().to_owned()),
        other => Err(invalid_value_error(
            field,
            &other.to_string(),
            "expected a number",
        )),
    }
}

/// Parse a UUID-backed identifier.
pub(crate) fn parse_id<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse::<T>().map_err(|_| {
        let name = field.as_str();
        ValidationError::new(name, format!("{name} must be a valid UUID"))
            .with_value(ErrorCode::InvalidUuid, value)
    })
}

/// Parse any value whose parse error renders a useful reason.
pub(crate) fn parse_field<T>(value: &str, field: FieldName) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|err| invalid_value_error(field, value, err.to_string()))
}

/// Parse a naira amount such as `"30000"` or `"30000.50"`.
pub(crate) fn parse_money(value: &str, field: FieldName) -> Result<Money, Error> {
    value.parse::<Money>().map_err(|err| {
        let name = field.as_str();
        ValidationError::new(name, format!("{name} is not a valid amount: {err}"))
            .with_value(ErrorCode::InvalidAmount, value)
    })
}

/// Parse a continuous assessment and exam pair.
pub(crate) fn parse_score(
    continuous_assessment: &str,
    exam: &str,
) -> Result<ScoreBreakdown, Error> {
    let ca_field = FieldName::new("continuousAssessment");
    let exam_field = FieldName::new("exam");
    let ca = parse_field::<Decimal>(continuous_assessment, ca_field)?;
    let exam_value = parse_field::<Decimal>(exam, exam_field)?;
    ScoreBreakdown::try_new(ca, exam_value).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({
            "field": "score",
            "code": ErrorCode::InvalidValue.as_str(),
        }))
    })
}

/// Parse a `session` and `semester` pair, both required.
pub(crate) fn parse_term(session: Option<&str>, semester: Option<&str>) -> Result<Term, Error> {
    let session_field = FieldName::new("session");
    let semester_field = FieldName::new("semester");
    let session = require(session, session_field)?;
    let semester = require(semester, semester_field)?;
    Ok(Term::new(
        parse_field::<AcademicSession>(session, session_field)?,
        parse_field::<Semester>(semester, semester_field)?,
    ))
}

/// Parse a term filter where both halves must be given together.
pub(crate) fn parse_optional_term(
    session: Option<&str>,
    semester: Option<&str>,
) -> Result<Option<Term>, Error> {
    match (session, semester) {
        (None, None) => Ok(None),
        (session, semester) => parse_term(session, semester).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn details_code(error: &Error) -> Option<&str> {
        error
            .details()
            .and_then(|details| details.get("code"))
            .and_then(serde_json::Value::as_str)
    }

    #[rstest]
    fn term_requires_both_halves() {
        let err = parse_term(Some("2024/2025"), None).expect_err("semester missing");
        assert_eq!(details_code(&err), Some("missing_field"));
        assert_eq!(
            err.details().and_then(|d| d.get("field")),
            Some(&json!("semester"))
        );
    }

    #[rstest]
    fn term_parses_wire_forms() {
        let term = parse_term(Some("2024/2025"), Some("first")).expect("valid term");
        assert_eq!(term.session.start_year(), 2024);
        assert_eq!(term.semester, Semester::First);
    }

    #[rstest]
    #[case(None, None, true)]
    #[case(Some("2024/2025"), Some("second"), false)]
    fn optional_term_accepts_absent_pair(
        #[case] session: Option<&str>,
        #[case] semester: Option<&str>,
        #[case] absent: bool,
    ) {
        let term = parse_optional_term(session, semester).expect("valid filter");
        assert_eq!(term.is_none(), absent);
    }

    #[rstest]
    fn malformed_session_is_invalid_value() {
        let err = parse_term(Some("2024-2025"), Some("first")).expect_err("bad session");
        assert_eq!(details_code(&err), Some("invalid_value"));
    }

    #[rstest]
    fn ids_must_be_uuids() {
        let err = parse_id::<crate::domain::OfferingId>("nope", FieldName::new("offeringId"))
            .expect_err("not a uuid");
        assert_eq!(details_code(&err), Some("invalid_uuid"));
    }

    #[rstest]
    #[case("30000", true)]
    #[case("-5", false)]
    #[case("12.345", false)]
    fn money_parsing(#[case] raw: &str, #[case] ok: bool) {
        assert_eq!(parse_money(raw, FieldName::new("amount")).is_ok(), ok);
    }

    #[rstest]
    #[case(json!(25.5), Some("25.5"))]
    #[case(json!("75"), Some("75"))]
    #[case(json!(true), None)]
    fn numeric_fields_accept_numbers_and_strings(
        #[case] raw: Value,
        #[case] expected: Option<&str>,
    ) {
        let text = numeric_text(&raw, FieldName::new("exam")).ok();
        assert_eq!(text.as_deref(), expected);
    }

    #[rstest]
    fn score_over_one_hundred_is_rejected() {
        let err = parse_score("40", "70").expect_err("total above 100");
        assert_eq!(err.code(), crate::domain::ErrorCode::InvalidRequest);
    }
}
