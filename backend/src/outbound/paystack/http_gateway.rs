//! Reqwest-backed Paystack gateway.
//!
//! This adapter owns transport details only: bearer authentication, amount
//! conversion to kobo, HTTP error mapping and webhook signature checks.

use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use sha2::Sha512;
use zeroize::Zeroizing;

use super::dto::{EnvelopeDto, InitializeDataDto, InitializeRequestDto, TransactionDto, WebhookDto};
use crate::domain::PaymentReference;
use crate::domain::ports::{
    CheckoutRequest, CheckoutSession, PaymentConfirmation, PaymentGateway, PaymentGatewayError,
};

const CHARGE_SUCCESS_EVENT: &str = "charge.success";

type HmacSha512 = Hmac<Sha512>;

/// Paystack adapter bound to one API base URL and secret key.
pub struct PaystackGateway {
    client: Client,
    base: Url,
    secret: Zeroizing<String>,
}

impl PaystackGateway {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        base: Url,
        secret: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
            secret,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PaymentGatewayError> {
        self.base.join(path).map_err(|err| {
            PaymentGatewayError::transport(format!("invalid endpoint {path}: {err}"))
        })
    }

    async fn read<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentGatewayError> {
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }
        unwrap_envelope(body.as_ref())
    }
}

fn with_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn initialize(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError> {
        let body = InitializeRequestDto {
            email: &request.email,
            amount: request.amount.kobo(),
            reference: request.reference.as_str(),
            callback_url: request.callback_url.as_deref(),
            metadata: &request.metadata,
        };
        let response = self
            .client
            .post(self.endpoint("transaction/initialize")?)
            .bearer_auth(self.secret.as_str())
            .json(&body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let data: InitializeDataDto = Self::read(response).await?;
        Ok(CheckoutSession {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<PaymentConfirmation, PaymentGatewayError> {
        let response = self
            .client
            .get(self.endpoint(&format!("transaction/verify/{reference}"))?)
            .bearer_auth(self.secret.as_str())
            .send()
            .await
            .map_err(map_transport_error)?;
        let data: TransactionDto = Self::read(response).await?;
        data.into_confirmation()
            .map_err(PaymentGatewayError::decode)
    }

    fn decode_webhook(
        &self,
        body: &[u8],
        signature: Option<String>,
    ) -> Result<Option<PaymentConfirmation>, PaymentGatewayError> {
        verify_signature(self.secret.as_bytes(), body, signature.as_deref())?;
        parse_webhook(body)
    }
}

fn verify_signature(
    secret: &[u8],
    body: &[u8],
    signature: Option<&str>,
) -> Result<(), PaymentGatewayError> {
    let signature =
        signature.ok_or_else(|| PaymentGatewayError::signature("signature header missing"))?;
    let expected = hex::decode(signature.trim())
        .map_err(|_| PaymentGatewayError::signature("signature is not hex"))?;
    let mut mac = HmacSha512::new_from_slice(secret)
        .map_err(|err| PaymentGatewayError::signature(err.to_string()))?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| PaymentGatewayError::signature("digest mismatch"))
}

fn parse_webhook(body: &[u8]) -> Result<Option<PaymentConfirmation>, PaymentGatewayError> {
    let event: WebhookDto = serde_json::from_slice(body).map_err(|error| {
        PaymentGatewayError::decode(format!("invalid webhook payload: {error}"))
    })?;
    if event.event != CHARGE_SUCCESS_EVENT {
        return Ok(None);
    }
    let data: TransactionDto = serde_json::from_value(event.data).map_err(|error| {
        PaymentGatewayError::decode(format!("invalid charge payload: {error}"))
    })?;
    data.into_confirmation()
        .map(Some)
        .map_err(PaymentGatewayError::decode)
}

fn unwrap_envelope<T: DeserializeOwned>(body: &[u8]) -> Result<T, PaymentGatewayError> {
    let envelope: EnvelopeDto<T> = serde_json::from_slice(body).map_err(|error| {
        PaymentGatewayError::decode(format!("invalid Paystack payload: {error}"))
    })?;
    if !envelope.status {
        return Err(PaymentGatewayError::rejected(envelope.message));
    }
    envelope
        .data
        .ok_or_else(|| PaymentGatewayError::decode("response carried no data"))
}

fn map_transport_error(error: reqwest::Error) -> PaymentGatewayError {
    if error.is_timeout() {
        PaymentGatewayError::timeout(error.to_string())
    } else {
        PaymentGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentGatewayError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            PaymentGatewayError::timeout(message)
        }
        _ if status.is_client_error() => PaymentGatewayError::rejected(message),
        _ => PaymentGatewayError::transport(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for non-network Paystack helpers.

    use rstest::rstest;

    use super::*;
    use crate::domain::Money;
    use crate::domain::ports::GatewayOutcome;

    const SECRET: &[u8] = b"sk_test_secret";

    fn sign(body: &[u8]) -> String {
        let mut mac = HmacSha512::new_from_slice(SECRET).expect("any key length");
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    fn charge(status: &str) -> String {
        format!(
            r#"{{
                "event": "charge.success",
                "data": {{
                    "id": 4099260516,
                    "status": "{status}",
                    "reference": "PAY-0A1B2C3D4E",
                    "amount": 3000000,
                    "gateway_response": "Approved"
                }}
            }}"#
        )
    }

    #[rstest]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT)]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT)]
    fn timeout_statuses_map_to_timeout(#[case] status: StatusCode) {
        let error = map_status_error(status, b"");
        assert!(matches!(error, PaymentGatewayError::Timeout { .. }));
    }

    #[rstest]
    #[case::unauthorized(StatusCode::UNAUTHORIZED)]
    #[case::bad_request(StatusCode::BAD_REQUEST)]
    fn client_statuses_map_to_rejected(#[case] status: StatusCode) {
        let error = map_status_error(status, br#"{"status":false,"message":"Invalid key"}"#);
        match error {
            PaymentGatewayError::Rejected { message } => assert!(message.contains("Invalid key")),
            other => panic!("expected rejection, got {other}"),
        }
    }

    #[test]
    fn server_errors_map_to_transport() {
        let error = map_status_error(StatusCode::BAD_GATEWAY, b"upstream down");
        assert!(matches!(error, PaymentGatewayError::Transport { .. }));
    }

    #[test]
    fn false_envelope_is_rejected() {
        let error = unwrap_envelope::<TransactionDto>(
            br#"{"status":false,"message":"Transaction reference not found"}"#,
        )
        .expect_err("rejected");
        assert_eq!(
            error,
            PaymentGatewayError::rejected("Transaction reference not found")
        );
    }

    #[test]
    fn initialize_envelope_decodes() {
        let data: InitializeDataDto = unwrap_envelope(
            br#"{
                "status": true,
                "message": "Authorization URL created",
                "data": {
                    "authorization_url": "https://checkout.paystack.com/abc",
                    "access_code": "abc",
                    "reference": "PAY-0A1B2C3D4E"
                }
            }"#,
        )
        .expect("decodes");
        assert_eq!(data.authorization_url, "https://checkout.paystack.com/abc");
        assert_eq!(data.access_code, "abc");
    }

    #[rstest]
    #[case::success("success", true)]
    #[case::failed("failed", false)]
    fn verified_transactions_convert_kobo(#[case] status: &str, #[case] succeeded: bool) {
        let body = format!(
            r#"{{"status":true,"message":"Verification successful","data":{{
                "id": 7, "status": "{status}", "reference": "PAY-0A1B2C3D4E",
                "amount": 3000000, "gateway_response": "Declined"
            }}}}"#
        );
        let confirmation = unwrap_envelope::<TransactionDto>(body.as_bytes())
            .expect("decodes")
            .into_confirmation()
            .expect("reference parses");
        assert_eq!(confirmation.amount, Money::naira(30_000));
        assert_eq!(
            matches!(confirmation.outcome, GatewayOutcome::Succeeded { .. }),
            succeeded
        );
    }

    #[test]
    fn signed_charge_webhook_decodes() {
        let body = charge("success");
        verify_signature(SECRET, body.as_bytes(), Some(&sign(body.as_bytes())))
            .expect("signature matches");
        let confirmation = parse_webhook(body.as_bytes())
            .expect("decodes")
            .expect("charge carries an outcome");
        assert_eq!(confirmation.reference.as_str(), "PAY-0A1B2C3D4E");
        assert_eq!(
            confirmation.outcome,
            GatewayOutcome::Succeeded {
                transaction_id: "4099260516".to_owned()
            }
        );
    }

    #[rstest]
    #[case::missing(None)]
    #[case::not_hex(Some("zz".to_owned()))]
    #[case::wrong_digest(Some("00".repeat(64)))]
    fn bad_signatures_are_refused(#[case] signature: Option<String>) {
        let body = charge("success");
        let error = verify_signature(SECRET, body.as_bytes(), signature.as_deref())
            .expect_err("refused");
        assert!(matches!(error, PaymentGatewayError::Signature { .. }));
    }

    #[test]
    fn tampered_body_is_refused() {
        let body = charge("success");
        let signature = sign(body.as_bytes());
        let tampered = body.replace("3000000", "9000000");
        let error = verify_signature(SECRET, tampered.as_bytes(), Some(&signature))
            .expect_err("refused");
        assert!(matches!(error, PaymentGatewayError::Signature { .. }));
    }

    #[test]
    fn other_events_carry_no_outcome() {
        let body = br#"{"event":"transfer.success","data":{"transfer_code":"TRF_1"}}"#;
        let decoded = parse_webhook(body).expect("decodes");
        assert!(decoded.is_none());
    }

    #[test]
    fn trailing_slash_is_added_to_base() {
        let base = with_trailing_slash(Url::parse("https://api.paystack.co/v1").expect("url"));
        assert_eq!(
            base.join("transaction/initialize").expect("joins").as_str(),
            "https://api.paystack.co/v1/transaction/initialize"
        );
    }
}
