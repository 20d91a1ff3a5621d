//! Wire shapes for the Paystack transaction API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ports::{GatewayOutcome, PaymentConfirmation};
use crate::domain::{Money, PaymentReference};

#[derive(Debug, Serialize)]
pub(super) struct InitializeRequestDto<'a> {
    pub(super) email: &'a str,
    /// Amount in kobo.
    pub(super) amount: i64,
    pub(super) reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(super) callback_url: Option<&'a str>,
    pub(super) metadata: &'a Value,
}

/// Envelope shared by every Paystack response.
#[derive(Debug, Deserialize)]
pub(super) struct EnvelopeDto<T> {
    pub(super) status: bool,
    #[serde(default)]
    pub(super) message: String,
    pub(super) data: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct InitializeDataDto {
    pub(super) authorization_url: String,
    pub(super) access_code: String,
}

#[derive(Debug, Deserialize)]
pub(super) struct TransactionDto {
    pub(super) id: i64,
    pub(super) status: String,
    pub(super) reference: String,
    /// Amount in kobo.
    pub(super) amount: i64,
    #[serde(default)]
    pub(super) gateway_response: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WebhookDto {
    pub(super) event: String,
    /// Event-specific payload; only charge events are decoded further.
    #[serde(default)]
    pub(super) data: Value,
}

impl TransactionDto {
    pub(super) fn into_confirmation(self) -> Result<PaymentConfirmation, String> {
        let reference: PaymentReference = self
            .reference
            .parse()
            .map_err(|err| format!("transaction {} has a foreign reference: {err}", self.id))?;
        let outcome = match self.status.as_str() {
            "success" => GatewayOutcome::Succeeded {
                transaction_id: self.id.to_string(),
            },
            "failed" | "reversed" => GatewayOutcome::Failed {
                reason: self.gateway_response.unwrap_or(self.status),
            },
            // "abandoned" only means the payer has not finished checkout yet.
            _ => GatewayOutcome::Pending,
        };
        Ok(PaymentConfirmation {
            reference,
            amount: Money::from_kobo(self.amount),
            outcome,
        })
    }
}
