//! Port for the external payment gateway.
//!
//! The gateway is treated as opaque: it opens a checkout for a reference and
//! later reports whether the reference was paid, and for how much.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::domain::{Money, PaymentReference};

use super::define_port_error;

/// Header carrying the gateway's hex HMAC-SHA512 of a webhook body.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-paystack-signature";

define_port_error! {
    /// Errors raised by payment gateway adapters.
    pub enum PaymentGatewayError {
        /// The gateway did not answer in time.
        Timeout { message: String } =>
            "payment gateway timed out: {message}",
        /// The gateway refused the request.
        Rejected { message: String } =>
            "payment gateway rejected the request: {message}",
        /// The gateway could not be reached.
        Transport { message: String } =>
            "payment gateway transport failed: {message}",
        /// The gateway answered with an unreadable body.
        Decode { message: String } =>
            "payment gateway response could not be decoded: {message}",
        /// A webhook was unsigned or its signature did not match.
        Signature { message: String } =>
            "payment webhook signature rejected: {message}",
    }
}

/// Checkout request sent to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    /// Merchant reference.
    pub reference: PaymentReference,
    /// Payer email.
    pub email: String,
    /// Amount to collect.
    pub amount: Money,
    /// Page the gateway redirects to after checkout.
    pub callback_url: Option<String>,
    /// Free-form metadata echoed back by the gateway.
    pub metadata: Value,
}

/// Checkout session opened by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    /// Page where the payer completes the payment.
    pub authorization_url: String,
    /// Gateway access code for the session.
    pub access_code: String,
}

/// What the gateway says happened to a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// Money was collected.
    Succeeded {
        /// Gateway transaction identifier.
        transaction_id: String,
    },
    /// The payment definitively failed.
    Failed {
        /// Gateway-provided reason.
        reason: String,
    },
    /// The payer has not finished yet.
    Pending,
}

/// Confirmation fed into reconciliation, from verification or a webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfirmation {
    /// Merchant reference.
    pub reference: PaymentReference,
    /// Amount the gateway reports.
    pub amount: Money,
    /// Reported outcome.
    pub outcome: GatewayOutcome,
}

/// Port for opening and verifying gateway payments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a checkout session.
    async fn initialize(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError>;

    /// Ask the gateway what happened to a reference.
    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<PaymentConfirmation, PaymentGatewayError>;

    /// Authenticate a webhook body against its signature and decode it.
    ///
    /// Returns `None` for events that carry no payment outcome.
    fn decode_webhook(
        &self,
        body: &[u8],
        signature: Option<String>,
    ) -> Result<Option<PaymentConfirmation>, PaymentGatewayError>;
}

/// Sandbox gateway used when no gateway secret is configured.
///
/// Every checkout it opens is reported as paid in full on verification;
/// unknown references are reported as failed.
#[derive(Debug, Default)]
pub struct FixturePaymentGateway {
    opened: Mutex<HashMap<PaymentReference, Money>>,
}

#[async_trait]
impl PaymentGateway for FixturePaymentGateway {
    async fn initialize(
        &self,
        request: &CheckoutRequest,
    ) -> Result<CheckoutSession, PaymentGatewayError> {
        self.opened
            .lock()
            .await
            .insert(request.reference.clone(), request.amount);
        Ok(CheckoutSession {
            authorization_url: format!("https://sandbox.invalid/checkout/{}", request.reference),
            access_code: format!("sandbox-{}", request.reference),
        })
    }

    async fn verify(
        &self,
        reference: &PaymentReference,
    ) -> Result<PaymentConfirmation, PaymentGatewayError> {
        let opened = self.opened.lock().await;
        let confirmation = match opened.get(reference) {
            Some(amount) => PaymentConfirmation {
                reference: reference.clone(),
                amount: *amount,
                outcome: GatewayOutcome::Succeeded {
                    transaction_id: format!("sandbox-txn-{reference}"),
                },
            },
            None => PaymentConfirmation {
                reference: reference.clone(),
                amount: Money::ZERO,
                outcome: GatewayOutcome::Failed {
                    reason: "unknown reference".to_owned(),
                },
            },
        };
        Ok(confirmation)
    }

    fn decode_webhook(
        &self,
        _body: &[u8],
        _signature: Option<String>,
    ) -> Result<Option<PaymentConfirmation>, PaymentGatewayError> {
        Err(PaymentGatewayError::signature(
            "webhooks are disabled without a gateway secret",
        ))
    }
}
