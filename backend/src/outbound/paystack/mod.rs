//! Paystack outbound adapter.
//!
//! Implements the `PaymentGateway` port over the Paystack transaction API
//! and authenticates its webhooks.

mod dto;
mod http_gateway;

pub use http_gateway::PaystackGateway;
