//! Outbound adapters implementing the driven domain ports.
//!
//! - **memory**: in-process store used without a database and by tests
//! - **persistence**: PostgreSQL repositories using Diesel ORM
//! - **paystack**: reqwest client for the payment gateway
//! - **metrics**: Prometheus workflow counters (feature-gated)
//!
//! Adapters translate between domain types and infrastructure
//! representations. They contain no workflow rules.

pub mod memory;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod paystack;
pub mod persistence;
