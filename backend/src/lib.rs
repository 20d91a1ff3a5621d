//! College administration backend.
//!
//! Hexagonal layout: [`domain`] holds the workflows and their ports,
//! [`inbound`] adapts HTTP requests onto them, and [`outbound`] implements
//! the driven ports over PostgreSQL, memory, and the payment gateway.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
