//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    GradeWorkflow, LedgerWorkflow, LoginService, OfferingCatalogue, PrincipalDirectory,
    RegistrationWorkflow,
};

/// Parameter object bundling all port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub login: Arc<dyn LoginService>,
    pub directory: Arc<dyn PrincipalDirectory>,
    pub catalogue: Arc<dyn OfferingCatalogue>,
    pub registrations: Arc<dyn RegistrationWorkflow>,
    pub grades: Arc<dyn GradeWorkflow>,
    pub ledger: Arc<dyn LedgerWorkflow>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub login: Arc<dyn LoginService>,
    pub directory: Arc<dyn PrincipalDirectory>,
    pub catalogue: Arc<dyn OfferingCatalogue>,
    pub registrations: Arc<dyn RegistrationWorkflow>,
    pub grades: Arc<dyn GradeWorkflow>,
    pub ledger: Arc<dyn LedgerWorkflow>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from the ports bundle.
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            login,
            directory,
            catalogue,
            registrations,
            grades,
            ledger,
        } = ports;
        Self {
            login,
            directory,
            catalogue,
            registrations,
            grades,
            ledger,
        }
    }
}
