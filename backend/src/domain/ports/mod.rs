//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, the payment gateway, metrics) are
//! implemented by outbound adapters. Driving ports (workflows, login, the
//! directory) are implemented by domain services and called by inbound
//! adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod catalogue_repository;
mod grade_repository;
mod grade_workflow;
mod ledger_repository;
mod ledger_workflow;
mod login_service;
mod offering_catalogue;
mod payment_gateway;
mod principal_directory;
mod principal_repository;
mod registration_repository;
mod registration_workflow;
mod workflow_metrics;

#[cfg(test)]
pub use catalogue_repository::MockCatalogueRepository;
pub use catalogue_repository::{CatalogueRepository, CatalogueRepositoryError};
#[cfg(test)]
pub use grade_repository::MockGradeRepository;
pub use grade_repository::{GradeRepository, GradeRepositoryError};
#[cfg(test)]
pub use grade_workflow::MockGradeWorkflow;
pub use grade_workflow::{GradeWorkflow, ScoreEntry};
#[cfg(test)]
pub use ledger_repository::MockLedgerRepository;
pub use ledger_repository::{
    LedgerRepository, LedgerRepositoryError, PaymentCompletion, PaymentSettlement,
};
#[cfg(test)]
pub use ledger_workflow::{MockLedgerWorkflow, MockTuitionStatus};
pub use ledger_workflow::{LedgerWorkflow, TuitionStatus};
#[cfg(test)]
pub use login_service::MockLoginService;
pub use login_service::LoginService;
#[cfg(test)]
pub use offering_catalogue::MockOfferingCatalogue;
pub use offering_catalogue::OfferingCatalogue;
#[cfg(test)]
pub use payment_gateway::MockPaymentGateway;
pub use payment_gateway::{
    CheckoutRequest, CheckoutSession, FixturePaymentGateway, GatewayOutcome, PaymentConfirmation,
    PaymentGateway, PaymentGatewayError, WEBHOOK_SIGNATURE_HEADER,
};
#[cfg(test)]
pub use principal_directory::MockPrincipalDirectory;
pub use principal_directory::{PrincipalDirectory, RegisterPrincipalRequest};
#[cfg(test)]
pub use principal_repository::MockPrincipalRepository;
pub use principal_repository::{PrincipalRepository, PrincipalRepositoryError, StoredCredentials};
#[cfg(test)]
pub use registration_repository::MockRegistrationRepository;
pub use registration_repository::{RegistrationRepository, RegistrationRepositoryError};
#[cfg(test)]
pub use registration_workflow::MockRegistrationWorkflow;
pub use registration_workflow::RegistrationWorkflow;
#[cfg(test)]
pub use workflow_metrics::MockWorkflowMetrics;
pub use workflow_metrics::{
    NoOpWorkflowMetrics, Workflow, WorkflowEvent, WorkflowMetrics, WorkflowMetricsError,
};
