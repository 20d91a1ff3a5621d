//! Domain port for counting workflow outcomes.
//!
//! Services report each registration decision, grade stage change, and
//! payment outcome here. Recording failures are logged by the caller and
//! never fail the workflow.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors exposed when recording workflow metrics.
    pub enum WorkflowMetricsError {
        /// Metric exporter rejected the write.
        Export { message: String } => "workflow metrics exporter failed: {message}",
    }
}

/// Workflow an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Workflow {
    /// Course registration.
    Registration,
    /// Grade approval.
    Grading,
    /// Payment reconciliation.
    Payment,
}

impl Workflow {
    /// Metric label value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::Grading => "grading",
            Self::Payment => "payment",
        }
    }
}

/// One observed outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowEvent {
    /// Workflow the outcome belongs to.
    pub workflow: Workflow,
    /// Outcome label, e.g. `registered` or `capacity_exceeded`.
    pub outcome: &'static str,
}

impl WorkflowEvent {
    /// Build an event.
    pub const fn new(workflow: Workflow, outcome: &'static str) -> Self {
        Self { workflow, outcome }
    }
}

/// Metrics recording port for workflow outcomes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkflowMetrics: Send + Sync {
    /// Count one outcome.
    async fn record(&self, event: WorkflowEvent) -> Result<(), WorkflowMetricsError>;
}

/// No-op implementation for when metrics are disabled or in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpWorkflowMetrics;

#[async_trait]
impl WorkflowMetrics for NoOpWorkflowMetrics {
    async fn record(&self, _event: WorkflowEvent) -> Result<(), WorkflowMetricsError> {
        Ok(())
    }
}
