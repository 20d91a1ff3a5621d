//! Prometheus adapter for workflow outcome counters.
//!
//! Counters are registered with the registry that backs the `/metrics`
//! endpoint.

use async_trait::async_trait;
use prometheus::{CounterVec, Opts, Registry};

use crate::domain::ports::{WorkflowEvent, WorkflowMetrics, WorkflowMetricsError};

/// Prometheus-backed workflow metrics recorder.
///
/// # Metric
///
/// - **Name**: `college_workflow_events_total`
/// - **Type**: Counter
/// - **Labels**:
///   - `workflow`: `registration`, `grading`, or `payment`
///   - `outcome`: free-form outcome label such as `registered`
pub struct PrometheusWorkflowMetrics {
    events_total: CounterVec,
}

impl PrometheusWorkflowMetrics {
    /// Create and register metrics with the given registry.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let events_total = CounterVec::new(
            Opts::new(
                "college_workflow_events_total",
                "Workflow outcomes by workflow and outcome",
            ),
            &["workflow", "outcome"],
        )?;
        registry.register(Box::new(events_total.clone()))?;
        Ok(Self { events_total })
    }
}

#[async_trait]
impl WorkflowMetrics for PrometheusWorkflowMetrics {
    async fn record(&self, event: WorkflowEvent) -> Result<(), WorkflowMetricsError> {
        self.events_total
            .with_label_values(&[event.workflow.as_str(), event.outcome])
            .inc();
        Ok(())
    }
}
