//! Classify stage: successes become Metrics, failures are dropped.

use async_trait::async_trait;
use pipeline::{Metric, Outcome};

use crate::stage::Stage;

/// Filters [`Outcome`]s down to [`Metric`]s.
///
/// A failure is logged and dropped; it is never forwarded and never reaches
/// the sink. The drop is counted by the worker loop, so the number of failed
/// retrievals is this stage's `dropped` counter.
#[derive(Debug, Default)]
pub struct ClassifyStage;

impl ClassifyStage {
    pub const NAME: &'static str = "classifier";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Stage for ClassifyStage {
    type Input = Outcome;
    type Output = Metric;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn process(&mut self, outcome: Outcome) -> Option<Metric> {
        match outcome {
            Outcome::Success { request, payload } => {
                let metric = Metric::from_payload(request, &payload);
                tracing::info!(request_id = %request, length = metric.value(), "got a success");
                Some(metric)
            }
            Outcome::Failure { request, reason } => {
                tracing::warn!(
                    request_id = %request,
                    kind = reason.kind(),
                    error = %reason,
                    "got a failure, dropping"
                );
                None
            }
        }
    }
}
