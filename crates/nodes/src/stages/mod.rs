//! The default stage implementations and the topology that wires them.
//!
//! ```text
//! Driver ──Request──▶ fetcher ──Outcome──▶ classifier ──Metric──▶ reporter
//! ```

mod classify;
mod fetch;
mod report;

use std::sync::Arc;

use pipeline::{Fetch, PipelineError, ReportFormat, Request};
use tokio::io::AsyncWrite;

use crate::builder::{PipelineBuilder, RunningPipeline};

pub use classify::ClassifyStage;
pub use fetch::FetchStage;
pub use report::{render, ReportSink};

/// Spawn the standard fetch → classify → report pipeline.
///
/// Must be called inside a Tokio runtime.
pub fn spawn_default<W>(
    fetcher: Arc<dyn Fetch>,
    report_to: W,
    format: ReportFormat,
) -> Result<RunningPipeline<Request>, PipelineError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    PipelineBuilder::<Request>::new()
        .stage(FetchStage::new(fetcher))?
        .stage(ClassifyStage::new())?
        .sink(ReportSink::new(report_to, format))
}
