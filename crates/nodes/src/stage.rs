//! Stage and sink traits.
//!
//! A stage is one long-lived worker that reads from one inbound channel and
//! writes to one outbound channel. The worker loop, channel wiring, and
//! counting are owned by [`crate::PipelineBuilder`]; implementations only
//! describe what happens to a single item.

use async_trait::async_trait;

/// A transforming or filtering pipeline stage.
///
/// # Design
///
/// - `process` handles exactly one item and returns at most one output.
///   Returning `None` drops the item (conditional fan-down).
/// - There is no error return: item-level failures are data and must be
///   expressed in `Output`, or dropped.
/// - `process` takes `&mut self` so a stage can keep private state; the
///   builder guarantees a single caller.
#[async_trait]
pub trait Stage: Send + 'static {
    /// Type received from the upstream stage.
    type Input: Send + 'static;

    /// Type forwarded to the downstream stage.
    type Output: Send + 'static;

    /// Name used for logging, counters, and error reporting.
    fn name(&self) -> &'static str;

    /// Processes one item.
    async fn process(&mut self, input: Self::Input) -> Option<Self::Output>;
}

/// A terminal pipeline stage. Consumes items and forwards nothing.
#[async_trait]
pub trait Sink: Send + 'static {
    /// Type received from the upstream stage.
    type Input: Send + 'static;

    /// Name used for logging, counters, and error reporting.
    fn name(&self) -> &'static str;

    /// Consumes one item.
    async fn consume(&mut self, input: Self::Input);
}
