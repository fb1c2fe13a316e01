//! Relay pipeline orchestration.
//!
//! Runs stages as independent Tokio tasks connected by single-slot channels,
//! and drives them from interactive input.
//!
//! # Architecture
//!
//! ```text
//! [Driver]            [fetcher]            [classifier]           [reporter]
//!  stdin ──Request──▶ Fetch port ──Outcome──▶ success? ──Metric──▶ stdout
//!                                               │
//!                                               └─ failure: counted, dropped
//! ```
//!
//! # Key Design
//!
//! - **Single-slot handoff**: every boundary is `mpsc::channel(1)`; a slow
//!   stage throttles all stages before it
//! - **Composable stages**: [`Stage`] and [`Sink`] describe per-item work;
//!   [`PipelineBuilder`] owns the worker loops and wiring
//! - **Orderly shutdown**: closing the entry channel propagates stage by stage;
//!   [`RunningPipeline::shutdown`] joins every worker
//! - **Failures are data**: item-level errors never stop a stage
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** Sequences calls between the domain types in the
//! [`pipeline`] crate and the [`pipeline::Fetch`] port. Contains no transport
//! code of its own.

mod builder;
mod counters;
mod driver;
mod stage;
pub mod stages;

pub use builder::{PipelineBuilder, RunningPipeline, HANDOFF_CAPACITY};
pub use counters::{PipelineStats, StageCounters, StageSnapshot};
pub use driver::{strip_terminators, Driver, DriverReport, ShutdownReason};
pub use stage::{Sink, Stage};
pub use stages::{spawn_default, ClassifyStage, FetchStage, ReportSink};

#[cfg(test)]
mod pipeline_test;
