//! Core domain for Relay.
//!
//! This crate contains every value handed between pipeline stages, the
//! identifiers used to correlate them, the error taxonomy, and the port
//! traits infrastructure crates implement. It never performs I/O.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate defines *what* flows
//! through the pipeline; `nodes` defines how it flows, `fetcher` how the
//! outside world is reached.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`RequestId`, `StageName`, `PipelineRunId`) |
//! | [`types`] | Handoff values (`Request`, `Outcome`, `Metric`, `Timestamp`) |
//! | [`errors`] | Item-level `FetchError` and process-level `PipelineError` |
//! | [`ports`] | The `Fetch` trait |
//! | [`config`] | `PipelineConfig` and its defaults |

pub mod config;
pub mod errors;
pub mod identifiers;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use config::{PipelineConfig, ReportFormat};
pub use errors::{FetchError, PipelineError, Result};
pub use identifiers::{PipelineRunId, RequestId, StageName};
pub use ports::Fetch;
pub use types::{Metric, Outcome, Request, Timestamp};
