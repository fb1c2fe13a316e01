//! Pipeline configuration.
//!
//! Parsing from a file is the composition root's job; this module only defines
//! the shape, the defaults, and the validation rules.

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// Requests injected before the interactive loop starts.
pub const DEFAULT_BOOTSTRAP: [&str; 2] = [
    "https://api-dev.xpartner-app.com/v1.1/init",
    "https://api-dev.xpartner-app.com/v1.1/conversations",
];

/// Input line that ends the interactive loop.
pub const DEFAULT_SENTINEL: &str = "q";

/// Prompt printed before each interactive read.
pub const DEFAULT_PROMPT: &str = "-> ";

/// How the sink renders each metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    /// `result length = N`
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Runtime configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Warm-up requests sent before the first prompt.
    pub bootstrap: Vec<String>,

    /// Exact (case-sensitive) line that stops the driver.
    pub sentinel: String,

    /// Prompt written before each read. May be empty.
    pub prompt: String,

    /// Rendering of metrics at the sink.
    pub report_format: ReportFormat,

    /// `User-Agent` header sent by the HTTP fetcher.
    pub user_agent: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bootstrap: DEFAULT_BOOTSTRAP.iter().map(|s| s.to_string()).collect(),
            sentinel: DEFAULT_SENTINEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            report_format: ReportFormat::default(),
            user_agent: concat!("relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl PipelineConfig {
    /// Checks the invariants the driver relies on.
    ///
    /// The sentinel is compared against lines with their terminators already
    /// stripped, so a sentinel that is empty or contains `\r`/`\n` could never
    /// match (or would match every blank line).
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.sentinel.is_empty() {
            return Err(PipelineError::ConfigurationError {
                message: "sentinel must not be empty".into(),
            });
        }
        if self.sentinel.contains(['\r', '\n']) {
            return Err(PipelineError::ConfigurationError {
                message: "sentinel must not contain line terminators".into(),
            });
        }
        Ok(())
    }

    /// Returns `true` if `line` (terminators already stripped) is the sentinel.
    pub fn is_sentinel(&self, line: &str) -> bool {
        line == self.sentinel
    }
}
