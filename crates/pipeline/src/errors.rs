//! Error types for the Relay pipeline domain.
//!
//! Two distinct families live here:
//!
//! - [`FetchError`] is an *item-level* failure. It never aborts a stage; it is
//!   folded into [`crate::Outcome::Failure`] and routed downstream as data.
//! - [`PipelineError`] covers *process-level* faults that stop the whole
//!   pipeline via the shutdown path.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::StageName;

// ---------------------------------------------------------------------------
// Item-level errors
// ---------------------------------------------------------------------------

/// Why a single retrieval failed.
///
/// Produced by implementations of [`crate::Fetch`]. The variants mirror the two
/// points at which a retrieval can go wrong: before a response arrives, and
/// while reading its body.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FetchError {
    /// The retrieval call itself failed (unreachable target, invalid URL,
    /// protocol error).
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable description from the transport layer.
        message: String,
    },

    /// A response arrived but its body could not be read in full.
    #[error("read error: {message}")]
    Read {
        /// Human-readable description of the body read failure.
        message: String,
    },
}

impl FetchError {
    /// Creates a [`FetchError::Transport`] from anything displayable.
    pub fn transport(message: impl std::fmt::Display) -> Self {
        Self::Transport {
            message: message.to_string(),
        }
    }

    /// Creates a [`FetchError::Read`] from anything displayable.
    pub fn read(message: impl std::fmt::Display) -> Self {
        Self::Read {
            message: message.to_string(),
        }
    }

    /// Short label for the failure kind, suitable for structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Read { .. } => "read",
        }
    }
}

// ---------------------------------------------------------------------------
// Process-level errors
// ---------------------------------------------------------------------------

/// Faults that halt the pipeline itself.
///
/// None of these are produced by an individual failed retrieval; they signal
/// that the pipeline's own plumbing or its environment is broken.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage's inbound channel was closed while a producer still had items
    /// to hand over. Only happens when a downstream worker has died.
    #[error("channel into stage '{stage}' is closed")]
    ChannelClosed {
        /// The stage whose inbound channel is gone.
        stage: StageName,
    },

    /// A stage worker terminated abnormally (panicked or was aborted).
    #[error("stage '{stage}' worker failed: {message}")]
    WorkerPanicked {
        /// The stage whose worker failed.
        stage: StageName,
        /// Description of the join failure.
        message: String,
    },

    /// The interactive input stream could not be opened or read at all.
    #[error("input unavailable: {message}")]
    InputUnavailable {
        /// Description of the input problem.
        message: String,
    },

    /// The pipeline configuration is invalid, or a component could not be
    /// constructed from it.
    ///
    /// Produced at start-up; the pipeline never starts with an invalid config.
    #[error("configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },
}

/// Result type for process-level pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
