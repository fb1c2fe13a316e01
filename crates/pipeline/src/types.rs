//! Value types handed between pipeline stages.
//!
//! Each type is created by exactly one stage, moved through exactly one
//! channel, and consumed by exactly one stage. Nothing is mutated after
//! creation: a stage reads what it receives and builds a new value to forward.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FetchError, RequestId};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// A retrieval target submitted by the driver.
///
/// The target is opaque: it is not validated and may be empty. A malformed
/// target simply produces a [`Outcome::Failure`] at the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    id: RequestId,
    target: String,
}

impl Request {
    /// Creates a [`Request`].
    pub fn new(id: RequestId, target: impl Into<String>) -> Self {
        Self {
            id,
            target: target.into(),
        }
    }

    /// Returns the request identifier.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Returns the retrieval target (typically a URL).
    pub fn target(&self) -> &str {
        &self.target
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// The result of fetching exactly one [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The retrieval succeeded and the whole body was read.
    Success {
        /// The originating request.
        request: RequestId,
        /// The response body.
        payload: Vec<u8>,
    },
    /// The retrieval or the body read failed.
    Failure {
        /// The originating request.
        request: RequestId,
        /// Why it failed.
        reason: FetchError,
    },
}

impl Outcome {
    /// Builds an [`Outcome`] from the result of a fetch.
    pub fn from_fetch(request: RequestId, result: Result<Vec<u8>, FetchError>) -> Self {
        match result {
            Ok(payload) => Self::Success { request, payload },
            Err(reason) => Self::Failure { request, reason },
        }
    }

    /// Returns the identifier of the request this outcome belongs to.
    pub fn request(&self) -> RequestId {
        match self {
            Self::Success { request, .. } | Self::Failure { request, .. } => *request,
        }
    }

    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

// ---------------------------------------------------------------------------
// Metric
// ---------------------------------------------------------------------------

/// A value derived from a successful [`Outcome`]: the length of its payload.
///
/// Only ever constructed from a success, so a `Metric` always has a
/// corresponding prior [`Request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    request: RequestId,
    value: u64,
    observed_at: Timestamp,
}

impl Metric {
    /// Derives a [`Metric`] from a successful payload.
    pub fn from_payload(request: RequestId, payload: &[u8]) -> Self {
        Self {
            request,
            value: payload.len() as u64,
            observed_at: Timestamp::now(),
        }
    }

    /// Returns the identifier of the request this metric was derived from.
    pub fn request(&self) -> RequestId {
        self.request
    }

    /// Returns the payload length in bytes.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// Returns when the metric was derived.
    pub fn observed_at(&self) -> Timestamp {
        self.observed_at
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "result length = {}", self.value)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}
