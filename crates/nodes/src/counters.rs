//! Per-stage counters
//!
//! Atomic counters recorded by each stage worker. All operations use relaxed
//! ordering; values are eventually consistent while the pipeline runs and
//! exact once every worker has been joined.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pipeline::StageName;

/// Counters for one stage worker.
#[derive(Debug, Default)]
pub struct StageCounters {
    /// Items taken from the inbound channel
    received: AtomicU64,

    /// Items handed to the outbound channel
    forwarded: AtomicU64,

    /// Items the stage chose not to forward
    dropped: AtomicU64,
}

impl StageCounters {
    /// Create counters with every value at zero
    #[inline]
    pub const fn new() -> Self {
        Self {
            received: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time copy of the counters
    pub fn snapshot(&self, stage: StageName) -> StageSnapshot {
        StageSnapshot {
            stage,
            received: self.received.load(Ordering::Relaxed),
            forwarded: self.forwarded.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of one stage's counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSnapshot {
    pub stage: StageName,
    pub received: u64,
    /// Always zero for a sink.
    pub forwarded: u64,
    pub dropped: u64,
}

/// Handle to the counters of every stage in a pipeline.
///
/// Cloneable and valid after the pipeline has shut down. The classifier's
/// `dropped` count is the number of failed retrievals.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    stages: Arc<[(StageName, Arc<StageCounters>)]>,
}

impl PipelineStats {
    pub(crate) fn new(stages: Vec<(StageName, Arc<StageCounters>)>) -> Self {
        Self {
            stages: stages.into(),
        }
    }

    /// Snapshot every stage, in pipeline order
    pub fn snapshot(&self) -> Vec<StageSnapshot> {
        self.stages
            .iter()
            .map(|(name, counters)| counters.snapshot(name.clone()))
            .collect()
    }

    /// Snapshot a single stage by name
    pub fn stage(&self, name: &str) -> Option<StageSnapshot> {
        self.stages
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(n, counters)| counters.snapshot(n.clone()))
    }
}
