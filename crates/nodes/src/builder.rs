//! Pipeline builder - wires stages together with single-slot channels
//!
//! Every boundary between two workers is a `tokio::sync::mpsc` channel of
//! capacity [`HANDOFF_CAPACITY`]: a sender blocks until the receiver has
//! taken the previous item, so a slow stage throttles everything upstream.
//!
//! # Example
//!
//! ```ignore
//! let pipeline = PipelineBuilder::<Request>::new()
//!     .stage(FetchStage::new(fetcher))?
//!     .stage(ClassifyStage::new())?
//!     .sink(ReportSink::new(tokio::io::stdout(), ReportFormat::Text))?;
//!
//! pipeline.send(request).await?;
//! let snapshots = pipeline.shutdown().await?;
//! ```

use std::sync::Arc;

use pipeline::{PipelineError, StageName};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::counters::{PipelineStats, StageCounters, StageSnapshot};
use crate::stage::{Sink, Stage};

/// Capacity of every inter-stage channel.
pub const HANDOFF_CAPACITY: usize = 1;

struct Worker {
    stage: StageName,
    handle: JoinHandle<()>,
}

/// Incrementally assembles a pipeline accepting `In` whose tail currently
/// produces `Out`.
///
/// Each call to [`stage`](Self::stage) spawns the stage's worker immediately,
/// so the builder must be used inside a Tokio runtime. The pipeline is
/// complete once a [`Sink`] is attached.
pub struct PipelineBuilder<In, Out = In> {
    entry: mpsc::Sender<In>,
    entry_stage: Option<StageName>,
    tail: mpsc::Receiver<Out>,
    workers: Vec<Worker>,
    counters: Vec<(StageName, Arc<StageCounters>)>,
}

impl<In: Send + 'static> PipelineBuilder<In> {
    /// Create a builder with an open entry channel and no stages.
    pub fn new() -> Self {
        let (entry, tail) = mpsc::channel(HANDOFF_CAPACITY);
        Self {
            entry,
            entry_stage: None,
            tail,
            workers: Vec::new(),
            counters: Vec::new(),
        }
    }
}

impl<In: Send + 'static> Default for PipelineBuilder<In> {
    fn default() -> Self {
        Self::new()
    }
}

impl<In: Send + 'static, Out: Send + 'static> PipelineBuilder<In, Out> {
    /// Append a stage and spawn its worker.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ConfigurationError`] if the stage name is empty or
    /// already used in this pipeline.
    pub fn stage<S>(mut self, stage: S) -> Result<PipelineBuilder<In, S::Output>, PipelineError>
    where
        S: Stage<Input = Out>,
    {
        let name = self.register(stage.name())?;
        let counters = self.counters_for(&name);
        let (outbound, next_tail) = mpsc::channel(HANDOFF_CAPACITY);

        let span = tracing::info_span!("stage", stage = %name);
        let handle = tokio::spawn(
            run_stage(stage, name.clone(), self.tail, outbound, counters).instrument(span),
        );
        self.workers.push(Worker { stage: name, handle });

        Ok(PipelineBuilder {
            entry: self.entry,
            entry_stage: self.entry_stage,
            tail: next_tail,
            workers: self.workers,
            counters: self.counters,
        })
    }

    /// Attach the terminal sink, spawn its worker, and return the running
    /// pipeline.
    ///
    /// # Errors
    ///
    /// Same as [`stage`](Self::stage).
    pub fn sink<S>(mut self, sink: S) -> Result<RunningPipeline<In>, PipelineError>
    where
        S: Sink<Input = Out>,
    {
        let name = self.register(sink.name())?;
        let counters = self.counters_for(&name);

        let span = tracing::info_span!("stage", stage = %name);
        let handle = tokio::spawn(run_sink(sink, name.clone(), self.tail, counters).instrument(span));
        self.workers.push(Worker {
            stage: name.clone(),
            handle,
        });

        tracing::debug!(
            stages = ?self.counters.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            "pipeline assembled"
        );

        Ok(RunningPipeline {
            entry: self.entry,
            entry_stage: self.entry_stage.unwrap_or(name),
            workers: self.workers,
            stats: PipelineStats::new(self.counters),
        })
    }

    fn register(&mut self, raw: &str) -> Result<StageName, PipelineError> {
        let name = StageName::new(raw).ok_or_else(|| PipelineError::ConfigurationError {
            message: "stage name must not be empty".into(),
        })?;
        if self.counters.iter().any(|(n, _)| n == &name) {
            return Err(PipelineError::ConfigurationError {
                message: format!("duplicate stage name '{name}'"),
            });
        }
        self.entry_stage.get_or_insert_with(|| name.clone());
        Ok(name)
    }

    fn counters_for(&mut self, name: &StageName) -> Arc<StageCounters> {
        let counters = Arc::new(StageCounters::new());
        self.counters.push((name.clone(), Arc::clone(&counters)));
        counters
    }
}

/// Worker loop for a transforming stage.
///
/// Runs until the inbound channel is closed and empty, then drops `outbound`,
/// which closes the next stage's inbound channel in turn.
async fn run_stage<S: Stage>(
    mut stage: S,
    name: StageName,
    mut inbound: mpsc::Receiver<S::Input>,
    outbound: mpsc::Sender<S::Output>,
    counters: Arc<StageCounters>,
) {
    tracing::debug!("stage running");

    while let Some(item) = inbound.recv().await {
        counters.record_received();

        match stage.process(item).await {
            Some(output) => {
                if outbound.send(output).await.is_err() {
                    tracing::warn!(stage = %name, "downstream channel closed, stopping stage");
                    break;
                }
                counters.record_forwarded();
            }
            None => counters.record_dropped(),
        }
    }

    drop(outbound);

    let snapshot = counters.snapshot(name);
    tracing::info!(
        received = snapshot.received,
        forwarded = snapshot.forwarded,
        dropped = snapshot.dropped,
        "stage drained"
    );
}

/// Worker loop for the terminal sink.
async fn run_sink<S: Sink>(
    mut sink: S,
    name: StageName,
    mut inbound: mpsc::Receiver<S::Input>,
    counters: Arc<StageCounters>,
) {
    tracing::debug!("sink running");

    while let Some(item) = inbound.recv().await {
        counters.record_received();
        sink.consume(item).await;
    }

    let snapshot = counters.snapshot(name);
    tracing::info!(received = snapshot.received, "sink drained");
}

/// A fully wired pipeline whose workers are running.
///
/// Dropping the entry sender (via [`shutdown`](Self::shutdown)) is the only
/// way to stop it: the close propagates stage by stage and every worker drains
/// what it already holds before exiting.
pub struct RunningPipeline<In> {
    entry: mpsc::Sender<In>,
    entry_stage: StageName,
    workers: Vec<Worker>,
    stats: PipelineStats,
}

impl<In: Send + 'static> RunningPipeline<In> {
    /// Hand an item to the first stage, waiting until its slot is free.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ChannelClosed`] if the first stage's worker has exited.
    pub async fn send(&self, item: In) -> Result<(), PipelineError> {
        self.entry
            .send(item)
            .await
            .map_err(|_| PipelineError::ChannelClosed {
                stage: self.entry_stage.clone(),
            })
    }

    /// Counter handle for every stage, valid after shutdown.
    pub fn stats(&self) -> PipelineStats {
        self.stats.clone()
    }

    /// Stage names in pipeline order.
    pub fn stage_names(&self) -> impl Iterator<Item = &StageName> {
        self.workers.iter().map(|w| &w.stage)
    }

    /// Close the entry channel and wait for every worker to drain and exit.
    ///
    /// Workers are joined in pipeline order. All of them are joined even if
    /// one has failed.
    ///
    /// # Errors
    ///
    /// [`PipelineError::WorkerPanicked`] for the first worker that did not
    /// exit cleanly.
    pub async fn shutdown(self) -> Result<Vec<StageSnapshot>, PipelineError> {
        let Self {
            entry,
            workers,
            stats,
            ..
        } = self;

        drop(entry);

        let mut first_error = None;
        for worker in workers {
            if let Err(e) = worker.handle.await {
                tracing::error!(stage = %worker.stage, error = %e, "stage worker failed");
                first_error.get_or_insert(PipelineError::WorkerPanicked {
                    stage: worker.stage,
                    message: e.to_string(),
                });
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(stats.snapshot()),
        }
    }
}

impl<In> std::fmt::Debug for RunningPipeline<In> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningPipeline")
            .field(
                "stages",
                &self.workers.iter().map(|w| w.stage.as_str()).collect::<Vec<_>>(),
            )
            .field("entry_closed", &self.entry.is_closed())
            .finish()
    }
}
