//! Driver - turns interactive input into Requests and owns shutdown
//!
//! The driver runs on the caller's task, not as a pipeline worker. It injects
//! the configured bootstrap Requests, then reads one line at a time until the
//! sentinel, end of input, or a read error. Whatever stops the loop, the
//! driver then shuts the pipeline down and waits for every worker to drain.

use pipeline::{PipelineConfig, PipelineError, Request, RequestId};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::builder::RunningPipeline;
use crate::counters::StageSnapshot;

/// Why the driver stopped reading input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    /// The sentinel line was read.
    Sentinel,
    /// The input stream reached end-of-file.
    EndOfInput,
    /// Reading the input stream failed; treated like end of input.
    InputError {
        /// Description of the read failure.
        message: String,
    },
}

/// Summary of a completed run, produced after all workers have exited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverReport {
    pub reason: ShutdownReason,
    /// Requests handed to the pipeline, bootstrap included.
    pub sent: u64,
    /// Final counters per stage, in pipeline order.
    pub stages: Vec<StageSnapshot>,
}

impl DriverReport {
    /// Snapshot for a single stage by name.
    pub fn stage(&self, name: &str) -> Option<&StageSnapshot> {
        self.stages.iter().find(|s| s.stage.as_str() == name)
    }
}

/// Reads Requests from `R`, writes prompts to `W`.
pub struct Driver<R, W> {
    config: PipelineConfig,
    input: R,
    prompt_out: W,
    next_id: RequestId,
    sent: u64,
}

impl<R, W> Driver<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(config: PipelineConfig, input: R, prompt_out: W) -> Self {
        Self {
            config,
            input,
            prompt_out,
            next_id: RequestId::first(),
            sent: 0,
        }
    }

    /// Feed the pipeline until input ends, then shut it down.
    ///
    /// The pipeline is always shut down and joined, even when dispatch fails
    /// part way.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::WorkerPanicked`] if a stage worker failed.
    /// - [`PipelineError::ChannelClosed`] if the first stage stopped accepting
    ///   Requests.
    pub async fn run(
        mut self,
        pipeline: RunningPipeline<Request>,
    ) -> Result<DriverReport, PipelineError> {
        let dispatched = self.dispatch(&pipeline).await;

        tracing::info!(sent = self.sent, "input finished, draining pipeline");
        let stages = pipeline.shutdown().await?;
        let reason = dispatched?;

        Ok(DriverReport {
            reason,
            sent: self.sent,
            stages,
        })
    }

    async fn dispatch(
        &mut self,
        pipeline: &RunningPipeline<Request>,
    ) -> Result<ShutdownReason, PipelineError> {
        let bootstrap = std::mem::take(&mut self.config.bootstrap);
        for target in bootstrap {
            tracing::debug!(url = %target, "sending bootstrap request");
            self.send(pipeline, target).await?;
        }

        let mut raw = Vec::new();
        loop {
            self.prompt().await;

            raw.clear();
            match self.input.read_until(b'\n', &mut raw).await {
                Ok(0) => {
                    tracing::info!("end of input");
                    return Ok(ShutdownReason::EndOfInput);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read input, shutting down");
                    return Ok(ShutdownReason::InputError {
                        message: e.to_string(),
                    });
                }
            }

            // Targets are opaque; undecodable bytes are replaced, not rejected.
            let line = String::from_utf8_lossy(&raw);
            let target = strip_terminators(&line);
            if self.config.is_sentinel(target) {
                tracing::info!("sentinel received");
                return Ok(ShutdownReason::Sentinel);
            }

            let target = target.to_string();
            self.send(pipeline, target).await?;
        }
    }

    async fn send(
        &mut self,
        pipeline: &RunningPipeline<Request>,
        target: String,
    ) -> Result<(), PipelineError> {
        let request = Request::new(self.next_id, target);
        tracing::debug!(request_id = %request.id(), url = request.target(), "dispatching");

        pipeline.send(request).await?;
        self.next_id = self.next_id.next();
        self.sent += 1;
        Ok(())
    }

    async fn prompt(&mut self) {
        if self.config.prompt.is_empty() {
            return;
        }
        let written = async {
            self.prompt_out
                .write_all(self.config.prompt.as_bytes())
                .await?;
            self.prompt_out.flush().await
        }
        .await;
        if let Err(e) = written {
            tracing::debug!(error = %e, "failed to write prompt");
        }
    }
}

/// Strip a single line terminator (`\n` or `\r\n`), nothing else.
pub fn strip_terminators(line: &str) -> &str {
    match line.strip_suffix('\n') {
        Some(rest) => rest.strip_suffix('\r').unwrap_or(rest),
        None => line,
    }
}
