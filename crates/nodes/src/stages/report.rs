//! Report sink: renders each Metric as one output line.

use async_trait::async_trait;
use pipeline::{Metric, ReportFormat};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::stage::Sink;

/// Writes one line per [`Metric`] to `W`.
///
/// Write failures are logged and the sink keeps consuming; the sink never
/// stops before its inbound channel closes.
pub struct ReportSink<W> {
    writer: W,
    format: ReportFormat,
}

impl<W> ReportSink<W> {
    pub const NAME: &'static str = "reporter";

    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self { writer, format }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render a metric as a single line including the trailing newline.
pub fn render(metric: &Metric, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(format!("{metric}\n")),
        ReportFormat::Json => {
            let mut line = serde_json::to_string(metric)?;
            line.push('\n');
            Ok(line)
        }
    }
}

#[async_trait]
impl<W> Sink for ReportSink<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    type Input = Metric;

    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn consume(&mut self, metric: Metric) {
        tracing::info!(request_id = %metric.request(), length = metric.value(), "got result");

        let line = match render(&metric, self.format) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "failed to render metric");
                return;
            }
        };

        let written = async {
            self.writer.write_all(line.as_bytes()).await?;
            self.writer.flush().await
        }
        .await;

        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to write report line");
        }
    }
}
