//! Pipeline flow tests
//!
//! End-to-end runs of the driver over the default fetch → classify → report
//! topology, with the fetch port stubbed in memory.

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use pipeline::{Fetch, FetchError, PipelineConfig, ReportFormat, Request, RequestId};
use tokio::io::{AsyncBufRead, AsyncRead, AsyncReadExt, BufReader, ReadBuf};
use tokio::sync::Semaphore;
use tokio::time::timeout;

use crate::{spawn_default, ClassifyStage, Driver, DriverReport, FetchStage, ReportSink, ShutdownReason};

/// In-memory fetcher: known targets return their body, anything else is
/// unreachable.
#[derive(Default)]
struct StubFetcher {
    responses: HashMap<String, Result<Vec<u8>, FetchError>>,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl StubFetcher {
    fn with_body(mut self, target: &str, len: usize) -> Self {
        self.responses.insert(target.to_string(), Ok(vec![b'.'; len]));
        self
    }

    fn with_error(mut self, target: &str, err: FetchError) -> Self {
        self.responses.insert(target.to_string(), Err(err));
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn seen(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.seen)
    }
}

#[async_trait]
impl Fetch for StubFetcher {
    async fn fetch(&self, target: &str) -> Result<Vec<u8>, FetchError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.seen.lock().unwrap().push(target.to_string());
        self.responses
            .get(target)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::transport(format!("{target}: unreachable"))))
    }
}

/// Fetcher that blocks until a permit is released.
struct GatedFetcher {
    gate: Arc<Semaphore>,
}

#[async_trait]
impl Fetch for GatedFetcher {
    async fn fetch(&self, _target: &str) -> Result<Vec<u8>, FetchError> {
        match self.gate.acquire().await {
            Ok(permit) => permit.forget(),
            Err(_) => return Err(FetchError::transport("gate closed")),
        }
        Ok(b"ok".to_vec())
    }
}

/// Input stream whose every read fails.
struct BrokenInput;

impl AsyncRead for BrokenInput {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "input device gone")))
    }
}

fn config(bootstrap: &[&str]) -> PipelineConfig {
    PipelineConfig {
        bootstrap: bootstrap.iter().map(|s| s.to_string()).collect(),
        ..Default::default()
    }
}

/// Run the driver to completion and return its report plus everything the
/// reporter wrote.
async fn run_driver(
    config: PipelineConfig,
    input: &'static [u8],
    fetcher: Arc<dyn Fetch>,
) -> (DriverReport, String) {
    run_driver_with(config, BufReader::new(input), fetcher).await
}

async fn run_driver_with<R>(
    config: PipelineConfig,
    input: R,
    fetcher: Arc<dyn Fetch>,
) -> (DriverReport, String)
where
    R: AsyncBufRead + Unpin,
{
    let (report_tx, mut report_rx) = tokio::io::duplex(64 * 1024);
    let pipeline = spawn_default(fetcher, report_tx, ReportFormat::Text).unwrap();
    let driver = Driver::new(config, input, tokio::io::sink());

    let report = timeout(Duration::from_secs(5), driver.run(pipeline))
        .await
        .expect("driver did not finish")
        .expect("driver failed");

    let mut out = String::new();
    report_rx.read_to_string(&mut out).await.unwrap();
    (report, out)
}

fn received(report: &DriverReport, stage: &str) -> u64 {
    report.stage(stage).expect("stage missing").received
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_unreachable_bootstrap_yields_no_metrics() {
    let fetcher = Arc::new(StubFetcher::default());
    let (report, out) = run_driver(
        config(&["https://x/v1/init", "https://x/v1/conversations"]),
        b"q\n",
        fetcher,
    )
    .await;

    assert_eq!(report.reason, ShutdownReason::Sentinel);
    assert_eq!(report.sent, 2);
    assert_eq!(received(&report, FetchStage::NAME), 2);
    assert_eq!(report.stage(ClassifyStage::NAME).unwrap().dropped, 2);
    assert_eq!(received(&report, ReportSink::<()>::NAME), 0);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_typed_request_reports_payload_length() {
    let fetcher = Arc::new(StubFetcher::default().with_body("http://svc/a", 42));
    let (report, out) = run_driver(config(&[]), b"http://svc/a\nq\n", fetcher).await;

    assert_eq!(report.sent, 1);
    assert_eq!(out, "result length = 42\n");
}

#[tokio::test]
async fn test_immediate_sentinel_drains_cleanly() {
    let fetcher = Arc::new(StubFetcher::default());
    let (report, out) = run_driver(config(&[]), b"q\n", fetcher).await;

    assert_eq!(report.reason, ShutdownReason::Sentinel);
    assert_eq!(report.sent, 0);
    assert_eq!(report.stages.len(), 3);
    assert!(report.stages.iter().all(|s| s.received == 0));
    assert!(out.is_empty());
}

// ============================================================================
// Properties
// ============================================================================

#[tokio::test]
async fn test_order_preserved_end_to_end() {
    let fetcher = Arc::new(
        StubFetcher::default()
            .with_body("http://svc/1", 10)
            .with_body("http://svc/2", 20)
            .with_body("http://svc/3", 30)
            .with_body("http://svc/4", 40)
            .with_delay(Duration::from_millis(5)),
    );
    let (_, out) = run_driver(
        config(&["http://svc/1", "http://svc/2"]),
        b"http://svc/3\nhttp://svc/4\nq\n",
        fetcher,
    )
    .await;

    assert_eq!(
        out.lines().collect::<Vec<_>>(),
        vec![
            "result length = 10",
            "result length = 20",
            "result length = 30",
            "result length = 40",
        ]
    );
}

#[tokio::test]
async fn test_failed_fetches_produce_no_metric() {
    let fetcher = Arc::new(
        StubFetcher::default()
            .with_body("http://svc/a", 5)
            .with_error("http://svc/b", FetchError::read("connection reset"))
            .with_body("http://svc/c", 7),
    );
    let (report, out) = run_driver(
        config(&[]),
        b"http://svc/a\nhttp://svc/b\nhttp://svc/c\nhttp://nowhere\nq\n",
        fetcher,
    )
    .await;

    assert_eq!(report.sent, 4);
    assert_eq!(received(&report, FetchStage::NAME), 4);
    assert_eq!(report.stage(ClassifyStage::NAME).unwrap().forwarded, 2);
    assert_eq!(report.stage(ClassifyStage::NAME).unwrap().dropped, 2);
    assert_eq!(received(&report, ReportSink::<()>::NAME), 2);
    assert_eq!(out, "result length = 5\nresult length = 7\n");
}

#[tokio::test]
async fn test_sentinel_waits_for_in_flight_items() {
    let fetcher = Arc::new(
        StubFetcher::default()
            .with_body("http://slow/1", 1)
            .with_body("http://slow/2", 2)
            .with_body("http://slow/3", 3)
            .with_delay(Duration::from_millis(30)),
    );
    let (report, out) = run_driver(
        config(&[]),
        b"http://slow/1\nhttp://slow/2\nhttp://slow/3\nq\n",
        fetcher,
    )
    .await;

    assert_eq!(report.reason, ShutdownReason::Sentinel);
    assert_eq!(out.lines().count(), 3);
    assert_eq!(received(&report, ReportSink::<()>::NAME), 3);
}

#[tokio::test]
async fn test_lines_after_sentinel_are_not_sent() {
    let fetcher = Arc::new(StubFetcher::default().with_body("http://svc/a", 3));
    let seen = fetcher.seen();
    let (report, out) = run_driver(config(&[]), b"q\nhttp://svc/a\n", fetcher).await;

    assert_eq!(report.sent, 0);
    assert!(seen.lock().unwrap().is_empty());
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_end_of_input_acts_like_sentinel() {
    let fetcher = Arc::new(StubFetcher::default().with_body("http://svc/a", 9));
    let (report, out) = run_driver(config(&[]), b"http://svc/a\n", fetcher).await;

    assert_eq!(report.reason, ShutdownReason::EndOfInput);
    assert_eq!(out, "result length = 9\n");
}

#[tokio::test]
async fn test_read_error_shuts_down_after_draining() {
    let fetcher = Arc::new(StubFetcher::default().with_body("http://svc/boot", 4));
    let (report, out) = run_driver_with(
        config(&["http://svc/boot"]),
        BufReader::new(BrokenInput),
        fetcher,
    )
    .await;

    match &report.reason {
        ShutdownReason::InputError { message } => assert!(message.contains("input device gone")),
        other => panic!("expected InputError, got {other:?}"),
    }
    assert_eq!(report.sent, 1);
    assert_eq!(out, "result length = 4\n");
}

#[tokio::test]
async fn test_non_utf8_line_is_still_a_request() {
    let fetcher = Arc::new(StubFetcher::default().with_body("http://svc/after", 6));
    let seen = fetcher.seen();
    let (report, out) = run_driver(config(&[]), b"caf\xe9\nhttp://svc/after\nq\n", fetcher).await;

    assert_eq!(report.reason, ShutdownReason::Sentinel);
    assert_eq!(report.sent, 2);
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["caf\u{FFFD}".to_string(), "http://svc/after".to_string()]
    );
    assert_eq!(out, "result length = 6\n");
}

#[tokio::test]
async fn test_sentinel_with_extra_carriage_returns_is_a_request() {
    let fetcher = Arc::new(StubFetcher::default());
    let seen = fetcher.seen();
    let (report, _) = run_driver(config(&[]), b"q\r\r\nq\r\n", fetcher).await;

    assert_eq!(report.reason, ShutdownReason::Sentinel);
    assert_eq!(report.sent, 1);
    assert_eq!(*seen.lock().unwrap(), vec!["q\r".to_string()]);
}

#[tokio::test]
async fn test_crlf_is_stripped() {
    let fetcher = Arc::new(StubFetcher::default().with_body("http://svc/a", 2));
    let seen = fetcher.seen();
    let (report, out) = run_driver(config(&[]), b"http://svc/a\r\nq\r\n", fetcher).await;

    assert_eq!(report.reason, ShutdownReason::Sentinel);
    assert_eq!(*seen.lock().unwrap(), vec!["http://svc/a".to_string()]);
    assert_eq!(out, "result length = 2\n");
}

#[tokio::test]
async fn test_empty_line_is_still_a_request() {
    let fetcher = Arc::new(StubFetcher::default());
    let seen = fetcher.seen();
    let (report, out) = run_driver(config(&[]), b"\nq\n", fetcher).await;

    assert_eq!(report.sent, 1);
    assert_eq!(*seen.lock().unwrap(), vec![String::new()]);
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_sentinel_is_case_sensitive_and_configurable() {
    let fetcher = Arc::new(StubFetcher::default());
    let seen = fetcher.seen();
    let config = PipelineConfig {
        bootstrap: Vec::new(),
        sentinel: "quit".into(),
        ..Default::default()
    };
    let (report, _) = run_driver(config, b"q\nQUIT\nquit\n", fetcher).await;

    assert_eq!(report.reason, ShutdownReason::Sentinel);
    assert_eq!(report.sent, 2);
    assert_eq!(*seen.lock().unwrap(), vec!["q".to_string(), "QUIT".to_string()]);
}

#[tokio::test]
async fn test_prompt_written_before_each_read() {
    let fetcher: Arc<dyn Fetch> = Arc::new(StubFetcher::default());
    let pipeline = spawn_default(fetcher, tokio::io::sink(), ReportFormat::Text).unwrap();
    let (prompt_tx, mut prompt_rx) = tokio::io::duplex(1024);

    let driver = Driver::new(config(&[]), BufReader::new(&b"http://a\nq\n"[..]), prompt_tx);
    driver.run(pipeline).await.unwrap();

    let mut prompts = String::new();
    prompt_rx.read_to_string(&mut prompts).await.unwrap();
    assert_eq!(prompts, "-> -> ");
}

#[tokio::test]
async fn test_slow_fetcher_blocks_driver() {
    let gate = Arc::new(Semaphore::new(0));
    let fetcher: Arc<dyn Fetch> = Arc::new(GatedFetcher {
        gate: Arc::clone(&gate),
    });
    let pipeline = spawn_default(fetcher, tokio::io::sink(), ReportFormat::Text).unwrap();

    let request = |n: u64| Request::new(RequestId::new(n), format!("http://gated/{n}"));

    // First item is taken by the fetcher, which then blocks; second fills the
    // single slot.
    timeout(Duration::from_secs(1), pipeline.send(request(1)))
        .await
        .expect("first send should complete")
        .unwrap();
    timeout(Duration::from_secs(1), pipeline.send(request(2)))
        .await
        .expect("second send should complete")
        .unwrap();

    // Third has nowhere to go until the fetcher makes progress.
    let blocked = timeout(Duration::from_millis(100), pipeline.send(request(3))).await;
    assert!(blocked.is_err(), "send should block while the fetcher is stalled");

    // Live counters: the fetcher holds exactly one item, nothing reached the sink.
    let stats = pipeline.stats();
    assert_eq!(stats.stage(FetchStage::NAME).unwrap().received, 1);
    assert_eq!(stats.stage(ReportSink::<()>::NAME).unwrap().received, 0);

    gate.add_permits(2);
    let snapshots = timeout(Duration::from_secs(1), pipeline.shutdown())
        .await
        .expect("shutdown should complete once the gate opens")
        .unwrap();

    assert_eq!(snapshots[0].received, 2);
    assert_eq!(snapshots[2].received, 2);
}
