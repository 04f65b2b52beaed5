use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{timeout, Duration};

use lineview::config::WindowConfig;
use lineview::error::{LineviewError, Result};
use lineview::file_handler::{FileAccessor, LineRange, Session};
use lineview::render::protocol::{WorkerCommand, WorkerResponse};
use lineview::render::{session_worker_loop, ViewportWindow, WindowCoordinator};
use lineview::search::{
    LineMatcher, SearchLimits, SearchOptions, SearchSink, SearchStatus, SearchSummary,
};

const TIMEOUT_MS: u64 = 2000;

async fn next_response(rx: &mut mpsc::UnboundedReceiver<WorkerResponse>) -> WorkerResponse {
    timeout(Duration::from_millis(TIMEOUT_MS), rx.recv())
        .await
        .expect("worker response timed out")
        .expect("worker channel closed unexpectedly")
}

/// Skip progress updates and return the next match, finish or error
async fn next_result(rx: &mut mpsc::UnboundedReceiver<WorkerResponse>) -> WorkerResponse {
    loop {
        match next_response(rx).await {
            WorkerResponse::SearchProgress { .. } => continue,
            other => return other,
        }
    }
}

struct Worker {
    cmd_tx: mpsc::UnboundedSender<WorkerCommand>,
    resp_rx: mpsc::UnboundedReceiver<WorkerResponse>,
    handle: tokio::task::JoinHandle<()>,
}

impl Worker {
    fn spawn(accessor: Arc<dyn FileAccessor>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(session_worker_loop(
            cmd_rx,
            resp_tx,
            accessor,
            SearchLimits::default(),
        ));
        Self {
            cmd_tx,
            resp_rx,
            handle,
        }
    }

    async fn shutdown(self) {
        self.cmd_tx.send(WorkerCommand::Shutdown).unwrap();
        timeout(Duration::from_millis(TIMEOUT_MS), self.handle)
            .await
            .expect("worker did not stop")
            .unwrap();
    }
}

async fn spawn_worker(contents: &str) -> (tempfile::NamedTempFile, Worker) {
    let file = tempfile::NamedTempFile::new().expect("create temp file");
    std::fs::write(file.path(), contents).expect("write contents");

    let session = Session::index(file.path(), 16, |_| {})
        .await
        .expect("index file");
    let accessor: Arc<dyn FileAccessor> = Arc::new(session);
    (file, Worker::spawn(accessor))
}

#[tokio::test]
async fn load_lines_returns_requested_range() {
    let (_file, mut worker) = spawn_worker("first\nsecond\nthird\nfourth\nfifth\n").await;

    worker
        .cmd_tx
        .send(WorkerCommand::LoadLines {
            request_id: 1,
            range: LineRange::new(1, 4),
        })
        .unwrap();

    match next_response(&mut worker.resp_rx).await {
        WorkerResponse::LinesLoaded {
            request_id,
            range,
            lines,
        } => {
            assert_eq!(request_id, 1);
            assert_eq!(range, LineRange::new(1, 4));
            assert_eq!(lines, vec!["second", "third", "fourth"]);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    worker.shutdown().await;
}

#[tokio::test]
async fn load_lines_past_end_is_clamped() {
    let (_file, mut worker) = spawn_worker("only\nthis\n").await;

    worker
        .cmd_tx
        .send(WorkerCommand::LoadLines {
            request_id: 42,
            range: LineRange::new(1, 10),
        })
        .unwrap();

    match next_response(&mut worker.resp_rx).await {
        WorkerResponse::LinesLoaded { lines, .. } => assert_eq!(lines, vec!["this"]),
        other => panic!("unexpected response: {other:?}"),
    }

    worker.shutdown().await;
}

#[tokio::test]
async fn search_streams_matches_then_finishes() {
    let (_file, mut worker) = spawn_worker("alpha\nbeta\ngamma\nbeta again\n").await;

    worker
        .cmd_tx
        .send(WorkerCommand::Search {
            request_id: 3,
            pattern: "beta".to_string(),
            options: SearchOptions::default(),
            max_results: 100,
        })
        .unwrap();

    let mut lines = Vec::new();
    loop {
        match next_result(&mut worker.resp_rx).await {
            WorkerResponse::SearchMatch { request_id, found } => {
                assert_eq!(request_id, 3);
                lines.push(found.line_number);
            }
            WorkerResponse::SearchFinished { summary, .. } => {
                assert_eq!(summary.status, SearchStatus::Completed);
                assert_eq!(summary.match_count, 2);
                break;
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
    assert_eq!(lines, vec![2, 4]);

    worker.shutdown().await;
}

#[tokio::test]
async fn search_stops_at_max_results() {
    let contents = "x\n".repeat(50);
    let (_file, mut worker) = spawn_worker(&contents).await;

    worker
        .cmd_tx
        .send(WorkerCommand::Search {
            request_id: 1,
            pattern: "x".to_string(),
            options: SearchOptions::default(),
            max_results: 2,
        })
        .unwrap();

    let mut found = 0;
    loop {
        match next_result(&mut worker.resp_rx).await {
            WorkerResponse::SearchMatch { .. } => found += 1,
            WorkerResponse::SearchFinished { summary, .. } => {
                assert_eq!(summary.status, SearchStatus::LimitReached);
                assert!(summary.truncated());
                break;
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
    assert_eq!(found, 2);

    worker.shutdown().await;
}

#[tokio::test]
async fn search_with_invalid_regex_returns_error() {
    let (_file, mut worker) = spawn_worker("abc\n").await;

    let options = SearchOptions {
        regex_mode: true,
        ..SearchOptions::default()
    };
    worker
        .cmd_tx
        .send(WorkerCommand::Search {
            request_id: 7,
            pattern: "(".to_string(),
            options,
            max_results: 10,
        })
        .unwrap();

    match next_response(&mut worker.resp_rx).await {
        WorkerResponse::Error { request_id, error } => {
            assert_eq!(request_id, 7);
            assert!(matches!(error, LineviewError::InvalidPattern { .. }));
        }
        other => panic!("expected error response, got {other:?}"),
    }

    worker.shutdown().await;
}

/// Accessor whose reads fail or hang, and whose searches wait for cancellation
struct ScriptedAccessor {
    path: PathBuf,
    hang_reads: bool,
    search_started: Arc<AtomicBool>,
}

impl ScriptedAccessor {
    fn new(hang_reads: bool) -> Self {
        Self {
            path: PathBuf::from("/scripted.log"),
            hang_reads,
            search_started: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl FileAccessor for ScriptedAccessor {
    async fn read_lines(&self, _start: u64, _end: u64) -> Result<Vec<String>> {
        if self.hang_reads {
            std::future::pending::<()>().await;
        }
        Err(LineviewError::stale(&self.path))
    }

    async fn search(
        &self,
        _matcher: &LineMatcher,
        _limits: SearchLimits,
        cancel_flag: Option<&AtomicBool>,
        _sink: &mut dyn SearchSink,
    ) -> Result<SearchSummary> {
        self.search_started.store(true, Ordering::SeqCst);
        let flag = cancel_flag.expect("worker always passes a cancel flag");
        while !flag.load(Ordering::Relaxed) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        Ok(SearchSummary {
            match_count: 0,
            lines_scanned: 0,
            status: SearchStatus::Cancelled,
        })
    }

    fn total_lines(&self) -> u64 {
        1000
    }

    fn file_size(&self) -> u64 {
        10_000
    }

    fn file_path(&self) -> &Path {
        &self.path
    }
}

#[tokio::test]
async fn read_errors_are_reported_with_request_id() {
    let mut worker = Worker::spawn(Arc::new(ScriptedAccessor::new(false)));

    worker
        .cmd_tx
        .send(WorkerCommand::LoadLines {
            request_id: 9,
            range: LineRange::new(0, 10),
        })
        .unwrap();

    match next_response(&mut worker.resp_rx).await {
        WorkerResponse::Error { request_id, error } => {
            assert_eq!(request_id, 9);
            assert!(error.is_stale());
        }
        other => panic!("unexpected response: {other:?}"),
    }

    worker.shutdown().await;
}

#[tokio::test]
async fn cancel_search_reaches_running_search() {
    let accessor = ScriptedAccessor::new(false);
    let started = Arc::clone(&accessor.search_started);
    let mut worker = Worker::spawn(Arc::new(accessor));

    worker
        .cmd_tx
        .send(WorkerCommand::Search {
            request_id: 5,
            pattern: "anything".to_string(),
            options: SearchOptions::default(),
            max_results: 10,
        })
        .unwrap();
    while !started.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    worker
        .cmd_tx
        .send(WorkerCommand::CancelSearch { request_id: 5 })
        .unwrap();

    match next_result(&mut worker.resp_rx).await {
        WorkerResponse::SearchFinished {
            request_id,
            summary,
        } => {
            assert_eq!(request_id, 5);
            assert_eq!(summary.status, SearchStatus::Cancelled);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    worker.shutdown().await;
}

#[tokio::test]
async fn shutdown_aborts_outstanding_work() {
    let worker = Worker::spawn(Arc::new(ScriptedAccessor::new(true)));

    worker
        .cmd_tx
        .send(WorkerCommand::LoadLines {
            request_id: 1,
            range: LineRange::new(0, 10),
        })
        .unwrap();
    worker
        .cmd_tx
        .send(WorkerCommand::Search {
            request_id: 2,
            pattern: "x".to_string(),
            options: SearchOptions::default(),
            max_results: 10,
        })
        .unwrap();

    // Neither the hung read nor the waiting search may keep the worker alive
    worker.shutdown().await;
}

#[tokio::test]
async fn coordinator_fills_window_through_worker() {
    let contents: String = (0..500).map(|n| format!("row {}\n", n)).collect();
    let (_file, worker) = spawn_worker(&contents).await;
    let Worker {
        cmd_tx,
        mut resp_rx,
        handle,
    } = worker;

    let mut coordinator = WindowCoordinator::new(
        ViewportWindow::new(WindowConfig::default()),
        cmd_tx.clone(),
    );
    coordinator.mark_ready(500).unwrap();
    coordinator.scroll_to(100, 30).unwrap();
    assert_eq!(coordinator.pending_fetches(), 1);

    let response = next_response(&mut resp_rx).await;
    coordinator.handle_response(response);

    let window = coordinator.window();
    assert_eq!(window.line(80), Some("row 80"));
    assert_eq!(window.line(149), Some("row 149"));
    assert!(window
        .visible_lines()
        .iter()
        .all(|(_, text)| text.is_some()));

    // A shorter viewport inside the cached range needs no fetch
    coordinator.scroll_to(100, 20).unwrap();
    assert_eq!(coordinator.pending_fetches(), 0);

    coordinator.shutdown();
    timeout(Duration::from_millis(TIMEOUT_MS), handle)
        .await
        .expect("worker did not stop")
        .unwrap();
}
