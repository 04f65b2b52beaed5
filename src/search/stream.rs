//! Streaming pattern search over the raw file.
//!
//! The search re-reads the file in chunks rather than going through the line
//! index, carrying a partial line across chunk boundaries. Results are pushed to a
//! [`SearchSink`] in strictly increasing line order, and the stream stops reading
//! the moment the result limit is reached or the consumer goes away.

use crate::config::{
    EngineConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MATCH_TEXT_LIMIT, DEFAULT_MAX_SEARCH_RESULTS,
};
use crate::error::{LineviewError, Result};
use crate::file_handler::accessor::FileAccessor;
use crate::file_handler::line_index::ProgressTracker;
use crate::file_handler::session::Session;
use crate::search::matcher::LineMatcher;
use bstr::ByteSlice;
use memchr::memchr_iter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// One matching line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    /// 1-based line number
    pub line_number: u64,
    /// Line text, truncated to the configured character limit
    pub text: String,
}

/// How a search ended; none of these are errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Completed,
    LimitReached,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    /// Number of `on_match` calls made
    pub match_count: usize,
    pub lines_scanned: u64,
    pub status: SearchStatus,
}

impl SearchSummary {
    /// Whether more matches may exist past the ones reported
    pub fn truncated(&self) -> bool {
        self.status == SearchStatus::LimitReached
    }
}

/// Bounds for one search pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_results: usize,
    pub text_limit: usize,
    pub chunk_size: usize,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_SEARCH_RESULTS,
            text_limit: DEFAULT_MATCH_TEXT_LIMIT,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl From<&EngineConfig> for SearchLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            max_results: config.max_search_results,
            text_limit: config.match_text_limit,
            chunk_size: config.chunk_size,
        }
    }
}

/// Receiver of search results and progress
pub trait SearchSink: Send {
    /// Deliver a match; returning false means the consumer is gone and the search stops
    fn on_match(&mut self, found: SearchMatch) -> bool;

    fn on_progress(&mut self, _percent: u8) {}

    /// Checked between chunks so an abandoned search stops even without matches
    fn is_closed(&self) -> bool {
        false
    }
}

/// Sink that keeps every match in memory
#[derive(Debug, Default)]
pub struct CollectSink {
    pub matches: Vec<SearchMatch>,
    pub last_progress: Option<u8>,
}

impl SearchSink for CollectSink {
    fn on_match(&mut self, found: SearchMatch) -> bool {
        self.matches.push(found);
        true
    }

    fn on_progress(&mut self, percent: u8) {
        self.last_progress = Some(percent);
    }
}

/// Per-line match state shared by the chunk loop and the final carried line
struct LineScanner<'a> {
    matcher: &'a LineMatcher,
    limits: SearchLimits,
    line_number: u64,
    match_count: usize,
}

impl<'a> LineScanner<'a> {
    fn new(matcher: &'a LineMatcher, limits: SearchLimits) -> Self {
        Self {
            matcher,
            limits,
            line_number: 0,
            match_count: 0,
        }
    }

    /// Test one complete line; Some(status) ends the search
    fn test_line(&mut self, line: &[u8], sink: &mut dyn SearchSink) -> Option<SearchStatus> {
        self.line_number += 1;

        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if !self.matcher.is_match(line) {
            return None;
        }

        self.match_count += 1;
        let found = SearchMatch {
            line_number: self.line_number,
            text: truncate_chars(&line.to_str_lossy(), self.limits.text_limit),
        };
        if !sink.on_match(found) {
            return Some(SearchStatus::Cancelled);
        }
        if self.match_count >= self.limits.max_results {
            return Some(SearchStatus::LimitReached);
        }
        None
    }

    fn summary(&self, status: SearchStatus) -> SearchSummary {
        SearchSummary {
            match_count: self.match_count,
            lines_scanned: self.line_number,
            status,
        }
    }
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}

fn is_cancelled(flag: Option<&AtomicBool>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::Relaxed))
}

/// Stream the session's file and report every line matching `matcher`
///
/// Progress is reported as non-decreasing percentages with a final 100 on every
/// non-error outcome. The summary's `match_count` always equals the number of
/// `on_match` calls made.
pub async fn search_session(
    session: &Session,
    matcher: &LineMatcher,
    limits: SearchLimits,
    cancel_flag: Option<&AtomicBool>,
    sink: &mut dyn SearchSink,
) -> Result<SearchSummary> {
    let mut scanner = LineScanner::new(matcher, limits);
    if limits.max_results == 0 {
        return Ok(scanner.summary(SearchStatus::LimitReached));
    }

    let _gate = session.read_gate().await;
    session.check_current().await?;

    let status = scan_file(session, &mut scanner, cancel_flag, sink).await?;
    sink.on_progress(100);

    let summary = scanner.summary(status);
    log::debug!(
        "search '{}' in {}: {} matches over {} lines ({:?})",
        matcher.pattern(),
        session.path().display(),
        summary.match_count,
        summary.lines_scanned,
        summary.status
    );
    Ok(summary)
}

async fn scan_file(
    session: &Session,
    scanner: &mut LineScanner<'_>,
    cancel_flag: Option<&AtomicBool>,
    sink: &mut dyn SearchSink,
) -> Result<SearchStatus> {
    let path = session.path();
    let mut file = File::open(path).await.map_err(|e| {
        LineviewError::file_error(format!("Failed to open file: {}", path.display()), e)
    })?;

    let mut tracker = ProgressTracker::new(session.file_size());
    let mut buffer = vec![0u8; scanner.limits.chunk_size.max(1)];
    let mut carry: Vec<u8> = Vec::new();
    let mut consumed = 0u64;

    loop {
        if is_cancelled(cancel_flag) || sink.is_closed() {
            return Ok(SearchStatus::Cancelled);
        }

        let read = file.read(&mut buffer).await.map_err(|e| {
            LineviewError::file_error(format!("Failed to read {}", path.display()), e)
        })?;
        if read == 0 {
            break;
        }
        consumed += read as u64;

        let chunk = &buffer[..read];
        let mut line_start = 0;
        for newline in memchr_iter(b'\n', chunk) {
            let outcome = if carry.is_empty() {
                scanner.test_line(&chunk[line_start..newline], sink)
            } else {
                carry.extend_from_slice(&chunk[line_start..newline]);
                let outcome = scanner.test_line(&carry, sink);
                carry.clear();
                outcome
            };
            line_start = newline + 1;

            if let Some(status) = outcome {
                return Ok(status);
            }
        }
        carry.extend_from_slice(&chunk[line_start..]);

        if let Some(percent) = tracker.update(consumed) {
            sink.on_progress(percent);
        }
    }

    // A last line without a terminator is still a line
    if !carry.is_empty() {
        if let Some(status) = scanner.test_line(&carry, sink) {
            return Ok(status);
        }
    }

    Ok(SearchStatus::Completed)
}

/// Events produced by a spawned search, ending with `Finished` or `Failed`
#[derive(Debug)]
pub enum SearchEvent {
    Progress(u8),
    Match(SearchMatch),
    Finished(SearchSummary),
    Failed(LineviewError),
}

struct ChannelSink {
    tx: mpsc::UnboundedSender<SearchEvent>,
}

impl SearchSink for ChannelSink {
    fn on_match(&mut self, found: SearchMatch) -> bool {
        self.tx.send(SearchEvent::Match(found)).is_ok()
    }

    fn on_progress(&mut self, percent: u8) {
        let _ = self.tx.send(SearchEvent::Progress(percent));
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Control handle for a spawned search
#[derive(Debug)]
pub struct SearchHandle {
    cancel: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl SearchHandle {
    /// Ask the search to stop at the next chunk boundary
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Stop immediately, dropping the open file
    pub fn abort(&self) {
        self.cancel();
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Run a search as a background task and expose its results as a stream
///
/// The stream is finite: it ends after one `Finished` or `Failed` event. Dropping
/// it halts the search at the next match or chunk boundary.
pub fn spawn_search(
    accessor: Arc<dyn FileAccessor>,
    matcher: LineMatcher,
    limits: SearchLimits,
) -> (SearchHandle, UnboundedReceiverStream<SearchEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);

    let task = tokio::spawn(async move {
        let mut sink = ChannelSink { tx: tx.clone() };
        let event = match accessor
            .search(&matcher, limits, Some(flag.as_ref()), &mut sink)
            .await
        {
            Ok(summary) => SearchEvent::Finished(summary),
            Err(error) => SearchEvent::Failed(error),
        };
        let _ = tx.send(event);
    });

    (SearchHandle { cancel, task }, UnboundedReceiverStream::new(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::matcher::SearchOptions;
    use futures::StreamExt;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content).expect("Failed to write test content");
        file.flush().expect("Failed to flush test file");
        file
    }

    async fn session_for(content: &[u8]) -> (NamedTempFile, Session) {
        let file = create_test_file(content);
        let session = Session::index(file.path(), 1024, |_| {}).await.unwrap();
        (file, session)
    }

    fn literal(pattern: &str) -> LineMatcher {
        LineMatcher::new(pattern, &SearchOptions::default()).unwrap()
    }

    fn limits(max_results: usize, chunk_size: usize) -> SearchLimits {
        SearchLimits {
            max_results,
            text_limit: 200,
            chunk_size,
        }
    }

    /// Ten lines with hits on lines 2, 5 and 9
    fn ten_lines() -> String {
        (1..=10)
            .map(|n| {
                if matches!(n, 2 | 5 | 9) {
                    format!("line {} HIT", n)
                } else {
                    format!("line {}", n)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_stops_at_max_results() {
        let (_file, session) = session_for(ten_lines().as_bytes()).await;
        let mut sink = CollectSink::default();

        let summary = search_session(&session, &literal("HIT"), limits(2, 4), None, &mut sink)
            .await
            .unwrap();

        let lines: Vec<u64> = sink.matches.iter().map(|m| m.line_number).collect();
        assert_eq!(lines, vec![2, 5]);
        assert_eq!(summary.match_count, 2);
        assert_eq!(summary.status, SearchStatus::LimitReached);
        assert!(summary.truncated());
        assert_eq!(sink.last_progress, Some(100));
    }

    #[tokio::test]
    async fn test_all_matches_across_tiny_chunks() {
        let content = ten_lines();
        let (_file, session) = session_for(content.as_bytes()).await;

        for chunk_size in [1, 3, 7, 64] {
            let mut sink = CollectSink::default();
            let summary =
                search_session(&session, &literal("HIT"), limits(100, chunk_size), None, &mut sink)
                    .await
                    .unwrap();

            let lines: Vec<u64> = sink.matches.iter().map(|m| m.line_number).collect();
            assert_eq!(lines, vec![2, 5, 9], "chunk size {}", chunk_size);
            assert_eq!(summary.match_count, sink.matches.len());
            assert_eq!(summary.lines_scanned, 10);
            assert_eq!(summary.status, SearchStatus::Completed);
        }
    }

    #[tokio::test]
    async fn test_final_line_without_terminator_is_tested() {
        let (_file, session) = session_for(b"alpha\nbeta\ngamma").await;
        let mut sink = CollectSink::default();

        search_session(&session, &literal("gamma"), limits(10, 4), None, &mut sink)
            .await
            .unwrap();

        assert_eq!(
            sink.matches,
            vec![SearchMatch {
                line_number: 3,
                text: "gamma".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_crlf_stripped_and_text_truncated() {
        let long_line = format!("{}needle\r\n", "é".repeat(300));
        let (_file, session) = session_for(long_line.as_bytes()).await;
        let mut sink = CollectSink::default();

        let options = SearchOptions {
            regex_mode: true,
            ..Default::default()
        };
        let matcher = LineMatcher::new("needle$", &options).unwrap();
        search_session(&session, &matcher, limits(10, 16), None, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.matches.len(), 1);
        assert_eq!(sink.matches[0].text.chars().count(), 200);
        assert!(sink.matches[0].text.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn test_cancel_flag_stops_search() {
        let (_file, session) = session_for(ten_lines().as_bytes()).await;
        let mut sink = CollectSink::default();
        let cancel = AtomicBool::new(true);

        let summary = search_session(&session, &literal("HIT"), limits(10, 4), Some(&cancel), &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.status, SearchStatus::Cancelled);
        assert!(sink.matches.is_empty());
    }

    #[tokio::test]
    async fn test_zero_max_results_reads_nothing() {
        let (_file, session) = session_for(ten_lines().as_bytes()).await;
        let mut sink = CollectSink::default();

        let summary = search_session(&session, &literal("HIT"), limits(0, 4), None, &mut sink)
            .await
            .unwrap();

        assert_eq!(summary.match_count, 0);
        assert_eq!(summary.lines_scanned, 0);
        assert!(sink.matches.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_search_stream_ends_with_summary() {
        let (file, session) = session_for(ten_lines().as_bytes()).await;
        let accessor: Arc<dyn FileAccessor> = Arc::new(session);

        let (handle, stream) = spawn_search(accessor, literal("HIT"), limits(10, 8));
        let events: Vec<SearchEvent> = stream.collect().await;

        let matched: Vec<u64> = events
            .iter()
            .filter_map(|e| match e {
                SearchEvent::Match(m) => Some(m.line_number),
                _ => None,
            })
            .collect();
        assert_eq!(matched, vec![2, 5, 9]);

        match events.last() {
            Some(SearchEvent::Finished(summary)) => {
                assert_eq!(summary.match_count, 3);
                assert_eq!(summary.status, SearchStatus::Completed);
            }
            other => panic!("unexpected final event: {:?}", other),
        }

        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                SearchEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(progress.last(), Some(&100));

        drop(handle);
        drop(file);
    }

    #[tokio::test]
    async fn test_spawned_search_reports_stale_session() {
        let (file, session) = session_for(ten_lines().as_bytes()).await;
        std::fs::write(file.path(), b"changed\n").unwrap();

        let (_handle, stream) = spawn_search(Arc::new(session), literal("HIT"), limits(10, 8));
        let events: Vec<SearchEvent> = stream.collect().await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            SearchEvent::Failed(LineviewError::StaleSession { .. })
        ));
    }
}
