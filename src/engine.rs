//! Path-level facade over the session registry.
//!
//! `LargeFileEngine` is what consumers (the CLI, the pager, an editor shell) talk
//! to: classify a path, open it, read and search it, write line edits, close it.
//! Every operation after `open` looks the session up by path.

use crate::config::EngineConfig;
use crate::error::{LineviewError, Result};
use crate::file_handler::{
    classify, read_lines, EditSet, FileAccessor, Session, SessionInfo, SessionRegistry,
    SessionState,
};
use crate::search::{
    search_session, spawn_search, CollectSink, LineMatcher, SearchEvent, SearchHandle,
    SearchLimits, SearchMatch, SearchOptions,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Collected result of a blocking search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub matches: Vec<SearchMatch>,
    /// More matches may exist past the result limit
    pub truncated: bool,
}

#[derive(Debug)]
pub struct LargeFileEngine {
    config: EngineConfig,
    registry: SessionRegistry,
}

impl LargeFileEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let registry = SessionRegistry::new(config.chunk_size);
        Ok(Self { config, registry })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits::from(&self.config)
    }

    /// Whether `path` is large enough to need this engine
    pub async fn classify(&self, path: &Path) -> bool {
        classify(path, self.config.large_file_threshold).await
    }

    /// Index `path` (or reuse its session) and report its shape
    pub async fn open(&self, path: &Path) -> Result<SessionInfo> {
        let session = self.registry.open(path).await?;
        Ok(session.info())
    }

    pub fn subscribe_progress(&self, path: &Path) -> watch::Receiver<u8> {
        self.registry.subscribe_progress(path)
    }

    pub fn state(&self, path: &Path) -> Option<SessionState> {
        self.registry.state(path)
    }

    /// The ready session for `path`
    pub fn session(&self, path: &Path) -> Result<Arc<Session>> {
        self.registry
            .get(path)
            .ok_or_else(|| LineviewError::NoSession {
                path: path.to_path_buf(),
            })
    }

    /// Session for `path` as a shareable accessor, for the viewport worker
    pub fn accessor(&self, path: &Path) -> Result<Arc<dyn FileAccessor>> {
        let session: Arc<dyn FileAccessor> = self.session(path)?;
        Ok(session)
    }

    /// Lines `[start, end)` (0-based) of an open file
    pub async fn read_lines(&self, path: &Path, start: u64, end: u64) -> Result<Vec<String>> {
        let session = self.session(path)?;
        read_lines(&session, start, end).await
    }

    /// Search an open file, collecting up to the configured number of matches
    pub async fn search(
        &self,
        path: &Path,
        pattern: &str,
        options: &SearchOptions,
    ) -> Result<SearchResults> {
        let matcher = LineMatcher::new(pattern, options)?;
        let session = self.session(path)?;

        let mut sink = CollectSink::default();
        let summary =
            search_session(&session, &matcher, self.search_limits(), None, &mut sink).await?;

        Ok(SearchResults {
            matches: sink.matches,
            truncated: summary.truncated(),
        })
    }

    /// Search an open file in the background, yielding events as they happen
    pub fn search_stream(
        &self,
        path: &Path,
        pattern: &str,
        options: &SearchOptions,
    ) -> Result<(SearchHandle, UnboundedReceiverStream<SearchEvent>)> {
        let matcher = LineMatcher::new(pattern, options)?;
        let accessor = self.accessor(path)?;
        Ok(spawn_search(accessor, matcher, self.search_limits()))
    }

    /// Apply line edits (1-based) to an open file and re-index it
    pub async fn write_edits(&self, path: &Path, edits: &EditSet) -> Result<SessionInfo> {
        let session = self.session(path)?;
        let fresh = self.registry.write_edits(session, edits).await?;
        Ok(fresh.info())
    }

    pub fn close(&self, path: &Path) -> bool {
        self.registry.close(path)
    }
}

impl Default for LargeFileEngine {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            registry: SessionRegistry::new(config.chunk_size),
            config,
        }
    }
}
