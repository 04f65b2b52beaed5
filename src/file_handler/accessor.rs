//! Core file access abstraction.
//!
//! This module defines the FileAccessor trait that the viewport worker and the
//! spawned searches talk to. It uses 0-based line ranges for reads and streams the
//! raw file for searches, so implementations only need an index and a path.

use crate::error::Result;
use crate::file_handler::reader;
use crate::file_handler::session::Session;
use crate::search::{search_session, LineMatcher, SearchLimits, SearchSink, SearchSummary};
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::AtomicBool;

/// Core trait for indexed file access
///
/// All implementations must be thread-safe; the worker shares one accessor
/// between concurrent fetch and search tasks.
#[async_trait]
pub trait FileAccessor: Send + Sync {
    /// Read lines `[start, end)`
    ///
    /// # Returns
    /// * Exactly `end - start` lines after clamping to `[0, total_lines]`
    /// * Empty vector for an empty or out-of-range request
    ///
    /// # Usage
    /// Used by the viewport worker to fill the window cache
    async fn read_lines(&self, start: u64, end: u64) -> Result<Vec<String>>;

    /// Stream the file and report every line matching `matcher` to `sink`
    ///
    /// # Arguments
    /// * `limits` - Result cap, per-match text cap and read chunk size
    /// * `cancel_flag` - Checked between chunks for cooperative cancellation
    ///
    /// # Usage
    /// Used for interactive search while the viewport keeps fetching
    async fn search(
        &self,
        matcher: &LineMatcher,
        limits: SearchLimits,
        cancel_flag: Option<&AtomicBool>,
        sink: &mut dyn SearchSink,
    ) -> Result<SearchSummary>;

    /// Number of lines in the index (O(1))
    fn total_lines(&self) -> u64;

    /// File size in bytes at indexing time (O(1))
    fn file_size(&self) -> u64;

    /// Path of the file being accessed, for display and error messages
    fn file_path(&self) -> &Path;
}

#[async_trait]
impl FileAccessor for Session {
    async fn read_lines(&self, start: u64, end: u64) -> Result<Vec<String>> {
        reader::read_lines(self, start, end).await
    }

    async fn search(
        &self,
        matcher: &LineMatcher,
        limits: SearchLimits,
        cancel_flag: Option<&AtomicBool>,
        sink: &mut dyn SearchSink,
    ) -> Result<SearchSummary> {
        search_session(self, matcher, limits, cancel_flag, sink).await
    }

    fn total_lines(&self) -> u64 {
        Session::total_lines(self)
    }

    fn file_size(&self) -> u64 {
        Session::file_size(self)
    }

    fn file_path(&self) -> &Path {
        self.path()
    }
}
