//! Protocol definitions shared between the window coordinator and the session worker.

use crate::error::LineviewError;
use crate::file_handler::LineRange;
use crate::search::{SearchMatch, SearchOptions, SearchSummary};

/// Identifier attached to cross-task requests so responses can be correlated.
pub type RequestId = u64;

/// Commands sent from the window coordinator to the session worker.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerCommand {
    /// Read the lines of `range` (0-based, end exclusive).
    LoadLines {
        request_id: RequestId,
        range: LineRange,
    },
    /// Start a streaming search; matches arrive as they are found.
    Search {
        request_id: RequestId,
        pattern: String,
        options: SearchOptions,
        max_results: usize,
    },
    /// Stop the search started by `request_id`, if it is still running.
    CancelSearch { request_id: RequestId },
    /// Abort every outstanding task and exit the worker.
    Shutdown,
}

/// Responses emitted by the session worker back to the coordinator.
#[derive(Debug)]
pub enum WorkerResponse {
    LinesLoaded {
        request_id: RequestId,
        range: LineRange,
        lines: Vec<String>,
    },
    SearchMatch {
        request_id: RequestId,
        found: SearchMatch,
    },
    SearchProgress {
        request_id: RequestId,
        percent: u8,
    },
    SearchFinished {
        request_id: RequestId,
        summary: SearchSummary,
    },
    Error {
        request_id: RequestId,
        error: LineviewError,
    },
}

impl WorkerResponse {
    pub fn request_id(&self) -> RequestId {
        match self {
            Self::LinesLoaded { request_id, .. }
            | Self::SearchMatch { request_id, .. }
            | Self::SearchProgress { request_id, .. }
            | Self::SearchFinished { request_id, .. }
            | Self::Error { request_id, .. } => *request_id,
        }
    }
}
