//! Window coordination.
//!
//! `WindowCoordinator` mediates between scroll events, the pure
//! [`ViewportWindow`] and the session worker. Scrolling only computes ranges and
//! enqueues commands; fetch results and search matches come back through
//! [`WindowCoordinator::handle_response`]. Responses for requests the coordinator no
//! longer tracks (after a reset or a newer search) are dropped.

use crate::error::{LineviewError, Result};
use crate::file_handler::LineRange;
use crate::render::protocol::{RequestId, WorkerCommand, WorkerResponse};
use crate::render::window::ViewportWindow;
use crate::search::{SearchMatch, SearchOptions, SearchSummary};
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

/// State of the most recent search issued through the coordinator
#[derive(Debug, Default)]
pub struct SearchState {
    pub pattern: String,
    pub options: SearchOptions,
    pub matches: Vec<SearchMatch>,
    pub progress: u8,
    pub summary: Option<SearchSummary>,
    pub error: Option<String>,
}

impl SearchState {
    pub fn is_running(&self) -> bool {
        self.summary.is_none() && self.error.is_none()
    }
}

pub struct WindowCoordinator {
    window: ViewportWindow,
    tx: UnboundedSender<WorkerCommand>,
    next_request_id: RequestId,
    pending_fetches: HashMap<RequestId, LineRange>,
    active_search: Option<RequestId>,
    search: Option<SearchState>,
}

impl WindowCoordinator {
    pub fn new(window: ViewportWindow, tx: UnboundedSender<WorkerCommand>) -> Self {
        Self {
            window,
            tx,
            next_request_id: 1,
            pending_fetches: HashMap::new(),
            active_search: None,
            search: None,
        }
    }

    pub fn window(&self) -> &ViewportWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut ViewportWindow {
        &mut self.window
    }

    pub fn search(&self) -> Option<&SearchState> {
        self.search.as_ref()
    }

    pub fn pending_fetches(&self) -> usize {
        self.pending_fetches.len()
    }

    /// The session finished indexing; fetch whatever the viewport needs
    pub fn mark_ready(&mut self, total_lines: u64) -> Result<()> {
        let range = self.window.on_ready(total_lines);
        self.request_lines(range)
    }

    pub fn scroll_to(&mut self, scroll_offset: u64, viewport_height: u64) -> Result<()> {
        let range = self.window.on_scroll(scroll_offset, viewport_height);
        self.request_lines(range)
    }

    /// Start a new search, replacing any running one
    pub fn start_search(
        &mut self,
        pattern: &str,
        options: SearchOptions,
        max_results: usize,
    ) -> Result<RequestId> {
        self.cancel_search()?;

        let request_id = self.allocate_id();
        self.active_search = Some(request_id);
        self.search = Some(SearchState {
            pattern: pattern.to_string(),
            options: options.clone(),
            ..Default::default()
        });

        self.send(WorkerCommand::Search {
            request_id,
            pattern: pattern.to_string(),
            options,
            max_results,
        })?;
        Ok(request_id)
    }

    pub fn cancel_search(&mut self) -> Result<()> {
        if let Some(request_id) = self.active_search.take() {
            self.send(WorkerCommand::CancelSearch { request_id })?;
        }
        Ok(())
    }

    pub fn handle_response(&mut self, response: WorkerResponse) {
        match response {
            WorkerResponse::LinesLoaded {
                request_id,
                range,
                lines,
            } => {
                if self.pending_fetches.remove(&request_id).is_some() {
                    let refetch = self.window.on_fetch_complete(range, lines);
                    if let Err(err) = self.request_lines(refetch) {
                        log::warn!("could not refetch the viewport: {}", err);
                    }
                }
            }
            WorkerResponse::SearchMatch { request_id, found } => {
                if let Some(search) = self.active_search_state(request_id) {
                    search.matches.push(found);
                }
            }
            WorkerResponse::SearchProgress {
                request_id,
                percent,
            } => {
                if let Some(search) = self.active_search_state(request_id) {
                    search.progress = search.progress.max(percent);
                }
            }
            WorkerResponse::SearchFinished {
                request_id,
                summary,
            } => {
                if let Some(search) = self.active_search_state(request_id) {
                    search.progress = 100;
                    search.summary = Some(summary);
                    self.active_search = None;
                }
            }
            WorkerResponse::Error { request_id, error } => {
                if let Some(range) = self.pending_fetches.remove(&request_id) {
                    log::warn!("fetch of lines {}..{} failed: {}", range.start, range.end, error);
                    self.window.on_fetch_failed(range, error.to_string());
                } else if let Some(search) = self.active_search_state(request_id) {
                    search.error = Some(error.to_string());
                    self.active_search = None;
                }
            }
        }
    }

    /// First match strictly below `line` (0-based), as a 0-based line
    pub fn next_match(&self, line: u64) -> Option<u64> {
        let matches = &self.search.as_ref()?.matches;
        matches
            .iter()
            .map(|m| m.line_number - 1)
            .find(|candidate| *candidate > line)
    }

    /// Last match strictly above `line` (0-based), as a 0-based line
    pub fn previous_match(&self, line: u64) -> Option<u64> {
        let matches = &self.search.as_ref()?.matches;
        matches
            .iter()
            .rev()
            .map(|m| m.line_number - 1)
            .find(|candidate| *candidate < line)
    }

    /// Drop the window contents and stop tracking outstanding requests
    pub fn reset(&mut self) -> Result<()> {
        self.cancel_search()?;
        self.search = None;
        self.pending_fetches.clear();
        self.window.reset();
        Ok(())
    }

    /// Ask the worker to abort everything and exit
    pub fn shutdown(&mut self) {
        self.pending_fetches.clear();
        self.active_search = None;
        let _ = self.tx.send(WorkerCommand::Shutdown);
    }

    fn active_search_state(&mut self, request_id: RequestId) -> Option<&mut SearchState> {
        if self.active_search == Some(request_id) {
            self.search.as_mut()
        } else {
            None
        }
    }

    fn request_lines(&mut self, range: Option<LineRange>) -> Result<()> {
        let Some(range) = range else {
            return Ok(());
        };
        let request_id = self.allocate_id();
        self.pending_fetches.insert(request_id, range);
        self.send(WorkerCommand::LoadLines { request_id, range })
    }

    fn allocate_id(&mut self) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    fn send(&self, cmd: WorkerCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| LineviewError::other("session worker unavailable"))
    }
}
