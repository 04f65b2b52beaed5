//! Viewport-driven line cache.
//!
//! `ViewportWindow` turns scroll positions into line fetch requests and keeps a
//! bounded cache of fetched lines around the viewport. It performs no I/O: callers
//! send the returned ranges to a worker and feed the results back through
//! [`ViewportWindow::on_fetch_complete`]. Scroll handling is range arithmetic only,
//! so it never waits on the file.

use crate::config::WindowConfig;
use crate::file_handler::LineRange;
use std::collections::{HashMap, HashSet};

/// Lifecycle of the window relative to the session it displays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Idle,
    Indexing { percent: u8 },
    Ready { total_lines: u64 },
}

#[derive(Debug)]
pub struct ViewportWindow {
    config: WindowConfig,
    phase: WindowPhase,

    /// Last scroll position, replayed when the window becomes ready
    scroll_offset: u64,
    viewport_height: u64,

    visible: LineRange,
    cache: HashMap<u64, String>,
    in_flight: HashSet<LineRange>,
    last_error: Option<String>,
}

impl ViewportWindow {
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            phase: WindowPhase::Idle,
            scroll_offset: 0,
            viewport_height: 0,
            visible: LineRange::new(0, 0),
            cache: HashMap::new(),
            in_flight: HashSet::new(),
            last_error: None,
        }
    }

    pub fn phase(&self) -> WindowPhase {
        self.phase
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    pub fn visible_range(&self) -> LineRange {
        self.visible
    }

    pub fn total_lines(&self) -> Option<u64> {
        match self.phase {
            WindowPhase::Ready { total_lines } => Some(total_lines),
            _ => None,
        }
    }

    pub fn begin_indexing(&mut self) {
        if self.phase == WindowPhase::Idle {
            self.phase = WindowPhase::Indexing { percent: 0 };
        }
    }

    /// Record indexing progress; percentages never move backwards
    pub fn on_index_progress(&mut self, percent: u8) {
        if let WindowPhase::Indexing { percent: current } = &mut self.phase {
            *current = (*current).max(percent.min(100));
        }
    }

    /// Enter `Ready` and return the fetch needed for the current scroll position
    pub fn on_ready(&mut self, total_lines: u64) -> Option<LineRange> {
        self.phase = WindowPhase::Ready { total_lines };
        self.on_scroll(self.scroll_offset, self.viewport_height)
    }

    /// Handle a scroll or resize
    ///
    /// `scroll_offset` and `viewport_height` are in the same units as the configured
    /// line height. Returns the range to fetch, or `None` when the buffered range is
    /// already cached, already requested, or the window is not ready.
    pub fn on_scroll(&mut self, scroll_offset: u64, viewport_height: u64) -> Option<LineRange> {
        self.scroll_offset = scroll_offset;
        self.viewport_height = viewport_height;

        let WindowPhase::Ready { total_lines } = self.phase else {
            return None;
        };
        if viewport_height == 0 {
            self.visible = LineRange::new(0, 0);
            return None;
        }

        let line_height = self.config.line_height.max(1);
        let first = scroll_offset / line_height;
        let last = scroll_offset
            .saturating_add(viewport_height)
            .div_ceil(line_height);
        self.visible = LineRange::new(first, last).clamp(total_lines);

        self.request_missing(total_lines)
    }

    /// Store fetched lines and drop cache entries far from both them and the viewport
    ///
    /// Returns a refetch when the current viewport still has gaps, e.g. after an
    /// older request landed last.
    pub fn on_fetch_complete(&mut self, range: LineRange, lines: Vec<String>) -> Option<LineRange> {
        self.in_flight.remove(&range);
        let total_lines = self.total_lines()?;

        for (line, text) in (range.start..).zip(lines) {
            self.cache.insert(line, text);
        }

        let keep = self.config.keep_distance;
        let current = self.buffered_range(total_lines);
        let near = |around: LineRange, line: u64| {
            line >= around.start.saturating_sub(keep) && line < around.end.saturating_add(keep)
        };
        self.cache
            .retain(|line, _| near(range, *line) || (!current.is_empty() && near(current, *line)));
        self.last_error = None;

        self.request_missing(total_lines)
    }

    pub fn on_fetch_failed(&mut self, range: LineRange, message: impl Into<String>) {
        self.in_flight.remove(&range);
        self.last_error = Some(message.into());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn line(&self, line: u64) -> Option<&str> {
        self.cache.get(&line).map(String::as_str)
    }

    pub fn is_cached(&self, line: u64) -> bool {
        self.cache.contains_key(&line)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    /// Visible lines in order; `None` for lines not fetched yet
    pub fn visible_lines(&self) -> Vec<(u64, Option<&str>)> {
        (self.visible.start..self.visible.end)
            .map(|line| (line, self.line(line)))
            .collect()
    }

    /// Forget everything, e.g. after the session was closed or re-indexed
    pub fn reset(&mut self) {
        self.phase = WindowPhase::Idle;
        self.visible = LineRange::new(0, 0);
        self.cache.clear();
        self.in_flight.clear();
        self.last_error = None;
    }

    /// Visible range widened by the buffer on both sides
    fn buffered_range(&self, total_lines: u64) -> LineRange {
        if self.visible.is_empty() {
            return self.visible;
        }
        let buffer = self.config.buffer_lines;
        LineRange::new(
            self.visible.start.saturating_sub(buffer),
            self.visible.end.saturating_add(buffer),
        )
        .clamp(total_lines)
    }

    fn request_missing(&mut self, total_lines: u64) -> Option<LineRange> {
        let wanted = self.buffered_range(total_lines);
        if wanted.is_empty() || self.is_fully_cached(wanted) || self.in_flight.contains(&wanted) {
            return None;
        }

        self.in_flight.insert(wanted);
        Some(wanted)
    }

    fn is_fully_cached(&self, range: LineRange) -> bool {
        (range.start..range.end).all(|line| self.cache.contains_key(&line))
    }
}
