//! Interactive pager loop.
//!
//! Opens the file through the engine while showing indexing progress, then
//! drives a [`WindowCoordinator`] from scroll actions and draws whatever the
//! window has cached. Line fetches and searches run in the session worker, so
//! the loop only ever waits on channels.

use crate::engine::LargeFileEngine;
use crate::error::Result;
use crate::render::{session_worker_loop, ViewportWindow, WindowCoordinator, WindowPhase};
use crate::search::{LineMatcher, SearchOptions};
use crate::ui::input::PagerAction;
use crate::ui::renderer::{PagerView, UIRenderer, ViewRow};
use std::path::Path;
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Debug, Clone, Default)]
pub struct PagerOptions {
    /// Search to start as soon as the file is indexed
    pub initial_search: Option<String>,
    pub search_options: SearchOptions,
}

/// Run the pager until the user quits or the action channel closes
///
/// The renderer is initialized on entry and always cleaned up on exit, including
/// when opening the file fails.
pub async fn run_pager(
    engine: &LargeFileEngine,
    path: &Path,
    options: PagerOptions,
    renderer: &mut dyn UIRenderer,
    actions: UnboundedReceiver<PagerAction>,
) -> Result<()> {
    renderer.initialize()?;
    let result = pager_loop(engine, path, options, renderer, actions).await;
    renderer.cleanup()?;
    result
}

/// Navigation and prompt state that lives outside the window cache
struct PagerState {
    title: String,
    top: u64,
    page_height: u64,
    line_height: u64,
    prompt: Option<String>,
    message: Option<String>,
    highlighter: Option<LineMatcher>,
    pending_search: Option<String>,
    /// Jump to the first match once it arrives
    jump_to_first_match: bool,
    search_options: SearchOptions,
    max_results: usize,
}

impl PagerState {
    fn set_page_height(&mut self, terminal_height: u16) {
        // One row is reserved for the status line
        self.page_height = u64::from(terminal_height.saturating_sub(1)).max(1);
    }

    fn max_top(&self, coordinator: &WindowCoordinator) -> u64 {
        coordinator
            .window()
            .total_lines()
            .map_or(0, |total| total.saturating_sub(self.page_height))
    }

    fn move_to(&mut self, top: u64, coordinator: &mut WindowCoordinator) -> Result<()> {
        self.top = top.min(self.max_top(coordinator));
        self.scroll(coordinator)
    }

    fn move_by(&mut self, delta: i64, coordinator: &mut WindowCoordinator) -> Result<()> {
        let top = if delta < 0 {
            self.top.saturating_sub(delta.unsigned_abs())
        } else {
            self.top.saturating_add(delta as u64)
        };
        self.move_to(top, coordinator)
    }

    fn scroll(&self, coordinator: &mut WindowCoordinator) -> Result<()> {
        coordinator.scroll_to(
            self.top * self.line_height,
            self.page_height * self.line_height,
        )
    }

    fn start_search(&mut self, pattern: String, coordinator: &mut WindowCoordinator) -> Result<()> {
        self.highlighter = match LineMatcher::new(&pattern, &self.search_options) {
            Ok(matcher) => Some(matcher),
            Err(error) => {
                self.message = Some(error.to_string());
                return Ok(());
            }
        };
        self.jump_to_first_match = true;

        if coordinator.window().total_lines().is_some() {
            coordinator.start_search(&pattern, self.search_options.clone(), self.max_results)?;
        } else {
            self.pending_search = Some(pattern);
        }
        Ok(())
    }

    /// Apply one action; returns false when the pager should exit
    fn apply(&mut self, action: PagerAction, coordinator: &mut WindowCoordinator) -> Result<bool> {
        self.message = None;
        let page = self.page_height as i64;

        match action {
            PagerAction::Quit => return Ok(false),
            PagerAction::Scroll(lines) => self.move_by(lines, coordinator)?,
            PagerAction::PageDown => self.move_by(page, coordinator)?,
            PagerAction::PageUp => self.move_by(-page, coordinator)?,
            PagerAction::HalfPageDown => self.move_by((page / 2).max(1), coordinator)?,
            PagerAction::HalfPageUp => self.move_by(-(page / 2).max(1), coordinator)?,
            PagerAction::GoToStart => self.move_to(0, coordinator)?,
            PagerAction::GoToEnd => self.move_to(u64::MAX, coordinator)?,
            PagerAction::StartSearch => self.prompt = Some(String::new()),
            PagerAction::UpdateSearch(buffer) => self.prompt = Some(buffer),
            PagerAction::CancelSearch => {
                self.prompt = None;
                self.highlighter = None;
                self.pending_search = None;
                self.jump_to_first_match = false;
                coordinator.cancel_search()?;
            }
            PagerAction::ExecuteSearch(pattern) => {
                self.prompt = None;
                self.start_search(pattern, coordinator)?;
            }
            PagerAction::NextMatch => match coordinator.next_match(self.top) {
                Some(line) => self.move_to(line, coordinator)?,
                None => self.message = Some(self.no_match_message(coordinator)),
            },
            PagerAction::PreviousMatch => match coordinator.previous_match(self.top) {
                Some(line) => self.move_to(line, coordinator)?,
                None => self.message = Some(self.no_match_message(coordinator)),
            },
            PagerAction::Resize { height, .. } => {
                self.set_page_height(height);
                self.move_to(self.top, coordinator)?;
            }
        }
        Ok(true)
    }

    fn no_match_message(&self, coordinator: &WindowCoordinator) -> String {
        if coordinator.search().is_some() {
            "Pattern not found".to_string()
        } else {
            "No active search".to_string()
        }
    }

    fn follow_first_match(&mut self, coordinator: &mut WindowCoordinator) -> Result<()> {
        if !self.jump_to_first_match {
            return Ok(());
        }
        let first = coordinator
            .search()
            .and_then(|search| search.matches.first())
            .map(|found| found.line_number - 1);
        if let Some(line) = first {
            self.jump_to_first_match = false;
            self.move_to(line, coordinator)?;
        }
        Ok(())
    }

    fn build_view(&self, coordinator: &WindowCoordinator) -> PagerView {
        let window = coordinator.window();
        let rows = window
            .visible_lines()
            .into_iter()
            .map(|(line_number, text)| ViewRow {
                line_number,
                highlights: match (&self.highlighter, text) {
                    (Some(matcher), Some(text)) => matcher.find_ranges(text),
                    _ => Vec::new(),
                },
                text: text.map(str::to_string),
            })
            .collect();

        let mut status = match window.phase() {
            WindowPhase::Ready { total_lines } => {
                let last = (self.top + self.page_height).min(total_lines);
                format!(
                    "{} | lines {}-{} of {}",
                    self.title,
                    (self.top + 1).min(total_lines),
                    last,
                    total_lines
                )
            }
            WindowPhase::Indexing { percent } => format!("{} | indexing {}%", self.title, percent),
            WindowPhase::Idle => self.title.clone(),
        };
        if let Some(search) = coordinator.search() {
            status.push_str(&format!(" | /{}: {} matches", search.pattern, search.matches.len()));
            match &search.summary {
                Some(summary) if summary.truncated() => status.push('+'),
                None if search.is_running() => {
                    status.push_str(&format!(" (searching {}%)", search.progress))
                }
                _ => {}
            }
        }

        let message = self
            .message
            .clone()
            .or_else(|| coordinator.search().and_then(|search| search.error.clone()))
            .or_else(|| window.last_error().map(str::to_string));

        PagerView {
            title: self.title.clone(),
            phase: window.phase(),
            rows,
            status,
            prompt: self.prompt.clone(),
            message,
        }
    }
}

async fn pager_loop(
    engine: &LargeFileEngine,
    path: &Path,
    options: PagerOptions,
    renderer: &mut dyn UIRenderer,
    mut actions: UnboundedReceiver<PagerAction>,
) -> Result<()> {
    let config = engine.config();
    let mut state = PagerState {
        title: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        top: 0,
        page_height: 1,
        line_height: config.window.line_height.max(1),
        prompt: None,
        message: None,
        highlighter: None,
        pending_search: None,
        jump_to_first_match: false,
        search_options: options.search_options.clone(),
        max_results: config.max_search_results,
    };
    let (_, height) = renderer.terminal_size()?;
    state.set_page_height(height);

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel();
    let mut cmd_rx = Some(cmd_rx);
    let mut coordinator = WindowCoordinator::new(ViewportWindow::new(config.window.clone()), cmd_tx);
    coordinator.window_mut().begin_indexing();
    state.scroll(&mut coordinator)?;
    if let Some(pattern) = options.initial_search {
        state.start_search(pattern, &mut coordinator)?;
    }

    let mut progress = engine.subscribe_progress(path);
    let mut progress_live = true;
    let open = engine.open(path);
    tokio::pin!(open);
    let mut opened = false;
    let mut worker = None;

    renderer.render(&state.build_view(&coordinator))?;

    loop {
        tokio::select! {
            changed = progress.changed(), if progress_live && !opened => {
                match changed {
                    Ok(()) => {
                        let percent = *progress.borrow_and_update();
                        coordinator.window_mut().on_index_progress(percent);
                    }
                    Err(_) => progress_live = false,
                }
            }
            opened_info = &mut open, if !opened => {
                opened = true;
                let info = opened_info?;
                if let Some(cmd_rx) = cmd_rx.take() {
                    let accessor = engine.accessor(path)?;
                    worker = Some(tokio::spawn(session_worker_loop(
                        cmd_rx,
                        resp_tx.clone(),
                        accessor,
                        engine.search_limits(),
                    )));
                }
                coordinator.mark_ready(info.total_lines)?;
                if let Some(pattern) = state.pending_search.take() {
                    coordinator.start_search(&pattern, state.search_options.clone(), state.max_results)?;
                }
            }
            Some(response) = resp_rx.recv() => {
                coordinator.handle_response(response);
                state.follow_first_match(&mut coordinator)?;
            }
            action = actions.recv() => {
                let keep_running = match action {
                    Some(action) => state.apply(action, &mut coordinator)?,
                    None => false,
                };
                if !keep_running {
                    break;
                }
            }
        }

        renderer.render(&state.build_view(&coordinator))?;
    }

    coordinator.shutdown();
    if let Some(worker) = worker {
        let _ = worker.await;
    }
    Ok(())
}
