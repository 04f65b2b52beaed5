//! Keyboard and terminal input for the pager.
//!
//! A small `less`-style state machine turns crossterm events into
//! [`PagerAction`]s. The blocking crossterm poll runs on its own thread and
//! forwards actions over a channel so the async pager loop never blocks on input.

use crate::error::Result;
use ratatui::crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseEventKind,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// Lines moved by one mouse wheel tick
const MOUSE_SCROLL_LINES: i64 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PagerAction {
    /// Move by a number of lines (positive is down)
    Scroll(i64),
    PageDown,
    PageUp,
    HalfPageDown,
    HalfPageUp,
    GoToStart,
    GoToEnd,
    StartSearch,
    UpdateSearch(String),
    CancelSearch,
    ExecuteSearch(String),
    NextMatch,
    PreviousMatch,
    Resize { width: u16, height: u16 },
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Navigation,
    SearchPrompt,
}

/// Maps key presses to pager actions, tracking the search prompt buffer
#[derive(Debug)]
pub struct InputStateMachine {
    mode: InputMode,
    search_buffer: String,
}

impl InputStateMachine {
    pub fn new() -> Self {
        Self {
            mode: InputMode::Navigation,
            search_buffer: String::new(),
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn handle_event(&mut self, event: Event) -> Option<PagerAction> {
        match event {
            Event::Key(key) => self.handle_key_event(key),
            Event::Resize(width, height) => Some(PagerAction::Resize { width, height }),
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollDown => Some(PagerAction::Scroll(MOUSE_SCROLL_LINES)),
                MouseEventKind::ScrollUp => Some(PagerAction::Scroll(-MOUSE_SCROLL_LINES)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> Option<PagerAction> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return match self.mode {
                InputMode::Navigation => Some(PagerAction::Quit),
                InputMode::SearchPrompt => Some(self.leave_prompt()),
            };
        }

        match self.mode {
            InputMode::Navigation => Self::navigation_key(key.code).map(|action| {
                if action == PagerAction::StartSearch {
                    self.mode = InputMode::SearchPrompt;
                    self.search_buffer.clear();
                }
                action
            }),
            InputMode::SearchPrompt => self.prompt_key(key.code),
        }
    }

    fn navigation_key(code: KeyCode) -> Option<PagerAction> {
        let action = match code {
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Enter => PagerAction::Scroll(1),
            KeyCode::Char('k') | KeyCode::Up => PagerAction::Scroll(-1),
            KeyCode::Char(' ') | KeyCode::Char('f') | KeyCode::PageDown => PagerAction::PageDown,
            KeyCode::Char('b') | KeyCode::PageUp => PagerAction::PageUp,
            KeyCode::Char('d') => PagerAction::HalfPageDown,
            KeyCode::Char('u') => PagerAction::HalfPageUp,
            KeyCode::Char('g') | KeyCode::Home => PagerAction::GoToStart,
            KeyCode::Char('G') | KeyCode::End => PagerAction::GoToEnd,
            KeyCode::Char('/') => PagerAction::StartSearch,
            KeyCode::Char('n') => PagerAction::NextMatch,
            KeyCode::Char('N') => PagerAction::PreviousMatch,
            KeyCode::Char('q') => PagerAction::Quit,
            _ => return None,
        };
        Some(action)
    }

    fn prompt_key(&mut self, code: KeyCode) -> Option<PagerAction> {
        match code {
            KeyCode::Char(ch) => {
                self.search_buffer.push(ch);
                Some(PagerAction::UpdateSearch(self.search_buffer.clone()))
            }
            KeyCode::Backspace => {
                if self.search_buffer.pop().is_none() {
                    return Some(self.leave_prompt());
                }
                Some(PagerAction::UpdateSearch(self.search_buffer.clone()))
            }
            KeyCode::Enter => {
                let pattern = std::mem::take(&mut self.search_buffer);
                self.mode = InputMode::Navigation;
                if pattern.is_empty() {
                    Some(PagerAction::CancelSearch)
                } else {
                    Some(PagerAction::ExecuteSearch(pattern))
                }
            }
            KeyCode::Esc => Some(self.leave_prompt()),
            _ => None,
        }
    }

    fn leave_prompt(&mut self) -> PagerAction {
        self.mode = InputMode::Navigation;
        self.search_buffer.clear();
        PagerAction::CancelSearch
    }
}

impl Default for InputStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

fn poll_action(
    machine: &mut InputStateMachine,
    timeout: Duration,
) -> Result<Option<PagerAction>> {
    if event::poll(timeout)? {
        return Ok(machine.handle_event(event::read()?));
    }
    Ok(None)
}

/// Spawn a blocking thread that polls terminal events and forwards actions to the pager.
pub fn spawn_input_thread(
    tx: UnboundedSender<PagerAction>,
    shutdown: Arc<AtomicBool>,
    poll_interval: Duration,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut machine = InputStateMachine::new();
        while !shutdown.load(Ordering::SeqCst) {
            match poll_action(&mut machine, poll_interval) {
                Ok(Some(action)) => {
                    if tx.send(action).is_err() {
                        return;
                    }
                }
                Ok(None) => continue,
                Err(err) => {
                    log::error!("input thread error: {}", err);
                    break;
                }
            }
        }
    })
}
