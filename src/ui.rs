//! Terminal pager built on ratatui
//!
//! The pager is a consumer of the engine: it opens a file, shows indexing
//! progress, then scrolls through the virtual window and steps through search
//! matches.

pub mod input;
pub mod pager;
pub mod renderer;
pub mod terminal;
pub mod theme;

// Re-export public API
pub use input::{spawn_input_thread, InputMode, InputStateMachine, PagerAction};
pub use pager::{run_pager, PagerOptions};
pub use ratatui::style::{Color, Style};
pub use renderer::{PagerView, UIRenderer, ViewRow};
pub use terminal::TerminalUI;
pub use theme::ColorTheme;

#[cfg(test)]
pub use renderer::tests::MockUIRenderer;
