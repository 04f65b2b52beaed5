//! Renderer seam for the pager.
//!
//! The pager builds a [`PagerView`] snapshot after every event and hands it to a
//! [`UIRenderer`]. The terminal implementation draws it with ratatui; tests use a
//! recording mock.

use crate::error::Result;
use crate::render::WindowPhase;

/// One row of the content area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    /// 0-based line number
    pub line_number: u64,
    /// `None` while the line has not been fetched
    pub text: Option<String>,
    /// Byte ranges to highlight within `text`
    pub highlights: Vec<(usize, usize)>,
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagerView {
    pub title: String,
    pub phase: WindowPhase,
    pub rows: Vec<ViewRow>,
    pub status: String,
    /// Search prompt being typed, without the leading `/`
    pub prompt: Option<String>,
    pub message: Option<String>,
}

/// Core trait for drawing pager frames
pub trait UIRenderer {
    /// Set up the terminal (raw mode, alternate screen)
    fn initialize(&mut self) -> Result<()>;

    /// Draw one frame
    fn render(&mut self, view: &PagerView) -> Result<()>;

    /// Restore the terminal; must be safe to call twice
    fn cleanup(&mut self) -> Result<()>;

    /// Current terminal dimensions as (width, height)
    fn terminal_size(&self) -> Result<(u16, u16)>;
}
