//! Color themes for the pager, using ratatui colors directly.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct ColorTheme {
    /// Normal text color (None uses terminal default)
    pub normal_text: Option<Color>,

    pub search_match: Style,

    /// Rows whose line has not been fetched yet
    pub placeholder: Style,

    pub status_bg: Color,
    pub status_fg: Color,

    /// Gutter line numbers (None hides the gutter)
    pub line_numbers: Option<Color>,

    pub error_text: Color,

    /// Indexing progress gauge
    pub progress: Color,
}

impl Default for ColorTheme {
    /// Default color theme similar to less
    fn default() -> Self {
        Self {
            normal_text: None,
            search_match: Style::default().fg(Color::Black).bg(Color::Yellow),
            placeholder: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::DIM),
            status_bg: Color::Blue,
            status_fg: Color::White,
            line_numbers: Some(Color::DarkGray),
            error_text: Color::Red,
            progress: Color::Cyan,
        }
    }
}

impl ColorTheme {
    /// Theme for terminals without color support
    pub fn monochrome() -> Self {
        Self {
            normal_text: None,
            search_match: Style::default().add_modifier(Modifier::REVERSED),
            placeholder: Style::default().add_modifier(Modifier::DIM),
            status_bg: Color::Black,
            status_fg: Color::White,
            line_numbers: None,
            error_text: Color::White,
            progress: Color::White,
        }
    }

    pub fn high_contrast() -> Self {
        Self {
            normal_text: Some(Color::White),
            search_match: Style::default().fg(Color::Black).bg(Color::LightYellow),
            placeholder: Style::default().fg(Color::Gray),
            status_bg: Color::White,
            status_fg: Color::Black,
            line_numbers: Some(Color::LightGreen),
            error_text: Color::LightRed,
            progress: Color::LightGreen,
        }
    }

    /// Style for ordinary line text
    pub fn text_style(&self) -> Style {
        match self.normal_text {
            Some(color) => Style::default().fg(color),
            None => Style::default(),
        }
    }

    pub fn status_style(&self) -> Style {
        Style::default().bg(self.status_bg).fg(self.status_fg)
    }
}
