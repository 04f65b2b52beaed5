//! Terminal UI implementation using ratatui
//!
//! Draws [`PagerView`] snapshots: an indexing gauge until the session is ready,
//! then the visible window with a line-number gutter and a status line. All data
//! comes from the snapshot; nothing here touches the file.

use crate::error::Result;
use crate::render::WindowPhase;
use crate::ui::renderer::{PagerView, UIRenderer, ViewRow};
use crate::ui::theme::ColorTheme;
use ratatui::crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};

type CrosstermTerminal = Terminal<CrosstermBackend<Stdout>>;

/// Terminal UI with a crossterm backend
pub struct TerminalUI {
    terminal: Option<CrosstermTerminal>,
    theme: ColorTheme,
}

impl TerminalUI {
    pub fn new() -> Self {
        Self::with_theme(ColorTheme::default())
    }

    pub fn with_theme(theme: ColorTheme) -> Self {
        Self {
            terminal: None,
            theme,
        }
    }
}

impl Default for TerminalUI {
    fn default() -> Self {
        Self::new()
    }
}

impl UIRenderer for TerminalUI {
    fn initialize(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

        let backend = CrosstermBackend::new(stdout);
        self.terminal = Some(Terminal::new(backend)?);
        Ok(())
    }

    fn render(&mut self, view: &PagerView) -> Result<()> {
        if let Some(ref mut terminal) = self.terminal {
            let theme = &self.theme;
            terminal.draw(|frame| draw_view(frame, view, theme))?;
        }
        Ok(())
    }

    fn cleanup(&mut self) -> Result<()> {
        if self.terminal.is_some() {
            disable_raw_mode()?;
            execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture)?;
            self.terminal = None;
        }
        Ok(())
    }

    fn terminal_size(&self) -> Result<(u16, u16)> {
        Ok(ratatui::crossterm::terminal::size()?)
    }
}

impl Drop for TerminalUI {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

/// Draw one frame: content (or indexing gauge) above a one-line status bar
pub fn draw_view(frame: &mut Frame, view: &PagerView, theme: &ColorTheme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(frame.size());

    match view.phase {
        WindowPhase::Ready { total_lines } => {
            draw_content(frame, chunks[0], view, total_lines, theme)
        }
        WindowPhase::Indexing { percent } => draw_progress(frame, chunks[0], view, percent, theme),
        WindowPhase::Idle => draw_progress(frame, chunks[0], view, 0, theme),
    }
    draw_status(frame, chunks[1], view, theme);
}

fn draw_progress(frame: &mut Frame, area: Rect, view: &PagerView, percent: u8, theme: &ColorTheme) {
    let height = 3.min(area.height);
    let gauge_area = Rect {
        x: area.x,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: area.width,
        height,
    };
    let gauge = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Indexing {}", view.title)),
        )
        .gauge_style(Style::default().fg(theme.progress))
        .percent(u16::from(percent.min(100)));
    frame.render_widget(gauge, gauge_area);
}

fn draw_content(
    frame: &mut Frame,
    area: Rect,
    view: &PagerView,
    total_lines: u64,
    theme: &ColorTheme,
) {
    let gutter_width = theme
        .line_numbers
        .map(|_| total_lines.max(1).to_string().len());
    let lines: Vec<Line> = view
        .rows
        .iter()
        .map(|row| row_line(row, gutter_width, theme))
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
}

/// Build the styled line for one row, splitting out highlighted ranges
fn row_line<'a>(row: &'a ViewRow, gutter_width: Option<usize>, theme: &ColorTheme) -> Line<'a> {
    let mut spans = Vec::new();
    if let (Some(width), Some(color)) = (gutter_width, theme.line_numbers) {
        spans.push(Span::styled(
            format!("{:>width$} ", row.line_number + 1, width = width),
            Style::default().fg(color),
        ));
    }

    let Some(text) = row.text.as_deref() else {
        spans.push(Span::styled("~", theme.placeholder));
        return Line::from(spans);
    };

    let normal = theme.text_style();
    let mut last_end = 0;
    for &(start, end) in &row.highlights {
        if start < last_end {
            continue;
        }
        let (Some(before), Some(matched)) = (text.get(last_end..start), text.get(start..end))
        else {
            continue;
        };
        if !before.is_empty() {
            spans.push(Span::styled(before, normal));
        }
        spans.push(Span::styled(matched, theme.search_match));
        last_end = end;
    }
    if let Some(rest) = text.get(last_end..) {
        if !rest.is_empty() {
            spans.push(Span::styled(rest, normal));
        }
    }
    Line::from(spans)
}

fn draw_status(frame: &mut Frame, area: Rect, view: &PagerView, theme: &ColorTheme) {
    let status = if let Some(prompt) = &view.prompt {
        Paragraph::new(format!("/{}", prompt))
    } else if let Some(message) = &view.message {
        Paragraph::new(Line::from(vec![
            Span::raw(format!("{} | ", view.status)),
            Span::styled(message.as_str(), Style::default().fg(theme.error_text)),
        ]))
    } else {
        Paragraph::new(view.status.as_str())
    };
    frame.render_widget(status.style(theme.status_style()), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn screen(view: &PagerView, theme: &ColorTheme, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| draw_view(frame, view, theme)).unwrap();

        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| buffer.get(x, y).symbol().to_string())
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .collect()
    }

    fn view(phase: WindowPhase, rows: Vec<ViewRow>) -> PagerView {
        PagerView {
            title: "big.log".to_string(),
            phase,
            rows,
            status: "big.log | line 1".to_string(),
            prompt: None,
            message: None,
        }
    }

    fn row(line_number: u64, text: Option<&str>) -> ViewRow {
        ViewRow {
            line_number,
            text: text.map(str::to_string),
            highlights: Vec::new(),
        }
    }

    #[test]
    fn test_ready_view_draws_rows_and_placeholders() {
        let rows = vec![row(8, Some("alpha")), row(9, None), row(10, Some("gamma"))];
        let lines = screen(
            &view(WindowPhase::Ready { total_lines: 120 }, rows),
            &ColorTheme::default(),
            30,
            4,
        );

        assert_eq!(lines[0], "  9 alpha");
        assert_eq!(lines[1], " 10 ~");
        assert_eq!(lines[2], " 11 gamma");
        assert_eq!(lines[3], "big.log | line 1");
    }

    #[test]
    fn test_prompt_replaces_status() {
        let mut pager_view = view(WindowPhase::Ready { total_lines: 1 }, Vec::new());
        pager_view.prompt = Some("err".to_string());
        let lines = screen(&pager_view, &ColorTheme::monochrome(), 20, 2);
        assert_eq!(lines[1], "/err");
    }

    #[test]
    fn test_indexing_view_shows_gauge() {
        let lines = screen(
            &view(WindowPhase::Indexing { percent: 42 }, Vec::new()),
            &ColorTheme::default(),
            40,
            6,
        );
        assert!(lines.iter().any(|line| line.contains("Indexing big.log")));
        assert!(lines.iter().any(|line| line.contains("42%")));
    }

    #[test]
    fn test_highlight_spans() {
        let theme = ColorTheme::monochrome();
        let highlighted = ViewRow {
            line_number: 0,
            text: Some("an error here".to_string()),
            highlights: vec![(3, 8)],
        };
        let line = row_line(&highlighted, None, &theme);

        let parts: Vec<&str> = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(parts, vec!["an ", "error", " here"]);
        assert_eq!(line.spans[1].style, theme.search_match);
    }
}
