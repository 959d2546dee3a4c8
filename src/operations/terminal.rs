use crate::error::{AppError, Result};
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use std::io::{self, Stdout};

pub type Term = Terminal<CrosstermBackend<Stdout>>;

fn terminal_error(what: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Terminal(format!("Failed to {}: {}", what, e))
}

/// Runs `body` on the alternate screen in raw mode and restores the terminal
/// afterwards, whether or not `body` succeeded.
pub fn run_fullscreen<F>(body: F) -> Result<()>
where
    F: FnOnce(&mut Term) -> Result<()>,
{
    enable_raw_mode().map_err(|e| terminal_error("enable raw mode", e))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).map_err(|e| terminal_error("enter alternate screen", e))?;

    let result = Terminal::new(CrosstermBackend::new(stdout))
        .map_err(|e| terminal_error("initialize terminal", e))
        .and_then(|mut terminal| body(&mut terminal));

    disable_raw_mode().map_err(|e| terminal_error("disable raw mode", e))?;
    execute!(io::stdout(), LeaveAlternateScreen)
        .map_err(|e| terminal_error("leave alternate screen", e))?;

    result
}

pub fn draw_error(e: io::Error) -> AppError {
    terminal_error("draw terminal UI", e)
}

pub fn input_error(e: io::Error) -> AppError {
    terminal_error("read input", e)
}

pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
