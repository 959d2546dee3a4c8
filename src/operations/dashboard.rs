use super::summary::{
    CategoryBreakdown, CategoryShare, Series, Summary, ViewMode, category_breakdown, monthly_series,
    weekly_series,
};
use super::terminal::{draw_error, input_error, run_fullscreen};
use super::text::format_amount;
use crate::db::SharedStore;
use crate::db::watcher::FileWatcher;
use crate::error::Result;
use crate::models::log::TransactionLog;
use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    prelude::{Alignment, Color, Constraint, Direction, Layout, Rect, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
};
use ratatui::style::Stylize;
use ratatui::widgets::canvas::{Canvas, Points};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

const PALETTE: [Color; 11] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Green,
    Color::Blue,
    Color::Red,
    Color::LightCyan,
    Color::LightMagenta,
    Color::LightYellow,
    Color::LightGreen,
    Color::LightBlue,
];
const INCOME_COLOR: Color = Color::Green;
const EXPENSE_COLOR: Color = Color::Red;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Reload,
    Quit,
}

struct DashboardState {
    log: TransactionLog,
    today: NaiveDate,
    reference: NaiveDate,
    mode: ViewMode,
    status: Option<String>,
}

impl DashboardState {
    fn new(log: TransactionLog, today: NaiveDate, mode: ViewMode) -> Self {
        Self {
            log,
            today,
            reference: today,
            mode,
            status: None,
        }
    }

    fn reload(&mut self, store: &SharedStore) {
        match store.load() {
            Ok(log) => {
                self.log = log;
                self.status = None;
            }
            Err(e) => {
                warn!(error = %e, "reload failed");
                self.status = Some(format!("Reload failed: {}", e));
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.kind == KeyEventKind::Release {
            return KeyOutcome::Continue;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return KeyOutcome::Quit,
            KeyCode::Char('r') => return KeyOutcome::Reload,
            KeyCode::Char('w') => self.mode = ViewMode::Weekly,
            KeyCode::Char('m') => self.mode = ViewMode::Monthly,
            KeyCode::Tab => self.mode = self.mode.toggle(),
            KeyCode::Left => self.reference = self.mode.shift(self.reference, false),
            KeyCode::Right => self.reference = self.mode.shift(self.reference, true),
            KeyCode::Char('t') => self.reference = self.today,
            _ => {}
        }
        KeyOutcome::Continue
    }
}

pub fn run_dashboard(store: &SharedStore, mode: ViewMode, poll_interval: Duration) -> Result<()> {
    let today = Local::now().date_naive();
    let mut state = DashboardState::new(store.load()?, today, mode);
    let mut watcher = FileWatcher::new(store);

    run_fullscreen(|terminal| {
        loop {
            terminal
                .draw(|frame| render(frame, &state))
                .map_err(draw_error)?;

            if event::poll(poll_interval).map_err(input_error)? {
                match event::read().map_err(input_error)? {
                    Event::Key(key) => match state.handle_key(key) {
                        KeyOutcome::Quit => break,
                        KeyOutcome::Reload => state.reload(store),
                        KeyOutcome::Continue => {}
                    },
                    Event::Resize(_, _) => continue,
                    _ => {}
                }
            }

            state.today = Local::now().date_naive();
            if watcher.poll(store) {
                state.reload(store);
            }
        }
        Ok(())
    })
}

fn render(frame: &mut ratatui::Frame, state: &DashboardState) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_summary(frame, layout[0], state);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(layout[1]);

    let transactions = &state.log.transactions;
    match state.mode {
        ViewMode::Weekly => {
            render_bar_chart(frame, body[0], "Weekly", &weekly_series(transactions, state.reference))
        }
        ViewMode::Monthly => {
            render_bar_chart(frame, body[0], "Monthly", &monthly_series(transactions, state.reference))
        }
    }

    let breakdown = category_breakdown(&state.log.transactions, state.reference, state.mode);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(body[1]);
    render_pie_chart(frame, right[0], &breakdown);
    render_category_table(frame, right[1], &breakdown);

    render_footer(frame, layout[2], state);
}

fn render_summary(frame: &mut ratatui::Frame, area: Rect, state: &DashboardState) {
    let summary = Summary::compute(&state.log.transactions, state.today);
    let line = Line::from(vec![
        Span::styled("Cash Tracker", Style::default().fg(Color::Cyan).bold()),
        Span::raw("  |  "),
        Span::raw(format!("Balance: {}", format_amount(summary.balance))),
        Span::raw("  |  "),
        Span::raw(format!("Spent this month: {}", format_amount(summary.month_expense))),
        Span::raw("  |  "),
        Span::raw(format!("Spent today: {}", format_amount(summary.day_expense))),
    ]);
    let block = Block::default()
        .title(state.reference.format("%B %Y").to_string())
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(line).block(block).alignment(Alignment::Left), area);
}

fn to_bar_value(amount: Decimal) -> u64 {
    amount.round().to_u64().unwrap_or(0)
}

fn render_bar_chart<const N: usize>(frame: &mut ratatui::Frame, area: Rect, title: &str, series: &Series<N>) {
    let block = Block::default()
        .title(Line::from(vec![
            Span::styled(format!("{} ", title), Style::default().fg(Color::White).bold()),
            Span::raw(format!(
                "{} .. {}  ",
                series.window.start.format("%d.%m.%Y"),
                series.window.end.format("%d.%m.%Y")
            )),
            Span::styled("income ", Style::default().fg(INCOME_COLOR)),
            Span::styled("expense", Style::default().fg(EXPENSE_COLOR)),
        ]))
        .borders(Borders::ALL);

    let inner_width = block.inner(area).width;
    // Two bars per group plus one column of spacing.
    let bar_width = (inner_width / (N as u16 * 2 + N as u16)).max(1);

    let mut chart = BarChart::default()
        .block(block)
        .bar_width(bar_width)
        .bar_gap(0)
        .group_gap(bar_width);

    for (label, income, expense) in series.rows() {
        let group = BarGroup::default().label(Line::from(label)).bars(&[
            Bar::default()
                .value(to_bar_value(income))
                .text_value(String::new())
                .style(Style::default().fg(INCOME_COLOR)),
            Bar::default()
                .value(to_bar_value(expense))
                .text_value(String::new())
                .style(Style::default().fg(EXPENSE_COLOR)),
        ]);
        chart = chart.data(group);
    }

    frame.render_widget(chart, area);
}

fn assign_colors(shares: &[CategoryShare]) -> HashMap<String, Color> {
    let mut map = HashMap::new();
    for (idx, share) in shares.iter().enumerate() {
        map.insert(share.category.clone(), PALETTE[idx % PALETTE.len()]);
    }
    map
}

/// Start and end angle of each slice, in radians, in share order.
fn pie_slices(shares: &[CategoryShare]) -> Vec<(f64, f64, String)> {
    let mut slices = Vec::new();
    let mut start_angle = 0.0_f64;
    for share in shares {
        let ratio = share.percent.to_f64().unwrap_or(0.0) / 100.0;
        let sweep = ratio * std::f64::consts::TAU;
        slices.push((start_angle, start_angle + sweep, share.category.clone()));
        start_angle += sweep;
    }
    slices
}

fn render_pie_chart(frame: &mut ratatui::Frame, area: Rect, breakdown: &CategoryBreakdown) {
    let block = Block::default().title("Expense Categories").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let shares = match breakdown {
        CategoryBreakdown::NoData => {
            frame.render_widget(Paragraph::new("No data").alignment(Alignment::Center), inner);
            return;
        }
        CategoryBreakdown::Shares(shares) => shares,
    };

    let colors = assign_colors(shares);
    let slices = pie_slices(shares);
    let canvas = Canvas::default()
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(|ctx| {
            let step = 0.04;
            for (start, end, category) in &slices {
                let color = colors.get(category).copied().unwrap_or(Color::White);
                let mut points = Vec::new();
                let mut r = 0.0;
                while r <= 1.0 {
                    let mut angle = *start;
                    while angle <= *end {
                        points.push((r * angle.cos(), r * angle.sin()));
                        angle += 0.05;
                    }
                    r += step;
                }
                if !points.is_empty() {
                    ctx.draw(&Points { coords: &points, color });
                }
            }
        });

    frame.render_widget(canvas, inner);
}

fn render_category_table(frame: &mut ratatui::Frame, area: Rect, breakdown: &CategoryBreakdown) {
    let block = Block::default().title("Category Spend").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let shares = breakdown.shares();
    if shares.is_empty() {
        frame.render_widget(Paragraph::new("No data").alignment(Alignment::Center), inner);
        return;
    }

    let colors = assign_colors(shares);
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{:15}", "Category"), Style::default().fg(Color::White).bold()),
        Span::raw("  "),
        Span::styled(format!("{:>12}", "Amount"), Style::default().fg(Color::White).bold()),
        Span::raw("  "),
        Span::styled(format!("{:>6}", "Share"), Style::default().fg(Color::White).bold()),
    ])];

    for share in shares {
        let color = colors.get(&share.category).copied().unwrap_or(Color::White);
        let name = if share.category.is_empty() { "(none)" } else { share.category.as_str() };
        lines.push(Line::from(vec![
            Span::styled(format!("{:15}", name), Style::default().fg(color)),
            Span::raw("  "),
            Span::styled(format!("{:>12}", format_amount(share.total)), Style::default().fg(color)),
            Span::raw("  "),
            Span::styled(format!("{:>6}", share.percent_label()), Style::default().fg(color)),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Left), inner);
}

fn render_footer(frame: &mut ratatui::Frame, area: Rect, state: &DashboardState) {
    let text = match state.status {
        Some(ref status) => Line::from(Span::styled(status.clone(), Style::default().fg(Color::Red))),
        None => Line::from(format!(
            "[{}]  w weekly  m monthly  Tab switch  ←/→ move  t today  r reload  q/Esc exit",
            state.mode
        )),
    };
    frame.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        area,
    );
}
