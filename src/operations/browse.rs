use super::add::{clean_category, clean_note, create_transaction, parse_amount, parse_kind};
use super::edit::{TransactionEdit, edit_transaction};
use super::remove::remove_transaction;
use super::terminal::{centered_rect, draw_error, input_error, run_fullscreen};
use super::text::format_amount;
use crate::db::SharedStore;
use crate::db::watcher::FileWatcher;
use crate::error::{AppError, Result};
use crate::models::log::TransactionLog;
use crate::models::transaction::{Transaction, TransactionKind};
use chrono::{Local, NaiveDate};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    prelude::{Alignment, Color, Constraint, Direction, Layout, Rect, Style},
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use rust_decimal::Decimal;
use std::cmp::{max, min};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SortOrder {
    Oldest,
    Newest,
}

impl SortOrder {
    fn toggle(self) -> Self {
        match self {
            SortOrder::Oldest => SortOrder::Newest,
            SortOrder::Newest => SortOrder::Oldest,
        }
    }

    fn label(self) -> &'static str {
        match self {
            SortOrder::Oldest => "time ↑",
            SortOrder::Newest => "time ↓",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    List,
    Details,
    Input(InputKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputKind {
    New,
    Edit(u64),
    Date,
}

/// A `kind,amount,category,note` line typed into the input modal.
#[derive(Debug, Clone, PartialEq)]
struct Entry {
    kind: TransactionKind,
    amount: Decimal,
    category: String,
    note: String,
}

/// Parses one CSV record. Fields containing commas must be quoted, which is
/// how [`entry_line`] writes them.
fn parse_entry(input: &str) -> Result<Entry> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());
    let record = match reader.records().next() {
        Some(record) => record?,
        None => csv::StringRecord::new(),
    };
    if record.len() < 2 || record.len() > 4 {
        return Err(AppError::Validation(
            "Expected kind,amount[,category[,note]]. Quote fields that contain commas.".to_string(),
        ));
    }
    let field = |i: usize| record.get(i).unwrap_or("");
    Ok(Entry {
        kind: parse_kind(field(0))?,
        amount: parse_amount(field(1))?,
        category: clean_category(field(2))?,
        note: clean_note(field(3))?,
    })
}

fn entry_line(tx: &Transaction) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    let amount = tx.amount.to_string();
    writer.write_record([tx.kind.as_str(), amount.as_str(), tx.category.as_str(), tx.note.as_str()])?;
    let bytes = writer.into_inner().map_err(|e| AppError::Io(e.into_error()))?;
    let line = String::from_utf8(bytes)
        .map_err(|e| AppError::Validation(format!("Entry is not valid UTF-8: {}", e)))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

struct BrowseState {
    mode: Mode,

    log: TransactionLog,
    /// Ids of the rows on screen, in display order.
    visible: Vec<u64>,

    table_state: TableState,

    filter_date: Option<NaiveDate>,
    sort_order: SortOrder,

    input_buffer: String,
    input_error: Option<String>,
    status: Option<String>,

    last_page_size: usize,
}

impl BrowseState {
    fn new(log: TransactionLog) -> Self {
        let mut state = Self {
            mode: Mode::List,
            log,
            visible: Vec::new(),
            table_state: TableState::default(),
            filter_date: None,
            sort_order: SortOrder::Oldest,
            input_buffer: String::new(),
            input_error: None,
            status: None,
            last_page_size: 10,
        };
        state.recompute();
        state
    }

    fn selected_id(&self) -> Option<u64> {
        let selected = self.table_state.selected()?;
        self.visible.get(selected).copied()
    }

    fn selected_transaction(&self) -> Option<&Transaction> {
        self.log.get(self.selected_id()?)
    }

    fn recompute(&mut self) {
        let keep_id = self.selected_id();

        let mut rows: Vec<&Transaction> = self
            .log
            .transactions
            .iter()
            .filter(|t| self.filter_date.is_none_or(|d| t.local_date() == d))
            .collect();
        match self.sort_order {
            SortOrder::Oldest => rows.sort_by_key(|t| (t.timestamp, t.id)),
            SortOrder::Newest => rows.sort_by_key(|t| std::cmp::Reverse((t.timestamp, t.id))),
        }
        self.visible = rows.iter().map(|t| t.id).collect();

        if self.visible.is_empty() {
            self.table_state.select(None);
            return;
        }
        let new_selected = match keep_id.and_then(|id| self.visible.iter().position(|v| *v == id)) {
            Some(pos) => pos,
            None => min(
                self.table_state.selected().unwrap_or(0),
                self.visible.len().saturating_sub(1),
            ),
        };
        self.table_state.select(Some(new_selected));
    }

    fn move_selection(&mut self, delta: i32) {
        if self.visible.is_empty() {
            self.table_state.select(None);
            return;
        }

        let current = self.table_state.selected().unwrap_or(0) as i32;
        let max_index = self.visible.len().saturating_sub(1) as i32;
        let next = (current + delta).clamp(0, max_index) as usize;
        self.table_state.select(Some(next));
    }

    fn page_up(&mut self) {
        let page = max(1, self.last_page_size) as i32;
        self.move_selection(-page);
    }

    fn page_down(&mut self) {
        let page = max(1, self.last_page_size) as i32;
        self.move_selection(page);
    }

    fn replace_log(&mut self, log: TransactionLog) {
        self.log = log;
        self.recompute();
    }

    fn reload(&mut self, store: &SharedStore) {
        match store.load() {
            Ok(log) => self.replace_log(log),
            Err(e) => {
                warn!(error = %e, "reload failed");
                self.status = Some(format!("Reload failed: {}", e));
            }
        }
    }

    /// Steps the date filter through the dates that have transactions:
    /// all, then each date in order, then back to all.
    fn cycle_date_filter(&mut self) {
        let dates = self.log.available_dates();
        self.filter_date = match self.filter_date {
            None => dates.first().copied(),
            Some(current) => dates.into_iter().find(|d| *d > current),
        };
        self.recompute();
    }

    fn start_input(&mut self, kind: InputKind) {
        self.input_error = None;
        self.input_buffer = match kind {
            InputKind::New => String::new(),
            InputKind::Edit(id) => match self.log.get(id).map(entry_line).transpose() {
                Ok(line) => line.unwrap_or_default(),
                Err(e) => {
                    self.input_error = Some(e.to_string());
                    String::new()
                }
            },
            InputKind::Date => self
                .filter_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        };
        self.mode = Mode::Input(kind);
    }

    fn cancel_input(&mut self) {
        self.input_error = None;
        self.mode = Mode::List;
    }

    fn commit_input(&mut self, store: &SharedStore, kind: InputKind) {
        let raw = self.input_buffer.trim().to_string();
        let result = match kind {
            InputKind::Date => self.apply_date_filter(&raw),
            InputKind::New => parse_entry(&raw).and_then(|entry| {
                let now = Local::now().timestamp();
                store.update(|log| {
                    create_transaction(log, entry.kind, entry.amount, &entry.category, &entry.note, now)
                        .map(|_| ())
                })
            }),
            InputKind::Edit(id) => parse_entry(&raw).and_then(|entry| {
                let edit = TransactionEdit {
                    kind: Some(entry.kind),
                    amount: Some(entry.amount),
                    category: Some(entry.category),
                    note: Some(entry.note),
                };
                store.update(|log| edit_transaction(log, id, edit))
            }),
        };

        match result {
            Ok(()) => {
                self.input_error = None;
                self.mode = Mode::List;
                if kind != InputKind::Date {
                    self.reload(store);
                }
            }
            Err(e) => self.input_error = Some(e.to_string()),
        }
    }

    fn apply_date_filter(&mut self, raw: &str) -> Result<()> {
        self.filter_date = if raw.is_empty() {
            None
        } else {
            Some(NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                AppError::Validation(format!("Invalid date '{}'. Use YYYY-MM-DD.", raw))
            })?)
        };
        self.recompute();
        Ok(())
    }

    fn delete_selected(&mut self, store: &SharedStore) {
        let Some(id) = self.selected_id() else {
            self.status = Some("Select a transaction first".to_string());
            return;
        };
        match store.update(|log| remove_transaction(log, id).map(|_| ())) {
            Ok(()) => {
                self.status = Some(format!("Deleted transaction {}", id));
                self.reload(store);
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }
}

pub fn run_browse(store: &SharedStore, poll_interval: Duration) -> Result<()> {
    let mut state = BrowseState::new(store.load()?);
    let mut watcher = FileWatcher::new(store);

    run_fullscreen(|terminal| {
        loop {
            terminal
                .draw(|frame| {
                    let size = frame.area();
                    let layout = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([
                            Constraint::Length(3),
                            Constraint::Min(5),
                            Constraint::Length(3),
                        ])
                        .split(size);

                    render_header(frame, layout[0], &state);
                    render_table(frame, layout[1], &mut state);
                    render_footer(frame, layout[2], &state);

                    if let Mode::Input(kind) = state.mode {
                        render_input_modal(frame, size, &state, kind);
                    }

                    if state.mode == Mode::Details {
                        render_details_modal(frame, size, &state);
                    }
                })
                .map_err(draw_error)?;

            if event::poll(poll_interval).map_err(input_error)? {
                if let Event::Key(key) = event::read().map_err(input_error)? {
                    if handle_key(store, &mut state, key) {
                        break;
                    }
                }
            }

            if watcher.poll(store) {
                state.reload(store);
            }
        }
        Ok(())
    })
}

fn handle_key(store: &SharedStore, state: &mut BrowseState, key: KeyEvent) -> bool {
    // Many terminals emit both a Press and a Release event. Only act on Press/Repeat.
    if key.kind == KeyEventKind::Release {
        return false;
    }

    match state.mode {
        Mode::List => {
            state.status = None;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return true,
                KeyCode::Up => state.move_selection(-1),
                KeyCode::Down => state.move_selection(1),
                KeyCode::PageUp => state.page_up(),
                KeyCode::PageDown => state.page_down(),
                KeyCode::Home => state.move_selection(i32::MIN / 2),
                KeyCode::End => state.move_selection(i32::MAX / 2),
                KeyCode::Enter => {
                    if state.selected_id().is_some() {
                        state.mode = Mode::Details;
                    }
                }
                KeyCode::Char('n') => state.start_input(InputKind::New),
                KeyCode::Char('e') => {
                    if let Some(id) = state.selected_id() {
                        state.start_input(InputKind::Edit(id));
                    }
                }
                KeyCode::Char('x') | KeyCode::Delete => state.delete_selected(store),
                KeyCode::Char('d') => state.cycle_date_filter(),
                KeyCode::Char('D') => state.start_input(InputKind::Date),
                KeyCode::Char('a') => {
                    state.filter_date = None;
                    state.recompute();
                }
                KeyCode::Char('s') => {
                    state.sort_order = state.sort_order.toggle();
                    state.recompute();
                }
                KeyCode::Char('r') => state.reload(store),
                _ => {}
            }
        }
        Mode::Details => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('b') => state.mode = Mode::List,
            _ => {}
        },
        Mode::Input(kind) => {
            // Allow Ctrl+C / Ctrl+Q to cancel
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q'))
            {
                state.cancel_input();
                return false;
            }

            match key.code {
                KeyCode::Esc => state.cancel_input(),
                KeyCode::Enter => state.commit_input(store, kind),
                KeyCode::Backspace => {
                    state.input_buffer.pop();
                }
                KeyCode::Char(ch) => state.input_buffer.push(ch),
                _ => {}
            }
        }
    }

    false
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let date = state
        .filter_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "(all)".to_string());

    let line = Line::from(vec![
        Span::styled("Transactions", Style::default().fg(Color::Cyan).bold()),
        Span::raw("  "),
        Span::styled(format!("Sort: {}", state.sort_order.label()), Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::raw(format!("Date: {}", date)),
        Span::raw("  |  "),
        Span::raw(format!("Rows: {}", state.visible.len())),
    ]);

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(Paragraph::new(line).block(block).alignment(Alignment::Left), area);
}

fn render_footer(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let block = Block::default().borders(Borders::ALL);
    if let Some(ref status) = state.status {
        frame.render_widget(
            Paragraph::new(Span::styled(status.clone(), Style::default().fg(Color::Yellow))).block(block),
            area,
        );
        return;
    }

    let hint = match state.mode {
        Mode::List => "↑/↓ move  Enter details  n new  e edit  x delete  d next date  D pick date  a all dates  s sort  r reload  q/Esc exit",
        Mode::Details => "Esc/q/b back",
        Mode::Input(_) => "Type, Enter apply, Esc cancel",
    };

    frame.render_widget(
        Paragraph::new(hint)
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_table(frame: &mut ratatui::Frame, area: Rect, state: &mut BrowseState) {
    let block = Block::default().title("History").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let header = Row::new([
        Cell::from("Id").style(Style::default().bold()),
        Cell::from("Date").style(Style::default().bold()),
        Cell::from("Time").style(Style::default().bold()),
        Cell::from("Kind").style(Style::default().bold()),
        Cell::from("Amount").style(Style::default().bold()),
        Cell::from("Category").style(Style::default().bold()),
        Cell::from("Note").style(Style::default().bold()),
    ])
    .style(Style::default().fg(Color::White));

    let rows = state
        .visible
        .iter()
        .filter_map(|id| state.log.get(*id))
        .map(|tx| {
            let mut note = tx.note.clone();
            if note.chars().count() > 42 {
                note = note.chars().take(39).collect();
                note.push_str("...");
            }
            let color = match tx.kind {
                TransactionKind::Income => Color::Green,
                TransactionKind::Expense => Color::Red,
            };

            Row::new([
                Cell::from(tx.id.to_string()),
                Cell::from(tx.local_date().format("%Y-%m-%d").to_string()),
                Cell::from(tx.local_time().format("%H:%M:%S").to_string()),
                Cell::from(tx.kind.as_str()).style(Style::default().fg(color)),
                Cell::from(format_amount(tx.amount)),
                Cell::from(tx.category.clone()),
                Cell::from(note),
            ])
        });

    // Leave room for the header row.
    state.last_page_size = max(1, inner.height.saturating_sub(2) as usize);

    let widths = [
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(14),
        Constraint::Length(16),
        Constraint::Percentage(40),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White).bold())
        .highlight_symbol("➤ ")
        .column_spacing(1);

    frame.render_stateful_widget(table, inner, &mut state.table_state);

    if state.visible.is_empty() {
        let empty = Paragraph::new("No transactions match the current filter")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
    }
}

fn render_input_modal(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState, kind: InputKind) {
    let popup_area = centered_rect(80, 40, area);
    frame.render_widget(Clear, popup_area);

    let title = match kind {
        InputKind::New => "New Transaction".to_string(),
        InputKind::Edit(id) => format!("Edit Transaction {}", id),
        InputKind::Date => "Filter Date".to_string(),
    };

    let help = match kind {
        InputKind::New | InputKind::Edit(_) => "kind,amount,category,note  (kind is income or expense; quote fields containing commas)".to_string(),
        InputKind::Date => "Enter a date like 2025-01-31 (empty shows all)".to_string(),
    };

    let mut lines = vec![
        Line::from(vec![Span::styled(title, Style::default().bold())]),
        Line::from(help),
    ];

    if kind != InputKind::Date {
        let catalog = state.log.category_catalog();
        if !catalog.is_empty() {
            lines.push(Line::from(Span::styled(
                format!("Categories: {}", catalog.join(", ")),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![Span::styled(
        format!("> {}", state.input_buffer),
        Style::default().fg(Color::Yellow),
    )]));

    if let Some(ref err) = state.input_error {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![Span::styled(err.clone(), Style::default().fg(Color::Red))]));
    }

    let block = Block::default().borders(Borders::ALL).title("Input");
    let paragraph = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, popup_area);
}

fn render_details_modal(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let popup_area = centered_rect(90, 60, area);
    frame.render_widget(Clear, popup_area);

    let Some(tx) = state.selected_transaction() else {
        frame.render_widget(
            Paragraph::new("No selection")
                .block(Block::default().borders(Borders::ALL).title("Details"))
                .alignment(Alignment::Center),
            popup_area,
        );
        return;
    };

    let lines = vec![
        Line::from(vec![Span::styled(
            "Transaction Details",
            Style::default().fg(Color::Cyan).bold(),
        )]),
        Line::from(""),
        Line::from(format!("Id: {}", tx.id)),
        Line::from(format!("Recorded: {}", tx.local_datetime().format("%Y-%m-%d %H:%M:%S"))),
        Line::from(format!("Kind: {}", tx.kind)),
        Line::from(format!("Category: {}", tx.category)),
        Line::from(format!("Amount: {}", format_amount(tx.amount))),
        Line::from(""),
        Line::from("Note:"),
        Line::from(tx.note.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "Esc/q/b to go back",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default().borders(Borders::ALL).title("Details");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}
