// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use neighbors_app::{
    CompletionEffect, CompletionSink, LabelStyle, NeighborId, NeighborState, NeighborTable,
    PageCommand, PageEvent, PageState, Persistence, RowActionController, STATE_CHANGE_FAILED,
    SortDirection, ToggleCompletion, TriggerOutcome,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table};
use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const HALF_PAGE_ROWS: isize = 10;
const STATUS_CLEAR_DELAY: Duration = Duration::from_secs(4);
const SAVING_MARK: &str = "(saving…)";
const DEFAULT_HINT: &str = "enter/i toggle | f ignored | s sort | ? help | q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Netbox,
    Interface,
    RemoteId,
    RemoteName,
    Source,
    Since,
    IgnoredSince,
    Action,
}

impl Column {
    const ALL: [Self; 8] = [
        Self::Netbox,
        Self::Interface,
        Self::RemoteId,
        Self::RemoteName,
        Self::Source,
        Self::Since,
        Self::IgnoredSince,
        Self::Action,
    ];

    const fn label(self) -> &'static str {
        match self {
            Self::Netbox => "Device",
            Self::Interface => "Interface",
            Self::RemoteId => "Remote id",
            Self::RemoteName => "Remote name",
            Self::Source => "Source",
            Self::Since => "Seen since",
            Self::IgnoredSince => "Ignored since",
            Self::Action => "Action",
        }
    }

    const fn width(self) -> Constraint {
        match self {
            Self::Netbox => Constraint::Length(22),
            Self::Interface => Constraint::Length(11),
            Self::RemoteId => Constraint::Length(20),
            Self::RemoteName => Constraint::Length(18),
            Self::Source => Constraint::Length(6),
            Self::Since | Self::IgnoredSince => Constraint::Length(16),
            Self::Action => Constraint::Min(12),
        }
    }

    fn sort_key(self, row: &RowActionController) -> String {
        let details = row.details();
        match self {
            Self::Netbox => details.netbox.to_lowercase(),
            Self::Interface => details.interface.to_lowercase(),
            Self::RemoteId => details.remote_id.to_lowercase(),
            Self::RemoteName => details.remote_name.to_lowercase(),
            Self::Source => details.source.as_str().to_owned(),
            Self::Since => details.since.clone(),
            Self::IgnoredSince => row.display().ignored_since.clone(),
            Self::Action => row.state().as_str().to_owned(),
        }
    }

    fn cell_text(self, row: &RowActionController) -> String {
        let details = row.details();
        match self {
            Self::Netbox => details.netbox.clone(),
            Self::Interface => details.interface.clone(),
            Self::RemoteId => details.remote_id.clone(),
            Self::RemoteName => details.remote_name.clone(),
            Self::Source => details.source.label().to_owned(),
            Self::Since => details.since.clone(),
            Self::IgnoredSince => row.display().ignored_since.clone(),
            Self::Action => action_cell_text(row),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SortSpec {
    column: Column,
    direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableCommand {
    MoveRow(isize),
    MoveColumn(isize),
    MoveHalfPageDown,
    MoveHalfPageUp,
    JumpFirstRow,
    JumpLastRow,
    CycleSort,
    ClearSort,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct ViewData {
    selected: Option<NeighborId>,
    selected_index: usize,
    selected_col: usize,
    sort: Option<SortSpec>,
    status_token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
    Toggle(ToggleCompletion),
}

pub fn run_app<P>(
    page: &mut PageState,
    table: &mut NeighborTable,
    persistence: &mut P,
) -> Result<()>
where
    P: Persistence + ?Sized,
{
    if !table.is_initialized() {
        table.initialize().context("initialize neighbor table")?;
    }

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (internal_tx, internal_rx) = mpsc::channel();
    let sink = completion_sink(&internal_tx);
    let mut view_data = ViewData::default();
    sync_selection(page, table, &mut view_data);

    let mut result = Ok(());
    loop {
        process_internal_events(page, table, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, page, table, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = match event::poll(Duration::from_millis(120)).context("poll event") {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read().context("read event") {
            Ok(Event::Key(key)) => {
                if handle_key_event(
                    page,
                    table,
                    &mut view_data,
                    persistence,
                    &sink,
                    &internal_tx,
                    key,
                ) {
                    break;
                }
            }
            Ok(_) => {}
            Err(error) => {
                result = Err(error);
                break;
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    if table.pending_count() > 0 {
        tracing::info!(
            pending = table.pending_count(),
            "exiting with toggle requests still in flight"
        );
    }
    result
}

fn completion_sink(internal_tx: &Sender<InternalEvent>) -> CompletionSink {
    let tx = internal_tx.clone();
    CompletionSink::new(move |completion| {
        if tx.send(InternalEvent::Toggle(completion)).is_err() {
            tracing::debug!("ui loop closed before toggle completed");
        }
    })
}

fn process_internal_events(
    page: &mut PageState,
    table: &mut NeighborTable,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                page.dispatch(PageCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::Toggle(completion) => {
                apply_completion(page, table, view_data, tx, completion);
            }
        }
    }
}

fn apply_completion(
    page: &mut PageState,
    table: &mut NeighborTable,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    completion: ToggleCompletion,
) {
    let id = completion.neighbor_id;
    match table.complete(completion) {
        Ok(CompletionEffect::Committed(state)) => {
            let verb = match state {
                NeighborState::Active => "unignored",
                NeighborState::Ignored => "ignored",
            };
            let message = format!("{} {verb}", neighbor_label(table, id));
            emit_status(page, view_data, tx, message);
            sync_selection(page, table, view_data);
        }
        Ok(CompletionEffect::Failed) => {
            let message = format!("{STATE_CHANGE_FAILED}: {}", neighbor_label(table, id));
            emit_status(page, view_data, tx, message);
        }
        Ok(CompletionEffect::Stale) => {}
        Err(error) => {
            tracing::warn!(neighbor_id = id.get(), error = %error, "completion dropped");
        }
    }
}

fn neighbor_label(table: &NeighborTable, id: NeighborId) -> String {
    let Some(row) = table.row(id) else {
        return format!("neighbor {id}");
    };
    let details = row.details();
    let remote = if !details.remote_name.is_empty() {
        details.remote_name.as_str()
    } else if !details.remote_id.is_empty() {
        details.remote_id.as_str()
    } else {
        return format!("neighbor {id} on {} {}", details.netbox, details.interface);
    };
    format!("{remote} on {} {}", details.netbox, details.interface)
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_CLEAR_DELAY);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    page: &mut PageState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    let events = page.dispatch(PageCommand::SetStatus(message.into()));
    note_status_events(view_data, internal_tx, &events);
}

fn note_status_events(
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: &[PageEvent],
) {
    if events
        .iter()
        .any(|event| matches!(event, PageEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn handle_key_event<P>(
    page: &mut PageState,
    table: &mut NeighborTable,
    view_data: &mut ViewData,
    persistence: &mut P,
    sink: &CompletionSink,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool
where
    P: Persistence + ?Sized,
{
    if key.kind == KeyEventKind::Release {
        return false;
    }

    if page.help_visible {
        page.dispatch(PageCommand::HideHelp);
        return false;
    }

    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Esc, _) => return true,
        (KeyCode::Char('c'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            return true;
        }
        (KeyCode::Char('?'), _) => {
            page.dispatch(PageCommand::ShowHelp);
        }
        (KeyCode::Enter, _) | (KeyCode::Char('i'), KeyModifiers::NONE) | (KeyCode::Char(' '), _) => {
            trigger_selected(page, table, view_data, persistence, sink, internal_tx);
        }
        (KeyCode::Char('f'), KeyModifiers::NONE) => {
            let events = page.dispatch(PageCommand::ToggleIgnoredVisibility);
            note_status_events(view_data, internal_tx, &events);
            sync_selection(page, table, view_data);
        }
        _ => {
            if let Some(command) = table_command_for_key(key)
                && let Some(message) = apply_table_command(page, table, view_data, command)
            {
                emit_status(page, view_data, internal_tx, message);
            }
        }
    }
    false
}

// Single entry point for every row's control: resolve the selected row by id
// and hand the trigger to its controller.
fn trigger_selected<P>(
    page: &mut PageState,
    table: &mut NeighborTable,
    view_data: &mut ViewData,
    persistence: &mut P,
    sink: &CompletionSink,
    internal_tx: &Sender<InternalEvent>,
) where
    P: Persistence + ?Sized,
{
    sync_selection(page, table, view_data);
    let Some(id) = view_data.selected else {
        emit_status(page, view_data, internal_tx, "no neighbor selected");
        return;
    };

    match table.trigger(id, persistence, sink) {
        Ok(TriggerOutcome::Submitted(request)) => {
            let verb = if request.ignored {
                "ignoring"
            } else {
                "unignoring"
            };
            let message = format!("{verb} {}", neighbor_label(table, id));
            emit_status(page, view_data, internal_tx, message);
        }
        Ok(TriggerOutcome::Ignored) => {}
        Err(error) => emit_status(page, view_data, internal_tx, error.to_string()),
    }
}

fn table_command_for_key(key: KeyEvent) -> Option<TableCommand> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('j'), KeyModifiers::NONE) | (KeyCode::Down, _) => {
            Some(TableCommand::MoveRow(1))
        }
        (KeyCode::Char('k'), KeyModifiers::NONE) | (KeyCode::Up, _) => {
            Some(TableCommand::MoveRow(-1))
        }
        (KeyCode::Char('h'), KeyModifiers::NONE) | (KeyCode::Left, _) => {
            Some(TableCommand::MoveColumn(-1))
        }
        (KeyCode::Char('l'), KeyModifiers::NONE) | (KeyCode::Right, _) => {
            Some(TableCommand::MoveColumn(1))
        }
        (KeyCode::Char('d'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(TableCommand::MoveHalfPageDown)
        }
        (KeyCode::Char('u'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
            Some(TableCommand::MoveHalfPageUp)
        }
        (KeyCode::PageDown, _) => Some(TableCommand::MoveHalfPageDown),
        (KeyCode::PageUp, _) => Some(TableCommand::MoveHalfPageUp),
        (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(TableCommand::JumpFirstRow),
        (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(TableCommand::JumpLastRow),
        (KeyCode::Char('s'), KeyModifiers::NONE) => Some(TableCommand::CycleSort),
        (KeyCode::Char('S'), _) => Some(TableCommand::ClearSort),
        _ => None,
    }
}

fn apply_table_command(
    page: &PageState,
    table: &NeighborTable,
    view_data: &mut ViewData,
    command: TableCommand,
) -> Option<String> {
    match command {
        TableCommand::MoveRow(delta) => {
            move_row(page, table, view_data, delta);
            None
        }
        TableCommand::MoveColumn(delta) => {
            let last = Column::ALL.len().saturating_sub(1);
            let next = if delta.is_negative() {
                view_data.selected_col.saturating_sub(delta.unsigned_abs())
            } else {
                view_data.selected_col.saturating_add(delta as usize)
            };
            view_data.selected_col = next.min(last);
            None
        }
        TableCommand::MoveHalfPageDown => {
            move_row(page, table, view_data, HALF_PAGE_ROWS);
            None
        }
        TableCommand::MoveHalfPageUp => {
            move_row(page, table, view_data, -HALF_PAGE_ROWS);
            None
        }
        TableCommand::JumpFirstRow => {
            move_row(page, table, view_data, isize::MIN);
            None
        }
        TableCommand::JumpLastRow => {
            move_row(page, table, view_data, isize::MAX);
            None
        }
        TableCommand::CycleSort => Some(cycle_sort(page, table, view_data)),
        TableCommand::ClearSort => {
            view_data.sort = None;
            sync_selection(page, table, view_data);
            Some("sort cleared".to_owned())
        }
    }
}

fn cycle_sort(page: &PageState, table: &NeighborTable, view_data: &mut ViewData) -> String {
    let column = Column::ALL[view_data.selected_col.min(Column::ALL.len() - 1)];
    view_data.sort = match view_data.sort {
        Some(SortSpec {
            column: current,
            direction: SortDirection::Asc,
        }) if current == column => Some(SortSpec {
            column,
            direction: SortDirection::Desc,
        }),
        Some(SortSpec {
            column: current,
            direction: SortDirection::Desc,
        }) if current == column => None,
        _ => Some(SortSpec {
            column,
            direction: SortDirection::Asc,
        }),
    };
    sync_selection(page, table, view_data);

    match view_data.sort {
        Some(SortSpec {
            direction: SortDirection::Asc,
            ..
        }) => format!("sort: {} asc", column.label()),
        Some(SortSpec {
            direction: SortDirection::Desc,
            ..
        }) => format!("sort: {} desc", column.label()),
        None => "sort cleared".to_owned(),
    }
}

fn visible_rows<'a>(
    page: &PageState,
    table: &'a NeighborTable,
    view_data: &ViewData,
) -> Vec<&'a RowActionController> {
    let mut rows = table
        .rows()
        .filter(|row| page.show_ignored || !row.state().is_ignored())
        .collect::<Vec<_>>();

    if let Some(sort) = view_data.sort {
        rows.sort_by(|left, right| {
            let ordering = sort.column.sort_key(left).cmp(&sort.column.sort_key(right));
            match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
    }
    rows
}

fn selected_position(rows: &[&RowActionController], view_data: &ViewData) -> Option<usize> {
    if rows.is_empty() {
        return None;
    }
    view_data
        .selected
        .and_then(|id| rows.iter().position(|row| row.id() == id))
        .or(Some(view_data.selected_index.min(rows.len() - 1)))
}

fn sync_selection(page: &PageState, table: &NeighborTable, view_data: &mut ViewData) {
    let rows = visible_rows(page, table, view_data);
    match selected_position(&rows, view_data) {
        Some(index) => {
            view_data.selected = Some(rows[index].id());
            view_data.selected_index = index;
        }
        None => {
            view_data.selected = None;
            view_data.selected_index = 0;
        }
    }
}

fn move_row(page: &PageState, table: &NeighborTable, view_data: &mut ViewData, delta: isize) {
    let rows = visible_rows(page, table, view_data);
    let Some(current) = selected_position(&rows, view_data) else {
        view_data.selected = None;
        view_data.selected_index = 0;
        return;
    };

    let next = if delta.is_negative() {
        current.saturating_sub(delta.unsigned_abs())
    } else {
        current.saturating_add(delta as usize)
    };
    let next = next.min(rows.len() - 1);
    view_data.selected = Some(rows[next].id());
    view_data.selected_index = next;
}

fn action_cell_text(row: &RowActionController) -> String {
    let display = row.display();
    let mut text = format!("[{}]", display.label.text);
    if row.is_pending() {
        text.push(' ');
        text.push_str(SAVING_MARK);
    }
    if let Some(error) = &display.error {
        text.push_str(" ! ");
        text.push_str(error);
    }
    text
}

fn action_cell_style(row: &RowActionController) -> Style {
    let display = row.display();
    if !display.enabled {
        return Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC);
    }
    if display.error.is_some() {
        return Style::default().fg(Color::Red);
    }
    match display.label.style {
        LabelStyle::Normal => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        LabelStyle::Secondary => Style::default().fg(Color::Gray),
    }
}

fn header_label(column: Column, view_data: &ViewData) -> String {
    let mut label = column.label().to_owned();
    if let Some(sort) = view_data.sort
        && sort.column == column
    {
        label.push_str(match sort.direction {
            SortDirection::Asc => " ↑",
            SortDirection::Desc => " ↓",
        });
    }
    label
}

fn table_title(page: &PageState, table: &NeighborTable, visible: usize) -> String {
    let mut title = format!("unrecognized neighbors ({visible}/{} rows", table.len());
    let pending = table.pending_count();
    if pending > 0 {
        title.push_str(&format!(", {pending} saving"));
    }
    if !page.show_ignored {
        title.push_str(", ignored hidden");
    }
    title.push(')');
    title
}

fn status_text(page: &PageState) -> String {
    page.status_line
        .clone()
        .unwrap_or_else(|| DEFAULT_HINT.to_owned())
}

fn help_overlay_text() -> &'static str {
    "rows: j/k or up/down | g/G first/last | ctrl+d/ctrl+u or pgdn/pgup half page\n\
columns: h/l or left/right | s cycle sort on column | S clear sort\n\
toggle: enter, i or space ignores/unignores the selected neighbor\n\
view: f show/hide ignored neighbors | ? help | q or esc quit\n\
a row shows (saving…) while its change is in flight; its control is disabled until the server answers"
}

fn render(
    frame: &mut ratatui::Frame<'_>,
    page: &PageState,
    table: &NeighborTable,
    view_data: &ViewData,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());

    render_table(frame, layout[0], page, table, view_data);

    let status_widget = Paragraph::new(status_text(page))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[1]);

    if page.help_visible {
        let area = centered_rect(76, 40, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn render_table(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    page: &PageState,
    table: &NeighborTable,
    view_data: &ViewData,
) {
    let rows = visible_rows(page, table, view_data);
    let selected = selected_position(&rows, view_data);

    let header = Row::new(Column::ALL.iter().map(|column| {
        Cell::from(header_label(*column, view_data)).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));

    let body = rows.iter().enumerate().map(|(row_index, row)| {
        let selected_row = selected == Some(row_index);
        let cells = Column::ALL
            .iter()
            .enumerate()
            .map(|(column_index, column)| {
                let mut style = if *column == Column::Action {
                    action_cell_style(row)
                } else {
                    Style::default()
                };
                if selected_row {
                    style = style.bg(Color::DarkGray);
                }
                if selected_row && column_index == view_data.selected_col {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(column.cell_text(row)).style(style)
            })
            .collect::<Vec<_>>();
        Row::new(cells)
    });

    let widths = Column::ALL.iter().map(|column| column.width());
    let widget = Table::new(body, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(page, table, rows.len()))
                .borders(Borders::ALL),
        );
    frame.render_widget(widget, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
