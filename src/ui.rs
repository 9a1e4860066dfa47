use crate::app::{App, AppMode, LoadState};
use crate::record::Field;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
};

const CHECKBOX_WIDTH: u16 = 3;
const LABEL_WIDTH: u16 = 7;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(2),
            ]
            .as_ref(),
        )
        .split(f.size());

    draw_search(f, chunks[0], app);
    match &app.load_state {
        LoadState::Failed(msg) => draw_message(f, chunks[1], msg, Color::Red),
        LoadState::Loading if app.store.records().is_empty() => {
            draw_message(f, chunks[1], "Loading...", Color::Yellow)
        }
        _ => draw_members(f, chunks[1], app),
    }
    draw_pagination(f, chunks[2], app);
    draw_status(f, chunks[3], app);

    if app.store.is_editing() {
        draw_edit_dialog(f, app);
    }
    if app.show_help {
        draw_help(f);
    }
}

fn draw_search(f: &mut Frame, area: Rect, app: &App) {
    let searching = app.mode == AppMode::Searching;
    let style = if searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let mut text = vec![Span::raw(app.store.query())];
    if searching {
        text.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
    } else if app.store.query().is_empty() {
        text.push(Span::styled(
            "Search... (press /)",
            Style::default().fg(Color::DarkGray),
        ));
    }
    let p = Paragraph::new(Line::from(text)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title("Search"),
    );
    f.render_widget(p, area);
}

fn draw_message(f: &mut Frame, area: Rect, msg: &str, color: Color) {
    let p = Paragraph::new(msg)
        .style(Style::default().fg(color))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Members"));
    f.render_widget(p, area);
}

fn checkbox(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

fn draw_members(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().borders(Borders::ALL).title("Members");
    let page = app.store.derive_page();
    if page.rows.is_empty() {
        let msg = if page.is_past_end() {
            "No members on this page (PgUp to go back)"
        } else {
            "No members match the search"
        };
        let p = Paragraph::new(msg).block(block);
        f.render_widget(p, area);
        return;
    }

    let header = Row::new(vec![
        Cell::from(checkbox(app.all_checked)),
        Cell::from(Field::Name.label()),
        Cell::from(Field::Email.label()),
        Cell::from(Field::Role.label()),
    ])
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );

    let mut rows = Vec::with_capacity(page.rows.len());
    for (idx, member) in page.rows.iter().enumerate() {
        let selected = app.store.is_selected(&member.id);
        let mut row = Row::new(vec![
            Cell::from(checkbox(selected)),
            Cell::from(member.name.as_str()),
            Cell::from(member.email.as_str()),
            Cell::from(member.role.as_str()),
        ]);
        if idx == app.cursor_row {
            row = row.style(Style::default().bg(Color::Blue).fg(Color::Black));
        } else if selected {
            row = row.style(Style::default().bg(Color::DarkGray));
        }
        rows.push(row);
    }

    let table = Table::new(rows, column_widths(area.width))
        .header(header)
        .block(block)
        .column_spacing(1);

    f.render_widget(table, area);
}

fn draw_pagination(f: &mut Frame, area: Rect, app: &App) {
    let page = app.store.derive_page();
    let mut spans = vec![
        Span::styled(
            format!(" « Page {} of {} » ", page.page + 1, page.page_count),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw(app.pagination_summary()),
        Span::styled(
            format!(" ({} per page)", app.store.page_size()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    let selected = app.store.selection_len();
    if selected > 0 {
        spans.push(Span::styled(
            format!("  {selected} selected"),
            Style::default().fg(Color::Yellow),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let mode = match app.mode {
        AppMode::Normal => "NORMAL",
        AppMode::Searching => "SEARCH",
        AppMode::Editing { .. } => "EDIT",
    };
    let text = Line::from(vec![
        Span::styled(
            format!("[{mode}] "),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(&app.status),
    ]);
    let style = if app.is_ready() {
        Style::default()
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    let p = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::TOP));
    f.render_widget(p, area);
}

fn draw_edit_dialog(f: &mut Frame, app: &App) {
    let Some(edit) = app.store.editing() else {
        return;
    };
    let area = centered_rect(60, 7, f.size());
    let focused = match app.mode {
        AppMode::Editing { field, cursor } => Some((field, cursor)),
        _ => None,
    };

    let lines: Vec<Line> = Field::ALL
        .iter()
        .map(|&field| {
            let style = if focused.is_some_and(|(focus, _)| focus == field) {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(
                    format!("{:<width$}", format!("{}:", field.label()), width = LABEL_WIDTH as usize),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(edit.get(field), style),
            ])
        })
        .collect();

    let mut body = lines;
    body.push(Line::from(""));
    body.push(Line::from(Span::styled(
        "Enter save | Esc cancel | Tab next field",
        Style::default().fg(Color::DarkGray),
    )));

    let dialog = Paragraph::new(body).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Edit User {}", edit.id)),
    );
    f.render_widget(Clear, area);
    f.render_widget(dialog, area);

    if let Some((field, cursor)) = focused {
        let row = Field::ALL.iter().position(|&fld| fld == field).unwrap_or(0) as u16;
        let value = edit.get(field);
        let col = value[..cursor.min(value.len())].chars().count() as u16;
        f.set_cursor(
            (area.x + 1 + LABEL_WIDTH + col).min(area.right().saturating_sub(2)),
            area.y + 1 + row,
        );
    }
}

fn draw_help(f: &mut Frame) {
    let binds = [
        ("/", "search (Enter applies, Esc closes)"),
        ("Esc", "clear active search"),
        ("Up/Down j/k", "move row cursor"),
        ("PgUp/PgDn ←/→", "previous / next page"),
        ("Home/End", "first / last page"),
        ("Space", "toggle row selection"),
        ("a", "toggle select all on page"),
        ("e", "edit row"),
        ("d", "delete row"),
        ("D", "delete selected"),
        ("r", "reload from source (drops local edits)"),
        ("?", "close this help"),
        ("q", "quit"),
    ];
    let lines: Vec<Line> = binds
        .iter()
        .map(|(k, v)| {
            Line::from(vec![
                Span::styled(
                    format!("{k:>14}  "),
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(*v),
            ])
        })
        .collect();
    let area = centered_rect(70, binds.len() as u16 + 2, f.size());
    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Keys")),
        area,
    );
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let width = r.width.saturating_mul(percent_x) / 100;
    let height = height.min(r.height);
    Rect {
        x: r.x + (r.width.saturating_sub(width)) / 2,
        y: r.y + (r.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

fn column_widths(total_width: u16) -> Vec<Constraint> {
    // borders and spacing between the four columns
    let w = total_width.saturating_sub(2 + 3 + CHECKBOX_WIDTH);
    let per = (w / 3).max(1);
    vec![
        Constraint::Length(CHECKBOX_WIDTH),
        Constraint::Length(per),
        Constraint::Length(per),
        Constraint::Length(per),
    ]
}
