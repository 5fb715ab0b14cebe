// services/asset-dash/src/ui.rs
//
// Rendering: header, unit selector, tile sections, detail table, activity log

use std::time::Duration;

use ratatui::{prelude::*, widgets::*};

use svckit::{QueryCache, QueryStatus};

use crate::detail::{RangeField, RangePrompt};
use crate::state::DashboardState;
use crate::tiles::{self, Section};

// Color palette: Red, White, Silver, Gold
pub mod colors {
    use ratatui::style::Color;

    pub const RED: Color = Color::Rgb(220, 50, 47);
    pub const DARK_RED: Color = Color::Rgb(139, 0, 0);
    pub const WHITE: Color = Color::Rgb(253, 246, 227);
    pub const SILVER: Color = Color::Rgb(147, 161, 161);
    pub const GOLD: Color = Color::Rgb(255, 193, 37);
    pub const DARK_GOLD: Color = Color::Rgb(184, 134, 11);
    pub const BG_DARK: Color = Color::Rgb(0, 20, 30);
    pub const BG_PANEL: Color = Color::Rgb(7, 30, 41);
    pub const SUCCESS: Color = Color::Rgb(133, 153, 0);
}

pub struct View<'a> {
    pub state: &'a DashboardState,
    pub cache: &'a QueryCache,
    pub sections: &'a [Section],
    pub stale_after: Duration,
    pub units_stale_after: Duration,
    pub mode: &'a str,
}

pub fn draw_ui(frame: &mut Frame, view: &View) {
    let area = frame.area();

    frame.render_widget(
        Block::default().style(Style::default().bg(colors::BG_DARK)),
        area,
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Scope
            Constraint::Min(10),   // Tiles or detail + activity
            Constraint::Length(3), // Footer
        ])
        .split(area);

    draw_header(frame, chunks[0], view);
    draw_scope(frame, chunks[1], view);

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(chunks[2]);

    if view.state.detail.is_some() {
        draw_detail(frame, main[0], view);
    } else {
        draw_tiles(frame, main[0], view);
    }
    draw_activity_panel(frame, main[1], view.state);
    draw_footer(frame, chunks[3], view.state);
}

fn draw_header(frame: &mut Frame, area: Rect, view: &View) {
    let mode_color = match view.mode {
        "DEMO" => colors::GOLD,
        _ if view.state.refreshes_ok > 0 => colors::SUCCESS,
        _ => colors::SILVER,
    };

    let title = Line::from(vec![
        Span::styled(
            " ASSET-DASH ",
            Style::default().fg(colors::WHITE).bg(colors::DARK_RED).bold(),
        ),
        Span::raw("  "),
        Span::styled("MAINTENANCE DASHBOARD", Style::default().fg(colors::GOLD).bold()),
        Span::raw("  "),
        Span::styled(format!("[{}]", view.mode), Style::default().fg(mode_color).bold()),
        Span::raw("  "),
        Span::styled(
            format!("ok {} / failed {}", view.state.refreshes_ok, view.state.refreshes_failed),
            Style::default().fg(if view.state.refreshes_failed > 0 { colors::RED } else { colors::SILVER }),
        ),
        Span::raw("  "),
        Span::styled(view.state.uptime_display(), Style::default().fg(colors::SILVER)),
    ]);

    let header = Paragraph::new(title)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(colors::DARK_RED))
                .style(Style::default().bg(colors::BG_DARK)),
        );

    frame.render_widget(header, area);
}

fn draw_scope(frame: &mut Frame, area: Rect, view: &View) {
    let state = view.state;
    let mut spans = vec![
        Span::styled("Division: ", Style::default().fg(colors::SILVER)),
        Span::styled(
            state.division_id.clone().unwrap_or_else(|| "all".to_string()),
            Style::default().fg(colors::WHITE).bold(),
        ),
    ];

    // The selector only exists once a division is chosen
    if let Some(division) = state.division_id.as_deref() {
        let status = view.cache.status(&tiles::units_key(division), view.units_stale_after);
        let (note, color) = units_note(&status);
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled("Unit: ", Style::default().fg(colors::SILVER)));
        spans.push(Span::styled(
            format!("< {} >", state.unit_label()),
            Style::default().fg(colors::GOLD).bold(),
        ));
        spans.push(Span::styled(
            format!("  ({})", note),
            Style::default().fg(color).add_modifier(Modifier::DIM),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::SILVER))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_PANEL));

    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

/// Unit list freshness shown next to the selector.
fn units_note(status: &QueryStatus) -> (String, Color) {
    match status {
        QueryStatus::Loading => ("loading units".to_string(), colors::SILVER),
        QueryStatus::Ready { count, stale: false } => (format!("{} units", count), colors::SILVER),
        QueryStatus::Ready { count, stale: true } => (format!("{} units, refreshing", count), colors::GOLD),
        QueryStatus::Failed { last_count: Some(count), .. } => {
            (format!("{} units, refresh failed", count), colors::RED)
        }
        QueryStatus::Failed { last_count: None, .. } => ("units unavailable".to_string(), colors::RED),
    }
}

fn status_cell(status: &QueryStatus) -> (String, Style) {
    match status {
        QueryStatus::Loading => ("...".to_string(), Style::default().fg(colors::SILVER)),
        QueryStatus::Ready { count, stale: false } => {
            (format_number(*count as u64), Style::default().fg(colors::WHITE).bold())
        }
        QueryStatus::Ready { count, stale: true } => (
            format_number(*count as u64),
            Style::default().fg(colors::SILVER),
        ),
        QueryStatus::Failed { last_count: Some(count), .. } => (
            format!("{} !", format_number(*count as u64)),
            Style::default().fg(colors::RED),
        ),
        QueryStatus::Failed { last_count: None, .. } => {
            ("ERR".to_string(), Style::default().fg(colors::RED).bold())
        }
    }
}

fn draw_tiles(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default()
        .title(Span::styled(" TILES ", Style::default().fg(colors::WHITE).bold()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::SILVER))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_PANEL));

    let mut rows: Vec<Row> = Vec::new();
    let mut selected_row = 0;
    let mut index = 0;

    for section in view.sections {
        rows.push(Row::new(vec![
            Cell::from(Span::styled(
                section.title.to_uppercase(),
                Style::default().fg(colors::GOLD).bold(),
            )),
            Cell::from(Span::styled(
                format_number(tiles::section_total(section, view.cache) as u64),
                Style::default().fg(colors::DARK_GOLD),
            )),
            Cell::from(""),
        ]));

        for tile in &section.tiles {
            if index == view.state.cursor {
                selected_row = rows.len();
            }
            let status = view.cache.status(&tile.key, view.stale_after);
            let (value, style) = status_cell(&status);
            let note = match &status {
                QueryStatus::Failed { error, .. } => error.clone(),
                QueryStatus::Ready { stale: true, .. } => "refreshing".to_string(),
                _ => String::new(),
            };
            rows.push(Row::new(vec![
                Cell::from(Span::styled(format!("  {}", tile.title), Style::default().fg(colors::WHITE))),
                Cell::from(Span::styled(value, style)),
                Cell::from(Span::styled(note, Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM))),
            ]));
            index += 1;
        }
    }

    let table = Table::new(
        rows,
        [Constraint::Min(28), Constraint::Length(10), Constraint::Min(10)],
    )
    .header(
        Row::new(vec![
            Cell::from(Span::styled("TILE", Style::default().fg(colors::GOLD).bold())),
            Cell::from(Span::styled("COUNT", Style::default().fg(colors::GOLD).bold())),
            Cell::from(Span::styled("", Style::default())),
        ])
        .bottom_margin(1),
    )
    .block(block)
    .row_highlight_style(Style::default().bg(colors::DARK_RED));

    let mut table_state = TableState::default().with_selected(Some(selected_row));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn draw_detail(frame: &mut Frame, area: Rect, view: &View) {
    let Some(detail) = view.state.detail.as_ref() else {
        return;
    };

    let mut title = format!(" {} ", detail.title.to_uppercase());
    if detail.supports_date_filter() {
        title.push_str(&format!("- {} ", detail.range_label()));
    }

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(colors::GOLD).bold()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::DARK_GOLD))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_PANEL));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);

    let headers = detail.headers();
    let rows: Vec<Row> = detail
        .page_rows()
        .into_iter()
        .map(|cells| {
            Row::new(
                cells
                    .into_iter()
                    .map(|c| Cell::from(Span::styled(c, Style::default().fg(colors::WHITE))))
                    .collect::<Vec<_>>(),
            )
        })
        .collect();

    let widths: Vec<Constraint> = headers.iter().map(|_| Constraint::Fill(1)).collect();
    let table = Table::new(rows, widths).header(
        Row::new(
            headers
                .iter()
                .map(|h| Cell::from(Span::styled(*h, Style::default().fg(colors::GOLD).bold())))
                .collect::<Vec<_>>(),
        )
        .bottom_margin(1),
    );
    frame.render_widget(table, chunks[0]);

    let footer = match detail.range_prompt() {
        Some(prompt) => range_prompt_line(prompt),
        None => Line::from(vec![
            Span::styled(detail.summary(), Style::default().fg(colors::SILVER)),
            Span::raw("  |  "),
            Span::styled(
                format!("Page {}/{}", detail.page(), detail.page_count()),
                Style::default().fg(colors::WHITE).bold(),
            ),
        ]),
    };
    frame.render_widget(Paragraph::new(footer).alignment(Alignment::Center), chunks[1]);
}

fn range_prompt_line(prompt: &RangePrompt) -> Line<'_> {
    let field = |label: &'static str, value: &str, active: bool| {
        let style = if active {
            Style::default().fg(colors::BG_DARK).bg(colors::GOLD)
        } else {
            Style::default().fg(colors::WHITE)
        };
        [
            Span::styled(label, Style::default().fg(colors::SILVER)),
            Span::styled(format!("[{:<10}]", value), style),
            Span::raw("  "),
        ]
    };

    let mut spans: Vec<Span> = Vec::new();
    spans.extend(field("From ", &prompt.start, prompt.field == RangeField::Start));
    spans.extend(field("To ", &prompt.end, prompt.field == RangeField::End));
    match &prompt.error {
        Some(error) => spans.push(Span::styled(error.as_str(), Style::default().fg(colors::RED))),
        None => spans.push(Span::styled(
            "YYYY-MM-DD, blank for open end",
            Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM),
        )),
    }
    Line::from(spans)
}

fn activity_title(state: &DashboardState) -> String {
    let scope = match &state.detail {
        Some(detail) => detail.title.to_uppercase(),
        None => "ACTIVITY LOG".to_string(),
    };
    if state.errors_only {
        format!(" {} - ERRORS ", scope)
    } else {
        format!(" {} ", scope)
    }
}

fn draw_activity_panel(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let focused = state.log_focus().is_some();
    let block = Block::default()
        .title(Span::styled(activity_title(state), Style::default().fg(colors::WHITE).bold()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors::SILVER))
        .border_type(BorderType::Rounded)
        .style(Style::default().bg(colors::BG_PANEL));

    let logs: Vec<Line> = state
        .visible_log()
        .take(40)
        .map(|entry| {
            let (prefix, color) = match entry.level.as_str() {
                "ERROR" => ("[ERR]", colors::RED),
                "WARN" => ("[WRN]", colors::GOLD),
                "INFO" => ("[INF]", colors::SUCCESS),
                _ => ("[---]", colors::SILVER),
            };

            let mut spans = vec![
                Span::styled(
                    format!("{} ", entry.timestamp.format("%H:%M:%S")),
                    Style::default().fg(colors::SILVER).add_modifier(Modifier::DIM),
                ),
                Span::styled(format!("{} ", prefix), Style::default().fg(color)),
            ];
            // Inside a detail every entry shares the same key
            if let Some(key) = entry.key.as_deref().filter(|_| !focused) {
                spans.push(Span::styled(format!("{}: ", key), Style::default().fg(colors::DARK_GOLD)));
            }
            spans.push(Span::styled(entry.message.as_str(), Style::default().fg(colors::WHITE)));
            Line::from(spans)
        })
        .collect();

    let paragraph = Paragraph::new(logs).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn key_hint<'a>(key: &'a str, label: &'a str, bg: Color) -> [Span<'a>; 3] {
    [
        Span::styled(key, Style::default().fg(colors::BG_DARK).bg(bg)),
        Span::styled(label, Style::default().fg(colors::SILVER)),
        Span::raw("  "),
    ]
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let detail = state.detail.as_ref();
    let hints: Vec<[Span; 3]> = if detail.is_some_and(|d| d.range_prompt().is_some()) {
        vec![
            key_hint(" [ESC] ", " Cancel ", colors::RED),
            key_hint(" [TAB] ", " From/To ", colors::SILVER),
            key_hint(" [ENTER] ", " Apply ", colors::GOLD),
        ]
    } else if detail.is_some_and(|d| d.supports_date_filter()) {
        vec![
            key_hint(" [ESC] ", " Back ", colors::RED),
            key_hint(" [LEFT/RIGHT] ", " Page ", colors::GOLD),
            key_hint(" [D] ", " Preset ", colors::WHITE),
            key_hint(" [R] ", " Range ", colors::WHITE),
            key_hint(" [C] ", " Clear ", colors::SILVER),
            key_hint(" [E] ", " Errors ", colors::SILVER),
        ]
    } else if detail.is_some() {
        vec![
            key_hint(" [ESC] ", " Back ", colors::RED),
            key_hint(" [LEFT/RIGHT] ", " Page ", colors::GOLD),
            key_hint(" [E] ", " Errors ", colors::SILVER),
        ]
    } else {
        vec![
            key_hint(" [Q] ", " Quit ", colors::RED),
            key_hint(" [UP/DOWN] ", " Select ", colors::SILVER),
            key_hint(" [ENTER] ", " Details ", colors::GOLD),
            key_hint(" [U/SHIFT+U] ", " Unit ", colors::WHITE),
            key_hint(" [E] ", " Errors ", colors::SILVER),
        ]
    };

    let help = Line::from(hints.into_iter().flatten().collect::<Vec<_>>());
    let footer = Paragraph::new(help)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(colors::DARK_RED))
                .style(Style::default().bg(colors::BG_DARK)),
        );

    frame.render_widget(footer, area);
}

pub fn format_number(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 10_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
