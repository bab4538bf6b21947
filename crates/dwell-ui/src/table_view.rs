//! Monthly KPI table, for the TUI and as plain text for stdout.
//!
//! Renders one row per month bucket plus a highlighted totals row at the
//! bottom. Every numeric cell uses two decimals.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use dwell_core::formatting::{format_kpi, format_month_key};
use dwell_core::models::{MonthlyAggregate, MonthlyTotals};

use crate::themes::Theme;

/// Column headings, in display order.
pub const HEADERS: [&str; 6] = [
    "Month",
    "Total h",
    "Mean h",
    "Events",
    "Overage min",
    "Overage h",
];

fn row_cells(row: &MonthlyAggregate) -> [String; 6] {
    [
        format_month_key(row.month),
        format_kpi(row.total_duration_hours),
        format_kpi(row.mean_duration_hours),
        row.event_count.to_string(),
        format_kpi(row.total_overage_minutes),
        format_kpi(row.total_overage_hours),
    ]
}

fn total_cells(totals: &MonthlyTotals) -> [String; 6] {
    [
        "TOTAL".to_string(),
        format_kpi(totals.total_duration_hours),
        format_kpi(totals.mean_duration_hours),
        totals.event_count.to_string(),
        format_kpi(totals.total_overage_minutes),
        format_kpi(totals.total_overage_hours),
    ]
}

/// Render the KPI table into `area`.
pub fn render_table_view(
    frame: &mut Frame,
    area: Rect,
    rows: &[MonthlyAggregate],
    totals: &MonthlyTotals,
    theme: &Theme,
) {
    let header = Row::new(
        HEADERS
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1);

    let mut all_rows: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| Row::new(row_cells(row)).style(theme.row_style(i)))
        .collect();

    all_rows.push(Row::new(total_cells(totals)).style(theme.table_total));

    let widths = [
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(13),
        Constraint::Length(11),
    ];

    let table = Table::new(all_rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" Monthly KPIs ({} months) ", totals.months)),
        )
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Render a centred placeholder with `message`.
pub fn render_no_data(frame: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), theme.warning)),
        Line::from(""),
        Line::from(Span::styled("Press 'q' or Ctrl+C to exit", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(text))
            .centered()
            .block(Block::default().borders(Borders::ALL).title(" Dwell Report ")),
        area,
    );
}

/// Plain-text rendering of the table for non-interactive output.
///
/// The month column is left aligned; numbers are right aligned.
pub fn format_plain_table(rows: &[MonthlyAggregate], totals: &MonthlyTotals) -> String {
    let mut lines: Vec<[String; 6]> = Vec::with_capacity(rows.len() + 2);
    lines.push(HEADERS.map(str::to_string));
    lines.extend(rows.iter().map(row_cells));
    let totals_line = total_cells(totals);

    let mut widths = [0usize; 6];
    for cells in lines.iter().chain(std::iter::once(&totals_line)) {
        for (w, cell) in widths.iter_mut().zip(cells) {
            *w = (*w).max(cell.width());
        }
    }

    let render = |cells: &[String; 6]| -> String {
        cells
            .iter()
            .zip(widths)
            .enumerate()
            .map(|(i, (cell, w))| {
                let pad = " ".repeat(w - cell.width());
                if i == 0 {
                    format!("{cell}{pad}")
                } else {
                    format!("{pad}{cell}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let rule = "-".repeat(widths.iter().sum::<usize>() + 2 * (widths.len() - 1));
    let mut out = String::new();
    for (i, cells) in lines.iter().enumerate() {
        out.push_str(&render(cells));
        out.push('\n');
        if i == 0 {
            out.push_str(&rule);
            out.push('\n');
        }
    }
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&render(&totals_line));
    out.push('\n');
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
