//! Per-month charts: two bar charts and a trend line.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, GraphType},
    Frame,
};

use dwell_core::formatting::format_kpi;
use dwell_core::models::MonthlyAggregate;
use dwell_core::time_utils::month_label;

use crate::themes::Theme;

const MAX_BAR_WIDTH: u16 = 10;
const BAR_GAP: u16 = 1;
/// Above this many months the x axis keeps only a few anchor labels.
const MAX_AXIS_LABELS: usize = 6;

/// Which aggregate a bar chart plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMetric {
    TotalDuration,
    OverageMinutes,
}

impl BarMetric {
    pub fn value(self, row: &MonthlyAggregate) -> f64 {
        match self {
            BarMetric::TotalDuration => row.total_duration_hours,
            BarMetric::OverageMinutes => row.total_overage_minutes,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            BarMetric::TotalDuration => "Total standing time per month (h)",
            BarMetric::OverageMinutes => "Overage beyond free allowance per month (min)",
        }
    }

    fn style(self, theme: &Theme) -> Style {
        match self {
            BarMetric::TotalDuration => theme.chart_duration,
            BarMetric::OverageMinutes => theme.chart_overage,
        }
    }
}

/// Bar height in hundredths so two-decimal values keep their proportions.
fn bar_height(value: f64) -> u64 {
    (value * 100.0).round().max(0.0) as u64
}

fn bar_width(area: Rect, bars: usize) -> u16 {
    if bars == 0 {
        return 1;
    }
    let inner = area.width.saturating_sub(2);
    let per_bar = inner / bars as u16;
    per_bar.saturating_sub(BAR_GAP).clamp(1, MAX_BAR_WIDTH)
}

/// Render `metric` for every month as a vertical bar chart.
pub fn render_bar_chart(
    frame: &mut Frame,
    area: Rect,
    rows: &[MonthlyAggregate],
    metric: BarMetric,
    theme: &Theme,
) {
    let style = metric.style(theme);
    let bars: Vec<Bar> = rows
        .iter()
        .map(|row| {
            let value = metric.value(row);
            Bar::default()
                .label(Line::from(month_label(row.month)))
                .value(bar_height(value))
                .text_value(format_kpi(value))
                .style(style)
                .value_style(style.add_modifier(Modifier::REVERSED))
        })
        .collect();

    let chart = BarChart::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(format!(" {} ", metric.title())),
        )
        .data(BarGroup::default().bars(&bars))
        .bar_width(bar_width(area, rows.len()))
        .bar_gap(BAR_GAP)
        .label_style(theme.label);

    frame.render_widget(chart, area);
}

/// `(month index, mean hours)` pairs for the trend line.
pub fn trend_points(rows: &[MonthlyAggregate]) -> Vec<(f64, f64)> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| (i as f64, row.mean_duration_hours))
        .collect()
}

/// Month labels for the x axis, thinned out for long ranges.
pub fn axis_labels(rows: &[MonthlyAggregate]) -> Vec<String> {
    let labels: Vec<String> = rows.iter().map(|r| month_label(r.month)).collect();
    let n = labels.len();
    if n <= MAX_AXIS_LABELS {
        return labels;
    }
    // Axis labels are spread evenly, so only indices that land on a
    // data point are kept.
    if n % 2 == 1 {
        vec![
            labels[0].clone(),
            labels[n / 2].clone(),
            labels[n - 1].clone(),
        ]
    } else {
        vec![labels[0].clone(), labels[n - 1].clone()]
    }
}

/// Render mean standing time per month as a line chart.
pub fn render_trend_chart(frame: &mut Frame, area: Rect, rows: &[MonthlyAggregate], theme: &Theme) {
    let points = trend_points(rows);
    let x_max = (rows.len().saturating_sub(1)).max(1) as f64;
    let y_peak = points.iter().map(|(_, y)| *y).fold(0.0_f64, f64::max);
    let y_max = if y_peak > 0.0 { y_peak * 1.1 } else { 1.0 };

    let dataset = Dataset::default()
        .name("Mean h")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(theme.chart_trend)
        .data(&points);

    let x_labels: Vec<Span> = axis_labels(rows).into_iter().map(Span::raw).collect();
    let y_labels: Vec<Span> = [0.0, y_max / 2.0, y_max]
        .into_iter()
        .map(|v| Span::raw(format_kpi(v)))
        .collect();

    let chart = Chart::new(vec![dataset])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.table_border)
                .title(" Mean standing time per month (h) "),
        )
        .x_axis(
            Axis::default()
                .style(theme.chart_axis)
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .title("h")
                .style(theme.chart_axis)
                .bounds([0.0, y_max])
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}

// ── Tests ──────────────────────────────────────────────────────────────────────
