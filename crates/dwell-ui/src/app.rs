//! Application state and TUI event loop for the dwell-time report.
//!
//! [`App`] holds the derived [`Dataset`] and the user's filter. Every filter
//! edit re-runs [`build_report`] over the held dataset; reloads go through a
//! [`Reloader`] so the source is only re-derived when its bytes changed.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Months, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Paragraph, Tabs},
    Frame, Terminal,
};
use tokio::sync::mpsc::error::TryRecvError;

use dwell_core::models::{DateRange, MonthlyAggregate, MonthlyTotals};
use dwell_runtime::{
    build_report, Dataset, FilterSelection, ReloadRequest, ReloadResult, Reloader, ReportOutcome,
};

use crate::chart_view::{self, BarMetric};
use crate::components::filter_panel::{FilterPanel, ENDPOINT_ROWS};
use crate::components::header::Header;
use crate::table_view;
use crate::themes::Theme;

/// Width of the filter sidebar, borders included.
const FILTER_PANEL_WIDTH: u16 = 32;

const KEY_HELP: &str =
    "↑↓ select  ←→ day  ⇧←→ month  ⌫ default  space toggle  a all  x reset  r reload  q quit";

// ── ViewMode ──────────────────────────────────────────────────────────────────

/// Which view the TUI is currently rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    Table,
    DurationChart,
    OverageChart,
    TrendChart,
}

impl ViewMode {
    pub const ALL: [ViewMode; 4] = [
        ViewMode::Table,
        ViewMode::DurationChart,
        ViewMode::OverageChart,
        ViewMode::TrendChart,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ViewMode::Table => "1 KPIs",
            ViewMode::DurationChart => "2 Standing time",
            ViewMode::OverageChart => "3 Overage",
            ViewMode::TrendChart => "4 Mean trend",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|m| *m == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Which window endpoint a key edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    From,
    To,
}

/// Root application state for the report TUI.
pub struct App {
    pub theme: Theme,
    pub view_mode: ViewMode,
    pub timezone: String,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
    /// Dataset every report is computed from; replaced on reload.
    pub dataset: Arc<Dataset>,
    /// Current filter. `None` fields follow the dataset defaults.
    pub selection: FilterSelection,
    /// Window the last successful report resolved to.
    pub resolved: Option<DateRange>,
    /// Highlighted filter row: from, to, then one row per site.
    pub cursor: usize,
    pub rows: Vec<MonthlyAggregate>,
    pub totals: MonthlyTotals,
    /// Filter window shown in the header, empty when there is none.
    pub window: String,
    pub sites: Vec<String>,
    /// Replaces the report body when set, e.g. for empty results.
    pub message: Option<String>,
    /// Notice shown in the bottom line instead of the key help.
    pub status: Option<String>,
    pending_reload: Option<ReloadRequest>,
}

impl App {
    /// Build the app and compute the first report for `selection`.
    pub fn new(
        theme_name: &str,
        timezone: String,
        dataset: Arc<Dataset>,
        selection: FilterSelection,
    ) -> Self {
        let mut app = Self {
            theme: Theme::from_name(theme_name),
            view_mode: ViewMode::Table,
            timezone,
            should_quit: false,
            dataset,
            selection,
            resolved: None,
            cursor: 0,
            rows: Vec::new(),
            totals: MonthlyTotals::default(),
            window: String::new(),
            sites: Vec::new(),
            message: None,
            status: None,
            pending_reload: None,
        };
        app.refresh();
        app
    }

    /// Re-run the report for the current dataset and selection.
    pub fn refresh(&mut self) {
        match build_report(&self.dataset, &self.selection) {
            Ok(outcome) => self.apply_outcome(outcome),
            Err(e) => {
                self.rows.clear();
                self.totals = MonthlyTotals::default();
                self.message = Some(e.to_string());
            }
        }
    }

    fn apply_outcome(&mut self, outcome: ReportOutcome) {
        let message = outcome.empty_message().map(str::to_string);
        let (rows, totals, window, sites) = match outcome {
            ReportOutcome::Months(report) => {
                (report.months, report.totals, Some(report.window), report.sites)
            }
            ReportOutcome::NoMatches { window, sites } => {
                (Vec::new(), MonthlyTotals::default(), Some(window), sites)
            }
            ReportOutcome::NoEvents => (Vec::new(), MonthlyTotals::default(), None, Default::default()),
        };
        self.rows = rows;
        self.totals = totals;
        self.resolved = window;
        self.window = window.as_ref().map(format_window).unwrap_or_default();
        self.sites = sites.into_iter().collect();
        self.message = message;
    }

    /// Swap in a reloaded dataset, keeping the current filter.
    pub fn apply_reload(&mut self, result: ReloadResult) {
        match result {
            Ok(dataset) => {
                self.status = Some(if Arc::ptr_eq(&dataset, &self.dataset) {
                    "source unchanged; cached derivation reused".to_string()
                } else {
                    format!("reloaded: {} events", dataset.events.len())
                });
                self.dataset = dataset;
                self.cursor = self.cursor.min(self.filter_rows() - 1);
                self.refresh();
            }
            Err(e) => self.status = Some(format!("reload failed: {e}")),
        }
    }

    /// Reload the user asked for since the last call, if any.
    pub fn take_reload_request(&mut self) -> Option<ReloadRequest> {
        self.pending_reload.take()
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the TUI until the user quits with `q` or `Ctrl+C`.
    ///
    /// Keys are polled with a short timeout; reload results arrive on the
    /// reloader's channel and are drained without blocking.
    pub async fn run(mut self, mut reloader: Reloader) -> io::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let tick_rate = Duration::from_millis(250);

        let result = loop {
            if let Err(e) = terminal.draw(|frame| self.render(frame)) {
                break Err(e);
            }

            match event::poll(tick_rate) {
                Ok(true) => match event::read() {
                    Ok(Event::Key(key)) => self.handle_key(key),
                    Ok(_) => {}
                    Err(e) => break Err(e),
                },
                Ok(false) => {}
                Err(e) => break Err(e),
            }

            if let Some(request) = self.take_reload_request() {
                if reloader.requests.try_send(request).is_err() {
                    self.status = Some("reload already in progress".to_string());
                }
            }

            loop {
                match reloader.updates.try_recv() {
                    Ok(update) => self.apply_reload(update),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        self.status = Some("reloading is unavailable".to_string());
                        break;
                    }
                }
            }

            if self.should_quit {
                break Ok(());
            }
        };

        // Restore terminal state unconditionally.
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    /// Apply one key press to the view or filter state.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Release {
            return;
        }
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Tab => self.view_mode = self.view_mode.next(),
            KeyCode::BackTab => self.view_mode = self.view_mode.previous(),
            KeyCode::Char(c @ '1'..='4') => {
                let idx = (c as usize) - ('1' as usize);
                self.view_mode = ViewMode::ALL[idx];
            }
            KeyCode::Up | KeyCode::Char('k') => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor = (self.cursor + 1).min(self.filter_rows() - 1);
            }
            KeyCode::Left => self.step_endpoint(false, shift),
            KeyCode::Right => self.step_endpoint(true, shift),
            KeyCode::Backspace | KeyCode::Delete => self.clear_endpoint(),
            KeyCode::Char(' ') | KeyCode::Enter => self.toggle_site_under_cursor(),
            KeyCode::Char('a') => self.toggle_all_sites(),
            KeyCode::Char('x') => {
                self.selection = FilterSelection::default();
                self.status = Some("filter reset".to_string());
                self.refresh();
            }
            KeyCode::Char('r') => self.request_reload(ReloadRequest::Reload),
            KeyCode::Char('R') => self.request_reload(ReloadRequest::Rederive),
            _ => {}
        }
    }

    // ── Filter editing ────────────────────────────────────────────────────────

    fn filter_rows(&self) -> usize {
        ENDPOINT_ROWS + self.dataset.sites.len()
    }

    fn endpoint_under_cursor(&self) -> Option<Endpoint> {
        match self.cursor {
            0 => Some(Endpoint::From),
            1 => Some(Endpoint::To),
            _ => None,
        }
    }

    /// Whether `site` is part of the current selection.
    pub fn site_selected(&self, site: &str) -> bool {
        self.selection
            .sites
            .as_ref()
            .map_or(true, |selected| selected.contains(site))
    }

    /// Move the endpoint under the cursor by a day, or a month with Shift.
    /// A defaulted endpoint starts from the window last shown.
    fn step_endpoint(&mut self, forward: bool, by_month: bool) {
        let Some(endpoint) = self.endpoint_under_cursor() else {
            return;
        };
        let current = match endpoint {
            Endpoint::From => self.selection.from.or(self.resolved.map(|w| w.start)),
            Endpoint::To => self.selection.to.or(self.resolved.map(|w| w.end)),
        };
        let Some(next) = current.and_then(|date| shift_date(date, forward, by_month)) else {
            return;
        };
        match endpoint {
            Endpoint::From => self.selection.from = Some(next),
            Endpoint::To => self.selection.to = Some(next),
        }
        self.status = None;
        self.refresh();
    }

    fn clear_endpoint(&mut self) {
        match self.endpoint_under_cursor() {
            Some(Endpoint::From) => self.selection.from = None,
            Some(Endpoint::To) => self.selection.to = None,
            None => return,
        }
        self.refresh();
    }

    fn toggle_site_under_cursor(&mut self) {
        let Some(site) = self
            .cursor
            .checked_sub(ENDPOINT_ROWS)
            .and_then(|i| self.dataset.sites.get(i))
            .cloned()
        else {
            return;
        };
        let mut selected = self
            .selection
            .sites
            .take()
            .unwrap_or_else(|| self.dataset.sites.iter().cloned().collect());
        if !selected.remove(&site) {
            selected.insert(site);
        }
        self.selection.sites = Some(selected);
        self.refresh();
    }

    /// Select every site, or none when all are already selected.
    fn toggle_all_sites(&mut self) {
        let all_selected = self.dataset.sites.iter().all(|s| self.site_selected(s));
        self.selection.sites = if all_selected {
            Some(Default::default())
        } else {
            None
        };
        self.refresh();
    }

    fn request_reload(&mut self, request: ReloadRequest) {
        self.pending_reload = Some(request);
        self.status = Some("reloading…".to_string());
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let [header_area, tabs_area, main_area, status_area] = Layout::vertical([
            Constraint::Length(4),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .areas(frame.area());
        let [body_area, panel_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(FILTER_PANEL_WIDTH)])
                .areas(main_area);

        let header = Header::new(&self.window, &self.sites, &self.timezone, &self.theme);
        frame.render_widget(Paragraph::new(header.to_lines()), header_area);

        let tabs = Tabs::new(ViewMode::ALL.iter().map(|m| Line::from(m.title())))
            .select(self.view_mode.index())
            .style(self.theme.tab_inactive)
            .highlight_style(self.theme.tab_active);
        frame.render_widget(tabs, tabs_area);

        self.render_filter_panel(frame, panel_area);

        let status = match &self.status {
            Some(text) => Span::styled(text.as_str(), self.theme.info),
            None => Span::styled(KEY_HELP, self.theme.dim),
        };
        frame.render_widget(Paragraph::new(Line::from(status)), status_area);

        if let Some(message) = &self.message {
            table_view::render_no_data(frame, body_area, message, &self.theme);
            return;
        }

        match self.view_mode {
            ViewMode::Table => {
                table_view::render_table_view(frame, body_area, &self.rows, &self.totals, &self.theme)
            }
            ViewMode::DurationChart => chart_view::render_bar_chart(
                frame,
                body_area,
                &self.rows,
                BarMetric::TotalDuration,
                &self.theme,
            ),
            ViewMode::OverageChart => chart_view::render_bar_chart(
                frame,
                body_area,
                &self.rows,
                BarMetric::OverageMinutes,
                &self.theme,
            ),
            ViewMode::TrendChart => {
                chart_view::render_trend_chart(frame, body_area, &self.rows, &self.theme)
            }
        }
    }

    fn render_filter_panel(&self, frame: &mut Frame, area: Rect) {
        let from = endpoint_text(self.selection.from, self.resolved.map(|w| w.start));
        let to = endpoint_text(self.selection.to, self.resolved.map(|w| w.end));
        let panel = FilterPanel {
            from: &from,
            to: &to,
            sites: self
                .dataset
                .sites
                .iter()
                .map(|s| (s.as_str(), self.site_selected(s)))
                .collect(),
            cursor: self.cursor,
            theme: &self.theme,
        };
        panel.render(frame, area);
    }
}

/// Header text for a filter window, e.g. `"2024-01-01 → 2024-03-31"`.
pub fn format_window(window: &DateRange) -> String {
    format!("{} → {}", window.start, window.end)
}

/// Explicit endpoints as-is; defaulted ones get a trailing `*`.
fn endpoint_text(explicit: Option<NaiveDate>, resolved: Option<NaiveDate>) -> String {
    match (explicit, resolved) {
        (Some(date), _) => date.to_string(),
        (None, Some(date)) => format!("{date} *"),
        (None, None) => "-".to_string(),
    }
}

fn shift_date(date: NaiveDate, forward: bool, by_month: bool) -> Option<NaiveDate> {
    match (forward, by_month) {
        (true, false) => date.checked_add_days(Days::new(1)),
        (false, false) => date.checked_sub_days(Days::new(1)),
        (true, true) => date.checked_add_months(Months::new(1)),
        (false, true) => date.checked_sub_months(Months::new(1)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use dwell_core::models::Event;
    use dwell_runtime::data::Derivation;
    use ratatui::backend::TestBackend;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn shift(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::SHIFT)
    }

    fn dataset(events: Vec<Event>) -> Arc<Dataset> {
        Arc::new(Dataset::from(Derivation {
            events,
            ..Default::default()
        }))
    }

    fn sample_dataset() -> Arc<Dataset> {
        dataset(vec![
            Event::from_span(dt("2024-01-10 08:00"), dt("2024-01-10 08:45"), "A"),
            Event::from_span(dt("2024-01-15 09:00"), dt("2024-01-15 10:00"), "B"),
            Event::from_span(dt("2024-02-20 07:00"), dt("2024-02-20 07:20"), "A"),
        ])
    }

    fn make_app() -> App {
        App::new(
            "dark",
            "UTC".to_string(),
            sample_dataset(),
            FilterSelection::default(),
        )
    }

    fn draw(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    // ── ViewMode ──────────────────────────────────────────────────────────────

    #[test]
    fn test_view_mode_cycles() {
        assert_eq!(ViewMode::Table.next(), ViewMode::DurationChart);
        assert_eq!(ViewMode::TrendChart.next(), ViewMode::Table);
        assert_eq!(ViewMode::Table.previous(), ViewMode::TrendChart);
        assert_eq!(ViewMode::OverageChart.index(), 2);
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_tab_and_digits_switch_views() {
        let mut app = make_app();
        assert_eq!(app.view_mode, ViewMode::Table);

        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.view_mode, ViewMode::DurationChart);
        app.handle_key(key(KeyCode::Char('4')));
        assert_eq!(app.view_mode, ViewMode::TrendChart);
        app.handle_key(key(KeyCode::BackTab));
        assert_eq!(app.view_mode, ViewMode::OverageChart);
        app.handle_key(key(KeyCode::Char('1')));
        assert_eq!(app.view_mode, ViewMode::Table);
        app.handle_key(key(KeyCode::Char('9')));
        assert_eq!(app.view_mode, ViewMode::Table);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_quit_keys() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = make_app();
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);

        let mut app = make_app();
        app.handle_key(key(KeyCode::Char('c')));
        assert!(!app.should_quit);
    }

    #[test]
    fn test_cursor_is_clamped_to_filter_rows() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Up));
        assert_eq!(app.cursor, 0);
        for _ in 0..10 {
            app.handle_key(key(KeyCode::Down));
        }
        // From, To, A, B.
        assert_eq!(app.cursor, 3);
    }

    // ── Filtering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_initial_report_covers_dataset() {
        let app = make_app();
        assert_eq!(app.rows.len(), 2);
        assert_eq!(app.totals.event_count, 3);
        assert_eq!(app.window, "2024-01-10 → 2024-02-20");
        assert_eq!(app.sites, vec!["A", "B"]);
        assert!(app.message.is_none());
    }

    #[test]
    fn test_toggling_a_site_recomputes_report() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Char(' ')));

        assert!(!app.site_selected("A"));
        assert_eq!(app.sites, vec!["B"]);
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.rows[0].total_duration_hours, 1.0);

        app.handle_key(key(KeyCode::Enter));
        assert!(app.site_selected("A"));
        assert_eq!(app.totals.event_count, 3);
    }

    #[test]
    fn test_select_none_then_all() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Char('a')));
        assert!(app.rows.is_empty());
        assert_eq!(
            app.message.as_deref(),
            Some("no data for the selected filter combination")
        );

        app.handle_key(key(KeyCode::Char('a')));
        assert_eq!(app.selection.sites, None);
        assert_eq!(app.rows.len(), 2);
    }

    #[test]
    fn test_month_step_on_from_narrows_window() {
        let mut app = make_app();
        app.handle_key(shift(KeyCode::Right));

        assert_eq!(app.selection.from, Some(date(2024, 2, 10)));
        assert_eq!(app.window, "2024-02-10 → 2024-02-20");
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.rows[0].month_key(), "2024-02");

        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.selection.from, None);
        assert_eq!(app.rows.len(), 2);
    }

    #[test]
    fn test_from_past_defaulted_end_is_no_matches() {
        let mut app = make_app();
        app.handle_key(shift(KeyCode::Right));
        app.handle_key(shift(KeyCode::Right));

        assert_eq!(app.selection.from, Some(date(2024, 3, 10)));
        assert_eq!(
            app.message.as_deref(),
            Some("no data for the selected filter combination")
        );
    }

    #[test]
    fn test_from_past_explicit_end_shows_error() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.selection.to, Some(date(2024, 2, 19)));

        app.handle_key(key(KeyCode::Up));
        app.handle_key(shift(KeyCode::Right));
        app.handle_key(shift(KeyCode::Right));

        assert!(app.rows.is_empty());
        let message = app.message.clone().unwrap();
        assert!(message.contains("is after end"), "{message}");
    }

    #[test]
    fn test_day_keys_ignored_on_site_rows() {
        let mut app = make_app();
        app.cursor = 2;
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.selection, FilterSelection::default());
    }

    #[test]
    fn test_reset_clears_filter() {
        let mut app = App::new(
            "dark",
            "UTC".to_string(),
            sample_dataset(),
            FilterSelection::new(Some(date(2024, 2, 1)), None, &["B".to_string()]),
        );
        assert!(app.rows.is_empty());

        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.selection, FilterSelection::default());
        assert_eq!(app.rows.len(), 2);
    }

    #[test]
    fn test_empty_dataset_shows_no_events() {
        let app = App::new("light", "UTC".to_string(), dataset(Vec::new()), Default::default());
        assert_eq!(
            app.message.as_deref(),
            Some("no plausible loading events in source")
        );
        assert!(app.window.is_empty());
    }

    // ── Reload ────────────────────────────────────────────────────────────────

    #[test]
    fn test_reload_keys_queue_requests() {
        let mut app = make_app();
        assert_eq!(app.take_reload_request(), None);

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.take_reload_request(), Some(ReloadRequest::Reload));
        assert_eq!(app.take_reload_request(), None);

        app.handle_key(shift(KeyCode::Char('R')));
        assert_eq!(app.take_reload_request(), Some(ReloadRequest::Rederive));
    }

    #[test]
    fn test_reload_with_same_dataset_reports_cache_reuse() {
        let mut app = make_app();
        let same = Arc::clone(&app.dataset);
        app.apply_reload(Ok(same));
        assert!(app.status.as_deref().unwrap().contains("unchanged"));
        assert_eq!(app.rows.len(), 2);
    }

    #[test]
    fn test_reload_keeps_filter_over_new_data() {
        let mut app = make_app();
        app.cursor = 3;
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.sites, vec!["A"]);

        let fresh = dataset(vec![Event::from_span(
            dt("2024-03-01 08:00"),
            dt("2024-03-01 09:30"),
            "A",
        )]);
        app.apply_reload(Ok(fresh));

        assert_eq!(app.status.as_deref(), Some("reloaded: 1 events"));
        assert_eq!(app.cursor, 2);
        assert_eq!(app.rows.len(), 1);
        assert_eq!(app.rows[0].total_overage_minutes, 60.0);
    }

    #[test]
    fn test_failed_reload_keeps_report() {
        let mut app = make_app();
        app.apply_reload(Err("HTTP 404".to_string()));
        assert_eq!(app.status.as_deref(), Some("reload failed: HTTP 404"));
        assert_eq!(app.rows.len(), 2);
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_render_every_view() {
        let mut app = make_app();
        for mode in ViewMode::ALL {
            app.view_mode = mode;
            let text = draw(&app);
            assert!(text.contains("DWELL TIME REPORT"));
            assert!(text.contains("2024-01-10 → 2024-02-20"));
            assert!(text.contains("Filter"));
        }
    }

    #[test]
    fn test_render_table_view_shows_month_key_and_panel() {
        let text = draw(&make_app());
        assert!(text.contains("2024-01"));
        assert!(text.contains("[x] A"));
        assert!(text.contains("2024-01-10 *"));
    }

    #[test]
    fn test_render_message_keeps_filter_panel() {
        let mut app = make_app();
        app.handle_key(key(KeyCode::Char('a')));
        let text = draw(&app);
        assert!(text.contains("no data for the selected filter combination"));
        assert!(text.contains("[ ] B"));
        assert!(!text.contains("Monthly KPIs"));
    }

    #[test]
    fn test_format_window() {
        let w = DateRange {
            start: date(2024, 2, 1),
            end: date(2024, 2, 29),
        };
        assert_eq!(format_window(&w), "2024-02-01 → 2024-02-29");
    }
}
