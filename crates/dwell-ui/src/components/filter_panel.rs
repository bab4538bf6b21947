use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::components::header::truncate_to_width;
use crate::themes::Theme;

/// Rows above the first site: the two window endpoints.
pub const ENDPOINT_ROWS: usize = 2;

/// Sidebar with the editable filter.
///
/// Cursor positions map onto rows as `0` = from, `1` = to, and
/// `ENDPOINT_ROWS + i` = the i-th site.
pub struct FilterPanel<'a> {
    pub from: &'a str,
    pub to: &'a str,
    /// Every site in the dataset with its checked state.
    pub sites: Vec<(&'a str, bool)>,
    pub cursor: usize,
    pub theme: &'a Theme,
}

impl<'a> FilterPanel<'a> {
    pub fn to_lines(&self, width: usize) -> Vec<Line<'a>> {
        let mut lines = vec![Line::from(Span::styled("Window", self.theme.header))];
        lines.push(self.row(0, format!("From  {}", self.from)));
        lines.push(self.row(1, format!("To    {}", self.to)));
        lines.push(Line::from(""));

        let checked = self.sites.iter().filter(|(_, on)| *on).count();
        lines.push(Line::from(Span::styled(
            format!("Sites {}/{}", checked, self.sites.len()),
            self.theme.header,
        )));
        for (i, (name, on)) in self.sites.iter().enumerate() {
            let mark = if *on { "[x]" } else { "[ ]" };
            let label = truncate_to_width(name, width.saturating_sub(6));
            lines.push(self.row(ENDPOINT_ROWS + i, format!("{mark} {label}")));
        }
        lines
    }

    /// Line index of the cursor within [`to_lines`](Self::to_lines).
    pub fn cursor_line(&self) -> usize {
        if self.cursor < ENDPOINT_ROWS {
            1 + self.cursor
        } else {
            // Title, two endpoints, spacer, sites title.
            5 + (self.cursor - ENDPOINT_ROWS)
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let inner_height = area.height.saturating_sub(2) as usize;
        let scroll = (self.cursor_line() + 1).saturating_sub(inner_height);
        let lines = self.to_lines(area.width.saturating_sub(2) as usize);
        frame.render_widget(
            Paragraph::new(lines)
                .scroll((scroll as u16, 0))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(self.theme.table_border)
                        .title(" Filter "),
                ),
            area,
        );
    }

    fn row(&self, index: usize, text: String) -> Line<'a> {
        if index == self.cursor {
            Line::from(vec![
                Span::styled("> ", self.theme.tab_active),
                Span::styled(text, self.theme.tab_active),
            ])
        } else {
            Line::from(vec![Span::raw("  "), Span::styled(text, self.theme.text)])
        }
    }
}
