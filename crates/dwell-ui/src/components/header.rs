use crate::themes::Theme;
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub const TITLE: &str = "DWELL TIME REPORT";

/// Minimum width of the `=` separator line.
const SEPARATOR_WIDTH: usize = 60;

/// Widest the site list may grow before it is cut with an ellipsis.
const MAX_SITES_WIDTH: usize = 40;

/// Report header rendering four lines:
///
/// 1. Application title.
/// 2. A `=` separator at least 60 columns wide.
/// 3. Filter context in `[ from → to | sites | timezone ]` format.
/// 4. An empty line.
pub struct Header<'a> {
    /// Display text for the filter window, e.g. `"2024-01-01 → 2024-03-31"`.
    pub window: &'a str,
    pub sites: &'a [String],
    pub timezone: &'a str,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(window: &'a str, sites: &'a [String], timezone: &'a str, theme: &'a Theme) -> Self {
        Self {
            window,
            sites,
            timezone,
            theme,
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let info = vec![
            Span::styled("[ ", self.theme.label),
            Span::styled(self.window.to_string(), self.theme.value),
            Span::styled(" | ", self.theme.label),
            Span::styled(self.sites_text(), self.theme.value),
            Span::styled(" | ", self.theme.label),
            Span::styled(self.timezone.to_string(), self.theme.value),
            Span::styled(" ]", self.theme.label),
        ];
        let info_width: usize = info.iter().map(|s| s.content.width()).sum();
        let separator = "=".repeat(info_width.max(SEPARATOR_WIDTH));

        vec![
            Line::from(Span::styled(TITLE, self.theme.header)),
            Line::from(Span::styled(separator, self.theme.separator)),
            Line::from(info),
            Line::from(""),
        ]
    }

    fn sites_text(&self) -> String {
        match self.sites.len() {
            0 => "no sites".to_string(),
            1 => truncate_to_width(&self.sites[0], MAX_SITES_WIDTH),
            n => truncate_to_width(
                &format!("{n} sites: {}", self.sites.join(", ")),
                MAX_SITES_WIDTH,
            ),
        }
    }
}

/// Cut `text` so it occupies at most `max` terminal columns, marking the cut
/// with `…`.
pub fn truncate_to_width(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn sites(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_header_layout() {
        let theme = Theme::dark();
        let s = sites(&["Nord"]);
        let header = Header::new("2024-01-01 → 2024-03-31", &s, "UTC", &theme);
        let lines = header.to_lines();

        assert_eq!(lines.len(), 4);
        assert_eq!(line_text(&lines[0]), TITLE);
        assert_eq!(line_text(&lines[1]).chars().count(), 60);
        assert_eq!(line_text(&lines[2]), "[ 2024-01-01 → 2024-03-31 | Nord | UTC ]");
        assert!(line_text(&lines[3]).is_empty());
    }

    #[test]
    fn test_header_lists_multiple_sites() {
        let theme = Theme::dark();
        let s = sites(&["Nord", "Süd"]);
        let lines = Header::new("w", &s, "Europe/Berlin", &theme).to_lines();
        assert!(line_text(&lines[2]).contains("2 sites: Nord, Süd"));
    }

    #[test]
    fn test_separator_grows_with_long_info_line() {
        let theme = Theme::dark();
        let s = sites(&["A very long depot name that keeps on going"]);
        let lines = Header::new("2024-01-01 → 2024-12-31", &s, "America/Argentina/Buenos_Aires", &theme)
            .to_lines();
        let info_width = line_text(&lines[2]).width();
        assert_eq!(line_text(&lines[1]).width(), info_width.max(60));
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("abcdefghij", 5), "abcd…");
        // Wide characters count double.
        assert_eq!(truncate_to_width("日本語テキスト", 6), "日本…");
    }
}
