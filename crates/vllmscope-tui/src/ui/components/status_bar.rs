use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

use crate::app::Notification;
use crate::ui::Theme;

/// Status bar showing keyboard shortcuts, or the current notification
pub struct StatusBar<'a> {
    hints: Vec<(&'a str, &'a str)>,
    right_text: Option<String>,
    notification: Option<&'a Notification>,
    theme: Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new() -> Self {
        Self {
            hints: Vec::new(),
            right_text: None,
            notification: None,
            theme: Theme::default(),
        }
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Add keyboard hints as (key, description) pairs
    pub fn hints<I>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        self.hints = hints.into_iter().collect();
        self
    }

    /// Set text to display on the right side
    pub fn right<S: Into<String>>(mut self, text: S) -> Self {
        self.right_text = Some(text.into());
        self
    }

    /// Show a notification in place of the hints
    pub fn notification(mut self, notification: Option<&'a Notification>) -> Self {
        self.notification = notification;
        self
    }
}

impl Default for StatusBar<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = self.theme;
        if let Some(n) = self.notification {
            let style = if n.is_error {
                theme.status_bar_error()
            } else {
                theme.status_bar_info()
            };
            buf.set_style(area, style);
            let prefix = if n.is_error { " ✗ " } else { " ✓ " };
            let line = Line::from(vec![
                Span::styled(prefix, style),
                Span::styled(n.message.as_str(), style),
            ]);
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        // Fill background
        buf.set_style(area, theme.status_bar());

        // Build hints
        let mut spans = Vec::new();
        for (i, (key, desc)) in self.hints.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", theme.status_bar()));
            }
            spans.push(Span::styled(format!("[{}]", key), theme.status_bar_key()));
            spans.push(Span::styled(format!(" {}", desc), theme.status_bar()));
        }

        let line = Line::from(spans);
        let line_width = line.width() as u16;

        // Render hints on the left
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        // Render right text if it fits
        if let Some(right) = self.right_text {
            let width = right.width() as u16;
            let right_x = area.x + area.width.saturating_sub(width + 2);
            if right_x > area.x + line_width + 2 {
                let right_span = Span::styled(right.as_str(), theme.status_bar());
                buf.set_span(right_x, area.y, &right_span, width);
            }
        }
    }
}

/// Default hints for list screens
pub fn list_nav_hints() -> Vec<(&'static str, &'static str)> {
    vec![("↑/k", "Up"), ("↓/j", "Down"), ("?", "Help"), ("q", "Quit")]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn row(buf: &Buffer) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn test_renders_hints_and_right_text() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        StatusBar::new()
            .hints([("q", "Quit")])
            .right("500 lines")
            .render(area, &mut buf);

        let text = row(&buf);
        assert!(text.contains("[q] Quit"));
        assert!(text.contains("500 lines"));
    }

    #[test]
    fn test_notification_replaces_hints() {
        let area = Rect::new(0, 0, 60, 1);
        let mut buf = Buffer::empty(area);
        let notification = Notification {
            message: "Connection lost".to_string(),
            is_error: true,
            created: Instant::now(),
        };
        StatusBar::new()
            .hints([("q", "Quit")])
            .notification(Some(&notification))
            .render(area, &mut buf);

        let text = row(&buf);
        assert!(text.contains("Connection lost"));
        assert!(!text.contains("Quit"));
    }

    #[test]
    fn test_bar_uses_palette() {
        let area = Rect::new(0, 0, 40, 1);
        let mut buf = Buffer::empty(area);
        StatusBar::new()
            .theme(Theme::light())
            .hints([("q", "Quit")])
            .render(area, &mut buf);
        assert_eq!(buf[(0, 0)].bg, Theme::light().bar);
        assert_eq!(buf[(0, 0)].fg, Theme::light().fg);
    }
}
