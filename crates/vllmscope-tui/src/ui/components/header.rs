use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout as RatatuiLayout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Widget},
};

use vllmscope_types::ConnectionState;

use crate::app::Screen;
use crate::ui::Theme;

/// Screen tabs plus the live connection badge
pub struct Header<'a> {
    current: Screen,
    connection: Option<(ConnectionState, Option<&'a str>)>,
    theme: Theme,
}

impl<'a> Header<'a> {
    pub fn new(current: Screen) -> Self {
        Self {
            current,
            connection: None,
            theme: Theme::default(),
        }
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Show the badge for the screen's stream
    pub fn connection(mut self, state: ConnectionState, error: Option<&'a str>) -> Self {
        self.connection = Some((state, error));
        self
    }

    fn badge(&self) -> Line<'a> {
        let theme = &self.theme;
        let Some((state, error)) = self.connection else {
            return Line::from(Span::styled("REST only ", theme.text_dim()));
        };

        let mut spans = vec![
            Span::styled("● ", Style::default().fg(state.color())),
            Span::styled(
                state.badge(),
                Style::default()
                    .fg(state.color())
                    .add_modifier(Modifier::BOLD),
            ),
        ];
        if let Some(err) = error {
            spans.push(Span::styled(" │ ", theme.text_dim()));
            spans.push(Span::styled(err, theme.error()));
        }
        spans.push(Span::raw(" "));
        Line::from(spans)
    }
}

impl Widget for Header<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = self.theme;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border())
            .title(Span::styled(" vllmscope ", theme.title()));
        let inner = block.inner(area);
        block.render(area, buf);

        let badge = self.badge();
        let badge_width = (badge.width() as u16).min(inner.width / 2);
        let chunks = RatatuiLayout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1), Constraint::Length(badge_width)])
            .split(inner);

        let titles = Screen::ALL
            .iter()
            .enumerate()
            .map(|(i, s)| Line::from(format!("{} {}", i + 1, s.title())));
        Tabs::new(titles)
            .select(self.current.index())
            .style(theme.text_dim())
            .highlight_style(theme.text_highlight())
            .divider(Span::styled("│", theme.text_dim()))
            .render(chunks[0], buf);

        Paragraph::new(badge)
            .alignment(Alignment::Right)
            .render(chunks[1], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(buf: &Buffer) -> String {
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
        }
        out
    }

    #[test]
    fn test_badge_shows_state_and_error() {
        let area = Rect::new(0, 0, 140, 3);
        let mut buf = Buffer::empty(area);
        Header::new(Screen::Logs)
            .connection(ConnectionState::Disconnected, Some("Connection error"))
            .render(area, &mut buf);

        let out = text(&buf);
        assert!(out.contains("Offline"));
        assert!(out.contains("Connection error"));
        assert!(out.contains("3 Logs"));
    }

    #[test]
    fn test_no_stream_badge() {
        let area = Rect::new(0, 0, 120, 3);
        let mut buf = Buffer::empty(area);
        Header::new(Screen::Profiles).render(area, &mut buf);
        assert!(text(&buf).contains("REST only"));
    }
}
