use ratatui::{
    Frame,
    layout::Alignment,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::ui::{Layout, Theme};

/// Yes/no prompt shown before destructive requests
pub struct ConfirmDialog;

impl ConfirmDialog {
    pub fn render(frame: &mut Frame, prompt: &str, theme: &Theme) {
        let area = Layout::centered(frame.area(), 56, 7);
        frame.render_widget(Clear, area);

        let text = vec![
            Line::from(""),
            Line::from(Span::styled(prompt, theme.text())),
            Line::from(""),
            Line::from(vec![
                Span::styled("[y]", theme.text_highlight()),
                Span::styled(" Confirm   ", theme.text()),
                Span::styled("[n/Esc]", theme.text_highlight()),
                Span::styled(" Cancel", theme.text()),
            ]),
        ];

        let dialog = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(theme.base())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(theme.error())
                    .title(Span::styled(" Confirm ", theme.error())),
            );

        frame.render_widget(dialog, area);
    }
}
