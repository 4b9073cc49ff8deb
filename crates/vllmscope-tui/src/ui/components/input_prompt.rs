use ratatui::{
    Frame,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::Prompt;
use crate::ui::{Layout, Theme};

/// Single-line text input drawn over the screen
pub struct InputPrompt;

impl InputPrompt {
    pub fn render(frame: &mut Frame, prompt: &Prompt, theme: &Theme) {
        let area = Layout::centered(frame.area(), 60, 6);
        frame.render_widget(Clear, area);

        let text = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled(" > ", theme.text_highlight()),
                Span::styled(prompt.input.as_str(), theme.text()),
                Span::styled("█", theme.text_dim()),
            ]),
            Line::from(""),
            Line::from(Span::styled(" [Enter] Submit  [Esc] Cancel", theme.text_dim())),
        ];

        let widget = Paragraph::new(text).style(theme.base()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_focused())
                .title(Span::styled(format!(" {} ", prompt.kind.title()), theme.title())),
        );

        frame.render_widget(widget, area);
    }
}
