use ratatui::{
    Frame,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::Screen;
use crate::ui::{Layout, Theme};

const GLOBAL_KEYS: &[(&str, &str)] = &[
    ("Tab/S-Tab", "Next/previous screen"),
    ("1-6", "Jump to screen"),
    ("r", "Reconnect stream"),
    ("Ctrl+r", "Refresh data"),
    ("?", "Toggle this help"),
    ("Esc", "Go back"),
    ("q", "Quit"),
];

/// Help overlay showing keybindings for the current screen
pub struct HelpOverlay;

impl HelpOverlay {
    pub fn render(frame: &mut Frame, screen: Screen, theme: &Theme) {
        let mut help_text = vec![
            Line::from(Span::styled(
                "Keybindings",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
        ];

        help_text.push(Self::section(screen.title(), theme));
        help_text.extend(
            Self::screen_keys(screen)
                .iter()
                .map(|(key, desc)| Self::key_line(key, desc, theme)),
        );
        help_text.push(Line::from(""));

        help_text.push(Self::section("Global", theme));
        help_text.extend(
            GLOBAL_KEYS
                .iter()
                .map(|(key, desc)| Self::key_line(key, desc, theme)),
        );

        let height = help_text.len() as u16 + 2;
        let popup_area = Layout::centered(frame.area(), 54, height);

        // Clear the background
        frame.render_widget(Clear, popup_area);

        let help_widget = Paragraph::new(help_text).style(theme.base()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_focused())
                .title(Span::styled(" Help ", theme.title())),
        );

        frame.render_widget(help_widget, popup_area);
    }

    fn screen_keys(screen: Screen) -> &'static [(&'static str, &'static str)] {
        match screen {
            Screen::Overview => &[
                ("s", "Start cluster"),
                ("x", "Stop cluster"),
                ("m", "Stop model"),
                ("p", "Save running model as profile"),
            ],
            Screen::Metrics => &[("h/←", "Previous metric"), ("l/→", "Next metric")],
            Screen::Logs => &[
                ("j/k", "Scroll down/up"),
                ("Ctrl+d/u", "Page down/up"),
                ("g/G", "Top/bottom"),
                ("f", "Toggle follow mode"),
                ("t", "Toggle timestamps"),
                ("s", "Toggle stats bar"),
                ("/", "Search logs"),
                ("D I W E C", "Toggle level filter"),
                ("n", "Clear filters"),
                ("h", "Live/history view"),
                ("H", "Load history"),
                ("c", "Clear logs"),
                ("e", "Export view to file"),
                ("S", "Download server logs"),
            ],
            Screen::Inventory => &[
                ("j/k", "Move selection"),
                ("v", "Local/launchable models"),
                ("Enter", "Launch with defaults"),
                ("n", "Download a model"),
                ("d", "Delete model"),
                ("p", "Distribute to workers"),
                ("c", "Cancel download"),
            ],
            Screen::Profiles => &[
                ("j/k", "Move selection"),
                ("Enter", "Launch profile"),
                ("f", "Toggle favorite"),
                ("d", "Delete profile"),
                ("e", "Export profiles"),
                ("i", "Import profiles"),
            ],
            Screen::Settings => &[
                ("t", "Cycle theme"),
                ("f", "Cycle refresh rate"),
                ("b", "Cycle log buffer size"),
                ("R", "Reset to defaults"),
                ("l", "Reload backend config"),
            ],
        }
    }

    fn section<'a>(title: &'a str, theme: &Theme) -> Line<'a> {
        Line::from(Span::styled(title, theme.text_highlight()))
    }

    fn key_line<'a>(key: &'a str, desc: &'a str, theme: &Theme) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!("  {:>9}", key), Style::default().fg(Theme::SUCCESS)),
            Span::styled(format!("  {}", desc), theme.text()),
        ])
    }
}
