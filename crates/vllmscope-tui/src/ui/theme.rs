use ratatui::style::{Color, Modifier, Style};

use vllmscope_types::Severity;

use crate::config::ThemeMode;

/// Color palette for the application, picked from the theme setting
///
/// `System` keeps the terminal's own colours so light and dark terminals
/// both work; `Light` and `Dark` paint an explicit background.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub fg_dim: Color,
    pub primary: Color,
    /// Text drawn on top of `primary`
    pub on_primary: Color,
    pub highlight: Color,
    /// Status bar background
    pub bar: Color,
}

impl Theme {
    // Status colors, shared by every palette
    pub const SUCCESS: Color = Color::Green;
    pub const WARNING: Color = Color::Yellow;
    pub const ERROR: Color = Color::Red;

    pub fn for_mode(mode: ThemeMode) -> Self {
        match mode {
            ThemeMode::Light => Self::light(),
            ThemeMode::Dark => Self::dark(),
            ThemeMode::System => Self::system(),
        }
    }

    pub fn system() -> Self {
        Self {
            bg: Color::Reset,
            fg: Color::Reset,
            fg_dim: Color::DarkGray,
            primary: Color::Cyan,
            on_primary: Color::Black,
            highlight: Color::Yellow,
            bar: Color::DarkGray,
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            fg_dim: Color::DarkGray,
            primary: Color::Cyan,
            on_primary: Color::Black,
            highlight: Color::Yellow,
            bar: Color::DarkGray,
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::White,
            fg: Color::Black,
            fg_dim: Color::Gray,
            primary: Color::Blue,
            on_primary: Color::White,
            highlight: Color::Magenta,
            bar: Color::Gray,
        }
    }

    /// Base style painted under the whole frame
    pub fn base(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    // Border styles
    pub fn border(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.primary)
    }

    // Text styles
    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn text_dim(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn text_highlight(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    // List styles
    pub fn list_item(&self) -> Style {
        Style::default().fg(self.fg)
    }

    pub fn list_item_selected(&self) -> Style {
        Style::default()
            .fg(self.on_primary)
            .bg(self.primary)
            .add_modifier(Modifier::BOLD)
    }

    pub fn list_item_marked(&self) -> Style {
        Style::default()
            .fg(Self::SUCCESS)
            .add_modifier(Modifier::BOLD)
    }

    // Status bar
    pub fn status_bar(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bar)
    }

    pub fn status_bar_key(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .bg(self.bar)
            .add_modifier(Modifier::BOLD)
    }

    pub fn status_bar_info(&self) -> Style {
        Style::default().fg(Color::Black).bg(Self::SUCCESS)
    }

    pub fn status_bar_error(&self) -> Style {
        Style::default()
            .fg(Color::White)
            .bg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    // Error
    pub fn error(&self) -> Style {
        Style::default()
            .fg(Self::ERROR)
            .add_modifier(Modifier::BOLD)
    }

    /// Healthy/unhealthy indicator
    pub fn health(&self, ok: bool) -> Style {
        if ok {
            Style::default().fg(Self::SUCCESS)
        } else {
            Style::default().fg(Self::ERROR)
        }
    }

    /// Level tag in the log viewer; unknown levels stay unstyled
    pub fn level_tag(&self, level: Severity) -> Style {
        match level {
            Severity::Unknown => self.text_dim(),
            _ => Style::default()
                .fg(level.color())
                .add_modifier(Modifier::BOLD),
        }
    }

    /// Message text, emphasized for the serious levels
    pub fn level_text(&self, level: Severity) -> Style {
        match level {
            Severity::Error | Severity::Critical => Style::default().fg(level.color()),
            Severity::Warning => Style::default().fg(Self::WARNING),
            Severity::Debug => self.text_dim(),
            Severity::Info | Severity::Unknown => self.text(),
        }
    }

    /// Search match highlight
    pub fn search_match(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::system()
    }
}
