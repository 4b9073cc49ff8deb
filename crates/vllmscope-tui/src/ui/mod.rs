//! Rendering: one entry point dispatching to the visible screen

pub mod components;
mod layout;
pub mod screens;
mod theme;

pub use layout::Layout;
pub use theme::Theme;

use ratatui::{
    Frame,
    text::Span,
    widgets::{Block, Borders},
};

use crate::app::{AppState, Screen, ScreenStream};
use components::{ConfirmDialog, Header, HelpOverlay, InputPrompt, StatusBar};
use screens::{
    InventoryScreen, LogsScreen, MetricsScreen, OverviewScreen, ProfilesScreen, SettingsScreen,
};

/// Bordered panel with a styled title
pub(crate) fn panel<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border())
        .title(Span::styled(format!(" {} ", title), theme.title()))
}

/// Draw the whole frame for the current state, in the palette of its theme setting
pub fn render(frame: &mut Frame, state: &mut AppState, stream: Option<&ScreenStream>) {
    let theme = Theme::for_mode(state.settings.theme);
    frame.render_widget(Block::default().style(theme.base()), frame.area());

    let (header_area, content_area, status_area) = Layout::main(frame.area());

    let mut header = Header::new(state.current_screen).theme(theme);
    if let Some(stream) = stream {
        header = header.connection(stream.state(), stream.connection_error());
    }
    frame.render_widget(header, header_area);

    let metrics = stream.and_then(|s| s.metrics());
    let (hints, right) = match state.current_screen {
        Screen::Overview => {
            OverviewScreen::render(frame, content_area, state, metrics, &theme);
            (OverviewScreen::hints(), None)
        }
        Screen::Metrics => {
            MetricsScreen::render(frame, content_area, state, metrics, &theme);
            (MetricsScreen::hints(), None)
        }
        Screen::Logs => {
            let logs = stream.and_then(|s| s.logs());
            LogsScreen::render(frame, content_area, state, logs, &theme);
            (LogsScreen::hints(state), Some(LogsScreen::status_text(state)))
        }
        Screen::Inventory => {
            InventoryScreen::render(frame, content_area, state, &theme);
            (InventoryScreen::hints(state), None)
        }
        Screen::Profiles => {
            ProfilesScreen::render(frame, content_area, state, &theme);
            (ProfilesScreen::hints(), None)
        }
        Screen::Settings => {
            SettingsScreen::render(frame, content_area, state, &theme);
            (SettingsScreen::hints(), None)
        }
    };

    let mut status = StatusBar::new()
        .theme(theme)
        .hints(hints)
        .notification(state.ui_state.notification.as_ref());
    if let Some(right) = right {
        status = status.right(right);
    }
    frame.render_widget(status, status_area);

    if let Some(prompt) = state.ui_state.confirm.as_ref().and_then(|r| r.confirmation()) {
        ConfirmDialog::render(frame, &prompt, &theme);
    } else if let Some(prompt) = state.ui_state.prompt.as_ref() {
        InputPrompt::render(frame, prompt, &theme);
    } else if state.ui_state.help_visible {
        HelpOverlay::render(frame, state.current_screen, &theme);
    }
}
