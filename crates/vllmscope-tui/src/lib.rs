//! Terminal UI for vllmscope
//!
//! State and actions, keybindings and persisted display settings, terminal
//! event handling, and the screens that render the dashboard.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{
    Action, AppState, BackendData, Effect, InventoryView, LogSource, Poll, PollSchedule,
    PromptKind, Request, Screen, ScreenStream, SettingsChange, UiState, next_stream_event,
};
pub use config::{DisplaySettings, KeyBinding, KeyBindings, KeyContext, SettingsStore};
pub use tui::{Event, EventHandler, Tui};
pub use ui::screens::refresh_filtered_logs;
pub use ui::{Layout, Theme, render};
