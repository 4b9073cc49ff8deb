//! Application state and actions

mod action;
mod poll;
mod state;
mod streams;

pub use action::{Action, Effect, PromptKind, Request, SettingsChange};
pub use poll::{Poll, PollSchedule};
pub use state::{
    AppState, BackendData, FilterCache, InventoryView, LogSource, Notification, Prompt, Screen,
    UiState,
};
pub use streams::{ScreenStream, next_stream_event};
