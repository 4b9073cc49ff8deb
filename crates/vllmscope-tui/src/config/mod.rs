//! Keybindings and persisted display settings

mod keybindings;
mod settings;

pub use keybindings::{KeyBinding, KeyBindings, KeyContext};
pub use settings::{
    DisplaySettings, LOG_BUFFER_SIZES, REFRESH_RATES_MS, SettingsError, SettingsStore, ThemeMode,
};
