use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Refresh rates offered when cycling, in milliseconds
pub const REFRESH_RATES_MS: [u64; 4] = [1000, 2000, 5000, 10_000];

/// Fastest refresh rate accepted from the settings file
pub const MIN_REFRESH_RATE_MS: u64 = 1000;

/// Log buffer sizes offered when cycling
pub const LOG_BUFFER_SIZES: [usize; 4] = [500, 1000, 2000, 5000];

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Colour scheme preference
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

impl ThemeMode {
    pub fn next(&self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::System,
            Self::System => Self::Light,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

/// User display preferences, persisted between runs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub theme: ThemeMode,
    /// Poll interval for cluster and model status
    pub metrics_refresh_rate_ms: u64,
    /// Capacity of the live log buffer
    pub log_buffer_size: usize,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            theme: ThemeMode::System,
            metrics_refresh_rate_ms: 5000,
            log_buffer_size: 2000,
        }
    }
}

impl DisplaySettings {
    /// Step to the next offered refresh rate
    pub fn cycle_refresh_rate(&mut self) {
        self.metrics_refresh_rate_ms = next_in(&REFRESH_RATES_MS, self.metrics_refresh_rate_ms);
    }

    /// Pull hand-edited values back into the accepted range
    fn clamp(&mut self) {
        if self.metrics_refresh_rate_ms < MIN_REFRESH_RATE_MS {
            tracing::warn!(
                requested = self.metrics_refresh_rate_ms,
                "refresh rate too fast, using {MIN_REFRESH_RATE_MS} ms"
            );
            self.metrics_refresh_rate_ms = MIN_REFRESH_RATE_MS;
        }
    }

    /// Step to the next offered log buffer size
    pub fn cycle_log_buffer_size(&mut self) {
        self.log_buffer_size = next_in(&LOG_BUFFER_SIZES, self.log_buffer_size);
    }
}

/// The value after `current` in `options`, wrapping; the first one if absent
fn next_in<T: Copy + PartialEq>(options: &[T], current: T) -> T {
    match options.iter().position(|v| *v == current) {
        Some(i) => options[(i + 1) % options.len()],
        None => options[0],
    }
}

/// Owns the display settings and their file
///
/// Created once at startup and handed to whoever needs it.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: DisplaySettings,
}

impl SettingsStore {
    /// `<config dir>/vllmscope/settings.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vllmscope").join("settings.toml"))
    }

    /// Load settings from `path`; a missing file yields defaults
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();

        let mut settings: DisplaySettings = match fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).map_err(|source| SettingsError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                DisplaySettings::default()
            }
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        settings.clamp();

        Ok(Self { path, settings })
    }

    pub fn settings(&self) -> &DisplaySettings {
        &self.settings
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the current settings, creating parent directories as needed
    pub fn save(&self) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = toml::to_string_pretty(&self.settings)?;
        fs::write(&self.path, contents).map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), "saved settings");
        Ok(())
    }

    /// Modify the settings and persist them
    pub fn update<F>(&mut self, f: F) -> Result<(), SettingsError>
    where
        F: FnOnce(&mut DisplaySettings),
    {
        f(&mut self.settings);
        self.save()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), SettingsError> {
        self.update(|s| *s = DisplaySettings::default())
    }
}
