use std::path::PathBuf;

use vllmscope_types::{ModelLaunchConfig, Severity};

use crate::app::Screen;

/// All possible actions in the application (command pattern)
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    // Navigation
    Navigate(Screen),
    NextScreen,
    PrevScreen,
    GoBack,
    Quit,

    // UI toggles
    ToggleHelp,

    // List navigation
    ListUp,
    ListDown,

    // Search/Filter in log viewer
    OpenSearch,
    CloseSearch,
    ApplySearch,
    SearchInput(char),
    SearchBackspace,
    SearchClear,
    ToggleLevel(Severity),
    ClearFilter,

    // Log viewer actions
    ScrollUp(usize),
    ScrollDown(usize),
    ScrollToTop,
    ScrollToBottom,
    PageUp,
    PageDown,
    ToggleAutoScroll,
    ToggleTimestamps,
    ToggleStats,
    ToggleHistory,
    ClearLogs,
    ExportLogs,
    LoadHistory,
    DownloadLogs,

    // Metrics
    NextMetric,
    PrevMetric,

    // Live stream
    Reconnect,

    // Backend operations
    Refresh,
    StartCluster,
    StopCluster,
    StopModel,
    LaunchProfile,
    ToggleFavorite,
    DeleteProfile,
    ExportProfiles,
    DeleteModel,
    DistributeModel,
    CancelDownload,
    ToggleInventoryView,
    LaunchModel,
    ReloadConfig,

    // Text prompt
    OpenPrompt(PromptKind),
    PromptInput(char),
    PromptBackspace,
    SubmitPrompt,
    CancelPrompt,

    // Display settings
    CycleTheme,
    CycleRefreshRate,
    CycleLogBufferSize,
    ResetSettings,

    // Confirmation prompt
    Confirm,
    CancelConfirm,

    // Notifications
    ShowError(String),
    ShowInfo(String),
    DismissNotification,

    // Tick (for periodic updates)
    Tick,

    // Render request
    Render,
}

/// A backend call the user asked for
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    StartCluster,
    StopCluster,
    StopModel,
    LaunchProfile { id: String, name: String },
    SetFavorite { id: String, favorite: bool },
    DeleteProfile { id: String, name: String },
    ExportProfiles,
    ImportProfiles(PathBuf),
    SaveProfile { name: String, config: ModelLaunchConfig },
    LaunchModel(ModelLaunchConfig),
    DownloadModel(String),
    DeleteModel(String),
    DistributeModel(String),
    CancelDownload(String),
    ReloadConfig,
    LoadLogHistory { lines: usize, level: Option<Severity> },
    DownloadLogs { lines: usize },
}

impl Request {
    /// Prompt to show before running this request, if it needs one
    pub fn confirmation(&self) -> Option<String> {
        match self {
            Self::StartCluster => Some("Start the cluster?".to_string()),
            Self::StopCluster => Some("Stop the cluster?".to_string()),
            Self::StopModel => Some("Stop the running model?".to_string()),
            Self::LaunchProfile { name, .. } => Some(format!("Launch profile '{}'?", name)),
            Self::DeleteProfile { name, .. } => Some(format!("Delete profile '{}'?", name)),
            Self::LaunchModel(config) => Some(format!(
                "Launch '{}' (tp {}, port {})?",
                config.model_id, config.tensor_parallel, config.port
            )),
            Self::DeleteModel(id) => Some(format!("Delete model '{}' from disk?", id)),
            _ => None,
        }
    }
}

/// What a text prompt collects
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    /// Hugging Face id of a model to download
    DownloadModel,
    /// Path of an exported profiles file
    ImportProfiles,
    /// Name for a profile saved from the running model
    SaveProfile,
}

impl PromptKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::DownloadModel => "Download model (Hugging Face id)",
            Self::ImportProfiles => "Import profiles from file",
            Self::SaveProfile => "Save running model as profile",
        }
    }
}

/// Display setting changes, applied through the settings store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsChange {
    CycleTheme,
    CycleRefreshRate,
    CycleLogBufferSize,
    Reset,
}

/// Work the event loop must do after an action updated the state
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Run a backend call
    Request(Request),
    /// The visible screen changed; remount its stream and polls
    ScreenChanged(Screen),
    /// Manually reconnect the visible stream
    Reconnect,
    /// Poll everything for the visible screen now
    Refresh,
    /// Drop the buffered stream messages
    ClearStream,
    /// Write the filtered log view to a file
    ExportLogs,
    UpdateSettings(SettingsChange),
}
