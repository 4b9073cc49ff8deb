use std::time::{Duration, Instant};

use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use vllmscope_stream::{LogFilter, MetricKind};
use vllmscope_types::{
    AvailableModel, AvailableModelList, ClusterConfig, ClusterStatus, DownloadState,
    DownloadStatus, LocalModelList, LogRecord, ModelLaunchConfig, ModelStatus, NodeStatus, Profile,
    Severity,
};

use super::{Action, Effect, PromptKind, Request, SettingsChange};
use crate::config::DisplaySettings;

/// How long a notification stays on screen
const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Lines requested when loading log history
pub const HISTORY_LINES: usize = 500;

/// Lines requested when downloading the server log file
pub const DOWNLOAD_LINES: usize = 1000;

/// Rows moved by page up/down
const PAGE_SIZE: usize = 20;

/// Back navigation depth
const MAX_SCREEN_STACK: usize = 16;

/// Screen enumeration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Screen {
    #[default]
    Overview,
    Metrics,
    Logs,
    Inventory,
    Profiles,
    Settings,
}

impl Screen {
    pub const ALL: [Screen; 6] = [
        Self::Overview,
        Self::Metrics,
        Self::Logs,
        Self::Inventory,
        Self::Profiles,
        Self::Settings,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Self::Overview => "Overview",
            Self::Metrics => "Metrics",
            Self::Logs => "Logs",
            Self::Inventory => "Inventory",
            Self::Profiles => "Profiles",
            Self::Settings => "Settings",
        }
    }

    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    pub fn next(&self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Where the log viewer reads records from
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogSource {
    /// The live log stream buffer
    #[default]
    Live,
    /// Records fetched from the history endpoint
    History,
}

impl LogSource {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::History => "history",
        }
    }
}

/// Which list the inventory screen shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InventoryView {
    /// Models downloaded to the cluster
    #[default]
    Local,
    /// Models the backend offers to launch
    Launchable,
}

impl InventoryView {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Launchable => "launchable",
        }
    }
}

/// Single-line text input shown over the screen
#[derive(Clone, Debug, PartialEq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub input: String,
}

/// Transient message shown in the status bar
#[derive(Clone, Debug)]
pub struct Notification {
    pub message: String,
    pub is_error: bool,
    pub created: Instant,
}

/// Cache for filtered log results to avoid re-filtering on every render
#[derive(Default)]
pub struct FilterCache {
    /// Filter the cache was built with
    cached_filter: Option<LogFilter>,
    /// Source the cache was built from
    cached_source: LogSource,
    /// Log generation when cache was built
    cached_generation: u64,
    /// The cached filtered entries
    pub cached_entries: Vec<LogRecord>,
    /// Whether cache is valid
    pub is_valid: bool,
}

impl FilterCache {
    /// Check if cache needs to be rebuilt for the current view
    pub fn needs_refresh(&self, filter: &LogFilter, source: LogSource, generation: u64) -> bool {
        !self.is_valid
            || self.cached_generation != generation
            || self.cached_source != source
            || self.cached_filter.as_ref() != Some(filter)
    }

    /// Update the cache with new filtered results
    pub fn update(
        &mut self,
        filter: &LogFilter,
        source: LogSource,
        generation: u64,
        entries: Vec<LogRecord>,
    ) {
        self.cached_filter = Some(filter.clone());
        self.cached_source = source;
        self.cached_generation = generation;
        self.cached_entries = entries;
        self.is_valid = true;
    }

    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }
}

/// UI-specific transient state
pub struct UiState {
    /// Is help overlay visible?
    pub help_visible: bool,

    /// List state for inventory and profile lists
    pub list_state: ListState,

    /// Status bar message (if any)
    pub notification: Option<Notification>,

    /// Request waiting for the user to confirm
    pub confirm: Option<Request>,

    /// Open text prompt, if any
    pub prompt: Option<Prompt>,

    /// Local or launchable models on the inventory screen
    pub inventory_view: InventoryView,

    /// Is the log search bar active?
    pub search_active: bool,

    /// Current search input text
    pub search_input: String,

    /// Level and search filter over the log view
    pub log_filter: LogFilter,

    /// Scroll position in log viewer
    pub log_scroll: usize,

    /// Auto-scroll enabled (follow mode)?
    pub auto_scroll: bool,

    /// Show timestamps in log viewer?
    pub show_timestamps: bool,

    /// Show statistics bar?
    pub stats_visible: bool,

    /// Live stream or loaded history
    pub log_source: LogSource,

    /// Metric plotted on the metrics screen
    pub metric_kind: MetricKind,

    /// Cache for filtered log results
    pub filter_cache: FilterCache,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            help_visible: false,
            list_state: ListState::default(),
            notification: None,
            confirm: None,
            prompt: None,
            inventory_view: InventoryView::Local,
            search_active: false,
            search_input: String::new(),
            log_filter: LogFilter::default(),
            log_scroll: 0,
            auto_scroll: true,
            show_timestamps: true,
            stats_visible: true,
            log_source: LogSource::Live,
            metric_kind: MetricKind::Throughput,
            filter_cache: FilterCache::default(),
        }
    }
}

/// Latest responses from the REST endpoints
#[derive(Default)]
pub struct BackendData {
    pub cluster: Option<ClusterStatus>,
    pub nodes: Option<NodeStatus>,
    pub uptime: Option<String>,
    pub model_status: Option<ModelStatus>,
    pub running_config: Option<ModelLaunchConfig>,
    pub models: Option<LocalModelList>,
    pub available_models: Option<AvailableModelList>,
    pub download_status: Option<DownloadStatus>,
    pub profiles: Vec<Profile>,
    pub config: Option<ClusterConfig>,
    pub log_history: Vec<LogRecord>,
}

/// Global application state
pub struct AppState {
    /// Current screen being displayed
    pub current_screen: Screen,

    /// Navigation stack for back navigation
    pub screen_stack: Vec<Screen>,

    /// UI state
    pub ui_state: UiState,

    /// REST data for the screens
    pub backend: BackendData,

    /// Display preferences (owned by the settings store, mirrored here)
    pub settings: DisplaySettings,

    /// Whether app should quit
    pub should_quit: bool,

    /// Channel sender for async actions
    pub action_tx: mpsc::UnboundedSender<Action>,

    /// Dirty flag for rendering - only render when true
    pub render_dirty: bool,

    /// Bumped whenever the log records behind the viewer change
    pub log_generation: u64,
}

impl AppState {
    pub fn new(action_tx: mpsc::UnboundedSender<Action>, settings: DisplaySettings) -> Self {
        let mut ui_state = UiState::default();
        ui_state.list_state.select(Some(0));

        Self {
            current_screen: Screen::Overview,
            screen_stack: Vec::new(),
            ui_state,
            backend: BackendData::default(),
            settings,
            should_quit: false,
            action_tx,
            render_dirty: true, // Start dirty to ensure initial render
            log_generation: 0,
        }
    }

    /// Navigate to a new screen, pushing current to stack
    pub fn navigate_to(&mut self, screen: Screen) -> bool {
        if screen == self.current_screen {
            return false;
        }
        self.screen_stack.push(self.current_screen);
        if self.screen_stack.len() > MAX_SCREEN_STACK {
            self.screen_stack.remove(0);
        }
        self.enter(screen);
        true
    }

    /// Go back to previous screen
    pub fn go_back(&mut self) -> bool {
        if let Some(prev_screen) = self.screen_stack.pop() {
            self.enter(prev_screen);
            true
        } else {
            false
        }
    }

    fn enter(&mut self, screen: Screen) {
        self.current_screen = screen;
        self.ui_state.list_state.select(Some(0));
        self.ui_state.search_active = false;
        self.ui_state.log_scroll = 0;
        self.ui_state.auto_scroll = true;
        self.ui_state.filter_cache.invalidate();
    }

    /// Get the current list length based on screen
    pub fn current_list_len(&self) -> usize {
        match self.current_screen {
            Screen::Inventory => match self.ui_state.inventory_view {
                InventoryView::Local => self
                    .backend
                    .models
                    .as_ref()
                    .map(|m| m.models.len())
                    .unwrap_or(0),
                InventoryView::Launchable => self
                    .backend
                    .available_models
                    .as_ref()
                    .map(|m| m.models.len())
                    .unwrap_or(0),
            },
            Screen::Profiles => self.backend.profiles.len(),
            _ => 0,
        }
    }

    /// Move selection up
    pub fn list_up(&mut self) {
        let len = self.current_list_len();
        if len == 0 {
            return;
        }

        let i = match self.ui_state.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.ui_state.list_state.select(Some(i));
    }

    /// Move selection down
    pub fn list_down(&mut self) {
        let len = self.current_list_len();
        if len == 0 {
            return;
        }

        let i = match self.ui_state.list_state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.ui_state.list_state.select(Some(i));
    }

    /// Keep the selection inside the list after it was reloaded
    pub fn clamp_selection(&mut self) {
        let len = self.current_list_len();
        match self.ui_state.list_state.selected() {
            Some(i) if len > 0 && i >= len => self.ui_state.list_state.select(Some(len - 1)),
            None if len > 0 => self.ui_state.list_state.select(Some(0)),
            _ => {}
        }
    }

    /// Get currently selected index
    pub fn selected_index(&self) -> Option<usize> {
        self.ui_state.list_state.selected()
    }

    pub fn selected_profile(&self) -> Option<&Profile> {
        self.backend.profiles.get(self.selected_index()?)
    }

    /// Selected downloaded model; None while the launchable list is shown
    pub fn selected_model_id(&self) -> Option<&str> {
        if self.ui_state.inventory_view != InventoryView::Local {
            return None;
        }
        let models = self.backend.models.as_ref()?;
        models.models.get(self.selected_index()?).map(|m| m.id.as_str())
    }

    /// Selected launchable model; None while the local list is shown
    pub fn selected_available_model(&self) -> Option<&AvailableModel> {
        if self.ui_state.inventory_view != InventoryView::Launchable {
            return None;
        }
        let models = self.backend.available_models.as_ref()?;
        models.models.get(self.selected_index()?)
    }

    /// Show an error message
    pub fn show_error(&mut self, msg: impl Into<String>) {
        self.notify(msg.into(), true);
    }

    /// Show an informational message
    pub fn show_info(&mut self, msg: impl Into<String>) {
        self.notify(msg.into(), false);
    }

    fn notify(&mut self, message: String, is_error: bool) {
        self.ui_state.notification = Some(Notification {
            message,
            is_error,
            created: Instant::now(),
        });
        self.render_dirty = true;
    }

    /// Dismiss the notification
    pub fn dismiss_notification(&mut self) {
        self.ui_state.notification = None;
    }

    /// Drop the notification once it is older than its lifetime
    pub fn expire_notification(&mut self, now: Instant) {
        let expired = self
            .ui_state
            .notification
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.created) >= NOTIFICATION_TTL);
        if expired {
            self.ui_state.notification = None;
            self.render_dirty = true;
        }
    }

    /// Records behind the log viewer changed
    pub fn logs_changed(&mut self) {
        self.log_generation = self.log_generation.wrapping_add(1);
        self.render_dirty = true;
    }

    /// Level to pass to the history endpoint: set when exactly one is selected
    pub fn history_level(&self) -> Option<Severity> {
        let levels = self.ui_state.log_filter.levels();
        if levels.len() == 1 {
            levels.iter().next().copied()
        } else {
            None
        }
    }

    /// Queue a request, asking for confirmation first when it needs it
    pub fn submit(&mut self, request: Request) -> Option<Effect> {
        if request.confirmation().is_some() {
            self.ui_state.confirm = Some(request);
            None
        } else {
            Some(Effect::Request(request))
        }
    }

    /// Turn the prompt text into the request it collects
    fn submit_prompt(&mut self) -> Option<Effect> {
        let prompt = self.ui_state.prompt.take()?;
        let input = prompt.input.trim();
        if input.is_empty() {
            return None;
        }

        match prompt.kind {
            PromptKind::DownloadModel => self.submit(Request::DownloadModel(input.to_string())),
            PromptKind::ImportProfiles => self.submit(Request::ImportProfiles(input.into())),
            PromptKind::SaveProfile => match self.backend.running_config.clone() {
                Some(config) => self.submit(Request::SaveProfile {
                    name: input.to_string(),
                    config,
                }),
                None => {
                    self.show_error("No model is running");
                    None
                }
            },
        }
    }

    fn set_search(&mut self) {
        let input = self.ui_state.search_input.clone();
        self.ui_state.log_filter.set_search(&input);
        self.ui_state.log_scroll = 0;
    }

    /// Apply an action to the state and report the work left for the event loop
    pub fn update(&mut self, action: Action) -> Option<Effect> {
        if action != Action::Tick {
            self.render_dirty = true;
        }

        match action {
            Action::Quit => {
                self.should_quit = true;
                None
            }
            Action::Navigate(screen) => self
                .navigate_to(screen)
                .then_some(Effect::ScreenChanged(screen)),
            Action::NextScreen => {
                let screen = self.current_screen.next();
                self.navigate_to(screen);
                Some(Effect::ScreenChanged(screen))
            }
            Action::PrevScreen => {
                let screen = self.current_screen.prev();
                self.navigate_to(screen);
                Some(Effect::ScreenChanged(screen))
            }
            Action::GoBack => {
                if self.ui_state.help_visible {
                    self.ui_state.help_visible = false;
                    None
                } else if self.ui_state.confirm.is_some() {
                    self.ui_state.confirm = None;
                    None
                } else if self.ui_state.prompt.is_some() {
                    self.ui_state.prompt = None;
                    None
                } else if self.go_back() {
                    Some(Effect::ScreenChanged(self.current_screen))
                } else {
                    self.should_quit = true;
                    None
                }
            }
            Action::ToggleHelp => {
                self.ui_state.help_visible = !self.ui_state.help_visible;
                None
            }

            Action::ListUp => {
                self.list_up();
                None
            }
            Action::ListDown => {
                self.list_down();
                None
            }

            // Filter/Search actions
            Action::OpenSearch => {
                self.ui_state.search_active = true;
                self.ui_state.search_input = self.ui_state.log_filter.search().to_string();
                None
            }
            Action::ApplySearch => {
                self.ui_state.search_active = false;
                None
            }
            Action::CloseSearch => {
                self.ui_state.search_active = false;
                self.ui_state.search_input.clear();
                self.set_search();
                None
            }
            Action::SearchInput(c) => {
                self.ui_state.search_input.push(c);
                self.set_search();
                None
            }
            Action::SearchBackspace => {
                self.ui_state.search_input.pop();
                self.set_search();
                None
            }
            Action::SearchClear => {
                self.ui_state.search_input.clear();
                self.set_search();
                None
            }
            Action::ToggleLevel(level) => {
                self.ui_state.log_filter.toggle_level(level);
                self.ui_state.log_scroll = 0;
                None
            }
            Action::ClearFilter => {
                self.ui_state.log_filter.clear();
                self.ui_state.search_input.clear();
                self.ui_state.log_scroll = 0;
                None
            }

            // Log viewer actions
            Action::ScrollUp(n) => {
                self.ui_state.auto_scroll = false;
                self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(n);
                None
            }
            Action::ScrollDown(n) => {
                self.ui_state.auto_scroll = false;
                // Render clamps to the filtered count
                self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(n);
                None
            }
            Action::PageUp => {
                self.ui_state.auto_scroll = false;
                self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_sub(PAGE_SIZE);
                None
            }
            Action::PageDown => {
                self.ui_state.auto_scroll = false;
                self.ui_state.log_scroll = self.ui_state.log_scroll.saturating_add(PAGE_SIZE);
                None
            }
            Action::ScrollToTop => {
                self.ui_state.auto_scroll = false;
                self.ui_state.log_scroll = 0;
                None
            }
            Action::ScrollToBottom => {
                self.ui_state.auto_scroll = false;
                self.ui_state.log_scroll = usize::MAX;
                None
            }
            Action::ToggleAutoScroll => {
                self.ui_state.auto_scroll = !self.ui_state.auto_scroll;
                None
            }
            Action::ToggleTimestamps => {
                self.ui_state.show_timestamps = !self.ui_state.show_timestamps;
                None
            }
            Action::ToggleStats => {
                self.ui_state.stats_visible = !self.ui_state.stats_visible;
                None
            }
            Action::ToggleHistory => {
                self.ui_state.log_source = match self.ui_state.log_source {
                    LogSource::Live => LogSource::History,
                    LogSource::History => LogSource::Live,
                };
                self.ui_state.log_scroll = 0;
                self.ui_state.auto_scroll = true;
                None
            }
            Action::ClearLogs => {
                self.ui_state.log_scroll = 0;
                match self.ui_state.log_source {
                    LogSource::Live => Some(Effect::ClearStream),
                    LogSource::History => {
                        self.backend.log_history.clear();
                        self.logs_changed();
                        None
                    }
                }
            }
            Action::ExportLogs => Some(Effect::ExportLogs),
            Action::LoadHistory => self.submit(Request::LoadLogHistory {
                lines: HISTORY_LINES,
                level: self.history_level(),
            }),
            Action::DownloadLogs => self.submit(Request::DownloadLogs {
                lines: DOWNLOAD_LINES,
            }),

            Action::NextMetric => {
                self.ui_state.metric_kind = self.ui_state.metric_kind.next();
                None
            }
            Action::PrevMetric => {
                self.ui_state.metric_kind = self.ui_state.metric_kind.prev();
                None
            }

            Action::Reconnect => Some(Effect::Reconnect),
            Action::Refresh => Some(Effect::Refresh),

            Action::StartCluster => self.submit(Request::StartCluster),
            Action::StopCluster => self.submit(Request::StopCluster),
            Action::StopModel => self.submit(Request::StopModel),
            Action::LaunchProfile => {
                let request = self.selected_profile().map(|p| Request::LaunchProfile {
                    id: p.id.clone(),
                    name: p.name.clone(),
                })?;
                self.submit(request)
            }
            Action::ToggleFavorite => {
                let request = self.selected_profile().map(|p| Request::SetFavorite {
                    id: p.id.clone(),
                    favorite: !p.favorite,
                })?;
                self.submit(request)
            }
            Action::DeleteProfile => {
                let request = self.selected_profile().map(|p| Request::DeleteProfile {
                    id: p.id.clone(),
                    name: p.name.clone(),
                })?;
                self.submit(request)
            }
            Action::ExportProfiles => self.submit(Request::ExportProfiles),
            Action::DeleteModel => {
                let id = self.selected_model_id()?.to_string();
                self.submit(Request::DeleteModel(id))
            }
            Action::DistributeModel => {
                let id = self.selected_model_id()?.to_string();
                self.submit(Request::DistributeModel(id))
            }
            Action::CancelDownload => {
                let id = self
                    .backend
                    .download_status
                    .as_ref()
                    .filter(|d| d.status == DownloadState::Downloading)
                    .map(|d| d.model_id.clone())?;
                self.submit(Request::CancelDownload(id))
            }
            Action::ToggleInventoryView => {
                self.ui_state.inventory_view = match self.ui_state.inventory_view {
                    InventoryView::Local => InventoryView::Launchable,
                    InventoryView::Launchable => InventoryView::Local,
                };
                self.ui_state.list_state.select(Some(0));
                None
            }
            Action::LaunchModel => {
                if self.ui_state.inventory_view == InventoryView::Local {
                    self.show_info("Press v to pick from the launchable models");
                    return None;
                }
                let config = self
                    .selected_available_model()
                    .map(|m| ModelLaunchConfig::new(m.id.clone()))?;
                self.submit(Request::LaunchModel(config))
            }
            Action::ReloadConfig => self.submit(Request::ReloadConfig),

            Action::OpenPrompt(kind) => {
                self.ui_state.prompt = Some(Prompt {
                    kind,
                    input: String::new(),
                });
                None
            }
            Action::PromptInput(c) => {
                if let Some(prompt) = self.ui_state.prompt.as_mut() {
                    prompt.input.push(c);
                }
                None
            }
            Action::PromptBackspace => {
                if let Some(prompt) = self.ui_state.prompt.as_mut() {
                    prompt.input.pop();
                }
                None
            }
            Action::SubmitPrompt => self.submit_prompt(),
            Action::CancelPrompt => {
                self.ui_state.prompt = None;
                None
            }

            Action::CycleTheme => Some(Effect::UpdateSettings(SettingsChange::CycleTheme)),
            Action::CycleRefreshRate => {
                Some(Effect::UpdateSettings(SettingsChange::CycleRefreshRate))
            }
            Action::CycleLogBufferSize => {
                Some(Effect::UpdateSettings(SettingsChange::CycleLogBufferSize))
            }
            Action::ResetSettings => Some(Effect::UpdateSettings(SettingsChange::Reset)),

            Action::Confirm => self.ui_state.confirm.take().map(Effect::Request),
            Action::CancelConfirm => {
                self.ui_state.confirm = None;
                None
            }

            Action::ShowError(msg) => {
                self.show_error(msg);
                None
            }
            Action::ShowInfo(msg) => {
                self.show_info(msg);
                None
            }
            Action::DismissNotification => {
                self.dismiss_notification();
                None
            }
            Action::Tick => {
                self.expire_notification(Instant::now());
                None
            }
            Action::Render => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vllmscope_types::{AvailableModel, DownloadStatus, LocalModel};

    fn state() -> AppState {
        let (tx, _rx) = mpsc::unbounded_channel();
        AppState::new(tx, DisplaySettings::default())
    }

    fn profile(id: &str, favorite: bool) -> Profile {
        Profile {
            id: id.to_string(),
            name: format!("profile {}", id),
            description: None,
            model_id: "Qwen/Qwen2.5-7B".to_string(),
            config: ModelLaunchConfig::new("Qwen/Qwen2.5-7B"),
            favorite,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_navigation_and_back() {
        let mut state = state();
        assert_eq!(
            state.update(Action::Navigate(Screen::Logs)),
            Some(Effect::ScreenChanged(Screen::Logs))
        );
        assert_eq!(state.update(Action::Navigate(Screen::Logs)), None);

        assert_eq!(
            state.update(Action::GoBack),
            Some(Effect::ScreenChanged(Screen::Overview))
        );
        assert_eq!(state.update(Action::GoBack), None);
        assert!(state.should_quit);
    }

    #[test]
    fn test_tab_cycles_screens() {
        let mut state = state();
        state.update(Action::PrevScreen);
        assert_eq!(state.current_screen, Screen::Settings);
        state.update(Action::NextScreen);
        assert_eq!(state.current_screen, Screen::Overview);
    }

    #[test]
    fn test_screen_stack_is_bounded() {
        let mut state = state();
        for _ in 0..40 {
            state.update(Action::NextScreen);
        }
        assert!(state.screen_stack.len() <= MAX_SCREEN_STACK);
    }

    #[test]
    fn test_esc_closes_help_before_navigating() {
        let mut state = state();
        state.update(Action::Navigate(Screen::Metrics));
        state.update(Action::ToggleHelp);
        assert_eq!(state.update(Action::GoBack), None);
        assert!(!state.ui_state.help_visible);
        assert_eq!(state.current_screen, Screen::Metrics);
    }

    #[test]
    fn test_search_filters_live() {
        let mut state = state();
        state.update(Action::OpenSearch);
        for c in "cuda".chars() {
            state.update(Action::SearchInput(c));
        }
        assert_eq!(state.ui_state.log_filter.search(), "cuda");
        assert!(state.ui_state.log_filter.has_active_filters());

        state.update(Action::ApplySearch);
        assert!(!state.ui_state.search_active);
        assert_eq!(state.ui_state.log_filter.search(), "cuda");

        state.update(Action::OpenSearch);
        state.update(Action::CloseSearch);
        assert_eq!(state.ui_state.log_filter.search(), "");
    }

    #[test]
    fn test_clear_filter_resets_scroll() {
        let mut state = state();
        state.update(Action::ToggleLevel(Severity::Error));
        state.update(Action::ScrollDown(30));
        assert_eq!(state.ui_state.log_scroll, 30);

        state.update(Action::ClearFilter);
        assert!(!state.ui_state.log_filter.has_active_filters());
        assert_eq!(state.ui_state.log_scroll, 0);
    }

    #[test]
    fn test_history_level_needs_single_selection() {
        let mut state = state();
        assert_eq!(state.history_level(), None);

        state.update(Action::ToggleLevel(Severity::Error));
        assert_eq!(state.history_level(), Some(Severity::Error));
        assert_eq!(
            state.update(Action::LoadHistory),
            Some(Effect::Request(Request::LoadLogHistory {
                lines: HISTORY_LINES,
                level: Some(Severity::Error),
            }))
        );

        state.update(Action::ToggleLevel(Severity::Warning));
        assert_eq!(state.history_level(), None);
    }

    #[test]
    fn test_destructive_requests_need_confirmation() {
        let mut state = state();
        assert_eq!(state.update(Action::StopCluster), None);
        assert_eq!(state.ui_state.confirm, Some(Request::StopCluster));

        assert_eq!(
            state.update(Action::Confirm),
            Some(Effect::Request(Request::StopCluster))
        );
        assert!(state.ui_state.confirm.is_none());

        state.update(Action::StopModel);
        state.update(Action::CancelConfirm);
        assert_eq!(state.update(Action::Confirm), None);
    }

    #[test]
    fn test_profile_actions_use_selection() {
        let mut state = state();
        state.update(Action::Navigate(Screen::Profiles));
        assert_eq!(state.update(Action::ToggleFavorite), None);

        state.backend.profiles = vec![profile("a", false), profile("b", true)];
        state.update(Action::ListDown);
        assert_eq!(
            state.update(Action::ToggleFavorite),
            Some(Effect::Request(Request::SetFavorite {
                id: "b".to_string(),
                favorite: false,
            }))
        );

        state.update(Action::ListDown);
        assert_eq!(state.selected_index(), Some(0));
        state.update(Action::LaunchProfile);
        assert_eq!(
            state.ui_state.confirm,
            Some(Request::LaunchProfile {
                id: "a".to_string(),
                name: "profile a".to_string(),
            })
        );
    }

    #[test]
    fn test_cancel_download_requires_active_download() {
        let mut state = state();
        state.update(Action::Navigate(Screen::Inventory));
        state.backend.models = Some(LocalModelList {
            models: vec![LocalModel {
                id: "m1".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        });
        assert_eq!(state.update(Action::CancelDownload), None);

        state.backend.download_status = Some(DownloadStatus {
            model_id: "m2".to_string(),
            status: DownloadState::Downloading,
            ..Default::default()
        });
        assert_eq!(
            state.update(Action::CancelDownload),
            Some(Effect::Request(Request::CancelDownload("m2".to_string())))
        );
        assert_eq!(
            state.update(Action::DistributeModel),
            Some(Effect::Request(Request::DistributeModel("m1".to_string())))
        );
    }

    #[test]
    fn test_launch_uses_launchable_list_and_defaults() {
        let mut state = state();
        state.update(Action::Navigate(Screen::Inventory));
        state.backend.available_models = Some(AvailableModelList {
            models: vec![
                AvailableModel {
                    id: "Qwen/Qwen2.5-7B".to_string(),
                    name: "Qwen 2.5 7B".to_string(),
                    ..Default::default()
                },
                AvailableModel {
                    id: "meta-llama/Llama-3-8B".to_string(),
                    name: "Llama 3 8B".to_string(),
                    ..Default::default()
                },
            ],
        });

        // The local list is empty and shown first
        assert_eq!(state.update(Action::LaunchModel), None);
        assert!(state.ui_state.confirm.is_none());

        state.update(Action::ToggleInventoryView);
        assert_eq!(state.current_list_len(), 2);
        state.update(Action::ListDown);
        state.update(Action::LaunchModel);
        assert_eq!(
            state.ui_state.confirm,
            Some(Request::LaunchModel(ModelLaunchConfig::new(
                "meta-llama/Llama-3-8B"
            )))
        );
        assert_eq!(state.update(Action::DeleteModel), None);
    }

    #[test]
    fn test_download_prompt_submits_trimmed_id() {
        let mut state = state();
        state.update(Action::Navigate(Screen::Inventory));
        state.update(Action::OpenPrompt(PromptKind::DownloadModel));
        for c in " org/model ".chars() {
            state.update(Action::PromptInput(c));
        }
        state.update(Action::PromptBackspace);
        state.update(Action::PromptInput(' '));

        assert_eq!(
            state.update(Action::SubmitPrompt),
            Some(Effect::Request(Request::DownloadModel("org/model".to_string())))
        );
        assert!(state.ui_state.prompt.is_none());
    }

    #[test]
    fn test_empty_or_cancelled_prompt_does_nothing() {
        let mut state = state();
        state.update(Action::OpenPrompt(PromptKind::ImportProfiles));
        state.update(Action::PromptInput(' '));
        assert_eq!(state.update(Action::SubmitPrompt), None);

        state.update(Action::OpenPrompt(PromptKind::ImportProfiles));
        state.update(Action::PromptInput('x'));
        assert_eq!(state.update(Action::GoBack), None);
        assert!(state.ui_state.prompt.is_none());
        assert!(!state.should_quit);
    }

    #[test]
    fn test_save_profile_needs_running_model() {
        let mut state = state();
        state.update(Action::OpenPrompt(PromptKind::SaveProfile));
        state.update(Action::PromptInput('a'));
        assert_eq!(state.update(Action::SubmitPrompt), None);
        assert!(state.ui_state.notification.as_ref().unwrap().is_error);

        state.backend.running_config = Some(ModelLaunchConfig::new("m"));
        state.update(Action::OpenPrompt(PromptKind::SaveProfile));
        state.update(Action::PromptInput('a'));
        assert_eq!(
            state.update(Action::SubmitPrompt),
            Some(Effect::Request(Request::SaveProfile {
                name: "a".to_string(),
                config: ModelLaunchConfig::new("m"),
            }))
        );
    }

    #[test]
    fn test_clear_logs_depends_on_source() {
        let mut state = state();
        assert_eq!(state.update(Action::ClearLogs), Some(Effect::ClearStream));

        state.update(Action::ToggleHistory);
        state.backend.log_history = vec![LogRecord::new("t", Severity::Info, "m")];
        let generation = state.log_generation;
        assert_eq!(state.update(Action::ClearLogs), None);
        assert!(state.backend.log_history.is_empty());
        assert_ne!(state.log_generation, generation);
    }

    #[test]
    fn test_notification_expires() {
        let mut state = state();
        state.update(Action::ShowError("boom".to_string()));
        let created = state.ui_state.notification.as_ref().unwrap().created;

        state.expire_notification(created + Duration::from_secs(1));
        assert!(state.ui_state.notification.is_some());

        state.expire_notification(created + NOTIFICATION_TTL);
        assert!(state.ui_state.notification.is_none());
    }

    #[test]
    fn test_filter_cache_invalidation() {
        let mut cache = FilterCache::default();
        let filter = LogFilter::new();
        assert!(cache.needs_refresh(&filter, LogSource::Live, 0));

        cache.update(&filter, LogSource::Live, 0, Vec::new());
        assert!(!cache.needs_refresh(&filter, LogSource::Live, 0));
        assert!(cache.needs_refresh(&filter, LogSource::Live, 1));
        assert!(cache.needs_refresh(&filter, LogSource::History, 0));
        assert!(cache.needs_refresh(&LogFilter::new().with_search("x"), LogSource::Live, 0));

        cache.invalidate();
        assert!(cache.needs_refresh(&filter, LogSource::Live, 0));
    }

    #[test]
    fn test_clamp_selection_after_reload() {
        let mut state = state();
        state.update(Action::Navigate(Screen::Profiles));
        state.backend.profiles = vec![profile("a", false), profile("b", false)];
        state.ui_state.list_state.select(Some(1));

        state.backend.profiles.truncate(1);
        state.clamp_selection();
        assert_eq!(state.selected_index(), Some(0));
    }
}
