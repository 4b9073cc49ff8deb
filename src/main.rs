mod backend;
mod export;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::KeyEvent;
use tokio::sync::mpsc;

use vllmscope_api::{ApiClient, DEFAULT_API_URL, DEFAULT_WS_URL};
use vllmscope_tui::{
    Action, AppState, DisplaySettings, Effect, Event, EventHandler, KeyBindings, KeyContext,
    PollSchedule, Screen, ScreenStream, SettingsChange, SettingsStore, Tui, next_stream_event,
    refresh_filtered_logs, render,
};

use backend::InternalAction;

/// vllmscope - A terminal dashboard for a vLLM inference cluster
#[derive(Parser, Debug)]
#[command(name = "vllmscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the backend REST API
    #[arg(long, env = "VLLMSCOPE_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Base URL of the backend stream endpoints
    #[arg(long, env = "VLLMSCOPE_WS_URL", default_value = DEFAULT_WS_URL)]
    ws_url: String,

    /// Metrics samples kept for charts
    #[arg(long, default_value = "300")]
    metrics_buffer: usize,

    /// Log lines kept in memory (defaults to the saved display setting)
    #[arg(long)]
    log_buffer: Option<usize>,

    /// Path of the display settings file
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// File receiving diagnostic logs (the terminal is owned by the UI)
    #[arg(long, value_name = "FILE", default_value = "vllmscope.log")]
    log_file: PathBuf,

    /// UI tick interval in milliseconds
    #[arg(long, default_value = "250")]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Diagnostics go to a file so they never draw over the UI
    let log_file = File::create(&args.log_file)
        .with_context(|| format!("failed to create log file {}", args.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .init();

    // Run the application
    let result = run_app(args).await;

    // Handle any errors
    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

/// Long-lived handles the event loop works with
struct Session {
    api: ApiClient,
    ws_url: String,
    metrics_buffer: usize,
    log_buffer: Option<usize>,
    action_tx: mpsc::UnboundedSender<Action>,
    internal_tx: mpsc::UnboundedSender<InternalAction>,
    settings: SettingsStore,
    stream: Option<ScreenStream>,
    schedule: PollSchedule,
    out_dir: PathBuf,
}

fn refresh_interval(settings: &DisplaySettings) -> Duration {
    Duration::from_millis(settings.metrics_refresh_rate_ms)
}

impl Session {
    /// Mount the stream and poll schedule for `screen`
    fn enter(&mut self, screen: Screen, settings: &DisplaySettings) {
        if let Some(mut old) = self.stream.take() {
            old.disconnect();
        }
        let log_capacity = self.log_buffer.unwrap_or(settings.log_buffer_size);
        self.stream = ScreenStream::mount(
            screen,
            &self.ws_url,
            self.metrics_buffer,
            log_capacity,
            &self.action_tx,
        );
        self.schedule = PollSchedule::for_screen(screen, refresh_interval(settings));
        backend::run_due_polls(&self.api, &mut self.schedule, &self.internal_tx);
    }

    fn handle_effect(&mut self, state: &mut AppState, effect: Effect) {
        match effect {
            Effect::Request(request) => {
                backend::spawn_request(&self.api, request, &self.internal_tx);
            }
            Effect::ScreenChanged(screen) => {
                self.enter(screen, &state.settings);
                state.logs_changed();
            }
            Effect::Reconnect => match self.stream.as_mut() {
                Some(stream) => stream.reconnect(),
                None => state.show_info("This screen has no live stream"),
            },
            Effect::Refresh => {
                self.schedule.force();
                backend::run_due_polls(&self.api, &mut self.schedule, &self.internal_tx);
            }
            Effect::ClearStream => {
                if let Some(stream) = self.stream.as_mut() {
                    stream.clear();
                }
                state.logs_changed();
            }
            Effect::ExportLogs => {
                refresh_filtered_logs(state, self.stream.as_ref().and_then(|s| s.logs()));
                let records = &state.ui_state.filter_cache.cached_entries;
                match export::export_log_view(&self.out_dir, records) {
                    Ok((path, count)) => {
                        state.show_info(format!("Exported {} lines to {}", count, path.display()))
                    }
                    Err(e) => state.show_error(format!("{:#}", e)),
                }
            }
            Effect::UpdateSettings(change) => self.update_settings(state, change),
        }
    }

    fn update_settings(&mut self, state: &mut AppState, change: SettingsChange) {
        let previous_log_buffer = state.settings.log_buffer_size;
        let result = match change {
            SettingsChange::CycleTheme => self.settings.update(|s| s.theme = s.theme.next()),
            SettingsChange::CycleRefreshRate => self.settings.update(|s| s.cycle_refresh_rate()),
            SettingsChange::CycleLogBufferSize => {
                self.settings.update(|s| s.cycle_log_buffer_size())
            }
            SettingsChange::Reset => self.settings.reset_to_defaults(),
        };

        // The in-memory value changes even when saving failed
        state.settings = self.settings.settings().clone();
        if let Err(e) = result {
            tracing::warn!(error = %e, "failed to save settings");
            state.show_error(format!("Failed to save settings: {}", e));
        }

        if matches!(change, SettingsChange::CycleRefreshRate | SettingsChange::Reset) {
            self.schedule.set_refresh(refresh_interval(&state.settings));
        }
        if state.settings.log_buffer_size != previous_log_buffer {
            self.resize_log_buffer(state);
        }
    }

    /// Tell the user where the new log buffer size applies, remounting a visible log stream
    fn resize_log_buffer(&mut self, state: &mut AppState) {
        let size = state.settings.log_buffer_size;
        if let Some(pinned) = self.log_buffer {
            state.show_info(format!(
                "Log buffer stays at {} lines while --log-buffer is set",
                pinned
            ));
        } else if state.current_screen == Screen::Logs {
            self.enter(Screen::Logs, &state.settings);
            state.logs_changed();
            state.show_info(format!("Log buffer set to {} lines, live log restarted", size));
        } else {
            state.show_info(format!(
                "Log buffer set to {} lines, applied when the log stream opens",
                size
            ));
        }
    }
}

/// Pick the action for a key given what currently has focus
fn key_action(keybindings: &KeyBindings, state: &AppState, key: &KeyEvent) -> Option<Action> {
    if state.ui_state.confirm.is_some() {
        keybindings.get_confirm_action(key)
    } else if state.ui_state.prompt.is_some() {
        keybindings.get_prompt_input_action(key)
    } else if state.ui_state.search_active && state.current_screen == Screen::Logs {
        keybindings.get_search_input_action(key)
    } else {
        keybindings.get_action(KeyContext::for_screen(state.current_screen), key)
    }
}

async fn run_app(args: Args) -> Result<()> {
    let settings_path = match args.settings {
        Some(path) => path,
        None => SettingsStore::default_path()
            .context("no config directory found; pass --settings")?,
    };
    let settings = SettingsStore::load(settings_path)?;
    let api = ApiClient::new(&args.api_url)
        .with_context(|| format!("invalid API URL '{}'", args.api_url))?;

    // Create action channels
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();
    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<InternalAction>();

    // Initialize state
    let mut state = AppState::new(action_tx.clone(), settings.settings().clone());

    let mut session = Session {
        api,
        ws_url: args.ws_url,
        metrics_buffer: args.metrics_buffer,
        log_buffer: args.log_buffer,
        action_tx: action_tx.clone(),
        internal_tx,
        settings,
        stream: None,
        schedule: PollSchedule::for_screen(state.current_screen, Duration::ZERO),
        out_dir: std::env::current_dir().context("failed to read working directory")?,
    };

    let mut tui = Tui::new()?;
    let mut events = EventHandler::new(Duration::from_millis(args.tick_ms.max(10)));
    let keybindings = KeyBindings::new();

    let screen = state.current_screen;
    session.enter(screen, &state.settings);

    // Main event loop
    loop {
        if state.render_dirty {
            tui.draw(|frame| render(frame, &mut state, session.stream.as_ref()))?;
            state.render_dirty = false;
        }

        tokio::select! {
            // Handle terminal events
            Some(event) = events.next() => {
                match event {
                    Event::Key(key) => {
                        if let Some(action) = key_action(&keybindings, &state, &key) {
                            let _ = action_tx.send(action);
                        }
                    }
                    Event::Tick => {
                        state.update(Action::Tick);
                        backend::run_due_polls(&session.api, &mut session.schedule, &session.internal_tx);
                    }
                    Event::Resize(_, _) => {
                        state.render_dirty = true;
                    }
                    Event::Error(e) => {
                        state.show_error(e);
                    }
                }
            }

            // Handle stream transport events
            Some(event) = next_stream_event(&mut session.stream) => {
                if let Some(stream) = session.stream.as_mut() {
                    if stream.handle(event) && state.current_screen == Screen::Logs {
                        state.logs_changed();
                    }
                    state.render_dirty = true;
                }
            }

            // Handle user actions
            Some(action) = action_rx.recv() => {
                if let Some(effect) = state.update(action) {
                    session.handle_effect(&mut state, effect);
                }
            }

            // Handle finished background calls
            Some(internal) = internal_rx.recv() => {
                backend::apply(&mut state, internal, &mut session.schedule, &session.out_dir);
            }
        }

        if state.should_quit {
            break;
        }
    }

    events.shutdown();
    if let Some(mut stream) = session.stream.take() {
        stream.disconnect();
    }
    tui.restore()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyModifiers};
    use vllmscope_tui::{PromptKind, Request};

    fn state() -> AppState {
        let (tx, _rx) = mpsc::unbounded_channel();
        AppState::new(tx, DisplaySettings::default())
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["vllmscope"]);
        assert_eq!(args.metrics_buffer, 300);
        assert_eq!(args.log_buffer, None);
        assert_eq!(args.tick_ms, 250);
    }

    #[test]
    fn test_confirm_prompt_captures_keys() {
        let kb = KeyBindings::new();
        let mut state = state();
        state.ui_state.confirm = Some(Request::StopCluster);
        assert_eq!(key_action(&kb, &state, &key('q')), None);
        assert_eq!(key_action(&kb, &state, &key('y')), Some(Action::Confirm));
    }

    fn session(dir: &std::path::Path, log_buffer: Option<usize>) -> Session {
        let (action_tx, _action_rx) = mpsc::unbounded_channel();
        let (internal_tx, _internal_rx) = mpsc::unbounded_channel();
        Session {
            api: ApiClient::new("http://127.0.0.1:9").unwrap(),
            ws_url: "ws://127.0.0.1:9".to_string(),
            metrics_buffer: 10,
            log_buffer,
            action_tx,
            internal_tx,
            settings: SettingsStore::load(dir.join("settings.toml")).unwrap(),
            stream: None,
            schedule: PollSchedule::for_screen(Screen::Logs, Duration::from_secs(5)),
            out_dir: dir.to_path_buf(),
        }
    }

    #[tokio::test]
    async fn test_log_buffer_change_remounts_visible_logs() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), None);
        let mut state = state();
        state.current_screen = Screen::Logs;
        session.enter(Screen::Logs, &state.settings);

        session.update_settings(&mut state, SettingsChange::CycleLogBufferSize);
        assert_eq!(state.settings.log_buffer_size, 5000);
        let logs = session.stream.as_ref().and_then(|s| s.logs()).unwrap();
        assert_eq!(logs.buffer().capacity(), 5000);
        let notification = state.ui_state.notification.unwrap();
        assert!(!notification.is_error);
        assert!(notification.message.contains("restarted"));

        if let Some(mut stream) = session.stream.take() {
            stream.disconnect();
        }
    }

    #[test]
    fn test_log_buffer_change_elsewhere_is_announced() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path(), Some(300));
        let mut state = state();

        session.update_settings(&mut state, SettingsChange::CycleLogBufferSize);
        let notification = state.ui_state.notification.unwrap();
        assert!(notification.message.contains("--log-buffer"));
        assert!(session.stream.is_none());
    }

    #[test]
    fn test_prompt_captures_keys_before_screen() {
        let kb = KeyBindings::new();
        let mut state = state();
        state.current_screen = Screen::Inventory;
        assert_eq!(key_action(&kb, &state, &key('q')), Some(Action::Quit));

        state.update(Action::OpenPrompt(PromptKind::DownloadModel));
        assert_eq!(
            key_action(&kb, &state, &key('q')),
            Some(Action::PromptInput('q'))
        );
    }

    #[test]
    fn test_search_input_only_on_logs() {
        let kb = KeyBindings::new();
        let mut state = state();
        state.ui_state.search_active = true;
        assert_eq!(key_action(&kb, &state, &key('q')), Some(Action::Quit));

        state.current_screen = Screen::Logs;
        assert_eq!(
            key_action(&kb, &state, &key('q')),
            Some(Action::SearchInput('q'))
        );
    }
}
