//! Background REST calls and how their results land in the state

use std::path::Path;

use tokio::sync::mpsc;

use vllmscope_api::{ApiClient, LogDownload};
use vllmscope_tui::{AppState, Poll, PollSchedule, Request};
use vllmscope_types::{
    AvailableModelList, ClusterConfig, ClusterStatus, CreateProfile, DownloadRequest,
    DownloadStatus, LocalModelList, LogRecord, ModelLaunchConfig, ModelStatus, NodeStatus,
    Profile, ProfileExport, UpdateProfile,
};

use crate::export;

/// Results of background calls, applied on the event loop
#[derive(Debug)]
pub enum InternalAction {
    ClusterStatus(ClusterStatus),
    Nodes(NodeStatus),
    Uptime(Option<String>),
    ModelStatus(ModelStatus),
    RunningConfig(Option<ModelLaunchConfig>),
    Models(LocalModelList),
    AvailableModels(AvailableModelList),
    DownloadStatus(DownloadStatus),
    Profiles(Vec<Profile>),
    Config(ClusterConfig),
    /// A poll failed; carries the message to show
    PollFailed(Poll, String),
    /// A user request succeeded; carries the message to show
    Completed(String),
    HistoryLoaded(Vec<LogRecord>),
    LogsDownloaded(LogDownload),
    ProfilesExported(ProfileExport),
    Error(String),
}

impl InternalAction {
    /// The poll this result answers, if it came from one
    fn poll(&self) -> Option<Poll> {
        match self {
            Self::ClusterStatus(_) => Some(Poll::ClusterStatus),
            Self::Nodes(_) => Some(Poll::Nodes),
            Self::Uptime(_) => Some(Poll::Uptime),
            Self::ModelStatus(_) => Some(Poll::ModelStatus),
            Self::RunningConfig(_) => Some(Poll::RunningConfig),
            Self::Models(_) => Some(Poll::Models),
            Self::AvailableModels(_) => Some(Poll::AvailableModels),
            Self::DownloadStatus(_) => Some(Poll::DownloadStatus),
            Self::Profiles(_) => Some(Poll::Profiles),
            Self::Config(_) => Some(Poll::Config),
            Self::PollFailed(poll, _) => Some(*poll),
            _ => None,
        }
    }
}

fn outcome(success: bool, message: String) -> InternalAction {
    if success {
        InternalAction::Completed(message)
    } else {
        InternalAction::Error(message)
    }
}

/// Fetch one polled resource in the background
pub fn spawn_poll(api: &ApiClient, poll: Poll, tx: &mpsc::UnboundedSender<InternalAction>) {
    let api = api.clone();
    let tx = tx.clone();

    tokio::spawn(async move {
        let result = match poll {
            Poll::ClusterStatus => api.cluster_status().await.map(InternalAction::ClusterStatus),
            Poll::Nodes => api.cluster_nodes().await.map(InternalAction::Nodes),
            Poll::Uptime => api.cluster_uptime().await.map(InternalAction::Uptime),
            Poll::ModelStatus => api.model_status().await.map(InternalAction::ModelStatus),
            Poll::RunningConfig => api.running_config().await.map(InternalAction::RunningConfig),
            Poll::Models => api.list_models().await.map(InternalAction::Models),
            Poll::AvailableModels => api
                .available_models()
                .await
                .map(InternalAction::AvailableModels),
            // No download has been started yet
            Poll::DownloadStatus => match api.download_status().await {
                Err(e) if e.is_not_found() => Ok(DownloadStatus::default()),
                other => other,
            }
            .map(InternalAction::DownloadStatus),
            Poll::Profiles => api.list_profiles().await.map(InternalAction::Profiles),
            Poll::Config => api.get_config().await.map(InternalAction::Config),
        };

        let action = result.unwrap_or_else(|e| {
            tracing::warn!(poll = poll.label(), error = %e, "poll failed");
            InternalAction::PollFailed(poll, format!("Failed to load {}: {}", poll.label(), e))
        });
        let _ = tx.send(action);
    });
}

/// Run every poll that is due and not already in flight
pub fn run_due_polls(
    api: &ApiClient,
    schedule: &mut PollSchedule,
    tx: &mpsc::UnboundedSender<InternalAction>,
) {
    for poll in schedule.due(std::time::Instant::now()) {
        spawn_poll(api, poll, tx);
    }
}

/// Execute a user request
pub async fn execute(api: &ApiClient, request: Request) -> InternalAction {
    tracing::info!(?request, "executing request");

    let result = match request {
        Request::StartCluster => api.start_cluster().await.map(|status| {
            InternalAction::Completed(status.message.unwrap_or_else(|| "Cluster started".to_string()))
        }),
        Request::StopCluster => api.stop_cluster().await.map(|status| {
            InternalAction::Completed(status.message.unwrap_or_else(|| "Cluster stopped".to_string()))
        }),
        Request::StopModel => api.stop_model().await.map(|r| outcome(r.success, r.message)),
        Request::LaunchProfile { id, .. } => api
            .launch_profile(&id)
            .await
            .map(|r| outcome(r.success, r.message)),
        Request::SetFavorite { id, favorite } => {
            let update = UpdateProfile {
                favorite: Some(favorite),
                ..Default::default()
            };
            api.update_profile(&id, &update).await.map(|p| {
                let message = if p.favorite {
                    format!("Added '{}' to favorites", p.name)
                } else {
                    format!("Removed '{}' from favorites", p.name)
                };
                InternalAction::Completed(message)
            })
        }
        Request::DeleteProfile { id, name } => api
            .delete_profile(&id)
            .await
            .map(|()| InternalAction::Completed(format!("Deleted profile '{}'", name))),
        Request::ExportProfiles => api
            .export_profiles()
            .await
            .map(InternalAction::ProfilesExported),
        Request::ImportProfiles(path) => {
            let json = match tokio::fs::read_to_string(&path).await {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read profiles file");
                    return InternalAction::Error(format!(
                        "Failed to read {}: {}",
                        path.display(),
                        e
                    ));
                }
            };
            api.import_profiles(&json)
                .await
                .map(|r| InternalAction::Completed(r.message))
        }
        Request::SaveProfile { name, config } => {
            let profile = CreateProfile {
                name,
                description: None,
                model_id: config.model_id.clone(),
                config,
                favorite: None,
            };
            api.create_profile(&profile)
                .await
                .map(|p| InternalAction::Completed(format!("Saved profile '{}'", p.name)))
        }
        Request::LaunchModel(config) => api.launch_model(&config).await.map(|r| {
            let message = match r.port {
                Some(port) if r.success => format!("{} (port {})", r.message, port),
                _ => r.message,
            };
            outcome(r.success, message)
        }),
        Request::DownloadModel(model_id) => {
            let request = DownloadRequest {
                model_id,
                revision: None,
                distribute: None,
            };
            api.download_model(&request)
                .await
                .map(|r| outcome(r.success, r.message))
        }
        Request::DeleteModel(id) => api.delete_model(&id).await.map(|r| {
            let message = match r.freed_space_gb {
                Some(gb) if r.success => format!("{} ({:.1} GB freed)", r.message, gb),
                _ => r.message,
            };
            outcome(r.success, message)
        }),
        Request::DistributeModel(id) => api
            .distribute_model(&id)
            .await
            .map(|r| outcome(r.success, r.message)),
        Request::CancelDownload(id) => api
            .cancel_download(&id)
            .await
            .map(|r| outcome(r.success, r.message)),
        Request::ReloadConfig => api
            .reload_config()
            .await
            .map(|r| InternalAction::Completed(r.message)),
        Request::LoadLogHistory { lines, level } => api
            .log_history(lines, level)
            .await
            .map(|h| InternalAction::HistoryLoaded(h.logs)),
        Request::DownloadLogs { lines } => api
            .download_logs(lines)
            .await
            .map(InternalAction::LogsDownloaded),
    };

    result.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "request failed");
        InternalAction::Error(e.to_string())
    })
}

/// Execute a user request in the background
pub fn spawn_request(api: &ApiClient, request: Request, tx: &mpsc::UnboundedSender<InternalAction>) {
    let api = api.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let _ = tx.send(execute(&api, request).await);
    });
}

/// Apply a finished call to the state
///
/// Files produced by exports and downloads are written to `out_dir`.
pub fn apply(state: &mut AppState, action: InternalAction, schedule: &mut PollSchedule, out_dir: &Path) {
    state.render_dirty = true;
    if let Some(poll) = action.poll() {
        schedule.complete(poll);
    }

    match action {
        InternalAction::ClusterStatus(status) => state.backend.cluster = Some(status),
        InternalAction::Nodes(nodes) => state.backend.nodes = Some(nodes),
        InternalAction::Uptime(uptime) => state.backend.uptime = uptime,
        InternalAction::ModelStatus(status) => state.backend.model_status = Some(status),
        InternalAction::RunningConfig(config) => state.backend.running_config = config,
        InternalAction::Models(models) => {
            state.backend.models = Some(models);
            state.clamp_selection();
        }
        InternalAction::AvailableModels(models) => {
            state.backend.available_models = Some(models);
            state.clamp_selection();
        }
        InternalAction::DownloadStatus(status) => state.backend.download_status = Some(status),
        InternalAction::Profiles(profiles) => {
            state.backend.profiles = profiles;
            state.clamp_selection();
        }
        InternalAction::Config(config) => state.backend.config = Some(config),
        InternalAction::Completed(message) => {
            state.show_info(message);
            schedule.force();
        }
        InternalAction::HistoryLoaded(logs) => {
            let count = logs.len();
            state.backend.log_history = logs;
            state.logs_changed();
            state.show_info(format!("Loaded {} history lines", count));
        }
        InternalAction::LogsDownloaded(download) => {
            match export::save_log_download(out_dir, &download) {
                Ok(path) => state.show_info(format!("Saved server logs to {}", path.display())),
                Err(e) => state.show_error(format!("{:#}", e)),
            }
        }
        InternalAction::ProfilesExported(export) => match export::save_profiles(out_dir, &export) {
            Ok(path) => state.show_info(format!(
                "Exported {} profiles to {}",
                export.count,
                path.display()
            )),
            Err(e) => state.show_error(format!("{:#}", e)),
        },
        InternalAction::PollFailed(_, message) | InternalAction::Error(message) => {
            state.show_error(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vllmscope_tui::{DisplaySettings, Screen};
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn state() -> AppState {
        let (tx, _rx) = mpsc::unbounded_channel();
        AppState::new(tx, DisplaySettings::default())
    }

    #[tokio::test]
    async fn test_failed_delete_reports_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/models/org%2Fmodel"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "message": "Model is currently running"
            })))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let result = execute(&api, Request::DeleteModel("org/model".to_string())).await;
        assert!(matches!(result, InternalAction::Error(msg) if msg == "Model is currently running"));
    }

    #[tokio::test]
    async fn test_favorite_sends_partial_update() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/profiles/p1"))
            .and(body_json(serde_json::json!({ "favorite": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "p1",
                "name": "Qwen fast",
                "model_id": "Qwen/Qwen2.5-7B",
                "config": {
                    "model_id": "Qwen/Qwen2.5-7B",
                    "tensor_parallel": 2,
                    "gpu_memory_utilization": 0.9,
                    "port": 8000
                },
                "favorite": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let result = execute(
            &api,
            Request::SetFavorite {
                id: "p1".to_string(),
                favorite: true,
            },
        )
        .await;
        assert!(
            matches!(result, InternalAction::Completed(msg) if msg == "Added 'Qwen fast' to favorites")
        );
    }

    #[tokio::test]
    async fn test_http_error_becomes_notification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cluster/start"))
            .respond_with(
                ResponseTemplate::new(409)
                    .set_body_json(serde_json::json!({ "detail": "Cluster already running" })),
            )
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let result = execute(&api, Request::StartCluster).await;

        let mut state = state();
        let mut schedule = PollSchedule::for_screen(Screen::Overview, Duration::from_secs(5));
        let dir = tempfile::tempdir().unwrap();
        apply(&mut state, result, &mut schedule, dir.path());

        let notification = state.ui_state.notification.unwrap();
        assert!(notification.is_error);
        assert_eq!(notification.message, "Cluster already running");
    }

    #[tokio::test]
    async fn test_launch_posts_default_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/model/launch"))
            .and(body_json(serde_json::json!({
                "model_id": "Qwen/Qwen2.5-7B",
                "tensor_parallel": 2,
                "gpu_memory_utilization": 0.9,
                "enable_auto_tool_choice": false,
                "trust_remote_code": false,
                "port": 8000
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "message": "Model launched",
                "model_id": "Qwen/Qwen2.5-7B",
                "port": 8000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let request = Request::LaunchModel(ModelLaunchConfig::new("Qwen/Qwen2.5-7B"));
        let result = execute(&api, request).await;
        assert!(
            matches!(result, InternalAction::Completed(msg) if msg == "Model launched (port 8000)")
        );
    }

    #[tokio::test]
    async fn test_download_sends_model_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/models/download"))
            .and(body_json(serde_json::json!({ "model_id": "org/model" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": false,
                "message": "A download is already in progress",
                "model_id": "org/model"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let result = execute(&api, Request::DownloadModel("org/model".to_string())).await;
        assert!(
            matches!(result, InternalAction::Error(msg) if msg == "A download is already in progress")
        );
    }

    #[tokio::test]
    async fn test_import_reads_file_contents() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/profiles/import"))
            .and(body_json(serde_json::json!({ "json_data": "[]" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "imported": 0,
                "message": "Imported 0 profiles"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("profiles.json");
        std::fs::write(&file, "[]").unwrap();

        let api = ApiClient::new(&server.uri()).unwrap();
        let result = execute(&api, Request::ImportProfiles(file)).await;
        assert!(matches!(result, InternalAction::Completed(msg) if msg == "Imported 0 profiles"));

        let missing = execute(&api, Request::ImportProfiles(dir.path().join("nope.json"))).await;
        assert!(matches!(missing, InternalAction::Error(msg) if msg.starts_with("Failed to read")));
    }

    #[tokio::test]
    async fn test_failed_poll_clears_in_flight() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/model/list"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut schedule = PollSchedule::for_screen(Screen::Inventory, Duration::from_secs(5));
        let now = std::time::Instant::now();
        assert!(schedule.due(now).contains(&Poll::AvailableModels));
        schedule.force();
        assert!(schedule.due(now).is_empty());

        spawn_poll(&api, Poll::AvailableModels, &tx);
        let result = rx.recv().await.unwrap();
        assert!(matches!(result, InternalAction::PollFailed(Poll::AvailableModels, _)));

        let mut state = state();
        let dir = tempfile::tempdir().unwrap();
        apply(&mut state, result, &mut schedule, dir.path());
        assert!(state.ui_state.notification.unwrap().is_error);
        assert_eq!(schedule.due(now), vec![Poll::AvailableModels]);
    }

    #[test]
    fn test_completed_forces_polls() {
        let mut state = state();
        let mut schedule = PollSchedule::for_screen(Screen::Overview, Duration::from_secs(5));
        for poll in schedule.due(std::time::Instant::now()) {
            schedule.complete(poll);
        }
        assert!(schedule.due(std::time::Instant::now()).is_empty());

        let dir = tempfile::tempdir().unwrap();
        apply(
            &mut state,
            InternalAction::Completed("Cluster stopped".to_string()),
            &mut schedule,
            dir.path(),
        );
        assert_eq!(schedule.due(std::time::Instant::now()).len(), 5);
        assert!(!state.ui_state.notification.unwrap().is_error);
    }

    #[test]
    fn test_history_bumps_log_generation() {
        let mut state = state();
        let mut schedule = PollSchedule::for_screen(Screen::Logs, Duration::from_secs(5));
        let dir = tempfile::tempdir().unwrap();
        let before = state.log_generation;

        apply(
            &mut state,
            InternalAction::HistoryLoaded(vec![LogRecord::new(
                "t0",
                vllmscope_types::Severity::Info,
                "ready",
            )]),
            &mut schedule,
            dir.path(),
        );
        assert_eq!(state.backend.log_history.len(), 1);
        assert_ne!(state.log_generation, before);
    }
}
