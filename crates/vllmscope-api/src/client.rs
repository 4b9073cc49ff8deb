use std::time::Duration;

use reqwest::header::CONTENT_DISPOSITION;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use vllmscope_types::{
    AvailableModelList, CancelResponse, ClusterConfig, ClusterStatus, ConfigReload, CreateProfile,
    DeleteResponse, DistributeResponse, DownloadRequest, DownloadResponse, DownloadStatus,
    ImportResult, LaunchResult, LocalModelList, LogHistory, ModelLaunchConfig, ModelStatus,
    NodeStatus, Profile, ProfileExport, ProfileLaunchResult, Severity, UpdateProfile, Uptime,
};

use crate::error::{self, ApiError, Result};

/// Backend address used when none is configured
pub const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Stream address used when none is configured
pub const DEFAULT_WS_URL: &str = "ws://localhost:8080";

/// Fallback name for downloaded logs
const DEFAULT_LOG_FILENAME: &str = "vllm_logs.log";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A log file fetched from `/api/logs/download`
#[derive(Clone, Debug)]
pub struct LogDownload {
    pub filename: String,
    pub content: Vec<u8>,
}

/// Client for the backend REST API
///
/// Calls are never retried here; callers decide what to do on failure.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = Url::parse(base_url)?;
        if base.cannot_be_a_base() {
            return Err(ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase));
        }

        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    /// Join path segments onto the base URL, percent-encoding each one
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and turn non-2xx responses into errors
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let err = error::from_body(status.as_u16(), &body);
        tracing::debug!(status = status.as_u16(), error = %err, "request failed");
        Err(err)
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let response = self.execute(request).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments)?;
        tracing::trace!(%url, "GET");
        self.send(self.http.get(url)).await
    }

    async fn post<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments)?;
        tracing::trace!(%url, "POST");
        self.send(self.http.post(url)).await
    }

    async fn post_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        tracing::trace!(%url, "POST");
        self.send(self.http.post(url).json(body)).await
    }

    async fn put_json<B, T>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        tracing::trace!(%url, "PUT");
        self.send(self.http.put(url).json(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.url(segments)?;
        tracing::trace!(%url, "DELETE");
        self.send(self.http.delete(url)).await
    }

    // ------------------------------------------------------------------
    // Cluster
    // ------------------------------------------------------------------

    pub async fn cluster_status(&self) -> Result<ClusterStatus> {
        self.get(&["api", "cluster", "status"]).await
    }

    pub async fn cluster_nodes(&self) -> Result<NodeStatus> {
        self.get(&["api", "cluster", "nodes"]).await
    }

    /// Uptime string, or None while the cluster is down
    pub async fn cluster_uptime(&self) -> Result<Option<String>> {
        let uptime: Uptime = self.get(&["api", "cluster", "uptime"]).await?;
        Ok(uptime.uptime)
    }

    pub async fn start_cluster(&self) -> Result<ClusterStatus> {
        self.post(&["api", "cluster", "start"]).await
    }

    pub async fn stop_cluster(&self) -> Result<ClusterStatus> {
        self.post(&["api", "cluster", "stop"]).await
    }

    // ------------------------------------------------------------------
    // Model inventory
    // ------------------------------------------------------------------

    pub async fn list_models(&self) -> Result<LocalModelList> {
        self.get(&["api", "models"]).await
    }

    pub async fn download_model(&self, request: &DownloadRequest) -> Result<DownloadResponse> {
        self.post_json(&["api", "models", "download"], request).await
    }

    pub async fn delete_model(&self, model_id: &str) -> Result<DeleteResponse> {
        self.delete(&["api", "models", model_id]).await
    }

    pub async fn distribute_model(&self, model_id: &str) -> Result<DistributeResponse> {
        self.post(&["api", "models", model_id, "distribute"]).await
    }

    pub async fn download_status(&self) -> Result<DownloadStatus> {
        self.get(&["api", "models", "download", "status"]).await
    }

    pub async fn cancel_download(&self, model_id: &str) -> Result<CancelResponse> {
        self.post(&["api", "models", "download", model_id, "cancel"]).await
    }

    // ------------------------------------------------------------------
    // Cluster config
    // ------------------------------------------------------------------

    pub async fn get_config(&self) -> Result<ClusterConfig> {
        self.get(&["api", "config"]).await
    }

    pub async fn reload_config(&self) -> Result<ConfigReload> {
        self.post(&["api", "config", "reload"]).await
    }

    // ------------------------------------------------------------------
    // Active model
    // ------------------------------------------------------------------

    pub async fn model_status(&self) -> Result<ModelStatus> {
        self.get(&["api", "model", "status"]).await
    }

    /// Launch config of the running model, or None when nothing runs
    pub async fn running_config(&self) -> Result<Option<ModelLaunchConfig>> {
        match self.get(&["api", "model", "running-config"]).await {
            Ok(config) => Ok(Some(config)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn available_models(&self) -> Result<AvailableModelList> {
        self.get(&["api", "model", "list"]).await
    }

    pub async fn launch_model(&self, config: &ModelLaunchConfig) -> Result<LaunchResult> {
        self.post_json(&["api", "model", "launch"], config).await
    }

    pub async fn stop_model(&self) -> Result<LaunchResult> {
        self.post(&["api", "model", "stop"]).await
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    pub async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.get(&["api", "profiles", ""]).await
    }

    pub async fn create_profile(&self, profile: &CreateProfile) -> Result<Profile> {
        self.post_json(&["api", "profiles", ""], profile).await
    }

    pub async fn update_profile(&self, id: &str, update: &UpdateProfile) -> Result<Profile> {
        self.put_json(&["api", "profiles", id], update).await
    }

    pub async fn delete_profile(&self, id: &str) -> Result<()> {
        let url = self.url(&["api", "profiles", id])?;
        self.execute(self.http.delete(url)).await?;
        Ok(())
    }

    pub async fn launch_profile(&self, id: &str) -> Result<ProfileLaunchResult> {
        self.post(&["api", "profiles", id, "launch"]).await
    }

    /// Import profiles from an exported JSON document
    pub async fn import_profiles(&self, json_data: &str) -> Result<ImportResult> {
        let body = serde_json::json!({ "json_data": json_data });
        self.post_json(&["api", "profiles", "import"], &body).await
    }

    pub async fn export_profiles(&self) -> Result<ProfileExport> {
        self.get(&["api", "profiles", "export"]).await
    }

    // ------------------------------------------------------------------
    // Logs
    // ------------------------------------------------------------------

    /// Recent log lines, optionally restricted to one level
    pub async fn log_history(&self, lines: usize, level: Option<Severity>) -> Result<LogHistory> {
        let mut url = self.url(&["api", "logs", "history"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("lines", &lines.to_string());
            if let Some(level) = level {
                query.append_pair("level", level.as_str());
            }
        }
        self.send(self.http.get(url)).await
    }

    /// Fetch the raw log file along with its suggested filename
    pub async fn download_logs(&self, lines: usize) -> Result<LogDownload> {
        let mut url = self.url(&["api", "logs", "download"])?;
        url.query_pairs_mut()
            .append_pair("lines", &lines.to_string());

        let response = self.execute(self.http.get(url)).await?;
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| DEFAULT_LOG_FILENAME.to_string());
        let content = response.bytes().await?.to_vec();

        Ok(LogDownload { filename, content })
    }
}

/// Extract `name` from `attachment; filename="name"`
fn filename_from_disposition(value: &str) -> Option<String> {
    const KEY: &str = "filename=\"";
    let start = value.find(KEY)? + KEY.len();
    let rest = &value[start..];
    let end = rest.rfind('"')?;
    (end > 0).then(|| rest[..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_disposition() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="vllm_20240501.log""#),
            Some("vllm_20240501.log".to_string())
        );
        assert_eq!(filename_from_disposition("attachment"), None);
        assert_eq!(filename_from_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_url_encodes_segments() {
        let client = ApiClient::new("http://localhost:8080").unwrap();
        let url = client.url(&["api", "models", "meta-llama/Llama-3-8B"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/models/meta-llama%2FLlama-3-8B"
        );
    }

    #[test]
    fn test_url_keeps_base_path_and_trailing_slash() {
        let client = ApiClient::new("http://10.0.0.5:8080/backend/").unwrap();
        let url = client.url(&["api", "profiles", ""]).unwrap();
        assert_eq!(url.as_str(), "http://10.0.0.5:8080/backend/api/profiles/");
    }

    #[test]
    fn test_rejects_invalid_base() {
        assert!(ApiClient::new("not a url").is_err());
        assert!(ApiClient::new("mailto:ops@example.com").is_err());
    }
}
