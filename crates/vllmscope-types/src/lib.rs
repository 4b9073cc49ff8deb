//! Shared types for vllmscope
//!
//! This crate contains the data structures exchanged with the backend:
//! stream frames, log records, connection state and REST payloads.

use ratatui::style::Color;
use serde::{Deserialize, Serialize};

// ============================================================================
// Metrics Stream Types
// ============================================================================

/// Raw telemetry reported by the serving engine
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VllmMetrics {
    pub timestamp: String,
    pub gpu_memory_utilization: f64,
    pub gpu_memory_used_bytes: u64,
    pub gpu_memory_total_bytes: u64,
    pub cpu_utilization: f64,
    pub ram_used_bytes: u64,
    pub ram_total_bytes: u64,
    pub request_count_total: u64,
    pub request_count_in_progress: u64,
    pub request_count_finished: u64,
    pub prompt_tokens_total: u64,
    pub generation_tokens_total: u64,
    pub total_tokens_total: u64,
    pub throughput_tokens_per_second: f64,
    pub throughput_requests_per_second: f64,
    pub avg_prompt_latency_seconds: f64,
    pub avg_generation_latency_seconds: f64,
    pub avg_total_latency_seconds: f64,
    pub queue_size: u64,
    pub time_in_queue_seconds: f64,
    pub num_active_requests: u64,
    pub num_waiting_requests: u64,
    pub num_finished_requests: u64,
    pub model_loaded: bool,
    pub model_name: Option<String>,
    pub port: u16,
}

impl VllmMetrics {
    /// GPU memory utilization as a percentage
    pub fn gpu_percent(&self) -> f64 {
        self.gpu_memory_utilization * 100.0
    }

    /// RAM usage as a ratio of total (0 when total is unknown)
    pub fn ram_utilization(&self) -> f64 {
        if self.ram_total_bytes == 0 {
            0.0
        } else {
            self.ram_used_bytes as f64 / self.ram_total_bytes as f64
        }
    }
}

/// Aggregates computed by the backend on top of raw telemetry
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    #[serde(default)]
    pub throughput_rps: Option<f64>,
    #[serde(default)]
    pub avg_ttft_ms: Option<f64>,
    #[serde(default)]
    pub requests_per_min: Option<f64>,
    #[serde(default)]
    pub cache_hit_rate: Option<f64>,
}

/// One frame of the metrics stream
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetricsMessage {
    pub timestamp: String,
    #[serde(default)]
    pub metrics: Option<VllmMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Log Types
// ============================================================================

/// Log severity level
///
/// The backend emits exactly five levels. Anything else decodes to
/// `Unknown`, which renders unstyled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Unknown,
}

impl Severity {
    /// The five levels the backend emits, in ascending order
    pub const ALL: [Severity; 5] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Critical,
    ];

    /// Parse a level name, case-insensitively
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Self::Debug,
            "INFO" => Self::Info,
            "WARNING" => Self::Warning,
            "ERROR" => Self::Error,
            "CRITICAL" => Self::Critical,
            _ => Self::Unknown,
        }
    }

    /// Wire name of this level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Short display string (3 chars)
    pub fn short(&self) -> &'static str {
        match self {
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Warning => "WRN",
            Self::Error => "ERR",
            Self::Critical => "CRT",
            Self::Unknown => "???",
        }
    }

    /// Get display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Debug => Color::DarkGray,
            Self::Info => Color::Cyan,
            Self::Warning => Color::Yellow,
            Self::Error => Color::Red,
            Self::Critical => Color::Magenta,
            Self::Unknown => Color::Reset,
        }
    }
}

impl From<String> for Severity {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Severity> for String {
    fn from(level: Severity) -> Self {
        level.as_str().to_string()
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log record from the log stream or history endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub level: Severity,
    pub message: String,
    #[serde(default)]
    pub raw_line: String,
}

impl LogRecord {
    pub fn new(timestamp: impl Into<String>, level: Severity, message: impl Into<String>) -> Self {
        let timestamp = timestamp.into();
        let message = message.into();
        let raw_line = format!("{} {} {}", timestamp, level, message);
        Self {
            timestamp,
            level,
            message,
            raw_line,
        }
    }

    /// The line to write when exporting (falls back to a synthesized line)
    pub fn export_line(&self) -> String {
        if self.raw_line.is_empty() {
            format!("{} {} {}", self.timestamp, self.level, self.message)
        } else {
            self.raw_line.clone()
        }
    }
}

/// Response of `GET /api/logs/history`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LogHistory {
    pub logs: Vec<LogRecord>,
    #[serde(default)]
    pub count: usize,
    #[serde(default)]
    pub timestamp: String,
}

// ============================================================================
// Connection State
// ============================================================================

/// State of a live stream connection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Reconnecting => "Reconnecting...",
            Self::Disconnected => "Disconnected",
        }
    }

    /// Compact label used by the header badge
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Connected => "Online",
            Self::Connecting => "Connecting...",
            Self::Reconnecting => "Reconnecting...",
            Self::Disconnected => "Offline",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Connected => Color::Green,
            Self::Connecting | Self::Reconnecting => Color::Yellow,
            Self::Disconnected => Color::Red,
        }
    }
}

// ============================================================================
// Cluster Types
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ClusterStatus {
    pub running: bool,
    pub head_healthy: bool,
    pub worker_healthy: bool,
    #[serde(default)]
    pub uptime: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeHealth {
    pub ip: String,
    pub healthy: bool,
    #[serde(default)]
    pub latency_ms: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NodeStatus {
    pub head: NodeHealth,
    pub worker: NodeHealth,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Uptime {
    #[serde(default)]
    pub uptime: Option<String>,
}

/// Cluster configuration as served by `GET /api/config`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub spark_docker_path: String,
    pub container_name: String,
    pub head_node_ip: String,
    pub worker_node_ips: Vec<String>,
    pub vllm_port: u16,
}

/// Response of `POST /api/config/reload`
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigReload {
    pub message: String,
    /// Raw config as read back by the backend
    #[serde(default)]
    pub config: serde_json::Value,
}

// ============================================================================
// Active Model Types
// ============================================================================

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelStatus {
    pub running: bool,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub uptime: Option<String>,
    pub port: u16,
    #[serde(default)]
    pub message: Option<String>,
}

/// Launch parameters for the serving engine
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelLaunchConfig {
    pub model_id: String,
    pub tensor_parallel: u32,
    pub gpu_memory_utilization: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_model_len: Option<u32>,
    #[serde(default)]
    pub enable_auto_tool_choice: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_parser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_parser: Option<String>,
    #[serde(default)]
    pub trust_remote_code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_format: Option<String>,
    pub port: u16,
}

impl ModelLaunchConfig {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            tensor_parallel: 2,
            gpu_memory_utilization: 0.9,
            max_model_len: None,
            enable_auto_tool_choice: false,
            tool_call_parser: None,
            reasoning_parser: None,
            trust_remote_code: false,
            load_format: None,
            port: 8000,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LaunchResult {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AvailableModel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantization: String,
    #[serde(default)]
    pub estimated_memory: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AvailableModelList {
    pub models: Vec<AvailableModel>,
}

// ============================================================================
// Inventory Types
// ============================================================================

/// A model stored on the cluster's local disk
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocalModel {
    pub id: String,
    pub name: String,
    pub size_gb: f64,
    #[serde(default)]
    pub quantization: Option<String>,
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(default)]
    pub security: Option<String>,
    #[serde(default)]
    pub downloaded_at: Option<String>,
    #[serde(default)]
    pub download_status: Option<String>,
    #[serde(default)]
    pub local_path: Option<String>,
}

impl LocalModel {
    /// Name for lists, falling back to the repository id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocalModelList {
    pub models: Vec<LocalModel>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub total_size_gb: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadRequest {
    pub model_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribute: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub message: String,
    pub model_id: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadState {
    #[default]
    Idle,
    Downloading,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DownloadStatus {
    pub model_id: String,
    pub progress: f64,
    pub status: DownloadState,
    #[serde(default)]
    pub downloaded_bytes: u64,
    #[serde(default)]
    pub total_bytes: Option<u64>,
    #[serde(default)]
    pub speed_mbps: Option<f64>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub freed_space_gb: Option<f64>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DistributeResponse {
    pub success: bool,
    pub message: String,
    #[serde(default)]
    pub distributed_to: Vec<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// Profile Types
// ============================================================================

/// A saved launch preset
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub model_id: String,
    pub config: ModelLaunchConfig,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateProfile {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub model_id: String,
    pub config: ModelLaunchConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UpdateProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ModelLaunchConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite: Option<bool>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfileLaunchResult {
    pub success: bool,
    pub message: String,
    pub profile_id: String,
    pub model_id: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ImportResult {
    pub imported: usize,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProfileExport {
    pub profiles_json: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_parse_is_case_insensitive() {
        assert_eq!(Severity::parse("warning"), Severity::Warning);
        assert_eq!(Severity::parse("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::parse("Info"), Severity::Info);
        assert_eq!(Severity::parse("TRACE"), Severity::Unknown);
    }

    #[test]
    fn test_unknown_severity_decodes_as_unstyled() {
        let record: LogRecord = serde_json::from_str(
            r#"{"timestamp":"2024-05-01T10:00:00","level":"NOTICE","message":"hi","raw_line":"hi"}"#,
        )
        .unwrap();
        assert_eq!(record.level, Severity::Unknown);
        assert_eq!(record.level.color(), Color::Reset);
    }

    #[test]
    fn test_metrics_message_with_null_metrics() {
        let msg: MetricsMessage =
            serde_json::from_str(r#"{"timestamp":"2024-05-01T10:00:00Z","metrics":null}"#).unwrap();
        assert!(msg.metrics.is_none());
        assert!(msg.derived.is_none());
        assert!(msg.error.is_none());
    }

    #[test]
    fn test_partial_metrics_default_to_zero() {
        let msg: MetricsMessage = serde_json::from_str(
            r#"{"timestamp":"t","metrics":{"avg_total_latency_seconds":0.25,"model_name":null}}"#,
        )
        .unwrap();
        let metrics = msg.metrics.unwrap();
        assert_eq!(metrics.avg_total_latency_seconds, 0.25);
        assert_eq!(metrics.queue_size, 0);
        assert!(!metrics.model_loaded);
    }

    #[test]
    fn test_download_state_lowercase() {
        let status: DownloadStatus = serde_json::from_str(
            r#"{"model_id":"m","progress":42.5,"status":"downloading","downloaded_bytes":10}"#,
        )
        .unwrap();
        assert_eq!(status.status, DownloadState::Downloading);
        assert!(status.total_bytes.is_none());
    }

    #[test]
    fn test_create_profile_skips_unset_fields() {
        let profile = CreateProfile {
            name: "fast".to_string(),
            description: None,
            model_id: "m".to_string(),
            config: ModelLaunchConfig::new("m"),
            favorite: None,
        };
        let value = serde_json::to_value(&profile).unwrap();
        assert!(value.get("description").is_none());
        assert!(value.get("favorite").is_none());
        assert_eq!(value["config"]["model_id"], "m");
    }
}
