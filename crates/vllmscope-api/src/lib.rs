//! REST client for the vllmscope backend
//!
//! This crate provides typed access to the cluster, inventory, config,
//! model, profile and log endpoints.

mod client;
mod error;

pub use client::{ApiClient, DEFAULT_API_URL, DEFAULT_WS_URL, LogDownload};
pub use error::{ApiError, Result};

// Re-export types that are used in our public API
pub use vllmscope_types::{
    AvailableModelList, CancelResponse, ClusterConfig, ClusterStatus, ConfigReload, CreateProfile,
    DeleteResponse, DistributeResponse, DownloadRequest, DownloadResponse, DownloadStatus,
    ImportResult, LaunchResult, LocalModel, LocalModelList, LogHistory, ModelLaunchConfig,
    ModelStatus, NodeStatus, Profile, ProfileExport, ProfileLaunchResult, Severity, UpdateProfile,
};
