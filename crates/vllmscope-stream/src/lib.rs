//! Live stream client for vllmscope
//!
//! This crate provides the websocket stream client with reconnection,
//! the bounded history buffer, and the pure views (log filters, metric
//! projections) computed over it.

mod backoff;
mod buffer;
mod client;
mod codec;
mod connection;
mod filter;
mod projection;

pub use backoff::BackoffPolicy;
pub use buffer::HistoryBuffer;
pub use client::{ErrorCallback, StreamClient, TransportEvent, TransportEventKind};
pub use codec::{DecodeError, LogCodec, MetricsCodec, StreamCodec, endpoint_url};
pub use connection::{CONNECTION_ERROR, Command, ConnectionManager, RETRIES_EXHAUSTED};
pub use filter::{LevelCounts, LogFilter};
pub use projection::{
    ChartPoint, EMPTY_DOMAIN, MetricKind, MetricsSummary, MultiMetricRow, local_time, project,
    project_all, y_domain,
};

/// Metrics stream client
pub type MetricsStream = StreamClient<MetricsCodec>;

/// Log stream client
pub type LogStream = StreamClient<LogCodec>;

// Re-export types used in our public API
pub use vllmscope_types::{ConnectionState, LogRecord, MetricsMessage, Severity};
