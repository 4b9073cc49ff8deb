//! Chart views derived from the metrics history.
//!
//! Everything here is a pure function of a history snapshot and is cheap
//! enough to recompute on every frame.

use chrono::{DateTime, Local};
use ratatui::style::Color;

use vllmscope_types::{MetricsMessage, VllmMetrics};

/// Fallback padding when the largest value is zero
const ZERO_PADDING: f64 = 10.0;

/// Domain used when there is nothing to plot
pub const EMPTY_DOMAIN: (f64, f64) = (0.0, 100.0);

/// A chartable metric
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MetricKind {
    #[default]
    Throughput,
    Latency,
    Queue,
    Gpu,
    Requests,
}

impl MetricKind {
    pub const ALL: [MetricKind; 5] = [
        Self::Throughput,
        Self::Latency,
        Self::Queue,
        Self::Gpu,
        Self::Requests,
    ];

    /// Extract the value in display units
    pub fn extract(&self, metrics: &VllmMetrics) -> f64 {
        match self {
            Self::Throughput => metrics.throughput_tokens_per_second,
            Self::Latency => metrics.avg_total_latency_seconds * 1000.0,
            Self::Queue => metrics.queue_size as f64,
            Self::Gpu => metrics.gpu_memory_utilization * 100.0,
            Self::Requests => metrics.num_active_requests as f64,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Throughput => "Throughput (tokens/sec)",
            Self::Latency => "Latency (ms)",
            Self::Queue => "Queue Size",
            Self::Gpu => "GPU Memory (%)",
            Self::Requests => "Active Requests",
        }
    }

    /// Short name for tabs
    pub fn short(&self) -> &'static str {
        match self {
            Self::Throughput => "Throughput",
            Self::Latency => "Latency",
            Self::Queue => "Queue",
            Self::Gpu => "GPU",
            Self::Requests => "Requests",
        }
    }

    /// Format an axis tick
    pub fn format_axis(&self, value: f64) -> String {
        match self {
            Self::Latency => format!("{:.0}ms", value),
            Self::Throughput => format!("{:.0} tok/s", value),
            Self::Gpu => format!("{:.0}%", value),
            Self::Queue | Self::Requests => format!("{:.0}", value),
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Throughput => Color::Rgb(0x22, 0xc5, 0x5e),
            Self::Latency => Color::Rgb(0x3b, 0x82, 0xf6),
            Self::Queue => Color::Rgb(0xf5, 0x9e, 0x0b),
            Self::Gpu => Color::Rgb(0xef, 0x44, 0x44),
            Self::Requests => Color::Rgb(0x8b, 0x5c, 0xf6),
        }
    }

    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|k| k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        let idx = Self::ALL.iter().position(|k| k == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// One plotted sample
#[derive(Clone, Debug, PartialEq)]
pub struct ChartPoint {
    /// Sample timestamp as sent by the backend
    pub timestamp: String,
    /// Local wall-clock time for the x-axis
    pub time: String,
    pub value: f64,
}

/// All five metrics for one sample
#[derive(Clone, Debug, PartialEq)]
pub struct MultiMetricRow {
    pub time: String,
    pub throughput: f64,
    pub latency: f64,
    pub queue: f64,
    pub gpu: f64,
    pub requests: f64,
}

impl MultiMetricRow {
    pub fn get(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::Throughput => self.throughput,
            MetricKind::Latency => self.latency,
            MetricKind::Queue => self.queue,
            MetricKind::Gpu => self.gpu,
            MetricKind::Requests => self.requests,
        }
    }
}

/// Render a backend timestamp as local `HH:MM:SS`
///
/// Unparseable timestamps are shown as sent.
pub fn local_time(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(dt) => dt.with_timezone(&Local).format("%H:%M:%S").to_string(),
        Err(_) => timestamp.to_string(),
    }
}

/// Project the history onto one metric, skipping samples without metrics
pub fn project(history: &[MetricsMessage], kind: MetricKind) -> Vec<ChartPoint> {
    history
        .iter()
        .filter_map(|msg| {
            let metrics = msg.metrics.as_ref()?;
            Some(ChartPoint {
                timestamp: msg.timestamp.clone(),
                time: local_time(&msg.timestamp),
                value: kind.extract(metrics),
            })
        })
        .collect()
}

/// Project the history onto every metric at once
pub fn project_all(history: &[MetricsMessage]) -> Vec<MultiMetricRow> {
    history
        .iter()
        .filter_map(|msg| {
            let m = msg.metrics.as_ref()?;
            Some(MultiMetricRow {
                time: local_time(&msg.timestamp),
                throughput: MetricKind::Throughput.extract(m),
                latency: MetricKind::Latency.extract(m),
                queue: MetricKind::Queue.extract(m),
                gpu: MetricKind::Gpu.extract(m),
                requests: MetricKind::Requests.extract(m),
            })
        })
        .collect()
}

/// Y-axis bounds for a series: `[max(0, min - pad), max + pad]`
///
/// `pad` is a tenth of the largest value, or 10 when that is zero.
pub fn y_domain(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return EMPTY_DOMAIN;
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut pad = max * 0.1;
    if pad == 0.0 {
        pad = ZERO_PADDING;
    }

    ((min - pad).max(0.0), max + pad)
}

/// Headline numbers for the current sample
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MetricsSummary {
    pub throughput_tokens_per_sec: f64,
    pub avg_ttft_ms: f64,
    pub requests_per_min: f64,
    pub cache_hit_rate: f64,
}

impl MetricsSummary {
    /// Prefer backend-derived values, falling back to raw metrics
    pub fn from_message(msg: &MetricsMessage) -> Option<Self> {
        let metrics = msg.metrics.as_ref()?;
        let derived = msg.derived.as_ref();

        Some(Self {
            throughput_tokens_per_sec: metrics.throughput_tokens_per_second,
            avg_ttft_ms: derived
                .and_then(|d| d.avg_ttft_ms)
                .unwrap_or(metrics.avg_prompt_latency_seconds * 1000.0),
            requests_per_min: derived
                .and_then(|d| d.requests_per_min)
                .unwrap_or(metrics.num_active_requests as f64 * 60.0),
            cache_hit_rate: derived.and_then(|d| d.cache_hit_rate).unwrap_or(0.0),
        })
    }
}
