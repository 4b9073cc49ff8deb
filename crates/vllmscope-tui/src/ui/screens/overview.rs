use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Sparkline},
};

use vllmscope_stream::{MetricKind, MetricsStream, MetricsSummary, project_all};

use crate::app::AppState;
use crate::ui::{Layout, Theme, panel};

/// Samples shown in each sparkline
const SPARKLINE_WIDTH: usize = 60;

/// Cluster, node and model status with live sparklines
pub struct OverviewScreen;

impl OverviewScreen {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        metrics: Option<&MetricsStream>,
        theme: &Theme,
    ) {
        let rows = Layout::rows(area, [7, 7, 3]);

        let top = Layout::columns(rows[0], 2);
        Self::render_cluster(frame, top[0], state, theme);
        Self::render_nodes(frame, top[1], state, theme);

        let middle = Layout::columns(rows[1], 2);
        Self::render_model(frame, middle[0], state, theme);
        Self::render_running_config(frame, middle[1], state, theme);

        Self::render_summary(frame, rows[2], metrics, theme);
        Self::render_sparklines(frame, rows[3], metrics, theme);
    }

    pub fn hints() -> Vec<(&'static str, &'static str)> {
        vec![
            ("s", "Start"),
            ("x", "Stop cluster"),
            ("m", "Stop model"),
            ("p", "Save profile"),
            ("Tab", "Screens"),
            ("?", "Help"),
            ("q", "Quit"),
        ]
    }

    fn field<'a>(
        label: &'a str,
        value: impl Into<String>,
        style: Style,
        theme: &Theme,
    ) -> Line<'a> {
        Line::from(vec![
            Span::styled(format!(" {:<10}", label), theme.text_dim()),
            Span::styled(value.into(), style),
        ])
    }

    fn status_word(ok: bool, yes: &str, no: &str, theme: &Theme) -> (String, Style) {
        if ok {
            (format!("● {}", yes), theme.health(true))
        } else {
            (format!("○ {}", no), theme.health(false))
        }
    }

    fn render_cluster(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
        let lines = match &state.backend.cluster {
            Some(cluster) => {
                let (running, running_style) =
                    Self::status_word(cluster.running, "Running", "Stopped", theme);
                let (head, head_style) =
                    Self::status_word(cluster.head_healthy, "Healthy", "Down", theme);
                let (worker, worker_style) =
                    Self::status_word(cluster.worker_healthy, "Healthy", "Down", theme);
                let uptime = state
                    .backend
                    .uptime
                    .clone()
                    .or_else(|| cluster.uptime.clone())
                    .unwrap_or_else(|| "--".to_string());

                let mut lines = vec![
                    Self::field("Cluster", running, running_style, theme),
                    Self::field("Head", head, head_style, theme),
                    Self::field("Worker", worker, worker_style, theme),
                    Self::field("Uptime", uptime, theme.text(), theme),
                ];
                if let Some(msg) = &cluster.message {
                    lines.push(Self::field("Message", msg.clone(), theme.text_dim(), theme));
                }
                lines
            }
            None => vec![Line::from(Span::styled(" Loading...", theme.text_dim()))],
        };

        frame.render_widget(Paragraph::new(lines).block(panel("Cluster", theme)), area);
    }

    fn render_nodes(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
        let lines = match &state.backend.nodes {
            Some(nodes) => [("Head", &nodes.head), ("Worker", &nodes.worker)]
                .into_iter()
                .flat_map(|(role, node)| {
                    let (health, style) =
                        Self::status_word(node.healthy, "Reachable", "Unreachable", theme);
                    let latency = node
                        .latency_ms
                        .map(|ms| format!("{:.1} ms", ms))
                        .unwrap_or_else(|| "--".to_string());
                    [
                        Self::field(role, node.ip.clone(), theme.text_highlight(), theme),
                        Self::field("", format!("{}  {}", health, latency), style, theme),
                    ]
                })
                .collect(),
            None => vec![Line::from(Span::styled(" Loading...", theme.text_dim()))],
        };

        frame.render_widget(Paragraph::new(lines).block(panel("Nodes", theme)), area);
    }

    fn render_model(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
        let lines = match &state.backend.model_status {
            Some(status) => {
                let (running, style) =
                    Self::status_word(status.running, "Serving", "Not running", theme);
                let mut lines = vec![
                    Self::field("Status", running, style, theme),
                    Self::field(
                        "Model",
                        status.model_id.clone().unwrap_or_else(|| "--".to_string()),
                        theme.text_highlight(),
                        theme,
                    ),
                    Self::field(
                        "Uptime",
                        status.uptime.clone().unwrap_or_else(|| "--".to_string()),
                        theme.text(),
                        theme,
                    ),
                    Self::field("Port", status.port.to_string(), theme.text(), theme),
                ];
                if let Some(msg) = &status.message {
                    lines.push(Self::field("Message", msg.clone(), theme.text_dim(), theme));
                }
                lines
            }
            None => vec![Line::from(Span::styled(" Loading...", theme.text_dim()))],
        };

        frame.render_widget(Paragraph::new(lines).block(panel("Model", theme)), area);
    }

    fn render_running_config(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
        let lines = match &state.backend.running_config {
            Some(config) => vec![
                Self::field("TP size", config.tensor_parallel.to_string(), theme.text(), theme),
                Self::field(
                    "GPU util",
                    format!("{:.0}%", config.gpu_memory_utilization * 100.0),
                    theme.text(),
                    theme,
                ),
                Self::field(
                    "Max len",
                    config
                        .max_model_len
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "auto".to_string()),
                    theme.text(),
                    theme,
                ),
                Self::field(
                    "Tools",
                    config.tool_call_parser.clone().unwrap_or_else(|| "off".to_string()),
                    theme.text(),
                    theme,
                ),
                Self::field("Port", config.port.to_string(), theme.text(), theme),
            ],
            None => vec![Line::from(Span::styled(
                " No model launched",
                theme.text_dim(),
            ))],
        };

        frame.render_widget(
            Paragraph::new(lines).block(panel("Launch Config", theme)),
            area,
        );
    }

    fn render_summary(
        frame: &mut Frame,
        area: Rect,
        metrics: Option<&MetricsStream>,
        theme: &Theme,
    ) {
        let summary = metrics
            .and_then(|m| m.current())
            .and_then(MetricsSummary::from_message);

        let line = match summary {
            Some(s) => Line::from(vec![
                Span::styled(" Throughput ", theme.text_dim()),
                Span::styled(format!("{:.1} tok/s", s.throughput_tokens_per_sec), theme.text_highlight()),
                Span::styled("  │  TTFT ", theme.text_dim()),
                Span::styled(format!("{:.0} ms", s.avg_ttft_ms), theme.text_highlight()),
                Span::styled("  │  Requests ", theme.text_dim()),
                Span::styled(format!("{:.1}/min", s.requests_per_min), theme.text_highlight()),
                Span::styled("  │  Cache hit ", theme.text_dim()),
                Span::styled(format!("{:.1}%", s.cache_hit_rate), theme.text_highlight()),
            ]),
            None => Line::from(Span::styled(" Waiting for metrics...", theme.text_dim())),
        };

        frame.render_widget(Paragraph::new(line).block(panel("Live", theme)), area);
    }

    fn render_sparklines(
        frame: &mut Frame,
        area: Rect,
        metrics: Option<&MetricsStream>,
        theme: &Theme,
    ) {
        let rows = metrics.map(|m| project_all(&m.history())).unwrap_or_default();
        let start = rows.len().saturating_sub(SPARKLINE_WIDTH);
        let rows = &rows[start..];

        let kinds = [
            MetricKind::Throughput,
            MetricKind::Latency,
            MetricKind::Gpu,
            MetricKind::Queue,
        ];
        let cells = Layout::columns(area, kinds.len() as u16);
        for (kind, cell) in kinds.into_iter().zip(cells) {
            // Sparklines need integers; values are rounded in display units
            let data: Vec<u64> = rows
                .iter()
                .map(|r| r.get(kind).max(0.0).round() as u64)
                .collect();
            let title = match rows.last() {
                Some(last) => format!("{} {}", kind.short(), kind.format_axis(last.get(kind))),
                None => kind.short().to_string(),
            };
            let sparkline = Sparkline::default()
                .block(panel(&title, theme))
                .data(&data)
                .style(Style::default().fg(kind.color()));
            frame.render_widget(sparkline, cell);
        }
    }
}
