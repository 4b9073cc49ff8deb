use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, Gauge, GraphType, Paragraph, Tabs},
};

use vllmscope_stream::{MetricKind, MetricsStream, MetricsSummary, local_time, project, y_domain};
use vllmscope_types::{MetricsMessage, VllmMetrics};

use crate::app::AppState;
use crate::ui::{Layout, Theme, panel};

/// Live charts for the running model
pub struct MetricsScreen;

impl MetricsScreen {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        state: &AppState,
        stream: Option<&MetricsStream>,
        theme: &Theme,
    ) {
        let current = stream.and_then(|s| s.current());
        let model_running = state
            .backend
            .model_status
            .as_ref()
            .is_none_or(|s| s.running);

        if !model_running && current.and_then(|c| c.metrics.as_ref()).is_none() {
            Self::render_not_running(frame, area, theme);
            return;
        }

        let rows = Layout::rows(area, [3, 3, 5]);
        Self::render_model_line(
            frame,
            rows[0],
            current.map(|c| (c.timestamp.as_str(), c.metrics.as_ref())),
            theme,
        );
        Self::render_summary(
            frame,
            rows[1],
            current.and_then(MetricsSummary::from_message),
            theme,
        );
        Self::render_gauges(frame, rows[2], current.and_then(|c| c.metrics.as_ref()), theme);

        let chart_rows = Layout::rows(rows[3], [3]);
        Self::render_tabs(frame, chart_rows[0], state.ui_state.metric_kind, theme);
        let history = stream.map(|s| s.history()).unwrap_or_default();
        Self::render_chart(frame, chart_rows[1], state.ui_state.metric_kind, &history, theme);
    }

    pub fn hints() -> Vec<(&'static str, &'static str)> {
        vec![
            ("h/←", "Prev metric"),
            ("l/→", "Next metric"),
            ("r", "Reconnect"),
            ("?", "Help"),
            ("q", "Quit"),
        ]
    }

    fn render_not_running(frame: &mut Frame, area: Rect, theme: &Theme) {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled("vLLM is not running", theme.text_highlight())),
            Line::from(""),
            Line::from(Span::styled(
                "Launch a model from the Inventory or Profiles screen to see live metrics.",
                theme.text_dim(),
            )),
        ];
        frame.render_widget(
            Paragraph::new(text)
                .alignment(Alignment::Center)
                .block(panel("Metrics", theme)),
            area,
        );
    }

    fn render_model_line(
        frame: &mut Frame,
        area: Rect,
        current: Option<(&str, Option<&VllmMetrics>)>,
        theme: &Theme,
    ) {
        let (timestamp, metrics) = current.unwrap_or(("", None));
        let model = metrics
            .and_then(|m| m.model_name.clone())
            .unwrap_or_else(|| "Unknown Model".to_string());
        let port = metrics.map(|m| m.port).unwrap_or(8000);
        let updated = if timestamp.is_empty() {
            "--".to_string()
        } else {
            local_time(timestamp)
        };

        let line = Line::from(vec![
            Span::styled(format!(" {}", model), theme.text_highlight()),
            Span::styled(" │ ", theme.text_dim()),
            Span::styled(format!("Port {}", port), theme.text()),
            Span::styled(" │ ", theme.text_dim()),
            Span::styled(format!("Last updated {}", updated), theme.text_dim()),
        ]);
        frame.render_widget(Paragraph::new(line).block(panel("Model", theme)), area);
    }

    fn render_summary(
        frame: &mut Frame,
        area: Rect,
        summary: Option<MetricsSummary>,
        theme: &Theme,
    ) {
        let summary = summary.unwrap_or_default();
        let tiles = [
            (
                "Throughput",
                format!("{:.1} tok/s", summary.throughput_tokens_per_sec),
            ),
            ("Avg TTFT", format!("{:.0} ms", summary.avg_ttft_ms)),
            ("Requests", format!("{:.1}/min", summary.requests_per_min)),
            ("Cache Hit", format!("{:.1}%", summary.cache_hit_rate)),
        ];

        let cells = Layout::columns(area, tiles.len() as u16);
        for ((title, value), cell) in tiles.into_iter().zip(cells) {
            frame.render_widget(
                Paragraph::new(Span::styled(value, theme.text_highlight()))
                    .alignment(Alignment::Center)
                    .block(panel(title, theme)),
                cell,
            );
        }
    }

    fn render_gauges(
        frame: &mut Frame,
        area: Rect,
        metrics: Option<&VllmMetrics>,
        theme: &Theme,
    ) {
        let default = VllmMetrics::default();
        let m = metrics.unwrap_or(&default);

        // Queue and request gauges use fixed scales of 10 and 50 for 100%
        let gauges = [
            ("GPU Memory", m.gpu_percent(), MetricKind::Gpu.color()),
            ("CPU Usage", m.cpu_utilization * 100.0, theme.primary),
            ("Queue Depth", m.queue_size as f64 * 10.0, MetricKind::Queue.color()),
            (
                "Active Requests",
                m.num_active_requests as f64 * 2.0,
                MetricKind::Requests.color(),
            ),
        ];

        let cells = Layout::columns(area, gauges.len() as u16);
        for ((title, percent, color), cell) in gauges.into_iter().zip(cells) {
            let ratio = (percent / 100.0).clamp(0.0, 1.0);
            let gauge = Gauge::default()
                .block(panel(title, theme))
                .gauge_style(Style::default().fg(color))
                .ratio(ratio)
                .label(format!("{:.0}%", ratio * 100.0));
            frame.render_widget(gauge, cell);
        }
    }

    fn render_tabs(frame: &mut Frame, area: Rect, selected: MetricKind, theme: &Theme) {
        let titles = MetricKind::ALL.iter().map(|k| Line::from(k.short()));
        let index = MetricKind::ALL
            .iter()
            .position(|k| *k == selected)
            .unwrap_or(0);
        let tabs = Tabs::new(titles)
            .select(index)
            .style(theme.text_dim())
            .highlight_style(
                Style::default()
                    .fg(selected.color())
                    .add_modifier(Modifier::BOLD),
            )
            .block(panel("Chart", theme));
        frame.render_widget(tabs, area);
    }

    fn render_chart(
        frame: &mut Frame,
        area: Rect,
        kind: MetricKind,
        history: &[MetricsMessage],
        theme: &Theme,
    ) {
        let points = project(history, kind);
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        let data: Vec<(f64, f64)> = values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64, *v))
            .collect();

        let (y_min, y_max) = y_domain(&values);
        let x_max = (data.len().saturating_sub(1)).max(1) as f64;
        let y_labels = [y_min, (y_min + y_max) / 2.0, y_max]
            .into_iter()
            .map(|v| Line::from(kind.format_axis(v)))
            .collect::<Vec<_>>();
        let x_labels = match (points.first(), points.last()) {
            (Some(first), Some(last)) => vec![Line::from(first.time.clone()), Line::from(last.time.clone())],
            _ => vec![Line::from("--")],
        };

        let dataset = Dataset::default()
            .name(kind.label())
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(kind.color()))
            .data(&data);

        let chart = Chart::new(vec![dataset])
            .block(panel(kind.label(), theme))
            .x_axis(
                Axis::default()
                    .style(theme.text_dim())
                    .bounds([0.0, x_max])
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .style(theme.text_dim())
                    .bounds([y_min, y_max])
                    .labels(y_labels),
            );

        frame.render_widget(chart, area);
    }
}
