use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
};

use crate::app::AppState;
use crate::config::{LOG_BUFFER_SIZES, REFRESH_RATES_MS};
use crate::ui::{Layout, Theme, panel};

/// Display preferences and the backend's cluster configuration
pub struct SettingsScreen;

impl SettingsScreen {
    pub fn render(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
        let (display_area, cluster_area) = Layout::list_detail(area, 50);
        Self::render_display(frame, display_area, state, theme);
        Self::render_cluster(frame, cluster_area, state, theme);
    }

    pub fn hints() -> Vec<(&'static str, &'static str)> {
        vec![
            ("t", "Theme"),
            ("f", "Refresh rate"),
            ("b", "Buffer size"),
            ("R", "Reset"),
            ("l", "Reload config"),
            ("?", "Help"),
        ]
    }

    fn choices<T: PartialEq + Copy>(
        values: &[T],
        current: T,
        theme: &Theme,
        fmt: impl Fn(T) -> String,
    ) -> Vec<Span<'static>> {
        values
            .iter()
            .map(|v| {
                if *v == current {
                    Span::styled(format!("[{}] ", fmt(*v)), theme.text_highlight())
                } else {
                    Span::styled(format!(" {}  ", fmt(*v)), theme.text_dim())
                }
            })
            .collect()
    }

    fn render_display(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
        let settings = &state.settings;

        let mut refresh = vec![Span::styled(" Refresh      ", theme.text_dim())];
        refresh.extend(Self::choices(
            &REFRESH_RATES_MS,
            settings.metrics_refresh_rate_ms,
            theme,
            |ms| format!("{}s", ms / 1000),
        ));

        let mut buffer = vec![Span::styled(" Log buffer   ", theme.text_dim())];
        buffer.extend(Self::choices(
            &LOG_BUFFER_SIZES,
            settings.log_buffer_size,
            theme,
            |n| n.to_string(),
        ));

        let lines = vec![
            Line::from(vec![
                Span::styled(" Theme        ", theme.text_dim()),
                Span::styled(settings.theme.label(), theme.text_highlight()),
            ]),
            Line::from(refresh),
            Line::from(buffer),
            Line::from(""),
            Line::from(Span::styled(
                " A new buffer size restarts the live log stream.",
                theme.text_dim(),
            )),
        ];

        frame.render_widget(Paragraph::new(lines).block(panel("Display", theme)), area);
    }

    fn render_cluster(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
        let field = |label: &'static str, value: String| {
            Line::from(vec![
                Span::styled(format!(" {:<14}", label), theme.text_dim()),
                Span::styled(value, theme.text()),
            ])
        };

        let lines = match &state.backend.config {
            Some(config) => vec![
                field("Head node", config.head_node_ip.clone()),
                field("Workers", config.worker_node_ips.join(", ")),
                field("Container", config.container_name.clone()),
                field("Docker path", config.spark_docker_path.clone()),
                field("vLLM port", config.vllm_port.to_string()),
            ],
            None => vec![Line::from(Span::styled(" Loading...", theme.text_dim()))],
        };

        frame.render_widget(Paragraph::new(lines).block(panel("Cluster Config", theme)), area);
    }
}
