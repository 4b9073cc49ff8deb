use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Wrap},
};

use vllmscope_types::{AvailableModel, DownloadState, DownloadStatus, LocalModel, ModelLaunchConfig};

use crate::app::{AppState, InventoryView};
use crate::ui::components::{ListSelector, ListSelectorExt};
use crate::ui::{Layout, Theme, panel};

/// Downloaded models, the models the backend can launch, and the active download
pub struct InventoryScreen;

impl InventoryScreen {
    pub fn render(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
        let download = state
            .backend
            .download_status
            .as_ref()
            .filter(|d| d.status != DownloadState::Idle)
            .cloned();

        let (body, download_area) = match download {
            Some(_) => {
                let rows = Layout::rows(area, [3]);
                (rows[1], Some(rows[0]))
            }
            None => (area, None),
        };
        if let (Some(status), Some(download_area)) = (&download, download_area) {
            Self::render_download(frame, download_area, status, theme);
        }

        let (list_area, detail_area) = Layout::list_detail(body, 55);
        match state.ui_state.inventory_view {
            InventoryView::Local => Self::render_local(frame, list_area, detail_area, state, theme),
            InventoryView::Launchable => {
                Self::render_launchable(frame, list_area, detail_area, state, theme)
            }
        }
    }

    pub fn hints(state: &AppState) -> Vec<(&'static str, &'static str)> {
        match state.ui_state.inventory_view {
            InventoryView::Local => vec![
                ("v", "Launchable"),
                ("n", "Download"),
                ("d", "Delete"),
                ("p", "Distribute"),
                ("c", "Cancel download"),
                ("?", "Help"),
            ],
            InventoryView::Launchable => vec![
                ("v", "Local"),
                ("Enter", "Launch"),
                ("n", "Download"),
                ("?", "Help"),
            ],
        }
    }

    fn render_local(
        frame: &mut Frame,
        list_area: Rect,
        detail_area: Rect,
        state: &mut AppState,
        theme: &Theme,
    ) {
        let running = state
            .backend
            .model_status
            .as_ref()
            .filter(|s| s.running)
            .and_then(|s| s.model_id.clone());

        let (title, items): (String, Vec<(String, bool)>) = match &state.backend.models {
            Some(list) => (
                format!(
                    "Local models ({}, {:.1} GB)",
                    list.total_count.max(list.models.len()),
                    list.total_size_gb
                ),
                list.models
                    .iter()
                    .map(|m| {
                        let is_running = running.as_deref() == Some(m.id.as_str());
                        (Self::list_entry(m, is_running), is_running)
                    })
                    .collect(),
            ),
            None => ("Local models (loading)".to_string(), Vec::new()),
        };

        let selector = ListSelector::new(title, *theme).items(items);
        frame.render_list_selector(list_area, selector, &mut state.ui_state.list_state);

        let selected = state
            .selected_index()
            .and_then(|i| state.backend.models.as_ref()?.models.get(i));
        Self::render_detail(frame, detail_area, selected, theme);
    }

    fn render_launchable(
        frame: &mut Frame,
        list_area: Rect,
        detail_area: Rect,
        state: &mut AppState,
        theme: &Theme,
    ) {
        let (title, items): (String, Vec<(String, bool)>) = match &state.backend.available_models
        {
            Some(list) => (
                format!("Launchable models ({})", list.models.len()),
                list.models
                    .iter()
                    .map(|m| (format!("{}  {}", m.name, m.quantization), false))
                    .collect(),
            ),
            None => ("Launchable models (loading)".to_string(), Vec::new()),
        };

        let selector = ListSelector::new(title, *theme).items(items);
        frame.render_list_selector(list_area, selector, &mut state.ui_state.list_state);

        Self::render_available(frame, detail_area, state.selected_available_model(), theme);
    }

    fn list_entry(model: &LocalModel, is_running: bool) -> String {
        let quant = model.quantization.as_deref().unwrap_or("-");
        let marker = if is_running { " (running)" } else { "" };
        format!("{}  {:.1} GB  {}{}", model.display_name(), model.size_gb, quant, marker)
    }

    fn render_detail(frame: &mut Frame, area: Rect, model: Option<&LocalModel>, theme: &Theme) {
        let Some(model) = model else {
            frame.render_widget(
                Paragraph::new(Span::styled(" No model selected", theme.text_dim()))
                    .block(panel("Details", theme)),
                area,
            );
            return;
        };

        let field = |label: &'static str, value: Option<&str>| {
            Line::from(vec![
                Span::styled(format!(" {:<12}", label), theme.text_dim()),
                Span::styled(value.unwrap_or("--").to_string(), theme.text()),
            ])
        };

        let size = format!("{:.2} GB", model.size_gb);
        let lines = vec![
            Line::from(Span::styled(format!(" {}", model.id), theme.text_highlight())),
            Line::from(""),
            field("Size", Some(&size)),
            field("Quantization", model.quantization.as_deref()),
            field("Revision", model.revision.as_deref()),
            field("Security", model.security.as_deref()),
            field("Downloaded", model.downloaded_at.as_deref()),
            field("Status", model.download_status.as_deref()),
            field("Path", model.local_path.as_deref()),
        ];

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(panel("Details", theme)),
            area,
        );
    }

    fn render_available(
        frame: &mut Frame,
        area: Rect,
        model: Option<&AvailableModel>,
        theme: &Theme,
    ) {
        let Some(model) = model else {
            frame.render_widget(
                Paragraph::new(Span::styled(" No model selected", theme.text_dim()))
                    .block(panel("Launch", theme)),
                area,
            );
            return;
        };

        let field = |label: &'static str, value: &str| {
            let value = if value.is_empty() { "--" } else { value };
            Line::from(vec![
                Span::styled(format!(" {:<12}", label), theme.text_dim()),
                Span::styled(value.to_string(), theme.text()),
            ])
        };

        let defaults = ModelLaunchConfig::new(model.id.clone());
        let mut lines = vec![
            Line::from(Span::styled(format!(" {}", model.name), theme.text_highlight())),
        ];
        if !model.description.is_empty() {
            lines.push(Line::from(Span::styled(
                format!(" {}", model.description),
                theme.text_dim(),
            )));
        }
        lines.extend([
            Line::from(""),
            field("Id", &model.id),
            field("Quantization", &model.quantization),
            field("Memory", &model.estimated_memory),
            Line::from(""),
            Line::from(Span::styled(
                format!(
                    " Enter launches with tensor parallel {}, {:.0}% GPU memory, port {}.",
                    defaults.tensor_parallel,
                    defaults.gpu_memory_utilization * 100.0,
                    defaults.port
                ),
                theme.text_dim(),
            )),
        ]);

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(panel("Launch", theme)),
            area,
        );
    }

    fn render_download(frame: &mut Frame, area: Rect, status: &DownloadStatus, theme: &Theme) {
        let color = match status.status {
            DownloadState::Failed | DownloadState::Cancelled => Theme::ERROR,
            DownloadState::Completed => Theme::SUCCESS,
            DownloadState::Downloading | DownloadState::Idle => theme.primary,
        };

        let mut label = format!("{} {:.0}%", status.model_id, status.progress);
        if let Some(speed) = status.speed_mbps {
            label.push_str(&format!(" · {:.1} MB/s", speed));
        }
        if let Some(err) = &status.error_message {
            label.push_str(&format!(" · {}", err));
        }

        let gauge = Gauge::default()
            .block(panel(download_title(status.status), theme))
            .gauge_style(Style::default().fg(color))
            .ratio((status.progress / 100.0).clamp(0.0, 1.0))
            .label(label);
        frame.render_widget(gauge, area);
    }
}

fn download_title(state: DownloadState) -> &'static str {
    match state {
        DownloadState::Downloading => "Downloading",
        DownloadState::Completed => "Download complete",
        DownloadState::Failed => "Download failed",
        DownloadState::Cancelled => "Download cancelled",
        DownloadState::Idle => "Download",
    }
}
