use ratatui::{
    Frame,
    layout::Rect,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

use vllmscope_types::Profile;

use crate::app::AppState;
use crate::ui::components::{ListSelector, ListSelectorExt};
use crate::ui::{Layout, Theme, panel};

/// Saved launch profiles
pub struct ProfilesScreen;

impl ProfilesScreen {
    pub fn render(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
        let (list_area, detail_area) = Layout::list_detail(area, 45);

        let items = state.backend.profiles.iter().map(|p| {
            let star = if p.favorite { "★ " } else { "  " };
            (format!("{}{}", star, p.name), p.favorite)
        });
        let title = format!("Profiles ({})", state.backend.profiles.len());
        let selector = ListSelector::new(title, *theme).items(items);
        frame.render_list_selector(list_area, selector, &mut state.ui_state.list_state);

        Self::render_detail(frame, detail_area, state.selected_profile(), theme);
    }

    pub fn hints() -> Vec<(&'static str, &'static str)> {
        vec![
            ("Enter", "Launch"),
            ("f", "Favorite"),
            ("d", "Delete"),
            ("e", "Export"),
            ("i", "Import"),
            ("?", "Help"),
        ]
    }

    fn render_detail(frame: &mut Frame, area: Rect, profile: Option<&Profile>, theme: &Theme) {
        let Some(profile) = profile else {
            frame.render_widget(
                Paragraph::new(Span::styled(" No profiles saved", theme.text_dim()))
                    .block(panel("Profile", theme)),
                area,
            );
            return;
        };

        let field = |label: &'static str, value: String| {
            Line::from(vec![
                Span::styled(format!(" {:<14}", label), theme.text_dim()),
                Span::styled(value, theme.text()),
            ])
        };
        let flag = |on: bool| String::from(if on { "yes" } else { "no" });
        let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "--".to_string());

        let config = &profile.config;
        let mut lines = vec![
            Line::from(Span::styled(format!(" {}", profile.name), theme.text_highlight())),
        ];
        if let Some(desc) = &profile.description {
            lines.push(Line::from(Span::styled(format!(" {}", desc), theme.text_dim())));
        }
        lines.extend([
            Line::from(""),
            field("Model", profile.model_id.clone()),
            field("Tensor par.", config.tensor_parallel.to_string()),
            field(
                "GPU memory",
                format!("{:.0}%", config.gpu_memory_utilization * 100.0),
            ),
            field(
                "Max length",
                config
                    .max_model_len
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "auto".to_string()),
            ),
            field("Port", config.port.to_string()),
            field("Auto tools", flag(config.enable_auto_tool_choice)),
            field("Tool parser", opt(&config.tool_call_parser)),
            field("Reasoning", opt(&config.reasoning_parser)),
            field("Remote code", flag(config.trust_remote_code)),
            field("Load format", opt(&config.load_format)),
            Line::from(""),
            field("Created", opt(&profile.created_at)),
            field("Updated", opt(&profile.updated_at)),
        ]);

        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(panel("Profile", theme)),
            area,
        );
    }
}
