use ratatui::{
    Frame,
    layout::{Margin, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState},
};

use vllmscope_stream::{LevelCounts, LogFilter, LogStream};
use vllmscope_types::{LogRecord, Severity};

use crate::app::{AppState, LogSource};
use crate::ui::{Layout, Theme, panel};

/// Log viewer screen
pub struct LogsScreen;

/// Safely truncate a string to a maximum byte length, finding the nearest valid UTF-8 boundary
fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut pos = max_bytes;
    while pos > 0 && !s.is_char_boundary(pos) {
        pos -= 1;
    }
    &s[..pos]
}

/// Records behind the current view, before filtering
fn source_records(state: &AppState, stream: Option<&LogStream>) -> Vec<LogRecord> {
    match state.ui_state.log_source {
        LogSource::Live => stream.map(|s| s.history()).unwrap_or_default(),
        LogSource::History => state.backend.log_history.clone(),
    }
}

/// Rebuild the filter cache when the filter, source or records changed
pub fn refresh_filtered(state: &mut AppState, stream: Option<&LogStream>) {
    let source = state.ui_state.log_source;
    let generation = state.log_generation;
    if !state
        .ui_state
        .filter_cache
        .needs_refresh(&state.ui_state.log_filter, source, generation)
    {
        return;
    }

    let records = source_records(state, stream);
    let filtered = state.ui_state.log_filter.apply(&records);
    let filter = state.ui_state.log_filter.clone();
    state
        .ui_state
        .filter_cache
        .update(&filter, source, generation, filtered);
}

impl LogsScreen {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        state: &mut AppState,
        stream: Option<&LogStream>,
        theme: &Theme,
    ) {
        let show_filter_bar =
            state.ui_state.search_active || state.ui_state.log_filter.has_active_filters();

        let mut heights = Vec::new();
        if state.ui_state.stats_visible {
            heights.push(3);
        }
        if show_filter_bar {
            heights.push(3);
        }
        let rows = match heights.as_slice() {
            [a, b] => Layout::rows(area, [*a, *b]),
            [a] => Layout::rows(area, [*a]),
            _ => vec![area],
        };

        let mut idx = 0;
        if state.ui_state.stats_visible {
            let records = source_records(state, stream);
            Self::render_stats_bar(frame, rows[idx], &records, &state.ui_state.log_filter, theme);
            idx += 1;
        }
        if show_filter_bar {
            Self::render_filter_bar(frame, rows[idx], state, theme);
            idx += 1;
        }

        refresh_filtered(state, stream);
        Self::render_logs(frame, rows[idx], state, theme);
    }

    pub fn hints(state: &AppState) -> Vec<(&'static str, &'static str)> {
        if state.ui_state.search_active {
            return vec![("Enter", "Keep"), ("Esc", "Cancel"), ("Ctrl+u", "Clear")];
        }
        vec![
            ("/", "Search"),
            ("DIWEC", "Levels"),
            ("f", "Follow"),
            ("h", "History"),
            ("e", "Export"),
            ("?", "Help"),
        ]
    }

    /// Right side of the status bar
    pub fn status_text(state: &AppState) -> String {
        let follow = if state.ui_state.auto_scroll {
            "follow"
        } else {
            "paused"
        };
        format!(
            "{} │ {} │ {} lines",
            state.ui_state.log_source.label(),
            follow,
            state.ui_state.filter_cache.cached_entries.len()
        )
    }

    fn render_filter_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
        let mut spans = vec![];

        if state.ui_state.search_active {
            spans.push(Span::styled(
                " /",
                Style::default()
                    .fg(theme.highlight)
                    .add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                state.ui_state.search_input.clone(),
                theme.text_highlight(),
            ));
            spans.push(Span::styled(
                "█",
                Style::default()
                    .fg(theme.highlight)
                    .add_modifier(Modifier::SLOW_BLINK),
            ));
        } else {
            spans.push(Span::styled(" Search: ", theme.text_dim()));
            let search = state.ui_state.log_filter.search();
            if search.is_empty() {
                spans.push(Span::styled("--", theme.text_dim()));
            } else {
                spans.push(Span::styled(search.to_string(), theme.text_highlight()));
            }
        }

        let levels = state.ui_state.log_filter.levels();
        if !levels.is_empty() {
            spans.push(Span::styled("  Levels: ", theme.text_dim()));
            for level in levels {
                spans.push(Span::styled(format!("{} ", level.short()), theme.level_tag(*level)));
            }
        }

        if !state.ui_state.search_active {
            spans.push(Span::styled("  [n] Clear  [/] Edit", theme.text_dim()));
        }

        let filter_bar = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(if state.ui_state.search_active {
                    theme.border_focused()
                } else {
                    theme.border()
                })
                .title(Span::styled(" Search/Filter ", theme.title())),
        );

        frame.render_widget(filter_bar, area);
    }

    fn render_stats_bar(
        frame: &mut Frame,
        area: Rect,
        records: &[LogRecord],
        filter: &LogFilter,
        theme: &Theme,
    ) {
        let counts = LevelCounts::from_records(records);

        let mut spans = vec![Span::styled(" ", theme.text())];
        for level in Severity::ALL.iter().rev() {
            let label = if filter.is_level_selected(*level) {
                format!("[{}]:", level.short())
            } else {
                format!("{}:", level.short())
            };
            spans.push(Span::styled(label, theme.level_tag(*level)));
            spans.push(Span::styled(format!("{} ", counts.get(*level)), theme.text()));
        }
        if counts.unknown > 0 {
            spans.push(Span::styled("???:", theme.text_dim()));
            spans.push(Span::styled(format!("{} ", counts.unknown), theme.text()));
        }

        spans.push(Span::styled("│ ", theme.text_dim()));
        spans.push(Span::styled("Total:", theme.text_dim()));
        spans.push(Span::styled(format!("{}", counts.total()), theme.text()));

        frame.render_widget(Paragraph::new(Line::from(spans)).block(panel("Stats", theme)), area);
    }

    fn render_logs(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
        let total_logs = state.ui_state.filter_cache.cached_entries.len();

        // Calculate visible area (accounting for border)
        let inner_height = area.height.saturating_sub(2) as usize;

        // Auto-scroll: if at bottom, stay at bottom
        if state.ui_state.auto_scroll && total_logs > 0 {
            state.ui_state.log_scroll = total_logs.saturating_sub(inner_height);
        }

        // Clamp scroll position
        let max_scroll = total_logs.saturating_sub(inner_height);
        if state.ui_state.log_scroll > max_scroll {
            state.ui_state.log_scroll = max_scroll;
        }

        // Message width minus borders and scrollbar
        let inner_width = area.width.saturating_sub(4) as usize;

        let lines: Vec<Line> = state
            .ui_state
            .filter_cache
            .cached_entries
            .iter()
            .skip(state.ui_state.log_scroll)
            .take(inner_height)
            .map(|entry| {
                Self::format_line(
                    entry,
                    state.ui_state.show_timestamps,
                    &state.ui_state.log_filter,
                    inner_width,
                    theme,
                )
            })
            .collect();

        let source = match state.ui_state.log_source {
            LogSource::Live => "Logs",
            LogSource::History => "Log History",
        };
        let title = if state.ui_state.log_filter.has_active_filters() {
            format!(" {} ({} matching) ", source, total_logs)
        } else {
            format!(" {} ({}) ", source, total_logs)
        };

        let body: Vec<Line> = if lines.is_empty() {
            let hint = match state.ui_state.log_source {
                LogSource::Live => " Waiting for log lines...",
                LogSource::History => " No history loaded. Press H to fetch recent lines.",
            };
            vec![Line::from(Span::styled(hint, theme.text_dim()))]
        } else {
            lines
        };

        let logs_widget = Paragraph::new(body).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border())
                .title(Span::styled(title, theme.title())),
        );

        frame.render_widget(logs_widget, area);

        if total_logs > inner_height {
            let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .begin_symbol(Some("▲"))
                .end_symbol(Some("▼"));

            let mut scrollbar_state = ScrollbarState::default()
                .content_length(max_scroll)
                .position(state.ui_state.log_scroll.min(max_scroll));

            frame.render_stateful_widget(
                scrollbar,
                area.inner(Margin {
                    vertical: 1,
                    horizontal: 0,
                }),
                &mut scrollbar_state,
            );
        }
    }

    /// Format one record as a display line with search matches highlighted
    fn format_line(
        entry: &LogRecord,
        show_timestamps: bool,
        filter: &LogFilter,
        available_width: usize,
        theme: &Theme,
    ) -> Line<'static> {
        let mut spans = Vec::new();
        let mut prefix_width = 0;

        if show_timestamps && !entry.timestamp.is_empty() {
            spans.push(Span::styled(format!("{} ", entry.timestamp), theme.text_dim()));
            prefix_width += entry.timestamp.len() + 1;
        }

        spans.push(Span::styled(
            format!("{:>3}", entry.level.short()),
            theme.level_tag(entry.level),
        ));
        spans.push(Span::styled(" │ ", theme.text_dim()));
        prefix_width += 6;

        let message_width = available_width.saturating_sub(prefix_width);
        let display_msg = if entry.message.len() > message_width {
            format!(
                "{}...",
                safe_truncate(&entry.message, message_width.saturating_sub(3))
            )
        } else {
            entry.message.clone()
        };

        let base_style = theme.level_text(entry.level);
        let mut last_end = 0;
        for (start, end) in filter.find_matches(&display_msg) {
            if start > last_end {
                spans.push(Span::styled(
                    display_msg[last_end..start].to_string(),
                    base_style,
                ));
            }
            spans.push(Span::styled(
                display_msg[start..end].to_string(),
                theme.search_match(),
            ));
            last_end = end;
        }
        if last_end < display_msg.len() {
            spans.push(Span::styled(display_msg[last_end..].to_string(), base_style));
        }

        Line::from(spans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::config::DisplaySettings;

    #[test]
    fn test_safe_truncate_respects_char_boundary() {
        assert_eq!(safe_truncate("héllo", 2), "h");
        assert_eq!(safe_truncate("abc", 10), "abc");
    }

    #[test]
    fn test_format_line_highlights_matches() {
        let record = LogRecord::new("10:00:00", Severity::Error, "CUDA error: out of memory");
        let filter = LogFilter::new().with_search("error");
        let theme = Theme::default();
        let line = LogsScreen::format_line(&record, false, &filter, 200, &theme);

        let highlighted: Vec<&str> = line
            .spans
            .iter()
            .filter(|s| s.style == theme.search_match())
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(highlighted, vec!["error"]);
    }

    #[test]
    fn test_refresh_uses_history_source() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut state = AppState::new(tx, DisplaySettings::default());
        state.backend.log_history = vec![
            LogRecord::new("t0", Severity::Info, "loaded"),
            LogRecord::new("t1", Severity::Error, "failed"),
        ];
        state.ui_state.log_source = LogSource::History;
        state.ui_state.log_filter.toggle_level(Severity::Error);

        refresh_filtered(&mut state, None);
        let entries = &state.ui_state.filter_cache.cached_entries;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "failed");
    }
}
