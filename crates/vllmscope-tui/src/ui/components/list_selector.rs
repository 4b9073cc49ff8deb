use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, StatefulWidget},
};

use crate::ui::Theme;

/// A titled, selectable list
pub struct ListSelector<'a> {
    items: Vec<ListItem<'a>>,
    title: String,
    highlight_symbol: &'a str,
    theme: Theme,
}

impl<'a> ListSelector<'a> {
    pub fn new(title: impl Into<String>, theme: Theme) -> Self {
        Self {
            items: Vec::new(),
            title: title.into(),
            highlight_symbol: "▶ ",
            theme,
        }
    }

    /// Add items from an iterator of (display_text, is_marked) tuples
    ///
    /// Marked items (the running model, a favorite profile) are drawn in
    /// the accent color.
    pub fn items<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let theme = self.theme;
        self.items = items
            .into_iter()
            .map(|(text, is_marked)| {
                let style = if is_marked {
                    theme.list_item_marked()
                } else {
                    theme.list_item()
                };
                ListItem::new(Line::from(Span::styled(text.into(), style)))
            })
            .collect();
        self
    }
}

impl StatefulWidget for ListSelector<'_> {
    type State = ListState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let theme = self.theme;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_focused())
            .title(Span::styled(self.title, theme.title()));

        let list = List::new(self.items)
            .block(block)
            .highlight_style(theme.list_item_selected())
            .highlight_symbol(self.highlight_symbol);

        StatefulWidget::render(list, area, buf, state);
    }
}

/// Extension trait to render ListSelector more easily
pub trait ListSelectorExt {
    fn render_list_selector(&mut self, area: Rect, selector: ListSelector, state: &mut ListState);
}

impl ListSelectorExt for ratatui::Frame<'_> {
    fn render_list_selector(&mut self, area: Rect, selector: ListSelector, state: &mut ListState) {
        self.render_stateful_widget(selector, area, state);
    }
}
