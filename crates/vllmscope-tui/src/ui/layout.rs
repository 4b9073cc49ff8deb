use ratatui::layout::{Constraint, Direction, Layout as RatatuiLayout, Rect};

/// Layout helper for consistent screen layouts
pub struct Layout;

impl Layout {
    /// Create the main layout with header, content, and status bar
    pub fn main(area: Rect) -> (Rect, Rect, Rect) {
        let chunks = RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(1),    // Content
                Constraint::Length(1), // Status bar
            ])
            .split(area);

        (chunks[0], chunks[1], chunks[2])
    }

    /// A popup of fixed size centered in `area`
    pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
        let width = width.min(area.width.saturating_sub(4));
        let height = height.min(area.height.saturating_sub(2));
        let x = area.x + area.width.saturating_sub(width) / 2;
        let y = area.y + area.height.saturating_sub(height) / 2;
        Rect::new(x, y, width, height)
    }

    /// Split horizontally into a list and a detail panel
    pub fn list_detail(area: Rect, list_percent: u16) -> (Rect, Rect) {
        let chunks = RatatuiLayout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(list_percent),
                Constraint::Percentage(100 - list_percent.min(100)),
            ])
            .split(area);

        (chunks[0], chunks[1])
    }

    /// Stack rows of the given heights, the last one taking the rest
    pub fn rows<const N: usize>(area: Rect, heights: [u16; N]) -> Vec<Rect> {
        let mut constraints: Vec<Constraint> =
            heights.iter().map(|h| Constraint::Length(*h)).collect();
        constraints.push(Constraint::Min(1));

        RatatuiLayout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area)
            .to_vec()
    }

    /// Split into `n` equal columns
    pub fn columns(area: Rect, n: u16) -> Vec<Rect> {
        let n = n.max(1);
        RatatuiLayout::default()
            .direction(Direction::Horizontal)
            .constraints((0..n).map(|_| Constraint::Ratio(1, n as u32)))
            .split(area)
            .to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_main_layout_heights() {
        let (header, content, status) = Layout::main(Rect::new(0, 0, 80, 24));
        assert_eq!(header.height, 3);
        assert_eq!(status.height, 1);
        assert_eq!(content.height, 20);
    }

    #[test]
    fn test_centered_fits_small_area() {
        let popup = Layout::centered(Rect::new(0, 0, 20, 10), 60, 30);
        assert!(popup.width <= 16);
        assert!(popup.height <= 8);
    }

    #[test]
    fn test_rows_adds_remainder() {
        let rows = Layout::rows(Rect::new(0, 0, 80, 24), [3, 5]);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].height, 16);
    }
}
