//! Helpers shared by the panes

use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    widgets::{Block, Borders, ListItem},
};

/// Bordered block whose border lights up when focused
pub(crate) fn pane_block(title: &str, is_focused: bool) -> Block<'_> {
    let border_style = if is_focused {
        Style::default()
            .fg(DEFAULT_THEME.border_focused)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(DEFAULT_THEME.border_normal)
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

/// Rows available inside a bordered pane, at least 1
pub(crate) fn visible_height(area: Rect) -> usize {
    area.height.saturating_sub(2).max(1) as usize
}

/// Clamp `offset` so the last page stays full, then cut out the visible items
pub(crate) fn visible_items<'a>(
    items: Vec<ListItem<'a>>,
    offset: &mut usize,
    height: usize,
) -> Vec<ListItem<'a>> {
    let total = items.len();
    if total > height {
        *offset = (*offset).min(total - height);
    } else {
        *offset = 0;
    }
    items.into_iter().skip(*offset).take(height).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_offset_is_clamped() {
        let items: Vec<ListItem> = (0..10).map(|i| ListItem::new(i.to_string())).collect();
        let mut offset = usize::MAX;
        let shown = visible_items(items, &mut offset, 4);
        assert_eq!(offset, 6);
        assert_eq!(shown.len(), 4);
    }

    #[test]
    fn test_short_content_never_scrolls() {
        let items: Vec<ListItem> = (0..3).map(|i| ListItem::new(i.to_string())).collect();
        let mut offset = 2;
        let shown = visible_items(items, &mut offset, 10);
        assert_eq!(offset, 0);
        assert_eq!(shown.len(), 3);
    }
}
