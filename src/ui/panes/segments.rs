//! Segment pane: the compiled shape of the generator being driven
//!
//! Lists every segment of the descriptor with its source line, operation
//! count and terminator. The segment the drive stopped in is marked, and
//! segments ending in a suspension point are tinted.

use super::utils::{pane_block, visible_height, visible_items};
use crate::generator::descriptor::CodeKind;
use crate::snapshot::DriveSnapshot;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

fn kind_label(kind: CodeKind) -> &'static str {
    match kind {
        CodeKind::Module => "module",
        CodeKind::Function => "function",
        CodeKind::Generator => "generator",
    }
}

/// Render the segment pane for `event`, or a placeholder when nothing was driven
pub fn render_segments_pane(
    frame: &mut Frame,
    area: Rect,
    event: Option<&DriveSnapshot>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Segments ", is_focused);

    let Some(event) = event else {
        let paragraph = Paragraph::new("(no generator driven)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    };

    let descriptor = &event.descriptor;
    let mut all_items = vec![ListItem::new(Line::from(vec![
        Span::styled(
            format!("{}()", descriptor.name),
            Style::default()
                .fg(DEFAULT_THEME.function)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ", kind_label(descriptor.kind)),
            Style::default().fg(DEFAULT_THEME.type_name),
        ),
        Span::styled(
            format!(
                "│ {} suspension point(s), {} scope(s)",
                descriptor.suspension_points(),
                descriptor.scopes.len()
            ),
            Style::default().fg(DEFAULT_THEME.comment),
        ),
    ]))];

    for (id, segment) in descriptor.segments.iter().enumerate() {
        let is_current = event.segment == Some(id);
        let marker = if is_current { "▶ " } else { "  " };
        let terminator_style = if segment.terminator.is_suspend() {
            Style::default().fg(DEFAULT_THEME.yield_point)
        } else {
            Style::default().fg(DEFAULT_THEME.fg)
        };
        let mut line = Line::from(vec![
            Span::styled(marker, Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(
                format!("#{:<3}", id),
                Style::default().fg(DEFAULT_THEME.primary),
            ),
            Span::styled(
                format!("L{:<4}", segment.location.line),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled(
                format!("{:>2} op ", segment.instrs.len()),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled(segment.terminator.to_string(), terminator_style),
        ]);
        if is_current {
            line = line.style(
                Style::default()
                    .bg(DEFAULT_THEME.current_line_bg)
                    .add_modifier(Modifier::BOLD),
            );
        }
        all_items.push(ListItem::new(line));
    }

    let items = visible_items(all_items, scroll_offset, visible_height(area));
    frame.render_widget(List::new(items).block(block), area);
}
