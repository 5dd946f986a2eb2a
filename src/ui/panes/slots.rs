//! Drive pane: what one drive did and the frame it left behind

use super::utils::{pane_block, visible_height, visible_items};
use crate::generator::object::Phase;
use crate::snapshot::DriveSnapshot;
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

fn phase_style(phase: Phase) -> Style {
    let color = match phase {
        Phase::Created => DEFAULT_THEME.type_name,
        Phase::Running => DEFAULT_THEME.secondary,
        Phase::Suspended => DEFAULT_THEME.yield_point,
        Phase::Completed => DEFAULT_THEME.success,
        Phase::Closed => DEFAULT_THEME.comment,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

fn field(label: &str, value: String, style: Style) -> ListItem<'static> {
    ListItem::new(Line::from(vec![
        Span::styled(format!("{:<8}", label), Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled(value, style),
    ]))
}

/// Render the drive pane
pub fn render_slots_pane(
    frame: &mut Frame,
    area: Rect,
    event: Option<&DriveSnapshot>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = pane_block(" Drive ", is_focused);

    let Some(event) = event else {
        let paragraph = Paragraph::new("(no generator driven)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    };

    let plain = Style::default().fg(DEFAULT_THEME.fg);
    let mut all_items = vec![
        ListItem::new(Line::from(vec![
            Span::styled("▸ ", Style::default().fg(DEFAULT_THEME.secondary)),
            Span::styled(
                format!("{}()", event.generator),
                Style::default()
                    .fg(DEFAULT_THEME.function)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" │ {}", event.operation),
                Style::default().fg(DEFAULT_THEME.comment),
            ),
            Span::styled(
                if event.depth > 1 {
                    format!(" │ depth {}", event.depth)
                } else {
                    String::new()
                },
                Style::default().fg(DEFAULT_THEME.comment),
            ),
        ])),
        ListItem::new(Line::from(vec![
            Span::styled(format!("{:<8}", "phase"), Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(event.phase_before.to_string(), phase_style(event.phase_before)),
            Span::styled(" → ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(event.phase_after.to_string(), phase_style(event.phase_after)),
        ])),
        field("signal", event.signal.clone(), plain),
        field("outcome", event.outcome.clone(), plain),
        ListItem::new(""),
    ];

    if event.slots.is_empty() {
        all_items.push(
            ListItem::new("  (no locals)").style(Style::default().fg(DEFAULT_THEME.comment)),
        );
    }
    for (name, value) in &event.slots {
        let value_span = match value {
            Some(v) => Span::styled(v.clone(), Style::default().fg(DEFAULT_THEME.number)),
            None => Span::styled("<unbound>", Style::default().fg(DEFAULT_THEME.comment)),
        };
        all_items.push(ListItem::new(Line::from(vec![
            Span::styled(format!("  {} ", name), Style::default().fg(DEFAULT_THEME.primary)),
            Span::styled("= ", Style::default().fg(DEFAULT_THEME.comment)),
            value_span,
        ])));
    }

    let items = visible_items(all_items, scroll_offset, visible_height(area));
    frame.render_widget(List::new(items).block(block), area);
}
