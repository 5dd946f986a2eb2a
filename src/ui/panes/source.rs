//! Source code pane rendering with syntax highlighting
//!
//! Displays the script with the line of the current drive highlighted.
//! Lines holding a suspension point get a marker in the gutter so the
//! places a generator can pause are visible at a glance.
//!
//! The pane uses a simple character-by-character tokenizer to apply syntax
//! highlighting styles without requiring a full lexer.

use super::utils::{pane_block, visible_height};
use crate::ui::theme::DEFAULT_THEME;
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

fn highlight_source_code(line: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut current_word = String::new();

    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '#' {
            flush_word(&mut spans, &mut current_word, false);
            spans.push(Span::styled(
                chars[i..].iter().collect::<String>(),
                Style::default().fg(DEFAULT_THEME.comment),
            ));
            break;
        }

        if c == '"' || c == '\'' {
            flush_word(&mut spans, &mut current_word, false);
            let mut end = i + 1;
            while end < chars.len() && chars[end] != c {
                end += if chars[end] == '\\' { 2 } else { 1 };
            }
            let end = (end + 1).min(chars.len());
            spans.push(Span::styled(
                chars[i..end].iter().collect::<String>(),
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if !c.is_alphanumeric() && c != '_' {
            flush_word(&mut spans, &mut current_word, c == '(');
            let style = match c {
                '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                _ => Style::default().fg(DEFAULT_THEME.fg),
            };
            spans.push(Span::styled(c.to_string(), style));
            i += 1;
            continue;
        }

        current_word.push(c);
        i += 1;
    }

    flush_word(&mut spans, &mut current_word, false);
    Line::from(spans)
}

fn flush_word(spans: &mut Vec<Span<'static>>, word: &mut String, is_call: bool) {
    if word.is_empty() {
        return;
    }
    let style = get_keyword_style(word, is_call);
    spans.push(Span::styled(std::mem::take(word), style));
}

fn get_keyword_style(word: &str, is_call: bool) -> Style {
    match word {
        "yield" => Style::default()
            .fg(DEFAULT_THEME.yield_point)
            .add_modifier(Modifier::BOLD),
        "def" | "return" | "if" | "elif" | "else" | "while" | "for" | "in" | "try" | "except"
        | "finally" | "raise" | "from" | "pass" | "break" | "continue" | "and" | "or" | "not"
        | "is" | "as" => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        "None" | "True" | "False" => Style::default().fg(DEFAULT_THEME.number),
        w if w.chars().next().is_some_and(|c| c.is_ascii_digit()) => {
            Style::default().fg(DEFAULT_THEME.number)
        }
        _ if is_call => Style::default().fg(DEFAULT_THEME.function),
        _ => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Scroll state for the source pane
#[derive(Debug, Default)]
pub struct SourceScrollState {
    pub offset: usize,
    /// Visual row the current line is pinned to; `None` centres it on first render
    pub target_line_row: Option<usize>,
}

/// Render the source code pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    current_line: usize,
    is_error: bool,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let block = pane_block(" Source Code ", is_focused);
    let lines: Vec<&str> = source_code.lines().collect();
    let total_lines = lines.len();
    let visible_height = visible_height(area);

    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    // Keep the current line at the target visual row
    if current_line > 0 && current_line <= total_lines {
        scroll_state.offset = (current_line - 1).saturating_sub(target_row);
        if total_lines > visible_height {
            scroll_state.offset = scroll_state.offset.min(total_lines - visible_height);
        } else {
            scroll_state.offset = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == current_line;
            let has_yield = line.split(|c: char| !c.is_alphanumeric() && c != '_').any(|w| w == "yield");

            let (num_style, content_style) = match (is_current, is_error) {
                (true, true) => (
                    Style::default()
                        .fg(DEFAULT_THEME.error)
                        .add_modifier(Modifier::BOLD),
                    Some(
                        Style::default()
                            .bg(DEFAULT_THEME.error)
                            .fg(Color::White)
                            .add_modifier(Modifier::BOLD),
                    ),
                ),
                (true, false) => (
                    Style::default()
                        .fg(DEFAULT_THEME.secondary)
                        .add_modifier(Modifier::BOLD),
                    Some(Style::default().bg(DEFAULT_THEME.current_line_bg)),
                ),
                _ => (Style::default().fg(DEFAULT_THEME.comment), None),
            };

            let mut content_line = highlight_source_code(line);
            if let Some(style) = content_style {
                for span in &mut content_line.spans {
                    span.style = if is_error { style } else { span.style.patch(style) };
                }
            }

            let marker = if has_yield {
                Span::styled("◆", Style::default().fg(DEFAULT_THEME.yield_point))
            } else {
                Span::raw(" ")
            };
            let mut final_spans = vec![Span::styled(format!("{:4}", line_num), num_style), marker];
            final_spans.extend(content_line.spans);
            Line::from(final_spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(visible_lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_highlighting_preserves_text() {
        let src = "    x = (yield 'a # b')  # note";
        assert_eq!(text(&highlight_source_code(src)), src);
    }

    #[test]
    fn test_yield_is_highlighted() {
        let line = highlight_source_code("yield x");
        assert_eq!(line.spans[0].style.fg, Some(DEFAULT_THEME.yield_point));
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(text(&highlight_source_code("print('oops")), "print('oops");
    }
}
