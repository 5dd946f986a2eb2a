//! Indentation tracking for block structure
//!
//! The lexer measures the leading whitespace of every logical line and asks
//! the [`IndentTracker`] how the block depth changed. Inside brackets the
//! tracker is switched off, so a list display or call may span lines freely.

/// Width a tab advances to (the next multiple of this value).
const TAB_WIDTH: usize = 8;

/// How the indentation of a new logical line relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentChange {
    Same,
    Indent,
    /// Number of blocks closed
    Dedent(usize),
}

/// Stack of open indentation widths plus bracket nesting.
#[derive(Debug, Clone)]
pub struct IndentTracker {
    levels: Vec<usize>,
    bracket_depth: usize,
    line_has_content: bool,
}

impl IndentTracker {
    pub fn new() -> Self {
        Self {
            levels: vec![0],
            bracket_depth: 0,
            line_has_content: false,
        }
    }

    /// Column width of a run of leading whitespace.
    pub fn measure(prefix: &[char]) -> usize {
        prefix.iter().fold(0, |width, ch| match ch {
            '\t' => (width / TAB_WIDTH + 1) * TAB_WIDTH,
            _ => width + 1,
        })
    }

    pub fn current(&self) -> usize {
        self.levels.last().copied().unwrap_or(0)
    }

    /// Number of open blocks, excluding the module level.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn tracking(&self) -> bool {
        self.bracket_depth == 0
    }

    pub fn open_bracket(&mut self) {
        self.bracket_depth += 1;
    }

    pub fn close_bracket(&mut self) {
        self.bracket_depth = self.bracket_depth.saturating_sub(1);
    }

    pub fn line_has_content(&self) -> bool {
        self.line_has_content
    }

    pub fn mark_content(&mut self) {
        self.line_has_content = true;
    }

    pub fn end_line(&mut self) {
        self.line_has_content = false;
    }

    /// Record the width of a new logical line.
    ///
    /// A dedent must land exactly on a width that is already open.
    pub fn change_to(&mut self, width: usize) -> Result<IndentChange, &'static str> {
        let current = self.current();
        if width > current {
            self.levels.push(width);
            return Ok(IndentChange::Indent);
        }
        if width == current {
            return Ok(IndentChange::Same);
        }

        let mut closed = 0;
        while self.current() > width {
            self.levels.pop();
            closed += 1;
        }
        if self.current() != width {
            return Err("unindent does not match any outer indentation level");
        }
        Ok(IndentChange::Dedent(closed))
    }

    /// Close every open block at end of input, returning how many closed.
    pub fn close_all(&mut self) -> usize {
        let open = self.depth();
        self.levels.truncate(1);
        open
    }
}

impl Default for IndentTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_then_dedent_two_levels() {
        let mut tracker = IndentTracker::new();
        assert_eq!(tracker.change_to(4), Ok(IndentChange::Indent));
        assert_eq!(tracker.change_to(8), Ok(IndentChange::Indent));
        assert_eq!(tracker.change_to(8), Ok(IndentChange::Same));
        assert_eq!(tracker.change_to(0), Ok(IndentChange::Dedent(2)));
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn test_inconsistent_dedent_rejected() {
        let mut tracker = IndentTracker::new();
        tracker.change_to(4).unwrap();
        assert!(tracker.change_to(2).is_err());
    }

    #[test]
    fn test_tab_measures_to_next_stop() {
        assert_eq!(IndentTracker::measure(&['\t']), 8);
        assert_eq!(IndentTracker::measure(&[' ', ' ', '\t']), 8);
        assert_eq!(IndentTracker::measure(&[' '; 4]), 4);
    }

    #[test]
    fn test_brackets_suspend_tracking() {
        let mut tracker = IndentTracker::new();
        tracker.open_bracket();
        assert!(!tracker.tracking());
        tracker.close_bracket();
        tracker.close_bracket();
        assert!(tracker.tracking());
    }

    #[test]
    fn test_close_all_counts_open_blocks() {
        let mut tracker = IndentTracker::new();
        tracker.change_to(2).unwrap();
        tracker.change_to(4).unwrap();
        assert_eq!(tracker.close_all(), 2);
        assert_eq!(tracker.current(), 0);
    }
}
