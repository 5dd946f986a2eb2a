//! Main TUI application state and logic

use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::RuntimeError;
use crate::snapshot::DriveSnapshot;
use crate::ui::panes::{self, SourceScrollState};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use std::io;
use std::time::{Duration, Instant};

/// Which pane is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPane {
    Source,
    Segments,
    Drive,
    Terminal,
}

impl FocusedPane {
    /// Move focus to the next pane (clockwise: source -> terminal -> drive -> segments)
    pub fn next(self) -> Self {
        match self {
            FocusedPane::Source => FocusedPane::Terminal,
            FocusedPane::Terminal => FocusedPane::Drive,
            FocusedPane::Drive => FocusedPane::Segments,
            FocusedPane::Segments => FocusedPane::Source,
        }
    }
}

/// The main application state
///
/// Steps `0..trace.len()` are the recorded drives; the extra last step is the
/// state after the module body finished.
pub struct App {
    pub interpreter: Interpreter,
    pub source_code: String,

    /// Error the run ended with, shown on the final step
    pub run_error: Option<RuntimeError>,

    pub position: usize,
    pub focused_pane: FocusedPane,

    pub source_scroll: SourceScrollState,
    pub segment_scroll: usize,
    pub drive_scroll: usize,
    pub terminal_scroll: usize,

    pub should_quit: bool,
    pub status_message: String,
    pub is_playing: bool,
    pub last_play_time: Instant,

    /// Last time space was pressed (for debouncing)
    pub last_space_press: Instant,
}

impl App {
    pub fn new(interpreter: Interpreter, source_code: String, run_error: Option<RuntimeError>) -> Self {
        let status_message = match &run_error {
            Some(err) => format!("Run failed: {}", err),
            None => String::from("Ready!"),
        };
        let now = Instant::now();
        App {
            interpreter,
            source_code,
            run_error,
            position: 0,
            focused_pane: FocusedPane::Source,
            source_scroll: SourceScrollState::default(),
            segment_scroll: 0,
            drive_scroll: 0,
            terminal_scroll: 0,
            should_quit: false,
            status_message,
            is_playing: false,
            last_play_time: now,
            last_space_press: now.checked_sub(Duration::from_secs(1)).unwrap_or(now),
        }
    }

    /// Recorded drives plus the final state
    pub fn total_steps(&self) -> usize {
        self.interpreter.trace().len() + 1
    }

    pub fn is_final_step(&self) -> bool {
        self.position + 1 >= self.total_steps()
    }

    /// The drive shown at the current step; the final step shows the last drive
    pub fn current_event(&self) -> Option<&DriveSnapshot> {
        let trace = self.interpreter.trace();
        trace.get(self.position.min(trace.len().saturating_sub(1)))
    }

    /// Source line of the current step
    pub fn current_line(&self) -> usize {
        if self.is_final_step() {
            return self.interpreter.current_location().line;
        }
        self.current_event().map_or(0, |e| e.location.line)
    }

    /// Output printed up to the current step
    pub fn visible_output(&self) -> &[String] {
        let lines = &self.interpreter.terminal().lines;
        if self.is_final_step() {
            return lines;
        }
        let count = self.current_event().map_or(0, |e| e.output_lines);
        &lines[..count.min(lines.len())]
    }

    /// Run the TUI application
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.render(f))?;

            if self.should_quit {
                break;
            }

            if self.is_playing && self.last_play_time.elapsed() >= Duration::from_secs(1) {
                if self.step_forward() {
                    self.status_message = "Playing...".to_string();
                } else {
                    self.is_playing = false;
                    self.status_message = "Playback complete".to_string();
                }
                self.last_play_time = Instant::now();
            }

            // Poll with a timeout so auto-play keeps ticking
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key);
                    }
                }
            }
        }

        Ok(())
    }

    pub(crate) fn render(&mut self, frame: &mut Frame) {
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(frame.area());

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(main_chunks[0]);

        // Left column: Source (top) | Terminal (bottom)
        let left_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
            .split(columns[0]);

        // Right column: Drive (top) | Segments (bottom)
        let right_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(columns[1]);

        let is_error = self.is_final_step() && self.run_error.is_some();
        let current_line = self.current_line();
        let event = self.current_event().cloned();

        panes::render_source_pane(
            frame,
            left_rows[0],
            &self.source_code,
            current_line,
            is_error,
            self.focused_pane == FocusedPane::Source,
            &mut self.source_scroll,
        );

        let output = self.visible_output().to_vec();
        panes::render_terminal_pane(
            frame,
            left_rows[1],
            &output,
            self.focused_pane == FocusedPane::Terminal,
            &mut self.terminal_scroll,
        );

        panes::render_slots_pane(
            frame,
            right_rows[0],
            event.as_ref(),
            self.focused_pane == FocusedPane::Drive,
            &mut self.drive_scroll,
        );

        panes::render_segments_pane(
            frame,
            right_rows[1],
            event.as_ref(),
            self.focused_pane == FocusedPane::Segments,
            &mut self.segment_scroll,
        );

        panes::render_status_bar(
            frame,
            main_chunks[1],
            &self.status_message,
            self.position,
            self.total_steps(),
            is_error,
            self.is_playing,
        );
    }

    pub(crate) fn handle_key_event(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.should_quit = true;
            }
            // Number keys step forward N times directly
            KeyCode::Char(c @ '1'..='9') => {
                self.is_playing = false;
                let n = c.to_digit(10).unwrap_or(1);
                let stepped = (0..n).take_while(|_| self.step_forward()).count();
                self.status_message = format!("Stepped forward {} step(s)", stepped);
            }
            KeyCode::Tab => {
                self.focused_pane = self.focused_pane.next();
            }
            KeyCode::Left => {
                self.is_playing = false;
                self.status_message = if self.step_backward() {
                    "Stepped backward".to_string()
                } else {
                    "Cannot step backward: already at the first drive".to_string()
                };
            }
            KeyCode::Right => {
                self.is_playing = false;
                self.status_message = if self.step_forward() {
                    "Stepped forward".to_string()
                } else {
                    "Cannot step forward: end of history".to_string()
                };
            }
            KeyCode::Up => match self.focused_pane {
                FocusedPane::Source => {
                    // Scrolling up makes the current line move down visually
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_add(1));
                    }
                }
                FocusedPane::Segments => self.segment_scroll = self.segment_scroll.saturating_sub(1),
                FocusedPane::Drive => self.drive_scroll = self.drive_scroll.saturating_sub(1),
                FocusedPane::Terminal => {
                    self.terminal_scroll = self.terminal_scroll.saturating_sub(1)
                }
            },
            KeyCode::Down => match self.focused_pane {
                FocusedPane::Source => {
                    if let Some(row) = self.source_scroll.target_line_row {
                        self.source_scroll.target_line_row = Some(row.saturating_sub(1));
                    }
                }
                FocusedPane::Segments => self.segment_scroll = self.segment_scroll.saturating_add(1),
                FocusedPane::Drive => self.drive_scroll = self.drive_scroll.saturating_add(1),
                FocusedPane::Terminal => {
                    self.terminal_scroll = self.terminal_scroll.saturating_add(1)
                }
            },
            KeyCode::Char(' ') => {
                // 200ms debounce against key repeat
                if self.last_space_press.elapsed() >= Duration::from_millis(200) {
                    self.last_space_press = Instant::now();
                    self.is_playing = !self.is_playing;
                    if self.is_playing {
                        let now = Instant::now();
                        self.last_play_time = now.checked_sub(Duration::from_secs(1)).unwrap_or(now);
                        self.status_message = "Playing...".to_string();
                    } else {
                        self.status_message = "Paused".to_string();
                    }
                }
            }
            KeyCode::Enter => {
                self.is_playing = false;
                self.jump_to(self.total_steps() - 1);
                self.status_message = match &self.run_error {
                    Some(err) => format!("Run failed: {}", err),
                    None => "Jumped to end".to_string(),
                };
            }
            KeyCode::Backspace => {
                self.is_playing = false;
                self.jump_to(0);
                self.status_message = "Jumped to start".to_string();
            }
            _ => {}
        }
    }

    /// Advance one step; false at the end of history
    pub fn step_forward(&mut self) -> bool {
        if self.is_final_step() {
            return false;
        }
        self.jump_to(self.position + 1);
        true
    }

    /// Go back one step; false at the start
    pub fn step_backward(&mut self) -> bool {
        if self.position == 0 {
            return false;
        }
        self.jump_to(self.position - 1);
        true
    }

    fn jump_to(&mut self, position: usize) {
        self.position = position.min(self.total_steps() - 1);
        // Follow the newest output
        self.terminal_scroll = usize::MAX;
        self.drive_scroll = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn app(source: &str) -> App {
        let program = parse_source(source).unwrap();
        let mut interpreter = Interpreter::new(1_000);
        let run_error = interpreter.run(&program).err();
        App::new(interpreter, source.to_string(), run_error)
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::new(code, KeyModifiers::NONE));
    }

    const COUNTER: &str = "def count(n):\n    i = 0\n    while i < n:\n        print(i)\n        yield i\n        i += 1\nfor x in count(2):\n    pass\n";

    #[test]
    fn test_history_has_final_step() {
        let app = app(COUNTER);
        // two produced values and the completing drive
        assert_eq!(app.interpreter.trace().len(), 3);
        assert_eq!(app.total_steps(), 4);
    }

    #[test]
    fn test_stepping_reveals_output() {
        let mut app = app(COUNTER);
        assert_eq!(app.visible_output(), ["0"]);
        assert_eq!(app.current_line(), 5);
        assert!(app.step_forward());
        assert_eq!(app.visible_output(), ["0", "1"]);
        assert!(app.step_backward());
        assert_eq!(app.position, 0);
        assert!(!app.step_backward());
    }

    #[test]
    fn test_enter_and_backspace() {
        let mut app = app(COUNTER);
        press(&mut app, KeyCode::Enter);
        assert!(app.is_final_step());
        assert!(!app.step_forward());
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.position, 0);
        press(&mut app, KeyCode::Char('9'));
        assert!(app.is_final_step());
    }

    #[test]
    fn test_focus_cycles() {
        let mut app = app("x = 1\n");
        for _ in 0..4 {
            press(&mut app, KeyCode::Tab);
        }
        assert_eq!(app.focused_pane, FocusedPane::Source);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn test_render_without_drives() {
        let mut app = app("print('hi')\n");
        assert_eq!(app.total_steps(), 1);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
    }

    #[test]
    fn test_render_failed_run() {
        let mut app = app(COUNTER.replace("pass", "x / 0").as_str());
        assert!(app.run_error.is_some());
        press(&mut app, KeyCode::Enter);
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();
        assert!(app.status_message.starts_with("Run failed"));
    }
}
