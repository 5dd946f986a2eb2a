//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`source`]: script source with the current line and suspension points marked
//! - [`segments`]: segment listing of the generator being driven
//! - [`slots`]: phase transition, signal, outcome and frame slots of one drive
//! - [`terminal`]: `print` output up to the current step
//! - [`status`]: status bar with keybindings and replay position
//!
//! Each pane module exports a `render_*` function; panes holding scroll
//! state take it by `&mut` so the render pass can clamp it.

mod utils;

pub mod segments;
pub mod slots;
pub mod source;
pub mod status;
pub mod terminal;

pub use segments::render_segments_pane;
pub use slots::render_slots_pane;
pub use source::{render_source_pane, SourceScrollState};
pub use status::render_status_bar;
pub use terminal::render_terminal_pane;
