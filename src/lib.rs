//! # Introduction
//!
//! gentty runs scripts in a small indentation-based language whose functions
//! may contain `yield`, and records every drive of every generator so the
//! run can be stepped through afterwards in a terminal UI built with
//! [ratatui](https://docs.rs/ratatui).
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Decomposer → Descriptors → Interpreter → TraceLog → TUI
//! ```
//!
//! 1. [`parser`] tokenises the source, resolves indentation and builds an AST.
//! 2. [`generator`] splits each function body at its suspension points into
//!    segments ([`generator::GeneratorDescriptor`]) with a table of exception
//!    scopes, and runs them as resumable [`generator::GeneratorObject`]s.
//! 3. [`interpreter`] evaluates the yield-free expressions inside segments,
//!    provides the built-ins and the `send`/`throw`/`close` methods.
//! 4. [`snapshot`] keeps the bounded drive history and a
//!    [`snapshot::MockTerminal`] that records `print` output.
//! 5. [`ui`] replays the history; not part of the stable library API.
//!
//! [`config`] and [`logging`] hold the binary's ambient setup.

pub mod config;
pub mod generator;
pub mod interpreter;
pub mod logging;
pub mod parser;
pub mod runtime;
pub mod snapshot;
pub mod ui;
