//! Script interpreter and generator host
//!
//! This module provides the evaluation side of the engine:
//! - [`engine`]: the [`Interpreter`], which runs a module and implements
//!   [`Host`](crate::generator::Host) for every generator it creates
//! - [`generators`]: `next`/`send`/`throw`/`close` and drive recording
//! - [`builtins`]: `print`, `range`, `list`, `next` and friends
//! - [`errors`]: run-level error types
//!
//! # Execution Model
//!
//! Suspension points never reach the interpreter: the decomposer has already
//! split every function into segments, and the interpreter only evaluates
//! the yield-free expressions inside them. Each generator drive is appended
//! to the [`TraceLog`](crate::snapshot::TraceLog) for later inspection.

pub mod builtins;
pub mod constants;
pub mod engine;
pub mod errors;
mod expressions;
pub mod generators;
mod ops;

pub use engine::Interpreter;
