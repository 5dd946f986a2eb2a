//! Runtime data model shared by the engine and the evaluator
//!
//! - [`value`]: Runtime value representation
//! - [`exception`]: Exception kinds (a fixed hierarchy) and instances
//! - [`frame`]: Slot storage for one activation

pub mod exception;
pub mod frame;
pub mod value;
