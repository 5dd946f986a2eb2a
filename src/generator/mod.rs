//! The generator engine
//!
//! [`decompose`] turns a parsed function body into an immutable
//! [`descriptor::GeneratorDescriptor`]: segments split at every suspension
//! point plus an exception-scope table. [`object::GeneratorObject`] is the
//! per-call state machine that drives a descriptor through the
//! [`signal::ResumeSignal`] protocol, and [`iter`] wraps that protocol as a
//! Rust iterator.
//!
//! The engine never evaluates expressions itself. Everything that needs a
//! value model (arithmetic, calls, globals, iteration) goes through the
//! [`Host`] trait, implemented by [`crate::interpreter::Interpreter`].

pub mod decompose;
pub mod descriptor;
pub mod errors;
pub mod ir;
pub mod iter;
mod lower;
pub mod object;
pub mod scope;
pub mod signal;

pub use decompose::{decompose_function, decompose_module};
pub use descriptor::{CodeKind, GeneratorDescriptor};
pub use errors::{DecomposeError, GeneratorError};
pub use iter::GeneratorIter;
pub use object::{GeneratorObject, GeneratorRef, Phase};
pub use signal::{DriveResult, ResumeSignal};

use crate::parser::ast::HandlerPattern;
use crate::runtime::exception::Exception;
use crate::runtime::frame::Frame;
use crate::runtime::value::Value;
use std::rc::Rc;

/// The evaluator a generator object runs against
pub trait Host {
    /// Evaluate a suspension-free expression against `frame`
    fn eval(&mut self, expr: &ir::Expr, frame: &Frame) -> Result<Value, Exception>;

    fn truthy(&mut self, value: &Value) -> Result<bool, Exception>;

    fn store_global(&mut self, name: &str, value: Value);

    /// Obtain an iterator for a `for` loop
    fn iter_start(&mut self, iterable: Value) -> Result<Value, Exception>;

    /// Next item of an iterator from [`Host::iter_start`], `None` when exhausted
    fn iter_next(&mut self, iterator: &Value) -> Result<Option<Value>, Exception>;

    /// Convert the operand of `raise` into an exception
    fn make_exception(&mut self, value: Value) -> Exception;

    /// Whether an `except` clause accepts `exc`
    fn exception_matches(&self, exc: &Exception, pattern: &HandlerPattern) -> bool;

    /// The runtime value bound by a `def`
    fn define_function(&mut self, descriptor: Rc<GeneratorDescriptor>) -> Value;
}
