// Execution engine for the interpreter

use crate::generator::descriptor::GeneratorDescriptor;
use crate::generator::ir;
use crate::generator::object::{GeneratorObject, GeneratorRef};
use crate::generator::{decompose_module, Host};
use crate::interpreter::constants::MAX_CALL_DEPTH;
use crate::interpreter::errors::RuntimeError;
use crate::parser::ast::{HandlerPattern, Program, SourceLocation};
use crate::runtime::exception::{Exception, ExceptionKind};
use crate::runtime::frame::Frame;
use crate::runtime::value::{SeqIter, Value};
use crate::snapshot::{MockTerminal, TraceLog};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

/// The interpreter that runs a program and hosts its generators
pub struct Interpreter {
    /// Module-level names
    pub(crate) globals: FxHashMap<Rc<str>, Value>,

    /// Mock terminal for print output
    pub(crate) terminal: MockTerminal,

    /// One event per generator drive
    pub(crate) trace: TraceLog,

    /// Function calls and generator drives currently in progress
    pub(crate) depth: usize,

    /// Set once the drive history overflows; the run fails with it
    pub(crate) fatal: Option<RuntimeError>,

    /// Where the module body stopped
    current_location: SourceLocation,

    /// Whether execution has finished
    finished: bool,
}

impl Interpreter {
    /// Create an interpreter keeping at most `trace_limit` drive events
    pub fn new(trace_limit: usize) -> Self {
        Interpreter {
            globals: FxHashMap::default(),
            terminal: MockTerminal::new(),
            trace: TraceLog::new(trace_limit),
            depth: 0,
            fatal: None,
            current_location: SourceLocation::new(1, 1),
            finished: false,
        }
    }

    /// Run the program from start to finish
    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let module = decompose_module(program)?;
        debug!(segments = module.segments.len(), "running module");

        let mut object = GeneratorObject::new(module, Vec::new()).map_err(|exception| {
            RuntimeError::Uncaught {
                exception,
                location: self.current_location,
            }
        })?;
        let result = object.call(self);
        self.current_location = object.location();
        self.finished = true;

        if let Some(fatal) = self.fatal.take() {
            return Err(fatal);
        }
        result.map(|_| ()).map_err(|exception| RuntimeError::Uncaught {
            exception,
            location: self.current_location,
        })
    }

    pub fn terminal(&self) -> &MockTerminal {
        &self.terminal
    }

    /// Everything printed so far
    pub fn output(&self) -> Vec<String> {
        self.terminal.get_output()
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    pub fn current_location(&self) -> SourceLocation {
        self.current_location
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Count one level of call or drive nesting
    pub(crate) fn enter(&mut self) -> Result<(), Exception> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(Exception::new(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn lookup_global(&self, name: &str) -> Result<Value, Exception> {
        if let Some(value) = self.globals.get(name) {
            return Ok(value.clone());
        }
        if let Some(builtin) = crate::runtime::value::Builtin::from_name(name) {
            return Ok(Value::Builtin(builtin));
        }
        if let Some(kind) = ExceptionKind::from_name(name) {
            return Ok(Value::ExceptionType(kind));
        }
        Err(Exception::name_error(name))
    }

    pub(crate) fn call_value(&mut self, func: Value, args: Vec<Value>) -> Result<Value, Exception> {
        match func {
            Value::Builtin(builtin) => self.call_builtin(builtin, args),
            Value::Function(descriptor) => self.call_function(descriptor, args),
            Value::BoundMethod(method) => self.call_method(&method, args),
            Value::ExceptionType(kind) => construct_exception(kind, args),
            other => Err(Exception::type_error(format!(
                "'{}' object is not callable",
                other.type_name()
            ))),
        }
    }

    /// Calling a generator function creates its object; any other function runs to completion
    fn call_function(
        &mut self,
        descriptor: Rc<GeneratorDescriptor>,
        args: Vec<Value>,
    ) -> Result<Value, Exception> {
        let mut object = GeneratorObject::new(descriptor, args)?;
        if object.descriptor().is_generator() {
            return Ok(Value::Generator(GeneratorRef::new(object)));
        }

        self.enter()?;
        let result = object.call(self);
        self.leave();
        result
    }

    pub(crate) fn make_iterator(&mut self, value: Value) -> Result<Value, Exception> {
        let cursor = match value {
            Value::List(items) => SeqIter::List { items, index: 0 },
            Value::Range(range) => SeqIter::Range {
                next: range.start,
                stop: range.stop,
                step: range.step,
            },
            Value::Str(s) => SeqIter::Chars {
                chars: s.chars().collect(),
                index: 0,
            },
            Value::Iterator(_) | Value::Generator(_) => return Ok(value),
            other => {
                return Err(Exception::type_error(format!(
                    "'{}' object is not iterable",
                    other.type_name()
                )))
            }
        };
        Ok(Value::Iterator(Rc::new(RefCell::new(cursor))))
    }

    pub(crate) fn next_item(&mut self, iterator: &Value) -> Result<Option<Value>, Exception> {
        match iterator {
            Value::Iterator(cursor) => Ok(cursor.borrow_mut().next_value()),
            Value::Generator(generator) => self.step_generator(generator),
            other => Err(Exception::type_error(format!(
                "'{}' object is not an iterator",
                other.type_name()
            ))),
        }
    }
}

/// `Kind(args...)`
fn construct_exception(kind: ExceptionKind, args: Vec<Value>) -> Result<Value, Exception> {
    if kind.is_reserved() {
        return Err(Exception::type_error(format!(
            "{} is reserved for generator termination",
            kind
        )));
    }
    Ok(Value::Exception(match args.first() {
        Some(arg) => Exception::new(kind, arg.to_string()),
        None => Exception::bare(kind),
    }))
}

impl Host for Interpreter {
    fn eval(&mut self, expr: &ir::Expr, frame: &Frame) -> Result<Value, Exception> {
        self.evaluate_expr(expr, frame)
    }

    fn truthy(&mut self, value: &Value) -> Result<bool, Exception> {
        Ok(value.is_truthy())
    }

    fn store_global(&mut self, name: &str, value: Value) {
        self.globals.insert(Rc::from(name), value);
    }

    fn iter_start(&mut self, iterable: Value) -> Result<Value, Exception> {
        self.make_iterator(iterable)
    }

    fn iter_next(&mut self, iterator: &Value) -> Result<Option<Value>, Exception> {
        self.next_item(iterator)
    }

    fn make_exception(&mut self, value: Value) -> Exception {
        match value {
            Value::Exception(exc) => exc,
            Value::ExceptionType(kind) if kind.is_reserved() => Exception::type_error(format!(
                "{} is reserved for generator termination",
                kind
            )),
            Value::ExceptionType(kind) => Exception::bare(kind),
            other => Exception::type_error(format!(
                "exceptions must derive from BaseException, not '{}'",
                other.type_name()
            )),
        }
    }

    fn exception_matches(&self, exc: &Exception, pattern: &HandlerPattern) -> bool {
        match pattern {
            HandlerPattern::Any => true,
            HandlerPattern::Kinds(names) => names.iter().any(|name| {
                match ExceptionKind::from_name(name) {
                    Some(kind) => exc.kind.is_subclass_of(kind),
                    None => {
                        warn!(name = %name, "except clause names an unknown exception kind");
                        false
                    }
                }
            }),
        }
    }

    fn define_function(&mut self, descriptor: Rc<GeneratorDescriptor>) -> Value {
        Value::Function(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_source;

    fn run(source: &str) -> Interpreter {
        let program = parse_source(source).unwrap();
        let mut interp = Interpreter::new(1_000);
        interp.run(&program).unwrap();
        interp
    }

    #[test]
    fn test_module_globals() {
        let interp = run("x = 2\ny = x * 21\n");
        assert!(matches!(interp.global("y"), Some(Value::Int(42))));
        assert!(interp.is_finished());
    }

    #[test]
    fn test_plain_function_call() {
        let interp = run("def add(a, b):\n    return a + b\nprint(add(2, 3))\n");
        assert_eq!(interp.output(), vec!["5"]);
        assert!(interp.trace().is_empty());
    }

    #[test]
    fn test_generator_call_defers_execution() {
        let interp = run("def g():\n    print('ran')\n    yield 1\nx = g()\n");
        assert!(interp.output().is_empty());
        assert!(matches!(interp.global("x"), Some(Value::Generator(_))));
    }

    #[test]
    fn test_uncaught_exception_reports_location() {
        let program = parse_source("x = 1\ny = x / 0\n").unwrap();
        let mut interp = Interpreter::new(1_000);
        let err = interp.run(&program).unwrap_err();
        assert_eq!(
            err.exception().map(|e| e.kind),
            Some(ExceptionKind::ZeroDivisionError)
        );
        assert_eq!(err.location().map(|l| l.line), Some(2));
    }

    #[test]
    fn test_recursion_limit() {
        let program = parse_source("def f(n):\n    return f(n + 1)\nf(0)\n").unwrap();
        let mut interp = Interpreter::new(1_000);
        let err = interp.run(&program).unwrap_err();
        assert_eq!(
            err.exception().map(|e| e.kind),
            Some(ExceptionKind::RecursionError)
        );
    }

    #[test]
    fn test_generator_exit_cannot_be_raised() {
        let program = parse_source("raise GeneratorExit\n").unwrap();
        let mut interp = Interpreter::new(1_000);
        let err = interp.run(&program).unwrap_err();
        assert_eq!(err.exception().map(|e| e.kind), Some(ExceptionKind::TypeError));
    }
}
