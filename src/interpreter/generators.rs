//! Generator methods and drive recording
//!
//! Every drive of a generator object goes through [`Interpreter::drive`],
//! [`Interpreter::step_generator`] or [`Interpreter::close_generator`],
//! which count nesting, record a [`DriveSnapshot`] and translate protocol
//! violations into language exceptions scripts can catch:
//!
//! | engine error          | exception      |
//! |-----------------------|----------------|
//! | `AlreadyRunning`      | `ValueError`   |
//! | `IgnoredTermination`  | `RuntimeError` |
//! | `NonNoneOnStart`      | `TypeError`    |

use crate::generator::errors::GeneratorError;
use crate::generator::iter;
use crate::generator::object::{GeneratorRef, Phase};
use crate::generator::signal::{DriveResult, ResumeSignal};
use crate::interpreter::engine::Interpreter;
use crate::runtime::exception::{Exception, ExceptionKind};
use crate::runtime::value::{BoundMethod, Method, Value};
use crate::snapshot::DriveSnapshot;
use tracing::{debug, trace, warn};

/// Convert an engine error into the exception a script sees
pub fn protocol_exception(err: GeneratorError) -> Exception {
    match err {
        GeneratorError::Raised(exc) => exc,
        GeneratorError::AlreadyRunning => Exception::value_error(err.to_string()),
        GeneratorError::IgnoredTermination => Exception::runtime_error(err.to_string()),
        GeneratorError::NonNoneOnStart => Exception::type_error(err.to_string()),
    }
}

/// What `next()` and `send()` raise once a generator is done
fn stop_iteration(value: Option<Value>) -> Exception {
    match value {
        Some(v) if !v.is_none() => Exception::new(ExceptionKind::StopIteration, v.to_string()),
        _ => Exception::bare(ExceptionKind::StopIteration),
    }
}

fn expect_arity(method: Method, args: &[Value], expected: usize) -> Result<(), Exception> {
    if args.len() == expected {
        return Ok(());
    }
    Err(Exception::type_error(format!(
        "{}() takes exactly {} argument{} ({} given)",
        method.name(),
        expected,
        if expected == 1 { "" } else { "s" },
        args.len()
    )))
}

impl Interpreter {
    /// Run one drive of `generator` with call-depth accounting and record it
    fn recorded<T>(
        &mut self,
        generator: &GeneratorRef,
        operation: &'static str,
        signal: String,
        run: impl FnOnce(&mut Self) -> Result<T, GeneratorError>,
        describe: impl FnOnce(&T) -> String,
    ) -> Result<T, Exception> {
        if self.fatal.is_some() {
            return Err(Exception::runtime_error("drive history limit exceeded"));
        }

        let phase_before = generator.try_borrow().map(|g| g.phase());

        self.enter()?;
        let result = run(self);
        self.leave();

        let outcome = match &result {
            Ok(r) => describe(r),
            Err(e) => {
                if e.is_protocol_violation() {
                    debug!(generator = %generator.name(), operation, error = %e, "protocol violation");
                }
                e.to_string()
            }
        };
        self.record(generator, operation, signal, outcome, phase_before);
        result.map_err(protocol_exception)
    }

    /// Drive `generator` once and record the drive
    pub(crate) fn drive(
        &mut self,
        generator: &GeneratorRef,
        operation: &'static str,
        signal: ResumeSignal,
    ) -> Result<DriveResult, Exception> {
        let signal_text = signal.to_string();
        self.recorded(
            generator,
            operation,
            signal_text,
            |host| generator.drive_with(host, signal),
            DriveResult::to_string,
        )
    }

    /// One step of iteration over a generator value, as `for` and `list()` see it
    pub(crate) fn step_generator(&mut self, generator: &GeneratorRef) -> Result<Option<Value>, Exception> {
        self.recorded(
            generator,
            "iter",
            ResumeSignal::none().to_string(),
            |host| iter::step_shared(generator, host),
            |item| match item {
                Some(value) => format!("produced {}", value.repr()),
                None => "completed".to_string(),
            },
        )
    }

    /// `g.close()`
    pub(crate) fn close_generator(&mut self, generator: &GeneratorRef) -> Result<Value, Exception> {
        self.recorded(
            generator,
            "close",
            "close()".to_string(),
            |host| generator.terminate(host),
            |returned| match returned {
                Some(v) => format!("closed, returned {}", v.repr()),
                None => "closed".to_string(),
            },
        )
        .map(Option::unwrap_or_default)
    }

    fn record(
        &mut self,
        generator: &GeneratorRef,
        operation: &'static str,
        signal: String,
        outcome: String,
        phase_before: Option<Phase>,
    ) {
        // A generator driving itself is still borrowed by the outer drive
        let (Some(phase_before), Some(object)) = (phase_before, generator.try_borrow()) else {
            return;
        };
        trace!(generator = %generator.name(), operation, outcome = %outcome, "drive recorded");

        let event = DriveSnapshot::capture(
            &object,
            operation,
            signal,
            outcome,
            phase_before,
            self.terminal.len(),
            self.depth,
        );
        drop(object);

        if let Err(err) = self.trace.push(event) {
            if self.fatal.is_none() {
                warn!(limit = self.trace.limit(), "drive history is full");
                self.fatal = Some(err);
            }
        }
    }

    /// `next(g)`: the produced value, `StopIteration` once finished
    pub(crate) fn next_generator(&mut self, generator: &GeneratorRef) -> Result<Value, Exception> {
        match self.drive(generator, "next", ResumeSignal::none())? {
            DriveResult::Produced(value) => Ok(value),
            DriveResult::Completion(value) => Err(stop_iteration(value)),
        }
    }

    /// `g.send(v)`, `g.throw(e)`, `g.close()`, `list.append(v)`
    pub(crate) fn call_method(
        &mut self,
        bound: &BoundMethod,
        mut args: Vec<Value>,
    ) -> Result<Value, Exception> {
        match (&bound.receiver, bound.method) {
            (Value::Generator(generator), Method::Send) => {
                expect_arity(Method::Send, &args, 1)?;
                let value = args.pop().unwrap_or_default();
                match self.drive(generator, "send", ResumeSignal::Value(value))? {
                    DriveResult::Produced(value) => Ok(value),
                    DriveResult::Completion(value) => Err(stop_iteration(value)),
                }
            }
            (Value::Generator(generator), Method::Throw) => {
                expect_arity(Method::Throw, &args, 1)?;
                let exc = throwable(args.pop().unwrap_or_default())?;
                match self.drive(generator, "throw", ResumeSignal::InjectException(exc))? {
                    DriveResult::Produced(value) => Ok(value),
                    DriveResult::Completion(value) => Err(stop_iteration(value)),
                }
            }
            (Value::Generator(generator), Method::Close) => {
                expect_arity(Method::Close, &args, 0)?;
                self.close_generator(generator)
            }
            (Value::List(items), Method::Append) => {
                expect_arity(Method::Append, &args, 1)?;
                items.borrow_mut().push(args.pop().unwrap_or_default());
                Ok(Value::None)
            }
            (receiver, method) => Err(Exception::type_error(format!(
                "'{}' object has no method '{}'",
                receiver.type_name(),
                method.name()
            ))),
        }
    }
}

/// The argument of `g.throw(...)`: an exception kind or instance
fn throwable(value: Value) -> Result<Exception, Exception> {
    match value {
        Value::ExceptionType(kind) if kind.is_reserved() => Err(Exception::type_error(format!(
            "{} is reserved for generator termination",
            kind
        ))),
        Value::ExceptionType(kind) => Ok(Exception::bare(kind)),
        Value::Exception(exc) => Ok(exc),
        other => Err(Exception::type_error(format!(
            "exceptions must be classes or instances deriving from BaseException, not {}",
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_violations_become_exceptions() {
        assert_eq!(
            protocol_exception(GeneratorError::AlreadyRunning).kind,
            ExceptionKind::ValueError
        );
        assert_eq!(
            protocol_exception(GeneratorError::IgnoredTermination).kind,
            ExceptionKind::RuntimeError
        );
        assert_eq!(
            protocol_exception(GeneratorError::NonNoneOnStart).kind,
            ExceptionKind::TypeError
        );
        let raised = Exception::bare(ExceptionKind::OSError);
        assert_eq!(protocol_exception(GeneratorError::Raised(raised.clone())), raised);
    }

    #[test]
    fn test_stop_iteration_carries_return_value() {
        assert_eq!(stop_iteration(None).message, None);
        assert_eq!(stop_iteration(Some(Value::None)).message, None);
        assert_eq!(
            stop_iteration(Some(Value::Int(4))).message.as_deref(),
            Some("4")
        );
    }

    #[test]
    fn test_throwable() {
        assert!(throwable(Value::ExceptionType(ExceptionKind::GeneratorExit)).is_err());
        assert_eq!(
            throwable(Value::ExceptionType(ExceptionKind::TypeError)).unwrap().kind,
            ExceptionKind::TypeError
        );
        assert!(throwable(Value::Int(1)).is_err());
    }
}
