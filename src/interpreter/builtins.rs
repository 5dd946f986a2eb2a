//! Built-in function implementations
//!
//! This module provides the functions scripts can call without defining
//! them. All built-ins are implemented as methods on the [`Interpreter`]
//! struct.
//!
//! # Supported Built-ins
//!
//! - `print(*args)`: space-separated `str()` of each argument, one line
//! - `range(stop)`, `range(start, stop[, step])`
//! - `list([iterable])`: materialises any iterable, driving generators to exhaustion
//! - `next(iterator[, default])`, `iter(iterable)`
//! - `str`, `len`, `abs`, `bool`, `int`

use crate::interpreter::engine::Interpreter;
use crate::runtime::exception::{Exception, ExceptionKind};
use crate::runtime::value::{Builtin, RangeValue, Value};
use std::rc::Rc;
use tracing::trace;

fn check_arity(builtin: Builtin, args: &[Value], min: usize, max: usize) -> Result<(), Exception> {
    if (min..=max).contains(&args.len()) {
        return Ok(());
    }
    let expected = if min == max {
        format!("exactly {}", min)
    } else if args.len() < min {
        format!("at least {}", min)
    } else {
        format!("at most {}", max)
    };
    Err(Exception::type_error(format!(
        "{}() takes {} argument{} ({} given)",
        builtin.name(),
        expected,
        if min == max && min == 1 { "" } else { "s" },
        args.len()
    )))
}

fn integer_arg(value: &Value) -> Result<i64, Exception> {
    value.as_int().ok_or_else(|| {
        Exception::type_error(format!(
            "'{}' object cannot be interpreted as an integer",
            value.type_name()
        ))
    })
}

impl Interpreter {
    pub(crate) fn call_builtin(&mut self, builtin: Builtin, args: Vec<Value>) -> Result<Value, Exception> {
        match builtin {
            Builtin::Print => {
                let line = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                trace!(line = %line, "print");
                self.terminal.print(&line);
                Ok(Value::None)
            }
            Builtin::Range => self.builtin_range(&args),
            Builtin::List => {
                check_arity(builtin, &args, 0, 1)?;
                match args.into_iter().next() {
                    Some(iterable) => Ok(Value::list(self.collect_items(iterable)?)),
                    None => Ok(Value::list(Vec::new())),
                }
            }
            Builtin::Str => {
                check_arity(builtin, &args, 0, 1)?;
                Ok(match args.first() {
                    Some(v) => Value::Str(Rc::from(v.to_string())),
                    None => Value::str(""),
                })
            }
            Builtin::Len => {
                check_arity(builtin, &args, 1, 1)?;
                let len = match &args[0] {
                    Value::List(items) => items.borrow().len(),
                    Value::Str(s) => s.chars().count(),
                    Value::Range(r) => r.len(),
                    other => {
                        return Err(Exception::type_error(format!(
                            "object of type '{}' has no len()",
                            other.type_name()
                        )))
                    }
                };
                Ok(Value::Int(len as i64))
            }
            Builtin::Next => self.builtin_next(args),
            Builtin::Iter => {
                check_arity(builtin, &args, 1, 1)?;
                let iterable = args.into_iter().next().unwrap_or_default();
                self.make_iterator(iterable)
            }
            Builtin::Abs => {
                check_arity(builtin, &args, 1, 1)?;
                match &args[0] {
                    Value::Float(f) => Ok(Value::Float(f.abs())),
                    Value::Int(_) | Value::Bool(_) => {
                        let n = args[0].as_int().unwrap_or(0);
                        n.checked_abs().map(Value::Int).ok_or_else(|| {
                            Exception::new(
                                ExceptionKind::ArithmeticError,
                                format!("integer overflow in abs({})", n),
                            )
                        })
                    }
                    other => Err(Exception::type_error(format!(
                        "bad operand type for abs(): '{}'",
                        other.type_name()
                    ))),
                }
            }
            Builtin::Bool => {
                check_arity(builtin, &args, 0, 1)?;
                Ok(Value::Bool(args.first().is_some_and(Value::is_truthy)))
            }
            Builtin::Int => {
                check_arity(builtin, &args, 0, 1)?;
                match args.first() {
                    None => Ok(Value::Int(0)),
                    Some(Value::Float(f)) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                    Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|_| {
                        Exception::value_error(format!(
                            "invalid literal for int() with base 10: {}",
                            Value::Str(s.clone()).repr()
                        ))
                    }),
                    Some(v) => integer_arg(v).map(Value::Int),
                }
            }
        }
    }

    fn builtin_range(&mut self, args: &[Value]) -> Result<Value, Exception> {
        check_arity(Builtin::Range, args, 1, 3)?;
        let ints = args.iter().map(integer_arg).collect::<Result<Vec<_>, _>>()?;
        let (start, stop, step) = match ints.as_slice() {
            [stop] => (0, *stop, 1),
            [start, stop] => (*start, *stop, 1),
            [start, stop, step] => (*start, *stop, *step),
            _ => return Err(Exception::type_error("range expected at most 3 arguments")),
        };
        if step == 0 {
            return Err(Exception::value_error("range() arg 3 must not be zero"));
        }
        Ok(Value::Range(RangeValue { start, stop, step }))
    }

    fn builtin_next(&mut self, args: Vec<Value>) -> Result<Value, Exception> {
        check_arity(Builtin::Next, &args, 1, 2)?;
        let mut args = args.into_iter();
        let iterator = args.next().unwrap_or_default();
        let default = args.next();

        let item = match &iterator {
            Value::Generator(generator) => match self.next_generator(generator) {
                Err(exc) if exc.kind == ExceptionKind::StopIteration && default.is_some() => None,
                other => Some(other?),
            },
            Value::Iterator(_) => self.next_item(&iterator)?,
            other => {
                return Err(Exception::type_error(format!(
                    "'{}' object is not an iterator",
                    other.type_name()
                )))
            }
        };

        match (item, default) {
            (Some(value), _) => Ok(value),
            (None, Some(default)) => Ok(default),
            (None, None) => Err(Exception::bare(ExceptionKind::StopIteration)),
        }
    }

    /// Drain an iterable into a vector
    pub(crate) fn collect_items(&mut self, iterable: Value) -> Result<Vec<Value>, Exception> {
        let iterator = self.make_iterator(iterable)?;
        let mut items = Vec::new();
        while let Some(item) = self.next_item(&iterator)? {
            items.push(item);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(builtin: Builtin, args: Vec<Value>) -> Result<Value, Exception> {
        Interpreter::new(16).call_builtin(builtin, args)
    }

    #[test]
    fn test_range_and_list() {
        let range = call(Builtin::Range, vec![Value::Int(1), Value::Int(7), Value::Int(2)]).unwrap();
        let list = call(Builtin::List, vec![range]).unwrap();
        assert_eq!(list.to_string(), "[1, 3, 5]");
    }

    #[test]
    fn test_range_zero_step() {
        let err = call(Builtin::Range, vec![Value::Int(1), Value::Int(2), Value::Int(0)]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ValueError);
    }

    #[test]
    fn test_print_joins_with_spaces() {
        let mut interp = Interpreter::new(16);
        interp
            .call_builtin(Builtin::Print, vec![Value::str("a"), Value::Int(1), Value::None])
            .unwrap();
        assert_eq!(interp.output(), vec!["a 1 None"]);
    }

    #[test]
    fn test_int_parsing() {
        assert!(matches!(call(Builtin::Int, vec![Value::str(" 42 ")]), Ok(Value::Int(42))));
        assert!(matches!(call(Builtin::Int, vec![Value::Float(-2.7)]), Ok(Value::Int(-2))));
        let err = call(Builtin::Int, vec![Value::str("x")]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::ValueError);
    }

    #[test]
    fn test_next_on_exhausted_iterator() {
        let mut interp = Interpreter::new(16);
        let it = interp.make_iterator(Value::list(Vec::new())).unwrap();
        let err = interp.call_builtin(Builtin::Next, vec![it.clone()]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::StopIteration);
        let fallback = interp
            .call_builtin(Builtin::Next, vec![it, Value::str("done")])
            .unwrap();
        assert_eq!(fallback.to_string(), "done");
    }

    #[test]
    fn test_arity() {
        let err = call(Builtin::Len, vec![]).unwrap_err();
        assert_eq!(err.kind, ExceptionKind::TypeError);
    }
}
