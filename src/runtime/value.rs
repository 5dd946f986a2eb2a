//! Runtime value representation
//!
//! This module defines the [`Value`] enum, which represents all possible runtime
//! values seen by generator bodies and the host evaluator.
//!
//! # Value Types
//!
//! - Scalars: [`Value::None`], [`Value::Bool`], [`Value::Int`] (64-bit),
//!   [`Value::Float`], [`Value::Str`]
//! - [`Value::List`]: shared, mutable sequence (aliasing is visible, as in
//!   the source language)
//! - [`Value::Range`] and [`Value::Iterator`]: lazy sequences
//! - Callables: [`Value::Function`] (a compiled descriptor),
//!   [`Value::Builtin`], [`Value::BoundMethod`]
//! - [`Value::Generator`]: a live generator object
//! - [`Value::ExceptionType`] / [`Value::Exception`]: exception kinds and instances

use super::exception::{Exception, ExceptionKind};
use crate::generator::descriptor::GeneratorDescriptor;
use crate::generator::object::GeneratorRef;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Runtime values in the interpreter
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    Range(RangeValue),
    Iterator(Rc<RefCell<SeqIter>>),
    Function(Rc<GeneratorDescriptor>),
    Builtin(Builtin),
    BoundMethod(Rc<BoundMethod>),
    Generator(GeneratorRef),
    ExceptionType(ExceptionKind),
    Exception(Exception),
}

/// `range(start, stop, step)`; `step` is never zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeValue {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

impl RangeValue {
    pub fn len(&self) -> usize {
        let span = if self.step > 0 {
            self.stop.saturating_sub(self.start)
        } else {
            self.start.saturating_sub(self.stop)
        };
        if span <= 0 {
            return 0;
        }
        let step = self.step.unsigned_abs();
        ((span as u64).div_ceil(step)) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, n: i64) -> bool {
        let in_bounds = if self.step > 0 {
            self.start <= n && n < self.stop
        } else {
            self.stop < n && n <= self.start
        };
        in_bounds && (n - self.start) % self.step == 0
    }
}

/// Cursor over a list, range or string
#[derive(Debug, Clone)]
pub enum SeqIter {
    List {
        items: Rc<RefCell<Vec<Value>>>,
        index: usize,
    },
    Range {
        next: i64,
        stop: i64,
        step: i64,
    },
    Chars {
        chars: Vec<char>,
        index: usize,
    },
}

impl SeqIter {
    pub fn next_value(&mut self) -> Option<Value> {
        match self {
            SeqIter::List { items, index } => {
                let item = items.borrow().get(*index).cloned()?;
                *index += 1;
                Some(item)
            }
            SeqIter::Range { next, stop, step } => {
                let more = if *step > 0 { *next < *stop } else { *next > *stop };
                if !more {
                    return None;
                }
                let current = *next;
                *next = next.saturating_add(*step);
                Some(Value::Int(current))
            }
            SeqIter::Chars { chars, index } => {
                let ch = *chars.get(*index)?;
                *index += 1;
                Some(Value::Str(Rc::from(ch.to_string())))
            }
        }
    }
}

/// Built-in functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Print,
    Range,
    List,
    Str,
    Len,
    Next,
    Iter,
    Abs,
    Bool,
    Int,
}

impl Builtin {
    pub const ALL: [Builtin; 10] = [
        Builtin::Print,
        Builtin::Range,
        Builtin::List,
        Builtin::Str,
        Builtin::Len,
        Builtin::Next,
        Builtin::Iter,
        Builtin::Abs,
        Builtin::Bool,
        Builtin::Int,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Print => "print",
            Builtin::Range => "range",
            Builtin::List => "list",
            Builtin::Str => "str",
            Builtin::Len => "len",
            Builtin::Next => "next",
            Builtin::Iter => "iter",
            Builtin::Abs => "abs",
            Builtin::Bool => "bool",
            Builtin::Int => "int",
        }
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }
}

/// Methods reachable through attribute access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Send,
    Throw,
    Close,
    Append,
}

impl Method {
    pub fn name(self) -> &'static str {
        match self {
            Method::Send => "send",
            Method::Throw => "throw",
            Method::Close => "close",
            Method::Append => "append",
        }
    }
}

/// A method together with the value it was looked up on
#[derive(Debug, Clone)]
pub struct BoundMethod {
    pub receiver: Value,
    pub method: Method,
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Range(_) => "range",
            Value::Iterator(_) => "iterator",
            Value::Function(_) => "function",
            Value::Builtin(_) => "builtin_function_or_method",
            Value::BoundMethod(_) => "method",
            Value::Generator(_) => "generator",
            Value::ExceptionType(_) => "type",
            Value::Exception(e) => e.kind.name(),
        }
    }

    /// Truth value testing
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Range(r) => !r.is_empty(),
            _ => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            Value::Bool(b) => Some(*b as i64 as f64),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Identity comparison (`is`)
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b),
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Generator(a), Value::Generator(b)) => a.ptr_eq(b),
            (Value::Builtin(a), Value::Builtin(b)) => a == b,
            (Value::ExceptionType(a), Value::ExceptionType(b)) => a == b,
            _ => false,
        }
    }

    /// Equality (`==`); numbers compare across int/float/bool
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Exception(a), Value::Exception(b)) => a == b,
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                self.as_int() == other.as_int()
            }
            (
                Value::Int(_) | Value::Bool(_) | Value::Float(_),
                Value::Int(_) | Value::Bool(_) | Value::Float(_),
            ) => self.as_float() == other.as_float(),
            _ => self.is_same(other),
        }
    }

    /// `repr()` rendering: strings are quoted
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => repr_str(s),
            Value::Exception(e) => e.repr(),
            _ => self.to_string(),
        }
    }
}

fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn format_float(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e16 {
        format!("{:.1}", n)
    } else {
        format!("{}", n)
    }
}

/// `str()` rendering
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(items) => {
                // Self-containing lists render the inner reference as [...]
                let Ok(items) = items.try_borrow_mut() else {
                    return write!(f, "[...]");
                };
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                write!(f, "]")
            }
            Value::Range(r) => {
                if r.step == 1 {
                    write!(f, "range({}, {})", r.start, r.stop)
                } else {
                    write!(f, "range({}, {}, {})", r.start, r.stop, r.step)
                }
            }
            Value::Iterator(_) => write!(f, "<iterator object>"),
            Value::Function(d) => write!(f, "<function {}>", d.name),
            Value::Builtin(b) => write!(f, "<built-in function {}>", b.name()),
            Value::BoundMethod(m) => write!(
                f,
                "<bound method {}.{}>",
                m.receiver.type_name(),
                m.method.name()
            ),
            Value::Generator(g) => write!(f, "<generator object {}>", g.name()),
            Value::ExceptionType(kind) => write!(f, "<class '{}'>", kind),
            Value::Exception(e) => match &e.message {
                Some(msg) => write!(f, "{}", msg),
                None => Ok(()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_display_uses_repr() {
        let list = Value::list(vec![Value::str("fizz"), Value::Int(3), Value::None]);
        assert_eq!(list.to_string(), "['fizz', 3, None]");
    }

    #[test]
    fn test_float_formatting() {
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Float(0.5).to_string(), "0.5");
        assert_eq!(Value::Float(-3.0).to_string(), "-3.0");
    }

    #[test]
    fn test_numeric_equality_across_types() {
        assert!(Value::Int(1).equals(&Value::Float(1.0)));
        assert!(Value::Bool(true).equals(&Value::Int(1)));
        assert!(!Value::Int(1).equals(&Value::str("1")));
    }

    #[test]
    fn test_range_len_and_contains() {
        let r = RangeValue {
            start: 1,
            stop: 20,
            step: 3,
        };
        assert_eq!(r.len(), 7);
        assert!(r.contains(19));
        assert!(!r.contains(20));

        let down = RangeValue {
            start: 5,
            stop: 0,
            step: -2,
        };
        assert_eq!(down.len(), 3);
        assert!(down.contains(1));
    }

    #[test]
    fn test_range_iterator() {
        let mut it = SeqIter::Range {
            next: 0,
            stop: 3,
            step: 1,
        };
        let mut seen = Vec::new();
        while let Some(Value::Int(n)) = it.next_value() {
            seen.push(n);
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_repr_quotes_strings() {
        assert_eq!(Value::str("it's").repr(), "\"it's\"");
        assert_eq!(Value::str("a\nb").repr(), "'a\\nb'");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::str("x").is_truthy());
        assert!(!Value::list(vec![]).is_truthy());
    }
}
