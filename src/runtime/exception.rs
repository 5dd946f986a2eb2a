//! Language-level exceptions
//!
//! [`ExceptionKind`] is a fixed single-inheritance hierarchy rooted at
//! `BaseException`. Handlers match a kind and all of its descendants.
//!
//! ```text
//! BaseException
//! ├── GeneratorExit
//! └── Exception
//!     ├── ArithmeticError
//!     │   └── ZeroDivisionError
//!     ├── AttributeError
//!     ├── LookupError
//!     │   └── IndexError
//!     ├── NameError
//!     │   └── UnboundLocalError
//!     ├── RuntimeError
//!     │   ├── NotImplementedError
//!     │   └── RecursionError
//!     ├── OSError
//!     ├── StopIteration
//!     ├── TypeError
//!     └── ValueError
//! ```
//!
//! `GeneratorExit` is the termination-request kind. Scripts may name it in an
//! `except` clause but may not construct or raise it themselves.

use std::fmt;
use std::rc::Rc;

/// Built-in exception kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    BaseException,
    GeneratorExit,
    Exception,
    ArithmeticError,
    ZeroDivisionError,
    AttributeError,
    LookupError,
    IndexError,
    NameError,
    UnboundLocalError,
    RuntimeError,
    NotImplementedError,
    RecursionError,
    OSError,
    StopIteration,
    TypeError,
    ValueError,
}

impl ExceptionKind {
    pub const ALL: [ExceptionKind; 17] = [
        ExceptionKind::BaseException,
        ExceptionKind::GeneratorExit,
        ExceptionKind::Exception,
        ExceptionKind::ArithmeticError,
        ExceptionKind::ZeroDivisionError,
        ExceptionKind::AttributeError,
        ExceptionKind::LookupError,
        ExceptionKind::IndexError,
        ExceptionKind::NameError,
        ExceptionKind::UnboundLocalError,
        ExceptionKind::RuntimeError,
        ExceptionKind::NotImplementedError,
        ExceptionKind::RecursionError,
        ExceptionKind::OSError,
        ExceptionKind::StopIteration,
        ExceptionKind::TypeError,
        ExceptionKind::ValueError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExceptionKind::BaseException => "BaseException",
            ExceptionKind::GeneratorExit => "GeneratorExit",
            ExceptionKind::Exception => "Exception",
            ExceptionKind::ArithmeticError => "ArithmeticError",
            ExceptionKind::ZeroDivisionError => "ZeroDivisionError",
            ExceptionKind::AttributeError => "AttributeError",
            ExceptionKind::LookupError => "LookupError",
            ExceptionKind::IndexError => "IndexError",
            ExceptionKind::NameError => "NameError",
            ExceptionKind::UnboundLocalError => "UnboundLocalError",
            ExceptionKind::RuntimeError => "RuntimeError",
            ExceptionKind::NotImplementedError => "NotImplementedError",
            ExceptionKind::RecursionError => "RecursionError",
            ExceptionKind::OSError => "OSError",
            ExceptionKind::StopIteration => "StopIteration",
            ExceptionKind::TypeError => "TypeError",
            ExceptionKind::ValueError => "ValueError",
        }
    }

    pub fn from_name(name: &str) -> Option<ExceptionKind> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Direct parent in the hierarchy; `None` only for `BaseException`
    pub fn parent(self) -> Option<ExceptionKind> {
        match self {
            Self::BaseException => None,
            Self::GeneratorExit | Self::Exception => Some(Self::BaseException),
            Self::ArithmeticError
            | Self::AttributeError
            | Self::LookupError
            | Self::NameError
            | Self::RuntimeError
            | Self::OSError
            | Self::StopIteration
            | Self::TypeError
            | Self::ValueError => Some(Self::Exception),
            Self::ZeroDivisionError => Some(Self::ArithmeticError),
            Self::IndexError => Some(Self::LookupError),
            Self::UnboundLocalError => Some(Self::NameError),
            Self::NotImplementedError | Self::RecursionError => Some(Self::RuntimeError),
        }
    }

    /// Whether `self` is `ancestor` or one of its descendants
    pub fn is_subclass_of(self, ancestor: ExceptionKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }

    /// Kinds user code is not allowed to instantiate
    pub fn is_reserved(self) -> bool {
        self == ExceptionKind::GeneratorExit
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An exception instance: a kind plus an optional message
#[derive(Debug, Clone, PartialEq)]
pub struct Exception {
    pub kind: ExceptionKind,
    pub message: Option<Rc<str>>,
}

impl Exception {
    pub fn new(kind: ExceptionKind, message: impl Into<Rc<str>>) -> Self {
        Exception {
            kind,
            message: Some(message.into()),
        }
    }

    /// An instance with no message, as produced by `raise Kind`
    pub fn bare(kind: ExceptionKind) -> Self {
        Exception {
            kind,
            message: None,
        }
    }

    /// The termination request delivered by `close()`
    pub fn termination_request() -> Self {
        Exception::bare(ExceptionKind::GeneratorExit)
    }

    pub fn is_termination_request(&self) -> bool {
        self.kind == ExceptionKind::GeneratorExit
    }

    pub fn type_error(message: impl Into<Rc<str>>) -> Self {
        Exception::new(ExceptionKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<Rc<str>>) -> Self {
        Exception::new(ExceptionKind::ValueError, message)
    }

    pub fn runtime_error(message: impl Into<Rc<str>>) -> Self {
        Exception::new(ExceptionKind::RuntimeError, message)
    }

    pub fn name_error(name: &str) -> Self {
        Exception::new(
            ExceptionKind::NameError,
            format!("name '{}' is not defined", name),
        )
    }

    pub fn unbound_local(name: &str) -> Self {
        Exception::new(
            ExceptionKind::UnboundLocalError,
            format!(
                "cannot access local variable '{}' where it is not associated with a value",
                name
            ),
        )
    }

    pub fn zero_division(message: &str) -> Self {
        Exception::new(ExceptionKind::ZeroDivisionError, message)
    }

    /// `repr()`-style rendering: `TypeError('message')`
    pub fn repr(&self) -> String {
        match &self.message {
            Some(msg) => format!("{}('{}')", self.kind, msg),
            None => format!("{}()", self.kind),
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(msg) => write!(f, "{}: {}", self.kind, msg),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for Exception {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_walk() {
        assert!(ExceptionKind::ZeroDivisionError.is_subclass_of(ExceptionKind::ArithmeticError));
        assert!(ExceptionKind::ZeroDivisionError.is_subclass_of(ExceptionKind::Exception));
        assert!(ExceptionKind::NotImplementedError.is_subclass_of(ExceptionKind::RuntimeError));
        assert!(!ExceptionKind::TypeError.is_subclass_of(ExceptionKind::ValueError));
    }

    #[test]
    fn test_generator_exit_outside_exception() {
        assert!(ExceptionKind::GeneratorExit.is_subclass_of(ExceptionKind::BaseException));
        assert!(!ExceptionKind::GeneratorExit.is_subclass_of(ExceptionKind::Exception));
        assert!(ExceptionKind::GeneratorExit.is_reserved());
    }

    #[test]
    fn test_name_round_trip_covers_all_kinds() {
        for kind in ExceptionKind::ALL {
            assert_eq!(ExceptionKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ExceptionKind::from_name("KeyError"), None);
    }

    #[test]
    fn test_display_and_repr() {
        let exc = Exception::type_error("bad operand");
        assert_eq!(exc.to_string(), "TypeError: bad operand");
        assert_eq!(exc.repr(), "TypeError('bad operand')");
        assert_eq!(Exception::bare(ExceptionKind::OSError).to_string(), "OSError");
    }
}
