//! The resume-signal protocol between a driver and a generator object

use crate::runtime::exception::Exception;
use crate::runtime::value::Value;
use std::fmt;

/// What the driver delivers at the suspension point
#[derive(Debug, Clone)]
pub enum ResumeSignal {
    /// The suspension expression evaluates to this value
    Value(Value),
    /// This exception is raised at the suspension point
    InjectException(Exception),
    /// `GeneratorExit` is raised at the suspension point; the body must not yield again
    TerminationRequest,
}

impl ResumeSignal {
    pub fn none() -> Self {
        ResumeSignal::Value(Value::None)
    }

    /// Short name used in drive history
    pub fn label(&self) -> &'static str {
        match self {
            ResumeSignal::Value(_) => "send",
            ResumeSignal::InjectException(_) => "throw",
            ResumeSignal::TerminationRequest => "close",
        }
    }
}

impl fmt::Display for ResumeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResumeSignal::Value(v) => write!(f, "send({})", v.repr()),
            ResumeSignal::InjectException(e) => write!(f, "throw({})", e.repr()),
            ResumeSignal::TerminationRequest => write!(f, "close()"),
        }
    }
}

/// The outcome of a successful drive
#[derive(Debug, Clone)]
pub enum DriveResult {
    /// The body suspended, producing this value
    Produced(Value),
    /// The body finished; the payload is the `return` value, if any
    Completion(Option<Value>),
}

impl DriveResult {
    pub fn produced(&self) -> Option<&Value> {
        match self {
            DriveResult::Produced(v) => Some(v),
            DriveResult::Completion(_) => None,
        }
    }

    /// Iterator view of a drive: the produced value, or `None` once finished
    pub fn into_item(self) -> Option<Value> {
        match self {
            DriveResult::Produced(v) => Some(v),
            DriveResult::Completion(_) => None,
        }
    }
}

impl fmt::Display for DriveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriveResult::Produced(v) => write!(f, "produced {}", v.repr()),
            DriveResult::Completion(Some(v)) => write!(f, "completed with {}", v.repr()),
            DriveResult::Completion(None) => write!(f, "completed"),
        }
    }
}
