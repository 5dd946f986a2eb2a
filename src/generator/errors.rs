//! Error types for decomposition and driving

use crate::parser::ast::SourceLocation;
use crate::runtime::exception::Exception;
use thiserror::Error;

/// Why a drive did not produce a value or complete
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeneratorError {
    /// An exception escaped the body (or was injected and not caught)
    #[error("{0}")]
    Raised(Exception),

    /// The generator was driven while it was already running
    #[error("generator already executing")]
    AlreadyRunning,

    /// The body yielded again after a termination request was delivered
    #[error("generator ignored GeneratorExit")]
    IgnoredTermination,

    /// A value other than `None` was sent before the first suspension
    #[error("can't send non-None value to a just-started generator")]
    NonNoneOnStart,
}

impl GeneratorError {
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, GeneratorError::Raised(_))
    }
}

impl From<Exception> for GeneratorError {
    fn from(exc: Exception) -> Self {
        GeneratorError::Raised(exc)
    }
}

/// A function body that cannot be turned into segments
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecomposeError {
    #[error("'{keyword}' outside loop at line {}, column {}", .location.line, .location.column)]
    OutsideLoop {
        keyword: &'static str,
        location: SourceLocation,
    },

    #[error("'{keyword}' outside function at line {}, column {}", .location.line, .location.column)]
    OutsideFunction {
        keyword: &'static str,
        location: SourceLocation,
    },

    #[error("malformed descriptor: {0}")]
    Internal(String),
}

impl DecomposeError {
    pub fn internal(message: impl Into<String>) -> Self {
        DecomposeError::Internal(message.into())
    }

    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            DecomposeError::OutsideLoop { location, .. }
            | DecomposeError::OutsideFunction { location, .. } => Some(*location),
            DecomposeError::Internal(_) => None,
        }
    }
}
