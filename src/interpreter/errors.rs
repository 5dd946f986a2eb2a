//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], which represents everything that
//! stops a program: compile errors found while decomposing functions, an
//! exception nothing caught, or the drive history filling up.
//!
//! All runtime errors are fatal - they halt execution and display diagnostic information.

use crate::generator::errors::DecomposeError;
use crate::parser::ast::SourceLocation;
use crate::runtime::exception::Exception;
use thiserror::Error;

/// Errors that halt a program
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A function body could not be turned into segments
    #[error(transparent)]
    Decompose(#[from] DecomposeError),

    /// An exception propagated out of the module body
    #[error("uncaught {exception} at line {}", .location.line)]
    Uncaught {
        exception: Exception,
        location: SourceLocation,
    },

    /// The drive history reached its event limit
    #[error("drive history limit of {limit} events exceeded")]
    TraceLimit { limit: usize },
}

impl RuntimeError {
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            RuntimeError::Decompose(err) => err.location(),
            RuntimeError::Uncaught { location, .. } => Some(*location),
            RuntimeError::TraceLimit { .. } => None,
        }
    }

    /// The uncaught exception, if that is what stopped the program
    pub fn exception(&self) -> Option<&Exception> {
        match self {
            RuntimeError::Uncaught { exception, .. } => Some(exception),
            _ => None,
        }
    }
}
