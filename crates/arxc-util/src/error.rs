//! Compiler error type shared by all phases.
//!
//! Each phase returns a single fatal error upward; there is no local
//! recovery. Every variant except `Io` carries the source location the
//! failure was detected at.

use thiserror::Error;

use crate::loc::SourceLocation;

/// Result alias used throughout the compiler.
pub type Result<T> = std::result::Result<T, CompileError>;

/// A fatal compilation error.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Malformed input at the character level (e.g. a bad float literal).
    #[error("lexical error: {message}")]
    Lexical {
        message: String,
        loc: SourceLocation,
    },

    /// The token stream does not match the grammar.
    #[error("parse error: {message}")]
    Parse {
        message: String,
        loc: SourceLocation,
    },

    /// Unknown variable or function, assignment to a non-variable, or an
    /// arity mismatch at a call site.
    #[error("scope error: {message}")]
    Scope {
        message: String,
        loc: SourceLocation,
    },

    /// The IR builder refused an emission or an internal invariant broke.
    #[error("lowering error: {message}")]
    Lowering {
        message: String,
        loc: SourceLocation,
    },

    /// Input unreadable or output unwritable.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    pub fn lexical(message: impl Into<String>, loc: SourceLocation) -> Self {
        CompileError::Lexical {
            message: message.into(),
            loc,
        }
    }

    pub fn parse(message: impl Into<String>, loc: SourceLocation) -> Self {
        CompileError::Parse {
            message: message.into(),
            loc,
        }
    }

    pub fn scope(message: impl Into<String>, loc: SourceLocation) -> Self {
        CompileError::Scope {
            message: message.into(),
            loc,
        }
    }

    pub fn lowering(message: impl Into<String>, loc: SourceLocation) -> Self {
        CompileError::Lowering {
            message: message.into(),
            loc,
        }
    }

    /// The source location the error points at, if any.
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            CompileError::Lexical { loc, .. }
            | CompileError::Parse { loc, .. }
            | CompileError::Scope { loc, .. }
            | CompileError::Lowering { loc, .. } => Some(*loc),
            CompileError::Io(_) => None,
        }
    }
}
