//! arxc-util - Shared utilities for the Arx compiler.
//!
//! This crate holds the pieces every phase needs: source locations and
//! the compiler-wide error type. Phase crates (`arxc-lex`, `arxc-par`,
//! `arxc-gen`, `arxc-drv`) depend on this crate and nothing here depends
//! on them.

mod error;
mod loc;

pub use error::{CompileError, Result};
pub use loc::SourceLocation;
