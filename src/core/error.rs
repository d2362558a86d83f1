// This module defines error types for the bfaot compiler using the thiserror crate for
// idiomatic Rust error handling. CompileError is the main error enum covering the four
// ways a compilation can fail: a loop left open at end of input, a loop closed without a
// matching open, a buffer or stack that could not grow, and a failure reported by the ELF
// linker. Bracket errors carry the byte offset of the offending bracket for diagnostics.
// The module also provides CompileResult<T> as a convenience type alias for
// Result<T, CompileError>.

//! Error types for the bfaot compiler.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

use crate::elf::LinkError;

/// Main error type for compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("unmatched '[' at byte {offset}: loop is never closed")]
    UnmatchedOpenBracket {
        /// Offset of the first bracket still open at end of input.
        offset: usize,
    },

    #[error("unmatched ']' at byte {offset}: no loop to close")]
    UnmatchedCloseBracket {
        offset: usize,
    },

    #[error("resource exhausted: {what}")]
    ResourceExhausted {
        what: &'static str,
    },

    #[error("backend failure: {0}")]
    BackendFailure(#[from] LinkError),
}

impl CompileError {
    /// True for errors caused by the source text rather than the compiler.
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            CompileError::UnmatchedOpenBracket { .. } | CompileError::UnmatchedCloseBracket { .. }
        )
    }
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
