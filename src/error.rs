//! Core error taxonomy.
//!
//! A malformed Vela program is never a Rust-level error — lexer, parser and
//! resolver failures are recorded as [`crate::diagnostic::Diagnostic`] values
//! and the offending pass still returns its best-effort partial result.
//! `CoreError` exists only for the handful of things that are
//! genuinely exceptional: I/O failure while the module loader walks the
//! search path, and broken internal invariants.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("could not read source file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("module '{0}' could not be found on the search path")]
    ModuleNotFound(String),

    #[error("internal invariant violated: {0}")]
    Invariant(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
