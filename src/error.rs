//! Error types for the runtime.
//!
//! Interning failures are ordinary results the caller decides how to surface.
//! Everything else is a fault that unwinds through `?` to the top-level driver.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::language::Symbol;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures of `Context::intern_var`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternError {
    #[error("can't intern var; sym isn't qualified: {0}")]
    UnqualifiedSymbol(Symbol),
    #[error("can't intern var; namespace doesn't exist: {0}")]
    MissingNamespace(Symbol),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Intern(#[from] InternError),

    #[error("unimplemented: {0}")]
    Unimplemented(&'static str),

    #[error("assertion failed")]
    AssertionFailed,

    #[error("unable to map file {} due to error: {source}", path.display())]
    MapFile { path: PathBuf, source: io::Error },

    #[error("unable to locate the running executable: {0}")]
    ProcessLocation(io::Error),

    #[error("expected a sequence: {0}")]
    ExpectedSequence(String),

    #[error("lex error at {position}: {message}")]
    Lex { position: usize, message: String },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("analysis error: {0}")]
    Analyze(String),

    #[error("{0}")]
    Runtime(String),

    #[error("macroexpansion of {form} did not settle after {limit} steps")]
    MacroexpansionLimit { form: String, limit: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime(message.into())
    }

    pub fn analyze(message: impl Into<String>) -> Self {
        Error::Analyze(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    /// True when the input stopped partway through a form, so more text
    /// could still complete it.
    pub fn is_incomplete_input(&self) -> bool {
        match self {
            Error::Parse(msg) => msg.starts_with("unexpected end of input"),
            Error::Lex { message, .. } => message == "unterminated string",
            _ => false,
        }
    }
}
