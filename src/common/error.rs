use thiserror::Error;

use crate::common::diag::Diagnostic;

/// Result type for scriptc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the script compiler
///
/// User mistakes found during analysis are not errors at this level; they are
/// collected as [`Diagnostic`]s and only surface here as `Diagnostics` once a
/// unit is finished, or as `TooManyErrors` when the sink overflows.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Lexical error at line {line}, column {column}: unrecognized input '{text}'")]
    Lexical {
        line: usize,
        column: usize,
        text: String,
    },

    /// Several syntax errors of one unit, each a `Parse` error
    #[error("{}", render_errors(.0))]
    ParseErrors(Vec<Error>),

    #[error("{}", render_diagnostics(.0))]
    Diagnostics(Vec<Diagnostic>),

    #[error("too many errors (limit {limit}); compilation aborted")]
    TooManyErrors { limit: usize },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn parse_error(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    /// Diagnostics carried by this error, if it is a `Diagnostics` error
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Error::Diagnostics(list) => list,
            _ => &[],
        }
    }
}

fn render_errors(list: &[Error]) -> String {
    list.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_diagnostics(list: &[Diagnostic]) -> String {
    list.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
