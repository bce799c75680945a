use thiserror::Error;

use crate::common::error::Error;
use crate::parser::span::Location;

/// Syntax problems; parsing resumes at the next statement after each one
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected {expected}, found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        location: Location,
    },

    #[error("expected {expected}, found end of input")]
    UnexpectedEndOfInput { expected: String, location: Location },

    #[error("{message}")]
    InvalidSyntax { message: String, location: Location },

    #[error("unrecognized input '{text}'")]
    LexicalError { text: String, location: Location },

    #[error("{} syntax errors", .errors.len())]
    MultipleErrors { errors: Vec<ParseError> },
}

impl ParseError {
    pub fn unexpected_token(expected: &str, found: &str, location: Location) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: found.to_string(),
            location,
        }
    }

    pub fn unexpected_end_of_input(expected: &str, location: Location) -> Self {
        ParseError::UnexpectedEndOfInput {
            expected: expected.to_string(),
            location,
        }
    }

    pub fn invalid_syntax(message: impl Into<String>, location: Location) -> Self {
        ParseError::InvalidSyntax {
            message: message.into(),
            location,
        }
    }

    /// Where the error, or the first of several, was found
    pub fn location(&self) -> Location {
        match self {
            ParseError::UnexpectedToken { location, .. }
            | ParseError::UnexpectedEndOfInput { location, .. }
            | ParseError::InvalidSyntax { location, .. }
            | ParseError::LexicalError { location, .. } => *location,
            ParseError::MultipleErrors { errors } => {
                errors.first().map(|e| e.location()).unwrap_or_else(Location::start)
            }
        }
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        let location = err.location();
        match err {
            ParseError::LexicalError { text, .. } => Error::Lexical {
                line: location.line,
                column: location.column,
                text,
            },
            ParseError::MultipleErrors { errors } => {
                Error::ParseErrors(errors.into_iter().map(Error::from).collect())
            }
            other => Error::parse_error(location.line, location.column, other.to_string()),
        }
    }
}
