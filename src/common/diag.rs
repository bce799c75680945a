//! Diagnostics collected while analysing and generating a unit
//!
//! Every user-facing mistake is a [`SemanticError`] logged into an
//! [`ErrorList`] together with its source span. Logging never aborts a unit
//! by itself; only exceeding the list's capacity does, which surfaces as
//! [`Error::TooManyErrors`] and is propagated with `?`.

use std::fmt;

use thiserror::Error;

use crate::common::error::{Error, Result};
use crate::parser::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SemanticError {
    #[error("cannot find symbol '{0}'")]
    UndefinedName(String),

    #[error("cannot find type '{0}'")]
    UnknownType(String),

    #[error("cannot find imported type '{0}'")]
    UnknownImport(String),

    #[error("cannot find field '{name}' in {class}")]
    UnknownField { class: String, name: String },

    #[error("cannot find method {name}({args}) in {class}")]
    UnknownMethod {
        class: String,
        name: String,
        args: String,
    },

    #[error("reference to {name} is ambiguous in {class}")]
    AmbiguousMethod { class: String, name: String },

    #[error("{0} is not accessible from this method")]
    Inaccessible(String),

    #[error("non-static {0} cannot be referenced from a static context")]
    NonStaticReference(String),

    #[error("cannot use 'this' in a static context")]
    ThisInStatic,

    #[error("'super' may only invoke the method being compiled, not '{0}'")]
    SuperInvocation(String),

    #[error("{0} is abstract; cannot be instantiated")]
    AbstractInstantiation(String),

    #[error("variable '{0}' might not have been initialized")]
    VarUnassigned(String),

    #[error("final variable '{0}' might already have been assigned")]
    FinalReassigned(String),

    #[error("final variable '{0}' might be assigned in loop")]
    FinalInLoop(String),

    #[error("cannot assign a value to final field '{0}'")]
    FinalFieldAssigned(String),

    #[error("variable '{0}' is already defined in this method")]
    DuplicateVariable(String),

    #[error("left-hand side of an assignment must be a variable")]
    NotAssignable,

    #[error("not a statement")]
    NotAStatement,

    #[error("incompatible types: {found} cannot be converted to {expected}")]
    TypeMismatch { expected: String, found: String },

    #[error("bad operand type {found} for unary operator '{op}'")]
    BadOperand { op: String, found: String },

    #[error("bad operand types for binary operator '{op}': {left} and {right}")]
    BadOperands {
        op: String,
        left: String,
        right: String,
    },

    #[error("incompatible types: cannot cast {from} to {to}")]
    BadCast { from: String, to: String },

    #[error("array required, but {0} found")]
    ArrayRequired(String),

    #[error("array creation with both dimension expressions and an initializer is illegal")]
    InitializerWithDimensions,

    #[error("'void' type not allowed here")]
    VoidValue,

    #[error("division by zero in constant expression")]
    DivideByZero,

    #[error("unreachable statement")]
    UnreachableStatement,

    #[error("missing return statement")]
    MissingReturn,

    #[error("cannot return a value from a method with void result type")]
    ReturnValueInVoid,

    #[error("return statement is missing a value of type {0}")]
    ReturnValueMissing(String),

    #[error("unreported exception {0}; must be caught or declared to be thrown")]
    UncaughtException(String),

    #[error("exception {caught} has already been caught by {earlier}")]
    CatchUnreachable { caught: String, earlier: String },

    #[error("exception {0} is never thrown in body of corresponding try statement")]
    ExceptionNeverThrown(String),

    #[error("incompatible types: {0} is not a Throwable")]
    NotThrowable(String),

    #[error("break outside switch or loop")]
    BreakOutsideLoop,

    #[error("continue outside of loop")]
    ContinueOutsideLoop,

    #[error("undefined label: {0}")]
    UndefinedLabel(String),

    #[error("label '{0}' is already in use")]
    DuplicateLabel(String),

    #[error("not a loop label: {0}")]
    NotALoopLabel(String),

    #[error("duplicate case label {0}")]
    DuplicateCase(String),

    #[error("duplicate default label")]
    DuplicateDefault,

    #[error("constant expression required")]
    CaseNotConstant,
}

impl SemanticError {
    /// Stable identifier of the error kind, independent of its message text
    pub fn code(&self) -> &'static str {
        match self {
            SemanticError::UndefinedName(_) => "NAME_UNDEFINED",
            SemanticError::UnknownType(_) => "TYPE_UNKNOWN",
            SemanticError::UnknownImport(_) => "IMPORT_UNKNOWN",
            SemanticError::UnknownField { .. } => "FIELD_UNKNOWN",
            SemanticError::UnknownMethod { .. } => "METHOD_UNKNOWN",
            SemanticError::AmbiguousMethod { .. } => "METHOD_AMBIGUOUS",
            SemanticError::Inaccessible(_) => "NOT_ACCESSIBLE",
            SemanticError::NonStaticReference(_) => "REF_NONSTATIC",
            SemanticError::ThisInStatic => "THIS_STATIC",
            SemanticError::SuperInvocation(_) => "SUPER_ILLEGAL",
            SemanticError::AbstractInstantiation(_) => "NEW_ABSTRACT",
            SemanticError::VarUnassigned(_) => "VAR_UNASSIGNED",
            SemanticError::FinalReassigned(_) => "FINAL_REASSIGN",
            SemanticError::FinalInLoop(_) => "FINAL_IN_LOOP",
            SemanticError::FinalFieldAssigned(_) => "FINAL_FIELD",
            SemanticError::DuplicateVariable(_) => "VAR_DUPLICATE",
            SemanticError::NotAssignable => "NOT_ASSIGNABLE",
            SemanticError::NotAStatement => "NOT_STATEMENT",
            SemanticError::TypeMismatch { .. } => "TYPE_MISMATCH",
            SemanticError::BadOperand { .. } => "OPERAND_BAD",
            SemanticError::BadOperands { .. } => "OPERANDS_BAD",
            SemanticError::BadCast { .. } => "CAST_ILLEGAL",
            SemanticError::ArrayRequired(_) => "ARRAY_REQUIRED",
            SemanticError::InitializerWithDimensions => "ARRAY_INIT_DIMS",
            SemanticError::VoidValue => "VOID_VALUE",
            SemanticError::DivideByZero => "DIVIDE_BY_ZERO",
            SemanticError::UnreachableStatement => "STMT_UNREACHABLE",
            SemanticError::MissingReturn => "RETURN_MISSING",
            SemanticError::ReturnValueInVoid => "RETURN_VOID",
            SemanticError::ReturnValueMissing(_) => "RETURN_VALUE",
            SemanticError::UncaughtException(_) => "EXCEPT_UNCAUGHT",
            SemanticError::CatchUnreachable { .. } => "CATCH_UNREACHABLE",
            SemanticError::ExceptionNeverThrown(_) => "CATCH_NEVER_THROWN",
            SemanticError::NotThrowable(_) => "NOT_THROWABLE",
            SemanticError::BreakOutsideLoop => "BREAK_OUTSIDE",
            SemanticError::ContinueOutsideLoop => "CONTINUE_OUTSIDE",
            SemanticError::UndefinedLabel(_) => "LABEL_UNDEFINED",
            SemanticError::DuplicateLabel(_) => "LABEL_DUPLICATE",
            SemanticError::NotALoopLabel(_) => "LABEL_NOT_LOOP",
            SemanticError::DuplicateCase(_) => "CASE_DUPLICATE",
            SemanticError::DuplicateDefault => "DEFAULT_DUPLICATE",
            SemanticError::CaseNotConstant => "CASE_NOT_CONSTANT",
        }
    }
}

/// A logged problem with its location
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: SemanticError,
    pub span: Span,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}] at {}", self.severity, self.error, self.error.code(), self.span)
    }
}

/// Accumulates diagnostics for one unit
#[derive(Debug)]
pub struct ErrorList {
    items: Vec<Diagnostic>,
    max_errors: usize,
}

impl ErrorList {
    pub fn new(max_errors: usize) -> Self {
        Self {
            items: Vec::new(),
            max_errors: max_errors.max(1),
        }
    }

    /// Log an error; fails once more than `max_errors` errors were logged
    pub fn log(&mut self, error: SemanticError, span: Span) -> Result<()> {
        log::trace!("diagnostic {} at {}", error.code(), span);
        self.items.push(Diagnostic {
            severity: Severity::Error,
            error,
            span,
        });
        if self.error_count() > self.max_errors {
            return Err(Error::TooManyErrors { limit: self.max_errors });
        }
        Ok(())
    }

    pub fn warn(&mut self, error: SemanticError, span: Span) {
        self.items.push(Diagnostic {
            severity: Severity::Warning,
            error,
            span,
        });
    }

    pub fn error_count(&self) -> usize {
        self.items
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Errors only, in the order they were logged
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Default for ErrorList {
    fn default() -> Self {
        Self::new(crate::common::consts::DEFAULT_MAX_ERRORS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_fatal() {
        let mut list = ErrorList::new(2);
        assert!(list.log(SemanticError::NotAStatement, Span::default()).is_ok());
        assert!(list.log(SemanticError::NotAStatement, Span::default()).is_ok());
        let err = list.log(SemanticError::NotAStatement, Span::default()).unwrap_err();
        assert!(matches!(err, Error::TooManyErrors { limit: 2 }));
    }

    #[test]
    fn warnings_do_not_count() {
        let mut list = ErrorList::new(1);
        list.warn(SemanticError::UnreachableStatement, Span::default());
        assert!(!list.has_errors());
        assert!(!list.is_empty());
    }
}
