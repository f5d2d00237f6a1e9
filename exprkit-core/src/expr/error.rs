//! Expression error types

use thiserror::Error;

/// Failure to turn source text into an [`Expression`](super::Expression).
///
/// Nothing is allocated on this path, so there is never a handle to release.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Syntax error at {line}:{column}: {message}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Unsupported expression: {kind}")]
    Unsupported { kind: String },

    #[error("Unknown function: '{name}'")]
    UnknownFunction { name: String },

    #[error("Function '{name}' expects {expected} argument(s), found {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    #[error("Invalid literal '{literal}': {message}")]
    InvalidLiteral { literal: String, message: String },

    #[error("Expression nesting exceeds the limit of {limit}")]
    TooDeep { limit: usize },
}

impl ParseError {
    pub fn unsupported(kind: impl Into<String>) -> Self {
        ParseError::Unsupported { kind: kind.into() }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::Syntax { .. } => "syntax",
            ParseError::Unsupported { .. } => "unsupported",
            ParseError::UnknownFunction { .. } => "unknown_function",
            ParseError::Arity { .. } => "arity",
            ParseError::InvalidLiteral { .. } => "invalid_literal",
            ParseError::TooDeep { .. } => "too_deep",
        }
    }
}

impl From<syn::Error> for ParseError {
    fn from(err: syn::Error) -> Self {
        let start = err.span().start();
        ParseError::Syntax {
            message: err.to_string(),
            line: start.line,
            column: start.column,
        }
    }
}

/// Failure while evaluating a prepared expression, or while addressing one
/// through a [`HandleTable`](crate::HandleTable).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Missing value for identifier '{name}'")]
    MissingIdentifier { name: String },

    #[error("Type mismatch: {context}")]
    TypeMismatch { context: String },

    #[error("Domain error: {context}")]
    DomainError { context: String },

    #[error("Handle {handle} has already been released")]
    UseAfterRelease { handle: u64 },

    #[error("Handle {handle} was never issued")]
    InvalidHandle { handle: u64 },
}

impl EvalError {
    pub fn missing(name: impl Into<String>) -> Self {
        EvalError::MissingIdentifier { name: name.into() }
    }

    pub fn type_mismatch(context: impl Into<String>) -> Self {
        EvalError::TypeMismatch {
            context: context.into(),
        }
    }

    pub fn domain(context: impl Into<String>) -> Self {
        EvalError::DomainError {
            context: context.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            EvalError::MissingIdentifier { .. } => "missing_identifier",
            EvalError::TypeMismatch { .. } => "type_mismatch",
            EvalError::DomainError { .. } => "domain_error",
            EvalError::UseAfterRelease { .. } => "use_after_release",
            EvalError::InvalidHandle { .. } => "invalid_handle",
        }
    }
}

/// Either side of the prepare/execute pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

impl Error {
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Parse(e) => e.kind(),
            Error::Eval(e) => e.kind(),
        }
    }
}
