//! Error types returned while compiling a selector.
//!
//! Every variant here is a compile-time error: `Matcher::compile` is the
//! only fallible entry point this crate exposes. `InvalidDocument` is kept
//! for API symmetry with callers that ingest untyped input before ever
//! constructing a `bson::Document`; this crate itself never constructs it,
//! since `Matcher::matches` only accepts an already-typed document.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SelectorError>;

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("invalid selector shape: {0}")]
    InvalidSelectorShape(String),

    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    #[error("operator operand type error: {0}")]
    OperatorOperandTypeError(String),

    #[error("operator context error: {0}")]
    OperatorContextError(String),

    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}
