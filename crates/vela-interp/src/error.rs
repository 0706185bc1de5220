//! Runtime error types with trap semantics for the tree-walking interpreter.
//!
//! Every variant is designed to be actionable on its own: no "see the log
//! for context" errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum RuntimeError {
    #[error("integer overflow")]
    IntegerOverflow,

    #[error("divide by zero")]
    DivideByZero,

    #[error("out of bounds access: index {index}, size {size}")]
    OutOfBoundsAccess { index: i64, size: usize },

    #[error("recursion depth limit ({limit}) exceeded")]
    RecursionLimitExceeded { limit: usize },

    #[error("type mismatch at runtime: expected {expected}, got {got}")]
    TypeMismatchAtRuntime { expected: String, got: String },

    #[error("undefined variable: '{name}'")]
    UndefinedVariable { name: String },

    #[error("function not found: '{name}'")]
    FunctionNotFound { name: String },

    #[error("class not found: '{name}'")]
    ClassNotFound { name: String },

    #[error("no field '{field}' on value")]
    NoSuchField { field: String },

    #[error("null pointer dereference")]
    NullDereference {},

    #[error("uncaught exception: {message}")]
    UncaughtException { message: String },

    #[error("internal error: {message}")]
    InternalError { message: String },
}
