//! Codegen error types covering all backend failure modes (spec §4.7, §7
//! `BackendFailure`).

/// Errors that can occur while emitting C++ from a lowered program.
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    /// A type could not be lowered to a C++ spelling.
    #[error("type mapping error: {0}")]
    TypeMapping(String),

    /// An SSA construct has no emission rule yet.
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// No entry function could be selected for `main`.
    #[error("no entry function found")]
    NoEntryFunction,

    /// The entry function does not satisfy the shape `main` requires.
    #[error("invalid entry function: {0}")]
    InvalidEntryFunction(String),

    /// A function reached the backend still in tree form; SSA conversion
    /// must run before codegen (pipeline ordering failure, not user error).
    #[error("internal error: {0}")]
    Internal(String),

    /// Filesystem I/O error while writing generated sources.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
