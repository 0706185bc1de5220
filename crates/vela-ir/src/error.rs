//! Internal (non-diagnostic) error type for `vela-ir`.
//!
//! This is distinct from [`crate::diagnostics::Diagnostic`]: diagnostics are
//! user-facing, accumulated across a whole stage run, and never abort a
//! single lookup. [`IrError`] is for malformed-input-class failures --
//! referencing a module, function, or type that does not exist -- which
//! indicate a bug in whatever produced the IR, not a source-program defect.

use thiserror::Error;

use crate::id::{BlockId, FunctionId, ModuleId, TypeId};

#[derive(Debug, Error)]
pub enum IrError {
    #[error("module not found: {id}")]
    ModuleNotFound { id: ModuleId },

    #[error("function not found: {id}")]
    FunctionNotFound { id: FunctionId },

    #[error("anonymous record type not found: {id}")]
    TypeNotFound { id: TypeId },

    #[error("basic block not found: {id}")]
    BlockNotFound { id: BlockId },

    #[error("duplicate declaration name in module: '{name}'")]
    DuplicateDeclaration { name: String },
}
