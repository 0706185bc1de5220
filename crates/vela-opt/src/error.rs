//! Internal (non-diagnostic) optimizer errors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptError {
    #[error("function '{0}' references itself as a nested declaration more than once")]
    DuplicateNestedFunction(String),
}
