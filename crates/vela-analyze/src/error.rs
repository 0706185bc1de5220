//! Internal (non-diagnostic) analyzer errors -- malformed input IR that a
//! 300/400-series diagnostic can't cleanly express.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalyzeError {
    #[error("class or interface '{0}' referenced but not declared in this program")]
    UnknownClass(String),
}
