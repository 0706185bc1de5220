//! Internal (non-diagnostic) lowering errors -- contract violations in the
//! input that a diagnostic can't cleanly express (spec §4.2 "Failure modes"
//! treats these as fatal diagnostics; this type is the Rust-level signal
//! `lib.rs` turns into one).

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LowerError {
    #[error("type alias '{0}' is part of a cycle")]
    CyclicTypeAlias(String),

    #[error("type alias '{0}' is not declared in this program")]
    UnknownTypeAlias(String),
}
