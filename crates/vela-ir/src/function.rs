//! Shared declaration fragments: parameters and closure captures.
//!
//! Functions, class methods, and lambdas all share the same
//! name-plus-type parameter shape and (for lambdas) the same capture-list
//! shape, so these live in one place rather than being duplicated across
//! `ast::Decl::Function`, `ast::ClassMethod`, and `ast::Expr::Lambda`.

use serde::{Deserialize, Serialize};

use crate::types::IrType;

/// A named, typed parameter (spec §3.4: "each: name + type").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: IrType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: IrType) -> Self {
        Param {
            name: name.into(),
            ty,
        }
    }
}

/// How a lambda captures a free variable from an enclosing scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureMode {
    ByValue,
    ByRef,
    ByMutRef,
}

/// A single captured variable, recorded by the lowerer on a `lambda`
/// expression (spec §4.2: "the lowerer records only the syntactic free
/// variables"; capture *mode* inference beyond plain by-value is a hoister
/// concern when it decides whether a nested function can be promoted).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub name: String,
    pub captured_type: IrType,
    pub mode: CaptureMode,
}
