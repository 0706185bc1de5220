//! Tree-walking reference interpreter for the tree tier.
//!
//! Exists for development-time execution without a C++ toolchain, and as
//! one leg of the equivalence-testing harness (spec §8): the same program,
//! run here and compiled (GC mode and ownership mode) by `vela-codegen`,
//! must produce identical observable output.
//!
//! Unlike a graph work-list evaluator, this walks `vela_ir::ast` directly
//! and runs each call to completion synchronously; see [`eval`]'s handling
//! of `Expr::Await` for how async functions are reconciled with that.

mod eval;
pub mod error;
pub mod state;
pub mod trace;
pub mod value;

pub use error::RuntimeError;
pub use state::{CallFrame, ExecutionState, Interpreter, InterpreterConfig};
pub use trace::TraceEntry;
pub use value::{ClosureValue, Value};
