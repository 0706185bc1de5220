//! Optimizer (spec §4.5) and function hoister (spec §4.6).
//!
//! Both passes run on the tree tier, in the fixed stage order the pipeline
//! prescribes: constant folding/branch simplification/ternary folding run
//! to a fixed point first, then the hoister runs once over the folded
//! tree. SSA conversion -- needed by the backend -- happens afterward,
//! driven by `vela-cli`, since the hoister depends on `Stmt::NestedFunction`
//! surviving, which SSA conversion erases.

mod error;
mod folding;
mod hoist;

use tracing::debug;
use vela_ir::{ClassDecl, ConstDecl, Decl, FunctionBody, Program};

pub use error::OptError;
pub use hoist::hoist_module;

/// A fixed-point pass is given this many iterations before the program is
/// accepted unoptimized (spec §4.5 "Termination").
const MAX_FOLD_ITERATIONS: usize = 10;

/// Runs constant folding to a fixed point, then hoists eligible nested
/// functions, over every module in `program`, in place.
pub fn optimize(program: &mut Program) {
    let mut iterations = 0;
    loop {
        let changed = fold_program(program);
        iterations += 1;
        if !changed {
            debug!(iterations, "constant folding reached a fixed point");
            break;
        }
        if iterations >= MAX_FOLD_ITERATIONS {
            debug!(iterations, "folding iteration cap reached; accepting program unoptimized");
            break;
        }
    }

    let mut hoisted_total = 0;
    for module in &mut program.modules {
        hoisted_total += hoist_module(module);
    }
    debug!(count = hoisted_total, "nested functions hoisted to module scope");
}

fn fold_program(program: &mut Program) -> bool {
    let mut changed = false;
    for module in &mut program.modules {
        for decl in &mut module.declarations {
            match decl {
                Decl::Function(f) => {
                    if let FunctionBody::Tree(body) = &mut f.body {
                        changed |= folding::fold_block(body);
                    }
                }
                Decl::Class(class) => changed |= fold_class(class),
                Decl::Const(c) => changed |= fold_const(c),
                Decl::Interface(_) | Decl::TypeAlias(_) => {}
            }
        }
    }
    changed
}

fn fold_const(c: &mut ConstDecl) -> bool {
    folding::fold_expr(&mut c.init)
}

fn fold_class(class: &mut ClassDecl) -> bool {
    let mut changed = false;
    if let Some(ctor) = &mut class.constructor {
        changed |= folding::fold_block(&mut ctor.body);
    }
    for method in &mut class.methods {
        if let FunctionBody::Tree(body) = &mut method.body {
            changed |= folding::fold_block(body);
        }
    }
    for field in &mut class.fields {
        if let Some(init) = &mut field.initializer {
            changed |= folding::fold_expr(init);
        }
    }
    changed
}
