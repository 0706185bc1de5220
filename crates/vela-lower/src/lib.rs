//! Lowering (spec §4.2): turns a validated tree-tier `Program` into the
//! shape later stages expect -- type aliases substituted away, compound
//! assignments and statement-position `++`/`--` desugared, every object
//! literal's anonymous record type interned, and (on request) SSA bodies
//! built from tree-tier function bodies.
//!
//! The passes run in a fixed order: alias resolution first (so `records`
//! and `desugar` never have to chase a `NamedType` through an alias
//! themselves), then desugaring (so record synthesis sees plain
//! reassignments, not `CompoundAssign` sugar), then record synthesis.
//! SSA conversion is a separate, opt-in step (spec §4.2 "SSA conversion
//! (when requested)") invoked per function body by whichever stage needs
//! it, not part of `lower()` itself.

mod aliases;
mod desugar;
mod error;
mod records;
mod ssa;

use tracing::debug;
use vela_ir::{FunctionBody, Program, TypeRegistry};

pub use aliases::AliasTable;
pub use error::LowerError;
pub use ssa::{anonymous_record_class_name, tree_to_ssa};

/// Runs alias resolution, desugaring, and anonymous-record synthesis over
/// `program` in place, returning the registry of interned record types.
pub fn lower(program: &mut Program) -> Result<TypeRegistry, LowerError> {
    let table = AliasTable::build(program);
    debug!(count = program.modules.len(), "resolving type aliases");
    for module in &mut program.modules {
        aliases::resolve_module_aliases(module, &table)?;
    }

    debug!("desugaring compound assignments and statement-position inc/dec");
    desugar::desugar_program(program);

    let mut registry = TypeRegistry::new();
    debug!("synthesizing anonymous record types");
    records::synthesize_records(program, &mut registry);

    Ok(registry)
}

/// Converts every `FunctionBody::Tree` reachable from `program` into
/// `FunctionBody::Ssa`, in place. Call after [`lower`] once a later stage
/// (the optimizer, the backend) needs basic-block form.
pub fn lower_all_to_ssa(program: &mut Program) {
    for module in &mut program.modules {
        for decl in &mut module.declarations {
            convert_decl_to_ssa(decl);
        }
    }
}

fn convert_decl_to_ssa(decl: &mut vela_ir::Decl) {
    match decl {
        vela_ir::Decl::Function(f) => convert_body(&mut f.body),
        vela_ir::Decl::Class(c) => {
            for method in &mut c.methods {
                convert_body(&mut method.body);
            }
        }
        vela_ir::Decl::Const(_) | vela_ir::Decl::Interface(_) | vela_ir::Decl::TypeAlias(_) => {}
    }
}

fn convert_body(body: &mut FunctionBody) {
    if let FunctionBody::Tree(tree) = body {
        let ssa_body = tree_to_ssa(tree);
        *body = FunctionBody::Ssa(ssa_body);
    }
}
