//! Ownership analysis (spec §4.3) and null-safety checking (spec §4.4).
//!
//! Both passes read a validated, lowered `Program` and accumulate
//! diagnostics; neither mutates the IR. [`graph`] builds the ownership
//! class graph and reports reference cycles (301); [`derivation`] checks
//! ownership-tag flow at assignment and call sites (303); [`nullcheck`]
//! checks for `use<T>` escaping its owner (401-403), and is skipped
//! entirely in GC mode.

mod derivation;
mod error;
mod graph;
mod nullcheck;

use tracing::debug;
use vela_ir::{Diagnostic, MemoryMode, Program};

pub use error::AnalyzeError;
pub use graph::{build_class_graph, find_cycles, ClassGraph};

/// Runs the ownership analyzer and (when applicable) the null checker over
/// `program`, returning every diagnostic from both passes in a single
/// accumulated list. Callers should still sort/filter by severity
/// themselves (spec §7: a stage aborts the pipeline on any error, but
/// warnings -- e.g. cycles under GC mode -- never do).
pub fn analyze(program: &Program, mode: MemoryMode) -> Vec<Diagnostic> {
    debug!(?mode, "building ownership class graph");
    let graph = build_class_graph(program);
    let mut diagnostics = find_cycles(&graph, mode);
    debug!(count = diagnostics.len(), "cycle diagnostics emitted");

    debug!("checking ownership derivation at assignment/call sites");
    diagnostics.extend(derivation::check_derivations(program));

    if mode.is_gc() {
        debug!("gc mode: skipping null checker");
    } else {
        debug!("checking null safety (use<T> escape)");
        diagnostics.extend(nullcheck::check_null_safety(program, mode));
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{
        ClassDecl, ConstructorDecl, Decl, FieldDecl, IrType, Module, NamedType, Ownership,
        StatementBlock,
    };

    fn cyclic_program() -> Program {
        let mut module = Module::new("main");
        module.declarations.push(Decl::Class(ClassDecl {
            name: "A".into(),
            fields: vec![FieldDecl {
                name: "b".into(),
                ty: IrType::Named(NamedType::new("B", Ownership::Share)),
                readonly: false,
                initializer: None,
            }],
            methods: vec![],
            constructor: Some(ConstructorDecl {
                params: vec![],
                body: StatementBlock::empty(),
            }),
            parent: None,
            implements: vec![],
            type_params: vec![],
            location: None,
        }));
        module.declarations.push(Decl::Class(ClassDecl {
            name: "B".into(),
            fields: vec![FieldDecl {
                name: "a".into(),
                ty: IrType::Named(NamedType::new("A", Ownership::Share)),
                readonly: false,
                initializer: None,
            }],
            methods: vec![],
            constructor: Some(ConstructorDecl {
                params: vec![],
                body: StatementBlock::empty(),
            }),
            parent: None,
            implements: vec![],
            type_params: vec![],
            location: None,
        }));
        Program::new(vec![module])
    }

    #[test]
    fn analyze_reports_cycle_as_error_in_ownership_mode() {
        let program = cyclic_program();
        let diags = analyze(&program, MemoryMode::Ownership);
        assert!(diags.iter().any(|d| d.code == "301" && d.severity == vela_ir::Severity::Error));
    }

    #[test]
    fn analyze_reports_cycle_as_warning_in_gc_mode() {
        let program = cyclic_program();
        let diags = analyze(&program, MemoryMode::Gc);
        assert!(diags.iter().any(|d| d.code == "301" && d.severity == vela_ir::Severity::Warning));
    }
}
