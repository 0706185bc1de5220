//! Null-safety checking (spec §4.4): in ownership mode, a `Use<T>` value is
//! a non-owning borrow and must never escape the owner it was borrowed
//! from. Three escape points are checked:
//!
//!   - 401: a class field or interface property declared `Use<T>`
//!   - 402: a function/method return type containing `Use<T>`
//!   - 403: a direct `return v`, where `v` is a parameter or local bound to
//!     a `Use<T>` type
//!
//! Only the direct case is checked for 403 -- `return obj.field` or
//! `return f()` is not traced back to a use-tagged source. This is a
//! deliberate bound on scope, not an oversight: tracking ownership through
//! member access and call results would need a full interprocedural escape
//! analysis this stage does not attempt.
//!
//! Skipped entirely in GC mode: reference counting makes escaping borrows
//! safe (at worst a cycle, already reported by [`crate::graph`]).

use vela_ir::{
    ClassDecl, Decl, Diagnostic, Expr, FunctionDecl, InterfaceDecl, IrType, MemoryMode, Ownership,
    Program, Stmt,
};

fn is_use(ty: &IrType) -> bool {
    ty.ownership() == Some(Ownership::Use)
}

pub fn check_null_safety(program: &Program, mode: MemoryMode) -> Vec<Diagnostic> {
    if mode.is_gc() {
        return Vec::new();
    }

    let mut out = Vec::new();
    for (_, decl) in program.all_decls() {
        match decl {
            Decl::Class(class) => check_class(class, &mut out),
            Decl::Interface(iface) => check_interface(iface, &mut out),
            Decl::Function(f) => check_function(f, &mut out),
            Decl::Const(_) | Decl::TypeAlias(_) => {}
        }
    }
    out
}

fn check_class(class: &ClassDecl, out: &mut Vec<Diagnostic>) {
    for field in &class.fields {
        if is_use(&field.ty) {
            out.push(Diagnostic::error(
                "401",
                format!(
                    "field '{}' of class '{}' is declared 'use', which may not escape its owner",
                    field.name, class.name
                ),
            ));
        }
    }
    for method in &class.methods {
        check_return_type(&method.return_type, "method", &method.name, out);
        check_direct_returns(&method.body, &method.params, out);
    }
}

fn check_interface(iface: &InterfaceDecl, out: &mut Vec<Diagnostic>) {
    for prop in &iface.properties {
        if is_use(&prop.ty) {
            out.push(Diagnostic::error(
                "401",
                format!(
                    "property '{}' of interface '{}' is declared 'use', which may not escape its owner",
                    prop.name, iface.name
                ),
            ));
        }
    }
    for sig in &iface.methods {
        check_return_type(&sig.return_type, "method", &sig.name, out);
    }
}

fn check_function(f: &FunctionDecl, out: &mut Vec<Diagnostic>) {
    check_return_type(&f.return_type, "function", &f.name, out);
    check_direct_returns(&f.body, &f.params, out);
}

fn check_return_type(ty: &IrType, kind: &str, name: &str, out: &mut Vec<Diagnostic>) {
    if contains_use(ty) {
        out.push(Diagnostic::error(
            "402",
            format!("{kind} '{name}' returns a type containing 'use', which may not escape its owner"),
        ));
    }
}

fn contains_use(ty: &IrType) -> bool {
    match ty {
        IrType::Named(_) | IrType::Array(_) | IrType::Map(_) => is_use(ty),
        IrType::Nullable(inner) | IrType::Promise(inner) => contains_use(inner),
        IrType::Union(members) => members.iter().any(contains_use),
        _ => false,
    }
}

fn check_direct_returns(body: &vela_ir::FunctionBody, params: &[vela_ir::Param], out: &mut Vec<Diagnostic>) {
    let vela_ir::FunctionBody::Tree(block) = body else {
        return;
    };
    let use_bound: Vec<&str> = params
        .iter()
        .filter(|p| is_use(&p.ty))
        .map(|p| p.name.as_str())
        .collect();
    if use_bound.is_empty() {
        return;
    }
    walk_for_returns(&block.statements, &use_bound, out);
}

fn walk_for_returns(stmts: &[Stmt], use_bound: &[&str], out: &mut Vec<Diagnostic>) {
    for stmt in stmts {
        match stmt {
            Stmt::Return {
                value: Some(Expr::Identifier(name)),
                ..
            } if use_bound.contains(&name.as_str()) => {
                out.push(Diagnostic::error(
                    "403",
                    format!("returning '{name}' directly would let a 'use' borrow escape its owner"),
                ));
            }
            Stmt::If {
                then_branch,
                else_branch,
                ..
            } => {
                walk_for_returns(&then_branch.statements, use_bound, out);
                if let Some(else_b) = else_branch {
                    walk_for_returns(&else_b.statements, use_bound, out);
                }
            }
            Stmt::While { body, .. } | Stmt::ForOf { body, .. } | Stmt::ForIn { body, .. } => {
                walk_for_returns(&body.statements, use_bound, out);
            }
            Stmt::For { body, .. } => walk_for_returns(&body.statements, use_bound, out),
            Stmt::Block(b) | Stmt::With(b) => walk_for_returns(&b.statements, use_bound, out),
            Stmt::TryCatchFinally {
                try_block,
                catch_block,
                finally_block,
                ..
            } => {
                walk_for_returns(&try_block.statements, use_bound, out);
                if let Some(c) = catch_block {
                    walk_for_returns(&c.statements, use_bound, out);
                }
                if let Some(f) = finally_block {
                    walk_for_returns(&f.statements, use_bound, out);
                }
            }
            Stmt::Switch { cases, .. } => {
                for case in cases {
                    walk_for_returns(&case.body, use_bound, out);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{
        ConstructorDecl, FieldDecl, FunctionBody, Module, NamedType, Param, StatementBlock,
    };

    #[test]
    fn use_field_is_401() {
        let mut module = Module::new("main");
        module.declarations.push(Decl::Class(ClassDecl {
            name: "Window".into(),
            fields: vec![FieldDecl {
                name: "parent".into(),
                ty: IrType::Named(NamedType::new("Window", Ownership::Use)),
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
        let program = Program::new(vec![module]);
        let diags = check_null_safety(&program, MemoryMode::Ownership);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "401");
    }

    #[test]
    fn use_return_type_is_402() {
        let mut module = Module::new("main");
        module.declarations.push(Decl::Function(FunctionDecl {
            name: "peek".into(),
            params: vec![],
            return_type: IrType::Named(NamedType::new("Node", Ownership::Use)),
            body: FunctionBody::Tree(StatementBlock::empty()),
            is_async: false,
            location: None,
        }));
        let program = Program::new(vec![module]);
        let diags = check_null_safety(&program, MemoryMode::Ownership);
        assert!(diags.iter().any(|d| d.code == "402"));
    }

    #[test]
    fn direct_return_of_use_param_is_403() {
        let mut module = Module::new("main");
        module.declarations.push(Decl::Function(FunctionDecl {
            name: "identity".into(),
            params: vec![Param::new(
                "n",
                IrType::Named(NamedType::new("Node", Ownership::Use)),
            )],
            return_type: IrType::Named(NamedType::new("Node", Ownership::Use)),
            body: FunctionBody::Tree(StatementBlock::new(vec![Stmt::Return {
                value: Some(Expr::Identifier("n".into())),
                location: None,
            }])),
            is_async: false,
            location: None,
        }));
        let program = Program::new(vec![module]);
        let diags = check_null_safety(&program, MemoryMode::Ownership);
        assert!(diags.iter().any(|d| d.code == "403"));
    }

    #[test]
    fn gc_mode_skips_all_checks() {
        let mut module = Module::new("main");
        module.declarations.push(Decl::Function(FunctionDecl {
            name: "peek".into(),
            params: vec![],
            return_type: IrType::Named(NamedType::new("Node", Ownership::Use)),
            body: FunctionBody::Tree(StatementBlock::empty()),
            is_async: false,
            location: None,
        }));
        let program = Program::new(vec![module]);
        assert!(check_null_safety(&program, MemoryMode::Gc).is_empty());
    }
}
