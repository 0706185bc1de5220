//! Ownership derivation checking (spec §4.3): at assignment and
//! parameter-passing sites, a source reference's ownership tag may only
//! flow into a destination of certain tags.
//!
//! | source   | permitted destinations |
//! |----------|-------------------------|
//! | `Own<T>`  | `Use<T>` (plus `Own<T>`, an ordinary move)  |
//! | `Share<T>`| `Share<T>`, `Use<T>`   |
//! | `Use<T>`  | `Use<T>`                |
//!
//! This only ever fires on sites where both ends are statically trackable:
//! a plain identifier whose ownership was established at its own
//! declaration or parameter binding. Anything flowing through a method
//! call, computed member access, or other opaque expression is out of
//! scope here, same as the null checker's direct-return-only carve-out.

use std::collections::HashMap;

use vela_ir::{ClassDecl, Decl, Diagnostic, Expr, IrType, Ownership, Param, Program, Stmt};

/// Per-function local scope: identifier name -> declared ownership, for
/// every binding whose declared type carries one.
#[derive(Default)]
struct Scope {
    bindings: HashMap<String, Ownership>,
}

impl Scope {
    fn bind(&mut self, name: &str, ty: &IrType) {
        if let Some(ownership) = ty.ownership() {
            self.bindings.insert(name.to_string(), ownership);
        }
    }

    fn ownership_of(&self, expr: &Expr) -> Option<Ownership> {
        match expr {
            Expr::Identifier(name) => self.bindings.get(name).copied(),
            _ => None,
        }
    }
}

/// `true` iff a value of ownership `src` may be written into a destination
/// declared `dst`.
fn is_permitted(src: Ownership, dst: Ownership) -> bool {
    match (src, dst) {
        (Ownership::Own, Ownership::Own) => true,
        (Ownership::Own, Ownership::Use) => true,
        (Ownership::Share, Ownership::Share) => true,
        (Ownership::Share, Ownership::Use) => true,
        (Ownership::Use, Ownership::Use) => true,
        (Ownership::Value, Ownership::Value) => true,
        _ => false,
    }
}

fn violation(src: Ownership, dst: Ownership, what: &str) -> Diagnostic {
    Diagnostic::error(
        "303",
        format!("cannot assign a {src:?}-owned value to a {dst:?}-owned {what}"),
    )
}

/// Checks every function and method body in `program` for illegal ownership
/// derivations at `VarDecl`, `this.field = ...`, and direct function-call
/// argument sites.
pub fn check_derivations(program: &Program) -> Vec<Diagnostic> {
    let functions = index_functions(program);
    let mut out = Vec::new();

    for (_, decl) in program.all_decls() {
        match decl {
            Decl::Function(f) => {
                let mut scope = Scope::default();
                for p in &f.params {
                    scope.bind(&p.name, &p.ty);
                }
                check_block_stmts(stmts_of(&f.body), &mut scope, &functions, &mut out);
            }
            Decl::Class(class) => check_class(class, &functions, &mut out),
            _ => {}
        }
    }

    out
}

fn index_functions(program: &Program) -> HashMap<String, Vec<Param>> {
    program
        .all_decls()
        .filter_map(|(_, decl)| match decl {
            Decl::Function(f) => Some((f.name.clone(), f.params.clone())),
            _ => None,
        })
        .collect()
}

fn check_class(class: &ClassDecl, functions: &HashMap<String, Vec<Param>>, out: &mut Vec<Diagnostic>) {
    let field_ownership: HashMap<String, Ownership> = class
        .fields
        .iter()
        .filter_map(|f| f.ty.ownership().map(|o| (f.name.clone(), o)))
        .collect();

    if let Some(ctor) = &class.constructor {
        let mut ctor_scope = Scope::default();
        for p in &ctor.params {
            ctor_scope.bind(&p.name, &p.ty);
        }
        check_this_field_assigns(
            &ctor.body.statements,
            &mut ctor_scope,
            &field_ownership,
            functions,
            out,
        );
    }

    for method in &class.methods {
        let mut scope = Scope::default();
        for p in &method.params {
            scope.bind(&p.name, &p.ty);
        }
        check_this_field_assigns(stmts_of(&method.body), &mut scope, &field_ownership, functions, out);
    }
}

const NO_STATEMENTS: [Stmt; 0] = [];

fn stmts_of(body: &vela_ir::FunctionBody) -> &[Stmt] {
    match body {
        vela_ir::FunctionBody::Tree(block) => &block.statements,
        vela_ir::FunctionBody::Ssa(_) => &NO_STATEMENTS,
    }
}

fn check_block_stmts(
    stmts: &[Stmt],
    scope: &mut Scope,
    functions: &HashMap<String, Vec<Param>>,
    out: &mut Vec<Diagnostic>,
) {
    for stmt in stmts {
        check_stmt(stmt, scope, functions, out);
    }
}

fn check_stmt(stmt: &Stmt, scope: &mut Scope, functions: &HashMap<String, Vec<Param>>, out: &mut Vec<Diagnostic>) {
    match stmt {
        Stmt::VarDecl {
            name, ty, init, ..
        } => {
            if let Some(init_expr) = init {
                check_expr(init_expr, scope, functions, out);
                if let (Some(dst), Some(src)) = (ty.ownership(), scope.ownership_of(init_expr)) {
                    if !is_permitted(src, dst) {
                        out.push(violation(src, dst, &format!("variable '{name}'")));
                    }
                }
            }
            scope.bind(name, ty);
        }
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Delete(e) => check_expr(e, scope, functions, out),
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                check_expr(v, scope, functions, out);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            check_expr(cond, scope, functions, out);
            check_block_stmts(&then_branch.statements, scope, functions, out);
            if let Some(else_b) = else_branch {
                check_block_stmts(&else_b.statements, scope, functions, out);
            }
        }
        Stmt::While { cond, body } => {
            check_expr(cond, scope, functions, out);
            check_block_stmts(&body.statements, scope, functions, out);
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(init) = init {
                check_stmt(init, scope, functions, out);
            }
            if let Some(cond) = cond {
                check_expr(cond, scope, functions, out);
            }
            check_block_stmts(&body.statements, scope, functions, out);
            if let Some(step) = step {
                check_stmt(step, scope, functions, out);
            }
        }
        Stmt::ForOf {
            iterable, body, ..
        } => {
            check_expr(iterable, scope, functions, out);
            check_block_stmts(&body.statements, scope, functions, out);
        }
        Stmt::ForIn { target, body, .. } => {
            check_expr(target, scope, functions, out);
            check_block_stmts(&body.statements, scope, functions, out);
        }
        Stmt::TryCatchFinally {
            try_block,
            catch_block,
            finally_block,
            ..
        } => {
            check_block_stmts(&try_block.statements, scope, functions, out);
            if let Some(c) = catch_block {
                check_block_stmts(&c.statements, scope, functions, out);
            }
            if let Some(f) = finally_block {
                check_block_stmts(&f.statements, scope, functions, out);
            }
        }
        Stmt::Block(b) | Stmt::With(b) => check_block_stmts(&b.statements, scope, functions, out),
        Stmt::FieldAssign { receiver, value, .. } => {
            check_expr(receiver, scope, functions, out);
            check_expr(value, scope, functions, out);
        }
        Stmt::IndexAssign {
            receiver,
            index,
            value,
        } => {
            check_expr(receiver, scope, functions, out);
            check_expr(index, scope, functions, out);
            check_expr(value, scope, functions, out);
        }
        Stmt::Switch { discriminant, cases } => {
            check_expr(discriminant, scope, functions, out);
            for case in cases {
                if let Some(test) = &case.test {
                    check_expr(test, scope, functions, out);
                }
                check_block_stmts(&case.body, scope, functions, out);
            }
        }
        Stmt::CompoundAssign { value, .. } => check_expr(value, scope, functions, out),
        Stmt::Break | Stmt::Continue | Stmt::NestedFunction(_) => {}
    }
}

fn check_expr(expr: &Expr, scope: &Scope, functions: &HashMap<String, Vec<Param>>, out: &mut Vec<Diagnostic>) {
    if let Expr::Call { callee, args } = expr {
        if let Expr::Identifier(name) = callee.as_ref() {
            if let Some(params) = functions.get(name) {
                for (arg, param) in args.iter().zip(params.iter()) {
                    if let (Some(dst), Some(src)) = (param.ty.ownership(), scope.ownership_of(arg)) {
                        if !is_permitted(src, dst) {
                            out.push(violation(src, dst, &format!("parameter '{}'", param.name)));
                        }
                    }
                }
            }
        }
    }
}

/// Checks `this.field = value` at the top level of a constructor/method
/// body only -- the common initialization pattern. A field assignment
/// nested inside an `if`/`while`/etc. is not walked for this particular
/// check (still walked by `check_stmt` for its own call-argument sites).
fn check_this_field_assigns(
    stmts: &[Stmt],
    scope: &mut Scope,
    field_ownership: &HashMap<String, Ownership>,
    functions: &HashMap<String, Vec<Param>>,
    out: &mut Vec<Diagnostic>,
) {
    for stmt in stmts {
        if let Stmt::FieldAssign {
            receiver,
            field,
            value,
        } = stmt
        {
            if matches!(receiver, Expr::This) {
                if let (Some(dst), Some(src)) = (field_ownership.get(field).copied(), scope.ownership_of(value)) {
                    if !is_permitted(src, dst) {
                        out.push(violation(src, dst, &format!("field '{field}'")));
                    }
                }
            }
        }
        check_stmt(stmt, scope, functions, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{
        ClassDecl, ConstructorDecl, FieldDecl, FunctionBody, FunctionDecl, Module, NamedType,
        Program, StatementBlock, VarScope,
    };

    fn share_field_class() -> Decl {
        Decl::Class(ClassDecl {
            name: "Box".into(),
            fields: vec![FieldDecl {
                name: "inner".into(),
                ty: IrType::Named(NamedType::new("Widget", Ownership::Share)),
                readonly: false,
                initializer: None,
            }],
            methods: vec![],
            constructor: Some(ConstructorDecl {
                params: vec![Param::new(
                    "w",
                    IrType::Named(NamedType::new("Widget", Ownership::Own)),
                )],
                body: StatementBlock::new(vec![Stmt::FieldAssign {
                    receiver: Expr::This,
                    field: "inner".into(),
                    value: Expr::Identifier("w".into()),
                }]),
            }),
            parent: None,
            implements: vec![],
            type_params: vec![],
            location: None,
        })
    }

    #[test]
    fn own_into_share_field_is_a_violation() {
        let mut module = Module::new("main");
        module.declarations.push(share_field_class());
        let program = Program::new(vec![module]);
        let diags = check_derivations(&program);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "303");
    }

    #[test]
    fn own_into_use_var_is_fine() {
        let mut module = Module::new("main");
        module.declarations.push(Decl::Function(FunctionDecl {
            name: "f".into(),
            params: vec![Param::new(
                "w",
                IrType::Named(NamedType::new("Widget", Ownership::Own)),
            )],
            return_type: IrType::void(),
            body: FunctionBody::Tree(StatementBlock::new(vec![Stmt::VarDecl {
                name: "borrowed".into(),
                ty: IrType::Named(NamedType::new("Widget", Ownership::Use)),
                init: Some(Expr::Identifier("w".into())),
                is_declaration: true,
                scope: VarScope::Block,
                location: None,
            }])),
            is_async: false,
            location: None,
        }));
        let program = Program::new(vec![module]);
        assert!(check_derivations(&program).is_empty());
    }
}
