//! Function hoisting (spec §4.6): a nested function that is both recursive
//! and free-variable-free is promoted to a module-level declaration,
//! inserted immediately before the function it was nested in. This runs
//! after folding (spec fixes the stage order as optimize-then-hoist) but
//! still on the tree tier, since `Stmt::NestedFunction` is what this pass
//! looks for and it has no SSA-tier representation.
//!
//! Recursive nested functions that capture a free variable are left in
//! place -- hoisting them would need to thread the captured values through
//! as explicit parameters at every call site, which is the
//! closure-parameter-passing extension the source spec defers (see
//! `SPEC_FULL.md` §9).

use std::collections::HashSet;

use vela_ir::{Decl, Expr, FunctionDecl, Module, Param, Stmt, StatementBlock};

/// Hoists every eligible nested function reachable from `module`'s
/// declarations, in place. Returns the number of functions hoisted.
pub fn hoist_module(module: &mut Module) -> usize {
    let mut hoisted_total = 0;
    let mut i = 0;
    while i < module.declarations.len() {
        if let Decl::Function(f) = &mut module.declarations[i] {
            let vela_ir::FunctionBody::Tree(block) = &mut f.body else {
                i += 1;
                continue;
            };
            let mut enclosing_bound: HashSet<String> =
                f.params.iter().map(|p| p.name.clone()).collect();
            let mut extracted = Vec::new();
            hoist_block(block, &mut enclosing_bound, &mut extracted);
            let count = extracted.len();
            for (offset, func) in extracted.into_iter().enumerate() {
                module
                    .declarations
                    .insert(i + offset, Decl::Function(func));
            }
            hoisted_total += count;
            i += count + 1;
        } else {
            i += 1;
        }
    }
    hoisted_total
}

/// Scans the direct statements of `block` for `NestedFunction`s to hoist.
/// Only top-level statement position is considered -- a function declared
/// inside an `if`/`while`/etc. body of the enclosing function is left
/// alone, matching the source dialect's function-declaration placement.
fn hoist_block(block: &mut StatementBlock, enclosing_bound: &mut HashSet<String>, extracted: &mut Vec<FunctionDecl>) {
    let mut i = 0;
    while i < block.statements.len() {
        match &block.statements[i] {
            Stmt::VarDecl { name, .. } => {
                enclosing_bound.insert(name.clone());
            }
            Stmt::NestedFunction(_) => {}
            _ => {}
        }

        if let Stmt::NestedFunction(nested) = &block.statements[i] {
            if should_hoist(nested, enclosing_bound) {
                let Stmt::NestedFunction(nested) = block.statements.remove(i) else {
                    unreachable!()
                };
                extracted.push(nested);
                continue;
            }
        }
        i += 1;
    }
}

/// A nested function hoists iff it calls its own name from within its body
/// (including through nested control flow and further-nested function
/// bodies, but not chasing across a redefinition of that name) and
/// captures no free variable from any enclosing scope.
fn should_hoist(nested: &FunctionDecl, enclosing_bound: &HashSet<String>) -> bool {
    is_recursive(nested) && !has_free_variable(nested, enclosing_bound)
}

fn is_recursive(nested: &FunctionDecl) -> bool {
    let vela_ir::FunctionBody::Tree(block) = &nested.body else {
        return false;
    };
    calls_name_in_block(block, &nested.name)
}

fn calls_name_in_block(block: &StatementBlock, name: &str) -> bool {
    block.statements.iter().any(|s| calls_name_in_stmt(s, name))
}

fn calls_name_in_stmt(stmt: &Stmt, name: &str) -> bool {
    match stmt {
        Stmt::VarDecl { init: Some(e), .. } => calls_name_in_expr(e, name),
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Delete(e) => calls_name_in_expr(e, name),
        Stmt::Return { value: Some(e), .. } => calls_name_in_expr(e, name),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            calls_name_in_expr(cond, name)
                || calls_name_in_block(then_branch, name)
                || else_branch.as_ref().is_some_and(|b| calls_name_in_block(b, name))
        }
        Stmt::While { cond, body } => calls_name_in_expr(cond, name) || calls_name_in_block(body, name),
        Stmt::For { cond, body, .. } => {
            cond.as_ref().is_some_and(|c| calls_name_in_expr(c, name)) || calls_name_in_block(body, name)
        }
        Stmt::ForOf { iterable, body, .. } => {
            calls_name_in_expr(iterable, name) || calls_name_in_block(body, name)
        }
        Stmt::ForIn { target, body, .. } => calls_name_in_expr(target, name) || calls_name_in_block(body, name),
        Stmt::TryCatchFinally {
            try_block,
            catch_block,
            finally_block,
            ..
        } => {
            calls_name_in_block(try_block, name)
                || catch_block.as_ref().is_some_and(|b| calls_name_in_block(b, name))
                || finally_block.as_ref().is_some_and(|b| calls_name_in_block(b, name))
        }
        Stmt::Block(b) | Stmt::With(b) => calls_name_in_block(b, name),
        Stmt::FieldAssign { receiver, value, .. } => {
            calls_name_in_expr(receiver, name) || calls_name_in_expr(value, name)
        }
        Stmt::IndexAssign {
            receiver,
            index,
            value,
        } => calls_name_in_expr(receiver, name) || calls_name_in_expr(index, name) || calls_name_in_expr(value, name),
        Stmt::Switch { discriminant, cases } => {
            calls_name_in_expr(discriminant, name)
                || cases.iter().any(|c| c.body.iter().any(|s| calls_name_in_stmt(s, name)))
        }
        Stmt::CompoundAssign { value, .. } => calls_name_in_expr(value, name),
        Stmt::NestedFunction(nested) if nested.name != name => calls_in_nested_unless_shadowed(nested, name),
        _ => false,
    }
}

fn calls_in_nested_unless_shadowed(nested: &FunctionDecl, name: &str) -> bool {
    if nested.params.iter().any(|p| p.name == name) {
        return false;
    }
    is_recursive_for(nested, name)
}

fn is_recursive_for(nested: &FunctionDecl, name: &str) -> bool {
    let vela_ir::FunctionBody::Tree(block) = &nested.body else {
        return false;
    };
    calls_name_in_block(block, name)
}

fn calls_name_in_expr(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::Identifier(n) => n == name,
        Expr::Binary { lhs, rhs, .. } => calls_name_in_expr(lhs, name) || calls_name_in_expr(rhs, name),
        Expr::Unary { operand, .. } => calls_name_in_expr(operand, name),
        Expr::IncDec { target, .. } => calls_name_in_expr(target, name),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => calls_name_in_expr(cond, name) || calls_name_in_expr(then_expr, name) || calls_name_in_expr(else_expr, name),
        Expr::Call { callee, args } => {
            calls_name_in_expr(callee, name) || args.iter().any(|a| calls_name_in_expr(a, name))
        }
        Expr::MethodCall { receiver, args, .. } => {
            calls_name_in_expr(receiver, name) || args.iter().any(|a| calls_name_in_expr(a, name))
        }
        Expr::Member { receiver, .. } => calls_name_in_expr(receiver, name),
        Expr::Index { receiver, index } => calls_name_in_expr(receiver, name) || calls_name_in_expr(index, name),
        Expr::New { args, .. } => args.iter().any(|a| calls_name_in_expr(a, name)),
        Expr::ArrayLiteral(items) => items.iter().any(|i| calls_name_in_expr(i, name)),
        Expr::ObjectLiteral { fields, .. } => fields.iter().any(|(_, v)| calls_name_in_expr(v, name)),
        Expr::Lambda { body, .. } => calls_name_in_block(body, name),
        Expr::Await(e) | Expr::Move(e) | Expr::Borrow(e) | Expr::DynamicEval(e) | Expr::DynamicImport(e) => {
            calls_name_in_expr(e, name)
        }
        Expr::TemplateConcat { segments, .. } => segments.iter().any(|(e, _)| calls_name_in_expr(e, name)),
        Expr::Comma(items) => items.iter().any(|i| calls_name_in_expr(i, name)),
        Expr::Literal(_) | Expr::This | Expr::ArgumentsObject => false,
    }
}

/// `true` iff `nested`'s body references a name bound by the enclosing
/// function (a parameter or a `VarDecl` local) that `nested` itself does
/// not shadow with its own parameter or local declaration.
fn has_free_variable(nested: &FunctionDecl, enclosing_bound: &HashSet<String>) -> bool {
    let vela_ir::FunctionBody::Tree(block) = &nested.body else {
        return false;
    };
    let mut shadowed: HashSet<String> = nested.params.iter().map(|p| p.name.clone()).collect();
    block_references_outer_name(block, enclosing_bound, &mut shadowed)
}

fn block_references_outer_name(
    block: &StatementBlock,
    enclosing_bound: &HashSet<String>,
    shadowed: &mut HashSet<String>,
) -> bool {
    stmts_reference_outer_name(&block.statements, enclosing_bound, shadowed)
}

fn stmts_reference_outer_name(
    stmts: &[Stmt],
    enclosing_bound: &HashSet<String>,
    shadowed: &mut HashSet<String>,
) -> bool {
    for stmt in stmts {
        if stmt_references_outer_name(stmt, enclosing_bound, shadowed) {
            return true;
        }
        if let Stmt::VarDecl { name, .. } = stmt {
            shadowed.insert(name.clone());
        }
    }
    false
}

fn stmt_references_outer_name(stmt: &Stmt, enclosing_bound: &HashSet<String>, shadowed: &HashSet<String>) -> bool {
    let check_expr = |e: &Expr| expr_references_outer_name(e, enclosing_bound, shadowed);
    match stmt {
        Stmt::VarDecl { init: Some(e), .. } => check_expr(e),
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Delete(e) => check_expr(e),
        Stmt::Return { value: Some(e), .. } => check_expr(e),
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let mut inner_shadow = shadowed.clone();
            check_expr(cond)
                || block_references_outer_name(then_branch, enclosing_bound, &mut inner_shadow)
                || else_branch.as_ref().is_some_and(|b| {
                    let mut s = shadowed.clone();
                    block_references_outer_name(b, enclosing_bound, &mut s)
                })
        }
        Stmt::While { cond, body } => {
            let mut s = shadowed.clone();
            check_expr(cond) || block_references_outer_name(body, enclosing_bound, &mut s)
        }
        Stmt::For { cond, body, .. } => {
            let mut s = shadowed.clone();
            cond.as_ref().is_some_and(|c| check_expr(c))
                || block_references_outer_name(body, enclosing_bound, &mut s)
        }
        Stmt::ForOf { binding, iterable, body, .. } => {
            let mut s = shadowed.clone();
            s.insert(binding.clone());
            check_expr(iterable) || block_references_outer_name(body, enclosing_bound, &mut s)
        }
        Stmt::ForIn { binding, target, body } => {
            let mut s = shadowed.clone();
            s.insert(binding.clone());
            check_expr(target) || block_references_outer_name(body, enclosing_bound, &mut s)
        }
        Stmt::TryCatchFinally {
            try_block,
            catch_block,
            finally_block,
            ..
        } => {
            let mut s1 = shadowed.clone();
            let mut s2 = shadowed.clone();
            let mut s3 = shadowed.clone();
            block_references_outer_name(try_block, enclosing_bound, &mut s1)
                || catch_block.as_ref().is_some_and(|b| block_references_outer_name(b, enclosing_bound, &mut s2))
                || finally_block.as_ref().is_some_and(|b| block_references_outer_name(b, enclosing_bound, &mut s3))
        }
        Stmt::Block(b) | Stmt::With(b) => {
            let mut s = shadowed.clone();
            block_references_outer_name(b, enclosing_bound, &mut s)
        }
        Stmt::FieldAssign { receiver, value, .. } => check_expr(receiver) || check_expr(value),
        Stmt::IndexAssign { receiver, index, value } => {
            check_expr(receiver) || check_expr(index) || check_expr(value)
        }
        Stmt::Switch { discriminant, cases } => {
            check_expr(discriminant)
                || cases.iter().any(|c| {
                    let mut s = shadowed.clone();
                    c.test.as_ref().is_some_and(|t| check_expr(t)) || stmts_reference_outer_name(&c.body, enclosing_bound, &mut s)
                })
        }
        Stmt::CompoundAssign { name, value, .. } => {
            (enclosing_bound.contains(name) && !shadowed.contains(name)) || check_expr(value)
        }
        Stmt::NestedFunction(inner) => {
            let mut s = shadowed.clone();
            s.extend(inner.params.iter().map(|p| p.name.clone()));
            if let vela_ir::FunctionBody::Tree(b) = &inner.body {
                block_references_outer_name(b, enclosing_bound, &mut s)
            } else {
                false
            }
        }
        _ => false,
    }
}

fn expr_references_outer_name(expr: &Expr, enclosing_bound: &HashSet<String>, shadowed: &HashSet<String>) -> bool {
    match expr {
        Expr::Identifier(name) => enclosing_bound.contains(name) && !shadowed.contains(name),
        Expr::Binary { lhs, rhs, .. } => {
            expr_references_outer_name(lhs, enclosing_bound, shadowed)
                || expr_references_outer_name(rhs, enclosing_bound, shadowed)
        }
        Expr::Unary { operand, .. } => expr_references_outer_name(operand, enclosing_bound, shadowed),
        Expr::IncDec { target, .. } => expr_references_outer_name(target, enclosing_bound, shadowed),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            expr_references_outer_name(cond, enclosing_bound, shadowed)
                || expr_references_outer_name(then_expr, enclosing_bound, shadowed)
                || expr_references_outer_name(else_expr, enclosing_bound, shadowed)
        }
        Expr::Call { callee, args } => {
            expr_references_outer_name(callee, enclosing_bound, shadowed)
                || args.iter().any(|a| expr_references_outer_name(a, enclosing_bound, shadowed))
        }
        Expr::MethodCall { receiver, args, .. } => {
            expr_references_outer_name(receiver, enclosing_bound, shadowed)
                || args.iter().any(|a| expr_references_outer_name(a, enclosing_bound, shadowed))
        }
        Expr::Member { receiver, .. } => expr_references_outer_name(receiver, enclosing_bound, shadowed),
        Expr::Index { receiver, index } => {
            expr_references_outer_name(receiver, enclosing_bound, shadowed)
                || expr_references_outer_name(index, enclosing_bound, shadowed)
        }
        Expr::New { args, .. } => args.iter().any(|a| expr_references_outer_name(a, enclosing_bound, shadowed)),
        Expr::ArrayLiteral(items) => items.iter().any(|i| expr_references_outer_name(i, enclosing_bound, shadowed)),
        Expr::ObjectLiteral { fields, .. } => {
            fields.iter().any(|(_, v)| expr_references_outer_name(v, enclosing_bound, shadowed))
        }
        Expr::Lambda { params, body, .. } => {
            let mut s = shadowed.clone();
            s.extend(params.iter().map(|p: &Param| p.name.clone()));
            block_references_outer_name(body, enclosing_bound, &mut s)
        }
        Expr::Await(e) | Expr::Move(e) | Expr::Borrow(e) | Expr::DynamicEval(e) | Expr::DynamicImport(e) => {
            expr_references_outer_name(e, enclosing_bound, shadowed)
        }
        Expr::TemplateConcat { segments, .. } => {
            segments.iter().any(|(e, _)| expr_references_outer_name(e, enclosing_bound, shadowed))
        }
        Expr::Comma(items) => items.iter().any(|i| expr_references_outer_name(i, enclosing_bound, shadowed)),
        Expr::Literal(_) | Expr::This | Expr::ArgumentsObject => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{ConstValue, FunctionBody, IrType, Param};

    fn recursive_no_capture() -> FunctionDecl {
        FunctionDecl {
            name: "fact".into(),
            params: vec![Param::new("n", IrType::Primitive(vela_ir::Primitive::Integer))],
            return_type: IrType::Primitive(vela_ir::Primitive::Integer),
            body: FunctionBody::Tree(StatementBlock::new(vec![Stmt::Return {
                value: Some(Expr::Call {
                    callee: Box::new(Expr::Identifier("fact".into())),
                    args: vec![Expr::Identifier("n".into())],
                }),
                location: None,
            }])),
            is_async: false,
            location: None,
        }
    }

    #[test]
    fn recursive_no_capture_is_hoisted() {
        let mut module = Module::new("main");
        module.declarations.push(Decl::Function(FunctionDecl {
            name: "outer".into(),
            params: vec![],
            return_type: IrType::void(),
            body: FunctionBody::Tree(StatementBlock::new(vec![Stmt::NestedFunction(
                recursive_no_capture(),
            )])),
            is_async: false,
            location: None,
        }));
        let hoisted = hoist_module(&mut module);
        assert_eq!(hoisted, 1);
        assert!(matches!(module.declarations[0], Decl::Function(ref f) if f.name == "fact"));
    }

    #[test]
    fn non_recursive_nested_function_stays_in_place() {
        let mut module = Module::new("main");
        let non_recursive = FunctionDecl {
            name: "helper".into(),
            params: vec![],
            return_type: IrType::void(),
            body: FunctionBody::Tree(StatementBlock::new(vec![Stmt::Return {
                value: Some(Expr::Literal(ConstValue::Number(1.0))),
                location: None,
            }])),
            is_async: false,
            location: None,
        };
        module.declarations.push(Decl::Function(FunctionDecl {
            name: "outer".into(),
            params: vec![],
            return_type: IrType::void(),
            body: FunctionBody::Tree(StatementBlock::new(vec![Stmt::NestedFunction(non_recursive)])),
            is_async: false,
            location: None,
        }));
        assert_eq!(hoist_module(&mut module), 0);
    }

    #[test]
    fn recursive_with_capture_stays_in_place() {
        let mut module = Module::new("main");
        let capturing = FunctionDecl {
            name: "acc".into(),
            params: vec![Param::new("n", IrType::Primitive(vela_ir::Primitive::Integer))],
            return_type: IrType::Primitive(vela_ir::Primitive::Integer),
            body: FunctionBody::Tree(StatementBlock::new(vec![
                Stmt::Expr(Expr::Identifier("total".into())),
                Stmt::Return {
                    value: Some(Expr::Call {
                        callee: Box::new(Expr::Identifier("acc".into())),
                        args: vec![Expr::Identifier("n".into())],
                    }),
                    location: None,
                },
            ])),
            is_async: false,
            location: None,
        };
        module.declarations.push(Decl::Function(FunctionDecl {
            name: "outer".into(),
            params: vec![],
            return_type: IrType::void(),
            body: FunctionBody::Tree(StatementBlock::new(vec![
                Stmt::VarDecl {
                    name: "total".into(),
                    ty: IrType::Primitive(vela_ir::Primitive::Integer),
                    init: Some(Expr::Literal(ConstValue::Integer(0))),
                    is_declaration: true,
                    scope: vela_ir::VarScope::Block,
                    location: None,
                },
                Stmt::NestedFunction(capturing),
            ])),
            is_async: false,
            location: None,
        }));
        assert_eq!(hoist_module(&mut module), 0);
    }
}
