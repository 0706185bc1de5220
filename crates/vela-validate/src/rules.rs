//! Per-construct rule checks, one function per family of diagnostic codes.
//! Table mirrors spec §4.1 exactly; see each function's doc comment for the
//! code(s) it can emit.

use vela_ir::{BinaryOp, Diagnostic, Expr, IrType, Stmt, StatementBlock, UnaryOp, VarScope};

const PRIMITIVE_WRAPPER_NAMES: &[&str] = &["Number", "String", "Boolean"];

/// Code 109: the dynamic catch-all type is rejected wherever it appears
/// explicitly -- class fields, function/method parameters and return
/// types, and const/var declared types (spec §4.1's table scopes this to
/// the type itself, not to any one declaration kind).
pub(crate) fn check_dynamic_type(ty: &IrType, out: &mut Vec<Diagnostic>, context: &str) {
    if matches!(ty, IrType::Dynamic) {
        out.push(Diagnostic::error(
            "109",
            format!("{context} uses the dynamic catch-all type"),
        ));
    }
}

pub fn check_block(block: &StatementBlock, out: &mut Vec<Diagnostic>, in_method: bool) {
    check_statements(&block.statements, out, in_method);
}

fn check_statements(stmts: &[Stmt], out: &mut Vec<Diagnostic>, in_method: bool) {
    for (i, stmt) in stmts.iter().enumerate() {
        check_stmt(stmt, out, in_method);
        if let Stmt::Switch { cases, .. } = stmt {
            check_switch_fallthrough(cases, out);
        }
        let _ = i;
    }
}

/// Code 113: a non-last case whose body is non-empty must end in
/// `break`/`return`/`throw`/`continue`.
fn check_switch_fallthrough(cases: &[vela_ir::ast::SwitchCase], out: &mut Vec<Diagnostic>) {
    for (i, case) in cases.iter().enumerate() {
        let is_last = i + 1 == cases.len();
        if is_last || case.body.is_empty() {
            continue;
        }
        let terminates = matches!(
            case.body.last(),
            Some(Stmt::Break | Stmt::Return { .. } | Stmt::Throw(_) | Stmt::Continue)
        );
        if !terminates {
            out.push(Diagnostic::error(
                "113",
                "switch case falls through into the next case with a non-empty body",
            ));
        }
    }
}

fn check_stmt(stmt: &Stmt, out: &mut Vec<Diagnostic>, in_method: bool) {
    match stmt {
        Stmt::VarDecl {
            init, scope, name, ty, ..
        } => {
            if *scope == VarScope::Function {
                out.push(Diagnostic::error(
                    "105",
                    format!("'{name}' is a function-scoped mutable binding; use a block-scoped declaration"),
                ));
            }
            check_dynamic_type(ty, out, &format!("variable '{name}'"));
            if let Some(init) = init {
                check_expr(init, out, in_method);
            }
        }
        Stmt::Expr(e) => check_expr(e, out, in_method),
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                check_expr(v, out, in_method);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            check_condition(cond, out, in_method);
            check_block(then_branch, out, in_method);
            if let Some(else_branch) = else_branch {
                check_block(else_branch, out, in_method);
            }
        }
        Stmt::While { cond, body } => {
            check_condition(cond, out, in_method);
            check_block(body, out, in_method);
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(init) = init {
                check_stmt(init, out, in_method);
            }
            if let Some(cond) = cond {
                check_condition(cond, out, in_method);
            }
            if let Some(step) = step {
                check_stmt(step, out, in_method);
            }
            check_block(body, out, in_method);
        }
        Stmt::ForOf { iterable, body, .. } => {
            check_expr(iterable, out, in_method);
            check_block(body, out, in_method);
        }
        Stmt::ForIn { target, body, .. } => {
            out.push(Diagnostic::error(
                "104",
                "enumeration over object keys is not allowed; use explicit key-list iteration",
            ));
            check_expr(target, out, in_method);
            check_block(body, out, in_method);
        }
        Stmt::TryCatchFinally {
            try_block,
            catch_block,
            finally_block,
            ..
        } => {
            check_block(try_block, out, in_method);
            if let Some(catch_block) = catch_block {
                check_block(catch_block, out, in_method);
            }
            if let Some(finally_block) = finally_block {
                check_block(finally_block, out, in_method);
            }
        }
        Stmt::Throw(e) => check_expr(e, out, in_method),
        Stmt::Break | Stmt::Continue => {}
        Stmt::Block(b) => check_block(b, out, in_method),
        Stmt::NestedFunction(f) => {
            if let vela_ir::FunctionBody::Tree(body) = &f.body {
                check_block(body, out, in_method);
            }
        }
        Stmt::With(body) => {
            out.push(Diagnostic::error("101", "'with' blocks are not allowed"));
            check_block(body, out, in_method);
        }
        Stmt::Delete(e) => {
            out.push(Diagnostic::error(
                "111",
                "the property-delete operator is not allowed; use optional fields or destructuring",
            ));
            check_expr(e, out, in_method);
        }
        Stmt::Switch { discriminant, cases } => {
            check_expr(discriminant, out, in_method);
            for case in cases {
                if let Some(test) = &case.test {
                    check_expr(test, out, in_method);
                }
                check_statements(&case.body, out, in_method);
            }
        }
        Stmt::FieldAssign { receiver, value, .. } => {
            check_expr(receiver, out, in_method);
            check_expr(value, out, in_method);
        }
        Stmt::IndexAssign {
            receiver,
            index,
            value,
        } => {
            check_expr(receiver, out, in_method);
            check_expr(index, out, in_method);
            check_expr(value, out, in_method);
        }
        Stmt::CompoundAssign { value, .. } => check_expr(value, out, in_method),
    }
}

/// Code 110: the condition of `if`/`while`/`for`-cond/`do-while` (and,
/// separately, the operand of `!`, checked in [`check_expr`]'s `Unary`
/// arm) must be "explicitly boolean".
fn check_condition(cond: &Expr, out: &mut Vec<Diagnostic>, in_method: bool) {
    if !is_explicit_boolean(cond) {
        out.push(Diagnostic::error(
            "110",
            "condition must be an explicit boolean expression",
        ));
    }
    check_expr(cond, out, in_method);
}

/// An expression is "explicitly boolean" iff it is a boolean literal, a
/// comparison, a short-circuit of explicit booleans, a negation of an
/// explicit boolean, or (structurally, since the AST carries no raw
/// parenthesization) one of the above nested inside another of the above.
pub fn is_explicit_boolean(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(vela_ir::ConstValue::Boolean(_)) => true,
        Expr::Binary { op, lhs, rhs } => match op {
            BinaryOp::Eq
            | BinaryOp::NotEq
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => true,
            BinaryOp::And | BinaryOp::Or => is_explicit_boolean(lhs) && is_explicit_boolean(rhs),
            _ => false,
        },
        Expr::Unary {
            op: UnaryOp::Not, ..
        } => true,
        _ => false,
    }
}

pub(crate) fn check_expr(expr: &Expr, out: &mut Vec<Diagnostic>, in_method: bool) {
    match expr {
        Expr::Literal(_) | Expr::Identifier(_) | Expr::ArgumentsObject => {
            if matches!(expr, Expr::ArgumentsObject) {
                out.push(Diagnostic::error(
                    "103",
                    "implicit 'arguments' is not allowed; use explicit rest parameters",
                ));
            }
        }
        Expr::This => {
            if !in_method {
                out.push(Diagnostic::error(
                    "108",
                    "'this'/'self' may only be used inside methods or arrows lexically bound to one",
                ));
            }
        }
        Expr::Binary { op, lhs, rhs } => {
            match op {
                BinaryOp::WeakEq => out.push(Diagnostic::error("106", "use strict equality '===' instead of '=='")),
                BinaryOp::WeakNotEq => {
                    out.push(Diagnostic::error("107", "use strict inequality '!==' instead of '!='"))
                }
                _ => {}
            }
            check_expr(lhs, out, in_method);
            check_expr(rhs, out, in_method);
        }
        Expr::Unary { op, operand } => {
            if matches!(op, UnaryOp::Void) {
                out.push(Diagnostic::error(
                    "115",
                    "unary 'void' is not allowed; use explicit 'undefined'",
                ));
            }
            if matches!(op, UnaryOp::Not) && !is_explicit_boolean(operand) {
                out.push(Diagnostic::error(
                    "110",
                    "operand of '!' must be an explicit boolean expression",
                ));
            }
            check_expr(operand, out, in_method);
        }
        Expr::IncDec { target, .. } => check_expr(target, out, in_method),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            check_expr(cond, out, in_method);
            check_expr(then_expr, out, in_method);
            check_expr(else_expr, out, in_method);
        }
        Expr::Call { callee, args } => {
            check_expr(callee, out, in_method);
            for a in args {
                check_expr(a, out, in_method);
            }
        }
        Expr::MethodCall { receiver, args, .. } => {
            check_expr(receiver, out, in_method);
            for a in args {
                check_expr(a, out, in_method);
            }
        }
        Expr::Member { receiver, property } => {
            if property == "prototype" || property == "__proto__" {
                out.push(Diagnostic::error(
                    "126",
                    format!("access to '{property}' is not allowed; a closed class shape is required"),
                ));
            }
            check_expr(receiver, out, in_method);
        }
        Expr::Index { receiver, index } => {
            check_expr(receiver, out, in_method);
            check_expr(index, out, in_method);
        }
        Expr::New { class_name, args } => {
            if PRIMITIVE_WRAPPER_NAMES.contains(&class_name.as_str()) {
                out.push(Diagnostic::error(
                    "116",
                    format!("primitive wrapper construction 'new {class_name}()' is not allowed; use the type-conversion function form"),
                ));
            }
            for a in args {
                check_expr(a, out, in_method);
            }
        }
        Expr::ArrayLiteral(items) => {
            for i in items {
                check_expr(i, out, in_method);
            }
        }
        Expr::ObjectLiteral { fields, .. } => {
            for (_, v) in fields {
                check_expr(v, out, in_method);
            }
        }
        Expr::Lambda { body, .. } => check_block(body, out, in_method),
        Expr::Await(inner) | Expr::Move(inner) | Expr::Borrow(inner) => {
            check_expr(inner, out, in_method)
        }
        Expr::TemplateConcat { segments, .. } => {
            for (e, _) in segments {
                check_expr(e, out, in_method);
            }
        }
        Expr::DynamicEval(inner) => {
            out.push(Diagnostic::error(
                "102",
                "dynamic eval / runtime function-from-string is not allowed",
            ));
            check_expr(inner, out, in_method);
        }
        Expr::Comma(exprs) => {
            out.push(Diagnostic::error(
                "112",
                "comma expressions are not allowed; use separate statements",
            ));
            for e in exprs {
                check_expr(e, out, in_method);
            }
        }
        Expr::DynamicImport(path) => {
            let is_literal = matches!(path.as_ref(), Expr::Literal(vela_ir::ConstValue::Str(_)));
            if !is_literal {
                out.push(Diagnostic::error(
                    "127",
                    "dynamic import path must be a string literal",
                ));
            }
            check_expr(path, out, in_method);
        }
    }
}
