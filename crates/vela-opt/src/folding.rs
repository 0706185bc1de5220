//! Constant folding and branch/ternary simplification (spec §4.5, passes
//! 1-3). Operates on the tree tier: the function hoister that follows this
//! pass (spec §4.6) still needs `Stmt::NestedFunction` to be present, which
//! only exists pre-SSA, so the optimizer runs before SSA conversion rather
//! than after it. `vela-cli` converts to SSA once both passes are done.
//!
//! Every fold function returns whether it changed anything; callers OR
//! those flags together so the fixed-point driver in `lib.rs` knows whether
//! to run another iteration.

use vela_ir::{BinaryOp, ConstValue, Expr, Stmt, StatementBlock, UnaryOp};

/// Runs one fixed-point pass (folding + branch simplification + ternary
/// folding) over every statement in `block`, in place. Returns `true` if
/// anything changed.
pub fn fold_block(block: &mut StatementBlock) -> bool {
    let (new_statements, changed) = fold_statements(std::mem::take(&mut block.statements));
    block.statements = new_statements;
    changed
}

/// Folds a statement list, splicing an `if` with a literal boolean
/// condition into its live branch's statements in place of the `if`
/// itself -- the tree-tier analog of "a branch with a literal condition
/// becomes a jump" (spec §4.5 pass 2).
fn fold_statements(statements: Vec<Stmt>) -> (Vec<Stmt>, bool) {
    let mut out = Vec::with_capacity(statements.len());
    let mut changed = false;

    for mut stmt in statements {
        changed |= fold_stmt_inner(&mut stmt);

        match stmt {
            Stmt::If {
                cond: Expr::Literal(ConstValue::Boolean(true)),
                then_branch,
                ..
            } => {
                changed = true;
                let (inner, _) = fold_statements(then_branch.statements);
                out.extend(inner);
            }
            Stmt::If {
                cond: Expr::Literal(ConstValue::Boolean(false)),
                else_branch: Some(else_branch),
                ..
            } => {
                changed = true;
                let (inner, _) = fold_statements(else_branch.statements);
                out.extend(inner);
            }
            Stmt::If {
                cond: Expr::Literal(ConstValue::Boolean(false)),
                else_branch: None,
                ..
            } => {
                changed = true;
            }
            other => out.push(other),
        }
    }

    (out, changed)
}

/// Folds the non-`If`-shape parts of a single statement's subexpressions
/// and nested blocks, without performing the `if`-splice itself (that's
/// `fold_statements`'s job since it needs to see the whole list).
fn fold_stmt_inner(stmt: &mut Stmt) -> bool {
    let mut changed = false;
    match stmt {
        Stmt::VarDecl { init: Some(e), .. } => changed |= fold_expr(e),
        Stmt::VarDecl { init: None, .. } => {}
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Delete(e) => changed |= fold_expr(e),
        Stmt::Return { value: Some(e), .. } => changed |= fold_expr(e),
        Stmt::Return { value: None, .. } => {}
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            changed |= fold_expr(cond);
            changed |= fold_block(then_branch);
            if let Some(e) = else_branch {
                changed |= fold_block(e);
            }
        }
        Stmt::While { cond, body } => {
            changed |= fold_expr(cond);
            changed |= fold_block(body);
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
        } => {
            if let Some(init) = init {
                changed |= fold_stmt_inner(init);
            }
            if let Some(cond) = cond {
                changed |= fold_expr(cond);
            }
            if let Some(step) = step {
                changed |= fold_stmt_inner(step);
            }
            changed |= fold_block(body);
        }
        Stmt::ForOf { iterable, body, .. } => {
            changed |= fold_expr(iterable);
            changed |= fold_block(body);
        }
        Stmt::ForIn { target, body, .. } => {
            changed |= fold_expr(target);
            changed |= fold_block(body);
        }
        Stmt::TryCatchFinally {
            try_block,
            catch_block,
            finally_block,
            ..
        } => {
            changed |= fold_block(try_block);
            if let Some(c) = catch_block {
                changed |= fold_block(c);
            }
            if let Some(f) = finally_block {
                changed |= fold_block(f);
            }
        }
        Stmt::Block(b) | Stmt::With(b) => changed |= fold_block(b),
        Stmt::FieldAssign { receiver, value, .. } => {
            changed |= fold_expr(receiver);
            changed |= fold_expr(value);
        }
        Stmt::IndexAssign {
            receiver,
            index,
            value,
        } => {
            changed |= fold_expr(receiver);
            changed |= fold_expr(index);
            changed |= fold_expr(value);
        }
        Stmt::Switch { discriminant, cases } => {
            changed |= fold_expr(discriminant);
            for case in cases {
                if let Some(test) = &mut case.test {
                    changed |= fold_expr(test);
                }
                let (folded, c) = fold_statements(std::mem::take(&mut case.body));
                case.body = folded;
                changed |= c;
            }
        }
        Stmt::CompoundAssign { value, .. } => changed |= fold_expr(value),
        Stmt::NestedFunction(nested) => {
            if let vela_ir::FunctionBody::Tree(body) = &mut nested.body {
                changed |= fold_block(body);
            }
        }
        Stmt::Break | Stmt::Continue => {}
    }
    changed
}

/// Recursively folds `expr` in place. Returns `true` if it changed.
///
/// `pub(crate)` so `lib.rs` can fold `Decl::Const` initializers and class
/// field initializers directly, since those are bare expressions rather
/// than statement blocks.
pub(crate) fn fold_expr(expr: &mut Expr) -> bool {
    let mut changed = false;
    match expr {
        Expr::Binary { op, lhs, rhs } => {
            changed |= fold_expr(lhs);
            changed |= fold_expr(rhs);
            if let Some(folded) = fold_binary(*op, lhs, rhs) {
                *expr = Expr::Literal(folded);
                changed = true;
            }
        }
        Expr::Unary { op, operand } => {
            changed |= fold_expr(operand);
            if let Some(folded) = fold_unary(*op, operand) {
                *expr = Expr::Literal(folded);
                changed = true;
            }
        }
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            changed |= fold_expr(cond);
            changed |= fold_expr(then_expr);
            changed |= fold_expr(else_expr);
            if let Expr::Literal(ConstValue::Boolean(b)) = cond.as_ref() {
                *expr = if *b {
                    (**then_expr).clone()
                } else {
                    (**else_expr).clone()
                };
                changed = true;
            }
        }
        Expr::IncDec { target, .. } => changed |= fold_expr(target),
        Expr::Call { callee, args } => {
            changed |= fold_expr(callee);
            for a in args {
                changed |= fold_expr(a);
            }
        }
        Expr::MethodCall { receiver, args, .. } => {
            changed |= fold_expr(receiver);
            for a in args {
                changed |= fold_expr(a);
            }
        }
        Expr::Member { receiver, .. } => changed |= fold_expr(receiver),
        Expr::Index { receiver, index } => {
            changed |= fold_expr(receiver);
            changed |= fold_expr(index);
        }
        Expr::New { args, .. } => {
            for a in args {
                changed |= fold_expr(a);
            }
        }
        Expr::ArrayLiteral(items) => {
            for item in items {
                changed |= fold_expr(item);
            }
        }
        Expr::ObjectLiteral { fields, .. } => {
            for (_, v) in fields {
                changed |= fold_expr(v);
            }
        }
        Expr::Await(inner) | Expr::Move(inner) | Expr::Borrow(inner) | Expr::DynamicEval(inner) => {
            changed |= fold_expr(inner);
        }
        Expr::TemplateConcat { head, segments } => {
            let _ = head;
            for (e, _) in segments {
                changed |= fold_expr(e);
            }
        }
        Expr::Comma(items) => {
            for item in items {
                changed |= fold_expr(item);
            }
        }
        Expr::DynamicImport(inner) => changed |= fold_expr(inner),
        Expr::Literal(_) | Expr::Identifier(_) | Expr::This | Expr::ArgumentsObject => {}
    }
    changed
}

fn fold_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Option<ConstValue> {
    let (Expr::Literal(l), Expr::Literal(r)) = (lhs, rhs) else {
        return None;
    };

    match (op, l, r) {
        (BinaryOp::Add, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Number(a + b)),
        (BinaryOp::Sub, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Number(a - b)),
        (BinaryOp::Mul, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Number(a * b)),
        (BinaryOp::Div, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Number(a / b)),
        (BinaryOp::Rem, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Number(a % b)),
        (BinaryOp::Eq, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Boolean(a == b)),
        (BinaryOp::NotEq, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Boolean(a != b)),
        (BinaryOp::Lt, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Boolean(a < b)),
        (BinaryOp::Le, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Boolean(a <= b)),
        (BinaryOp::Gt, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Boolean(a > b)),
        (BinaryOp::Ge, ConstValue::Number(a), ConstValue::Number(b)) => Some(ConstValue::Boolean(a >= b)),

        (BinaryOp::Add, ConstValue::Str(a), ConstValue::Str(b)) => {
            Some(ConstValue::Str(format!("{a}{b}")))
        }
        (BinaryOp::Eq, ConstValue::Str(a), ConstValue::Str(b)) => Some(ConstValue::Boolean(a == b)),
        (BinaryOp::NotEq, ConstValue::Str(a), ConstValue::Str(b)) => Some(ConstValue::Boolean(a != b)),
        (BinaryOp::Lt, ConstValue::Str(a), ConstValue::Str(b)) => Some(ConstValue::Boolean(a < b)),
        (BinaryOp::Le, ConstValue::Str(a), ConstValue::Str(b)) => Some(ConstValue::Boolean(a <= b)),
        (BinaryOp::Gt, ConstValue::Str(a), ConstValue::Str(b)) => Some(ConstValue::Boolean(a > b)),
        (BinaryOp::Ge, ConstValue::Str(a), ConstValue::Str(b)) => Some(ConstValue::Boolean(a >= b)),

        (BinaryOp::And, ConstValue::Boolean(a), ConstValue::Boolean(b)) => {
            Some(ConstValue::Boolean(*a && *b))
        }
        (BinaryOp::Or, ConstValue::Boolean(a), ConstValue::Boolean(b)) => {
            Some(ConstValue::Boolean(*a || *b))
        }

        (BinaryOp::Add, ConstValue::Integer(a), ConstValue::Integer(b)) => {
            a.checked_add(*b).map(ConstValue::Integer)
        }
        (BinaryOp::Sub, ConstValue::Integer(a), ConstValue::Integer(b)) => {
            a.checked_sub(*b).map(ConstValue::Integer)
        }
        (BinaryOp::Mul, ConstValue::Integer(a), ConstValue::Integer(b)) => {
            a.checked_mul(*b).map(ConstValue::Integer)
        }
        (BinaryOp::Eq, ConstValue::Integer(a), ConstValue::Integer(b)) => Some(ConstValue::Boolean(a == b)),
        (BinaryOp::NotEq, ConstValue::Integer(a), ConstValue::Integer(b)) => {
            Some(ConstValue::Boolean(a != b))
        }

        _ => None,
    }
}

fn fold_unary(op: UnaryOp, operand: &Expr) -> Option<ConstValue> {
    let Expr::Literal(v) = operand else {
        return None;
    };
    match (op, v) {
        (UnaryOp::Not, ConstValue::Boolean(b)) => Some(ConstValue::Boolean(!b)),
        (UnaryOp::Neg, ConstValue::Number(n)) => Some(ConstValue::Number(-n)),
        (UnaryOp::Neg, ConstValue::Integer(n)) => n.checked_neg().map(ConstValue::Integer),
        (UnaryOp::Plus, ConstValue::Number(n)) => Some(ConstValue::Number(*n)),
        (UnaryOp::Typeof, literal) => Some(ConstValue::Str(literal.typeof_str().to_string())),
        (UnaryOp::Void, _) => Some(ConstValue::Void),
        _ => None,
    }
}
