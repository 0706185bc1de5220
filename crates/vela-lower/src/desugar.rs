//! Statement desugaring (spec §4.2 "Statement lowering"): compound
//! assignments and statement-position `++`/`--` both lower to a plain
//! reassignment around a `Binary`. Expression-position `++`/`--` keeps its
//! value semantics and is left to the interpreter/backend (spec §9, the
//! documented open question on prefix r-value semantics).

use std::collections::HashMap;

use vela_ir::{
    BinaryOp, ClassDecl, ConstValue, Decl, Expr, FunctionBody, IncDecOp, IrType, Module, Program,
    Stmt, StatementBlock, VarScope,
};

pub fn desugar_program(program: &mut Program) {
    for module in &mut program.modules {
        desugar_module(module);
    }
}

fn desugar_module(module: &mut Module) {
    for decl in &mut module.declarations {
        match decl {
            Decl::Function(f) => {
                if let FunctionBody::Tree(body) = &mut f.body {
                    let mut types = HashMap::new();
                    desugar_block(body, &mut types);
                }
            }
            Decl::Class(c) => desugar_class(c),
            Decl::Const(_) | Decl::Interface(_) | Decl::TypeAlias(_) => {}
        }
    }
}

fn desugar_class(class: &mut ClassDecl) {
    for method in &mut class.methods {
        if let FunctionBody::Tree(body) = &mut method.body {
            let mut types = HashMap::new();
            desugar_block(body, &mut types);
        }
    }
    if let Some(ctor) = &mut class.constructor {
        let mut types = HashMap::new();
        desugar_block(&mut ctor.body, &mut types);
    }
}

fn desugar_block(block: &mut StatementBlock, types: &mut HashMap<String, IrType>) {
    let mut rewritten = Vec::with_capacity(block.statements.len());
    for mut stmt in block.statements.drain(..) {
        desugar_nested(&mut stmt, types);
        rewritten.push(desugar_stmt(stmt, types));
    }
    block.statements = rewritten;
}

/// Recurses into a statement's nested blocks/expressions *before* this
/// statement itself is considered for top-level rewriting.
fn desugar_nested(stmt: &mut Stmt, types: &mut HashMap<String, IrType>) {
    match stmt {
        Stmt::If {
            then_branch,
            else_branch,
            ..
        } => {
            desugar_block(then_branch, types);
            if let Some(b) = else_branch {
                desugar_block(b, types);
            }
        }
        Stmt::While { body, .. } | Stmt::ForOf { body, .. } | Stmt::ForIn { body, .. } => {
            desugar_block(body, types)
        }
        Stmt::For { init, step, body, .. } => {
            if let Some(init) = init {
                desugar_nested(init, types);
                **init = desugar_stmt((**init).clone(), types);
            }
            if let Some(step) = step {
                desugar_nested(step, types);
                **step = desugar_stmt((**step).clone(), types);
            }
            desugar_block(body, types);
        }
        Stmt::TryCatchFinally {
            try_block,
            catch_block,
            finally_block,
            ..
        } => {
            desugar_block(try_block, types);
            if let Some(b) = catch_block {
                desugar_block(b, types);
            }
            if let Some(b) = finally_block {
                desugar_block(b, types);
            }
        }
        Stmt::Block(b) => desugar_block(b, types),
        Stmt::Switch { cases, .. } => {
            for case in cases {
                let mut block = StatementBlock::new(std::mem::take(&mut case.body));
                desugar_block(&mut block, types);
                case.body = block.statements;
            }
        }
        Stmt::With(b) => desugar_block(b, types),
        Stmt::NestedFunction(f) => {
            if let FunctionBody::Tree(body) = &mut f.body {
                let mut inner_types = HashMap::new();
                desugar_block(body, &mut inner_types);
            }
        }
        _ => {}
    }
}

fn desugar_stmt(stmt: Stmt, types: &mut HashMap<String, IrType>) -> Stmt {
    match stmt {
        Stmt::VarDecl {
            name,
            ty,
            init,
            is_declaration,
            scope,
            location,
        } => {
            if is_declaration {
                types.insert(name.clone(), ty.clone());
            }
            Stmt::VarDecl {
                name,
                ty,
                init,
                is_declaration,
                scope,
                location,
            }
        }
        Stmt::CompoundAssign { name, op, value, location } => {
            let ty = types.get(&name).cloned().unwrap_or(IrType::Dynamic);
            Stmt::VarDecl {
                name: name.clone(),
                ty,
                init: Some(Expr::Binary {
                    op,
                    lhs: Box::new(Expr::Identifier(name)),
                    rhs: Box::new(value),
                }),
                is_declaration: false,
                scope: VarScope::Block,
                location,
            }
        }
        Stmt::Expr(Expr::IncDec { op, target, .. }) => desugar_inc_dec(op, *target, types),
        other => other,
    }
}

fn desugar_inc_dec(op: IncDecOp, target: Expr, types: &HashMap<String, IrType>) -> Stmt {
    let bin_op = match op {
        IncDecOp::Increment => BinaryOp::Add,
        IncDecOp::Decrement => BinaryOp::Sub,
    };
    let one = Expr::Literal(ConstValue::Integer(1));
    match target {
        Expr::Identifier(name) => {
            let ty = types.get(&name).cloned().unwrap_or(IrType::Dynamic);
            Stmt::VarDecl {
                name: name.clone(),
                ty,
                init: Some(Expr::Binary {
                    op: bin_op,
                    lhs: Box::new(Expr::Identifier(name)),
                    rhs: Box::new(one),
                }),
                is_declaration: false,
                scope: VarScope::Block,
                location: None,
            }
        }
        Expr::Member { receiver, property } => Stmt::FieldAssign {
            value: Expr::Binary {
                op: bin_op,
                lhs: Box::new(Expr::Member {
                    receiver: receiver.clone(),
                    property: property.clone(),
                }),
                rhs: Box::new(one),
            },
            receiver: *receiver,
            field: property,
        },
        Expr::Index { receiver, index } => Stmt::IndexAssign {
            value: Expr::Binary {
                op: bin_op,
                lhs: Box::new(Expr::Index {
                    receiver: receiver.clone(),
                    index: index.clone(),
                }),
                rhs: Box::new(one),
            },
            receiver: *receiver,
            index: *index,
        },
        other => Stmt::Expr(Expr::IncDec {
            op,
            position: vela_ir::IncDecPosition::Postfix,
            target: Box::new(other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::Primitive;

    #[test]
    fn compound_assign_desugars_to_binary_reassignment() {
        let mut types = HashMap::new();
        types.insert("total".to_string(), IrType::Primitive(Primitive::Integer));
        let stmt = Stmt::CompoundAssign {
            name: "total".into(),
            op: BinaryOp::Add,
            value: Expr::Literal(ConstValue::Integer(5)),
            location: None,
        };
        let lowered = desugar_stmt(stmt, &mut types);
        match lowered {
            Stmt::VarDecl {
                is_declaration,
                init: Some(Expr::Binary { op, .. }),
                ..
            } => {
                assert!(!is_declaration);
                assert_eq!(op, BinaryOp::Add);
            }
            other => panic!("expected desugared VarDecl, got {other:?}"),
        }
    }

    #[test]
    fn statement_position_increment_desugars_to_add_one() {
        let types = HashMap::new();
        let stmt = desugar_inc_dec(IncDecOp::Increment, Expr::Identifier("i".into()), &types);
        match stmt {
            Stmt::VarDecl {
                init: Some(Expr::Binary { op, rhs, .. }),
                ..
            } => {
                assert_eq!(op, BinaryOp::Add);
                assert_eq!(*rhs, Expr::Literal(ConstValue::Integer(1)));
            }
            other => panic!("expected desugared VarDecl, got {other:?}"),
        }
    }

    #[test]
    fn field_increment_desugars_to_field_assign() {
        let types = HashMap::new();
        let target = Expr::Member {
            receiver: Box::new(Expr::Identifier("node".into())),
            property: "count".into(),
        };
        let stmt = desugar_inc_dec(IncDecOp::Increment, target, &types);
        assert!(matches!(stmt, Stmt::FieldAssign { .. }));
    }
}
