//! Anonymous-record synthesis (spec §4.2 "Object literal" / §9): every
//! object literal gets a structurally-deduplicated `TypeId` stamped onto it
//! via the shared [`TypeRegistry`].
//!
//! Field types are inferred conservatively -- literals and array/object
//! literals are resolved recursively, everything else (an identifier whose
//! declared type this pass has no symbol table for) falls back to
//! `IrType::Dynamic`. A richer inference would thread a type environment
//! through every scope; that's a full type-checker's job, not this pass's.

use vela_ir::{ClassDecl, Decl, Expr, FunctionBody, IrType, Module, Program, Stmt, StatementBlock, TypeRegistry};

pub fn synthesize_records(program: &mut Program, registry: &mut TypeRegistry) {
    for module in &mut program.modules {
        synthesize_module(module, registry);
    }
}

fn synthesize_module(module: &mut Module, registry: &mut TypeRegistry) {
    for decl in &mut module.declarations {
        match decl {
            Decl::Const(c) => synthesize_expr(&mut c.init, registry),
            Decl::Function(f) => {
                if let FunctionBody::Tree(body) = &mut f.body {
                    synthesize_block(body, registry);
                }
            }
            Decl::Class(c) => synthesize_class(c, registry),
            Decl::Interface(_) | Decl::TypeAlias(_) => {}
        }
    }
}

fn synthesize_class(class: &mut ClassDecl, registry: &mut TypeRegistry) {
    for field in &mut class.fields {
        if let Some(init) = &mut field.initializer {
            synthesize_expr(init, registry);
        }
    }
    for method in &mut class.methods {
        if let FunctionBody::Tree(body) = &mut method.body {
            synthesize_block(body, registry);
        }
    }
    if let Some(ctor) = &mut class.constructor {
        synthesize_block(&mut ctor.body, registry);
    }
}

fn synthesize_block(block: &mut StatementBlock, registry: &mut TypeRegistry) {
    for stmt in &mut block.statements {
        synthesize_stmt(stmt, registry);
    }
}

fn synthesize_stmt(stmt: &mut Stmt, registry: &mut TypeRegistry) {
    match stmt {
        Stmt::VarDecl { init, .. } => {
            if let Some(init) = init {
                synthesize_expr(init, registry);
            }
        }
        Stmt::Expr(e) | Stmt::Throw(e) | Stmt::Delete(e) => synthesize_expr(e, registry),
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                synthesize_expr(v, registry);
            }
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
        } => {
            synthesize_expr(cond, registry);
            synthesize_block(then_branch, registry);
            if let Some(b) = else_branch {
                synthesize_block(b, registry);
            }
        }
        Stmt::While { cond, body } => {
            synthesize_expr(cond, registry);
            synthesize_block(body, registry);
        }
        Stmt::For { init, cond, step, body } => {
            if let Some(init) = init {
                synthesize_stmt(init, registry);
            }
            if let Some(cond) = cond {
                synthesize_expr(cond, registry);
            }
            if let Some(step) = step {
                synthesize_stmt(step, registry);
            }
            synthesize_block(body, registry);
        }
        Stmt::ForOf { iterable, body, .. } => {
            synthesize_expr(iterable, registry);
            synthesize_block(body, registry);
        }
        Stmt::ForIn { target, body, .. } => {
            synthesize_expr(target, registry);
            synthesize_block(body, registry);
        }
        Stmt::TryCatchFinally {
            try_block,
            catch_block,
            finally_block,
            ..
        } => {
            synthesize_block(try_block, registry);
            if let Some(b) = catch_block {
                synthesize_block(b, registry);
            }
            if let Some(b) = finally_block {
                synthesize_block(b, registry);
            }
        }
        Stmt::Break | Stmt::Continue => {}
        Stmt::Block(b) => synthesize_block(b, registry),
        Stmt::FieldAssign { receiver, value, .. } => {
            synthesize_expr(receiver, registry);
            synthesize_expr(value, registry);
        }
        Stmt::IndexAssign { receiver, index, value } => {
            synthesize_expr(receiver, registry);
            synthesize_expr(index, registry);
            synthesize_expr(value, registry);
        }
        Stmt::CompoundAssign { value, .. } => synthesize_expr(value, registry),
        Stmt::Switch { discriminant, cases } => {
            synthesize_expr(discriminant, registry);
            for case in cases {
                if let Some(test) = &mut case.test {
                    synthesize_expr(test, registry);
                }
                for s in &mut case.body {
                    synthesize_stmt(s, registry);
                }
            }
        }
        Stmt::With(b) => synthesize_block(b, registry),
        Stmt::NestedFunction(f) => {
            if let FunctionBody::Tree(body) = &mut f.body {
                synthesize_block(body, registry);
            }
        }
    }
}

fn synthesize_expr(expr: &mut Expr, registry: &mut TypeRegistry) {
    match expr {
        Expr::ObjectLiteral { fields, type_id } => {
            for (_, v) in fields.iter_mut() {
                synthesize_expr(v, registry);
            }
            let names: Vec<String> = fields.iter().map(|(n, _)| n.clone()).collect();
            let types: Vec<IrType> = fields.iter().map(|(_, v)| infer_type(v)).collect();
            *type_id = Some(registry.intern(names, types));
        }
        Expr::Binary { lhs, rhs, .. } => {
            synthesize_expr(lhs, registry);
            synthesize_expr(rhs, registry);
        }
        Expr::Unary { operand, .. } => synthesize_expr(operand, registry),
        Expr::IncDec { target, .. } => synthesize_expr(target, registry),
        Expr::Conditional {
            cond,
            then_expr,
            else_expr,
        } => {
            synthesize_expr(cond, registry);
            synthesize_expr(then_expr, registry);
            synthesize_expr(else_expr, registry);
        }
        Expr::Call { callee, args } => {
            synthesize_expr(callee, registry);
            for a in args {
                synthesize_expr(a, registry);
            }
        }
        Expr::MethodCall { receiver, args, .. } => {
            synthesize_expr(receiver, registry);
            for a in args {
                synthesize_expr(a, registry);
            }
        }
        Expr::Member { receiver, .. } => synthesize_expr(receiver, registry),
        Expr::Index { receiver, index } => {
            synthesize_expr(receiver, registry);
            synthesize_expr(index, registry);
        }
        Expr::New { args, .. } => {
            for a in args {
                synthesize_expr(a, registry);
            }
        }
        Expr::ArrayLiteral(items) => {
            for i in items {
                synthesize_expr(i, registry);
            }
        }
        Expr::Lambda { body, .. } => synthesize_block(body, registry),
        Expr::Await(inner) | Expr::Move(inner) | Expr::Borrow(inner) | Expr::DynamicEval(inner) => {
            synthesize_expr(inner, registry)
        }
        Expr::TemplateConcat { segments, .. } => {
            for (e, _) in segments {
                synthesize_expr(e, registry);
            }
        }
        Expr::Comma(exprs) => {
            for e in exprs {
                synthesize_expr(e, registry);
            }
        }
        Expr::DynamicImport(inner) => synthesize_expr(inner, registry),
        Expr::Literal(_)
        | Expr::Identifier(_)
        | Expr::This
        | Expr::ArgumentsObject => {}
    }
}

/// Best-effort field-type inference for a just-synthesized object literal.
/// See the module doc comment for what this does and doesn't cover.
fn infer_type(expr: &Expr) -> IrType {
    match expr {
        Expr::Literal(cv) => infer_literal_type(cv),
        Expr::ArrayLiteral(items) => {
            let element = items.first().map(infer_type).unwrap_or(IrType::Dynamic);
            IrType::Array(Box::new(vela_ir::ArrayType {
                element,
                ownership: vela_ir::Ownership::Value,
            }))
        }
        _ => IrType::Dynamic,
    }
}

fn infer_literal_type(cv: &vela_ir::ConstValue) -> IrType {
    use vela_ir::{ConstValue, Primitive};
    match cv {
        ConstValue::Number(_) => IrType::Primitive(Primitive::Number),
        ConstValue::Integer(_) => IrType::Primitive(Primitive::Integer),
        ConstValue::Integer53(_) => IrType::Primitive(Primitive::Integer53),
        ConstValue::Str(_) => IrType::Primitive(Primitive::Str),
        ConstValue::Boolean(_) => IrType::Primitive(Primitive::Boolean),
        ConstValue::Null => IrType::Nullable(Box::new(IrType::Dynamic)),
        ConstValue::Void => IrType::Primitive(Primitive::Void),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::ConstValue;

    fn object_literal(fields: Vec<(&str, Expr)>) -> Expr {
        Expr::ObjectLiteral {
            fields: fields.into_iter().map(|(n, e)| (n.to_string(), e)).collect(),
            type_id: None,
        }
    }

    #[test]
    fn identical_shapes_dedupe_to_one_record() {
        let mut registry = TypeRegistry::new();
        let mut a = object_literal(vec![("x", Expr::Literal(ConstValue::Integer(1)))]);
        let mut b = object_literal(vec![("x", Expr::Literal(ConstValue::Integer(2)))]);
        synthesize_expr(&mut a, &mut registry);
        synthesize_expr(&mut b, &mut registry);
        assert_eq!(registry.len(), 1);
        let (Expr::ObjectLiteral { type_id: id_a, .. }, Expr::ObjectLiteral { type_id: id_b, .. }) = (&a, &b) else {
            panic!("expected object literals");
        };
        assert_eq!(id_a, id_b);
    }

    #[test]
    fn different_field_names_produce_distinct_records() {
        let mut registry = TypeRegistry::new();
        let mut a = object_literal(vec![("x", Expr::Literal(ConstValue::Integer(1)))]);
        let mut b = object_literal(vec![("y", Expr::Literal(ConstValue::Integer(1)))]);
        synthesize_expr(&mut a, &mut registry);
        synthesize_expr(&mut b, &mut registry);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn nested_object_literal_gets_its_own_record() {
        let mut registry = TypeRegistry::new();
        let mut outer = object_literal(vec![(
            "inner",
            object_literal(vec![("x", Expr::Literal(ConstValue::Integer(1)))]),
        )]);
        synthesize_expr(&mut outer, &mut registry);
        assert_eq!(registry.len(), 2);
    }
}
