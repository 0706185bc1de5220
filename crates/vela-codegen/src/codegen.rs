//! C++ emission from the SSA tier (spec §4.7 "Backend (C++ emission)").
//!
//! A `BasicBlock` becomes a label; `Jump`/`Branch` become `goto`. Blocks are
//! emitted flat, one after another in the same function scope -- not each
//! wrapped in its own `{ }` -- so a `goto` never jumps into a nested scope
//! past a variable's initialization. `Assign` declares its target at the
//! point of assignment since every SSA version is written exactly once.
//!
//! Constructors are the one place the tree tier still reaches codegen
//! directly (`ConstructorDecl::body` is a bare `StatementBlock`, never
//! converted by `lower_all_to_ssa`); this module runs `vela_lower::tree_to_ssa`
//! on a constructor body itself rather than carrying a second emitter.

use std::fmt::Write as _;

use vela_ir::{
    BasicBlock, BinaryOp, ClassDecl, ConstValue, ConstructorDecl, FieldDecl, FunctionBody,
    FunctionDecl, Instruction, IrType, MemoryMode, MethodDecl, NamedType, Ownership, Param,
    SsaBody, SsaExpr, SsaValue, Terminator, UnaryOp, Variable,
};

use crate::error::CodegenError;
use crate::types::{lower_type, CppType, RecordRegistry};

/// Property names that, on a collection receiver, read as a method call
/// rather than a field (spec §4.7 member-vs-methodCall invariant). The same
/// name on a `Named` (user class) receiver is always a plain field, even
/// when a class happens to declare a field with one of these names.
const COLLECTION_ACCESSORS: &[&str] = &["size", "length", "isEmpty"];

fn var_name(v: &Variable) -> String {
    format!("{}_{}", v.name, v.version)
}

fn mangle_path(name: &str) -> String {
    name.replace('/', "::")
}

/// Emits a forward declaration (for the header) and a full definition (for
/// the source file) of a free function.
pub fn emit_function(
    f: &FunctionDecl,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<(String, String), CodegenError> {
    let ret = effective_return_type(&f.return_type, f.is_async, mode, records)?;
    let params = emit_params(&f.params, mode, records)?;

    let decl = format!("{} {}({});", ret.spelling, f.name, params);

    let FunctionBody::Ssa(ssa) = &f.body else {
        return Err(CodegenError::Internal(format!(
            "function '{}' reached codegen without SSA conversion",
            f.name
        )));
    };
    let body = emit_ssa_body(ssa, mode, records, f.is_async)?;
    let def = format!("{} {}({}) {{\n{}}}\n", ret.spelling, f.name, params, body);

    Ok((decl, def))
}

/// Emits a class's header-side declaration (fields, constructor signature,
/// method signatures) and its source-side out-of-line definitions.
pub fn emit_class(
    class: &ClassDecl,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<(String, String), CodegenError> {
    let mut header = String::new();
    let mut source = String::new();

    if !class.type_params.is_empty() {
        writeln!(
            header,
            "template<{}>",
            class
                .type_params
                .iter()
                .map(|p| format!("typename {}", p))
                .collect::<Vec<_>>()
                .join(", ")
        )
        .unwrap();
    }

    let bases: Vec<String> = class
        .parent
        .iter()
        .cloned()
        .chain(class.implements.iter().cloned())
        .map(|n| mangle_path(&n))
        .collect();
    if bases.is_empty() {
        writeln!(header, "struct {} {{", class.name).unwrap();
    } else {
        writeln!(
            header,
            "struct {} : {} {{",
            class.name,
            bases.iter().map(|b| format!("public {}", b)).collect::<Vec<_>>().join(", ")
        )
        .unwrap();
    }

    for field in &class.fields {
        emit_field(&mut header, field, mode, records)?;
    }

    if let Some(ctor) = &class.constructor {
        let params = emit_params(&ctor.params, mode, records)?;
        writeln!(header, "    {}({});", class.name, params).unwrap();
        let def = emit_constructor(class, ctor, mode, records)?;
        write!(source, "{}", def).unwrap();
    }

    for method in &class.methods {
        let ret = effective_return_type(&method.return_type, method.is_async, mode, records)?;
        let params = emit_params(&method.params, mode, records)?;
        let storage = if method.is_static { "static " } else { "" };
        writeln!(header, "    {}{} {}({});", storage, ret.spelling, method.name, params).unwrap();
        let def = emit_method(class, method, mode, records)?;
        write!(source, "{}", def).unwrap();
    }

    writeln!(header, "}};\n").unwrap();
    Ok((header, source))
}

fn emit_field(
    out: &mut String,
    field: &FieldDecl,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<(), CodegenError> {
    let ty = lower_type(&field.ty, mode, records)?;
    writeln!(out, "    {} {};", ty.spelling, field.name).unwrap();
    Ok(())
}

fn emit_params(params: &[Param], mode: MemoryMode, records: &RecordRegistry) -> Result<String, CodegenError> {
    let mut parts = Vec::with_capacity(params.len());
    for p in params {
        let ty = lower_type(&p.ty, mode, records)?;
        parts.push(format!("{} {}", ty.spelling, p.name));
    }
    Ok(parts.join(", "))
}

fn effective_return_type(
    declared: &IrType,
    is_async: bool,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<CppType, CodegenError> {
    let base = lower_type(declared, mode, records)?;
    Ok(if is_async {
        CppType {
            spelling: format!("vela::Task<{}>", base.spelling),
            is_pointer: false,
        }
    } else {
        base
    })
}

fn emit_constructor(
    class: &ClassDecl,
    ctor: &ConstructorDecl,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<String, CodegenError> {
    let ssa = vela_lower::tree_to_ssa(&ctor.body);
    let params = emit_params(&ctor.params, mode, records)?;
    let body = emit_ssa_body(&ssa, mode, records, false)?;
    Ok(format!("{}::{}({}) {{\n{}}}\n", class.name, class.name, params, body))
}

fn emit_method(
    class: &ClassDecl,
    method: &MethodDecl,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<String, CodegenError> {
    let ret = effective_return_type(&method.return_type, method.is_async, mode, records)?;
    let params = emit_params(&method.params, mode, records)?;
    let FunctionBody::Ssa(ssa) = &method.body else {
        return Err(CodegenError::Internal(format!(
            "method '{}.{}' reached codegen without SSA conversion",
            class.name, method.name
        )));
    };
    let body = emit_ssa_body(ssa, mode, records, method.is_async)?;
    Ok(format!("{} {}::{}({}) {{\n{}}}\n", ret.spelling, class.name, method.name, params, body))
}

fn emit_ssa_body(
    ssa: &SsaBody,
    mode: MemoryMode,
    records: &RecordRegistry,
    is_async: bool,
) -> Result<String, CodegenError> {
    let mut out = String::new();
    writeln!(out, "    goto bb{};", ssa.entry.0).unwrap();
    for block in &ssa.blocks {
        emit_block(&mut out, block, mode, records, is_async)?;
    }
    Ok(out)
}

fn emit_block(
    out: &mut String,
    block: &BasicBlock,
    mode: MemoryMode,
    records: &RecordRegistry,
    is_async: bool,
) -> Result<(), CodegenError> {
    writeln!(out, "bb{}:", block.id.0).unwrap();
    for instr in &block.instructions {
        emit_instruction(out, instr, mode, records)?;
    }
    emit_terminator(out, &block.terminator, is_async);
    Ok(())
}

fn emit_instruction(
    out: &mut String,
    instr: &Instruction,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<(), CodegenError> {
    match instr {
        Instruction::Assign { target, value } => {
            let ty = lower_type(&target.ty, mode, records)?;
            let expr = emit_ssa_expr(value, mode, records, Some(&target.ty))?;
            writeln!(out, "    {} {} = {};", ty.spelling, var_name(target), expr).unwrap();
        }
        Instruction::FieldAssign { receiver, field, value } => {
            let access = emit_field_access(receiver, field, mode, records)?;
            let rhs = emit_ssa_value(value);
            writeln!(out, "    {} = {};", access, rhs).unwrap();
        }
        Instruction::Eval(expr) => {
            let e = emit_ssa_expr(expr, mode, records, None)?;
            writeln!(out, "    {};", e).unwrap();
        }
    }
    Ok(())
}

fn emit_terminator(out: &mut String, term: &Terminator, is_async: bool) {
    let return_kw = if is_async { "co_return" } else { "return" };
    match term {
        Terminator::Return(Some(v)) => {
            writeln!(out, "    {} {};", return_kw, emit_ssa_value(v)).unwrap();
        }
        Terminator::Return(None) => {
            writeln!(out, "    {};", return_kw).unwrap();
        }
        Terminator::Branch { cond, then_block, else_block } => {
            writeln!(
                out,
                "    if ({}) goto bb{}; else goto bb{};",
                emit_ssa_value(cond),
                then_block.0,
                else_block.0
            )
            .unwrap();
        }
        Terminator::Jump(target) => {
            writeln!(out, "    goto bb{};", target.0).unwrap();
        }
        Terminator::Unreachable => {
            writeln!(out, "    vela::unreachable();").unwrap();
        }
    }
}

fn emit_ssa_value(value: &SsaValue) -> String {
    match value {
        SsaValue::Var(v) => var_name(v),
        SsaValue::Const(c) => emit_const(c),
    }
}

fn emit_const(c: &ConstValue) -> String {
    match c {
        ConstValue::Number(n) => {
            if n.is_nan() {
                "std::numeric_limits<double>::quiet_NaN()".to_string()
            } else if n.is_infinite() {
                if *n > 0.0 {
                    "std::numeric_limits<double>::infinity()".to_string()
                } else {
                    "(-std::numeric_limits<double>::infinity())".to_string()
                }
            } else {
                format!("{:?}", n)
            }
        }
        ConstValue::Integer(i) => i.to_string(),
        ConstValue::Integer53(i) => format!("{}LL", i),
        ConstValue::Str(s) => format!("vela::String(\"{}\")", escape_cpp_string(s)),
        ConstValue::Boolean(b) => b.to_string(),
        ConstValue::Null => "nullptr".to_string(),
        ConstValue::Void => "vela::Void{}".to_string(),
    }
}

fn escape_cpp_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn receiver_type(receiver: &SsaValue) -> Option<&IrType> {
    match receiver {
        SsaValue::Var(v) => Some(&v.ty),
        SsaValue::Const(_) => None,
    }
}

/// Implements the member-vs-methodCall dispatch rule: whether `.field`
/// becomes a plain field read or a `field()` accessor call depends on the
/// receiver's static type, never on the field's name. A struct field
/// literally named `size` on a `Named` receiver stays a plain field; the
/// same name on an `Array`/`Map`/`Promise` receiver is always a call.
fn emit_field_access(
    receiver: &SsaValue,
    field: &str,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<String, CodegenError> {
    let recv_expr = emit_ssa_value(receiver);
    let ty = receiver_type(receiver);
    let is_collection = matches!(ty, Some(IrType::Array(_)) | Some(IrType::Map(_)) | Some(IrType::Promise(_)));
    let op = match ty {
        Some(t) => lower_type(t, mode, records)?.access_op(),
        None => ".",
    };
    if is_collection && COLLECTION_ACCESSORS.contains(&field) {
        Ok(format!("{}{}{}()", recv_expr, op, field))
    } else {
        Ok(format!("{}{}{}", recv_expr, op, field))
    }
}

fn emit_ssa_expr(
    expr: &SsaExpr,
    mode: MemoryMode,
    records: &RecordRegistry,
    target_ty: Option<&IrType>,
) -> Result<String, CodegenError> {
    match expr {
        SsaExpr::Value(v) => Ok(emit_ssa_value(v)),
        SsaExpr::Binary { op, lhs, rhs } => {
            Ok(format!("({} {} {})", emit_ssa_value(lhs), binop_str(*op), emit_ssa_value(rhs)))
        }
        SsaExpr::Unary { op, operand } => Ok(unop_expr(*op, emit_ssa_value(operand))),
        SsaExpr::Call { callee, args } => Ok(format!(
            "{}({})",
            mangle_path(callee),
            args.iter().map(emit_ssa_value).collect::<Vec<_>>().join(", ")
        )),
        SsaExpr::MethodCall { receiver, method, args } => {
            let recv = emit_ssa_value(receiver);
            let op = match receiver_type(receiver) {
                Some(t) => lower_type(t, mode, records)?.access_op(),
                None => ".",
            };
            Ok(format!(
                "{}{}{}({})",
                recv,
                op,
                method,
                args.iter().map(emit_ssa_value).collect::<Vec<_>>().join(", ")
            ))
        }
        SsaExpr::FieldAccess { receiver, field } => emit_field_access(receiver, field, mode, records),
        SsaExpr::Index { receiver, index } => {
            let recv = emit_ssa_value(receiver);
            let op = match receiver_type(receiver) {
                Some(t) => lower_type(t, mode, records)?.access_op(),
                None => ".",
            };
            Ok(format!("{}{}at({})", recv, op, emit_ssa_value(index)))
        }
        SsaExpr::New { class_name, args } => emit_new(class_name, args, mode, records, target_ty),
        SsaExpr::ArrayLiteral(items) => emit_array_literal(items, mode, records, target_ty),
        SsaExpr::Move(v) => {
            let inner = emit_ssa_value(v);
            Ok(if mode == MemoryMode::Ownership {
                format!("std::move({})", inner)
            } else {
                inner
            })
        }
        SsaExpr::Borrow(v) => Ok(emit_ssa_value(v)),
        SsaExpr::Await(v) => Ok(format!("co_await {}", emit_ssa_value(v))),
    }
}

fn emit_new(
    class_name: &str,
    args: &[SsaValue],
    mode: MemoryMode,
    records: &RecordRegistry,
    target_ty: Option<&IrType>,
) -> Result<String, CodegenError> {
    let arg_list = args.iter().map(emit_ssa_value).collect::<Vec<_>>().join(", ");
    if records.is_record(class_name) {
        return Ok(format!("{}{{{}}}", class_name, arg_list));
    }
    let qualified = mangle_path(class_name);
    let ownership = match target_ty {
        Some(IrType::Named(NamedType { ownership, .. })) => *ownership,
        _ => Ownership::Own,
    };
    Ok(match mode {
        MemoryMode::Gc => format!("vela::make_gc<{}>({})", qualified, arg_list),
        MemoryMode::Ownership => match ownership {
            Ownership::Own => format!("std::make_unique<{}>({})", qualified, arg_list),
            Ownership::Share => format!("std::make_shared<{}>({})", qualified, arg_list),
            Ownership::Use | Ownership::Value => format!("new {}({})", qualified, arg_list),
        },
    })
}

fn emit_array_literal(
    items: &[SsaValue],
    mode: MemoryMode,
    records: &RecordRegistry,
    target_ty: Option<&IrType>,
) -> Result<String, CodegenError> {
    let item_list = items.iter().map(emit_ssa_value).collect::<Vec<_>>().join(", ");
    match target_ty {
        Some(array_ty @ IrType::Array(_)) => {
            let ty = lower_type(array_ty, mode, records)?;
            Ok(format!("{}{{{}}}", ty.spelling, item_list))
        }
        _ => Ok(format!("vela::make_array({{{}}})", item_list)),
    }
}

fn binop_str(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Eq | BinaryOp::WeakEq => "==",
        BinaryOp::NotEq | BinaryOp::WeakNotEq => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "&&",
        BinaryOp::Or => "||",
    }
}

fn unop_expr(op: UnaryOp, operand: String) -> String {
    match op {
        UnaryOp::Not => format!("(!{})", operand),
        UnaryOp::Neg => format!("(-{})", operand),
        UnaryOp::Plus => format!("(+{})", operand),
        UnaryOp::Typeof => format!("vela::typeof_str({})", operand),
        UnaryOp::Void => "vela::Void{}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{ArrayType, BlockId, Primitive, StatementBlock};

    fn var(name: &str, version: u32, ty: IrType) -> Variable {
        Variable::new(name, version, ty)
    }

    #[test]
    fn field_access_on_named_receiver_named_size_stays_plain() {
        let records = RecordRegistry::new();
        let receiver = SsaValue::Var(var("w", 0, IrType::Named(NamedType::new("Widget", Ownership::Own))));
        let result = emit_field_access(&receiver, "size", MemoryMode::Ownership, &records).unwrap();
        assert_eq!(result, "w_0->size");
    }

    #[test]
    fn field_access_on_array_receiver_named_size_becomes_a_call() {
        let records = RecordRegistry::new();
        let receiver = SsaValue::Var(var(
            "xs",
            0,
            IrType::Array(Box::new(ArrayType {
                element: IrType::Primitive(Primitive::Integer),
                ownership: Ownership::Own,
            })),
        ));
        let result = emit_field_access(&receiver, "size", MemoryMode::Ownership, &records).unwrap();
        assert_eq!(result, "xs_0.size()");
    }

    #[test]
    fn array_receiver_field_not_in_accessor_list_stays_plain() {
        let records = RecordRegistry::new();
        let receiver = SsaValue::Var(var(
            "xs",
            0,
            IrType::Array(Box::new(ArrayType {
                element: IrType::Primitive(Primitive::Integer),
                ownership: Ownership::Own,
            })),
        ));
        let result = emit_field_access(&receiver, "capacity", MemoryMode::Ownership, &records).unwrap();
        assert_eq!(result, "xs_0.capacity");
    }

    #[test]
    fn move_under_ownership_mode_wraps_std_move() {
        let records = RecordRegistry::new();
        let v = SsaValue::Var(var("w", 0, IrType::Primitive(Primitive::Integer)));
        let out = emit_ssa_expr(&SsaExpr::Move(v), MemoryMode::Ownership, &records, None).unwrap();
        assert_eq!(out, "std::move(w_0)");
    }

    #[test]
    fn move_under_gc_mode_is_a_no_op() {
        let records = RecordRegistry::new();
        let v = SsaValue::Var(var("w", 0, IrType::Primitive(Primitive::Integer)));
        let out = emit_ssa_expr(&SsaExpr::Move(v), MemoryMode::Gc, &records, None).unwrap();
        assert_eq!(out, "w_0");
    }

    #[test]
    fn simple_function_emits_goto_chain() {
        let records = RecordRegistry::new();
        let ssa = SsaBody {
            entry: BlockId(0),
            blocks: vec![{
                let mut b = BasicBlock::new(BlockId(0));
                b.instructions.push(Instruction::Assign {
                    target: var("n", 0, IrType::Primitive(Primitive::Integer)),
                    value: SsaExpr::Value(SsaValue::Const(ConstValue::Integer(1))),
                });
                b.terminator = Terminator::Return(Some(SsaValue::Var(var("n", 0, IrType::Primitive(Primitive::Integer)))));
                b
            }],
        };
        let f = FunctionDecl {
            name: "one".into(),
            params: vec![],
            return_type: IrType::Primitive(Primitive::Integer),
            body: FunctionBody::Ssa(ssa),
            is_async: false,
            location: None,
        };
        let (decl, def) = emit_function(&f, MemoryMode::Gc, &records).unwrap();
        assert_eq!(decl, "int32_t one();");
        assert!(def.contains("goto bb0;"));
        assert!(def.contains("int32_t n_0 = 1;"));
        assert!(def.contains("return n_0;"));
    }

    #[test]
    fn tree_body_reaching_codegen_is_an_internal_error() {
        let records = RecordRegistry::new();
        let f = FunctionDecl {
            name: "f".into(),
            params: vec![],
            return_type: IrType::void(),
            body: FunctionBody::Tree(StatementBlock::empty()),
            is_async: false,
            location: None,
        };
        let result = emit_function(&f, MemoryMode::Gc, &records);
        assert!(matches!(result, Err(CodegenError::Internal(_))));
    }

    #[test]
    fn async_function_wraps_return_in_task_and_uses_co_return() {
        let records = RecordRegistry::new();
        let ssa = SsaBody {
            entry: BlockId(0),
            blocks: vec![{
                let mut b = BasicBlock::new(BlockId(0));
                b.terminator = Terminator::Return(Some(SsaValue::Const(ConstValue::Integer(0))));
                b
            }],
        };
        let f = FunctionDecl {
            name: "fetch".into(),
            params: vec![],
            return_type: IrType::Primitive(Primitive::Integer),
            body: FunctionBody::Ssa(ssa),
            is_async: true,
            location: None,
        };
        let (decl, def) = emit_function(&f, MemoryMode::Gc, &records).unwrap();
        assert_eq!(decl, "vela::Task<int32_t> fetch();");
        assert!(def.contains("co_return 0;"));
    }
}
