//! End-to-end backend tests: build a small `Program` by hand, run it through
//! `vela_codegen::compile`, and assert on the generated C++ text. No C++
//! toolchain is invoked anywhere in this suite -- the text itself is the
//! observable output (spec §8: "the codegen snapshot tests" leg of the
//! three-way equivalence check).

use vela_codegen::{compile, CompileConfig, OptLevel};
use vela_ir::{
    BasicBlock, BlockId, ClassDecl, ConstValue, Decl, FieldDecl, FunctionBody, FunctionDecl,
    Import, Instruction, IrType, MemoryMode, Module, NamedType, Ownership, Primitive, Program,
    SsaBody, SsaExpr, SsaValue, Terminator, TypeRegistry, Variable,
};

fn block(id: u32, instructions: Vec<Instruction>, terminator: Terminator) -> BasicBlock {
    let mut b = BasicBlock::new(BlockId(id));
    b.instructions = instructions;
    b.terminator = terminator;
    b
}

#[test]
fn simple_arithmetic_function_emits_expected_header_and_source() {
    let ssa = SsaBody {
        entry: BlockId(0),
        blocks: vec![block(
            0,
            vec![Instruction::Assign {
                target: Variable::new("sum", 0, IrType::Primitive(Primitive::Integer)),
                value: SsaExpr::Binary {
                    op: vela_ir::BinaryOp::Add,
                    lhs: SsaValue::Const(ConstValue::Integer(2)),
                    rhs: SsaValue::Const(ConstValue::Integer(3)),
                },
            }],
            Terminator::Return(Some(SsaValue::Var(Variable::new(
                "sum",
                0,
                IrType::Primitive(Primitive::Integer),
            )))),
        )],
    };
    let mut module = Module::new("app");
    module.declarations.push(Decl::Function(FunctionDecl {
        name: "main".to_string(),
        params: vec![],
        return_type: IrType::Primitive(Primitive::Integer),
        body: FunctionBody::Ssa(ssa),
        is_async: false,
        location: None,
    }));
    let program = Program::new(vec![module]);
    let registry = TypeRegistry::new();
    let config = CompileConfig::default();

    let result = compile(&program, &registry, &config).unwrap();

    let header = result.files.iter().find(|f| f.path == "app.h").unwrap();
    assert!(header.contents.contains("int32_t main();"));
    assert!(header.contents.contains("#include \"vela_runtime.hpp\""));

    let source = result.files.iter().find(|f| f.path == "app.cpp").unwrap();
    assert!(source.contents.contains("goto bb0;"));
    assert!(source.contents.contains("int32_t sum_0 = (2 + 3);"));
    assert!(source.contents.contains("return sum_0;"));

    let main_cpp = result.files.iter().find(|f| f.path == "main.cpp").unwrap();
    assert!(main_cpp.contents.contains("app::main();"));
}

#[test]
fn class_with_constructor_emits_out_of_line_definition_via_tree_to_ssa() {
    let ctor_body = vela_ir::StatementBlock::new(vec![vela_ir::Stmt::FieldAssign {
        receiver: vela_ir::Expr::This,
        field: "count".to_string(),
        value: vela_ir::Expr::Literal(ConstValue::Integer(0)),
    }]);
    let class = ClassDecl {
        name: "Counter".to_string(),
        fields: vec![FieldDecl {
            name: "count".to_string(),
            ty: IrType::Primitive(Primitive::Integer),
            readonly: false,
            initializer: None,
        }],
        methods: vec![],
        constructor: Some(vela_ir::ConstructorDecl { params: vec![], body: ctor_body }),
        parent: None,
        implements: vec![],
        type_params: vec![],
        location: None,
    };
    let mut module = Module::new("app");
    module.declarations.push(Decl::Class(class));
    module.declarations.push(Decl::Function(FunctionDecl {
        name: "main".to_string(),
        params: vec![],
        return_type: IrType::void(),
        body: FunctionBody::Ssa(SsaBody {
            entry: BlockId(0),
            blocks: vec![block(0, vec![], Terminator::Return(None))],
        }),
        is_async: false,
        location: None,
    }));
    let program = Program::new(vec![module]);
    let registry = TypeRegistry::new();
    let config = CompileConfig::default();

    let result = compile(&program, &registry, &config).unwrap();
    let header = result.files.iter().find(|f| f.path == "app.h").unwrap();
    assert!(header.contents.contains("struct Counter {"));
    assert!(header.contents.contains("int32_t count;"));
    assert!(header.contents.contains("Counter();"));

    let source = result.files.iter().find(|f| f.path == "app.cpp").unwrap();
    assert!(source.contents.contains("Counter::Counter()"));
    assert!(source.contents.contains("this_0.count = 0;"));
}

#[test]
fn ownership_mode_own_class_field_lowers_to_unique_ptr() {
    let class = ClassDecl {
        name: "Node".to_string(),
        fields: vec![FieldDecl {
            name: "next".to_string(),
            ty: IrType::Named(NamedType::new("Node", Ownership::Own)),
            readonly: false,
            initializer: None,
        }],
        methods: vec![],
        constructor: None,
        parent: None,
        implements: vec![],
        type_params: vec![],
        location: None,
    };
    let mut module = Module::new("app");
    module.declarations.push(Decl::Class(class));
    module.declarations.push(Decl::Function(FunctionDecl {
        name: "main".to_string(),
        params: vec![],
        return_type: IrType::void(),
        body: FunctionBody::Ssa(SsaBody {
            entry: BlockId(0),
            blocks: vec![block(0, vec![], Terminator::Return(None))],
        }),
        is_async: false,
        location: None,
    }));
    let program = Program::new(vec![module]);
    let registry = TypeRegistry::new();
    let config = CompileConfig { memory_mode: MemoryMode::Ownership, ..CompileConfig::default() };

    let result = compile(&program, &registry, &config).unwrap();
    let header = result.files.iter().find(|f| f.path == "app.h").unwrap();
    assert!(header.contents.contains("std::unique_ptr<Node> next;"));
}

#[test]
fn filesystem_import_gates_fs_header_across_all_modules() {
    let mut fs_module = Module::new("io/files");
    fs_module.imports.push(Import::new("fs", vec![]));
    fs_module.declarations.push(Decl::Function(FunctionDecl {
        name: "noop".to_string(),
        params: vec![],
        return_type: IrType::void(),
        body: FunctionBody::Ssa(SsaBody {
            entry: BlockId(0),
            blocks: vec![block(0, vec![], Terminator::Return(None))],
        }),
        is_async: false,
        location: None,
    }));
    let mut main_module = Module::new("app");
    main_module.declarations.push(Decl::Function(FunctionDecl {
        name: "main".to_string(),
        params: vec![],
        return_type: IrType::void(),
        body: FunctionBody::Ssa(SsaBody {
            entry: BlockId(0),
            blocks: vec![block(0, vec![], Terminator::Return(None))],
        }),
        is_async: false,
        location: None,
    }));
    let program = Program::new(vec![fs_module, main_module]);
    let registry = TypeRegistry::new();
    let config = CompileConfig::default();

    let result = compile(&program, &registry, &config).unwrap();
    let fs_header = result.files.iter().find(|f| f.path == "io/files.h").unwrap();
    assert!(fs_header.contents.contains("vela_fs.hpp"));
    let app_header = result.files.iter().find(|f| f.path == "app.h").unwrap();
    assert!(app_header.contents.contains("vela_fs.hpp"));
}

#[test]
fn explicit_entry_function_overrides_default_selection() {
    let mut module = Module::new("app");
    module.declarations.push(Decl::Function(FunctionDecl {
        name: "main".to_string(),
        params: vec![],
        return_type: IrType::void(),
        body: FunctionBody::Ssa(SsaBody {
            entry: BlockId(0),
            blocks: vec![block(0, vec![], Terminator::Return(None))],
        }),
        is_async: false,
        location: None,
    }));
    module.declarations.push(Decl::Function(FunctionDecl {
        name: "run".to_string(),
        params: vec![],
        return_type: IrType::void(),
        body: FunctionBody::Ssa(SsaBody {
            entry: BlockId(0),
            blocks: vec![block(0, vec![], Terminator::Return(None))],
        }),
        is_async: false,
        location: None,
    }));
    let program = Program::new(vec![module]);
    let registry = TypeRegistry::new();
    let config = CompileConfig { entry_function: Some("run".to_string()), ..CompileConfig::default() };

    let result = compile(&program, &registry, &config).unwrap();
    let main_cpp = result.files.iter().find(|f| f.path == "main.cpp").unwrap();
    assert!(main_cpp.contents.contains("app::run();"));
    assert!(!main_cpp.contents.contains("app::main();"));
}

#[test]
fn opt_level_is_recorded_but_never_drives_a_local_toolchain_invocation() {
    // vela-codegen only emits text; opt_level is carried for an external
    // driver to consume (spec §6.5). This is a type-level assertion that
    // OptLevel exists with the documented variants, not a behavioral check.
    let levels = [OptLevel::O0, OptLevel::O1, OptLevel::O2, OptLevel::O3];
    assert_eq!(levels.len(), 4);
}

/// Snapshot of the generated `main.cpp` for a trivial single-module program
/// (spec §8: "the codegen snapshot tests" leg of the equivalence check, used
/// here as a structural check on generated source since no C++ toolchain is
/// invoked).
#[test]
fn main_cpp_snapshot_for_trivial_entry_point() {
    let mut module = Module::new("app");
    module.declarations.push(Decl::Function(FunctionDecl {
        name: "main".to_string(),
        params: vec![],
        return_type: IrType::void(),
        body: FunctionBody::Ssa(SsaBody {
            entry: BlockId(0),
            blocks: vec![block(0, vec![], Terminator::Return(None))],
        }),
        is_async: false,
        location: None,
    }));
    let program = Program::new(vec![module]);
    let registry = TypeRegistry::new();
    let config = CompileConfig::default();

    let result = compile(&program, &registry, &config).unwrap();
    let main_cpp = result.files.iter().find(|f| f.path == "main.cpp").unwrap();

    insta::assert_snapshot!(main_cpp.contents, @r###"
    #include "vela_runtime.hpp"
    #include "app.h"

    int main() {
        app::main();
        return 0;
    }
    "###);
}
