//! Interpreter state: configuration, call stack, and lifecycle tracking.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use vela_ir::{ClassDecl, ConstDecl, Decl, FunctionDecl, Program};

use crate::error::RuntimeError;
use crate::value::Value;

/// `Ready -> Running -> (Completed | Error)`. There is no `Paused` variant:
/// unlike the graph interpreter this one is grounded on, the tree-walker
/// runs a call to completion synchronously -- see [`crate::eval`]'s handling
/// of `await`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionState {
    Ready,
    Running,
    Completed { result: Value },
    Error { error: RuntimeError },
}

/// One function invocation's local scope.
#[derive(Debug, Clone, Default)]
pub struct CallFrame {
    pub function_name: String,
    pub locals: HashMap<String, Value>,
    pub depth: usize,
}

impl CallFrame {
    pub fn new(function_name: impl Into<String>, depth: usize) -> Self {
        CallFrame {
            function_name: function_name.into(),
            locals: HashMap::new(),
            depth,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpreterConfig {
    pub trace_enabled: bool,
    pub max_recursion_depth: usize,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            trace_enabled: false,
            max_recursion_depth: 256,
        }
    }
}

/// Flattened, name-indexed view of a [`Program`]'s top-level declarations,
/// built once per `Interpreter::new` call so every subsequent lookup is O(1)
/// instead of a linear scan over every module.
///
/// `consts` starts empty at `build()` time -- module-level `const`
/// initializers can reference earlier consts and in general need the same
/// expression evaluator function bodies do, so `Interpreter::new` evaluates
/// them afterward (see `Interpreter::eval_module_consts` in `eval.rs`) and
/// fills this map in declaration order.
pub(crate) struct DeclTable {
    pub functions: HashMap<String, FunctionDecl>,
    pub classes: HashMap<String, ClassDecl>,
    pub const_decls: Vec<ConstDecl>,
    pub consts: HashMap<String, Value>,
}

impl DeclTable {
    pub(crate) fn build(program: &Program) -> Self {
        let mut functions = HashMap::new();
        let mut classes = HashMap::new();
        let mut const_decls = Vec::new();
        for (_, decl) in program.all_decls() {
            match decl {
                Decl::Function(f) => {
                    functions.entry(f.name.clone()).or_insert_with(|| f.clone());
                }
                Decl::Class(c) => {
                    classes.entry(c.name.clone()).or_insert_with(|| c.clone());
                }
                Decl::Const(c) => const_decls.push(c.clone()),
                _ => {}
            }
        }
        DeclTable { functions, classes, const_decls, consts: HashMap::new() }
    }
}

/// Owns a program and executes it by walking the tree tier. Holds no
/// reference to its input -- a `Program` is cheap to construct from a JSON
/// front end and the interpreter is typically a one-shot `check` run (spec
/// §6.1, §8 equivalence harness), so an owned copy keeps the lifetime
/// simple.
pub struct Interpreter {
    pub(crate) program: Program,
    pub(crate) decls: DeclTable,
    pub(crate) state: ExecutionState,
    pub(crate) call_stack: Vec<CallFrame>,
    pub config: InterpreterConfig,
    pub(crate) trace: Option<Vec<crate::trace::TraceEntry>>,
    pub(crate) stdout: Vec<String>,
}

impl Interpreter {
    pub fn new(program: Program, config: InterpreterConfig) -> Self {
        let decls = DeclTable::build(&program);
        let trace = if config.trace_enabled {
            Some(Vec::new())
        } else {
            None
        };
        let mut interp = Interpreter {
            program,
            decls,
            state: ExecutionState::Ready,
            call_stack: Vec::new(),
            config,
            trace,
            stdout: Vec::new(),
        };
        interp.eval_module_consts();
        interp
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Lines written by `print` calls during the run, in call order.
    pub fn stdout(&self) -> &[String] {
        &self.stdout
    }

    pub fn trace(&self) -> Option<&[crate::trace::TraceEntry]> {
        self.trace.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{ConstDecl, ConstValue, Expr, FunctionBody, IrType, Module, Primitive, StatementBlock};

    fn sample_program() -> Program {
        let func = FunctionDecl {
            name: "answer".into(),
            params: vec![],
            return_type: IrType::Primitive(Primitive::Integer),
            body: FunctionBody::Tree(StatementBlock::new(vec![])),
            is_async: false,
            location: None,
        };
        let konst = ConstDecl {
            name: "X".into(),
            ty: IrType::Primitive(Primitive::Integer),
            init: Expr::Literal(ConstValue::Integer(1)),
            location: None,
        };
        let mut module = Module::new("main");
        module.declarations.push(Decl::Function(func));
        module.declarations.push(Decl::Const(konst));
        Program::new(vec![module])
    }

    #[test]
    fn decl_table_indexes_functions_by_name() {
        let table = DeclTable::build(&sample_program());
        assert!(table.functions.contains_key("answer"));
        assert!(table.classes.is_empty());
    }

    #[test]
    fn interpreter_starts_ready() {
        let interp = Interpreter::new(sample_program(), InterpreterConfig::default());
        assert_eq!(interp.state(), &ExecutionState::Ready);
    }

    #[test]
    fn trace_is_none_unless_enabled() {
        let interp = Interpreter::new(sample_program(), InterpreterConfig::default());
        assert!(interp.trace().is_none());

        let config = InterpreterConfig {
            trace_enabled: true,
            ..Default::default()
        };
        let interp = Interpreter::new(sample_program(), config);
        assert_eq!(interp.trace(), Some(&[][..]));
    }
}
