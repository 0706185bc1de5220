//! Tree-walking evaluation: statements and expressions over `vela_ir::ast`.
//!
//! Control flow (`if`/`while`/`for`/`break`/`continue`/`return`/`throw`) is
//! modeled with [`Flow`], the same "what happens after this statement"
//! signal a recursive-descent interpreter needs instead of a work-list.

use std::collections::HashMap;
use std::rc::Rc;

use vela_ir::{
    BinaryOp, ClassDecl, Expr, FunctionBody, FunctionDecl, IncDecOp, Stmt, StatementBlock, UnaryOp,
};

use crate::error::RuntimeError;
use crate::state::{CallFrame, Interpreter};
use crate::value::{ClosureValue, Value};

/// What a statement (or block of statements) does to control flow.
pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
    Throw(Value),
}

impl Interpreter {
    /// Evaluates every module-level `const`'s initializer, in declaration
    /// order, and fills `decls.consts`. Runs once from `Interpreter::new`
    /// with an empty call frame pushed so `Expr::Identifier` lookups inside
    /// an initializer see only earlier consts, never a caller's locals
    /// (spec §8 scenario 3: `const a = 2+3*4; const b = !!true; const c =
    /// "Hi"+", "+"world";` must evaluate, not just parse).
    ///
    /// A failing initializer puts the interpreter straight into
    /// `ExecutionState::Error` -- there is no well-formed "ready" state for
    /// a program whose top-level consts don't evaluate, so `call_function`
    /// checks for this and refuses to run anything.
    pub(crate) fn eval_module_consts(&mut self) {
        let decls = std::mem::take(&mut self.decls.const_decls);
        self.call_stack.push(CallFrame::new("<module-consts>", 0));
        for decl in &decls {
            match self.eval_expr(&decl.init) {
                Ok(value) => {
                    self.decls.consts.insert(decl.name.clone(), value);
                }
                Err(error) => {
                    self.call_stack.pop();
                    self.decls.const_decls = decls;
                    self.state = crate::state::ExecutionState::Error { error };
                    return;
                }
            }
        }
        self.call_stack.pop();
        self.decls.const_decls = decls;
    }

    /// Invokes a top-level function by name with already-evaluated
    /// arguments. This is the entry point `vela-cli`'s `check` subcommand
    /// uses (spec §6.1, §9 open question on the `check` surface).
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if let crate::state::ExecutionState::Error { error } = &self.state {
            return Err(error.clone());
        }
        let func = self
            .decls
            .functions
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::FunctionNotFound {
                name: name.to_string(),
            })?;
        self.state = crate::state::ExecutionState::Running;
        let result = self.invoke(&func, args, HashMap::new());
        match &result {
            Ok(v) => self.state = crate::state::ExecutionState::Completed { result: v.clone() },
            Err(e) => self.state = crate::state::ExecutionState::Error { error: e.clone() },
        }
        result
    }

    fn invoke(
        &mut self,
        func: &FunctionDecl,
        args: Vec<Value>,
        captures: HashMap<String, Value>,
    ) -> Result<Value, RuntimeError> {
        let depth = self.call_stack.len();
        if depth >= self.config.max_recursion_depth {
            return Err(RuntimeError::RecursionLimitExceeded {
                limit: self.config.max_recursion_depth,
            });
        }
        let mut frame = CallFrame::new(func.name.clone(), depth);
        for (name, value) in captures {
            frame.locals.insert(name, value);
        }
        for (param, value) in func.params.iter().zip(args.into_iter()) {
            frame.locals.insert(param.name.clone(), value);
        }
        self.call_stack.push(frame);

        let body = match &func.body {
            FunctionBody::Tree(block) => block.clone(),
            FunctionBody::Ssa(_) => {
                self.call_stack.pop();
                return Err(RuntimeError::InternalError {
                    message: format!("function '{}' has no tree-tier body to interpret", func.name),
                });
            }
        };

        let flow = self.eval_block(&body)?;
        self.call_stack.pop();

        let mut result = match flow {
            Flow::Return(v) => v,
            Flow::Normal => Value::Void,
            Flow::Break | Flow::Continue => {
                return Err(RuntimeError::InternalError {
                    message: "break/continue escaped function body".to_string(),
                })
            }
            Flow::Throw(v) => {
                return Err(RuntimeError::UncaughtException {
                    message: v.display(),
                })
            }
        };

        // Async functions are always coroutine-shaped per spec §5; the
        // interpreter has no scheduler, so it settles the promise eagerly.
        if func.is_async {
            result = Value::Promise(Box::new(result));
        }
        Ok(result)
    }

    fn eval_block(&mut self, block: &StatementBlock) -> Result<Flow, RuntimeError> {
        for stmt in &block.statements {
            match self.eval_stmt(stmt)? {
                Flow::Normal => continue,
                other => return Ok(other),
            }
        }
        Ok(Flow::Normal)
    }

    fn eval_stmt(&mut self, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                let value = match init {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Void,
                };
                self.set_local(name, value);
                Ok(Flow::Normal)
            }
            Stmt::Expr(expr) => {
                self.eval_expr(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let v = match value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(v))
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval_expr(cond)?.is_truthy() {
                    self.eval_block(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.eval_block(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { cond, body } => {
                while self.eval_expr(cond)?.is_truthy() {
                    match self.eval_block(body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => continue,
                        other @ (Flow::Return(_) | Flow::Throw(_)) => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    match self.eval_stmt(init)? {
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
                loop {
                    if let Some(cond) = cond {
                        if !self.eval_expr(cond)?.is_truthy() {
                            break;
                        }
                    }
                    match self.eval_block(body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        other @ (Flow::Return(_) | Flow::Throw(_)) => return Ok(other),
                    }
                    if let Some(step) = step {
                        match self.eval_stmt(step)? {
                            Flow::Normal => {}
                            other => return Ok(other),
                        }
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::ForOf {
                binding,
                iterable,
                body,
                ..
            } => {
                let items = match self.eval_expr(iterable)? {
                    Value::Array(items) => items,
                    other => {
                        return Err(RuntimeError::TypeMismatchAtRuntime {
                            expected: "array".to_string(),
                            got: other.type_name().to_string(),
                        })
                    }
                };
                for item in items {
                    self.set_local(binding, item);
                    match self.eval_block(body)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => continue,
                        other @ (Flow::Return(_) | Flow::Throw(_)) => return Ok(other),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::TryCatchFinally {
                try_block,
                catch_binding,
                catch_block,
                finally_block,
            } => {
                let outcome = self.eval_block(try_block)?;
                let after_catch = match outcome {
                    Flow::Throw(value) => {
                        if let Some(catch_block) = catch_block {
                            if let Some(binding) = catch_binding {
                                self.set_local(binding, value);
                            }
                            self.eval_block(catch_block)?
                        } else {
                            Flow::Throw(value)
                        }
                    }
                    other => other,
                };
                if let Some(finally_block) = finally_block {
                    match self.eval_block(finally_block)? {
                        Flow::Normal => Ok(after_catch),
                        other => Ok(other),
                    }
                } else {
                    Ok(after_catch)
                }
            }
            Stmt::Throw(expr) => {
                let value = self.eval_expr(expr)?;
                Ok(Flow::Throw(value))
            }
            Stmt::Break => Ok(Flow::Break),
            Stmt::Continue => Ok(Flow::Continue),
            Stmt::Block(block) => self.eval_block(block),
            Stmt::FieldAssign {
                receiver,
                field,
                value,
            } => {
                let value = self.eval_expr(value)?;
                self.assign_field(receiver, field, value)?;
                Ok(Flow::Normal)
            }
            Stmt::IndexAssign {
                receiver,
                index,
                value,
            } => {
                let idx = self.eval_expr(index)?;
                let value = self.eval_expr(value)?;
                self.assign_index(receiver, idx, value)?;
                Ok(Flow::Normal)
            }
            Stmt::NestedFunction(decl) => {
                // Hoisted-eligible functions have already been promoted to
                // module scope by `vela-opt` before this stage runs; any
                // nested function still here is captured-recursive and
                // diagnosed there (spec §4.6, §9 open question), so the
                // interpreter treats it as a plain closure binding.
                let closure = Value::Closure(Rc::new(ClosureValue {
                    params: decl.params.clone(),
                    body: match &decl.body {
                        FunctionBody::Tree(b) => b.clone(),
                        FunctionBody::Ssa(_) => StatementBlock::empty(),
                    },
                    captures: self.current_locals().clone(),
                }));
                self.set_local(&decl.name, closure);
                Ok(Flow::Normal)
            }
            Stmt::Switch { discriminant, cases } => {
                let value = self.eval_expr(discriminant)?;
                let mut matched = false;
                for case in cases {
                    if !matched {
                        matched = match &case.test {
                            None => true,
                            Some(test) => self.eval_expr(test)? == value,
                        };
                    }
                    if matched {
                        for stmt in &case.body {
                            match self.eval_stmt(stmt)? {
                                Flow::Normal => {}
                                Flow::Break => return Ok(Flow::Normal),
                                other => return Ok(other),
                            }
                        }
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::CompoundAssign { name, op, value, .. } => {
                let lhs = self.lookup(name)?;
                let rhs = self.eval_expr(value)?;
                let result = eval_binary(*op, lhs, rhs)?;
                self.set_local(name, result);
                Ok(Flow::Normal)
            }
            Stmt::With(_) | Stmt::ForIn { .. } | Stmt::Delete(_) => Err(RuntimeError::InternalError {
                message: "construct rejected by the validator reached the interpreter".into(),
            }),
        }
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(cv) => Ok(Value::from_const(cv)),
            Expr::Identifier(name) => self.lookup(name),
            Expr::Binary { op, lhs, rhs } => {
                let l = self.eval_expr(lhs)?;
                let r = self.eval_expr(rhs)?;
                eval_binary(*op, l, r)
            }
            Expr::Unary { op, operand } => {
                let v = self.eval_expr(operand)?;
                eval_unary(*op, v)
            }
            Expr::IncDec { op, target, .. } => {
                let current = self.eval_expr(target)?;
                let delta = match op {
                    IncDecOp::Increment => 1,
                    IncDecOp::Decrement => -1,
                };
                let updated = add_delta(current, delta)?;
                if let Expr::Identifier(name) = target.as_ref() {
                    self.set_local(name, updated.clone());
                }
                Ok(updated)
            }
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval_expr(cond)?.is_truthy() {
                    self.eval_expr(then_expr)
                } else {
                    self.eval_expr(else_expr)
                }
            }
            Expr::Call { callee, args } => {
                let arg_values = args
                    .iter()
                    .map(|a| self.eval_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.eval_call(callee, arg_values)
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let recv = self.eval_expr(receiver)?;
                let arg_values = args
                    .iter()
                    .map(|a| self.eval_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.eval_method_call(recv, method, arg_values)
            }
            Expr::Member { receiver, property } => {
                let recv = self.eval_expr(receiver)?;
                match recv {
                    Value::Object { fields, .. } => fields
                        .into_iter()
                        .find(|(name, _)| name == property)
                        .map(|(_, v)| v)
                        .ok_or_else(|| RuntimeError::NoSuchField {
                            field: property.clone(),
                        }),
                    Value::Null => Err(RuntimeError::NullDereference {}),
                    other => Err(RuntimeError::TypeMismatchAtRuntime {
                        expected: "object".to_string(),
                        got: other.type_name().to_string(),
                    }),
                }
            }
            Expr::Index { receiver, index } => {
                let recv = self.eval_expr(receiver)?;
                let idx = self.eval_expr(index)?;
                match recv {
                    Value::Array(items) => {
                        let i = index_as_i64(&idx)?;
                        if i < 0 || i as usize >= items.len() {
                            Err(RuntimeError::OutOfBoundsAccess {
                                index: i,
                                size: items.len(),
                            })
                        } else {
                            Ok(items[i as usize].clone())
                        }
                    }
                    other => Err(RuntimeError::TypeMismatchAtRuntime {
                        expected: "array".to_string(),
                        got: other.type_name().to_string(),
                    }),
                }
            }
            Expr::New { class_name, args } => {
                let arg_values = args
                    .iter()
                    .map(|a| self.eval_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                self.instantiate(class_name, arg_values)
            }
            Expr::ArrayLiteral(items) => {
                let values = items
                    .iter()
                    .map(|i| self.eval_expr(i))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(values))
            }
            Expr::ObjectLiteral { fields, .. } => {
                let mut out = Vec::with_capacity(fields.len());
                for (name, expr) in fields {
                    out.push((name.clone(), self.eval_expr(expr)?));
                }
                Ok(Value::Object {
                    class_name: "object".to_string(),
                    fields: out,
                })
            }
            Expr::Lambda {
                params,
                body,
                captures,
            } => {
                let mut captured = HashMap::new();
                for capture in captures {
                    let value = self.lookup(&capture.name).unwrap_or(Value::Void);
                    captured.insert(capture.name.clone(), value);
                }
                Ok(Value::Closure(Rc::new(ClosureValue {
                    params: params.clone(),
                    body: (**body).clone(),
                    captures: captured,
                })))
            }
            Expr::Await(inner) => {
                // Eagerly resolved: see `invoke`'s comment on async lowering.
                match self.eval_expr(inner)? {
                    Value::Promise(v) => Ok(*v),
                    other => Ok(other),
                }
            }
            Expr::TemplateConcat { head, segments } => {
                let mut out = head.clone();
                for (expr, literal) in segments {
                    let v = self.eval_expr(expr)?;
                    out.push_str(&v.display());
                    out.push_str(literal);
                }
                Ok(Value::Str(out))
            }
            Expr::Move(inner) | Expr::Borrow(inner) => self.eval_expr(inner),
            Expr::This => self.lookup("this"),
            Expr::Comma(exprs) => {
                let mut last = Value::Void;
                for e in exprs {
                    last = self.eval_expr(e)?;
                }
                Ok(last)
            }
            Expr::DynamicEval(_) | Expr::ArgumentsObject | Expr::DynamicImport(_) => {
                Err(RuntimeError::InternalError {
                    message: "construct rejected by the validator reached the interpreter".into(),
                })
            }
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: Vec<Value>) -> Result<Value, RuntimeError> {
        if let Expr::Identifier(name) = callee {
            if name == "print" {
                let rendered = args
                    .iter()
                    .map(Value::display)
                    .collect::<Vec<_>>()
                    .join(" ");
                self.stdout.push(rendered);
                return Ok(Value::Void);
            }
            if let Some(value) = self.lookup_opt(name) {
                if let Value::Closure(closure) = value {
                    return self.invoke_closure(&closure, args);
                }
            }
            if let Some(func) = self.decls.functions.get(name).cloned() {
                return self.invoke(&func, args, HashMap::new());
            }
            return Err(RuntimeError::FunctionNotFound {
                name: name.to_string(),
            });
        }
        match self.eval_expr(callee)? {
            Value::Closure(closure) => self.invoke_closure(&closure, args),
            other => Err(RuntimeError::TypeMismatchAtRuntime {
                expected: "function".to_string(),
                got: other.type_name().to_string(),
            }),
        }
    }

    fn invoke_closure(
        &mut self,
        closure: &Rc<ClosureValue>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let depth = self.call_stack.len();
        if depth >= self.config.max_recursion_depth {
            return Err(RuntimeError::RecursionLimitExceeded {
                limit: self.config.max_recursion_depth,
            });
        }
        let mut frame = CallFrame::new("<closure>", depth);
        for (name, value) in &closure.captures {
            frame.locals.insert(name.clone(), value.clone());
        }
        for (param, value) in closure.params.iter().zip(args.into_iter()) {
            frame.locals.insert(param.name.clone(), value);
        }
        self.call_stack.push(frame);
        let flow = self.eval_block(&closure.body)?;
        self.call_stack.pop();
        match flow {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(Value::Void),
            Flow::Throw(v) => Err(RuntimeError::UncaughtException {
                message: v.display(),
            }),
            Flow::Break | Flow::Continue => Err(RuntimeError::InternalError {
                message: "break/continue escaped closure body".to_string(),
            }),
        }
    }

    fn eval_method_call(
        &mut self,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let class_name = match &receiver {
            Value::Object { class_name, .. } => class_name.clone(),
            other => {
                return Err(RuntimeError::TypeMismatchAtRuntime {
                    expected: "object".to_string(),
                    got: other.type_name().to_string(),
                })
            }
        };
        let class = self
            .decls
            .classes
            .get(&class_name)
            .cloned()
            .ok_or(RuntimeError::ClassNotFound { name: class_name })?;
        let method_decl = class
            .methods
            .iter()
            .find(|m| m.name == method)
            .cloned()
            .ok_or_else(|| RuntimeError::NoSuchField {
                field: method.to_string(),
            })?;
        let body = match &method_decl.body {
            FunctionBody::Tree(b) => b.clone(),
            FunctionBody::Ssa(_) => {
                return Err(RuntimeError::InternalError {
                    message: format!("method '{method}' has no tree-tier body to interpret"),
                })
            }
        };
        let depth = self.call_stack.len();
        if depth >= self.config.max_recursion_depth {
            return Err(RuntimeError::RecursionLimitExceeded {
                limit: self.config.max_recursion_depth,
            });
        }
        let mut frame = CallFrame::new(format!("{}.{}", class.name, method), depth);
        frame.locals.insert("this".to_string(), receiver);
        for (param, value) in method_decl.params.iter().zip(args.into_iter()) {
            frame.locals.insert(param.name.clone(), value);
        }
        self.call_stack.push(frame);
        let flow = self.eval_block(&body)?;
        self.call_stack.pop();
        match flow {
            Flow::Return(v) => Ok(v),
            Flow::Normal => Ok(Value::Void),
            Flow::Throw(v) => Err(RuntimeError::UncaughtException {
                message: v.display(),
            }),
            Flow::Break | Flow::Continue => Err(RuntimeError::InternalError {
                message: "break/continue escaped method body".to_string(),
            }),
        }
    }

    fn instantiate(&mut self, class_name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let class: ClassDecl =
            self.decls
                .classes
                .get(class_name)
                .cloned()
                .ok_or_else(|| RuntimeError::ClassNotFound {
                    name: class_name.to_string(),
                })?;

        let mut fields = Vec::new();
        for field in &class.fields {
            let default = match &field.initializer {
                Some(expr) => self.eval_expr(expr)?,
                None => Value::Null,
            };
            fields.push((field.name.clone(), default));
        }

        let this = Value::Object {
            class_name: class.name.clone(),
            fields,
        };

        if let Some(ctor) = &class.constructor {
            let depth = self.call_stack.len();
            if depth >= self.config.max_recursion_depth {
                return Err(RuntimeError::RecursionLimitExceeded {
                    limit: self.config.max_recursion_depth,
                });
            }
            let mut frame = CallFrame::new(format!("{}.constructor", class.name), depth);
            frame.locals.insert("this".to_string(), this);
            for (param, value) in ctor.params.iter().zip(args.into_iter()) {
                frame.locals.insert(param.name.clone(), value);
            }
            self.call_stack.push(frame);
            self.eval_block(&ctor.body)?;
            let frame = self.call_stack.pop().expect("frame pushed above");
            return Ok(frame.locals.get("this").cloned().unwrap_or(Value::Null));
        }

        Ok(this)
    }

    fn assign_field(&mut self, receiver: &Expr, field: &str, value: Value) -> Result<(), RuntimeError> {
        let (root, mut path) = self.resolve_path(receiver)?;
        path.push(PathSeg::Field(field.to_string()));
        self.apply_path(&root, &path, value)
    }

    fn assign_index(&mut self, receiver: &Expr, index: Value, value: Value) -> Result<(), RuntimeError> {
        let (root, mut path) = self.resolve_path(receiver)?;
        path.push(PathSeg::Index(index_as_i64(&index)?));
        self.apply_path(&root, &path, value)
    }

    /// Walks an assignment target down to its root local variable, building
    /// the member/index path from the root outward.
    fn resolve_path(&mut self, expr: &Expr) -> Result<(String, Vec<PathSeg>), RuntimeError> {
        match expr {
            Expr::Identifier(name) => Ok((name.clone(), Vec::new())),
            Expr::Member { receiver, property } => {
                let (root, mut path) = self.resolve_path(receiver)?;
                path.push(PathSeg::Field(property.clone()));
                Ok((root, path))
            }
            Expr::Index { receiver, index } => {
                let idx = self.eval_expr(index)?;
                let (root, mut path) = self.resolve_path(receiver)?;
                path.push(PathSeg::Index(index_as_i64(&idx)?));
                Ok((root, path))
            }
            _ => Err(RuntimeError::InternalError {
                message: "invalid assignment target".to_string(),
            }),
        }
    }

    fn apply_path(&mut self, root: &str, path: &[PathSeg], value: Value) -> Result<(), RuntimeError> {
        let frame = self
            .call_stack
            .last_mut()
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: root.to_string(),
            })?;
        let slot = frame
            .locals
            .get_mut(root)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: root.to_string(),
            })?;
        let (parents, last) = match path.split_last() {
            Some((last, parents)) => (parents, last),
            None => {
                *slot = value;
                return Ok(());
            }
        };
        let mut current = slot;
        for seg in parents {
            current = navigate_mut(current, seg)?;
        }
        match last {
            PathSeg::Field(name) => match current {
                Value::Object { fields, .. } => {
                    match fields.iter_mut().find(|(n, _)| n == name) {
                        Some((_, slot)) => *slot = value,
                        None => fields.push((name.clone(), value)),
                    }
                    Ok(())
                }
                other => Err(RuntimeError::TypeMismatchAtRuntime {
                    expected: "object".to_string(),
                    got: other.type_name().to_string(),
                }),
            },
            PathSeg::Index(i) => match current {
                Value::Array(items) => {
                    if *i < 0 || *i as usize >= items.len() {
                        Err(RuntimeError::OutOfBoundsAccess {
                            index: *i,
                            size: items.len(),
                        })
                    } else {
                        items[*i as usize] = value;
                        Ok(())
                    }
                }
                other => Err(RuntimeError::TypeMismatchAtRuntime {
                    expected: "array".to_string(),
                    got: other.type_name().to_string(),
                }),
            },
        }
    }

    fn current_locals(&self) -> HashMap<String, Value> {
        self.call_stack
            .last()
            .map(|f| f.locals.clone())
            .unwrap_or_default()
    }

    fn set_local(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.call_stack.last_mut() {
            frame.locals.insert(name.to_string(), value);
        }
    }

    /// Checks the current frame's locals first, then falls back to
    /// module-level consts (spec §8 scenario 3: `a`/`b`/`c` resolve even
    /// though no frame ever assigns them).
    fn lookup_opt(&self, name: &str) -> Option<Value> {
        self.call_stack
            .last()
            .and_then(|f| f.locals.get(name).cloned())
            .or_else(|| self.decls.consts.get(name).cloned())
    }

    fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        self.lookup_opt(name)
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }
}

enum PathSeg {
    Field(String),
    Index(i64),
}

fn navigate_mut<'v>(value: &'v mut Value, seg: &PathSeg) -> Result<&'v mut Value, RuntimeError> {
    match (value, seg) {
        (Value::Object { fields, .. }, PathSeg::Field(name)) => fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| RuntimeError::NoSuchField {
                field: name.clone(),
            }),
        (Value::Array(items), PathSeg::Index(i)) => {
            if *i < 0 || *i as usize >= items.len() {
                Err(RuntimeError::OutOfBoundsAccess {
                    index: *i,
                    size: items.len(),
                })
            } else {
                Ok(&mut items[*i as usize])
            }
        }
        (other, PathSeg::Field(name)) => Err(RuntimeError::TypeMismatchAtRuntime {
            expected: format!("object (for field '{name}')"),
            got: other.type_name().to_string(),
        }),
        (other, PathSeg::Index(_)) => Err(RuntimeError::TypeMismatchAtRuntime {
            expected: "array".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn index_as_i64(value: &Value) -> Result<i64, RuntimeError> {
    match value {
        Value::Integer(i) => Ok(*i as i64),
        Value::Integer53(i) => Ok(*i),
        Value::Number(n) => Ok(*n as i64),
        other => Err(RuntimeError::TypeMismatchAtRuntime {
            expected: "integer index".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn add_delta(value: Value, delta: i64) -> Result<Value, RuntimeError> {
    match value {
        Value::Integer(i) => i
            .checked_add(delta as i32)
            .map(Value::Integer)
            .ok_or(RuntimeError::IntegerOverflow),
        Value::Integer53(i) => i
            .checked_add(delta)
            .map(Value::Integer53)
            .ok_or(RuntimeError::IntegerOverflow),
        Value::Number(n) => Ok(Value::Number(n + delta as f64)),
        other => Err(RuntimeError::TypeMismatchAtRuntime {
            expected: "numeric".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Value::Boolean(!value.is_truthy())),
        UnaryOp::Neg => match value {
            Value::Integer(i) => i.checked_neg().map(Value::Integer).ok_or(RuntimeError::IntegerOverflow),
            Value::Integer53(i) => i.checked_neg().map(Value::Integer53).ok_or(RuntimeError::IntegerOverflow),
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(RuntimeError::TypeMismatchAtRuntime {
                expected: "numeric".to_string(),
                got: other.type_name().to_string(),
            }),
        },
        UnaryOp::Plus => match value {
            Value::Integer(_) | Value::Integer53(_) | Value::Number(_) => Ok(value),
            other => Err(RuntimeError::TypeMismatchAtRuntime {
                expected: "numeric".to_string(),
                got: other.type_name().to_string(),
            }),
        },
        UnaryOp::Typeof => {
            let name = match &value {
                Value::Null => "object",
                Value::Void => "undefined",
                Value::Boolean(_) => "boolean",
                Value::Integer(_) | Value::Integer53(_) | Value::Number(_) => "number",
                Value::Str(_) => "string",
                Value::Closure(_) => "function",
                Value::Array(_) | Value::Object { .. } | Value::Promise(_) => "object",
            };
            Ok(Value::Str(name.to_string()))
        }
        UnaryOp::Void => Ok(Value::Void),
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    use BinaryOp::*;
    match op {
        Add => numeric_or_concat(lhs, rhs, |a, b| a.checked_add(b), |a, b| a + b),
        Sub => numeric_op(lhs, rhs, |a, b| a.checked_sub(b), |a, b| a - b),
        Mul => numeric_op(lhs, rhs, |a, b| a.checked_mul(b), |a, b| a * b),
        Div => match (as_number(&lhs)?, as_number(&rhs)?) {
            (_, d) if d == 0.0 => Err(RuntimeError::DivideByZero),
            (n, d) => Ok(Value::Number(n / d)),
        },
        Rem => match (as_number(&lhs)?, as_number(&rhs)?) {
            (_, d) if d == 0.0 => Err(RuntimeError::DivideByZero),
            (n, d) => Ok(Value::Number(n % d)),
        },
        Eq | WeakEq => Ok(Value::Boolean(values_equal(&lhs, &rhs))),
        NotEq | WeakNotEq => Ok(Value::Boolean(!values_equal(&lhs, &rhs))),
        Lt => Ok(Value::Boolean(as_number(&lhs)? < as_number(&rhs)?)),
        Le => Ok(Value::Boolean(as_number(&lhs)? <= as_number(&rhs)?)),
        Gt => Ok(Value::Boolean(as_number(&lhs)? > as_number(&rhs)?)),
        Ge => Ok(Value::Boolean(as_number(&lhs)? >= as_number(&rhs)?)),
        And => Ok(if !lhs.is_truthy() { lhs } else { rhs }),
        Or => Ok(if lhs.is_truthy() { lhs } else { rhs }),
    }
}

fn numeric_or_concat(
    lhs: Value,
    rhs: Value,
    checked_i32: impl Fn(i32, i32) -> Option<i32>,
    f64_op: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    if let (Value::Str(_), _) | (_, Value::Str(_)) = (&lhs, &rhs) {
        return Ok(Value::Str(format!("{}{}", lhs.display(), rhs.display())));
    }
    numeric_op(lhs, rhs, checked_i32, f64_op)
}

fn numeric_op(
    lhs: Value,
    rhs: Value,
    checked_i32: impl Fn(i32, i32) -> Option<i32>,
    f64_op: impl Fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (&lhs, &rhs) {
        (Value::Integer(a), Value::Integer(b)) => {
            checked_i32(*a, *b).map(Value::Integer).ok_or(RuntimeError::IntegerOverflow)
        }
        (Value::Integer53(a), Value::Integer53(b)) => Ok(Value::Integer53(f64_op(*a as f64, *b as f64) as i64)),
        _ => Ok(Value::Number(f64_op(as_number(&lhs)?, as_number(&rhs)?))),
    }
}

fn as_number(value: &Value) -> Result<f64, RuntimeError> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Integer(i) => Ok(*i as f64),
        Value::Integer53(i) => Ok(*i as f64),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => Err(RuntimeError::TypeMismatchAtRuntime {
            expected: "numeric".to_string(),
            got: other.type_name().to_string(),
        }),
    }
}

/// `Some(n)` iff `value` is one of the numeric-representation kinds (spec
/// §3.6: `Integer`/`Integer53`/`Number` compare equal across kinds by
/// value, since they're all the same underlying number at different
/// precisions). Excludes `Boolean` deliberately -- unlike `as_number`
/// (used for arithmetic and ordering), equality must not coerce booleans
/// to numbers.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => Some(*n),
        Value::Integer(i) => Some(*i as f64),
        Value::Integer53(i) => Some(*i as f64),
        _ => None,
    }
}

/// Strict equality (spec §3.6): reference/value equality without
/// coercion, except that the three numeric-representation kinds compare
/// by value across each other.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) | (Value::Void, Value::Void) => true,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| values_equal(x, y))
        }
        (Value::Number(_) | Value::Integer(_) | Value::Integer53(_), _)
        | (_, Value::Number(_) | Value::Integer(_) | Value::Integer53(_)) => {
            numeric_value(lhs).zip(numeric_value(rhs)).map(|(a, b)| a == b).unwrap_or(false)
        }
        _ => false,
    }
}
