//! Tree-to-SSA conversion (spec §4.2 "SSA conversion"). One basic block per
//! straight-line run of statements; `if`/`while` become `branch`/`jump`
//! terminators; each reassignment of a source name bumps its version with
//! no φ-nodes, matching the spec's "SSA-ish, not strict SSA" trade-off.
//!
//! Exception edges are not modeled: `Terminator` has no unwind variant, so
//! `try`/`catch`/`finally` lowers its blocks in plain fallthrough order.
//! Nested functions are assumed already resolved by the hoister pass that
//! runs before SSA conversion (spec §4.6) and are skipped here.

use std::collections::HashMap;

use vela_ir::{
    BasicBlock, BinaryOp, BlockId, Expr, Instruction, IrType, SsaBody, SsaExpr, SsaValue, Stmt,
    StatementBlock, Terminator, TypeId, Variable,
};

/// The `New::class_name` an anonymous record's `TypeId` lowers to. The
/// backend recognizes this prefix to distinguish a synthesized record
/// constructor from a real class's (spec §4.7 "Anonymous record").
pub fn anonymous_record_class_name(type_id: TypeId) -> String {
    format!("__anonymous_record_{}", type_id.0)
}

pub fn tree_to_ssa(body: &StatementBlock) -> SsaBody {
    let mut builder = Builder::new();
    let entry = builder.fresh_block();
    builder.current = entry;
    builder.lower_block(body);
    builder.terminate_fallthrough(Terminator::Return(None));
    SsaBody {
        entry,
        blocks: builder.blocks,
    }
}

struct Builder {
    blocks: Vec<BasicBlock>,
    current: BlockId,
    next_block: u32,
    next_temp: u32,
    versions: HashMap<String, u32>,
}

impl Builder {
    fn new() -> Self {
        Builder {
            blocks: Vec::new(),
            current: BlockId(0),
            next_block: 0,
            next_temp: 0,
            versions: HashMap::new(),
        }
    }

    fn fresh_block(&mut self) -> BlockId {
        let id = BlockId(self.next_block);
        self.next_block += 1;
        self.blocks.push(BasicBlock::new(id));
        id
    }

    fn block_mut(&mut self, id: BlockId) -> &mut BasicBlock {
        self.blocks.iter_mut().find(|b| b.id == id).expect("block exists")
    }

    fn push(&mut self, instr: Instruction) {
        let current = self.current;
        self.block_mut(current).instructions.push(instr);
    }

    /// Sets the current block's terminator, but only if it doesn't already
    /// have one (an earlier `return` inside the same straight-line run wins;
    /// everything lexically after it was already unreachable at the tree
    /// tier, per spec §4.2 "subsequent statements ... are unreachable and
    /// dropped").
    fn terminate_fallthrough(&mut self, term: Terminator) {
        let current = self.current;
        let block = self.block_mut(current);
        if matches!(block.terminator, Terminator::Unreachable) {
            block.terminator = term;
        }
    }

    fn next_version(&mut self, name: &str) -> u32 {
        let counter = self.versions.entry(name.to_string()).or_insert(0);
        let v = *counter;
        *counter += 1;
        v
    }

    fn current_version(&self, name: &str) -> u32 {
        self.versions.get(name).copied().unwrap_or(0).saturating_sub(1)
    }

    fn fresh_temp(&mut self) -> String {
        let name = format!("%t{}", self.next_temp);
        self.next_temp += 1;
        name
    }

    fn lower_block(&mut self, block: &StatementBlock) {
        for stmt in &block.statements {
            if !matches!(self.block_mut(self.current).terminator, Terminator::Unreachable) {
                // This block already has a terminator (an earlier `return`
                // in this same straight-line run); later statements are
                // dead per the tree-tier invariant and are dropped here too.
                break;
            }
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, ty, init, .. } => {
                let value = match init {
                    Some(e) => self.lower_expr(e),
                    None => SsaExpr::Value(SsaValue::Const(vela_ir::ConstValue::Void)),
                };
                let version = self.next_version(name);
                self.push(Instruction::Assign {
                    target: Variable::new(name.clone(), version, ty.clone()),
                    value,
                });
            }
            Stmt::CompoundAssign { name, op, value, .. } => {
                let rhs = self.lower_to_value(value);
                let lhs = SsaValue::Var(self.variable_ref(name, IrType::Dynamic));
                let version = self.next_version(name);
                self.push(Instruction::Assign {
                    target: Variable::new(name.clone(), version, IrType::Dynamic),
                    value: SsaExpr::Binary { op: *op, lhs, rhs },
                });
            }
            Stmt::Expr(e) => {
                let value = self.lower_expr(e);
                self.push(Instruction::Eval(value));
            }
            Stmt::Return { value, .. } => {
                let v = value.as_ref().map(|e| self.lower_to_value(e));
                self.terminate_fallthrough(Terminator::Return(v));
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_value = self.lower_to_value(cond);
                let then_block = self.fresh_block();
                let else_block = self.fresh_block();
                let join = self.fresh_block();
                self.terminate_fallthrough(Terminator::Branch {
                    cond: cond_value,
                    then_block,
                    else_block,
                });

                self.current = then_block;
                self.lower_block(then_branch);
                self.terminate_fallthrough(Terminator::Jump(join));

                self.current = else_block;
                if let Some(else_branch) = else_branch {
                    self.lower_block(else_branch);
                }
                self.terminate_fallthrough(Terminator::Jump(join));

                self.current = join;
            }
            Stmt::While { cond, body } => {
                let header = self.fresh_block();
                let body_block = self.fresh_block();
                let exit = self.fresh_block();
                self.terminate_fallthrough(Terminator::Jump(header));

                self.current = header;
                let cond_value = self.lower_to_value(cond);
                self.terminate_fallthrough(Terminator::Branch {
                    cond: cond_value,
                    then_block: body_block,
                    else_block: exit,
                });

                self.current = body_block;
                self.lower_block(body);
                self.terminate_fallthrough(Terminator::Jump(header));

                self.current = exit;
            }
            Stmt::For { init, cond, step, body } => {
                if let Some(init) = init {
                    self.lower_stmt(init);
                }
                let header = self.fresh_block();
                let body_block = self.fresh_block();
                let exit = self.fresh_block();
                self.terminate_fallthrough(Terminator::Jump(header));

                self.current = header;
                let cond_value = match cond {
                    Some(c) => self.lower_to_value(c),
                    None => SsaValue::Const(vela_ir::ConstValue::Boolean(true)),
                };
                self.terminate_fallthrough(Terminator::Branch {
                    cond: cond_value,
                    then_block: body_block,
                    else_block: exit,
                });

                self.current = body_block;
                self.lower_block(body);
                if let Some(step) = step {
                    self.lower_stmt(step);
                }
                self.terminate_fallthrough(Terminator::Jump(header));

                self.current = exit;
            }
            Stmt::ForOf { binding, iterable, body, .. } => {
                // No iterator protocol exists at the SSA tier, so iteration
                // is expressed with the same builtin-call convention used
                // for `IndexAssign` below: `__iter_begin`/`__iter_has_next`/
                // `__iter_next` are backend intrinsics, not user-callable
                // functions.
                let iter_value = self.lower_to_value(iterable);
                let cursor_name = self.fresh_temp();
                self.push(Instruction::Assign {
                    target: Variable::new(cursor_name.clone(), 0, IrType::Dynamic),
                    value: SsaExpr::Call {
                        callee: "__iter_begin".to_string(),
                        args: vec![iter_value],
                    },
                });
                let cursor_var = SsaValue::Var(Variable::new(cursor_name, 0, IrType::Dynamic));

                let header = self.fresh_block();
                let body_block = self.fresh_block();
                let exit = self.fresh_block();
                self.terminate_fallthrough(Terminator::Jump(header));

                self.current = header;
                let bool_ty = IrType::Primitive(vela_ir::Primitive::Boolean);
                let has_next = self.fresh_temp();
                self.push(Instruction::Assign {
                    target: Variable::new(has_next.clone(), 0, bool_ty.clone()),
                    value: SsaExpr::Call {
                        callee: "__iter_has_next".to_string(),
                        args: vec![cursor_var.clone()],
                    },
                });
                self.terminate_fallthrough(Terminator::Branch {
                    cond: SsaValue::Var(Variable::new(has_next, 0, bool_ty)),
                    then_block: body_block,
                    else_block: exit,
                });

                self.current = body_block;
                let binding_version = self.next_version(binding);
                self.push(Instruction::Assign {
                    target: Variable::new(binding.clone(), binding_version, IrType::Dynamic),
                    value: SsaExpr::Call {
                        callee: "__iter_next".to_string(),
                        args: vec![cursor_var.clone()],
                    },
                });
                self.lower_block(body);
                self.terminate_fallthrough(Terminator::Jump(header));

                self.current = exit;
            }
            Stmt::TryCatchFinally {
                try_block,
                catch_block,
                finally_block,
                ..
            } => {
                self.lower_block(try_block);
                if let Some(b) = catch_block {
                    self.lower_block(b);
                }
                if let Some(b) = finally_block {
                    self.lower_block(b);
                }
            }
            Stmt::Throw(e) => {
                let value = self.lower_expr(e);
                self.push(Instruction::Eval(value));
            }
            Stmt::Break | Stmt::Continue => {}
            Stmt::Block(b) => self.lower_block(b),
            Stmt::FieldAssign { receiver, field, value } => {
                let receiver = self.lower_to_value(receiver);
                let value = self.lower_to_value(value);
                self.push(Instruction::FieldAssign {
                    receiver,
                    field: field.clone(),
                    value,
                });
            }
            Stmt::IndexAssign { receiver, index, value } => {
                let receiver = self.lower_to_value(receiver);
                let index = self.lower_to_value(index);
                let value = self.lower_to_value(value);
                self.push(Instruction::Eval(SsaExpr::Call {
                    callee: "__index_set".to_string(),
                    args: vec![receiver, index, value],
                }));
            }
            Stmt::Switch { discriminant, cases } => self.lower_switch(discriminant, cases),
            Stmt::NestedFunction(_) | Stmt::With(_) | Stmt::ForIn { .. } | Stmt::Delete(_) => {
                // Unreachable after validation/hoisting; nothing to lower.
            }
        }
    }

    /// Dispatch tests every `case` in source order and falls back to
    /// `default` (wherever it's lexically positioned -- matching the
    /// source language's "default applies last" semantics, not its source
    /// position) only if nothing matched. Case bodies chain to the next
    /// case's body block rather than to `exit` directly, since the
    /// validator (code 113) only lets a case omit a terminator when its
    /// body is empty -- that's exactly the fallthrough this mirrors.
    fn lower_switch(&mut self, discriminant: &Expr, cases: &[vela_ir::SwitchCase]) {
        let disc = self.lower_to_value(discriminant);
        let exit = self.fresh_block();
        let body_blocks: Vec<BlockId> = cases.iter().map(|_| self.fresh_block()).collect();
        let default_index = cases.iter().position(|c| c.test.is_none());

        for (i, case) in cases.iter().enumerate() {
            let Some(test) = &case.test else { continue };
            let test_value = self.lower_to_value(test);
            let bool_ty = IrType::Primitive(vela_ir::Primitive::Boolean);
            let cond_temp = self.fresh_temp();
            self.push(Instruction::Assign {
                target: Variable::new(cond_temp.clone(), 0, bool_ty.clone()),
                value: SsaExpr::Binary {
                    op: BinaryOp::Eq,
                    lhs: disc.clone(),
                    rhs: test_value,
                },
            });
            let next_check = self.fresh_block();
            self.terminate_fallthrough(Terminator::Branch {
                cond: SsaValue::Var(Variable::new(cond_temp, 0, bool_ty)),
                then_block: body_blocks[i],
                else_block: next_check,
            });
            self.current = next_check;
        }
        let fallback = default_index.map(|i| body_blocks[i]).unwrap_or(exit);
        self.terminate_fallthrough(Terminator::Jump(fallback));

        for (i, case) in cases.iter().enumerate() {
            self.current = body_blocks[i];
            for stmt in &case.body {
                if matches!(stmt, Stmt::Break) {
                    break;
                }
                self.lower_stmt(stmt);
            }
            let fallthrough_target = body_blocks.get(i + 1).copied().unwrap_or(exit);
            self.terminate_fallthrough(Terminator::Jump(fallthrough_target));
        }
        self.current = exit;
    }

    fn variable_ref(&self, name: &str, ty: IrType) -> Variable {
        Variable::new(name.to_string(), self.current_version(name), ty)
    }

    fn lower_to_value(&mut self, expr: &Expr) -> SsaValue {
        match self.lower_expr(expr) {
            SsaExpr::Value(v) => v,
            complex => {
                let temp = self.fresh_temp();
                self.push(Instruction::Assign {
                    target: Variable::new(temp.clone(), 0, IrType::Dynamic),
                    value: complex,
                });
                SsaValue::Var(Variable::new(temp, 0, IrType::Dynamic))
            }
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> SsaExpr {
        match expr {
            Expr::Literal(cv) => SsaExpr::Value(SsaValue::Const(cv.clone())),
            Expr::Identifier(name) => SsaExpr::Value(SsaValue::Var(self.variable_ref(name, IrType::Dynamic))),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.lower_to_value(lhs);
                let rhs = self.lower_to_value(rhs);
                SsaExpr::Binary { op: *op, lhs, rhs }
            }
            Expr::Unary { op, operand } => {
                let operand = self.lower_to_value(operand);
                SsaExpr::Unary { op: *op, operand }
            }
            Expr::IncDec { target, .. } => {
                // Expression-position use; see spec §9 open question -- the
                // interpreter and backend both treat this conservatively as
                // the post-operation value of the read.
                let value = self.lower_to_value(target);
                SsaExpr::Value(value)
            }
            Expr::Conditional { cond, then_expr, else_expr } => {
                // No ternary expression node exists at the SSA tier, so this
                // lowers to a branch with both arms assigning the same
                // temp's next version before joining -- the "phi-by-shared-
                // version" convention the module doc comment describes,
                // rather than a real phi node.
                let cond_value = self.lower_to_value(cond);
                let then_block = self.fresh_block();
                let else_block = self.fresh_block();
                let join = self.fresh_block();
                self.terminate_fallthrough(Terminator::Branch {
                    cond: cond_value,
                    then_block,
                    else_block,
                });

                // `result_name` is unique to this expression and assigned
                // nowhere else, so both arms reuse version 0 -- whichever
                // predecessor actually ran, `result_name@0` is defined at
                // the join.
                let result_name = self.fresh_temp();

                self.current = then_block;
                let then_value = self.lower_to_value(then_expr);
                self.push(Instruction::Assign {
                    target: Variable::new(result_name.clone(), 0, IrType::Dynamic),
                    value: SsaExpr::Value(then_value),
                });
                self.terminate_fallthrough(Terminator::Jump(join));

                self.current = else_block;
                let else_value = self.lower_to_value(else_expr);
                self.push(Instruction::Assign {
                    target: Variable::new(result_name.clone(), 0, IrType::Dynamic),
                    value: SsaExpr::Value(else_value),
                });
                self.terminate_fallthrough(Terminator::Jump(join));

                self.current = join;
                SsaExpr::Value(SsaValue::Var(Variable::new(result_name, 0, IrType::Dynamic)))
            }
            Expr::Call { callee, args } => {
                let callee_name = match callee.as_ref() {
                    Expr::Identifier(name) => name.clone(),
                    _ => self.fresh_temp(),
                };
                let args = args.iter().map(|a| self.lower_to_value(a)).collect();
                SsaExpr::Call { callee: callee_name, args }
            }
            Expr::MethodCall { receiver, method, args } => {
                let receiver = self.lower_to_value(receiver);
                let args = args.iter().map(|a| self.lower_to_value(a)).collect();
                SsaExpr::MethodCall {
                    receiver,
                    method: method.clone(),
                    args,
                }
            }
            Expr::Member { receiver, property } => {
                let receiver = self.lower_to_value(receiver);
                SsaExpr::FieldAccess {
                    receiver,
                    field: property.clone(),
                }
            }
            Expr::Index { receiver, index } => {
                let receiver = self.lower_to_value(receiver);
                let index = self.lower_to_value(index);
                SsaExpr::Index { receiver, index }
            }
            Expr::New { class_name, args } => {
                let args = args.iter().map(|a| self.lower_to_value(a)).collect();
                SsaExpr::New {
                    class_name: class_name.clone(),
                    args,
                }
            }
            Expr::ArrayLiteral(items) => {
                let items = items.iter().map(|i| self.lower_to_value(i)).collect();
                SsaExpr::ArrayLiteral(items)
            }
            Expr::ObjectLiteral { fields, type_id } => {
                let args = fields.iter().map(|(_, v)| self.lower_to_value(v)).collect();
                let id = type_id.expect("object literal reaches SSA conversion after record synthesis interns its type_id");
                SsaExpr::New {
                    class_name: anonymous_record_class_name(id),
                    args,
                }
            }
            Expr::Lambda { .. } => {
                // Lambdas are not flattened into basic blocks; the backend
                // consumes the tree-tier body directly (spec §4.7).
                SsaExpr::Value(SsaValue::Const(vela_ir::ConstValue::Void))
            }
            Expr::Await(inner) => {
                let value = self.lower_to_value(inner);
                SsaExpr::Await(value)
            }
            Expr::Move(inner) => {
                let value = self.lower_to_value(inner);
                SsaExpr::Move(value)
            }
            Expr::Borrow(inner) => {
                let value = self.lower_to_value(inner);
                SsaExpr::Borrow(value)
            }
            Expr::TemplateConcat { head, segments } => {
                let mut acc = SsaValue::Const(vela_ir::ConstValue::Str(head.clone()));
                for (expr, literal) in segments {
                    let value = self.lower_to_value(expr);
                    let concatenated = self.fresh_temp();
                    self.push(Instruction::Assign {
                        target: Variable::new(concatenated.clone(), 0, IrType::Dynamic),
                        value: SsaExpr::Binary {
                            op: BinaryOp::Add,
                            lhs: acc,
                            rhs: value,
                        },
                    });
                    let with_literal = self.fresh_temp();
                    self.push(Instruction::Assign {
                        target: Variable::new(with_literal.clone(), 0, IrType::Dynamic),
                        value: SsaExpr::Binary {
                            op: BinaryOp::Add,
                            lhs: SsaValue::Var(Variable::new(concatenated, 0, IrType::Dynamic)),
                            rhs: SsaValue::Const(vela_ir::ConstValue::Str(literal.clone())),
                        },
                    });
                    acc = SsaValue::Var(Variable::new(with_literal, 0, IrType::Dynamic));
                }
                SsaExpr::Value(acc)
            }
            Expr::This => SsaExpr::Value(SsaValue::Var(self.variable_ref("this", IrType::Dynamic))),
            Expr::Comma(exprs) => {
                let mut last = SsaExpr::Value(SsaValue::Const(vela_ir::ConstValue::Void));
                for e in exprs {
                    last = self.lower_expr(e);
                }
                last
            }
            Expr::DynamicEval(_) | Expr::ArgumentsObject | Expr::DynamicImport(_) => {
                // Unreachable after validation.
                SsaExpr::Value(SsaValue::Const(vela_ir::ConstValue::Void))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{ConstValue, Primitive, Terminator as T};

    #[test]
    fn straight_line_block_produces_one_block_ending_in_return() {
        let body = StatementBlock::new(vec![
            Stmt::VarDecl {
                name: "x".into(),
                ty: IrType::Primitive(Primitive::Integer),
                init: Some(Expr::Literal(ConstValue::Integer(1))),
                is_declaration: true,
                scope: vela_ir::VarScope::Block,
                location: None,
            },
            Stmt::Return {
                value: Some(Expr::Identifier("x".into())),
                location: None,
            },
        ]);
        let ssa = tree_to_ssa(&body);
        assert_eq!(ssa.blocks.len(), 1);
        assert!(matches!(ssa.blocks[0].terminator, T::Return(Some(_))));
    }

    #[test]
    fn if_else_produces_branch_and_join() {
        let body = StatementBlock::new(vec![Stmt::If {
            cond: Expr::Literal(ConstValue::Boolean(true)),
            then_branch: StatementBlock::new(vec![Stmt::Return {
                value: Some(Expr::Literal(ConstValue::Integer(1))),
                location: None,
            }]),
            else_branch: Some(StatementBlock::new(vec![Stmt::Return {
                value: Some(Expr::Literal(ConstValue::Integer(2))),
                location: None,
            }])),
        }]);
        let ssa = tree_to_ssa(&body);
        assert!(matches!(ssa.blocks[0].terminator, T::Branch { .. }));
    }

    #[test]
    fn reassignment_bumps_variable_version() {
        let body = StatementBlock::new(vec![
            Stmt::VarDecl {
                name: "x".into(),
                ty: IrType::Primitive(Primitive::Integer),
                init: Some(Expr::Literal(ConstValue::Integer(1))),
                is_declaration: true,
                scope: vela_ir::VarScope::Block,
                location: None,
            },
            Stmt::VarDecl {
                name: "x".into(),
                ty: IrType::Primitive(Primitive::Integer),
                init: Some(Expr::Literal(ConstValue::Integer(2))),
                is_declaration: false,
                scope: vela_ir::VarScope::Block,
                location: None,
            },
        ]);
        let ssa = tree_to_ssa(&body);
        let versions: Vec<_> = ssa.blocks[0]
            .instructions
            .iter()
            .map(|i| match i {
                Instruction::Assign { target, .. } => target.version,
                _ => panic!("expected assign"),
            })
            .collect();
        assert_eq!(versions, vec![0, 1]);
    }
}
