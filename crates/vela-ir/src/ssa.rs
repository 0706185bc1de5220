//! SSA tier (spec §3.5, §4.2 "SSA conversion rules"): the basic-block form
//! consumed by the optimizer and the backend.
//!
//! Unlike the tree tier, every assignment here targets a fresh *version* of
//! a variable; `phi`-style merging is represented implicitly by the
//! `version` field bumping at each join point's predecessor, following the
//! same convention the lowerer's SSA-conversion rules describe.

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, UnaryOp};
use crate::id::BlockId;
use crate::types::{ConstValue, IrType};

/// A versioned local variable: `name` plus a monotonically increasing
/// `version`, so `x@0` and `x@1` are distinct SSA values sharing a source
/// name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub version: u32,
    pub ty: IrType,
}

impl Variable {
    pub fn new(name: impl Into<String>, version: u32, ty: IrType) -> Self {
        Variable {
            name: name.into(),
            version,
            ty,
        }
    }
}

/// An SSA-tier value: either a reference to a previously-assigned variable
/// or an immediate constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SsaValue {
    Var(Variable),
    Const(ConstValue),
}

/// An SSA-tier expression, built only from already-assigned values -- no
/// nested control flow, which instead becomes block structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SsaExpr {
    Value(SsaValue),
    Binary {
        op: BinaryOp,
        lhs: SsaValue,
        rhs: SsaValue,
    },
    Unary {
        op: UnaryOp,
        operand: SsaValue,
    },
    Call {
        callee: String,
        args: Vec<SsaValue>,
    },
    MethodCall {
        receiver: SsaValue,
        method: String,
        args: Vec<SsaValue>,
    },
    FieldAccess {
        receiver: SsaValue,
        field: String,
    },
    Index {
        receiver: SsaValue,
        index: SsaValue,
    },
    New {
        class_name: String,
        args: Vec<SsaValue>,
    },
    ArrayLiteral(Vec<SsaValue>),
    /// An ownership-transferring use of a value: the source binding is
    /// invalidated after this instruction (spec §4.2/§4.3, ownership mode).
    Move(SsaValue),
    /// A non-owning, non-invalidating use of a value.
    Borrow(SsaValue),
    /// Suspends the enclosing coroutine until the awaited promise resolves
    /// (spec §5, async lowering).
    Await(SsaValue),
}

/// A single SSA instruction: either an assignment producing a new
/// `Variable` version, a field mutation, or a bare (value-discarding)
/// expression evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Assign { target: Variable, value: SsaExpr },
    FieldAssign {
        receiver: SsaValue,
        field: String,
        value: SsaValue,
    },
    Eval(SsaExpr),
}

/// How a basic block ends: exactly one terminator per block (spec §3.5
/// invariant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Terminator {
    Return(Option<SsaValue>),
    Branch {
        cond: SsaValue,
        then_block: BlockId,
        else_block: BlockId,
    },
    Jump(BlockId),
    /// Marks dead code the optimizer proved unreachable (spec §4.5 DCE).
    Unreachable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instructions: Vec<Instruction>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn new(id: BlockId) -> Self {
        BasicBlock {
            id,
            instructions: Vec::new(),
            terminator: Terminator::Unreachable,
        }
    }
}

/// A function body lowered to SSA form: an entry block plus the full set of
/// reachable blocks, matching the optimizer and backend's required input
/// shape (spec §4.5, §4.7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SsaBody {
    pub entry: BlockId,
    pub blocks: Vec<BasicBlock>,
}

impl SsaBody {
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    fn var(name: &str, version: u32) -> Variable {
        Variable::new(name, version, IrType::Primitive(Primitive::Integer))
    }

    #[test]
    fn variable_versions_distinguish_same_name() {
        let a = var("x", 0);
        let b = var("x", 1);
        assert_ne!(a, b);
        assert_eq!(a.name, b.name);
    }

    #[test]
    fn ssa_body_block_lookup_finds_by_id() {
        let block0 = BasicBlock::new(BlockId(0));
        let mut block1 = BasicBlock::new(BlockId(1));
        block1.terminator = Terminator::Return(None);
        let body = SsaBody {
            entry: BlockId(0),
            blocks: vec![block0, block1],
        };
        assert!(body.block(BlockId(1)).is_some());
        assert!(body.block(BlockId(2)).is_none());
    }

    #[test]
    fn serde_roundtrip_instruction() {
        let instr = Instruction::Assign {
            target: var("sum", 2),
            value: SsaExpr::Binary {
                op: BinaryOp::Add,
                lhs: SsaValue::Var(var("sum", 1)),
                rhs: SsaValue::Const(ConstValue::Integer(1)),
            },
        };
        let json = serde_json::to_string(&instr).unwrap();
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(instr, back);
    }

    #[test]
    fn serde_roundtrip_branch_terminator() {
        let term = Terminator::Branch {
            cond: SsaValue::Var(var("cond", 0)),
            then_block: BlockId(1),
            else_block: BlockId(2),
        };
        let json = serde_json::to_string(&term).unwrap();
        let back: Terminator = serde_json::from_str(&json).unwrap();
        assert_eq!(term, back);
    }
}
