//! Tree tier (spec §3.5): the hierarchical AST consumed by the validator,
//! the lowerer's input-adjacent passes, the function hoister, and the
//! ownership/null analyses.

use serde::{Deserialize, Serialize};

use crate::diagnostics::SourceLocation;
use crate::function::{Capture, Param};
use crate::types::{ConstValue, IrType};

/// A top-level or class-level declaration (spec §3.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Decl {
    Const(ConstDecl),
    Function(FunctionDecl),
    Class(ClassDecl),
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Const(c) => &c.name,
            Decl::Function(f) => &f.name,
            Decl::Class(c) => &c.name,
            Decl::Interface(i) => &i.name,
            Decl::TypeAlias(t) => &t.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstDecl {
    pub name: String,
    pub ty: IrType,
    pub init: Expr,
    pub location: Option<SourceLocation>,
}

/// The body of a function, in whichever tier the current stage produced.
/// Stages document which variant they require (spec §3.4/§3.5); lowering's
/// default output is `Tree`, with an explicit conversion to `Ssa` available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    Tree(StatementBlock),
    Ssa(crate::ssa::SsaBody),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: IrType,
    pub body: FunctionBody,
    pub is_async: bool,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: IrType,
    pub readonly: bool,
    pub initializer: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: IrType,
    pub body: FunctionBody,
    pub is_async: bool,
    pub is_static: bool,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub params: Vec<Param>,
    pub body: StatementBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub constructor: Option<ConstructorDecl>,
    pub parent: Option<String>,
    pub implements: Vec<String>,
    pub type_params: Vec<String>,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfacePropertyDecl {
    pub name: String,
    pub ty: IrType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceMethodSig {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: IrType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub properties: Vec<InterfacePropertyDecl>,
    pub methods: Vec<InterfaceMethodSig>,
    pub extends: Vec<String>,
    pub location: Option<SourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeAliasDecl {
    pub name: String,
    pub aliased: IrType,
}

/// `var`-style function-scoped bindings are forbidden by the validator (spec
/// §4.1, code 105); block-scoped `let`/`const` bindings are the only
/// accepted form. Carried on every `VarDecl` so the validator can reject
/// `Function`-scoped declarations without re-deriving scope from context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarScope {
    Block,
    Function,
}

/// An ordered sequence of statements, e.g. a function body or the branch of
/// an `if`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StatementBlock {
    pub statements: Vec<Stmt>,
}

impl StatementBlock {
    pub fn new(statements: Vec<Stmt>) -> Self {
        StatementBlock { statements }
    }

    pub fn empty() -> Self {
        StatementBlock::default()
    }
}

/// A statement in the tree tier (spec §3.5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `isDeclaration` distinguishes initial binding from reassignment,
    /// mirroring the SSA-tier `assign` instruction's flag (spec §4.2).
    VarDecl {
        name: String,
        ty: IrType,
        init: Option<Expr>,
        is_declaration: bool,
        scope: VarScope,
        location: Option<SourceLocation>,
    },
    Expr(Expr),
    Return {
        value: Option<Expr>,
        location: Option<SourceLocation>,
    },
    If {
        cond: Expr,
        then_branch: StatementBlock,
        else_branch: Option<StatementBlock>,
    },
    While {
        cond: Expr,
        body: StatementBlock,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Box<Stmt>>,
        body: StatementBlock,
    },
    ForOf {
        binding: String,
        binding_ty: IrType,
        iterable: Expr,
        body: StatementBlock,
    },
    TryCatchFinally {
        try_block: StatementBlock,
        catch_binding: Option<String>,
        catch_block: Option<StatementBlock>,
        finally_block: Option<StatementBlock>,
    },
    Throw(Expr),
    Break,
    Continue,
    Block(StatementBlock),
    /// `receiver.field = value`. Kept distinct from `VarDecl`'s reassignment
    /// form since a field target has no single local-variable slot to bump
    /// the SSA version of (spec §4.2, mirrors `ssa::Instruction::FieldAssign`).
    FieldAssign {
        receiver: Expr,
        field: String,
        value: Expr,
    },
    /// `receiver[index] = value`.
    IndexAssign {
        receiver: Expr,
        index: Expr,
        value: Expr,
    },
    /// A function declared inside another function's body. The hoister
    /// (spec §4.6) may promote this to module scope.
    NestedFunction(FunctionDecl),
    /// `with (obj) { ... }`. Always rejected by the validator (spec §4.1,
    /// code 101) -- kept representable purely so there is something to
    /// reject; no later stage handles this variant.
    With(StatementBlock),
    /// `for (const k in obj) { ... }`, source-dialect key enumeration.
    /// Rejected by the validator (code 104); `ForOf` is the accepted
    /// replacement.
    ForIn {
        binding: String,
        target: Expr,
        body: StatementBlock,
    },
    /// The property-delete operator. Rejected by the validator (code 111).
    Delete(Expr),
    /// A `switch` statement. The validator (code 113) rejects any
    /// non-default, non-last case whose body is non-empty and does not end
    /// in `break`/`return`/`throw`/`continue`.
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    /// `name op= value` (`+=`, `-=`, `*=`, `/=`, `%=`). Pre-lowering sugar;
    /// the lowerer desugars this into `VarDecl { is_declaration: false, .. }`
    /// around a `Binary` (spec §4.2 "Compound assignments"); no later stage
    /// constructs or matches this variant.
    CompoundAssign {
        name: String,
        op: BinaryOp,
        value: Expr,
        location: Option<SourceLocation>,
    },
}

/// One `case`/`default` arm of a `Switch`. `test: None` marks the `default`
/// arm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

/// A binary operator (spec §3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    /// `==`. Rejected by the validator (spec §4.1, code 106); `Eq` (`===`)
    /// is the only accepted equality form.
    WeakEq,
    /// `!=`. Rejected by the validator (code 107); `NotEq` (`!==`) is the
    /// only accepted inequality form.
    WeakNotEq,
}

/// A unary operator (spec §3.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    Typeof,
    /// Unary `void`. Rejected by the validator (spec §4.1, code 115);
    /// explicit `undefined` is the accepted replacement.
    Void,
}

/// Prefix/postfix position of `++`/`--`. Spec §4.2/§9: the r-value semantics
/// of the prefix form are a documented open question resolved (per
/// `SPEC_FULL.md` §9.5) by rejecting the expression-position use; the
/// statement-position use is always accepted regardless of this field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncDecPosition {
    Prefix,
    Postfix,
}

/// An expression in the tree tier (spec §3.5). `Move`/`Borrow` are SSA-only
/// per the spec and are therefore not represented here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(ConstValue),
    Identifier(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `++x` / `x++` / `--x` / `x--`, in expression position. See
    /// [`IncDecPosition`].
    IncDec {
        op: IncDecOp,
        position: IncDecPosition,
        target: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Distinct from `call` on a `member` expression: preserves vtable
    /// dispatch intent through to codegen (spec §4.2).
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Member {
        receiver: Box<Expr>,
        property: String,
    },
    Index {
        receiver: Box<Expr>,
        index: Box<Expr>,
    },
    New {
        class_name: String,
        args: Vec<Expr>,
    },
    ArrayLiteral(Vec<Expr>),
    /// An object literal. The lowerer synthesizes an anonymous record type
    /// for this from `fields`' names and inferred types (spec §4.2, §9) and
    /// fills in `type_id`; `None` pre-lowering.
    ObjectLiteral {
        fields: Vec<(String, Expr)>,
        type_id: Option<crate::id::TypeId>,
    },
    Lambda {
        params: Vec<Param>,
        body: Box<StatementBlock>,
        captures: Vec<Capture>,
    },
    Await(Box<Expr>),
    /// Head-literal followed by alternating (expression, literal) segments
    /// (spec §4.2 "Template concatenation").
    TemplateConcat {
        head: String,
        segments: Vec<(Expr, String)>,
    },
    /// Tree-tier-only on the way in from hand-authored fixtures; SSA
    /// conversion lowers these away into explicit ownership-transfer
    /// instructions, but `Move`/`Borrow` are SSA-tier nodes per spec §3.5 --
    /// present here only as the lowering output before SSA conversion runs,
    /// tagging an identifier with how it participates in an assignment.
    Move(Box<Expr>),
    Borrow(Box<Expr>),
    /// `this`/`self`. Legal inside methods and arrows lexically bound to
    /// one; the validator rejects its use inside a free function (spec
    /// §4.1, code 108).
    This,
    /// `eval(...)` or a runtime function-from-string construction. Always
    /// rejected by the validator (code 102).
    DynamicEval(Box<Expr>),
    /// The implicit variadic `arguments` pseudo-variable. Always rejected
    /// by the validator (code 103); explicit rest parameters are the
    /// accepted replacement.
    ArgumentsObject,
    /// A comma expression `(a, b, c)`, evaluated left to right for the
    /// value of the last. Always rejected by the validator (code 112).
    Comma(Vec<Expr>),
    /// `import(path)`. Accepted only when `path` is a string literal (spec
    /// §4.1, code 127); the validator inspects the boxed expression itself.
    DynamicImport(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IncDecOp {
    Increment,
    Decrement,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    #[test]
    fn decl_name_dispatches_across_variants() {
        let c = Decl::Const(ConstDecl {
            name: "PI".into(),
            ty: IrType::Primitive(Primitive::Number),
            init: Expr::Literal(ConstValue::Number(3.14)),
            location: None,
        });
        assert_eq!(c.name(), "PI");
    }

    #[test]
    fn statement_block_empty_has_no_statements() {
        let block = StatementBlock::empty();
        assert!(block.statements.is_empty());
    }

    #[test]
    fn serde_roundtrip_nested_expr() {
        let expr = Expr::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(Expr::Literal(ConstValue::Integer(2))),
            rhs: Box::new(Expr::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(Expr::Literal(ConstValue::Integer(3))),
                rhs: Box::new(Expr::Literal(ConstValue::Integer(4))),
            }),
        };
        let json = serde_json::to_string(&expr).unwrap();
        let back: Expr = serde_json::from_str(&json).unwrap();
        assert_eq!(expr, back);
    }

    #[test]
    fn serde_roundtrip_function_decl_with_tree_body() {
        let func = FunctionDecl {
            name: "add".into(),
            params: vec![
                Param::new("a", IrType::Primitive(Primitive::Integer)),
                Param::new("b", IrType::Primitive(Primitive::Integer)),
            ],
            return_type: IrType::Primitive(Primitive::Integer),
            body: FunctionBody::Tree(StatementBlock::new(vec![Stmt::Return {
                value: Some(Expr::Binary {
                    op: BinaryOp::Add,
                    lhs: Box::new(Expr::Identifier("a".into())),
                    rhs: Box::new(Expr::Identifier("b".into())),
                }),
                location: None,
            }])),
            is_async: false,
            location: None,
        };
        let json = serde_json::to_string(&func).unwrap();
        let back: FunctionDecl = serde_json::from_str(&json).unwrap();
        assert_eq!(func, back);
    }

    #[test]
    fn object_literal_field_order_is_preserved() {
        let obj = Expr::ObjectLiteral {
            fields: vec![
                ("x".into(), Expr::Literal(ConstValue::Integer(1))),
                ("y".into(), Expr::Literal(ConstValue::Integer(2))),
            ],
            type_id: None,
        };
        if let Expr::ObjectLiteral { fields, .. } = &obj {
            assert_eq!(fields[0].0, "x");
            assert_eq!(fields[1].0, "y");
        } else {
            panic!("expected object literal");
        }
    }
}
