//! The IR type universe (spec §3.1) and ownership tags (spec §3.2).
//!
//! Every IR expression and declaration slot carries a fully resolved
//! [`IrType`] (spec invariant: a stage that cannot infer a type emits a
//! diagnostic rather than inserting an "unknown").

use serde::{Deserialize, Serialize};

use crate::id::TypeId;

/// One of the seven primitive kinds. `Integer53` is the "safe 53-bit
/// integer" primitive of the source dialect -- distinct from `Integer`
/// (32-bit signed) because the two require different backend lowerings
/// (see the type table in `vela-codegen`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    Number,
    Integer,
    Integer53,
    Str,
    Boolean,
    Void,
    Never,
}

/// Ownership tag on a heap reference. See spec §3.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ownership {
    /// Exclusive ownership. Moving transfers; dropping destroys.
    Own,
    /// Multiple co-owners; lifetime is the longest surviving holder.
    Share,
    /// Borrowed reference, non-owning. Must not outlive any co-owner.
    Use,
    /// Stored inline, no heap or reference counting.
    Value,
}

/// The IR type universe. A tagged sum over primitives, named types (classes
/// and interfaces), containers, functions, and the three structural wrappers
/// (union, nullable, promise).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrType {
    Primitive(Primitive),
    Named(NamedType),
    Array(Box<ArrayType>),
    Map(Box<MapType>),
    Function(Box<FunctionType>),
    /// An ordered set of types, used primarily for `T | null`, `T | undefined`.
    Union(Vec<IrType>),
    /// `T?`. Semantically `T | null`; the normalized form lowering produces.
    Nullable(Box<IrType>),
    /// `Promise<T>`: an asynchronous computation yielding `T`.
    Promise(Box<IrType>),
    /// The dynamic catch-all type. Lowering preserves this from the source
    /// AST purely so the validator's 109 diagnostic (spec §4.1) has
    /// something concrete to reject; no other stage is expected to see one
    /// survive past validation.
    Dynamic,
}

/// Reference to a declared class or interface by name, carrying an ownership
/// tag and an optional list of type arguments (for generic classes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedType {
    pub name: String,
    pub ownership: Ownership,
    pub type_args: Vec<IrType>,
}

impl NamedType {
    pub fn new(name: impl Into<String>, ownership: Ownership) -> Self {
        NamedType {
            name: name.into(),
            ownership,
            type_args: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArrayType {
    pub element: IrType,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapType {
    pub key: IrType,
    pub value: IrType,
    pub ownership: Ownership,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionType {
    pub params: Vec<IrType>,
    pub return_type: IrType,
}

impl IrType {
    pub fn void() -> Self {
        IrType::Primitive(Primitive::Void)
    }

    pub fn never() -> Self {
        IrType::Primitive(Primitive::Never)
    }

    pub fn boolean() -> Self {
        IrType::Primitive(Primitive::Boolean)
    }

    /// Unwraps one level of `Nullable`, returning the inner type. Used by the
    /// null checker and codegen's type table, both of which need to reason
    /// about the carried type independent of nullability.
    pub fn strip_nullable(&self) -> &IrType {
        match self {
            IrType::Nullable(inner) => inner,
            other => other,
        }
    }

    /// `true` for the `Nullable` wrapper -- i.e. anything the source dialect
    /// would consider `T | null`.
    pub fn is_nullable(&self) -> bool {
        matches!(self, IrType::Nullable(_))
    }

    /// The ownership tag carried by this type, if any. `Value`-kind
    /// primitives and functions have no ownership tag of their own.
    pub fn ownership(&self) -> Option<Ownership> {
        match self {
            IrType::Named(n) => Some(n.ownership),
            IrType::Array(a) => Some(a.ownership),
            IrType::Map(m) => Some(m.ownership),
            _ => None,
        }
    }
}

/// A struct synthesized by the lowerer for an object literal with no
/// declared type (spec §4.2, §9 "Anonymous records"). Deduplicated by the
/// ordered field-name list plus per-field type equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnonymousRecord {
    pub type_id: TypeId,
    /// Field names in literal-declaration order; this order, together with
    /// `field_types`, is the deduplication key.
    pub field_names: Vec<String>,
    pub field_types: Vec<IrType>,
}

impl AnonymousRecord {
    /// The dedup key: identical key ⇒ identical synthesized struct.
    pub fn dedup_key(&self) -> (Vec<String>, Vec<IrType>) {
        (self.field_names.clone(), self.field_types.clone())
    }
}

/// Literal values attached to `Const` declarations and literal expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Number(f64),
    Integer(i32),
    Integer53(i64),
    Str(String),
    Boolean(bool),
    Null,
    Void,
}

impl ConstValue {
    /// The source-dialect `typeof` string for this literal (spec §4.5: folds
    /// to the class-of-value string, preserving the classical `typeof null
    /// === "object"` quirk intentionally).
    pub fn typeof_str(&self) -> &'static str {
        match self {
            ConstValue::Number(_) | ConstValue::Integer(_) | ConstValue::Integer53(_) => "number",
            ConstValue::Str(_) => "string",
            ConstValue::Boolean(_) => "boolean",
            ConstValue::Null => "object",
            ConstValue::Void => "undefined",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_nullable_unwraps_once() {
        let t = IrType::Nullable(Box::new(IrType::Primitive(Primitive::Integer)));
        assert_eq!(t.strip_nullable(), &IrType::Primitive(Primitive::Integer));
    }

    #[test]
    fn strip_nullable_is_identity_for_non_nullable() {
        let t = IrType::Primitive(Primitive::Str);
        assert_eq!(t.strip_nullable(), &t);
    }

    #[test]
    fn ownership_present_on_named_array_map_only() {
        let named = IrType::Named(NamedType::new("Node", Ownership::Share));
        assert_eq!(named.ownership(), Some(Ownership::Share));

        let prim = IrType::Primitive(Primitive::Integer);
        assert_eq!(prim.ownership(), None);
    }

    #[test]
    fn anonymous_record_dedup_key_matches_for_identical_shapes() {
        let a = AnonymousRecord {
            type_id: TypeId(10),
            field_names: vec!["x".into(), "y".into()],
            field_types: vec![
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
            ],
        };
        let b = AnonymousRecord {
            type_id: TypeId(11),
            field_names: vec!["x".into(), "y".into()],
            field_types: vec![
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
            ],
        };
        assert_eq!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn anonymous_record_dedup_key_differs_on_field_order() {
        let a = AnonymousRecord {
            type_id: TypeId(10),
            field_names: vec!["x".into(), "y".into()],
            field_types: vec![
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
            ],
        };
        let b = AnonymousRecord {
            type_id: TypeId(11),
            field_names: vec!["y".into(), "x".into()],
            field_types: vec![
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
            ],
        };
        assert_ne!(a.dedup_key(), b.dedup_key());
    }

    #[test]
    fn const_value_typeof_preserves_null_quirk() {
        assert_eq!(ConstValue::Null.typeof_str(), "object");
        assert_eq!(ConstValue::Boolean(true).typeof_str(), "boolean");
        assert_eq!(ConstValue::Number(1.0).typeof_str(), "number");
        assert_eq!(ConstValue::Str("hi".into()).typeof_str(), "string");
    }

    #[test]
    fn serde_roundtrip_ir_type() {
        let t = IrType::Array(Box::new(ArrayType {
            element: IrType::Named(NamedType::new("Widget", Ownership::Own)),
            ownership: Ownership::Value,
        }));
        let json = serde_json::to_string(&t).unwrap();
        let back: IrType = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }

    #[test]
    fn serde_roundtrip_promise_and_union() {
        let promise = IrType::Promise(Box::new(IrType::Primitive(Primitive::Integer)));
        let json = serde_json::to_string(&promise).unwrap();
        let back: IrType = serde_json::from_str(&json).unwrap();
        assert_eq!(promise, back);

        let union = IrType::Union(vec![
            IrType::Primitive(Primitive::Str),
            IrType::Primitive(Primitive::Void),
        ]);
        let json = serde_json::to_string(&union).unwrap();
        let back: IrType = serde_json::from_str(&json).unwrap();
        assert_eq!(union, back);
    }
}
