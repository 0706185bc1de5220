//! Runtime value representation for the tree-walking interpreter.
//!
//! [`Value`] is the dynamic runtime counterpart to `vela_ir`'s static type
//! system: every expression evaluation produces one.

use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use vela_ir::{ConstValue, Param, StatementBlock};

/// A runtime value. Ownership tags from the static type system are erased
/// here -- the interpreter exists to check program *behavior*, and ownership
/// legality is `vela-analyze`'s job, already run before this stage sees the
/// program (spec §8: equivalence-testing harness).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Integer(i32),
    Integer53(i64),
    Str(String),
    Boolean(bool),
    Null,
    Void,
    Array(Vec<Value>),
    /// An object instance: its class name plus field values, order-preserved
    /// for deterministic display.
    Object {
        class_name: String,
        fields: Vec<(String, Value)>,
    },
    Closure(Rc<ClosureValue>),
    /// A settled promise -- the interpreter resolves awaits eagerly, since it
    /// has no concurrent scheduler of its own (see `Interpreter::eval_expr`'s
    /// handling of `Expr::Await`).
    Promise(Box<Value>),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClosureValue {
    pub params: Vec<Param>,
    pub body: StatementBlock,
    pub captures: HashMap<String, Value>,
}

impl PartialEq for ClosureValue {
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

impl Value {
    pub fn from_const(cv: &ConstValue) -> Value {
        match cv {
            ConstValue::Number(v) => Value::Number(*v),
            ConstValue::Integer(v) => Value::Integer(*v),
            ConstValue::Integer53(v) => Value::Integer53(*v),
            ConstValue::Str(s) => Value::Str(s.clone()),
            ConstValue::Boolean(b) => Value::Boolean(*b),
            ConstValue::Null => Value::Null,
            ConstValue::Void => Value::Void,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Integer(_) => "integer",
            Value::Integer53(_) => "integer53",
            Value::Str(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Null => "null",
            Value::Void => "void",
            Value::Array(_) => "array",
            Value::Object { .. } => "object",
            Value::Closure(_) => "function",
            Value::Promise(_) => "promise",
        }
    }

    /// Truthiness per the source dialect's coercion rules (spec §4.1's 110
    /// diagnostic covers *disallowing* implicit use in `if`/`while`
    /// conditions that aren't already boolean; this is what the interpreter
    /// falls back to for the handful of constructs -- e.g. array/object
    /// truthiness in a ternary -- the validator permits through).
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Integer(i) => *i != 0,
            Value::Integer53(i) => *i != 0,
            Value::Str(s) => !s.is_empty(),
            Value::Null | Value::Void => false,
            Value::Array(_) | Value::Object { .. } | Value::Closure(_) | Value::Promise(_) => true,
        }
    }

    /// Rendered the way `print`/template concatenation display a value.
    pub fn display(&self) -> String {
        match self {
            Value::Number(n) => format!("{n}"),
            Value::Integer(i) => format!("{i}"),
            Value::Integer53(i) => format!("{i}"),
            Value::Str(s) => s.clone(),
            Value::Boolean(b) => format!("{b}"),
            Value::Null => "null".to_string(),
            Value::Void => "undefined".to_string(),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(Value::display).collect();
                rendered.join(",")
            }
            Value::Object { class_name, .. } => format!("[object {class_name}]"),
            Value::Closure(_) => "[function]".to_string(),
            Value::Promise(inner) => inner.display(),
        }
    }
}
