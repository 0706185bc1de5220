//! Newtype identifiers used across the IR.
//!
//! Each id is a thin wrapper over `u32` so that mixing up, say, a
//! [`ModuleId`] and a [`FunctionId`] is a type error rather than a runtime
//! bug. [`ClassNodeId`] additionally bridges to `petgraph`'s `NodeIndex`,
//! which the ownership analyzer's class graph needs and nothing else does.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

macro_rules! simple_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u32);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

simple_id!(ModuleId);
simple_id!(FunctionId);
simple_id!(ClassId);
simple_id!(BlockId);

/// Identifies a type within a [`crate::type_id::TypeRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(pub u32);

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeId({})", self.0)
    }
}

/// A node in the ownership analyzer's class graph. Bridges to petgraph's
/// `NodeIndex<u32>` so the analyzer can hand ids straight to a `StableGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassNodeId(pub u32);

impl From<NodeIndex<u32>> for ClassNodeId {
    fn from(idx: NodeIndex<u32>) -> Self {
        ClassNodeId(idx.index() as u32)
    }
}

impl From<ClassNodeId> for NodeIndex<u32> {
    fn from(id: ClassNodeId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}
