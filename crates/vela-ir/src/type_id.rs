//! Registry for synthesized anonymous record types (spec §4.2, §9).
//!
//! Object literals carry no declared type. The lowerer synthesizes a
//! structural [`crate::types::AnonymousRecord`] from the literal's field
//! names and inferred field types, and this registry is where that
//! synthesis is deduplicated: two literals with the same ordered
//! field-name list and the same per-field types share one [`TypeId`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::TypeId;
use crate::types::{AnonymousRecord, IrType};

/// Registry of anonymous record types synthesized during lowering.
///
/// This is intentionally narrow: named classes/interfaces/type-aliases are
/// resolved by name against the module's declaration list (see
/// `vela_ir::module`), not through this registry. Only structurally-typed
/// object literals need interning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeRegistry {
    records: Vec<AnonymousRecord>,
    by_key: HashMap<(Vec<String>, Vec<IrType>), TypeId>,
    next_id: u32,
}

impl TypeRegistry {
    pub fn new() -> Self {
        TypeRegistry::default()
    }

    /// Interns an object literal's shape, returning the `TypeId` of the
    /// (possibly pre-existing) anonymous record. Structural deduplication:
    /// identical ordered field names and field types always return the same
    /// id, regardless of how many times the shape is seen.
    pub fn intern(&mut self, field_names: Vec<String>, field_types: Vec<IrType>) -> TypeId {
        let key = (field_names.clone(), field_types.clone());
        if let Some(existing) = self.by_key.get(&key) {
            return *existing;
        }
        let id = TypeId(self.next_id);
        self.next_id += 1;
        self.records.push(AnonymousRecord {
            type_id: id,
            field_names,
            field_types,
        });
        self.by_key.insert(key, id);
        id
    }

    pub fn get(&self, id: TypeId) -> Option<&AnonymousRecord> {
        self.records.get(id.0 as usize)
    }

    /// All synthesized records, in the order they were first interned. This
    /// order is what the backend uses to emit deterministic struct
    /// declarations (spec §8 invariant 7: backend determinism).
    pub fn all(&self) -> &[AnonymousRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;

    fn point_shape() -> (Vec<String>, Vec<IrType>) {
        (
            vec!["x".into(), "y".into()],
            vec![
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
            ],
        )
    }

    #[test]
    fn interning_identical_shapes_returns_same_id() {
        let mut reg = TypeRegistry::new();
        let (names_a, types_a) = point_shape();
        let (names_b, types_b) = point_shape();
        let id_a = reg.intern(names_a, types_a);
        let id_b = reg.intern(names_b, types_b);
        assert_eq!(id_a, id_b);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn interning_different_shapes_returns_different_ids() {
        let mut reg = TypeRegistry::new();
        let (names, types) = point_shape();
        let id_a = reg.intern(names, types);
        let id_b = reg.intern(
            vec!["x".into(), "y".into(), "z".into()],
            vec![
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
            ],
        );
        assert_ne!(id_a, id_b);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn field_order_is_part_of_the_dedup_key() {
        let mut reg = TypeRegistry::new();
        let id_a = reg.intern(
            vec!["x".into(), "y".into()],
            vec![
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
            ],
        );
        let id_b = reg.intern(
            vec!["y".into(), "x".into()],
            vec![
                IrType::Primitive(Primitive::Integer),
                IrType::Primitive(Primitive::Integer),
            ],
        );
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn get_resolves_registered_record() {
        let mut reg = TypeRegistry::new();
        let (names, types) = point_shape();
        let id = reg.intern(names.clone(), types.clone());
        let record = reg.get(id).unwrap();
        assert_eq!(record.field_names, names);
        assert_eq!(record.field_types, types);
    }

    #[test]
    fn all_preserves_first_seen_order() {
        let mut reg = TypeRegistry::new();
        let id_first = reg.intern(vec!["a".into()], vec![IrType::Primitive(Primitive::Str)]);
        let id_second = reg.intern(
            vec!["b".into()],
            vec![IrType::Primitive(Primitive::Boolean)],
        );
        let all = reg.all();
        assert_eq!(all[0].type_id, id_first);
        assert_eq!(all[1].type_id, id_second);
    }

    #[test]
    fn serde_roundtrip() {
        let mut reg = TypeRegistry::new();
        let (names, types) = point_shape();
        reg.intern(names, types);
        let json = serde_json::to_string(&reg).unwrap();
        let back: TypeRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), reg.len());
    }
}
