//! Mapping from IR types to C++ spellings (spec §4.7 "Type lowering").
//!
//! Every [`IrType`] lowers to a [`CppType`]: a spelling plus whether values
//! of the type are pointer-like (accessed with `->`) or plain values
//! (accessed with `.`). Only named classes and GC-mode collections are
//! pointer-like here; ownership-mode collections, promises, and anonymous
//! records stay value types even though they dispatch to a different
//! template argument per [`Ownership`].

use std::collections::BTreeMap;
use std::fmt::Write as _;

use vela_ir::{ArrayType, FunctionType, IrType, MapType, MemoryMode, NamedType, Ownership, Primitive, TypeRegistry};

use crate::error::CodegenError;

/// A C++ type spelling plus the access operator to reach its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppType {
    pub spelling: String,
    pub is_pointer: bool,
}

impl CppType {
    fn value(spelling: impl Into<String>) -> Self {
        CppType {
            spelling: spelling.into(),
            is_pointer: false,
        }
    }

    fn pointer(spelling: impl Into<String>) -> Self {
        CppType {
            spelling: spelling.into(),
            is_pointer: true,
        }
    }

    /// `.` for value types, `->` for pointer-like ones.
    pub fn access_op(&self) -> &'static str {
        if self.is_pointer {
            "->"
        } else {
            "."
        }
    }
}

/// Anonymous record shapes, keyed by the `New::class_name` the lowerer's
/// SSA conversion gives them (`vela_lower::anonymous_record_class_name`),
/// so the backend can recognize a synthesized record constructor and tell
/// it apart from a real class's (spec §4.7 "Anonymous record" row). The
/// `TypeRegistry` has already deduplicated identical shapes to one
/// `TypeId`, so no further interning happens here.
#[derive(Debug, Default)]
pub struct RecordRegistry {
    records: BTreeMap<String, (Vec<String>, Vec<IrType>)>,
}

impl RecordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the registry from every record the lowerer interned.
    pub fn from_type_registry(registry: &TypeRegistry) -> Self {
        let mut records = BTreeMap::new();
        for record in registry.all() {
            let class_name = vela_lower::anonymous_record_class_name(record.type_id);
            records.insert(class_name, (record.field_names.clone(), record.field_types.clone()));
        }
        RecordRegistry { records }
    }

    /// Whether `class_name` names a synthesized record rather than a real
    /// class. The struct's C++ name is `class_name` itself -- already a
    /// valid identifier.
    pub fn is_record(&self, class_name: &str) -> bool {
        self.records.contains_key(class_name)
    }

    pub fn emit_struct_defs(&self, mode: MemoryMode) -> Result<String, CodegenError> {
        let mut out = String::new();
        for (name, (field_names, field_types)) in &self.records {
            writeln!(out, "struct {} {{", name).unwrap();
            for (field_name, field_ty) in field_names.iter().zip(field_types) {
                let cpp = lower_type(field_ty, mode, self)?;
                writeln!(out, "    {} {};", cpp.spelling, field_name).unwrap();
            }
            writeln!(out, "}};\n").unwrap();
        }
        Ok(out)
    }
}

/// Lowers an [`IrType`] to its C++ spelling under `mode` (spec §4.7's type
/// table, both GC and ownership-mode columns).
pub fn lower_type(
    ty: &IrType,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<CppType, CodegenError> {
    match ty {
        IrType::Primitive(p) => Ok(lower_primitive(*p)),
        IrType::Named(named) => Ok(lower_named(named, mode)),
        IrType::Array(arr) => lower_array(arr, mode, records),
        IrType::Map(map) => lower_map(map, mode, records),
        IrType::Function(func) => lower_function(func, mode, records),
        IrType::Union(variants) => lower_union(variants, mode, records),
        IrType::Nullable(inner) => lower_nullable(inner, mode, records),
        IrType::Promise(inner) => lower_promise(inner, mode, records),
        IrType::Dynamic => Ok(CppType::value("vela::Dynamic")),
    }
}

fn lower_primitive(p: Primitive) -> CppType {
    match p {
        Primitive::Number => CppType::value("double"),
        Primitive::Integer => CppType::value("int32_t"),
        Primitive::Integer53 => CppType::value("int64_t"),
        Primitive::Str => CppType::value("vela::String"),
        Primitive::Boolean => CppType::value("bool"),
        Primitive::Void => CppType::value("void"),
        Primitive::Never => CppType::value("vela::Never"),
    }
}

fn lower_named(named: &NamedType, mode: MemoryMode) -> CppType {
    let qualified = named.name.replace('/', "::");
    match mode {
        MemoryMode::Gc => CppType::pointer(format!("vela::Gc<{}>", qualified)),
        MemoryMode::Ownership => match named.ownership {
            Ownership::Own => CppType::pointer(format!("std::unique_ptr<{}>", qualified)),
            Ownership::Share => CppType::pointer(format!("std::shared_ptr<{}>", qualified)),
            Ownership::Use => CppType::pointer(format!("{}*", qualified)),
            Ownership::Value => CppType::value(qualified),
        },
    }
}

fn lower_array(
    arr: &ArrayType,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<CppType, CodegenError> {
    let elem = lower_type(&arr.element, mode, records)?;
    Ok(match mode {
        MemoryMode::Gc => CppType::pointer(format!("vela::GcArray<{}>", elem.spelling)),
        MemoryMode::Ownership => {
            CppType::value(format!("vela::Array<{}, {}>", elem.spelling, ownership_tag(arr.ownership)))
        }
    })
}

fn lower_map(
    map: &MapType,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<CppType, CodegenError> {
    let key = lower_type(&map.key, mode, records)?;
    let value = lower_type(&map.value, mode, records)?;
    Ok(match mode {
        MemoryMode::Gc => CppType::pointer(format!("vela::GcMap<{}, {}>", key.spelling, value.spelling)),
        MemoryMode::Ownership => CppType::value(format!(
            "vela::Map<{}, {}, {}>",
            key.spelling,
            value.spelling,
            ownership_tag(map.ownership)
        )),
    })
}

fn lower_function(
    func: &FunctionType,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<CppType, CodegenError> {
    let ret = lower_type(&func.return_type, mode, records)?;
    let mut params = Vec::with_capacity(func.params.len());
    for p in &func.params {
        params.push(lower_type(p, mode, records)?.spelling);
    }
    Ok(CppType::value(format!(
        "std::function<{}({})>",
        ret.spelling,
        params.join(", ")
    )))
}

fn lower_union(
    variants: &[IrType],
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<CppType, CodegenError> {
    let mut spellings = Vec::with_capacity(variants.len());
    for v in variants {
        spellings.push(lower_type(v, mode, records)?.spelling);
    }
    Ok(CppType::value(format!("std::variant<{}>", spellings.join(", "))))
}

fn lower_nullable(
    inner: &IrType,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<CppType, CodegenError> {
    let inner_ty = lower_type(inner, mode, records)?;
    // A pointer-like type is already nullable; wrapping it in optional<T>
    // would add a second empty state with no source-level meaning.
    Ok(if inner_ty.is_pointer {
        inner_ty
    } else {
        CppType::value(format!("std::optional<{}>", inner_ty.spelling))
    })
}

fn lower_promise(
    inner: &IrType,
    mode: MemoryMode,
    records: &RecordRegistry,
) -> Result<CppType, CodegenError> {
    let inner_ty = lower_type(inner, mode, records)?;
    Ok(CppType::value(format!("vela::Task<{}>", inner_ty.spelling)))
}

fn ownership_tag(ownership: Ownership) -> &'static str {
    match ownership {
        Ownership::Own => "vela::Own",
        Ownership::Share => "vela::Share",
        Ownership::Use => "vela::Use",
        Ownership::Value => "vela::Val",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{ArrayType, MapType, NamedType};

    #[test]
    fn number_lowers_to_double() {
        let registry = RecordRegistry::new();
        let ty = lower_type(&IrType::Primitive(Primitive::Number), MemoryMode::Gc, &registry).unwrap();
        assert_eq!(ty.spelling, "double");
        assert!(!ty.is_pointer);
    }

    #[test]
    fn named_own_under_gc_is_managed_pointer() {
        let registry = RecordRegistry::new();
        let named = NamedType::new("Widget", Ownership::Own);
        let ty = lower_named(&named, MemoryMode::Gc);
        assert_eq!(ty.spelling, "vela::Gc<Widget>");
        assert!(ty.is_pointer);
    }

    #[test]
    fn named_share_under_ownership_is_shared_ptr() {
        let named = NamedType::new("Widget", Ownership::Share);
        let ty = lower_named(&named, MemoryMode::Ownership);
        assert_eq!(ty.spelling, "std::shared_ptr<Widget>");
        assert!(ty.is_pointer);
    }

    #[test]
    fn named_use_under_ownership_is_raw_pointer() {
        let named = NamedType::new("Widget", Ownership::Use);
        let ty = lower_named(&named, MemoryMode::Ownership);
        assert_eq!(ty.spelling, "Widget*");
        assert!(ty.is_pointer);
    }

    #[test]
    fn array_under_gc_is_pointer_like() {
        let registry = RecordRegistry::new();
        let arr = ArrayType {
            element: IrType::Primitive(Primitive::Integer),
            ownership: Ownership::Own,
        };
        let ty = lower_array(&arr, MemoryMode::Gc, &registry).unwrap();
        assert!(ty.is_pointer);
        assert_eq!(ty.spelling, "vela::GcArray<int32_t>");
    }

    #[test]
    fn array_under_ownership_is_value_type_with_mode_tag() {
        let registry = RecordRegistry::new();
        let arr = ArrayType {
            element: IrType::Primitive(Primitive::Integer),
            ownership: Ownership::Share,
        };
        let ty = lower_array(&arr, MemoryMode::Ownership, &registry).unwrap();
        assert!(!ty.is_pointer);
        assert_eq!(ty.spelling, "vela::Array<int32_t, vela::Share>");
    }

    #[test]
    fn nullable_pointer_stays_unwrapped() {
        let registry = RecordRegistry::new();
        let named = IrType::Named(NamedType::new("Widget", Ownership::Own));
        let nullable = IrType::Nullable(Box::new(named));
        let ty = lower_type(&nullable, MemoryMode::Gc, &registry).unwrap();
        assert_eq!(ty.spelling, "vela::Gc<Widget>");
    }

    #[test]
    fn nullable_value_type_wraps_in_optional() {
        let registry = RecordRegistry::new();
        let nullable = IrType::Nullable(Box::new(IrType::Primitive(Primitive::Number)));
        let ty = lower_type(&nullable, MemoryMode::Gc, &registry).unwrap();
        assert_eq!(ty.spelling, "std::optional<double>");
    }

    #[test]
    fn promise_lowers_to_task() {
        let registry = RecordRegistry::new();
        let promise = IrType::Promise(Box::new(IrType::Primitive(Primitive::Str)));
        let ty = lower_type(&promise, MemoryMode::Gc, &registry).unwrap();
        assert_eq!(ty.spelling, "vela::Task<vela::String>");
        assert!(!ty.is_pointer);
    }

    #[test]
    fn map_under_gc_is_pointer_like() {
        let registry = RecordRegistry::new();
        let map = MapType {
            key: IrType::Primitive(Primitive::Str),
            value: IrType::Primitive(Primitive::Number),
            ownership: Ownership::Own,
        };
        let ty = lower_map(&map, MemoryMode::Gc, &registry).unwrap();
        assert!(ty.is_pointer);
        assert_eq!(ty.spelling, "vela::GcMap<vela::String, double>");
    }
}
