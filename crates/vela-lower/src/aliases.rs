//! Type-alias resolution (spec §4.2 "Type lowering rules"): substitutes
//! `TypeAliasDecl` references wherever a `NamedType` names one, so every
//! later stage sees the aliased shape directly rather than a name it would
//! have to look up itself.

use std::collections::HashMap;

use vela_ir::{Decl, IrType, Module, Program};

use crate::error::LowerError;

pub struct AliasTable {
    aliases: HashMap<String, IrType>,
}

impl AliasTable {
    pub fn build(program: &Program) -> Self {
        let mut aliases = HashMap::new();
        for (_, decl) in program.all_decls() {
            if let Decl::TypeAlias(alias) = decl {
                aliases.insert(alias.name.clone(), alias.aliased.clone());
            }
        }
        AliasTable { aliases }
    }

    /// Fully resolves `ty`, substituting any alias name with its aliased
    /// type, recursively, until a non-alias shape is reached.
    pub fn resolve(&self, ty: &IrType) -> Result<IrType, LowerError> {
        self.resolve_with_stack(ty, &mut Vec::new())
    }

    fn resolve_with_stack(&self, ty: &IrType, stack: &mut Vec<String>) -> Result<IrType, LowerError> {
        match ty {
            IrType::Named(named) => {
                if let Some(aliased) = self.aliases.get(&named.name) {
                    if stack.contains(&named.name) {
                        return Err(LowerError::CyclicTypeAlias(named.name.clone()));
                    }
                    stack.push(named.name.clone());
                    let resolved = self.resolve_with_stack(aliased, stack)?;
                    stack.pop();
                    Ok(resolved)
                } else {
                    let mut resolved = named.clone();
                    resolved.type_args = named
                        .type_args
                        .iter()
                        .map(|t| self.resolve_with_stack(t, stack))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(IrType::Named(resolved))
                }
            }
            IrType::Array(arr) => Ok(IrType::Array(Box::new(vela_ir::ArrayType {
                element: self.resolve_with_stack(&arr.element, stack)?,
                ownership: arr.ownership,
            }))),
            IrType::Map(map) => Ok(IrType::Map(Box::new(vela_ir::MapType {
                key: self.resolve_with_stack(&map.key, stack)?,
                value: self.resolve_with_stack(&map.value, stack)?,
                ownership: map.ownership,
            }))),
            IrType::Function(func) => Ok(IrType::Function(Box::new(vela_ir::FunctionType {
                params: func
                    .params
                    .iter()
                    .map(|t| self.resolve_with_stack(t, stack))
                    .collect::<Result<Vec<_>, _>>()?,
                return_type: self.resolve_with_stack(&func.return_type, stack)?,
            }))),
            IrType::Union(members) => Ok(IrType::Union(
                members
                    .iter()
                    .map(|t| self.resolve_with_stack(t, stack))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            IrType::Nullable(inner) => Ok(IrType::Nullable(Box::new(
                self.resolve_with_stack(inner, stack)?,
            ))),
            IrType::Promise(inner) => Ok(IrType::Promise(Box::new(
                self.resolve_with_stack(inner, stack)?,
            ))),
            IrType::Primitive(_) | IrType::Dynamic => Ok(ty.clone()),
        }
    }
}

/// Resolves every type slot reachable from `module`'s declarations in place.
pub fn resolve_module_aliases(module: &mut Module, table: &AliasTable) -> Result<(), LowerError> {
    for decl in &mut module.declarations {
        match decl {
            Decl::Const(c) => c.ty = table.resolve(&c.ty)?,
            Decl::Function(f) => {
                f.return_type = table.resolve(&f.return_type)?;
                for p in &mut f.params {
                    p.ty = table.resolve(&p.ty)?;
                }
            }
            Decl::Class(c) => {
                for field in &mut c.fields {
                    field.ty = table.resolve(&field.ty)?;
                }
                for method in &mut c.methods {
                    method.return_type = table.resolve(&method.return_type)?;
                    for p in &mut method.params {
                        p.ty = table.resolve(&p.ty)?;
                    }
                }
                if let Some(ctor) = &mut c.constructor {
                    for p in &mut ctor.params {
                        p.ty = table.resolve(&p.ty)?;
                    }
                }
            }
            Decl::Interface(i) => {
                for prop in &mut i.properties {
                    prop.ty = table.resolve(&prop.ty)?;
                }
                for sig in &mut i.methods {
                    sig.return_type = table.resolve(&sig.return_type)?;
                    for p in &mut sig.params {
                        p.ty = table.resolve(&p.ty)?;
                    }
                }
            }
            Decl::TypeAlias(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_ir::{NamedType, Ownership, TypeAliasDecl};

    fn program_with_alias(alias: TypeAliasDecl) -> Program {
        let mut module = Module::new("main");
        module.declarations.push(Decl::TypeAlias(alias));
        Program::new(vec![module])
    }

    #[test]
    fn resolves_one_level_of_alias() {
        let program = program_with_alias(TypeAliasDecl {
            name: "NodeRef".into(),
            aliased: IrType::Named(NamedType::new("Node", Ownership::Share)),
        });
        let table = AliasTable::build(&program);
        let resolved = table
            .resolve(&IrType::Named(NamedType::new("NodeRef", Ownership::Own)))
            .unwrap();
        assert_eq!(resolved, IrType::Named(NamedType::new("Node", Ownership::Share)));
    }

    #[test]
    fn non_alias_named_type_passes_through() {
        let program = Program::new(vec![Module::new("main")]);
        let table = AliasTable::build(&program);
        let ty = IrType::Named(NamedType::new("Widget", Ownership::Own));
        assert_eq!(table.resolve(&ty).unwrap(), ty);
    }

    #[test]
    fn self_referential_alias_is_a_cycle_error() {
        let program = program_with_alias(TypeAliasDecl {
            name: "Loop".into(),
            aliased: IrType::Named(NamedType::new("Loop", Ownership::Own)),
        });
        let table = AliasTable::build(&program);
        let err = table
            .resolve(&IrType::Named(NamedType::new("Loop", Ownership::Own)))
            .unwrap_err();
        assert_eq!(err, LowerError::CyclicTypeAlias("Loop".into()));
    }
}
