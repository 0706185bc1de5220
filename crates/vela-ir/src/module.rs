//! Program structure (spec §3.3): a `Program` is an ordered list of
//! `Module`s, each an ordered list of imports followed by an ordered list
//! of declarations. Unlike a filesystem-style module tree, source-dialect
//! modules form a flat namespace addressed by path string, not by
//! parent/child id -- so resolution is a simple path lookup, not a tree
//! walk.

use serde::{Deserialize, Serialize};

use crate::ast::Decl;

/// A single `import { a, b as c } from "./other"` clause (spec §3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub source_module: String,
    /// `(imported name, optional local alias)` pairs, in source order.
    pub names: Vec<(String, Option<String>)>,
}

impl Import {
    pub fn new(source_module: impl Into<String>, names: Vec<(String, Option<String>)>) -> Self {
        Import {
            source_module: source_module.into(),
            names,
        }
    }

    /// The local name a given imported name binds to: its alias if present,
    /// otherwise the imported name itself.
    pub fn local_name(&self, imported: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|(name, _)| name == imported)
            .map(|(name, alias)| alias.as_deref().unwrap_or(name.as_str()))
    }
}

/// One source file's worth of declarations (spec §3.3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub path: String,
    pub imports: Vec<Import>,
    pub declarations: Vec<Decl>,
}

impl Module {
    pub fn new(path: impl Into<String>) -> Self {
        Module {
            path: path.into(),
            imports: Vec::new(),
            declarations: Vec::new(),
        }
    }

    pub fn find_decl(&self, name: &str) -> Option<&Decl> {
        self.declarations.iter().find(|d| d.name() == name)
    }
}

/// A whole compilation unit: every module reachable from the entry point,
/// in the order the front end discovered them (spec §3.3: "modules form a
/// flat list, ordered by discovery").
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub modules: Vec<Module>,
}

impl Program {
    pub fn new(modules: Vec<Module>) -> Self {
        Program { modules }
    }

    pub fn find_module(&self, path: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.path == path)
    }

    /// All declarations across all modules, in module-then-declaration
    /// order -- the order the validator and lowerer are required to walk
    /// (spec §4.1: "diagnostics within a file are emitted in source order").
    pub fn all_decls(&self) -> impl Iterator<Item = (&str, &Decl)> {
        self.modules
            .iter()
            .flat_map(|m| m.declarations.iter().map(move |d| (m.path.as_str(), d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ConstDecl, Expr};
    use crate::types::{ConstValue, IrType, Primitive};

    fn const_decl(name: &str) -> Decl {
        Decl::Const(ConstDecl {
            name: name.to_string(),
            ty: IrType::Primitive(Primitive::Integer),
            init: Expr::Literal(ConstValue::Integer(1)),
            location: None,
        })
    }

    #[test]
    fn import_local_name_prefers_alias() {
        let import = Import::new(
            "./math",
            vec![
                ("add".to_string(), None),
                ("sub".to_string(), Some("subtract".to_string())),
            ],
        );
        assert_eq!(import.local_name("add"), Some("add"));
        assert_eq!(import.local_name("sub"), Some("subtract"));
        assert_eq!(import.local_name("missing"), None);
    }

    #[test]
    fn module_find_decl_by_name() {
        let mut module = Module::new("main");
        module.declarations.push(const_decl("ONE"));
        assert!(module.find_decl("ONE").is_some());
        assert!(module.find_decl("TWO").is_none());
    }

    #[test]
    fn program_find_module_by_path() {
        let program = Program::new(vec![Module::new("main"), Module::new("lib/util")]);
        assert!(program.find_module("lib/util").is_some());
        assert!(program.find_module("nope").is_none());
    }

    #[test]
    fn program_all_decls_preserves_module_and_declaration_order() {
        let mut main = Module::new("main");
        main.declarations.push(const_decl("A"));
        main.declarations.push(const_decl("B"));
        let mut util = Module::new("util");
        util.declarations.push(const_decl("C"));

        let program = Program::new(vec![main, util]);
        let names: Vec<_> = program
            .all_decls()
            .map(|(path, decl)| (path, decl.name()))
            .collect();
        assert_eq!(
            names,
            vec![("main", "A"), ("main", "B"), ("util", "C")]
        );
    }

    #[test]
    fn serde_roundtrip_program() {
        let mut module = Module::new("main");
        module.imports.push(Import::new("./math", vec![("add".into(), None)]));
        module.declarations.push(const_decl("X"));
        let program = Program::new(vec![module]);

        let json = serde_json::to_string(&program).unwrap();
        let back: Program = serde_json::from_str(&json).unwrap();
        assert_eq!(program, back);
    }
}
