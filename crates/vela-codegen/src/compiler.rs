//! Whole-program orchestration: iterate every module, emit its header and
//! translation unit, and generate the `main.cpp` entry point (spec §4.7
//! "Entry point", §6.3 "Backend output").
//!
//! Unlike the teacher's LLVM pipeline this never invokes a toolchain -- the
//! output is plain text, handed back as a set of (path, contents) pairs for
//! the caller (`vela-cli`) to write to disk or feed to an external C++
//! driver.

use vela_ir::{Decl, FunctionDecl, Program, TypeRegistry};

use crate::codegen::{emit_class, emit_function};
use crate::error::CodegenError;
use crate::runtime::RuntimeNeeds;
use crate::types::RecordRegistry;
use crate::CompileConfig;

/// One generated file: its path relative to the output directory, and its
/// full text contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFile {
    pub path: String,
    pub contents: String,
}

/// The full set of files a compilation produces (spec §6.3: one header +
/// one translation unit per module, plus `main.cpp`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledProgram {
    pub files: Vec<CompiledFile>,
}

/// Compiles `program` to C++ source text under `config`.
///
/// `registry` must be the `TypeRegistry` the lowering stage produced for
/// this same program -- it carries every anonymous record shape the
/// backend needs to synthesize struct definitions for.
pub fn compile(
    program: &Program,
    registry: &TypeRegistry,
    config: &CompileConfig,
) -> Result<CompiledProgram, CodegenError> {
    let records = RecordRegistry::from_type_registry(registry);
    let mode = config.memory_mode;

    let mut needs = RuntimeNeeds::default();
    for module in &program.modules {
        let scanned = RuntimeNeeds::scan(module.imports.iter().map(|i| i.source_module.as_str()));
        needs.filesystem |= scanned.filesystem || config.enable_filesystem;
        needs.http |= scanned.http || config.enable_http;
    }
    let includes = needs.include_lines().join("\n");

    let mut files = Vec::with_capacity(program.modules.len() * 2 + 1);
    let record_defs = records.emit_struct_defs(mode)?;
    let (entry_module, _) = find_entry_function(program, config)?;

    for module in &program.modules {
        let guard = module.path.replace(['/', '-'], "_").to_uppercase();
        let mut header = String::new();
        header.push_str(&format!("#ifndef VELA_{guard}_H\n#define VELA_{guard}_H\n\n"));
        header.push_str(&includes);
        header.push_str("\n\n");
        if module.path == entry_module {
            header.push_str(&record_defs);
        }

        let mut source = String::new();
        source.push_str(&format!("#include \"{}.h\"\n\n", module.path));

        for decl in &module.declarations {
            match decl {
                Decl::Function(f) => {
                    let (decl_text, def_text) = emit_function(f, mode, &records)?;
                    header.push_str(&decl_text);
                    header.push('\n');
                    source.push_str(&def_text);
                    source.push('\n');
                }
                Decl::Class(c) => {
                    let (decl_text, def_text) = emit_class(c, mode, &records)?;
                    header.push_str(&decl_text);
                    source.push_str(&def_text);
                }
                Decl::Const(_) | Decl::Interface(_) | Decl::TypeAlias(_) => {}
            }
        }

        header.push_str("\n#endif\n");

        files.push(CompiledFile { path: format!("{}.h", module.path), contents: header });
        files.push(CompiledFile { path: format!("{}.cpp", module.path), contents: source });
    }

    let main_cpp = emit_main(program, config, &includes)?;
    files.push(CompiledFile { path: "main.cpp".to_string(), contents: main_cpp });

    Ok(CompiledProgram { files })
}

/// Finds the entry function per spec §4.7: the configured name, else the
/// first function named `main`, else the first function declared anywhere
/// in the program (in module order). The entry function must take no
/// parameters.
fn find_entry_function<'a>(
    program: &'a Program,
    config: &CompileConfig,
) -> Result<(&'a str, &'a FunctionDecl), CodegenError> {
    let all_functions = || {
        program.modules.iter().flat_map(|m| {
            m.declarations.iter().filter_map(move |d| match d {
                Decl::Function(f) => Some((m.path.as_str(), f)),
                _ => None,
            })
        })
    };

    let found = if let Some(name) = &config.entry_function {
        all_functions().find(|(_, f)| f.name == *name)
    } else {
        all_functions()
            .find(|(_, f)| f.name == "main")
            .or_else(|| all_functions().next())
    };

    let (module_path, f) = found.ok_or(CodegenError::NoEntryFunction)?;
    if !f.params.is_empty() {
        return Err(CodegenError::InvalidEntryFunction(format!(
            "entry function '{}' takes parameters; main must take none",
            f.name
        )));
    }
    Ok((module_path, f))
}

fn emit_main(program: &Program, config: &CompileConfig, includes: &str) -> Result<String, CodegenError> {
    let (module_path, entry) = find_entry_function(program, config)?;
    let qualified = format!("{}::{}", module_path.replace('/', "::"), entry.name);

    let mut out = String::new();
    out.push_str(includes);
    out.push_str(&format!("\n#include \"{}.h\"\n\n", module_path));
    out.push_str("int main() {\n");
    if entry.is_async {
        out.push_str(&format!("    vela::block_on({}());\n", qualified));
    } else {
        out.push_str(&format!("    {}();\n", qualified));
    }
    out.push_str("    return 0;\n}\n");
    Ok(out)
}
