//! C++ code generation for Vela programs (spec §4.7).
//!
//! This crate is the final pipeline stage: it takes a lowered, analyzed,
//! optimized, SSA-converted `vela_ir::Program` and emits one header +
//! translation unit pair per module plus a generated `main.cpp`.
//!
//! # Modules
//!
//! - [`error`] -- backend failure modes
//! - [`types`] -- mapping from `IrType` to C++ spellings, anonymous-record
//!   struct synthesis
//! - [`runtime`] -- feature-gated runtime header includes
//! - [`codegen`] -- per-function/class/SSA-body emission
//! - [`compiler`] -- whole-program orchestration and entry-point generation

pub mod codegen;
pub mod compiler;
pub mod error;
pub mod runtime;
pub mod types;

pub use compiler::{compile, CompiledFile, CompiledProgram};

use serde::{Deserialize, Serialize};
use vela_ir::MemoryMode;

/// Optimization level, passed verbatim to the external C++ driver (spec
/// §6.5) -- this crate never invokes a compiler itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptLevel {
    O0,
    O1,
    O2,
    O3,
}

impl Default for OptLevel {
    fn default() -> Self {
        OptLevel::O0
    }
}

/// Options controlling backend emission (spec §6.4 memory mode, §6.5
/// recognized configuration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// GC vs ownership lowering (§4.7's type table).
    pub memory_mode: MemoryMode,

    /// Passed verbatim to the external C++ driver; this crate does not act
    /// on it beyond recording it for that driver's benefit.
    pub opt_level: OptLevel,

    /// Enables source locations in generated code; per spec, also disables
    /// optimization if the driver honors `opt_level` conditionally on this.
    pub debug: bool,

    /// Passed verbatim to the external C++ driver. `None` means host native.
    pub target_triple: Option<String>,

    /// Includes the filesystem runtime header regardless of whether any
    /// module imports `fs` -- set when the embedding tool already knows the
    /// program needs it without re-scanning imports.
    pub enable_filesystem: bool,

    /// Same as `enable_filesystem`, for the `http` runtime header.
    pub enable_http: bool,

    /// Name of the top-level function to call from `main`. `None` means
    /// auto-detect: first function named `main`, else first public
    /// function, else the first function declared (spec §4.7 "Entry
    /// point").
    pub entry_function: Option<String>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        CompileConfig {
            memory_mode: MemoryMode::Gc,
            opt_level: OptLevel::O0,
            debug: false,
            target_triple: None,
            enable_filesystem: false,
            enable_http: false,
            entry_function: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_opt_level_is_o0() {
        assert_eq!(OptLevel::default(), OptLevel::O0);
    }

    #[test]
    fn default_compile_config_is_gc_mode_no_features() {
        let cfg = CompileConfig::default();
        assert_eq!(cfg.memory_mode, MemoryMode::Gc);
        assert!(!cfg.debug);
        assert!(cfg.target_triple.is_none());
        assert!(!cfg.enable_filesystem);
        assert!(!cfg.enable_http);
        assert!(cfg.entry_function.is_none());
    }

    #[test]
    fn opt_level_serde_roundtrip() {
        for level in [OptLevel::O0, OptLevel::O1, OptLevel::O2, OptLevel::O3] {
            let json = serde_json::to_string(&level).unwrap();
            let back: OptLevel = serde_json::from_str(&json).unwrap();
            assert_eq!(level, back);
        }
    }

    #[test]
    fn compile_config_serde_roundtrip() {
        let cfg = CompileConfig {
            memory_mode: MemoryMode::Ownership,
            opt_level: OptLevel::O2,
            debug: true,
            target_triple: Some("aarch64-apple-darwin".to_string()),
            enable_filesystem: true,
            enable_http: false,
            entry_function: Some("run".to_string()),
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: CompileConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.memory_mode, cfg.memory_mode);
        assert_eq!(back.opt_level, cfg.opt_level);
        assert_eq!(back.debug, cfg.debug);
        assert_eq!(back.target_triple, cfg.target_triple);
        assert_eq!(back.enable_filesystem, cfg.enable_filesystem);
        assert_eq!(back.entry_function, cfg.entry_function);
    }
}
