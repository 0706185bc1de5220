//! Vela compiler CLI.
//!
//! Provides the `velac` binary with subcommands for driving the pipeline
//! end to end: `compile` runs validation through backend emission and
//! writes generated C++ to an output directory; `check` runs the reference
//! interpreter over the same program and prints its captured stdout, for
//! comparison against externally compiled GC-mode and ownership-mode
//! binaries (spec §9 open question 8's three-way equivalence check).
//!
//! Input is a typed JSON AST (spec §6.1) rather than source text -- there
//! is no parser in scope here, the same way the teacher's CLI read a
//! program already staged in a SQLite-backed graph store rather than
//! parsing source itself.

use std::fs;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use vela_codegen::{CompileConfig, OptLevel};
use vela_ir::{Diagnostic, MemoryMode, Program};

/// Vela compiler and tools.
#[derive(Parser)]
#[command(name = "velac", about = "Vela compiler and tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Compile a typed JSON AST to C++ source.
    Compile {
        /// Path to the program, as a typed JSON AST (spec §6.1).
        input: PathBuf,

        /// Optimization level: O0, O1, O2, O3. Recorded for an external
        /// C++ driver; this crate never invokes a toolchain itself.
        #[arg(short, long, default_value = "O0")]
        opt_level: String,

        /// Memory mode: gc or ownership (spec §4.7).
        #[arg(short, long, default_value = "gc")]
        mode: String,

        /// Target triple for cross-compilation (default: host).
        #[arg(short, long)]
        target: Option<String>,

        /// Emit with debug information.
        #[arg(long)]
        debug: bool,

        /// Force-include the filesystem runtime header.
        #[arg(long)]
        enable_filesystem: bool,

        /// Force-include the http runtime header.
        #[arg(long)]
        enable_http: bool,

        /// Entry function name (default: auto-detect, spec §4.7).
        #[arg(long)]
        entry: Option<String>,

        /// Output directory (default: ./build/).
        #[arg(short = 'O', long, default_value = "./build")]
        output_dir: PathBuf,
    },

    /// Run the reference interpreter over a program and print its stdout,
    /// for comparison against a compiled binary's output.
    Check {
        /// Path to the program, as a typed JSON AST.
        input: PathBuf,

        /// Memory mode, affects whether the null checker runs (spec §4.4).
        #[arg(short, long, default_value = "gc")]
        mode: String,

        /// Entry function to invoke. Defaults to `main`.
        #[arg(long, default_value = "main")]
        entry: String,

        /// Enable step-by-step execution tracing to stderr.
        #[arg(long)]
        trace: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Compile {
            input,
            opt_level,
            mode,
            target,
            debug,
            enable_filesystem,
            enable_http,
            entry,
            output_dir,
        } => run_compile(
            &input,
            &opt_level,
            &mode,
            target,
            debug,
            enable_filesystem,
            enable_http,
            entry,
            output_dir,
        ),
        Commands::Check { input, mode, entry, trace } => run_check(&input, &mode, &entry, trace),
    };

    process::exit(exit_code);
}

/// Execute the compile subcommand.
///
/// Returns exit code: 0 = success, 1 = validator/analyzer error,
/// 2 = backend error, 3 = I/O or JSON-parsing error.
fn run_compile(
    input: &PathBuf,
    opt_level_str: &str,
    mode_str: &str,
    target: Option<String>,
    debug: bool,
    enable_filesystem: bool,
    enable_http: bool,
    entry: Option<String>,
    output_dir: PathBuf,
) -> i32 {
    let opt_level = match parse_opt_level(opt_level_str) {
        Ok(l) => l,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return 1;
        }
    };
    let memory_mode = match parse_memory_mode(mode_str) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return 1;
        }
    };

    let mut program = match load_program(input) {
        Ok(p) => p,
        Err(code) => return code,
    };

    if !run_validator(&program, input) {
        return 1;
    }

    let registry = match vela_lower::lower(&mut program) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: lowering failed: {e}");
            return 1;
        }
    };

    let analyzer_diagnostics = vela_analyze::analyze(&program, memory_mode);
    if !report_and_check(&analyzer_diagnostics, input) {
        return 1;
    }

    vela_opt::optimize(&mut program);
    vela_lower::lower_all_to_ssa(&mut program);

    let config = CompileConfig {
        memory_mode,
        opt_level,
        debug,
        target_triple: target,
        enable_filesystem,
        enable_http,
        entry_function: entry,
    };

    let compiled = match vela_codegen::compile(&program, &registry, &config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: code generation failed: {e}");
            return 2;
        }
    };

    if let Err(e) = fs::create_dir_all(&output_dir) {
        eprintln!("Error: failed to create output directory '{}': {e}", output_dir.display());
        return 3;
    }

    for file in &compiled.files {
        let path = output_dir.join(&file.path);
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory '{}': {e}", parent.display());
                return 3;
            }
        }
        if let Err(e) = fs::write(&path, &file.contents) {
            eprintln!("Error: failed to write '{}': {e}", path.display());
            return 3;
        }
    }

    println!("wrote {} file(s) to {}", compiled.files.len(), output_dir.display());
    0
}

/// Execute the check subcommand.
///
/// Returns exit code: 0 = success, 1 = validator/analyzer error,
/// 2 = runtime error during interpretation, 3 = I/O or JSON-parsing error.
fn run_check(input: &PathBuf, mode_str: &str, entry: &str, trace: bool) -> i32 {
    let memory_mode = match parse_memory_mode(mode_str) {
        Ok(m) => m,
        Err(msg) => {
            eprintln!("Error: {msg}");
            return 1;
        }
    };

    let mut program = match load_program(input) {
        Ok(p) => p,
        Err(code) => return code,
    };

    if !run_validator(&program, input) {
        return 1;
    }

    if let Err(e) = vela_lower::lower(&mut program) {
        eprintln!("Error: lowering failed: {e}");
        return 1;
    }

    let analyzer_diagnostics = vela_analyze::analyze(&program, memory_mode);
    if !report_and_check(&analyzer_diagnostics, input) {
        return 1;
    }

    let config = vela_interp::InterpreterConfig { trace_enabled: trace, ..Default::default() };
    let mut interpreter = vela_interp::Interpreter::new(program, config);

    match interpreter.call_function(entry, vec![]) {
        Ok(_) => {
            for line in interpreter.stdout() {
                println!("{line}");
            }
            0
        }
        Err(e) => {
            for line in interpreter.stdout() {
                println!("{line}");
            }
            eprintln!("Error: {e}");
            2
        }
    }
}

/// Deserializes the typed JSON AST at `path`. Returns `Err(3)` on any I/O
/// or parse failure.
fn load_program(path: &PathBuf) -> Result<Program, i32> {
    let text = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: failed to read '{}': {e}", path.display());
        3
    })?;
    serde_json::from_str(&text).map_err(|e| {
        eprintln!("Error: failed to parse '{}' as a program: {e}", path.display());
        3
    })
}

/// Runs the validator and reports its diagnostics. Returns `false` on any
/// error (spec §7), printing every diagnostic regardless.
fn run_validator(program: &Program, input: &PathBuf) -> bool {
    let diagnostics = vela_validate::validate(program);
    report_and_check(&diagnostics, input)
}

/// Sorts and prints `diagnostics`, returning `false` iff any is an error
/// (spec §7: "any stage ending with at least one error aborts the
/// pipeline; warnings never abort").
fn report_and_check(diagnostics: &[Diagnostic], input: &PathBuf) -> bool {
    let mut sorted = diagnostics.to_vec();
    let file_order = vec![input.display().to_string()];
    vela_ir::sort_for_display(&mut sorted, &file_order);
    for d in &sorted {
        eprintln!("{}", d.render());
    }
    !vela_ir::has_errors(&sorted)
}

fn parse_opt_level(s: &str) -> Result<OptLevel, String> {
    match s {
        "O0" | "o0" => Ok(OptLevel::O0),
        "O1" | "o1" => Ok(OptLevel::O1),
        "O2" | "o2" => Ok(OptLevel::O2),
        "O3" | "o3" => Ok(OptLevel::O3),
        _ => Err(format!("invalid optimization level '{s}', expected O0/O1/O2/O3")),
    }
}

fn parse_memory_mode(s: &str) -> Result<MemoryMode, String> {
    match s {
        "gc" => Ok(MemoryMode::Gc),
        "ownership" => Ok(MemoryMode::Ownership),
        _ => Err(format!("invalid memory mode '{s}', expected gc/ownership")),
    }
}
