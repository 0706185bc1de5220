//! The "good parts" gate (spec §4.1): rejects source-level constructs that
//! would defeat later static analyses. Runs over the input AST before
//! lowering; pure, no AST mutation, errors accumulate across a whole file
//! rather than short-circuiting on the first one.

use tracing::{debug, warn};
use vela_ir::{
    BinaryOp, ClassDecl, Decl, Diagnostic, Expr, FunctionBody, FunctionDecl, IrType, MethodDecl,
    Program, Severity, Stmt, StatementBlock, UnaryOp, VarScope,
};

mod rules;

pub use rules::is_explicit_boolean;
use rules::check_dynamic_type;

/// Walks every module of `program`, accumulating diagnostics for every
/// forbidden construct found. Never short-circuits: a file with ten
/// violations reports all ten (spec §4.1 "Propagation").
pub fn validate(program: &Program) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for module in &program.modules {
        debug!(module = %module.path, "validating module");
        for decl in &module.declarations {
            validate_decl(decl, &mut diagnostics, false);
        }
    }
    for d in &diagnostics {
        if d.severity == Severity::Warning {
            warn!(code = %d.code, message = %d.message, "validator warning");
        }
    }
    diagnostics
}

fn validate_decl(decl: &Decl, out: &mut Vec<Diagnostic>, in_method: bool) {
    match decl {
        Decl::Const(c) => {
            check_dynamic_type(&c.ty, out, &format!("const '{}'", c.name));
            rules::check_expr(&c.init, out, in_method);
        }
        Decl::Function(f) => validate_function(f, out),
        Decl::Class(c) => validate_class(c, out),
        Decl::Interface(_) | Decl::TypeAlias(_) => {}
    }
}

fn validate_function(func: &FunctionDecl, out: &mut Vec<Diagnostic>) {
    for param in &func.params {
        check_dynamic_type(
            &param.ty,
            out,
            &format!("parameter '{}' of function '{}'", param.name, func.name),
        );
    }
    check_dynamic_type(
        &func.return_type,
        out,
        &format!("return type of function '{}'", func.name),
    );
    if let FunctionBody::Tree(body) = &func.body {
        rules::check_block(body, out, false);
    }
}

fn validate_method(method: &MethodDecl, class_name: &str, out: &mut Vec<Diagnostic>) {
    for param in &method.params {
        check_dynamic_type(
            &param.ty,
            out,
            &format!("parameter '{}' of method '{}.{}'", param.name, class_name, method.name),
        );
    }
    check_dynamic_type(
        &method.return_type,
        out,
        &format!("return type of method '{}.{}'", class_name, method.name),
    );
    if let FunctionBody::Tree(body) = &method.body {
        rules::check_block(body, out, true);
    }
}

fn validate_class(class: &ClassDecl, out: &mut Vec<Diagnostic>) {
    for field in &class.fields {
        if let Some(init) = &field.initializer {
            rules::check_expr(init, out, true);
        }
        check_dynamic_type(
            &field.ty,
            out,
            &format!("field '{}' on class '{}'", field.name, class.name),
        );
    }
    for method in &class.methods {
        validate_method(method, &class.name, out);
    }
    if let Some(ctor) = &class.constructor {
        for param in &ctor.params {
            check_dynamic_type(
                &param.ty,
                out,
                &format!("parameter '{}' of {}'s constructor", param.name, class.name),
            );
        }
        rules::check_block(&ctor.body, out, true);
    }
}
