//! Diagnostics: the stage-to-stage error/warning protocol (spec §6.2, §7).
//!
//! Diagnostics are plain data, not `Result` errors -- every stage accumulates
//! a `Vec<Diagnostic>` across an entire module (or program) before deciding
//! whether to abort, matching §4.1's "errors accumulate; validation never
//! short-circuits within a file."

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A 1-based file/line/column location, carried from the input AST onto IR
/// nodes and diagnostics alike (spec §6.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        write!(f, "{s}")
    }
}

/// One diagnostic: a stable string code, a severity, a message, and an
/// optional location. Codes are grouped in series: 100 (validator), 300
/// (ownership analyzer), 400 (null checker). See each stage crate for the
/// authoritative per-code table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            code: code.into(),
            severity: Severity::Error,
            message: message.into(),
            location: None,
        }
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Diagnostic {
            code: code.into(),
            severity: Severity::Warning,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Renders as `file:line:col: severity [code] message`, or, when no
    /// location is attached, `<unknown>: severity [code] message` (spec §7).
    pub fn render(&self) -> String {
        match &self.location {
            Some(loc) => format!(
                "{}:{}:{}: {} [{}] {}",
                loc.file, loc.line, loc.column, self.severity, self.code, self.message
            ),
            None => format!("<unknown>: {} [{}] {}", self.severity, self.code, self.message),
        }
    }
}

/// Sorts diagnostics by source location within a file, files by the order
/// they first appear, matching §7's "Diagnostics are ordered by source
/// location within a file, files by input order."
pub fn sort_for_display(diagnostics: &mut [Diagnostic], file_order: &[String]) {
    let rank = |file: &str| -> usize {
        file_order.iter().position(|f| f == file).unwrap_or(usize::MAX)
    };
    diagnostics.sort_by(|a, b| {
        let (fa, fb) = match (&a.location, &b.location) {
            (Some(la), Some(lb)) => {
                let file_cmp = rank(&la.file).cmp(&rank(&lb.file));
                if file_cmp != Ordering::Equal {
                    return file_cmp;
                }
                return (la.line, la.column).cmp(&(lb.line, lb.column));
            }
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            (None, None) => (0, 0),
        };
        fa.cmp(&fb)
    });
}

/// `true` iff any diagnostic has `Severity::Error` -- the pipeline-abort
/// condition at every stage boundary (spec §7: "any stage ending with at
/// least one error aborts the pipeline; warnings never abort").
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_location_when_present() {
        let d = Diagnostic::error("106", "weak equality").with_location(SourceLocation::new(
            "a.ts", 3, 7,
        ));
        assert_eq!(d.render(), "a.ts:3:7: error [106] weak equality");
    }

    #[test]
    fn render_without_location() {
        let d = Diagnostic::warning("301", "ownership cycle");
        assert_eq!(d.render(), "<unknown>: warning [301] ownership cycle");
    }

    #[test]
    fn has_errors_is_false_for_warnings_only() {
        let diags = vec![Diagnostic::warning("301", "cycle under gc mode")];
        assert!(!has_errors(&diags));
    }

    #[test]
    fn has_errors_is_true_with_any_error() {
        let diags = vec![
            Diagnostic::warning("301", "cycle"),
            Diagnostic::error("303", "illegal derivation"),
        ];
        assert!(has_errors(&diags));
    }

    #[test]
    fn sort_orders_by_file_then_line_then_column() {
        let order = vec!["a.ts".to_string(), "b.ts".to_string()];
        let mut diags = vec![
            Diagnostic::error("106", "x").with_location(SourceLocation::new("b.ts", 1, 1)),
            Diagnostic::error("107", "y").with_location(SourceLocation::new("a.ts", 5, 1)),
            Diagnostic::error("108", "z").with_location(SourceLocation::new("a.ts", 2, 9)),
        ];
        sort_for_display(&mut diags, &order);
        assert_eq!(diags[0].code, "108"); // a.ts:2:9
        assert_eq!(diags[1].code, "107"); // a.ts:5:1
        assert_eq!(diags[2].code, "106"); // b.ts:1:1
    }

    #[test]
    fn diagnostics_without_location_sort_after_located_ones() {
        let mut diags = vec![
            Diagnostic::error("102", "no location"),
            Diagnostic::error("101", "with block").with_location(SourceLocation::new(
                "a.ts", 1, 1,
            )),
        ];
        sort_for_display(&mut diags, &["a.ts".to_string()]);
        assert_eq!(diags[0].code, "101");
        assert_eq!(diags[1].code, "102");
    }

    #[test]
    fn serde_roundtrip() {
        let d = Diagnostic::error("401", "use field").with_location(SourceLocation::new(
            "n.ts", 10, 2,
        ));
        let json = serde_json::to_string(&d).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
