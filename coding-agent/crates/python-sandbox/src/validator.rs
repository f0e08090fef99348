//! Static import gate for generated Python code.
//!
//! The source is parsed with the Python grammar (RustPython's parser) and every
//! `import` / `from ... import` statement anywhere in the tree is checked
//! against the policy's denied modules. Code that does not parse is rejected.
//!
//! This is a best-effort gate. It does not see dynamic imports
//! (`__import__`, `importlib`), reflection, or denied functionality
//! re-exported through an allowed module.

use rustpython_parser::{ast, Parse};
use std::fmt;

use crate::policy::Policy;

/// Source text that passed validation.
///
/// Only [`validate`] can build one, so anything holding a `ValidatedCode` has
/// the exact text that was inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCode {
    source: String,
}

impl ValidatedCode {
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnsafeReason {
    /// The text is not valid Python (or is empty).
    Unparseable { detail: String },
    /// An import references a denied top-level module.
    DeniedImport { module: String },
}

impl fmt::Display for UnsafeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnsafeReason::Unparseable { .. } => write!(f, "unparseable"),
            UnsafeReason::DeniedImport { module } => {
                write!(f, "import of denied module '{}'", module)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Safe(ValidatedCode),
    Unsafe { reason: UnsafeReason },
}

impl ValidationOutcome {
    pub fn is_safe(&self) -> bool {
        matches!(self, ValidationOutcome::Safe(_))
    }
}

/// Decide whether `code` may be executed under `policy`.
///
/// Pure: no I/O, same input always gives the same outcome.
pub fn validate(code: &str, policy: &Policy) -> ValidationOutcome {
    if code.trim().is_empty() {
        return unparseable("empty source");
    }

    let suite = match ast::Suite::parse(code, "<generated>") {
        Ok(suite) => suite,
        Err(err) => return unparseable(err.to_string()),
    };

    match find_denied_import(&suite, policy) {
        Some(module) => {
            tracing::info!(module = %module, "[Validator] Rejected denied import");
            ValidationOutcome::Unsafe {
                reason: UnsafeReason::DeniedImport { module },
            }
        }
        None => ValidationOutcome::Safe(ValidatedCode {
            source: code.to_string(),
        }),
    }
}

fn unparseable(detail: impl Into<String>) -> ValidationOutcome {
    let detail = detail.into();
    tracing::info!(detail = %detail, "[Validator] Rejected unparseable source");
    ValidationOutcome::Unsafe {
        reason: UnsafeReason::Unparseable { detail },
    }
}

/// Depth-first walk; returns the first denied module path found.
fn find_denied_import(body: &[ast::Stmt], policy: &Policy) -> Option<String> {
    for stmt in body {
        match stmt {
            ast::Stmt::Import(import) => {
                for alias in &import.names {
                    let name = alias.name.as_str();
                    if policy.is_denied(name) {
                        return Some(name.to_string());
                    }
                }
            }
            ast::Stmt::ImportFrom(import) => {
                // `from . import x` has no module and is never denied.
                if let Some(module) = &import.module {
                    if policy.is_denied(module.as_str()) {
                        return Some(module.as_str().to_string());
                    }
                }
            }
            _ => {}
        }

        for nested in nested_bodies(stmt) {
            if let Some(module) = find_denied_import(nested, policy) {
                return Some(module);
            }
        }
    }
    None
}

/// Statement bodies directly contained in `stmt`.
fn nested_bodies(stmt: &ast::Stmt) -> Vec<&[ast::Stmt]> {
    match stmt {
        ast::Stmt::FunctionDef(def) => vec![def.body.as_slice()],
        ast::Stmt::AsyncFunctionDef(def) => vec![def.body.as_slice()],
        ast::Stmt::ClassDef(def) => vec![def.body.as_slice()],
        ast::Stmt::For(node) => vec![node.body.as_slice(), node.orelse.as_slice()],
        ast::Stmt::AsyncFor(node) => vec![node.body.as_slice(), node.orelse.as_slice()],
        ast::Stmt::While(node) => vec![node.body.as_slice(), node.orelse.as_slice()],
        ast::Stmt::If(node) => vec![node.body.as_slice(), node.orelse.as_slice()],
        ast::Stmt::With(node) => vec![node.body.as_slice()],
        ast::Stmt::AsyncWith(node) => vec![node.body.as_slice()],
        ast::Stmt::Match(node) => node.cases.iter().map(|case| case.body.as_slice()).collect(),
        ast::Stmt::Try(node) => {
            let mut bodies = vec![
                node.body.as_slice(),
                node.orelse.as_slice(),
                node.finalbody.as_slice(),
            ];
            bodies.extend(node.handlers.iter().map(handler_body));
            bodies
        }
        ast::Stmt::TryStar(node) => {
            let mut bodies = vec![
                node.body.as_slice(),
                node.orelse.as_slice(),
                node.finalbody.as_slice(),
            ];
            bodies.extend(node.handlers.iter().map(handler_body));
            bodies
        }
        _ => Vec::new(),
    }
}

fn handler_body(handler: &ast::ExceptHandler) -> &[ast::Stmt] {
    match handler {
        ast::ExceptHandler::ExceptHandler(h) => &h.body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denied_module(code: &str) -> Option<String> {
        match validate(code, &Policy::default()) {
            ValidationOutcome::Unsafe {
                reason: UnsafeReason::DeniedImport { module },
            } => Some(module),
            _ => None,
        }
    }

    fn is_unparseable(code: &str) -> bool {
        matches!(
            validate(code, &Policy::default()),
            ValidationOutcome::Unsafe {
                reason: UnsafeReason::Unparseable { .. }
            }
        )
    }

    #[test]
    fn rejects_direct_imports_of_denied_modules() {
        assert_eq!(denied_module("import os"), Some("os".to_string()));
        assert_eq!(denied_module("import sys\nprint(1)"), Some("sys".to_string()));
        assert_eq!(denied_module("import subprocess as sp"), Some("subprocess".to_string()));
        assert_eq!(denied_module("import json, os"), Some("os".to_string()));
    }

    #[test]
    fn rejects_submodule_and_from_imports() {
        assert_eq!(denied_module("import os.path"), Some("os.path".to_string()));
        assert_eq!(denied_module("from os import path"), Some("os".to_string()));
        assert_eq!(denied_module("from os.path import join"), Some("os.path".to_string()));
    }

    #[test]
    fn rejects_imports_nested_in_blocks() {
        let code = r#"
def helper():
    try:
        pass
    except ValueError:
        import subprocess
    return 1
"#;
        assert_eq!(denied_module(code), Some("subprocess".to_string()));

        let code = "class A:\n    def run(self):\n        if True:\n            from sys import argv\n";
        assert_eq!(denied_module(code), Some("sys".to_string()));

        let code = "for i in range(3):\n    pass\nelse:\n    import os\n";
        assert_eq!(denied_module(code), Some("os".to_string()));
    }

    #[test]
    fn relative_import_without_module_is_not_denied() {
        let outcome = validate("from . import helpers", &Policy::default());
        assert!(outcome.is_safe());
    }

    #[test]
    fn unparseable_text_fails_closed() {
        assert!(is_unparseable("def broken(:\n    pass"));
        assert!(is_unparseable("print('unterminated"));
        assert!(is_unparseable(""));
        assert!(is_unparseable("   \n\t"));
    }

    #[test]
    fn unparseable_reason_displays_literal() {
        let ValidationOutcome::Unsafe { reason } = validate("(", &Policy::default()) else {
            panic!("expected unsafe");
        };
        assert_eq!(reason.to_string(), "unparseable");
    }

    #[test]
    fn allowed_code_is_safe_and_keeps_exact_text() {
        let code = "import math\nfrom collections import Counter\nprint(math.sqrt(16))";
        match validate(code, &Policy::default()) {
            ValidationOutcome::Safe(validated) => assert_eq!(validated.as_str(), code),
            other => panic!("expected safe, got {:?}", other),
        }
    }

    #[test]
    fn names_that_only_resemble_denied_modules_pass() {
        assert!(validate("import osmosis", &Policy::default()).is_safe());
        assert!(validate("from system_tools import run", &Policy::default()).is_safe());
        // Mentioning a module in a string is not an import.
        assert!(validate("print('import os')", &Policy::default()).is_safe());
    }

    #[test]
    fn policy_controls_the_denied_set() {
        let policy = Policy::new().deny_module("socket");
        assert!(validate("import os", &policy).is_safe());
        assert!(!validate("import socket", &policy).is_safe());
    }

    #[test]
    fn big_integer_literals_parse() {
        let code = "x = 123456789012345678901234567890\nprint(x * 2)";
        assert!(validate(code, &Policy::default()).is_safe());
    }

    #[test]
    fn validation_is_deterministic() {
        let policy = Policy::default();
        let code = "import json\nprint(json.dumps({}))";
        assert_eq!(validate(code, &policy), validate(code, &policy));
    }
}
