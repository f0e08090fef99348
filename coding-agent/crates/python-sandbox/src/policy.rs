//! Execution policy shared by the validator and the executor.
//!
//! A `Policy` is built once at startup and then only read. Both the validator
//! (denied modules) and the executor (wall-clock timeout) consume it.

use std::collections::BTreeSet;
use std::time::Duration;

/// Modules refused by default: process, interpreter and OS access.
pub const DEFAULT_DENIED_MODULES: &[&str] = &["os", "sys", "subprocess"];

/// Default wall-clock bound for one execution.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    denied_modules: BTreeSet<String>,
    timeout: Duration,
    /// Reserved for a future call-level allow-list. Not consulted by the validator yet.
    allowed_functions: BTreeSet<String>,
}

impl Policy {
    /// Policy with no denied modules and the default timeout.
    pub fn new() -> Self {
        Self {
            denied_modules: BTreeSet::new(),
            timeout: DEFAULT_TIMEOUT,
            allowed_functions: BTreeSet::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the denied set. Names are trimmed; blank entries are dropped.
    pub fn with_denied_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.denied_modules = modules
            .into_iter()
            .map(|m| m.as_ref().trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    pub fn deny_module(mut self, module: impl Into<String>) -> Self {
        let module = module.into();
        let module = module.trim();
        if !module.is_empty() {
            self.denied_modules.insert(module.to_string());
        }
        self
    }

    pub fn allow_function(mut self, name: impl Into<String>) -> Self {
        self.allowed_functions.insert(name.into());
        self
    }

    pub fn denied_modules(&self) -> &BTreeSet<String> {
        &self.denied_modules
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn allowed_functions(&self) -> &BTreeSet<String> {
        &self.allowed_functions
    }

    /// Whether a dotted module path is denied.
    ///
    /// Only the top-level package is compared, so `os.path` is denied when
    /// `os` is. An empty path is never denied.
    pub fn is_denied(&self, module_path: &str) -> bool {
        let top_level = module_path.split('.').next().unwrap_or("").trim();
        !top_level.is_empty() && self.denied_modules.contains(top_level)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new().with_denied_modules(DEFAULT_DENIED_MODULES.iter().copied())
    }
}
