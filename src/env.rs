use crate::alias::AliasRegistry;
use crate::history::History;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable per-shell state handed to every command.
///
/// The environment contains:
/// - `vars`: variables visible to executed commands and to `$NAME` expansion.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: set by `exit`; the REPL stops once it is true.
/// - `aliases`: the alias registry of this shell session.
/// - `history`: lines executed so far, used by `history` and `!` recall.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
    pub aliases: AliasRegistry,
    pub history: History,
}

impl Environment {
    /// Snapshot the current process variables and working directory.
    ///
    /// The alias registry and history start empty.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_vars(stdenv::vars().collect(), current_dir)
    }

    /// Build an environment from explicit variables, detached from the process.
    pub fn with_vars(vars: HashMap<String, String>, current_dir: PathBuf) -> Self {
        Self {
            vars,
            current_dir,
            should_exit: false,
            aliases: AliasRegistry::new(),
            history: History::new(),
        }
    }

    /// Get the value of a variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override a variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
