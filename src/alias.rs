//! In-memory registry of command aliases.
//!
//! An alias maps a short key to a command string. The registry is owned by the
//! shell's [`Environment`](crate::env::Environment) and lives as long as the
//! interpreter does; nothing is persisted between sessions.

use log::debug;
use std::fmt;
use thiserror::Error;

/// Maximum number of aliases that can be stored at the same time.
pub const MAX_ALIASES: usize = 20;

/// Errors reported by [`AliasRegistry`] operations.
///
/// None of them are fatal: the shell reports the message and keeps running.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AliasError {
    /// The registry is full and the key is not already present.
    #[error("maximum of 20 stored aliases exceeded; delete or overwrite an alias to continue")]
    LimitExceeded,
    /// The key is empty.
    #[error("invalid key")]
    InvalidKey,
    /// No alias is stored under the key.
    #[error("cannot find command: {0}")]
    NotFound(String),
}

/// A single alias entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    key: String,
    command: String,
}

impl Alias {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Prints `key='command'`, quoted so the line can be typed back in as a definition.
impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, quote(&self.command))
    }
}

/// Quote `text` as a single word.
///
/// Single quotes when possible, double quotes when the text holds `'` but nothing
/// double quotes would expand, otherwise single-quoted runs joined by `"'"`.
fn quote(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{text}'")
    } else if !text.contains(['"', '$']) {
        format!("\"{text}\"")
    } else {
        text.split('\'')
            .map(|run| format!("'{run}'"))
            .collect::<Vec<_>>()
            .join("\"'\"")
    }
}

/// What [`AliasRegistry::add`] did with the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new entry was created.
    Added,
    /// An entry with the same key existed and its command was replaced.
    Overwritten,
}

/// Ordered collection of aliases with unique, non-empty keys.
///
/// Newly added entries go to the front, so [`list`](AliasRegistry::list) shows the most
/// recent definitions first. Overwriting keeps an entry at its current position.
#[derive(Debug, Clone, Default)]
pub struct AliasRegistry {
    entries: Vec<Alias>,
}

impl AliasRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `key` as an alias for `command`.
    ///
    /// An existing key has its command replaced, which is allowed even when the registry
    /// is full. A new key fails with [`AliasError::LimitExceeded`] once
    /// [`MAX_ALIASES`] entries are stored.
    pub fn add(
        &mut self,
        key: impl Into<String>,
        command: impl Into<String>,
    ) -> Result<AddOutcome, AliasError> {
        let key = key.into();
        if key.is_empty() {
            debug!("alias: rejected empty key");
            return Err(AliasError::InvalidKey);
        }
        let command = command.into();

        if let Some(entry) = self.entries.iter_mut().find(|a| a.key == key) {
            debug!("alias: overwriting {key:?}");
            entry.command = command;
            return Ok(AddOutcome::Overwritten);
        }

        if self.entries.len() >= MAX_ALIASES {
            debug!("alias: limit reached, rejected {key:?}");
            return Err(AliasError::LimitExceeded);
        }

        debug!("alias: adding {key:?}");
        self.entries.insert(0, Alias { key, command });
        Ok(AddOutcome::Added)
    }

    /// Find the entry stored under `key`.
    pub fn search(&self, key: &str) -> Option<&Alias> {
        self.entries.iter().find(|a| a.key == key)
    }

    /// Take the entry stored under `key` out of the registry.
    pub fn remove(&mut self, key: &str) -> Result<Alias, AliasError> {
        if key.is_empty() {
            debug!("unalias: rejected empty key");
            return Err(AliasError::InvalidKey);
        }
        match self.entries.iter().position(|a| a.key == key) {
            Some(index) => {
                debug!("unalias: removing {key:?}");
                Ok(self.entries.remove(index))
            }
            None => {
                debug!("unalias: {key:?} not found");
                Err(AliasError::NotFound(key.to_string()))
            }
        }
    }

    /// Return the command stored under `key` so the caller can run it.
    ///
    /// The stored entry is left untouched.
    pub fn invoke(&self, key: &str) -> Result<String, AliasError> {
        self.search(key)
            .map(|alias| alias.command.clone())
            .ok_or_else(|| {
                debug!("alias: cannot invoke {key:?}");
                AliasError::NotFound(key.to_string())
            })
    }

    /// Iterate over all entries, most recently added first.
    pub fn list(&self) -> impl ExactSizeIterator<Item = &Alias> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
