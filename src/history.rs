//! Numbered history of executed command lines with `!` recall.

use std::borrow::Cow;
use std::collections::VecDeque;
use thiserror::Error;

/// Number of lines kept in memory.
pub const HISTORY_CAPACITY: usize = 20;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history is empty")]
    Empty,
    #[error("{0}: event not found")]
    NoSuchEntry(String),
}

/// Bounded list of executed lines. Entry numbers start at 1 and keep growing after
/// old entries are evicted.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<String>,
    first_number: usize,
}

impl Default for History {
    fn default() -> Self {
        Self {
            entries: VecDeque::with_capacity(HISTORY_CAPACITY),
            first_number: 1,
        }
    }
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a line, evicting the oldest one when full. Blank lines are ignored.
    pub fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        if line.trim().is_empty() {
            return;
        }
        if self.entries.len() == HISTORY_CAPACITY {
            self.entries.pop_front();
            self.first_number += 1;
        }
        self.entries.push_back(line);
    }

    /// Iterate over `(number, line)` pairs, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        let first = self.first_number;
        self.entries
            .iter()
            .enumerate()
            .map(move |(i, line)| (first + i, line.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry with the given absolute number.
    pub fn get(&self, number: usize) -> Option<&str> {
        let index = number.checked_sub(self.first_number)?;
        self.entries.get(index).map(String::as_str)
    }

    /// Replace a leading history designator (`!!`, `!N`, `!-N`) with the recalled line.
    ///
    /// Lines that don't start with `!` are returned unchanged. Text after the designator
    /// is appended to the recalled line.
    pub fn expand<'a>(&self, line: &'a str) -> Result<Cow<'a, str>, HistoryError> {
        let trimmed = line.trim_start();
        let Some(designator) = trimmed.strip_prefix('!') else {
            return Ok(Cow::Borrowed(line));
        };
        if designator.is_empty() || designator.starts_with(char::is_whitespace) {
            return Ok(Cow::Borrowed(line));
        }
        if self.entries.is_empty() {
            return Err(HistoryError::Empty);
        }

        let (recalled, rest) = if let Some(rest) = designator.strip_prefix('!') {
            let last = self.entries.back().ok_or(HistoryError::Empty)?;
            (last.as_str(), rest)
        } else {
            let (negative, digits_start) = match designator.strip_prefix('-') {
                Some(d) => (true, d),
                None => (false, designator),
            };
            let digits_len = digits_start
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(digits_start.len());
            let (digits, rest) = digits_start.split_at(digits_len);
            let event = &trimmed[..trimmed.len() - rest.len()];
            let n: usize = digits.parse().map_err(|_| {
                let word = trimmed.split_whitespace().next().unwrap_or(trimmed);
                HistoryError::NoSuchEntry(word.to_string())
            })?;

            let recalled = if negative {
                n.checked_sub(1)
                    .and_then(|back| self.entries.len().checked_sub(back + 1))
                    .and_then(|index| self.entries.get(index))
                    .map(String::as_str)
            } else {
                self.get(n)
            };
            let recalled =
                recalled.ok_or_else(|| HistoryError::NoSuchEntry(event.to_string()))?;
            (recalled, rest)
        };

        Ok(Cow::Owned(format!("{recalled}{rest}")))
    }
}
