//! A minimal interactive shell built around an in-memory alias registry.
//!
//! The crate provides the pieces of a small command-line shell: a quote-aware
//! tokeniser, a dispatcher with built-in commands, external program lookup through
//! `PATH`, a numbered history with `!` recall and, at its core, the alias registry.
//!
//! The main entry point is [`Interpreter`], which owns the shell state and runs input
//! lines. The [`alias`] module exposes [`AliasRegistry`] for use on its own.

pub mod alias;
mod builtin;
pub mod command;
pub mod env;
mod external;
pub mod history;
mod interpreter;
mod io_adapters;
pub mod lexer;

pub use alias::{Alias, AliasError, AliasRegistry};
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
pub use io_adapters::CapturedOutput;
