//! `mysh`: a line-oriented shell.
//!
//! A line goes through [`parse`] (tokenizer + pipeline parser), [`expand`]
//! and [`resolve`], then either a [`builtins`] handler or the fork/exec
//! executor in [`cmd`]. Background pipelines are tracked by [`jobs`].

#[macro_use]
extern crate tracing;

pub mod builtins;
pub mod cmd;
pub mod config;
pub mod env;
pub mod expand;
pub mod input;
pub mod jobs;
pub mod parse;
pub mod prelude;
pub mod process;
pub mod prompt;
pub mod resolve;
pub mod state;
