//! Command-line interface
//!
//! Each subcommand wires an [`App`](crate::app::App), reads through the
//! cache, submits mutations to the coordinator and renders the result.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
