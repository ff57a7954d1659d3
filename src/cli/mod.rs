//! CLI module for the formation deployment tool.
//!
//! This module provides the command-line interface for deploying and
//! cleaning up stacks.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, parse_key_value_pairs};
pub use output::{ConsoleSink, OutputFormatter};
