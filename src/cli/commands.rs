//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;

use crate::error::{DeployError, Result};

/// Formation - Declarative CloudFormation stack deployment.
#[derive(Parser, Debug)]
#[command(name = "formation")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// AWS region override.
    #[arg(long, global = true, env = "FORMATION_REGION")]
    pub region: Option<String>,

    /// Seconds between stack event polls.
    #[arg(long, global = true, env = "FORMATION_POLL_INTERVAL", default_value = "5")]
    pub interval: u64,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a template, creating the stack or updating it in place.
    Deploy {
        /// Stack name.
        stack: String,

        /// Template: file path, URL, or inline JSON body.
        template: String,

        /// Stack parameter override (KEY=VALUE, repeatable).
        #[arg(short, long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Stack tag (KEY=VALUE, repeatable).
        #[arg(short, long = "tag", value_name = "KEY=VALUE")]
        tags: Vec<String>,

        /// Capability to acknowledge instead of the default IAM set
        /// (repeatable).
        #[arg(long = "capability", value_name = "CAPABILITY")]
        capabilities: Vec<String>,

        /// Return once the operation is accepted, without polling.
        #[arg(long)]
        detach: bool,
    },

    /// Delete a stack.
    Delete {
        /// Stack name.
        stack: String,

        /// Return once the operation is accepted, without polling.
        #[arg(long)]
        detach: bool,
    },

    /// Show all outputs of a stack.
    Outputs {
        /// Stack name.
        stack: String,
    },

    /// Show a single output value of a stack.
    Output {
        /// Stack name.
        stack: String,

        /// Output key.
        key: String,
    },

    /// Check whether a stack exists.
    Exists {
        /// Stack name.
        stack: String,
    },

    /// Validate a template with the control plane.
    Validate {
        /// Template: file path, URL, or inline JSON body.
        template: String,
    },

    /// Delete stale stacks matching a name pattern.
    Cleanup {
        /// Regular expression matched against stack names.
        #[arg(long)]
        pattern: String,

        /// Only delete stacks older than this many minutes.
        #[arg(long, default_value = "0")]
        minutes_old: i64,

        /// Report matching stacks without deleting them.
        #[arg(long)]
        dry_run: bool,

        /// Delete at most this many stacks (oldest first).
        #[arg(long)]
        limit: Option<usize>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parses repeated `KEY=VALUE` arguments into a map.
///
/// # Errors
///
/// Returns an error for any entry without an `=` separator or with an
/// empty key.
pub fn parse_key_value_pairs(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut map = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(DeployError::InvalidPair {
                value: pair.clone(),
            }
            .into());
        };
        if key.is_empty() {
            return Err(DeployError::InvalidPair {
                value: pair.clone(),
            }
            .into());
        }
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}
