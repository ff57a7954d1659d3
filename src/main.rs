//! Formation CLI entrypoint.
//!
//! This is the main entrypoint for the formation command-line tool.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use formation::cli::{Cli, Commands, ConsoleSink, OutputFormatter, parse_key_value_pairs};
use formation::controlplane::AwsControlPlane;
use formation::deploy::{CleanupOptions, DEFAULT_CAPABILITIES, Reconciler, ReconcilerConfig};
use formation::error::Result;
use formation::template::{DefaultTemplateResolver, TemplateInput};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Main entrypoint.
fn main() -> ExitCode {
    // Load .env before argument parsing so env-backed flags see it.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    // Run async runtime
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initializes the logging system.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Main async entry point.
async fn run(cli: Cli) -> Result<()> {
    let formatter = OutputFormatter::new(cli.output);
    let client = Arc::new(AwsControlPlane::from_env(cli.region.as_deref()).await);
    let resolver = Arc::new(DefaultTemplateResolver::new());
    let poll_interval = Duration::from_secs(cli.interval);

    debug!("Using poll interval: {poll_interval:?}");

    match cli.command {
        Commands::Deploy {
            stack,
            template,
            params,
            tags,
            capabilities,
            detach,
        } => {
            let config = ReconcilerConfig {
                poll_interval,
                capabilities: resolve_capabilities(capabilities),
                tags: parse_key_value_pairs(&tags)?,
                detach,
            };
            let reconciler = Reconciler::new(client, resolver)
                .with_config(config)
                .with_sink(Arc::new(ConsoleSink::new()));

            let parameters = parse_key_value_pairs(&params)?;
            reconciler
                .deploy(&stack, TemplateInput::detect(&template), &parameters)
                .await?;

            if detach {
                eprintln!("Deployment of '{stack}' submitted.");
            } else {
                eprintln!("Stack '{stack}' deployed.");
            }
            Ok(())
        }

        Commands::Delete { stack, detach } => {
            let config = ReconcilerConfig {
                poll_interval,
                detach,
                ..ReconcilerConfig::default()
            };
            let reconciler = Reconciler::new(client, resolver)
                .with_config(config)
                .with_sink(Arc::new(ConsoleSink::new()));

            reconciler.delete(&stack).await?;

            if detach {
                eprintln!("Deletion of '{stack}' submitted.");
            } else {
                eprintln!("Stack '{stack}' deleted.");
            }
            Ok(())
        }

        Commands::Outputs { stack } => {
            let reconciler = Reconciler::new(client, resolver);
            let outputs = reconciler.outputs(&stack).await?;
            println!("{}", formatter.format_outputs(&outputs));
            Ok(())
        }

        Commands::Output { stack, key } => {
            let reconciler = Reconciler::new(client, resolver);
            let value = reconciler.output(&stack, &key).await?;
            println!("{value}");
            Ok(())
        }

        Commands::Exists { stack } => {
            let reconciler = Reconciler::new(client, resolver);
            let exists = reconciler.stack_exists(&stack).await?;
            println!("{exists}");
            Ok(())
        }

        Commands::Validate { template } => {
            let reconciler = Reconciler::new(client, resolver);
            reconciler.validate(TemplateInput::detect(&template)).await?;
            eprintln!("Template is valid.");
            Ok(())
        }

        Commands::Cleanup {
            pattern,
            minutes_old,
            dry_run,
            limit,
        } => {
            let config = ReconcilerConfig {
                poll_interval,
                ..ReconcilerConfig::default()
            };
            let reconciler = Reconciler::new(client, resolver)
                .with_config(config)
                .with_sink(Arc::new(ConsoleSink::new()));

            let options = CleanupOptions {
                pattern,
                minutes_old,
                dry_run,
                limit,
            };
            let candidates = reconciler.cleanup(&options).await?;
            eprintln!("{}", formatter.format_candidates(&candidates, dry_run));
            Ok(())
        }
    }
}

/// Falls back to the default IAM capability set when none are given.
fn resolve_capabilities(capabilities: Vec<String>) -> Vec<String> {
    if capabilities.is_empty() {
        DEFAULT_CAPABILITIES
            .iter()
            .map(|cap| (*cap).to_string())
            .collect()
    } else {
        capabilities
    }
}
