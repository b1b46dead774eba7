mod cli;
mod commands;
mod config;
mod ledger;
mod model;
mod util;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let log_file = match resolve_log_file(&cli) {
        Ok(path) => path,
        Err(err) => {
            eprintln!("seo-etl: {err:#}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cli.log_level, log_file.as_deref()) {
        eprintln!("seo-etl: {err:#}");
        std::process::exit(1);
    }

    if let Err(err) = run(cli) {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Pipeline(args) => commands::pipeline::run(args),
        Commands::Ingest(args) => commands::ingest::run(args),
        Commands::ExecSql(args) => commands::exec_sql::run(args),
        Commands::Schema(args) => commands::schema::run(args),
    }
}

/// The log destination is settled before the subscriber is installed: an
/// explicit `--log-file` wins, then `processing.log_file` for the commands
/// that carry a configuration file.
fn resolve_log_file(cli: &Cli) -> Result<Option<PathBuf>> {
    if cli.log_file.is_some() {
        return Ok(cli.log_file.clone());
    }

    let config_path = match &cli.command {
        Commands::Pipeline(args) => &args.config,
        Commands::Schema(args) => &args.config,
        Commands::Ingest(_) | Commands::ExecSql(_) => return Ok(None),
    };

    Ok(config::load_config(config_path)?.processing.log_file)
}

/// Installed exactly once per process; components receive no logging handles
/// and never reconfigure the subscriber.
fn init_tracing(log_level: &str, log_file: Option<&Path>) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file: {}", path.display()))?;
            builder.with_ansi(false).with_writer(Arc::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }

    Ok(())
}
