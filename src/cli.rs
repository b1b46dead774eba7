use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "seo-etl",
    version,
    about = "Batch ETL pipeline for SEO assessment data over a local SQLite store"
)]
pub struct Cli {
    /// Log level used when RUST_LOG is not set (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Write logs to this file instead of stderr.
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full ingest → transform → join → fact → export pipeline.
    Pipeline(PipelineArgs),
    /// Ingest matching CSV files from one directory into a staging table.
    Ingest(IngestArgs),
    /// Execute a single SQL script against the store.
    ExecSql(ExecSqlArgs),
    /// Recreate the schema by executing every DDL script (destroys data).
    Schema(SchemaArgs),
}

#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    #[arg(long, default_value = "config.yml")]
    pub config: PathBuf,

    /// Batch date for the run (YYYY-MM-DD); defaults to config, then today.
    #[arg(long)]
    pub data_date: Option<String>,

    /// Override the database path from configuration.
    #[arg(long)]
    pub db: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct IngestArgs {
    /// Directory containing the CSV files.
    pub directory: PathBuf,

    /// File-name prefix selecting which CSV files to ingest.
    pub prefix: String,

    /// Target staging table.
    pub table: String,

    #[arg(long, default_value = "seo_assessment.db")]
    pub db: PathBuf,

    #[arg(long)]
    pub data_date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ExecSqlArgs {
    /// Path to the SQL script to execute.
    pub sql_file: PathBuf,

    #[arg(long, default_value = "seo_assessment.db")]
    pub db: PathBuf,

    #[arg(long)]
    pub data_date: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    #[arg(long, default_value = "config.yml")]
    pub config: PathBuf,

    #[arg(long)]
    pub data_date: Option<String>,
}
