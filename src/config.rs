use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub input: InputConfig,
    pub sql: SqlConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

/// One subdirectory + filename-prefix pair per dataset, all under `data_dir`.
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    pub data_dir: PathBuf,
    pub gsc_dir: String,
    pub gsc_prefix: String,
    pub analytics_dir: String,
    pub analytics_prefix: String,
    pub rank_dir: String,
    pub rank_prefix: String,
}

/// Script directories and the fixed, ordered script names per stage.
#[derive(Debug, Clone, Deserialize)]
pub struct SqlConfig {
    pub ddl_dir: PathBuf,
    pub transform_dir: PathBuf,
    pub transform_gsc: String,
    pub transform_analytics: String,
    pub transform_rank: String,
    pub join_dir: PathBuf,
    pub join_gsc_analytics: String,
    pub join_gsc_rank: String,
    pub fact_dir: PathBuf,
    pub fact_seo: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub export_csv: bool,
    #[serde(default = "default_export_dir")]
    pub export_dir: PathBuf,
    #[serde(default = "default_fact_table")]
    pub fact_table: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessingConfig {
    pub data_date: Option<String>,
    pub log_file: Option<PathBuf>,
}

fn default_export_dir() -> PathBuf {
    PathBuf::from("exports")
}

fn default_fact_table() -> String {
    "fact_seo_performance".to_owned()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration: {}", path.display()))?;

    serde_yaml::from_str(&raw)
        .with_context(|| format!("failed to parse configuration: {}", path.display()))
}
