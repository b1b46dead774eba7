use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, SecondsFormat};
use regex::Regex;
use sha2::{Digest, Sha256};

pub fn now_string() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub fn today_string() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

pub fn timestamp_compact() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Batch date precedence: explicit override, then configuration, then today.
/// Whatever wins must be a plain `YYYY-MM-DD` date.
pub fn resolve_data_date(
    override_date: Option<&str>,
    config_date: Option<&str>,
) -> Result<String> {
    match override_date.or(config_date) {
        Some(value) => {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .with_context(|| format!("invalid data date (expected YYYY-MM-DD): {value}"))?;
            Ok(value.to_owned())
        }
        None => Ok(today_string()),
    }
}

/// Stable file identifier: hex digest of the file's base name only, so the
/// same file keeps its identity regardless of the directory it was read from.
pub fn file_id_for(file_name: &str) -> String {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name);

    let mut hasher = Sha256::new();
    hasher.update(base.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Table and script names end up interpolated into SQL text, so anything that
/// is not a bare identifier is rejected up front.
pub fn validate_identifier(name: &str) -> Result<()> {
    let pattern =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").context("failed to compile identifier pattern")?;

    if !pattern.is_match(name) {
        bail!("invalid SQL identifier: {name}");
    }
    Ok(())
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

/// Files in `directory` whose name starts with `prefix` and whose extension
/// matches, sorted by name for deterministic processing order.
pub fn discover_files(directory: &Path, prefix: &str, extension: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();

    let entries = fs::read_dir(directory)
        .with_context(|| format!("failed to read {}", directory.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", directory.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };

        let extension_matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case(extension))
            .unwrap_or(false);

        if extension_matches && name.starts_with(prefix) {
            matches.push(path);
        }
    }

    matches.sort();
    Ok(matches)
}
