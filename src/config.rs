//! Configuration management for psmaps.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use psmaps::{parse_pid_args, ReduceStrategy, SortKey, ALLOWED_SORT_KEYS, DEFAULT_PROC_ROOT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_SORT_KEY: &str = "pid";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Effective settings for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Data source
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Ordering
    #[serde(alias = "sort-key")]
    pub sort_key: Option<String>,
    pub reverse: Option<bool>,

    // Output
    pub wide: Option<bool>,
    #[serde(alias = "human-readable")]
    pub human_readable: Option<bool>,

    // Collection
    pub reducer: Option<ReduceStrategy>,
    /// Maximum concurrent reads, 0 for unbounded
    #[serde(alias = "max-concurrency")]
    pub max_concurrency: Option<usize>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            sort_key: Some(DEFAULT_SORT_KEY.into()),
            reverse: Some(false),
            wide: Some(false),
            human_readable: Some(false),
            reducer: Some(ReduceStrategy::default()),
            max_concurrency: Some(0),
            log_level: Some(DEFAULT_LOG_LEVEL.into()),
        }
    }
}

impl Config {
    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    /// Sort key after validation. Call [`validate_effective_config`] first.
    pub fn sort_key(&self) -> Result<SortKey, psmaps::UnknownSortKey> {
        self.sort_key.as_deref().unwrap_or(DEFAULT_SORT_KEY).parse()
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = cfg.sort_key() {
        return Err(format!("{} (expected one of: {})", e, ALLOWED_SORT_KEYS.join(", ")).into());
    }

    if let Some(level) = cfg.log_level.as_deref() {
        match level.to_ascii_lowercase().as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => {}
            other => {
                return Err(format!(
                    "Invalid log_level '{}', expected off/error/warn/info/debug/trace",
                    other
                )
                .into());
            }
        }
    }

    let proc_root = cfg.proc_root();
    if !proc_root.is_dir() {
        return Err(format!("proc_root is not a directory: {}", proc_root.display()).into());
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(key) = &args.key {
        config.sort_key = Some(key.clone());
    }
    if let Some(reducer) = args.reducer {
        config.reducer = Some(reducer);
    }
    if let Some(max) = args.max_concurrency {
        config.max_concurrency = Some(max);
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(format!("{:?}", level).to_ascii_lowercase());
    }

    // Flags can only switch features on
    if args.reverse {
        config.reverse = Some(true);
    }
    if args.wide {
        config.wide = Some(true);
    }
    if args.human_readable {
        config.human_readable = Some(true);
    }

    Ok(config)
}

/// Pids requested on the command line, or `None` to scan all processes.
pub fn requested_pids(args: &Args) -> Option<Vec<u32>> {
    if args.pids.is_empty() {
        None
    } else {
        Some(parse_pid_args(&args.pids))
    }
}

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = if let Some(p) = path {
        p.to_path_buf()
    } else {
        // Try default locations
        let defaults = [
            "/etc/psmaps/psmaps.yaml",
            "/etc/psmaps/psmaps.yml",
            "/etc/psmaps/psmaps.json",
            "./psmaps.yaml",
            "./psmaps.yml",
            "./psmaps.json",
        ];

        match defaults.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        }
    };

    let content = fs::read_to_string(&path)?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)?,
        Some("toml") => toml::from_str(&content)?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_defaults(config))
}

/// Fills fields the file left out with defaults.
fn merge_defaults(file: Config) -> Config {
    let d = Config::default();
    Config {
        proc_root: file.proc_root.or(d.proc_root),
        sort_key: file.sort_key.or(d.sort_key),
        reverse: file.reverse.or(d.reverse),
        wide: file.wide.or(d.wide),
        human_readable: file.human_readable.or(d.human_readable),
        reducer: file.reducer.or(d.reducer),
        max_concurrency: file.max_concurrency.or(d.max_concurrency),
        log_level: file.log_level.or(d.log_level),
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<(), Box<dyn std::error::Error>> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };

    println!("{output}");
    Ok(())
}
