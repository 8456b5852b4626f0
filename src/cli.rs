//! CLI arguments for psmaps.
//!
//! This module defines the command-line interface using the clap library.
//! `-h` selects human-readable sizes, so help is only available as `--help`.

use clap::{ArgAction, Parser, ValueEnum};
use psmaps::ReduceStrategy;
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "psmaps",
    about = "Report memory usage of Linux processes (USS, PSS, RSS)",
    long_about = "Report memory usage of Linux processes (USS, PSS, RSS).\n\n\
                  USS: memory unique to a process, not shared with any other process.\n\
                  PSS: the process's unshared memory plus a proportional share of memory \
                  shared with other processes.\n\
                  RSS: all memory resident in RAM for a process, private and shared.\n\n\
                  Values are in KiB unless --human-readable is given. Without PID arguments \
                  every process is reported; run as root to see all of them.",
    version,
    disable_help_flag = true
)]
pub struct Args {
    /// Process ids to report (default: all processes)
    #[arg(value_name = "PID")]
    pub pids: Vec<String>,

    /// Print help information
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,

    /// Always print the full command line
    #[arg(short = 'w', long)]
    pub wide: bool,

    /// Field to sort output on: pid, user, uss, pss, rss, command
    #[arg(short = 'k', long)]
    pub key: Option<String>,

    /// Sort in reverse order
    #[arg(short = 'r', long)]
    pub reverse: bool,

    /// Print sizes in human readable format (e.g. MiB, GiB)
    #[arg(short = 'h', long)]
    pub human_readable: bool,

    /// How pending results are drained
    #[arg(long, value_enum)]
    pub reducer: Option<ReduceStrategy>,

    /// Maximum concurrent reads (0 = unbounded)
    #[arg(long)]
    pub max_concurrency: Option<usize>,

    /// Root of the process filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Log level (logs go to stderr)
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}
