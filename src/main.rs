//! psmaps - version 0.1.0
//!
//! Reports USS, PSS and RSS per process from /proc.
//! This is the main entry point that resolves configuration, runs one
//! collection pass and prints the table.

mod cli;
mod config;
mod startup_checks;

use clap::Parser;
use psmaps::{
    collect_pids, merge_rows, render_table, sort_rollups, terminal_width, Collector, TableOptions,
};
use std::io::{self, Write};
use tracing::{debug, error, info, Level};

use cli::Args;
use config::{requested_pids, resolve_config, show_config, validate_effective_config, Config};

/// Initializes tracing logging subsystem with configured log level.
/// Logs go to stderr so stdout only carries the table.
fn setup_logging(config: &Config) {
    let log_level = match config
        .log_level
        .as_deref()
        .unwrap_or(config::DEFAULT_LOG_LEVEL)
        .to_ascii_lowercase()
        .as_str()
    {
        "off" => return,
        "error" => Level::ERROR,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::WARN,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    debug!("Logging initialized with level: {}", log_level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match resolve_config(args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    let config = load_validated_config(&args)?;
    setup_logging(&config);

    let proc_root = config.proc_root();
    if let Err(e) = startup_checks::validate_requirements(&proc_root) {
        error!("Startup validation failed: {}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }

    // Validated above
    let sort_key = config.sort_key()?;

    let pids = match requested_pids(&args) {
        Some(pids) => pids,
        None => match collect_pids(&proc_root) {
            Ok(pids) => pids,
            Err(e) => {
                error!("Failed to enumerate {}: {}", proc_root.display(), e);
                eprintln!("error: cannot list {}: {}", proc_root.display(), e);
                std::process::exit(1);
            }
        },
    };
    info!("Collecting memory usage for {} pids", pids.len());

    let collector = Collector::new(proc_root)
        .with_strategy(config.reducer.unwrap_or_default())
        .with_max_concurrency(config.max_concurrency);

    let mut reduction = match collector.collect(&pids).await {
        Ok(r) => r,
        Err(e) => {
            error!("Collection aborted: {}", e);
            eprintln!("error: {}", e);
            std::process::exit(2);
        }
    };

    sort_rollups(
        &mut reduction.rollups,
        &reduction.owners,
        &reduction.cmdlines,
        &sort_key,
        config.reverse.unwrap_or(false),
    );
    let rows = merge_rows(&reduction.rollups, &reduction.owners, &reduction.cmdlines);

    let opts = TableOptions {
        wide: config.wide.unwrap_or(false),
        human_readable: config.human_readable.unwrap_or(false),
        width: terminal_width(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match render_table(&mut out, &rows, &opts).and_then(|_| out.flush()) {
        Ok(()) => Ok(()),
        // Output piped into something like `head`
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(e) => Err(e.into()),
    }
}
