//! IndexNow Notify main entry point
//!
//! This is the command-line interface for submitting URLs to IndexNow and
//! maintaining the submission log.

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use indexnow_notify::config::{
    compute_config_hash, is_valid_api_key, load_config_with_hash, short_hash, Config,
};
use indexnow_notify::keyfile::{generate_api_key, key_file_path, key_file_valid, write_key_file};
use indexnow_notify::notify::{manual_request, table_request, EventFilter, Notifier};
use indexnow_notify::output::{load_log_page, load_statistics, print_log_page, print_statistics};
use indexnow_notify::retry::RetryScheduler;
use indexnow_notify::storage::{
    cleanup_old_logs, lock_store, open_log_store, share, LogFilter, SqliteLogStore,
};
use indexnow_notify::{Action, SubmissionRequest, SubmissionStatus, Submitter};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// IndexNow Notify: push changed URLs to search engines
///
/// Submits URLs through the IndexNow protocol, records every attempt in a
/// SQLite log, and retries transient failures on a fixed schedule.
#[derive(Parser, Debug)]
#[command(name = "indexnow-notify")]
#[command(version)]
#[command(about = "Submit changed URLs to IndexNow", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit URLs manually
    Submit {
        /// URLs on the configured host
        #[arg(value_name = "URL", required_unless_present = "table", conflicts_with = "table")]
        urls: Vec<String>,

        /// Submit every URL of an enabled table, read one per line from
        /// --urls-file or standard input
        #[arg(long)]
        table: Option<String>,

        #[arg(long, value_name = "FILE", requires = "table")]
        urls_file: Option<PathBuf>,
    },

    /// Run one retry sweep over failed submissions
    Retry,

    /// Delete log entries older than the retention period
    Cleanup,

    /// Show submission statistics
    Stats,

    /// List submission log entries, newest first
    Log {
        /// Only entries with this status (pending, success, failed, permanent_fail)
        #[arg(long)]
        status: Option<SubmissionStatus>,

        /// Only entries with this action (create, update, delete, manual, retry)
        #[arg(long)]
        action: Option<Action>,

        #[arg(long, default_value_t = 1)]
        page: u32,

        /// One of 10, 25, 50, 100, 250
        #[arg(long, default_value_t = 50)]
        per_page: u32,
    },

    /// Validate the configuration and show the API key status
    Check,

    /// Generate a new API key
    Keygen {
        /// Also write the key file into the configured web root
        #[arg(long)]
        write: bool,
    },

    /// Run retry sweeps and log cleanup periodically until interrupted
    Daemon {
        #[arg(long, default_value_t = 12)]
        every_hours: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    match cli.command {
        Command::Submit {
            urls,
            table,
            urls_file,
        } => {
            let request = match table {
                Some(table) => {
                    let listed = read_url_lines(urls_file.as_deref())?;
                    let source = move |_: &str| listed.clone();
                    let filter = EventFilter::from_config(&config.events);
                    table_request(&table, &source, &filter, &config.site.host)?
                }
                None => manual_request(&urls, &config.site.host)?,
            };
            handle_submit(&config, &request).await
        }
        Command::Retry => handle_retry(&config, &config_hash).await,
        Command::Cleanup => handle_cleanup(&config),
        Command::Stats => handle_stats(&config),
        Command::Log {
            status,
            action,
            page,
            per_page,
        } => {
            let mut filter = LogFilter::new().with_page(page).with_per_page(per_page);
            filter.status = status;
            filter.action = action;
            handle_log(&config, &filter)
        }
        Command::Check => handle_check(&config, &config_hash),
        Command::Keygen { write } => handle_keygen(&config, write),
        Command::Daemon { every_hours } => {
            handle_daemon(config, &cli.config, config_hash, every_hours).await
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("indexnow_notify=info,warn"),
            1 => EnvFilter::new("indexnow_notify=debug,info"),
            2 => EnvFilter::new("indexnow_notify=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_store(config: &Config) -> anyhow::Result<SqliteLogStore> {
    let path = Path::new(&config.log.database_path);
    open_log_store(path, config.retry.policy())
        .with_context(|| format!("Failed to open submission log {}", path.display()))
}

/// Reads one URL per line from a file, or from stdin when no file is given
fn read_url_lines(path: Option<&Path>) -> anyhow::Result<Vec<String>> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?,
    };

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Handles `submit`: one manual batch, every URL logged
async fn handle_submit(config: &Config, request: &SubmissionRequest) -> anyhow::Result<()> {
    let submitter = Submitter::from_config(config)?;
    let notifier = Notifier::new(share(open_store(config)?), submitter);

    let entries = notifier.notify(request).await?;
    let succeeded = entries.iter().filter(|e| e.status == SubmissionStatus::Success).count();

    println!("Submitted {} URL(s), {} accepted", entries.len(), succeeded);
    if let Some(entry) = entries.first() {
        println!(
            "Response: {} ({})",
            entry.response_message.as_deref().unwrap_or("-"),
            entry.response_code.unwrap_or(0)
        );
        if let Some(next) = entry.next_retry {
            println!("Failed URLs will be retried after {}", next.to_rfc3339());
        }
    }

    Ok(())
}

/// Handles `retry`: a single sweep
async fn handle_retry(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let scheduler = RetryScheduler::new(
        share(open_store(config)?),
        Submitter::from_config(config)?,
        config.retry.policy(),
    );

    let report = scheduler.sweep().await?;
    println!("Retry sweep (config {}): {}", short_hash(config_hash), report);
    Ok(())
}

fn handle_cleanup(config: &Config) -> anyhow::Result<()> {
    let mut store = open_store(config)?;
    let deleted = cleanup_old_logs(&mut store, config.log.retention_days, Utc::now())?;
    println!("Removed {} log entries", deleted);
    Ok(())
}

fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.log.database_path);

    let store = open_store(config)?;
    let stats = load_statistics(&store, Utc::now())?;
    print_statistics(&stats);
    Ok(())
}

fn handle_log(config: &Config, filter: &LogFilter) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let page = load_log_page(&store, filter)?;
    print_log_page(&page);
    Ok(())
}

/// Handles `check`: configuration summary and key status
fn handle_check(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    println!("=== IndexNow Notify Configuration ===\n");
    println!("Config hash: {}\n", config_hash);

    println!("Site:");
    println!("  Host: {}", config.site.host);
    println!("  Endpoint: {}", config.indexnow.endpoint);
    println!(
        "  Batch size: {} (delay {}ms)",
        config.indexnow.batch_size, config.indexnow.batch_delay_ms
    );

    println!("\nRetry:");
    if config.retry.enabled {
        println!(
            "  Every {}h, up to {} attempts, {} per sweep",
            config.retry.interval_hours, config.retry.max_attempts, config.retry.sweep_limit
        );
    } else {
        println!("  Disabled");
    }

    println!("\nLog:");
    println!("  Database: {}", config.log.database_path);
    println!("  Retention: {} days", config.log.retention_days);

    println!("\nEvents:");
    println!("  Auto-submit: {}", config.events.auto_submit);
    println!("  Tables: {}", config.events.enabled_tables.join(", "));

    println!("\nAPI key:");
    let key = match config.site.resolve_api_key() {
        Ok(key) => key,
        Err(e) => {
            println!("  ✗ {}", e);
            return Ok(());
        }
    };

    if is_valid_api_key(&key) {
        println!("  ✓ Key format valid");
    } else {
        println!("  ✗ Key must be 8-128 characters of a-z, A-Z, 0-9 and '-'");
    }
    println!("  Key location: https://{}/{}.txt", config.site.host, key);

    match &config.site.web_root {
        Some(web_root) if key_file_valid(web_root, &key) => {
            println!("  ✓ Key file present: {}", key_file_path(web_root, &key).display());
        }
        Some(web_root) => {
            println!("  ✗ Key file missing or stale: {}", key_file_path(web_root, &key).display());
        }
        None => println!("  - No web root configured, key file not checked"),
    }

    Ok(())
}

fn handle_keygen(config: &Config, write: bool) -> anyhow::Result<()> {
    let key = generate_api_key();
    println!("{}", key);

    if write {
        let web_root = config
            .site
            .web_root
            .as_deref()
            .context("site.web-root must be set to write the key file")?;
        let path = write_key_file(web_root, &key)?;
        println!("Wrote {}", path.display());
        println!("Set site.api-key (or INDEXNOW_API_KEY) to this key to use it.");
    }

    Ok(())
}

/// Handles `daemon`: sweep and cleanup on an interval until Ctrl-C
///
/// The configuration is not reloaded; an edit on disk is reported once.
async fn handle_daemon(
    config: Config,
    config_path: &Path,
    config_hash: String,
    every_hours: u64,
) -> anyhow::Result<()> {
    let store = share(open_store(&config)?);
    let scheduler = RetryScheduler::new(
        store.clone(),
        Submitter::from_config(&config)?,
        config.retry.policy(),
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let period = Duration::from_secs(every_hours.max(1) * 3600);
    let mut ticker = tokio::time::interval(period);
    tracing::info!(
        config = short_hash(&config_hash),
        "Daemon started, running every {}h",
        every_hours.max(1)
    );
    let mut change_reported = false;

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown_rx.changed() => break,
        }
        if *shutdown_rx.borrow() {
            break;
        }

        if !change_reported {
            match compute_config_hash(config_path) {
                Ok(current) if current != config_hash => {
                    tracing::warn!(
                        "Configuration {} changed on disk (now {}), restart to apply it",
                        config_path.display(),
                        short_hash(&current)
                    );
                    change_reported = true;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!("Could not re-read configuration: {}", e),
            }
        }

        match scheduler.sweep().await {
            Ok(report) if !report.is_empty() => tracing::info!(
                config = short_hash(&config_hash),
                "Retry sweep: {}",
                report
            ),
            Ok(_) => {}
            Err(e) => tracing::error!("Retry sweep failed: {}", e),
        }

        let cleanup = lock_store(&store)
            .and_then(|mut guard| cleanup_old_logs(&mut *guard, config.log.retention_days, Utc::now()));
        if let Err(e) = cleanup {
            tracing::error!("Log cleanup failed: {}", e);
        }
    }

    tracing::info!("Daemon stopped");
    Ok(())
}
