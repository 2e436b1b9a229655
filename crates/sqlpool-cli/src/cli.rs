//! `sqlpool` - check and exercise a database connection pool from the shell

mod commands;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlpool::PoolConfig;

use crate::commands::{BenchOptions, OutputFormat};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Pool configuration file (`.toml` or `.json`)
    #[arg(short, long, default_value = "sqlpool.toml", env = "SQLPOOL_CONFIG")]
    config: PathBuf,

    /// Connection target, overriding the one in the config file
    #[arg(long, env = "SQLPOOL_URL")]
    url: Option<String>,

    /// Output format for results
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Verbose logging, including pool operation spans
    #[arg(short, long)]
    verbose: bool,

    /// Also write JSON logs (to the default log directory unless `--log-dir` is given)
    #[arg(long)]
    log_json: bool,

    /// Directory for JSON log files
    #[arg(long, env = "SQLPOOL_LOG_DIR", requires = "log_json")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialise the pool, validate one connection and print pool statistics
    Check {
        /// Query used to probe the connection (defaults to the configured
        /// validation query, then to the driver's default)
        #[arg(long)]
        query: Option<String>,
    },
    /// Run concurrent acquire/query/release loops against the pool
    Bench {
        /// Number of concurrent tasks
        #[arg(short, long, default_value_t = 8)]
        tasks: usize,

        /// Acquire/release cycles per task
        #[arg(short, long, default_value_t = 100)]
        iterations: usize,

        /// Query run on every borrowed connection
        #[arg(short, long, default_value = "SELECT 1")]
        query: String,

        /// Milliseconds each task keeps a connection before releasing it
        #[arg(long, default_value_t = 0)]
        hold_ms: u64,
    },
}

fn load_config(args: &Args) -> Result<PoolConfig> {
    let config = PoolConfig::load(&args.config)
        .with_context(|| format!("Failed to load pool config {}", args.config.display()))?;

    Ok(match &args.url {
        Some(url) => config.with_url(url.clone()),
        None => config,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let logging_config = if args.verbose {
        logging::LoggingConfig::verbose()
    } else {
        logging::LoggingConfig::default()
    };
    let logging_config = if args.log_json {
        logging_config.with_json_logs(args.log_dir.clone())
    } else {
        logging_config
    };
    let _log_guard = logging::init(&logging_config)?;

    let config = load_config(&args)?;
    tracing::debug!(?config, "pool configuration loaded");

    match args.command {
        Command::Check { query } => commands::check(config, query, args.format).await,
        Command::Bench {
            tasks,
            iterations,
            query,
            hold_ms,
        } => {
            let options = BenchOptions {
                tasks,
                iterations,
                query,
                hold: std::time::Duration::from_millis(hold_ms),
            };
            commands::bench(config, options, args.format).await
        }
    }
}
