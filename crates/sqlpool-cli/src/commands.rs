//! Subcommand implementations

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use sqlpool::{ConnectionPool, PoolConfig, PoolStats, default_validation_query};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone)]
pub struct BenchOptions {
    pub tasks: usize,
    pub iterations: usize,
    pub query: String,
    pub hold: Duration,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    driver: String,
    query: String,
    elapsed_ms: u128,
    stats: PoolStats,
}

#[derive(Debug, Serialize)]
struct BenchReport {
    tasks: usize,
    iterations: usize,
    succeeded: usize,
    exhausted: usize,
    failed: usize,
    elapsed_ms: u128,
    ops_per_sec: f64,
    stats: PoolStats,
}

async fn build_pool(config: PoolConfig) -> Result<ConnectionPool> {
    ConnectionPool::builder()
        .config(config)
        .build()
        .await
        .context("Failed to initialise connection pool")
}

/// Borrow one connection, run the probe query on it and report pool state.
pub async fn check(config: PoolConfig, query: Option<String>, format: OutputFormat) -> Result<()> {
    let pool = build_pool(config).await?;

    let started = Instant::now();
    let conn = pool.acquire().await.context("Failed to acquire a connection")?;
    let driver = conn.driver_name().to_string();
    let query = query
        .or_else(|| pool.config().validation_query().map(str::to_string))
        .unwrap_or_else(|| default_validation_query(&driver).to_string());

    let probe = conn.query(&query, &[]).await;
    pool.release(conn).await?;
    probe.with_context(|| format!("Probe query failed: {}", query))?;

    let report = CheckReport {
        driver,
        query,
        elapsed_ms: started.elapsed().as_millis(),
        stats: pool.stats().await,
    };
    pool.close().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            let mut table = stats_table(&report.stats);
            table.add_row(vec!["driver".to_string(), report.driver]);
            table.add_row(vec!["probe".to_string(), report.query]);
            table.add_row(vec!["elapsed".to_string(), format!("{} ms", report.elapsed_ms)]);
            println!("{table}");
        }
    }
    Ok(())
}

/// Hammer the pool from concurrent tasks and report throughput.
///
/// Exhausted acquires are counted rather than treated as failures; they are
/// the expected outcome when `max_wait_ms` is short and `tasks > max_size`.
pub async fn bench(config: PoolConfig, options: BenchOptions, format: OutputFormat) -> Result<()> {
    let pool = build_pool(config).await?;
    let succeeded = Arc::new(AtomicUsize::new(0));
    let exhausted = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    tracing::info!(
        tasks = options.tasks,
        iterations = options.iterations,
        "starting benchmark"
    );
    let started = Instant::now();

    let mut workers = Vec::with_capacity(options.tasks);
    for task in 0..options.tasks {
        let pool = pool.clone();
        let options = options.clone();
        let (succeeded, exhausted, failed) = (succeeded.clone(), exhausted.clone(), failed.clone());

        workers.push(tokio::spawn(async move {
            for _ in 0..options.iterations {
                let conn = match pool.acquire().await {
                    Ok(conn) => conn,
                    Err(e) if e.is_pool_exhausted() => {
                        exhausted.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(task, error = %e, "acquire failed");
                        failed.fetch_add(1, Ordering::Relaxed);
                        continue;
                    }
                };

                let outcome = conn.query(&options.query, &[]).await;
                if !options.hold.is_zero() {
                    tokio::time::sleep(options.hold).await;
                }
                let released = pool.release(conn).await;

                match outcome.and(released) {
                    Ok(()) => succeeded.fetch_add(1, Ordering::Relaxed),
                    Err(e) => {
                        tracing::warn!(task, error = %e, "query failed");
                        failed.fetch_add(1, Ordering::Relaxed)
                    }
                };
            }
        }));
    }

    for worker in workers {
        worker.await.context("Benchmark task panicked")?;
    }

    let elapsed = started.elapsed();
    let succeeded = succeeded.load(Ordering::Relaxed);
    let report = BenchReport {
        tasks: options.tasks,
        iterations: options.iterations,
        succeeded,
        exhausted: exhausted.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        elapsed_ms: elapsed.as_millis(),
        ops_per_sec: ops_per_sec(succeeded, elapsed),
        stats: pool.stats().await,
    };
    pool.close().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            let mut table = stats_table(&report.stats);
            table.add_row(vec!["succeeded".to_string(), report.succeeded.to_string()]);
            table.add_row(vec!["exhausted".to_string(), report.exhausted.to_string()]);
            table.add_row(vec!["failed".to_string(), report.failed.to_string()]);
            table.add_row(vec!["elapsed".to_string(), format!("{} ms", report.elapsed_ms)]);
            table.add_row(vec![
                "throughput".to_string(),
                format!("{:.1} ops/s", report.ops_per_sec),
            ]);
            println!("{table}");
        }
    }

    if report.failed > 0 {
        anyhow::bail!("{} of {} operations failed", report.failed, options.tasks * options.iterations);
    }
    Ok(())
}

fn ops_per_sec(operations: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        0.0
    } else {
        operations as f64 / secs
    }
}

fn stats_table(stats: &PoolStats) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["metric", "value"]);

    table.add_row(vec!["connections".to_string(), stats.total().to_string()]);
    table.add_row(vec!["idle".to_string(), stats.idle().to_string()]);
    table.add_row(vec!["active".to_string(), stats.active().to_string()]);
    table.add_row(vec!["waiting".to_string(), stats.waiting().to_string()]);
    table.add_row(vec![
        "utilization".to_string(),
        format!("{:.0}%", stats.utilization() * 100.0),
    ]);
    table
}
