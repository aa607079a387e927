pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::acquire::ChainSource;
use crate::chain::{ExpiryTable, normalize};
use crate::plan::{self, PlanEntry};
use crate::sink::TableSink;

pub use config::{RuntimeConfig, SinkConfig, SourceConfig, SourceOptions, SyncOptions};

/// What one sync cycle did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// (table name, expiry, rows) for every table written.
    pub written: Vec<(String, String, usize)>,
    /// Tables skipped because their expiry had no strikes.
    pub skipped_empty: Vec<String>,
    /// Tables whose expiry index was past the end of the expiry list.
    pub unresolved: Vec<String>,
}

/// Entry point for the `sync` command.
pub fn run(opts: &SyncOptions) -> Result<()> {
    let config = RuntimeConfig::from_cli(opts)?;

    info!(
        symbol = %config.symbol,
        source = ?config.source,
        sink = ?config.sink,
        interval_secs = config.interval.as_secs(),
        once = config.once,
        "option-chain sync starting"
    );
    for entry in &config.plan {
        info!(table = %entry.table_name, expiry = %entry.selector, "plan");
    }

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(run_async(config))
}

async fn run_async(config: RuntimeConfig) -> Result<()> {
    let source = config.source.build()?;
    let sink = config.sink.build()?;
    let destination = config.sink.destination_id();

    let shutdown = Arc::new(Notify::new());
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || shutdown.notify_one()).context("installing Ctrl-C handler")?;
    }

    loop {
        let market_open = config
            .market_hours
            .as_ref()
            .is_none_or(|hours| hours.is_open_now());

        if market_open {
            match run_cycle(
                source.as_ref(),
                sink.as_ref(),
                &destination,
                &config.symbol,
                &config.plan,
            )
            .await
            {
                Ok(report) => info!(
                    written = report.written.len(),
                    skipped = report.skipped_empty.len(),
                    unresolved = report.unresolved.len(),
                    "cycle complete"
                ),
                Err(e) => error!("cycle failed: {e:#}"),
            }
        } else {
            info!("market closed, waiting");
        }

        if config.once {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            _ = shutdown.notified() => {
                info!("interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}

/// Fetch one payload and push every planned table to the sink.
///
/// All tables are normalized before any is written, so a malformed payload
/// writes nothing.
pub async fn run_cycle(
    source: &dyn ChainSource,
    sink: &dyn TableSink,
    destination_id: &str,
    symbol: &str,
    plan: &[PlanEntry],
) -> Result<CycleReport> {
    let payload = source
        .fetch(symbol)
        .await
        .with_context(|| format!("fetching {symbol} from {}", source.name()))?;

    let records = payload.records()?;
    let strikes = records.data()?.len();
    info!(
        symbol,
        strikes,
        expiries = records.expiry_dates.len(),
        underlying = ?records.underlying_value,
        timestamp = records.timestamp.as_deref().unwrap_or("-"),
        "fetched chain"
    );

    let resolution = plan::resolve(plan, &records.expiry_dates);
    let mut report = CycleReport::default();

    for entry in &resolution.unresolved {
        warn!(
            table = %entry.table_name,
            selector = %entry.selector,
            available = records.expiry_dates.len(),
            "expiry index out of range, skipping"
        );
        report.unresolved.push(entry.table_name.clone());
    }

    let mut tables: Vec<(String, ExpiryTable)> = Vec::with_capacity(resolution.resolved.len());
    for entry in resolution.resolved {
        if !entry.listed {
            let head: Vec<&str> = records.expiry_dates.iter().take(5).map(String::as_str).collect();
            warn!(
                table = %entry.table_name,
                expiry = %entry.expiry,
                "expiry not listed today (available: {})",
                head.join(", ")
            );
        }
        let table = normalize(&payload, &entry.expiry)
            .with_context(|| format!("normalizing {} for {}", entry.expiry, entry.table_name))?;
        tables.push((entry.table_name, table));
    }

    for (table_name, table) in tables {
        if table.is_empty() {
            warn!(table = %table_name, expiry = table.expiry(), "no strikes, skipping");
            report.skipped_empty.push(table_name);
            continue;
        }
        sink.write(destination_id, &table_name, &table)
            .await
            .with_context(|| format!("writing {table_name} to {}", sink.name()))?;
        info!(
            table = %table_name,
            expiry = table.expiry(),
            rows = table.len(),
            "updated"
        );
        report
            .written
            .push((table_name, table.expiry().to_string(), table.len()));
    }

    Ok(report)
}
