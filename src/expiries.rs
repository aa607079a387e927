use anyhow::{Context, Result};

use crate::run::{SourceConfig, SourceOptions};

/// Run the `expiries` command: fetch once and list the expiry labels.
pub fn run(symbol: &str, source: &SourceOptions) -> Result<()> {
    let source = SourceConfig::from_cli(source)?.build()?;
    let symbol = symbol.trim().to_uppercase();

    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    let payload = rt
        .block_on(source.fetch(&symbol))
        .with_context(|| format!("fetching {symbol} from {}", source.name()))?;

    let records = payload.records()?;
    let data = records.data()?;

    println!(
        "{symbol}: {} strikes across {} expiries",
        data.len(),
        records.expiry_dates.len()
    );
    if let Some(underlying) = records.underlying_value {
        println!("Underlying: {underlying}");
    }
    for (i, expiry) in records.expiry_dates.iter().enumerate() {
        let count = data
            .iter()
            .filter(|e| e.expiry_date.as_deref() == Some(expiry.as_str()))
            .count();
        println!("  [{i}] {expiry} ({count} strikes)");
    }
    Ok(())
}
