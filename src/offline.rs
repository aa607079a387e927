use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{info, warn};

use crate::chain::{RawChainPayload, normalize};
use crate::sink::csv::write_table;

/// Run the `normalize` command: read a saved payload, flatten one expiry,
/// and write it as CSV to `output` (or stdout).
///
/// Without `expiry` the nearest listed expiry is used.
pub fn run(file: &Path, expiry: Option<&str>, output: Option<&Path>) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let payload = RawChainPayload::from_json(&text)?;

    let expiry = match expiry {
        Some(e) => e.to_string(),
        None => match payload.expiry_dates().first() {
            Some(e) => e.clone(),
            None => bail!("{} lists no expiries; pass --expiry", file.display()),
        },
    };
    if !payload.expiry_dates().iter().any(|e| *e == expiry) {
        warn!(expiry = %expiry, "expiry not in the payload's expiry list");
    }

    let table = normalize(&payload, &expiry)?;

    match output {
        Some(path) => {
            let out = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            write_table(out, &table)?;
            info!(expiry = %expiry, rows = table.len(), path = %path.display(), "wrote table");
        }
        None => write_table(std::io::stdout().lock(), &table)?,
    }
    Ok(())
}
