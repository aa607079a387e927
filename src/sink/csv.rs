use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::chain::{COLUMNS, ExpiryTable};

use super::{SinkError, TableSink};

/// Writes each table to `<destination>/<table_name>.csv`.
#[derive(Debug, Default, Clone)]
pub struct CsvSink;

impl CsvSink {
    pub fn new() -> Self {
        CsvSink
    }

    pub fn file_path(destination_id: &str, table_name: &str) -> PathBuf {
        Path::new(destination_id).join(format!("{}.csv", sanitize(table_name)))
    }
}

#[async_trait]
impl TableSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn write(
        &self,
        destination_id: &str,
        table_name: &str,
        table: &ExpiryTable,
    ) -> Result<(), SinkError> {
        let dir = Path::new(destination_id);
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| SinkError::Io {
                path: dir.to_path_buf(),
                source,
            })?;

        let mut buf = Vec::new();
        write_table(&mut buf, table)?;

        // Stage next to the target so the rename stays on one filesystem.
        let path = Self::file_path(destination_id, table_name);
        let staged = path.with_extension("csv.tmp");
        if let Err(source) = tokio::fs::write(&staged, &buf).await {
            return Err(SinkError::Io { path: staged, source });
        }
        if let Err(source) = tokio::fs::rename(&staged, &path).await {
            let _ = tokio::fs::remove_file(&staged).await;
            return Err(SinkError::Io { path, source });
        }
        Ok(())
    }
}

/// Write the header and every row of `table` as CSV.
///
/// The header is written even for an empty table.
pub fn write_table<W: Write>(writer: W, table: &ExpiryTable) -> Result<(), SinkError> {
    let mut wtr = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(COLUMNS)?;
    for row in table.rows() {
        wtr.serialize(row)?;
    }
    wtr.flush().map_err(::csv::Error::from)?;
    Ok(())
}

/// Sanitize a table name for use as a filename component.
fn sanitize(s: &str) -> String {
    s.to_lowercase()
        .replace('/', "_")
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_table_name() {
        assert_eq!(sanitize("Next Week"), "next_week");
        assert_eq!(sanitize("NIFTY/09-Dec"), "nifty_09-dec");
        assert_eq!(sanitize("a.b:c"), "abc");
    }
}
