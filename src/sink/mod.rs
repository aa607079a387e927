pub mod csv;
pub mod sheets;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::chain::ExpiryTable;

pub use self::csv::CsvSink;
pub use sheets::SheetsSink;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{operation} returned HTTP {status}: {message}")]
    Api {
        operation: &'static str,
        status: u16,
        message: String,
    },
}

/// Destination for normalized tables.
///
/// `write` replaces whatever `table_name` held before, so writing the same
/// table twice leaves the destination unchanged.
#[async_trait]
pub trait TableSink: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    async fn write(
        &self,
        destination_id: &str,
        table_name: &str,
        table: &ExpiryTable,
    ) -> Result<(), SinkError>;
}
