pub mod file;
pub mod nse;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::chain::RawChainPayload;

pub use file::FileSource;
pub use nse::{InstrumentKind, NseSource};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned HTTP {status}: {excerpt}")]
    Status {
        url: String,
        status: u16,
        excerpt: String,
    },

    #[error("response is not an option-chain document: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where option-chain payloads come from.
///
/// Implementations only fetch; they never interpret or retry.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Short name for log lines.
    fn name(&self) -> &'static str;

    /// Fetch the current chain for `symbol`.
    async fn fetch(&self, symbol: &str) -> Result<RawChainPayload, FetchError>;
}

/// First `max` characters of a response body, for error messages.
pub(crate) fn excerpt(body: &str, max: usize) -> String {
    let mut s: String = body.chars().take(max).collect();
    if body.chars().count() > max {
        s.push('…');
    }
    s
}
