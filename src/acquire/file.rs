use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::chain::RawChainPayload;

use super::{ChainSource, FetchError};

/// Reads saved payloads from disk.
///
/// `path` is either a single JSON file (used for every symbol) or a
/// directory holding one `<SYMBOL>.json` per symbol.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        if self.path.is_dir() {
            self.path.join(format!("{}.json", symbol.to_uppercase()))
        } else {
            self.path.clone()
        }
    }
}

#[async_trait]
impl ChainSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn fetch(&self, symbol: &str) -> Result<RawChainPayload, FetchError> {
        let path = self.path_for(symbol);
        let text = read(&path).await?;
        Ok(serde_json::from_str(&text)?)
    }
}

async fn read(path: &Path) -> Result<String, FetchError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| FetchError::Io {
            path: path.to_path_buf(),
            source,
        })
}
