use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use tracing::debug;

use crate::chain::RawChainPayload;

use super::{ChainSource, FetchError, excerpt};

const BASE_URL: &str = "https://www.nseindia.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Which option-chain endpoint a symbol lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Index,
    Equity,
}

impl InstrumentKind {
    fn endpoint(self) -> &'static str {
        match self {
            InstrumentKind::Index => "option-chain-indices",
            InstrumentKind::Equity => "option-chain-equities",
        }
    }
}

/// Cookie-carrying HTTP session against the exchange JSON API.
///
/// The API rejects requests without the cookies the home page sets, so every
/// fetch first loads the home page on the same client.
pub struct NseSource {
    client: reqwest::Client,
    base_url: String,
    kind: InstrumentKind,
}

impl NseSource {
    pub fn new(kind: InstrumentKind) -> Result<Self, FetchError> {
        Self::with_base_url(kind, BASE_URL)
    }

    /// Point the session at another host (a mirror or a local stub).
    pub fn with_base_url(kind: InstrumentKind, base_url: &str) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(NseSource {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            kind,
        })
    }

    pub fn chain_url(&self, symbol: &str) -> String {
        format!(
            "{}/api/{}?symbol={}",
            self.base_url,
            self.kind.endpoint(),
            symbol.to_uppercase()
        )
    }

    async fn warm_session(&self) -> Result<(), FetchError> {
        let resp = self.client.get(&self.base_url).send().await?;
        debug!(status = resp.status().as_u16(), "session warm-up");
        Ok(())
    }
}

#[async_trait]
impl ChainSource for NseSource {
    fn name(&self) -> &'static str {
        "nse"
    }

    async fn fetch(&self, symbol: &str) -> Result<RawChainPayload, FetchError> {
        self.warm_session().await?;

        let url = self.chain_url(symbol);
        let referer = format!("{}/option-chain", self.base_url);
        let resp = self
            .client
            .get(&url)
            .header(REFERER, referer)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
                excerpt: excerpt(&body, 200),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_url_per_kind() {
        let idx = NseSource::with_base_url(InstrumentKind::Index, "https://example.test/").unwrap();
        assert_eq!(
            idx.chain_url("nifty"),
            "https://example.test/api/option-chain-indices?symbol=NIFTY"
        );

        let eq = NseSource::with_base_url(InstrumentKind::Equity, "https://example.test").unwrap();
        assert_eq!(
            eq.chain_url("RELIANCE"),
            "https://example.test/api/option-chain-equities?symbol=RELIANCE"
        );
    }
}
