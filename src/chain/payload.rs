use serde::{Deserialize, Serialize};

use super::NormalizeError;

// ── Exchange response types ─────────────────────────────────────────
//
// Field names mirror the exchange JSON and are a fixed external contract.
// Everything is optional at the serde level so that structural problems
// surface as `NormalizeError`s instead of opaque parse failures.

/// Raw option-chain response, as returned by the exchange.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawChainPayload {
    pub records: Option<Records>,
}

/// The `records` section: every strike for every listed expiry.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Records {
    #[serde(rename = "expiryDates", default)]
    pub expiry_dates: Vec<String>,

    pub data: Option<Vec<StrikeEntry>>,

    pub timestamp: Option<String>,

    #[serde(rename = "underlyingValue")]
    pub underlying_value: Option<f64>,
}

/// One strike of one expiry, with optional call and put sides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StrikeEntry {
    #[serde(rename = "strikePrice")]
    pub strike_price: Option<f64>,

    #[serde(rename = "expiryDate")]
    pub expiry_date: Option<String>,

    #[serde(rename = "CE")]
    pub call: Option<SideQuote>,

    #[serde(rename = "PE")]
    pub put: Option<SideQuote>,
}

/// Metrics for a single side (CE or PE) of a strike.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SideQuote {
    #[serde(rename = "openInterest")]
    pub open_interest: Option<f64>,

    #[serde(rename = "changeinOpenInterest")]
    pub change_in_open_interest: Option<f64>,

    #[serde(rename = "lastPrice")]
    pub last_price: Option<f64>,

    #[serde(rename = "totalTradedVolume")]
    pub total_traded_volume: Option<f64>,
}

impl RawChainPayload {
    /// Parse a payload from JSON text.
    ///
    /// Anything that is not a JSON object of the expected shape is reported
    /// as `InvalidPayload`.
    pub fn from_json(text: &str) -> Result<Self, NormalizeError> {
        serde_json::from_str(text).map_err(|e| NormalizeError::InvalidPayload {
            reason: format!("not an option-chain document: {e}"),
        })
    }

    /// The `records` section, or `InvalidPayload` if it is missing.
    pub fn records(&self) -> Result<&Records, NormalizeError> {
        self.records
            .as_ref()
            .ok_or_else(|| NormalizeError::InvalidPayload {
                reason: "missing `records`".to_string(),
            })
    }

    /// Expiry labels in exchange order, empty when `records` is missing.
    pub fn expiry_dates(&self) -> &[String] {
        self.records
            .as_ref()
            .map(|r| r.expiry_dates.as_slice())
            .unwrap_or(&[])
    }
}

impl Records {
    /// The per-strike entries, or `InvalidPayload` if `data` is missing.
    pub fn data(&self) -> Result<&[StrikeEntry], NormalizeError> {
        self.data
            .as_deref()
            .ok_or_else(|| NormalizeError::InvalidPayload {
                reason: "missing `records.data`".to_string(),
            })
    }
}
