pub mod payload;
pub mod table;

use thiserror::Error;

pub use payload::{RawChainPayload, Records, SideQuote, StrikeEntry};
pub use table::{COLUMNS, ExpiryTable, NormalizedRow, integral_strike};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NormalizeError {
    #[error("invalid option-chain payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("entry #{index} for expiry `{expiry}` has no `{field}`")]
    MissingField {
        field: &'static str,
        expiry: String,
        index: usize,
    },
}

/// Flatten every strike of `target_expiry` into an `ExpiryTable`.
///
/// Entries for other expiries are dropped. An expiry with no entries yields an
/// empty table. A matching entry without a strike price fails the whole call.
pub fn normalize(
    payload: &RawChainPayload,
    target_expiry: &str,
) -> Result<ExpiryTable, NormalizeError> {
    let data = payload.records()?.data()?;

    let mut rows = Vec::new();
    for (index, entry) in data.iter().enumerate() {
        if entry.expiry_date.as_deref() != Some(target_expiry) {
            continue;
        }
        let strike = entry.strike_price.ok_or_else(|| NormalizeError::MissingField {
            field: "strikePrice",
            expiry: target_expiry.to_string(),
            index,
        })?;
        rows.push(NormalizedRow::from_sides(
            strike,
            entry.call.as_ref(),
            entry.put.as_ref(),
        ));
    }

    Ok(ExpiryTable::from_rows(target_expiry, rows))
}
