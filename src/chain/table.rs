use serde::{Serialize, Serializer};

use super::payload::SideQuote;

/// Output column names, in the order every sink writes them.
pub const COLUMNS: [&str; 9] = [
    "Strike",
    "CE OI",
    "CE Chg OI",
    "CE LTP",
    "CE Volume",
    "PE LTP",
    "PE Chg OI",
    "PE OI",
    "PE Volume",
];

/// One flattened strike. Field order is the column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    #[serde(rename = "Strike", serialize_with = "serialize_strike")]
    pub strike: f64,
    #[serde(rename = "CE OI")]
    pub ce_open_interest: f64,
    #[serde(rename = "CE Chg OI")]
    pub ce_change_in_oi: f64,
    #[serde(rename = "CE LTP")]
    pub ce_last_price: f64,
    #[serde(rename = "CE Volume")]
    pub ce_volume: f64,
    #[serde(rename = "PE LTP")]
    pub pe_last_price: f64,
    #[serde(rename = "PE Chg OI")]
    pub pe_change_in_oi: f64,
    #[serde(rename = "PE OI")]
    pub pe_open_interest: f64,
    #[serde(rename = "PE Volume")]
    pub pe_volume: f64,
}

impl NormalizedRow {
    /// Build a row from a strike and its optional sides. Absent sides and
    /// absent fields become 0.
    pub fn from_sides(strike: f64, call: Option<&SideQuote>, put: Option<&SideQuote>) -> Self {
        let ce = SideMetrics::from_quote(call);
        let pe = SideMetrics::from_quote(put);
        NormalizedRow {
            strike,
            ce_open_interest: ce.open_interest,
            ce_change_in_oi: ce.change_in_oi,
            ce_last_price: ce.last_price,
            ce_volume: ce.volume,
            pe_last_price: pe.last_price,
            pe_change_in_oi: pe.change_in_oi,
            pe_open_interest: pe.open_interest,
            pe_volume: pe.volume,
        }
    }

    /// Cell values in `COLUMNS` order.
    pub fn cells(&self) -> [f64; 9] {
        [
            self.strike,
            self.ce_open_interest,
            self.ce_change_in_oi,
            self.ce_last_price,
            self.ce_volume,
            self.pe_last_price,
            self.pe_change_in_oi,
            self.pe_open_interest,
            self.pe_volume,
        ]
    }
}

/// The strike as an integer when it has no fractional part.
pub fn integral_strike(strike: f64) -> Option<i64> {
    (strike.fract() == 0.0 && strike.abs() < i64::MAX as f64).then_some(strike as i64)
}

/// Writes `18000.0` as `18000`; fractional strikes stay floats.
fn serialize_strike<S: Serializer>(strike: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    match integral_strike(*strike) {
        Some(whole) => serializer.serialize_i64(whole),
        None => serializer.serialize_f64(*strike),
    }
}

struct SideMetrics {
    open_interest: f64,
    change_in_oi: f64,
    last_price: f64,
    volume: f64,
}

impl SideMetrics {
    fn from_quote(quote: Option<&SideQuote>) -> Self {
        let field = |get: fn(&SideQuote) -> Option<f64>| quote.and_then(get).unwrap_or(0.0);
        SideMetrics {
            open_interest: field(|q| q.open_interest),
            change_in_oi: field(|q| q.change_in_open_interest),
            last_price: field(|q| q.last_price),
            volume: field(|q| q.total_traded_volume),
        }
    }
}

/// All strikes of one expiry, ascending by strike, one row per strike.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryTable {
    expiry: String,
    rows: Vec<NormalizedRow>,
}

impl ExpiryTable {
    /// Sort rows by strike and collapse duplicate strikes.
    ///
    /// The sort is stable, so among rows sharing a strike the one that came
    /// last in `rows` is the one kept.
    pub fn from_rows(expiry: impl Into<String>, mut rows: Vec<NormalizedRow>) -> Self {
        rows.sort_by(|a, b| a.strike.total_cmp(&b.strike));

        let mut unique: Vec<NormalizedRow> = Vec::with_capacity(rows.len());
        for row in rows {
            match unique.last_mut() {
                Some(last) if last.strike == row.strike => *last = row,
                _ => unique.push(row),
            }
        }

        ExpiryTable {
            expiry: expiry.into(),
            rows: unique,
        }
    }

    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    pub fn rows(&self) -> &[NormalizedRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn strikes(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(|r| r.strike)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(strike: f64, ce_oi: f64) -> NormalizedRow {
        NormalizedRow {
            ce_open_interest: ce_oi,
            ..NormalizedRow::from_sides(strike, None, None)
        }
    }

    #[test]
    fn test_sorts_numerically() {
        let table = ExpiryTable::from_rows("x", vec![row(9000.0, 0.0), row(10000.0, 0.0), row(950.0, 0.0)]);
        let strikes: Vec<f64> = table.strikes().collect();
        assert_eq!(strikes, vec![950.0, 9000.0, 10000.0]);
    }

    #[test]
    fn test_duplicate_strike_keeps_last_seen() {
        let table = ExpiryTable::from_rows(
            "x",
            vec![row(100.0, 1.0), row(50.0, 0.0), row(100.0, 2.0), row(100.0, 3.0)],
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[1].ce_open_interest, 3.0);
    }

    #[test]
    fn test_strike_serializes_without_fraction() {
        let whole = serde_json::to_value(row(18000.0, 0.0)).unwrap();
        assert_eq!(whole["Strike"], serde_json::json!(18000));
        let half = serde_json::to_value(row(17.5, 0.0)).unwrap();
        assert_eq!(half["Strike"], serde_json::json!(17.5));
        assert_eq!(integral_strike(f64::NAN), None);
    }

    #[test]
    fn test_cells_follow_column_order() {
        let put = SideQuote {
            open_interest: Some(7.0),
            last_price: Some(2.5),
            ..Default::default()
        };
        let r = NormalizedRow::from_sides(100.0, None, Some(&put));
        let cells = r.cells();
        assert_eq!(cells[0], 100.0);
        assert_eq!(cells[5], 2.5); // PE LTP
        assert_eq!(cells[7], 7.0); // PE OI
        assert_eq!(cells.len(), COLUMNS.len());
    }
}
