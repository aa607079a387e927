use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Expiry label format used by the exchange, e.g. `09-Dec-2025`.
pub const EXPIRY_FORMAT: &str = "%d-%b-%Y";

#[derive(Debug, Error, PartialEq)]
pub enum PlanError {
    #[error("table spec `{0}` must look like NAME=SELECTOR (e.g. Weekly=0 or Dec=30-Dec-2025)")]
    Malformed(String),

    #[error("table name is empty in `{0}`")]
    EmptyName(String),

    #[error("`{selector}` is neither an expiry index nor a DD-Mon-YYYY label")]
    BadSelector { selector: String },

    #[error("table `{0}` appears more than once")]
    DuplicateTable(String),
}

/// Which expiry a table tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpirySelector {
    /// Position in the payload's `expiryDates` list; 0 is the nearest expiry.
    Index(usize),
    /// A fixed expiry label.
    Label(String),
}

impl fmt::Display for ExpirySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpirySelector::Index(i) => write!(f, "#{i}"),
            ExpirySelector::Label(l) => f.write_str(l),
        }
    }
}

/// One destination table and the expiry it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub table_name: String,
    pub selector: ExpirySelector,
}

impl FromStr for PlanEntry {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, selector) = s
            .split_once('=')
            .ok_or_else(|| PlanError::Malformed(s.to_string()))?;
        let name = name.trim();
        let selector = selector.trim();
        if name.is_empty() {
            return Err(PlanError::EmptyName(s.to_string()));
        }

        let selector = if let Ok(index) = selector.parse::<usize>() {
            ExpirySelector::Index(index)
        } else if chrono::NaiveDate::parse_from_str(selector, EXPIRY_FORMAT).is_ok() {
            ExpirySelector::Label(selector.to_string())
        } else {
            return Err(PlanError::BadSelector {
                selector: selector.to_string(),
            });
        };

        Ok(PlanEntry {
            table_name: name.to_string(),
            selector,
        })
    }
}

/// Weekly, next week, monthly and next month: the four nearest expiries.
pub fn default_plan() -> Vec<PlanEntry> {
    ["Weekly", "NextWeek", "Monthly", "NextMonth"]
        .iter()
        .enumerate()
        .map(|(i, name)| PlanEntry {
            table_name: name.to_string(),
            selector: ExpirySelector::Index(i),
        })
        .collect()
}

/// Parse `NAME=SELECTOR` specs; an empty list means the default plan.
pub fn parse_plan(specs: &[String]) -> Result<Vec<PlanEntry>, PlanError> {
    if specs.is_empty() {
        return Ok(default_plan());
    }

    let mut seen = HashSet::new();
    let mut plan = Vec::with_capacity(specs.len());
    for spec in specs {
        let entry: PlanEntry = spec.parse()?;
        if !seen.insert(entry.table_name.clone()) {
            return Err(PlanError::DuplicateTable(entry.table_name));
        }
        plan.push(entry);
    }
    Ok(plan)
}

// ── Resolution ──────────────────────────────────────────────────────

/// A plan entry pinned to a concrete expiry label for this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub table_name: String,
    pub expiry: String,
    /// False when a fixed label is not in today's expiry list.
    pub listed: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: Vec<ResolvedEntry>,
    /// Entries whose index is past the end of the expiry list.
    pub unresolved: Vec<PlanEntry>,
}

/// Pin every plan entry to an expiry from `expiry_dates`.
pub fn resolve(plan: &[PlanEntry], expiry_dates: &[String]) -> Resolution {
    let mut out = Resolution::default();
    for entry in plan {
        match &entry.selector {
            ExpirySelector::Index(i) => match expiry_dates.get(*i) {
                Some(expiry) => out.resolved.push(ResolvedEntry {
                    table_name: entry.table_name.clone(),
                    expiry: expiry.clone(),
                    listed: true,
                }),
                None => out.unresolved.push(entry.clone()),
            },
            ExpirySelector::Label(label) => out.resolved.push(ResolvedEntry {
                table_name: entry.table_name.clone(),
                expiry: label.clone(),
                listed: expiry_dates.iter().any(|d| d == label),
            }),
        }
    }
    out
}
