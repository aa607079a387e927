use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::acquire::{ChainSource, FileSource, InstrumentKind, NseSource};
use crate::market_hours::{MarketHours, parse_hhmm};
use crate::plan::{PlanEntry, parse_plan};
use crate::sink::{CsvSink, SheetsSink, TableSink};

pub const SHEET_ID_VAR: &str = "SHEET_ID";
pub const CREDENTIALS_VAR: &str = "GOOGLE_CREDENTIALS_PATH";
const DEFAULT_CREDENTIALS: &str = "service_account.json";

/// Where payloads are fetched from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceConfig {
    Nse { kind: InstrumentKind },
    File { path: PathBuf },
}

/// Where tables are written.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkConfig {
    Sheets {
        spreadsheet_id: String,
        credentials_path: PathBuf,
    },
    Csv {
        output_dir: PathBuf,
    },
}

/// Source selection as given on the command line.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub source: String,
    pub kind: String,
    pub input: Option<PathBuf>,
}

/// CLI-facing options for `sync` (before env var resolution).
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub symbol: String,
    pub source: SourceOptions,
    pub sink: String,
    pub output_dir: PathBuf,
    pub tables: Vec<String>,
    pub interval_secs: u64,
    pub market_open: String,
    pub market_close: String,
    pub ignore_market_hours: bool,
    pub once: bool,
}

/// Fully resolved configuration for the sync loop.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub symbol: String,
    pub source: SourceConfig,
    pub sink: SinkConfig,
    pub plan: Vec<PlanEntry>,
    pub interval: Duration,
    /// `None` polls around the clock.
    pub market_hours: Option<MarketHours>,
    pub once: bool,
}

impl SourceConfig {
    pub fn from_cli(opts: &SourceOptions) -> Result<Self> {
        match opts.source.to_lowercase().as_str() {
            "nse" => {
                let kind = match opts.kind.to_lowercase().as_str() {
                    "index" | "indices" => InstrumentKind::Index,
                    "equity" | "equities" | "stock" => InstrumentKind::Equity,
                    other => bail!("Invalid kind '{other}'. Use 'index' or 'equity'."),
                };
                Ok(SourceConfig::Nse { kind })
            }
            "file" => {
                let path = opts
                    .input
                    .clone()
                    .context("--input is required with --source file")?;
                Ok(SourceConfig::File { path })
            }
            other => bail!("Invalid source '{other}'. Use 'nse' or 'file'."),
        }
    }

    pub fn build(&self) -> Result<Box<dyn ChainSource>> {
        let source: Box<dyn ChainSource> = match self {
            SourceConfig::Nse { kind } => {
                Box::new(NseSource::new(*kind).context("creating HTTP session")?)
            }
            SourceConfig::File { path } => Box::new(FileSource::new(path.clone())),
        };
        Ok(source)
    }
}

impl SinkConfig {
    /// The id handed to `TableSink::write`.
    pub fn destination_id(&self) -> String {
        match self {
            SinkConfig::Sheets { spreadsheet_id, .. } => spreadsheet_id.clone(),
            SinkConfig::Csv { output_dir } => output_dir.display().to_string(),
        }
    }

    pub fn build(&self) -> Result<Box<dyn TableSink>> {
        let sink: Box<dyn TableSink> = match self {
            SinkConfig::Sheets {
                credentials_path, ..
            } => Box::new(
                SheetsSink::from_credentials_file(credentials_path)
                    .with_context(|| format!("loading {}", credentials_path.display()))?,
            ),
            SinkConfig::Csv { .. } => Box::new(CsvSink::new()),
        };
        Ok(sink)
    }
}

impl RuntimeConfig {
    pub fn from_cli(opts: &SyncOptions) -> Result<Self> {
        Self::from_cli_with_env(opts, |name| std::env::var(name).ok())
    }

    /// Resolve CLI options, reading environment variables through `env`.
    pub fn from_cli_with_env(
        opts: &SyncOptions,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let symbol = opts.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            bail!("--symbol must not be empty");
        }

        let source = SourceConfig::from_cli(&opts.source)?;

        let sink = match opts.sink.to_lowercase().as_str() {
            "sheets" => {
                let spreadsheet_id = env(SHEET_ID_VAR).filter(|s| !s.is_empty()).ok_or_else(|| {
                    anyhow::anyhow!(
                        "{SHEET_ID_VAR} env var not set. \
                         Set it to the id of the target Google spreadsheet."
                    )
                })?;
                let credentials_path = PathBuf::from(
                    env(CREDENTIALS_VAR).unwrap_or_else(|| DEFAULT_CREDENTIALS.to_string()),
                );
                if !credentials_path.exists() {
                    bail!(
                        "Google credentials not found at {} (set {CREDENTIALS_VAR})",
                        credentials_path.display()
                    );
                }
                SinkConfig::Sheets {
                    spreadsheet_id,
                    credentials_path,
                }
            }
            "csv" => SinkConfig::Csv {
                output_dir: opts.output_dir.clone(),
            },
            other => bail!("Invalid sink '{other}'. Use 'sheets' or 'csv'."),
        };

        let plan = parse_plan(&opts.tables)?;

        if opts.interval_secs == 0 {
            bail!("--interval-secs must be positive");
        }

        let market_hours = if opts.ignore_market_hours {
            None
        } else {
            let open = parse_hhmm(&opts.market_open)?;
            let close = parse_hhmm(&opts.market_close)?;
            if open >= close {
                bail!("Market open {open} must be before close {close}");
            }
            Some(MarketHours::new(open, close))
        };

        Ok(RuntimeConfig {
            symbol,
            source,
            sink,
            plan,
            interval: Duration::from_secs(opts.interval_secs),
            market_hours,
            once: opts.once,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ExpirySelector;

    fn opts() -> SyncOptions {
        SyncOptions {
            symbol: "nifty".into(),
            source: SourceOptions {
                source: "nse".into(),
                kind: "index".into(),
                input: None,
            },
            sink: "csv".into(),
            output_dir: PathBuf::from("out"),
            tables: vec![],
            interval_secs: 30,
            market_open: "09:15".into(),
            market_close: "15:30".into(),
            ignore_market_hours: false,
            once: false,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_resolve() {
        let cfg = RuntimeConfig::from_cli_with_env(&opts(), no_env).unwrap();
        assert_eq!(cfg.symbol, "NIFTY");
        assert_eq!(cfg.source, SourceConfig::Nse { kind: InstrumentKind::Index });
        assert_eq!(cfg.sink.destination_id(), "out");
        assert_eq!(cfg.plan.len(), 4);
        assert_eq!(cfg.plan[2].selector, ExpirySelector::Index(2));
        assert_eq!(cfg.market_hours, Some(MarketHours::default()));
    }

    #[test]
    fn test_sheets_requires_sheet_id() {
        let mut o = opts();
        o.sink = "sheets".into();
        let err = RuntimeConfig::from_cli_with_env(&o, no_env).unwrap_err();
        assert!(err.to_string().contains(SHEET_ID_VAR));
    }

    #[test]
    fn test_sheets_checks_credentials_path() {
        let mut o = opts();
        o.sink = "sheets".into();
        let env = |name: &str| match name {
            SHEET_ID_VAR => Some("sheet-123".to_string()),
            CREDENTIALS_VAR => Some("/definitely/not/here.json".to_string()),
            _ => None,
        };
        let err = RuntimeConfig::from_cli_with_env(&o, env).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn test_file_source_needs_input() {
        let mut o = opts();
        o.source.source = "file".into();
        assert!(RuntimeConfig::from_cli_with_env(&o, no_env).is_err());

        o.source.input = Some(PathBuf::from("chain.json"));
        let cfg = RuntimeConfig::from_cli_with_env(&o, no_env).unwrap();
        assert_eq!(cfg.source, SourceConfig::File { path: PathBuf::from("chain.json") });
    }

    #[test]
    fn test_market_hours_validation() {
        let mut o = opts();
        o.market_open = "16:00".into();
        assert!(RuntimeConfig::from_cli_with_env(&o, no_env).is_err());

        o.ignore_market_hours = true;
        let cfg = RuntimeConfig::from_cli_with_env(&o, no_env).unwrap();
        assert_eq!(cfg.market_hours, None);
    }

    #[test]
    fn test_rejects_unknown_sink_and_kind() {
        let mut o = opts();
        o.sink = "excel".into();
        assert!(RuntimeConfig::from_cli_with_env(&o, no_env).is_err());

        let mut o = opts();
        o.source.kind = "futures".into();
        assert!(RuntimeConfig::from_cli_with_env(&o, no_env).is_err());
    }
}
