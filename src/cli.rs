use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Option-chain sync — fetch a live option chain, flatten it per expiry,
/// and push the tables to Google Sheets or CSV.
#[derive(Parser)]
#[command(name = "option-chain-sync", version, about)]
pub struct Cli {
    /// Also append log lines to this file (e.g. option_chain.log)
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Where to fetch the chain from.
#[derive(Args, Clone)]
pub struct SourceArgs {
    /// Underlying symbol (e.g. NIFTY, BANKNIFTY, RELIANCE)
    #[arg(long, default_value = "NIFTY")]
    pub symbol: String,

    /// Instrument kind: index or equity
    #[arg(long, default_value = "index")]
    pub kind: String,

    /// Payload source: nse (live HTTP session) or file (saved JSON)
    #[arg(long, default_value = "nse")]
    pub source: String,

    /// Payload file, or a directory of <SYMBOL>.json files (with --source file)
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Poll the chain and keep the destination tables up to date
    Sync {
        #[command(flatten)]
        source: SourceArgs,

        /// Destination: sheets (needs SHEET_ID and GOOGLE_CREDENTIALS_PATH) or csv
        #[arg(long, default_value = "sheets")]
        sink: String,

        /// Output directory for the csv sink
        #[arg(long, default_value = "data")]
        output_dir: PathBuf,

        /// Table to maintain, as NAME=SELECTOR where SELECTOR is an expiry
        /// index (0 = nearest) or a DD-Mon-YYYY label. Repeatable.
        /// Default: Weekly=0 NextWeek=1 Monthly=2 NextMonth=3
        #[arg(long = "table", value_name = "NAME=SELECTOR")]
        tables: Vec<String>,

        /// Seconds between polls
        #[arg(long, default_value = "30")]
        interval_secs: u64,

        /// Session open, HH:MM IST
        #[arg(long, default_value = "09:15")]
        market_open: String,

        /// Session close, HH:MM IST
        #[arg(long, default_value = "15:30")]
        market_close: String,

        /// Poll regardless of market hours
        #[arg(long)]
        ignore_market_hours: bool,

        /// Run a single cycle then exit (for external cron)
        #[arg(long)]
        once: bool,
    },

    /// Fetch the chain once and list its expiries
    Expiries {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Flatten a saved payload for one expiry and print it as CSV
    Normalize {
        /// Path to the option-chain JSON file
        file: PathBuf,

        /// Expiry label (DD-Mon-YYYY); defaults to the nearest expiry
        #[arg(long)]
        expiry: Option<String>,

        /// Output CSV path (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}
