use clap::Parser;

use option_chain_sync::{expiries, logging, offline, run};

mod cli;

impl From<cli::SourceArgs> for run::SourceOptions {
    fn from(args: cli::SourceArgs) -> Self {
        run::SourceOptions {
            source: args.source,
            kind: args.kind,
            input: args.input,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let _log_guard = logging::init(cli.log_file.as_deref())?;

    match cli.command {
        cli::Command::Sync {
            source,
            sink,
            output_dir,
            tables,
            interval_secs,
            market_open,
            market_close,
            ignore_market_hours,
            once,
        } => run::run(&run::SyncOptions {
            symbol: source.symbol.clone(),
            source: source.into(),
            sink,
            output_dir,
            tables,
            interval_secs,
            market_open,
            market_close,
            ignore_market_hours,
            once,
        }),
        cli::Command::Expiries { source } => {
            let symbol = source.symbol.clone();
            expiries::run(&symbol, &source.into())
        }
        cli::Command::Normalize {
            file,
            expiry,
            output,
        } => offline::run(&file, expiry.as_deref(), output.as_deref()),
    }
}
