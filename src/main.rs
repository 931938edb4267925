//! stockdash - Stock quotes and daily price history from the command line
//!
//! Fetches quotes (single symbols or the default watchlist, staggered to stay
//! under the provider's rate limit) and daily close history, printing either
//! an aligned table or JSON.

use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use stockdash::batch::{default_watchlist, fetch_batch_report, WatchItem};
use stockdash::cli::{Cli, Command};
use stockdash::render::{format_batch_report, format_series};
use stockdash::{Config, MarketDataClient};

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .parse_default_env()
        .init();
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(cli.overrides())?;
    let client = MarketDataClient::new(&config)?;

    match cli.command {
        Command::Quote { symbols } => {
            let items: Vec<WatchItem> = symbols.into_iter().map(WatchItem::from_symbol).collect();
            print_batch(&client, &items, &config, cli.json).await?;
        }
        Command::Watchlist => {
            print_batch(&client, &default_watchlist(), &config, cli.json).await?;
        }
        Command::Series { symbol, width } => {
            let points = client.get_daily_series(&symbol).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&points)?);
            } else {
                println!("{}", format_series(&symbol, &points, width));
            }
        }
    }

    Ok(())
}

async fn print_batch(
    client: &MarketDataClient,
    items: &[WatchItem],
    config: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = fetch_batch_report(client, items, config.stagger).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report.quotes())?);
    } else {
        println!("{}", format_batch_report(&report));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logger();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
