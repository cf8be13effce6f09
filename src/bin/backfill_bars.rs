//! Download 15-minute klines from Binance into the bar CSV.
//!
//! ```
//! cargo run --bin backfill_bars -- --max-batches 25
//! cargo run --bin backfill_bars -- --update
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use crash_radar::market::{load_bars, save_bars, BinanceClient};
use crash_radar::utils::init_tracing;

#[derive(Parser, Debug)]
#[command(author, version, about = "Backfill BTC bars from Binance")]
struct Args {
    #[arg(long, default_value = "BTCUSDT")]
    symbol: String,

    #[arg(long, default_value = "15m")]
    interval: String,

    /// Stop after this many pages of 1000 bars
    #[arg(long)]
    max_batches: Option<usize>,

    /// Append only bars newer than the existing file
    #[arg(long)]
    update: bool,

    #[arg(short, long, env = "BARS_PATH", default_value = "data/btc_15m_data.csv")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    let _log_guard = init_tracing(None);

    let client = BinanceClient::new();
    let bars = if args.update && args.output.exists() {
        let existing = load_bars(&args.output)
            .with_context(|| format!("reading {}", args.output.display()))?;
        let before = existing.len();
        let bars = client.update_latest(existing, &args.symbol, &args.interval).await?;
        info!(added = bars.len().saturating_sub(before), "update complete");
        bars
    } else {
        client
            .backfill_history(&args.symbol, &args.interval, args.max_batches)
            .await?
    };

    save_bars(&args.output, &bars)?;
    info!(bars = bars.len(), path = %args.output.display(), "bars saved");
    Ok(())
}
