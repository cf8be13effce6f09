//! Evaluate the bar history and write the latest snapshot.
//!
//! Strict: a missing or short bar file is an error, never synthetic data.
//!
//! ```
//! cargo run --bin build_snapshot -- --output shared/latest_update.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crash_radar::oracle::{FtsoV2Client, PriceSource};
use crash_radar::snapshot;
use crash_radar::utils::init_tracing;
use crash_radar::{RiskAppetite, RiskDesk, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Build the BTC/USD risk snapshot")]
struct Args {
    /// Bar CSV (defaults to BARS_PATH)
    #[arg(long)]
    bars: Option<PathBuf>,

    /// Engine parameter YAML (defaults to RISK_PARAMS_PATH)
    #[arg(long)]
    params: Option<PathBuf>,

    /// Snapshot destination (defaults to LATEST_UPDATE_PATH)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Risk appetite: low, medium or high
    #[arg(long, default_value = "medium")]
    appetite: RiskAppetite,

    #[arg(long, default_value_t = 24)]
    horizon_hours: u32,

    /// Skip the FTSOv2 price and report the last close
    #[arg(long)]
    no_oracle: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_env()?;
    let _log_guard = init_tracing(settings.log_dir.as_deref());

    let bars = args.bars.unwrap_or_else(|| PathBuf::from(&settings.bars_path));
    let params = args.params.unwrap_or_else(|| PathBuf::from(&settings.risk_params_path));
    let output = args.output.unwrap_or_else(|| PathBuf::from(&settings.latest_update_path));

    let desk = RiskDesk::load(&params, &bars, false)
        .map(Arc::new)
        .with_context(|| format!("cannot build snapshot from {}", bars.display()))?;

    let oracle = if args.no_oracle {
        None
    } else {
        Some(FtsoV2Client::new(&settings.web3_provider_url)?)
    };
    let source = oracle.as_ref().map(|c| c as &dyn PriceSource);

    let snap = desk.build_snapshot(source, args.appetite, args.horizon_hours).await?;
    snapshot::write_atomic(&output, &snap)?;

    info!(
        path = %output.display(),
        price = snap.price,
        price_source = %snap.price_source,
        "snapshot ready"
    );
    println!("{}", serde_json::to_string_pretty(&snap)?);
    Ok(())
}
