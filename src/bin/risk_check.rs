//! One-off risk assessment printed as JSON.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use crash_radar::desk::live_price;
use crash_radar::oracle::{FtsoV2Client, PriceSource};
use crash_radar::utils::init_tracing;
use crash_radar::{RiskAppetite, RiskDesk, Settings};

#[derive(Parser, Debug)]
#[command(author, version, about = "Print a BTC/USD risk assessment")]
struct Args {
    #[arg(long)]
    bars: Option<PathBuf>,

    #[arg(long)]
    params: Option<PathBuf>,

    #[arg(long, default_value = "medium")]
    appetite: RiskAppetite,

    #[arg(long, default_value_t = 24)]
    horizon_hours: u32,

    /// Query FTSOv2 for the current price
    #[arg(long)]
    live: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_env()?;
    let _log_guard = init_tracing(settings.log_dir.as_deref());

    let bars = args.bars.unwrap_or_else(|| PathBuf::from(&settings.bars_path));
    let params = args.params.unwrap_or_else(|| PathBuf::from(&settings.risk_params_path));
    let desk = RiskDesk::load(&params, &bars, settings.synthetic_fallback)?;

    let client = if args.live {
        Some(FtsoV2Client::new(&settings.web3_provider_url)?)
    } else {
        None
    };
    let live = live_price(client.as_ref().map(|c| c as &dyn PriceSource)).await;

    let assessment = desk.evaluate(args.appetite, args.horizon_hours, live)?;
    println!("{}", serde_json::to_string_pretty(&assessment)?);
    Ok(())
}
