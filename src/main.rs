//! Crash Radar server
//!
//! Loads settings, the bar history and the oracle client, then serves the
//! HTTP API until interrupted.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crash_radar::agent::provider_from_settings;
use crash_radar::oracle::{FtsoV2Client, PriceSource};
use crash_radar::server::{run_server, AppState};
use crash_radar::utils::init_tracing;
use crash_radar::{RiskDesk, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::from_env()?;
    let _log_guard = init_tracing(settings.log_dir.as_deref());
    info!(settings = ?settings, "starting crash radar");

    let desk = match RiskDesk::load(
        &settings.risk_params_path,
        &settings.bars_path,
        settings.synthetic_fallback,
    ) {
        Ok(desk) => Some(Arc::new(desk)),
        Err(e) => {
            warn!(error = %e, "risk engine unavailable; chat will answer without it");
            None
        }
    };

    let price_source: Option<Arc<dyn PriceSource>> = match FtsoV2Client::new(&settings.web3_provider_url) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = %e, "FTSOv2 client unavailable; prices fall back to last close");
            None
        }
    };

    let provider = provider_from_settings(&settings);
    let state = AppState::new(settings, provider, desk, price_source);
    run_server(state).await
}
