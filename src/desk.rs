//! Risk desk: the loaded bar history paired with an engine.
//!
//! Shared by the chat router, the `/v1/risk` route and snapshot refreshes so
//! every consumer evaluates the same history with the same parameters.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::{EngineParams, RiskAppetite, RiskAssessment, RiskEngine, RiskProfile};
use crate::error::{Result, RiskError};
use crate::market::{load_or_synthetic, Bar, BarSource};
use crate::oracle::PriceSource;
use crate::snapshot::{self, Snapshot};

pub struct RiskDesk {
    engine: RiskEngine,
    bars: Vec<Bar>,
    source: BarSource,
}

impl RiskDesk {
    pub fn new(engine: RiskEngine, bars: Vec<Bar>, source: BarSource) -> Self {
        Self { engine, bars, source }
    }

    /// Load parameters and bars from disk.
    pub fn load(params_path: impl AsRef<Path>, bars_path: impl AsRef<Path>, synthetic_fallback: bool) -> Result<Self> {
        let params = EngineParams::load_or_default(params_path)?;
        let (bars, source) = load_or_synthetic(bars_path, synthetic_fallback)?;
        if bars.len() < params.min_bars() {
            return Err(RiskError::InsufficientData {
                needed: params.min_bars(),
                got: bars.len(),
            });
        }
        if source == BarSource::Synthetic {
            warn!("risk desk is running on synthetic bars");
        }
        info!(bars = bars.len(), source = %source.label(), "risk desk loaded");
        Ok(Self::new(RiskEngine::new(params), bars, source))
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn source(&self) -> &BarSource {
        &self.source
    }

    pub fn engine(&self) -> &RiskEngine {
        &self.engine
    }

    pub fn evaluate(&self, appetite: RiskAppetite, horizon_hours: u32, live_price: Option<f64>) -> Result<RiskAssessment> {
        let profile = RiskProfile::for_appetite(appetite);
        self.engine.evaluate(&self.bars, &profile, horizon_hours, live_price)
    }

    /// Evaluate on the blocking pool; HMM fitting is CPU bound.
    pub async fn evaluate_blocking(
        self: Arc<Self>,
        appetite: RiskAppetite,
        horizon_hours: u32,
        live_price: Option<f64>,
    ) -> Result<RiskAssessment> {
        tokio::task::spawn_blocking(move || self.evaluate(appetite, horizon_hours, live_price))
            .await
            .map_err(|e| RiskError::Model(format!("evaluation task failed: {}", e)))?
    }

    /// Snapshot with the oracle price; evaluation runs on the blocking pool.
    pub async fn build_snapshot(
        self: Arc<Self>,
        price_source: Option<&dyn PriceSource>,
        appetite: RiskAppetite,
        horizon_hours: u32,
    ) -> Result<Snapshot> {
        snapshot::build(self, price_source, appetite, horizon_hours).await
    }
}

/// Live price from `source`, or `None` with a warning.
pub async fn live_price(source: Option<&dyn PriceSource>) -> Option<f64> {
    let source = source?;
    match source.latest_price().await {
        Ok(p) if p.is_usable() => Some(p.price),
        Ok(p) => {
            warn!(source = source.name(), price = p.price, "ignoring unusable oracle price");
            None
        }
        Err(e) => {
            warn!(source = source.name(), error = %e, "live price unavailable");
            None
        }
    }
}
