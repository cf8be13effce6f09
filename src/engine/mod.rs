//! Risk Engine
//!
//! Turns a bar series into a `RiskAssessment`. Everything here is pure
//! arithmetic on the input bars; only `analysis_timestamp` depends on the
//! clock.

pub mod exposure;
pub mod params;
pub mod profile;

pub use exposure::recommend_exposure;
pub use params::EngineParams;
pub use profile::{RiskAppetite, RiskProfile};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{Result, RiskError};
use crate::market::Bar;
use crate::models::{CrashProbabilityModel, EvtModel, Regime, RegimeModel, RegimeProbs};
use crate::signals::rolling::last_finite;
use crate::signals::SignalSet;

/// Bars per trading day at 15-minute resolution
pub const BARS_PER_DAY: f64 = 96.0;
/// Bars per hour at 15-minute resolution
pub const BARS_PER_HOUR: f64 = 4.0;

/// Everything the engine knows about current risk
#[derive(Debug, Clone, Serialize)]
pub struct RiskAssessment {
    pub crash_prob: f64,
    pub regime: Regime,
    pub regime_probs: RegimeProbs,
    pub lcvi: f64,
    pub vol_regime: f64,
    pub realized_vol: f64,
    pub var_1d: f64,
    pub es_1d: f64,
    pub var_horizon: f64,
    pub es_horizon: f64,
    pub tail_shape: f64,
    pub recommended_exposure: f64,
    pub exposure_rationale: String,
    pub current_price: f64,
    pub last_close: f64,
    pub horizon_hours: u32,
    pub profile: RiskAppetite,
    pub analysis_timestamp: String,
}

#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    params: EngineParams,
}

impl RiskEngine {
    pub fn new(params: EngineParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    pub fn min_bars(&self) -> usize {
        self.params.min_bars()
    }

    /// Evaluate the most recent `lookback_bars` bars.
    ///
    /// `live_price` replaces the last close as `current_price` when given.
    pub fn evaluate(
        &self,
        bars: &[Bar],
        profile: &RiskProfile,
        horizon_hours: u32,
        live_price: Option<f64>,
    ) -> Result<RiskAssessment> {
        let needed = self.min_bars();
        if bars.len() < needed {
            return Err(RiskError::InsufficientData {
                needed,
                got: bars.len(),
            });
        }
        let last_close = bars[bars.len() - 1].close;
        if !(last_close.is_finite() && last_close > 0.0) {
            return Err(RiskError::Data(format!("invalid last close: {}", last_close)));
        }

        let lookback = self.params.lookback_bars.max(needed);
        let window = &bars[bars.len().saturating_sub(lookback)..];
        let params = &self.params;

        let signals = SignalSet::compute(window, params);

        let regime = RegimeModel::new(&params.regime_hmm, params.annualization_factor)
            .estimate(&signals.returns);

        let mut evt = EvtModel::new(&params.evt);
        evt.fit(&signals.returns);
        let tail_shape = evt.tail_index();
        let evt_tail = vec![tail_shape; window.len()];

        let crash_signals: BTreeMap<&str, &[f64]> = BTreeMap::from([
            ("vol_regime", signals.volatility.vol_regime.as_slice()),
            ("lcvi", signals.leverage.lcvi.as_slice()),
            ("dd_velocity", signals.leverage.dd_velocity.as_slice()),
            ("funding_stress", signals.leverage.funding_stress.as_slice()),
            ("illiquidity", signals.microstructure.illiquidity_ratio.as_slice()),
            ("regime_prob", regime.crash_prob_series.as_slice()),
            ("evt_tail", evt_tail.as_slice()),
        ]);
        let crash = CrashProbabilityModel::new(&params.crash_probability)
            .compute(&crash_signals, &profile.weights);

        let lcvi = last_finite(&signals.leverage.lcvi).unwrap_or(f64::NAN);
        let vol_regime = last_finite(&signals.volatility.vol_regime).unwrap_or(f64::NAN);
        let realized_vol = last_finite(&signals.volatility.realized_vol).unwrap_or(f64::NAN);

        let (recommended_exposure, exposure_rationale) = recommend_exposure(
            crash.probability,
            lcvi,
            regime.regime,
            profile,
            &params.thresholds,
        );

        let var_bar = evt.var_default();
        let es_bar = evt.es_default();
        let day_scale = BARS_PER_DAY.sqrt();
        let horizon_scale = (BARS_PER_HOUR * horizon_hours as f64).sqrt();

        let current_price = live_price
            .filter(|p| p.is_finite() && *p > 0.0)
            .unwrap_or(last_close);

        tracing::info!(
            bars = window.len(),
            crash_prob = crash.probability,
            regime = %regime.regime,
            lcvi,
            exposure = recommended_exposure,
            "risk evaluated"
        );

        Ok(RiskAssessment {
            crash_prob: crash.probability,
            regime: regime.regime,
            regime_probs: regime.probs,
            lcvi,
            vol_regime,
            realized_vol,
            var_1d: var_bar * day_scale,
            es_1d: es_bar * day_scale,
            var_horizon: var_bar * horizon_scale,
            es_horizon: es_bar * horizon_scale,
            tail_shape,
            recommended_exposure,
            exposure_rationale,
            current_price,
            last_close,
            horizon_hours,
            profile: profile.appetite,
            analysis_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::synthetic::random_walk;

    #[test]
    fn test_rejects_short_history() {
        let engine = RiskEngine::default();
        let bars = random_walk(100, 50_000.0, 0.01, 1);
        match engine.evaluate(&bars, &RiskProfile::medium(), 24, None) {
            Err(RiskError::InsufficientData { needed, got }) => {
                assert_eq!(needed, engine.min_bars());
                assert_eq!(got, 100);
            }
            other => panic!("expected InsufficientData, got {:?}", other.map(|a| a.crash_prob)),
        }
    }

    #[test]
    fn test_live_price_overrides_close() {
        let engine = RiskEngine::default();
        let bars = random_walk(1200, 50_000.0, 0.005, 3);
        let a = engine.evaluate(&bars, &RiskProfile::medium(), 24, Some(61_000.0)).unwrap();
        assert_eq!(a.current_price, 61_000.0);
        assert_eq!(a.last_close, bars.last().unwrap().close);

        let b = engine.evaluate(&bars, &RiskProfile::medium(), 24, Some(f64::NAN)).unwrap();
        assert_eq!(b.current_price, b.last_close);
    }

    #[test]
    fn test_horizon_scaling() {
        let engine = RiskEngine::default();
        let bars = random_walk(1200, 50_000.0, 0.005, 5);
        let a = engine.evaluate(&bars, &RiskProfile::low(), 24, None).unwrap();
        // 24h horizon is exactly one day of bars
        assert!((a.var_horizon - a.var_1d).abs() < 1e-12);
        let b = engine.evaluate(&bars, &RiskProfile::low(), 6, None).unwrap();
        assert!((b.var_horizon * 2.0 - b.var_1d).abs() < 1e-12);
        assert!(a.es_1d >= a.var_1d);
    }
}
