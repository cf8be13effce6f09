//! Engine parameters, loaded from `config/parameters.yaml`.
//!
//! Every field has a default so a partial YAML file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineParams {
    /// Bars per year (15m bars: 365 * 24 * 4)
    pub annualization_factor: f64,
    /// Only the most recent `lookback_bars` bars are evaluated
    pub lookback_bars: usize,
    pub volatility: VolatilityParams,
    pub leverage: LeverageParams,
    pub microstructure: MicrostructureParams,
    pub regime_hmm: RegimeParams,
    pub evt: EvtParams,
    pub crash_probability: CrashProbabilityParams,
    pub thresholds: Thresholds,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            annualization_factor: 35_040.0,
            lookback_bars: 20_000,
            volatility: VolatilityParams::default(),
            leverage: LeverageParams::default(),
            microstructure: MicrostructureParams::default(),
            regime_hmm: RegimeParams::default(),
            evt: EvtParams::default(),
            crash_probability: CrashProbabilityParams::default(),
            thresholds: Thresholds::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VolatilityParams {
    pub rv_window: usize,
    pub vol_regime_short: usize,
    pub vol_regime_long: usize,
    pub vov_window: usize,
    pub vov_lookback: usize,
}

impl Default for VolatilityParams {
    fn default() -> Self {
        Self {
            rv_window: 20,
            vol_regime_short: 24,
            vol_regime_long: 672,
            vov_window: 24,
            vov_lookback: 96,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LeverageParams {
    pub funding_fast_window: usize,
    pub funding_slow_window: usize,
    pub funding_stress_window: usize,
    /// Drawdown lookback
    pub lcvi_window: usize,
    pub lcvi_vol_window: usize,
    pub lcvi_vol_ref_window: usize,
}

impl Default for LeverageParams {
    fn default() -> Self {
        Self {
            funding_fast_window: 32,
            funding_slow_window: 288,
            funding_stress_window: 120,
            lcvi_window: 96,
            lcvi_vol_window: 96,
            lcvi_vol_ref_window: 672,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MicrostructureParams {
    pub illiquidity_window: usize,
    pub illiquidity_ref_window: usize,
    pub tail_risk_window: usize,
}

impl Default for MicrostructureParams {
    fn default() -> Self {
        Self {
            illiquidity_window: 96,
            illiquidity_ref_window: 672,
            tail_risk_window: 96,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegimeParams {
    pub n_components: usize,
    pub n_iter: usize,
    pub tol: f64,
    pub fallback_window: usize,
    pub fallback_vol_volatile: f64,
    pub fallback_vol_crash: f64,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            n_components: 3,
            n_iter: 100,
            tol: 1e-4,
            fallback_window: 96,
            fallback_vol_volatile: 0.5,
            fallback_vol_crash: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EvtParams {
    pub threshold_percentile: f64,
    pub var_confidence: f64,
    pub es_confidence: f64,
    pub min_exceedances: usize,
}

impl Default for EvtParams {
    fn default() -> Self {
        Self {
            threshold_percentile: 95.0,
            var_confidence: 0.99,
            es_confidence: 0.99,
            min_exceedances: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrashProbabilityParams {
    pub steepness: f64,
    pub midpoint: f64,
}

impl Default for CrashProbabilityParams {
    fn default() -> Self {
        Self {
            steepness: 5.0,
            midpoint: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    pub lcvi_warning: f64,
    pub lcvi_critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            lcvi_warning: 2.0,
            lcvi_critical: 3.0,
        }
    }
}

impl EngineParams {
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Load from `path` when it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::warn!(path = %path.display(), "parameter file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Smallest number of bars for which every signal is defined on the last bar.
    pub fn min_bars(&self) -> usize {
        let v = &self.volatility;
        let l = &self.leverage;
        let m = &self.microstructure;
        let warmups = [
            v.rv_window,
            v.vol_regime_short,
            v.vov_window + v.vov_lookback,
            l.lcvi_vol_window + l.lcvi_vol_ref_window,
            l.funding_stress_window,
            m.illiquidity_window + m.illiquidity_ref_window,
            m.tail_risk_window,
        ];
        warmups.into_iter().max().unwrap_or(0) + 1
    }
}
