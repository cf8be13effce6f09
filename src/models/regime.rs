//! Market regime detection.
//!
//! Wraps the Gaussian HMM and maps its variance-ordered states onto
//! Calm / Volatile / Crash. When the HMM cannot be fitted, a rolling
//! volatility rule takes over.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::hmm::GaussianHmm;
use crate::engine::params::RegimeParams;
use crate::signals::rolling::rolling_std;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Regime {
    Calm,
    Volatile,
    Crash,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Regime::Calm => "Calm",
            Regime::Volatile => "Volatile",
            Regime::Crash => "Crash",
        };
        write!(f, "{}", name)
    }
}

/// Posterior probability of each regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeProbs {
    #[serde(rename = "Calm")]
    pub calm: f64,
    #[serde(rename = "Volatile")]
    pub volatile: f64,
    #[serde(rename = "Crash")]
    pub crash: f64,
}

impl RegimeProbs {
    pub fn one_hot(regime: Regime) -> Self {
        Self {
            calm: if regime == Regime::Calm { 1.0 } else { 0.0 },
            volatile: if regime == Regime::Volatile { 1.0 } else { 0.0 },
            crash: if regime == Regime::Crash { 1.0 } else { 0.0 },
        }
    }

    /// Collapse an arbitrary number of variance-ordered states: the first is
    /// Calm, the last is Crash, everything in between is Volatile.
    pub fn from_states(state_probs: &[f64]) -> Self {
        match state_probs.len() {
            0 => Self::one_hot(Regime::Calm),
            1 => Self {
                calm: state_probs[0],
                volatile: 0.0,
                crash: 0.0,
            },
            n => Self {
                calm: state_probs[0],
                volatile: state_probs[1..n - 1].iter().sum(),
                crash: state_probs[n - 1],
            },
        }
    }

    pub fn most_likely(&self) -> Regime {
        if self.crash > self.volatile && self.crash > self.calm {
            Regime::Crash
        } else if self.volatile > self.calm {
            Regime::Volatile
        } else {
            Regime::Calm
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegimeMethod {
    Hmm,
    VolatilityRule,
}

/// Regime estimate for a return series
#[derive(Debug, Clone)]
pub struct RegimeEstimate {
    pub regime: Regime,
    pub probs: RegimeProbs,
    /// Crash-state probability aligned with the input returns, NaN where undefined
    pub crash_prob_series: Vec<f64>,
    pub method: RegimeMethod,
}

pub struct RegimeModel<'a> {
    params: &'a RegimeParams,
    ann_sqrt: f64,
}

impl<'a> RegimeModel<'a> {
    pub fn new(params: &'a RegimeParams, annualization_factor: f64) -> Self {
        Self {
            params,
            ann_sqrt: annualization_factor.sqrt(),
        }
    }

    pub fn estimate(&self, returns: &[f64]) -> RegimeEstimate {
        match self.estimate_hmm(returns) {
            Some(estimate) => estimate,
            None => self.estimate_fallback(returns),
        }
    }

    fn estimate_hmm(&self, returns: &[f64]) -> Option<RegimeEstimate> {
        let index: Vec<usize> = (0..returns.len()).filter(|&i| returns[i].is_finite()).collect();
        let obs: Vec<f64> = index.iter().map(|&i| returns[i]).collect();

        let mut hmm = GaussianHmm::new(self.params.n_components);
        if let Err(e) = hmm.fit(&obs, self.params.n_iter, self.params.tol) {
            tracing::warn!(error = %e, "HMM fit failed, using volatility rule");
            return None;
        }
        let gamma = match hmm.predict_proba(&obs) {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(error = %e, "HMM posterior failed, using volatility rule");
                return None;
            }
        };
        let path = hmm.predict(&obs).ok()?;

        let last = obs.len() - 1;
        let last_row: Vec<f64> = gamma.row(last).to_vec();
        if last_row.iter().any(|p| !p.is_finite()) {
            tracing::warn!("HMM posterior is not finite, using volatility rule");
            return None;
        }
        let probs = RegimeProbs::from_states(&last_row);
        let regime = state_to_regime(path[last], hmm.n_states);

        let crash_state = hmm.n_states - 1;
        let mut crash_prob_series = vec![f64::NAN; returns.len()];
        for (k, &i) in index.iter().enumerate() {
            crash_prob_series[i] = gamma[[k, crash_state]];
        }

        tracing::debug!(
            iterations = hmm.iterations,
            log_likelihood = hmm.log_likelihood,
            regime = %regime,
            "regime model fitted"
        );

        Some(RegimeEstimate {
            regime,
            probs,
            crash_prob_series,
            method: RegimeMethod::Hmm,
        })
    }

    /// Annualized rolling volatility thresholds with one-hot probabilities.
    pub fn estimate_fallback(&self, returns: &[f64]) -> RegimeEstimate {
        let vol: Vec<f64> = rolling_std(returns, self.params.fallback_window)
            .into_iter()
            .map(|s| s * self.ann_sqrt)
            .collect();

        let classify = |v: f64| {
            if v > self.params.fallback_vol_crash {
                Regime::Crash
            } else if v > self.params.fallback_vol_volatile {
                Regime::Volatile
            } else {
                Regime::Calm
            }
        };

        let crash_prob_series = vol
            .iter()
            .map(|&v| if classify(v) == Regime::Crash { 1.0 } else { 0.0 })
            .collect();
        let regime = classify(vol.last().copied().unwrap_or(f64::NAN));

        RegimeEstimate {
            regime,
            probs: RegimeProbs::one_hot(regime),
            crash_prob_series,
            method: RegimeMethod::VolatilityRule,
        }
    }
}

fn state_to_regime(state: usize, n_states: usize) -> Regime {
    if state == 0 {
        Regime::Calm
    } else if state + 1 == n_states {
        Regime::Crash
    } else {
        Regime::Volatile
    }
}
