//! Crash probability ensemble.
//!
//! Each signal is reduced to the percentile rank of its latest value within
//! its own history, the ranks are averaged with profile weights, and a
//! logistic curve maps the score to a probability.

use std::collections::BTreeMap;

use crate::engine::params::CrashProbabilityParams;
use crate::signals::rolling::{last_finite, pct_rank_of_last};

pub struct CrashProbabilityModel<'a> {
    params: &'a CrashProbabilityParams,
}

/// Score and probability with the per-signal ranks that produced them
#[derive(Debug, Clone)]
pub struct CrashScore {
    pub probability: f64,
    pub score: f64,
    pub ranks: BTreeMap<String, f64>,
}

impl<'a> CrashProbabilityModel<'a> {
    pub fn new(params: &'a CrashProbabilityParams) -> Self {
        Self { params }
    }

    pub fn sigmoid(&self, score: f64) -> f64 {
        1.0 / (1.0 + (-self.params.steepness * (score - self.params.midpoint)).exp())
    }

    /// Signals without a weight, or whose latest value is undefined, are
    /// skipped and the remaining weights renormalized.
    pub fn compute(
        &self,
        signals: &BTreeMap<&str, &[f64]>,
        weights: &BTreeMap<&str, f64>,
    ) -> CrashScore {
        let mut ranks = BTreeMap::new();
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for (name, series) in signals {
            let Some(&weight) = weights.get(name) else {
                continue;
            };
            if last_finite(series).is_none() {
                continue;
            }
            if let Some(rank) = pct_rank_of_last(series) {
                weighted += weight * rank;
                total_weight += weight;
                ranks.insert(name.to_string(), rank);
            }
        }

        let score = if total_weight > 0.0 {
            weighted / total_weight
        } else {
            tracing::warn!("no crash signals available, using neutral score");
            self.params.midpoint
        };

        CrashScore {
            probability: self.sigmoid(score),
            score,
            ranks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_midpoint() {
        let params = CrashProbabilityParams::default();
        let model = CrashProbabilityModel::new(&params);
        assert!((model.sigmoid(0.5) - 0.5).abs() < 1e-12);
        assert!(model.sigmoid(1.0) > 0.9);
        assert!(model.sigmoid(0.0) < 0.1);
    }

    #[test]
    fn test_extreme_latest_values_push_probability_up() {
        let params = CrashProbabilityParams::default();
        let model = CrashProbabilityModel::new(&params);
        let lcvi: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let vol: Vec<f64> = (0..100).map(|i| (i as f64).sqrt()).collect();
        let signals = BTreeMap::from([("lcvi", lcvi.as_slice()), ("vol_regime", vol.as_slice())]);
        let weights = BTreeMap::from([("lcvi", 0.2), ("vol_regime", 0.15)]);
        let score = model.compute(&signals, &weights);
        assert!((score.score - 1.0).abs() < 1e-12);
        assert!(score.probability > 0.9);
        assert_eq!(score.ranks.len(), 2);
    }

    #[test]
    fn test_undefined_signals_are_skipped() {
        let params = CrashProbabilityParams::default();
        let model = CrashProbabilityModel::new(&params);
        let low: Vec<f64> = (0..10).map(|i| 10.0 - i as f64).collect();
        let broken = vec![1.0, 2.0, f64::NAN];
        let signals = BTreeMap::from([("lcvi", low.as_slice()), ("illiquidity", broken.as_slice())]);
        let weights = BTreeMap::from([("lcvi", 0.2), ("illiquidity", 0.1), ("unused", 0.5)]);
        let score = model.compute(&signals, &weights);
        assert!((score.score - 0.1).abs() < 1e-12);
        assert!(!score.ranks.contains_key("illiquidity"));
    }
}
