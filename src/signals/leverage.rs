//! Leverage and liquidation stress signals.
//!
//! There is no funding feed for spot BTC, so funding pressure is proxied by
//! the spread between a fast and a slow EWM of the close, annualized over
//! 8-hour funding periods.

use super::rolling::{ewm_mean, ratio, rolling_max_partial, rolling_median, rolling_std};
use crate::engine::params::LeverageParams;

/// Funding periods per year (8h funding)
const FUNDING_PERIODS_PER_YEAR: f64 = 365.0 * 24.0 / 8.0;

#[derive(Debug, Clone)]
pub struct LeverageSignals {
    pub funding_proxy: Vec<f64>,
    pub funding_stress: Vec<f64>,
    /// Non-positive drawdown from the rolling peak
    pub drawdown: Vec<f64>,
    pub dd_velocity: Vec<f64>,
    /// Liquidation Cascade Vulnerability Index
    pub lcvi: Vec<f64>,
}

pub struct LeverageCalculator<'a> {
    params: &'a LeverageParams,
    ann_sqrt: f64,
}

impl<'a> LeverageCalculator<'a> {
    pub fn new(params: &'a LeverageParams, annualization_factor: f64) -> Self {
        Self {
            params,
            ann_sqrt: annualization_factor.sqrt(),
        }
    }

    pub fn synthetic_funding_rate(&self, prices: &[f64]) -> Vec<f64> {
        let fast = ewm_mean(prices, self.params.funding_fast_window);
        let slow = ewm_mean(prices, self.params.funding_slow_window);
        ratio(&fast, &slow)
            .into_iter()
            .map(|r| (r - 1.0) * FUNDING_PERIODS_PER_YEAR)
            .collect()
    }

    /// |funding| relative to its rolling median; undefined when the median is zero.
    pub fn funding_stress(&self, funding_proxy: &[f64]) -> Vec<f64> {
        let abs: Vec<f64> = funding_proxy.iter().map(|f| f.abs()).collect();
        let median_abs = rolling_median(&abs, self.params.funding_stress_window);
        ratio(&abs, &median_abs)
    }

    pub fn drawdown(&self, prices: &[f64]) -> Vec<f64> {
        let peak = rolling_max_partial(prices, self.params.lcvi_window);
        prices
            .iter()
            .zip(&peak)
            .map(|(p, m)| (p - m) / m)
            .collect()
    }

    /// Relative change of the drawdown, the "panic" speed. Undefined steps are 0.
    pub fn drawdown_velocity(&self, prices: &[f64]) -> Vec<f64> {
        let dd = self.drawdown(prices);
        let mut out = vec![0.0; dd.len()];
        for t in 1..dd.len() {
            let v = (dd[t] - dd[t - 1]).abs() / dd[t - 1].abs();
            out[t] = if v.is_finite() { v } else { 0.0 };
        }
        out
    }

    /// `LCVI = (sigma / sigma_ref) * (1 + funding_stress) * (1 + dd_velocity)`
    pub fn lcvi(&self, returns: &[f64], funding_stress: &[f64], dd_velocity: &[f64]) -> Vec<f64> {
        let vol: Vec<f64> = rolling_std(returns, self.params.lcvi_vol_window)
            .into_iter()
            .map(|s| s * self.ann_sqrt)
            .collect();
        let vol_ref = rolling_median(&vol, self.params.lcvi_vol_ref_window);
        let vol_ratio = ratio(&vol, &vol_ref);
        vol_ratio
            .iter()
            .zip(funding_stress)
            .zip(dd_velocity)
            .map(|((v, f), d)| v * (1.0 + f) * (1.0 + d))
            .collect()
    }

    pub fn compute_all(&self, prices: &[f64], returns: &[f64]) -> LeverageSignals {
        let funding_proxy = self.synthetic_funding_rate(prices);
        let funding_stress = self.funding_stress(&funding_proxy);
        let drawdown = self.drawdown(prices);
        let dd_velocity = self.drawdown_velocity(prices);
        let lcvi = self.lcvi(returns, &funding_stress, &dd_velocity);
        LeverageSignals {
            funding_proxy,
            funding_stress,
            drawdown,
            dd_velocity,
            lcvi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drawdown_from_rolling_peak() {
        let params = LeverageParams {
            lcvi_window: 3,
            ..LeverageParams::default()
        };
        let calc = LeverageCalculator::new(&params, 35_040.0);
        let dd = calc.drawdown(&[100.0, 90.0, 95.0, 80.0, 85.0]);
        assert_eq!(dd[0], 0.0);
        assert!((dd[1] + 0.1).abs() < 1e-12);
        assert!((dd[3] + 0.2).abs() < 1e-12);
        // peak over [95, 80, 85] is 95
        assert!((dd[4] - (85.0 - 95.0) / 95.0).abs() < 1e-12);
    }

    #[test]
    fn test_drawdown_velocity_zero_when_undefined() {
        let params = LeverageParams::default();
        let calc = LeverageCalculator::new(&params, 35_040.0);
        let v = calc.drawdown_velocity(&[100.0, 100.0, 90.0, 80.0]);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[1], 0.0);
        // 0 -> -0.1 divides by zero
        assert_eq!(v[2], 0.0);
        assert!((v[3] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_funding_proxy_positive_in_uptrend() {
        let params = LeverageParams {
            funding_fast_window: 5,
            funding_slow_window: 20,
            ..LeverageParams::default()
        };
        let calc = LeverageCalculator::new(&params, 35_040.0);
        let prices: Vec<f64> = (0..100).map(|i| 100.0 + i as f64).collect();
        let fp = calc.synthetic_funding_rate(&prices);
        assert_eq!(fp[0], 0.0);
        assert!(*fp.last().unwrap() > 0.0);
    }
}
