//! Market microstructure signals

use super::rolling::{ratio, rolling_kurt, rolling_mean, rolling_median, rolling_skew};
use crate::engine::params::MicrostructureParams;

#[derive(Debug, Clone)]
pub struct MicrostructureSignals {
    /// Amihud price impact per unit volume
    pub illiquidity: Vec<f64>,
    pub illiquidity_ratio: Vec<f64>,
    /// Positive values flag left-tail (crash) asymmetry
    pub tail_risk_asym: Vec<f64>,
}

pub struct MicrostructureCalculator<'a> {
    params: &'a MicrostructureParams,
}

impl<'a> MicrostructureCalculator<'a> {
    pub fn new(params: &'a MicrostructureParams) -> Self {
        Self { params }
    }

    pub fn amihud_illiquidity(&self, returns: &[f64], volume: &[f64]) -> Vec<f64> {
        let abs_returns: Vec<f64> = returns.iter().map(|r| r.abs()).collect();
        let impact = ratio(&abs_returns, volume);
        rolling_mean(&impact, self.params.illiquidity_window)
    }

    pub fn illiquidity_ratio(&self, illiquidity: &[f64]) -> Vec<f64> {
        let reference = rolling_median(illiquidity, self.params.illiquidity_ref_window);
        ratio(illiquidity, &reference)
    }

    /// `-skew * sqrt(max(kurt - 3, 0))` over the tail-risk window.
    pub fn tail_risk_asymmetry(&self, returns: &[f64]) -> Vec<f64> {
        let w = self.params.tail_risk_window;
        let skew = rolling_skew(returns, w);
        let kurt = rolling_kurt(returns, w);
        skew.iter()
            .zip(&kurt)
            .map(|(s, k)| -s * (k - 3.0).max(0.0).sqrt())
            .collect()
    }

    pub fn compute_all(&self, returns: &[f64], volume: &[f64]) -> MicrostructureSignals {
        let illiquidity = self.amihud_illiquidity(returns, volume);
        let illiquidity_ratio = self.illiquidity_ratio(&illiquidity);
        MicrostructureSignals {
            illiquidity,
            illiquidity_ratio,
            tail_risk_asym: self.tail_risk_asymmetry(returns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_volume_is_undefined() {
        let params = MicrostructureParams {
            illiquidity_window: 2,
            ..MicrostructureParams::default()
        };
        let calc = MicrostructureCalculator::new(&params);
        let returns = [f64::NAN, 0.01, 0.02, 0.01];
        let volume = [1.0, 1.0, 0.0, 2.0];
        let illiq = calc.amihud_illiquidity(&returns, &volume);
        assert!(illiq[2].is_nan());
        assert!(illiq[3].is_nan());
    }

    #[test]
    fn test_crash_tail_is_positive() {
        let params = MicrostructureParams {
            tail_risk_window: 50,
            ..MicrostructureParams::default()
        };
        let calc = MicrostructureCalculator::new(&params);
        let mut returns: Vec<f64> = (0..50).map(|i| if i % 2 == 0 { 0.001 } else { -0.001 }).collect();
        returns[49] = -0.2;
        let tra = calc.tail_risk_asymmetry(&returns);
        assert!(*tra.last().unwrap() > 0.0);
    }
}
