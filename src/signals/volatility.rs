//! Volatility signals

use super::rolling::{ewm_mean, ratio, rolling_mean, rolling_std};
use crate::engine::params::VolatilityParams;

/// Index-aligned volatility signal columns
#[derive(Debug, Clone)]
pub struct VolatilitySignals {
    pub realized_vol: Vec<f64>,
    /// Short-term vol over its own long EWM; > 1.5 marks a fragile market
    pub vol_regime: Vec<f64>,
    pub vol_of_vol: Vec<f64>,
}

pub struct VolatilityCalculator<'a> {
    params: &'a VolatilityParams,
    ann_sqrt: f64,
}

impl<'a> VolatilityCalculator<'a> {
    pub fn new(params: &'a VolatilityParams, annualization_factor: f64) -> Self {
        Self {
            params,
            ann_sqrt: annualization_factor.sqrt(),
        }
    }

    /// Annualized rolling standard deviation of log returns.
    pub fn realized_volatility(&self, returns: &[f64], window: usize) -> Vec<f64> {
        rolling_std(returns, window)
            .into_iter()
            .map(|s| s * self.ann_sqrt)
            .collect()
    }

    pub fn vol_regime(&self, returns: &[f64]) -> Vec<f64> {
        let rv_short = self.realized_volatility(returns, self.params.vol_regime_short);
        let rv_long = ewm_mean(&rv_short, self.params.vol_regime_long);
        ratio(&rv_short, &rv_long)
    }

    /// Coefficient of variation of realized volatility.
    pub fn vol_of_vol(&self, returns: &[f64]) -> Vec<f64> {
        let rv = self.realized_volatility(returns, self.params.vov_window);
        let sd = rolling_std(&rv, self.params.vov_lookback);
        let mean = rolling_mean(&rv, self.params.vov_lookback);
        ratio(&sd, &mean)
    }

    pub fn compute_all(&self, returns: &[f64]) -> VolatilitySignals {
        VolatilitySignals {
            realized_vol: self.realized_volatility(returns, self.params.rv_window),
            vol_regime: self.vol_regime(returns),
            vol_of_vol: self.vol_of_vol(returns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(n: usize, amp: f64) -> Vec<f64> {
        let mut r: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { amp } else { -amp }).collect();
        r[0] = f64::NAN;
        r
    }

    #[test]
    fn test_realized_vol_is_annualized() {
        let params = VolatilityParams::default();
        let calc = VolatilityCalculator::new(&params, 100.0);
        let r = alternating(50, 0.01);
        let rv = calc.realized_volatility(&r, 20);
        let last = *rv.last().unwrap();
        let raw = super::super::rolling::sample_std(&r[30..]);
        assert!((last - raw * 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_vol_regime_spikes_on_volatility_burst() {
        let params = VolatilityParams {
            vol_regime_short: 10,
            vol_regime_long: 50,
            ..VolatilityParams::default()
        };
        let calc = VolatilityCalculator::new(&params, 35_040.0);
        let mut r = alternating(300, 0.001);
        for v in r.iter_mut().skip(290) {
            *v *= 10.0;
        }
        let regime = calc.vol_regime(&r);
        assert!(*regime.last().unwrap() > 1.5);
        assert!((regime[200] - 1.0).abs() < 0.05);
    }
}
