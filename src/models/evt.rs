//! Extreme Value Theory tail model (peaks over threshold).
//!
//! Losses above a high percentile are fitted with a Generalized Pareto
//! Distribution; VaR and Expected Shortfall come from the fitted tail.

use crate::engine::params::EvtParams;
use crate::signals::rolling::{percentile, sample_std};

const DEFAULT_SHAPE: f64 = 0.2;
const DEFAULT_SCALE: f64 = 0.01;
const UNFITTED_VAR: f64 = 0.05;
/// Exceedance count floor used by the tail quantile
const MIN_TAIL_COUNT: f64 = 10.0;
const SHAPE_EPS: f64 = 1e-8;

/// Fitted Generalized Pareto tail
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpdFit {
    /// Shape parameter (xi)
    pub shape: f64,
    pub scale: f64,
    pub threshold: f64,
    pub n_exceedances: usize,
    pub n_total: usize,
}

#[derive(Debug, Clone)]
pub struct EvtModel<'a> {
    params: &'a EvtParams,
    fit: Option<GpdFit>,
}

impl<'a> EvtModel<'a> {
    pub fn new(params: &'a EvtParams) -> Self {
        Self { params, fit: None }
    }

    pub fn fit(&mut self, returns: &[f64]) -> Option<GpdFit> {
        let losses: Vec<f64> = returns.iter().filter(|r| r.is_finite()).map(|r| -r).collect();
        if losses.is_empty() {
            self.fit = None;
            return None;
        }

        let threshold = percentile(&losses, self.params.threshold_percentile);
        let exceedances: Vec<f64> = losses
            .iter()
            .filter(|&&l| l > threshold)
            .map(|l| l - threshold)
            .collect();

        let (shape, scale) = if exceedances.len() < self.params.min_exceedances {
            let sd = sample_std(&exceedances);
            let scale = if sd.is_finite() && sd > 0.0 { sd } else { DEFAULT_SCALE };
            (DEFAULT_SHAPE, scale)
        } else {
            fit_gpd(&exceedances)
        };

        let fit = GpdFit {
            shape,
            scale,
            threshold,
            n_exceedances: exceedances.len(),
            n_total: losses.len(),
        };
        tracing::debug!(
            shape = fit.shape,
            scale = fit.scale,
            threshold = fit.threshold,
            exceedances = fit.n_exceedances,
            "GPD tail fitted"
        );
        self.fit = Some(fit);
        self.fit
    }

    pub fn fitted(&self) -> Option<&GpdFit> {
        self.fit.as_ref()
    }

    /// Per-bar Value-at-Risk at `confidence` as a positive loss fraction.
    pub fn var(&self, confidence: f64) -> f64 {
        let Some(fit) = self.fit else {
            return UNFITTED_VAR;
        };
        let p = 1.0 - confidence;
        let n_u = (fit.n_exceedances as f64).max(MIN_TAIL_COUNT);
        let ratio = fit.n_total as f64 * p / n_u;
        let var = if fit.shape.abs() < SHAPE_EPS {
            fit.threshold - fit.scale * ratio.ln()
        } else {
            fit.threshold + fit.scale / fit.shape * (ratio.powf(-fit.shape) - 1.0)
        };
        var.max(0.0)
    }

    /// Per-bar Expected Shortfall at `confidence`; never below the VaR.
    pub fn expected_shortfall(&self, confidence: f64) -> f64 {
        let var = self.var(confidence);
        let Some(fit) = self.fit else {
            return var * 1.3;
        };
        if fit.shape >= 1.0 {
            return var * 1.3;
        }
        let es = var / (1.0 - fit.shape) + (fit.scale - fit.shape * fit.threshold) / (1.0 - fit.shape);
        es.max(var)
    }

    /// Fitted shape parameter; higher means a fatter tail.
    pub fn tail_index(&self) -> f64 {
        self.fit.map(|f| f.shape).unwrap_or(DEFAULT_SHAPE)
    }

    pub fn var_default(&self) -> f64 {
        self.var(self.params.var_confidence)
    }

    pub fn es_default(&self) -> f64 {
        self.expected_shortfall(self.params.es_confidence)
    }
}

/// GPD negative log-likelihood with location 0.
pub fn gpd_neg_log_likelihood(data: &[f64], shape: f64, scale: f64) -> f64 {
    if !(scale > 0.0) || !shape.is_finite() {
        return f64::INFINITY;
    }
    let n = data.len() as f64;
    if shape.abs() < SHAPE_EPS {
        return n * scale.ln() + data.iter().sum::<f64>() / scale;
    }
    let mut acc = 0.0;
    for &y in data {
        let z = 1.0 + shape * y / scale;
        if z <= 0.0 {
            return f64::INFINITY;
        }
        acc += z.ln();
    }
    n * scale.ln() + (1.0 + 1.0 / shape) * acc
}

/// Maximum-likelihood (shape, scale), starting from the method of moments.
pub fn fit_gpd(data: &[f64]) -> (f64, f64) {
    let n = data.len() as f64;
    let m = data.iter().sum::<f64>() / n;
    let v = data.iter().map(|y| (y - m).powi(2)).sum::<f64>() / n;
    let (shape0, scale0) = if v > 0.0 && m > 0.0 {
        let ratio = m * m / v;
        (0.5 * (1.0 - ratio), 0.5 * m * (ratio + 1.0))
    } else {
        (DEFAULT_SHAPE, m.max(DEFAULT_SCALE))
    };

    // optimize over (shape, ln scale) so scale stays positive
    let objective = |x: &[f64; 2]| gpd_neg_log_likelihood(data, x[0], x[1].exp());
    let start = if objective(&[shape0, scale0.ln()]).is_finite() {
        [shape0, scale0.ln()]
    } else {
        [0.0, m.max(DEFAULT_SCALE).ln()]
    };
    let best = nelder_mead(objective, start, 0.1, 500, 1e-10);

    let (shape, scale) = (best[0], best[1].exp());
    if shape.is_finite() && scale.is_finite() && scale > 0.0 {
        (shape, scale)
    } else {
        (DEFAULT_SHAPE, DEFAULT_SCALE)
    }
}

/// Two-dimensional Nelder-Mead simplex minimizer.
fn nelder_mead<F>(f: F, start: [f64; 2], step: f64, max_iter: usize, tol: f64) -> [f64; 2]
where
    F: Fn(&[f64; 2]) -> f64,
{
    let mut simplex = [
        start,
        [start[0] + step, start[1]],
        [start[0], start[1] + step],
    ];
    let mut values = simplex.map(|p| f(&p));

    for _ in 0..max_iter {
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.map(|i| simplex[i]);
        values = order.map(|i| values[i]);

        if (values[2] - values[0]).abs() <= tol * (values[0].abs() + tol) {
            break;
        }

        let centroid = [
            (simplex[0][0] + simplex[1][0]) / 2.0,
            (simplex[0][1] + simplex[1][1]) / 2.0,
        ];
        let along = |t: f64| {
            [
                centroid[0] + t * (simplex[2][0] - centroid[0]),
                centroid[1] + t * (simplex[2][1] - centroid[1]),
            ]
        };

        let reflected = along(-1.0);
        let f_r = f(&reflected);
        if f_r < values[0] {
            let expanded = along(-2.0);
            let f_e = f(&expanded);
            if f_e < f_r {
                simplex[2] = expanded;
                values[2] = f_e;
            } else {
                simplex[2] = reflected;
                values[2] = f_r;
            }
        } else if f_r < values[1] {
            simplex[2] = reflected;
            values[2] = f_r;
        } else {
            let contracted = if f_r < values[2] { along(-0.5) } else { along(0.5) };
            let f_c = f(&contracted);
            if f_c < values[2].min(f_r) {
                simplex[2] = contracted;
                values[2] = f_c;
            } else {
                // shrink toward the best vertex
                for k in 1..3 {
                    simplex[k] = [
                        simplex[0][0] + 0.5 * (simplex[k][0] - simplex[0][0]),
                        simplex[0][1] + 0.5 * (simplex[k][1] - simplex[0][1]),
                    ];
                    values[k] = f(&simplex[k]);
                }
            }
        }
    }

    let mut best = 0;
    for k in 1..3 {
        if values[k] < values[best] {
            best = k;
        }
    }
    simplex[best]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn params() -> EvtParams {
        EvtParams::default()
    }

    #[test]
    fn test_unfitted_defaults() {
        let p = params();
        let model = EvtModel::new(&p);
        assert_eq!(model.var(0.99), 0.05);
        assert!((model.expected_shortfall(0.99) - 0.065).abs() < 1e-12);
        assert!(model.es_default() > model.var_default());
        assert_eq!(model.tail_index(), 0.2);
    }

    #[test]
    fn test_few_exceedances_use_default_shape() {
        let p = params();
        let mut model = EvtModel::new(&p);
        let returns: Vec<f64> = (0..40).map(|i| -(i as f64) * 0.001).collect();
        let fit = model.fit(&returns).unwrap();
        assert!(fit.n_exceedances < 10);
        assert_eq!(fit.shape, 0.2);
        assert!(model.var(0.99) > 0.0);
    }

    #[test]
    fn test_exponential_tail_has_small_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<f64> = (0..5000)
            .map(|_| -0.02 * (1.0 - rng.gen::<f64>()).ln())
            .collect();
        let (shape, scale) = fit_gpd(&data);
        assert!(shape.abs() < 0.1, "shape = {}", shape);
        assert!((scale - 0.02).abs() < 0.004, "scale = {}", scale);
    }

    #[test]
    fn test_es_not_below_var() {
        let mut rng = StdRng::seed_from_u64(11);
        let returns: Vec<f64> = (0..3000).map(|_| (rng.gen::<f64>() - 0.5) * 0.02).collect();
        let p = params();
        let mut model = EvtModel::new(&p);
        model.fit(&returns).unwrap();
        let var = model.var_default();
        let es = model.es_default();
        assert!(var > 0.0);
        assert!(es >= var);
    }

    #[test]
    fn test_likelihood_rejects_invalid_support() {
        assert!(gpd_neg_log_likelihood(&[1.0, 2.0], -1.0, 1.0).is_infinite());
        assert!(gpd_neg_log_likelihood(&[1.0], 0.1, 0.0).is_infinite());
    }
}
