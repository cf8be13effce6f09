//! One-dimensional Gaussian Hidden Markov Model.
//!
//! Fitted with Baum-Welch from a deterministic starting point (all means at
//! the sample mean, variances spread geometrically around the sample
//! variance) so the same returns always yield the same model. After fitting,
//! states are ordered by increasing variance.

use ndarray::{Array1, Array2};
use std::f64::consts::PI;

use crate::error::{Result, RiskError};

const MIN_OBSERVATIONS: usize = 10;
const TINY: f64 = 1e-300;

#[derive(Debug, Clone)]
pub struct GaussianHmm {
    pub n_states: usize,
    pub initial_probs: Array1<f64>,
    pub transition_matrix: Array2<f64>,
    pub means: Array1<f64>,
    pub variances: Array1<f64>,
    pub is_fitted: bool,
    pub log_likelihood: f64,
    pub iterations: usize,
}

fn log_pdf(x: f64, mean: f64, var: f64) -> f64 {
    -0.5 * ((2.0 * PI * var).ln() + (x - mean).powi(2) / var)
}

impl GaussianHmm {
    pub fn new(n_states: usize) -> Self {
        let n = n_states.max(1);
        Self {
            n_states: n,
            initial_probs: Array1::from_elem(n, 1.0 / n as f64),
            transition_matrix: Array2::from_elem((n, n), 1.0 / n as f64),
            means: Array1::zeros(n),
            variances: Array1::ones(n),
            is_fitted: false,
            log_likelihood: f64::NEG_INFINITY,
            iterations: 0,
        }
    }

    fn initialize(&mut self, obs: &[f64]) -> Result<f64> {
        let n = self.n_states;
        let len = obs.len() as f64;
        let mean = obs.iter().sum::<f64>() / len;
        let var = obs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / len;
        if !(var > 0.0 && var.is_finite()) {
            return Err(RiskError::Model("observations have zero variance".to_string()));
        }

        self.initial_probs = Array1::from_elem(n, 1.0 / n as f64);
        let off_diag = if n > 1 { 0.1 / (n - 1) as f64 } else { 0.0 };
        self.transition_matrix = Array2::from_shape_fn((n, n), |(i, j)| {
            if n == 1 {
                1.0
            } else if i == j {
                0.9
            } else {
                off_diag
            }
        });
        self.means = Array1::from_elem(n, mean);
        self.variances = Array1::from_shape_fn(n, |i| {
            let spread = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.5 };
            var * 0.5 * 8f64.powf(spread)
        });
        Ok(var)
    }

    /// Per-step emission likelihoods rescaled by the row maximum, plus the
    /// log of each row's scale.
    fn emissions(&self, obs: &[f64]) -> (Array2<f64>, Array1<f64>) {
        let t_len = obs.len();
        let n = self.n_states;
        let mut probs = Array2::zeros((t_len, n));
        let mut log_scale = Array1::zeros(t_len);
        for (t, &x) in obs.iter().enumerate() {
            let logs: Vec<f64> = (0..n)
                .map(|j| log_pdf(x, self.means[j], self.variances[j]))
                .collect();
            let max = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            log_scale[t] = max;
            for j in 0..n {
                probs[[t, j]] = (logs[j] - max).exp();
            }
        }
        (probs, log_scale)
    }

    /// Scaled forward-backward pass.
    ///
    /// Returns (alpha, beta, gamma, emission probs, scale, log-likelihood).
    #[allow(clippy::type_complexity)]
    fn forward_backward(
        &self,
        obs: &[f64],
    ) -> (Array2<f64>, Array2<f64>, Array2<f64>, Array2<f64>, Array1<f64>, f64) {
        let t_len = obs.len();
        let n = self.n_states;
        let (emission, log_emission_scale) = self.emissions(obs);

        let mut alpha = Array2::zeros((t_len, n));
        let mut scale = Array1::zeros(t_len);
        for j in 0..n {
            alpha[[0, j]] = self.initial_probs[j] * emission[[0, j]];
        }
        scale[0] = alpha.row(0).sum();
        if scale[0] > TINY {
            for j in 0..n {
                alpha[[0, j]] /= scale[0];
            }
        }
        for t in 1..t_len {
            for j in 0..n {
                let mut sum = 0.0;
                for i in 0..n {
                    sum += alpha[[t - 1, i]] * self.transition_matrix[[i, j]];
                }
                alpha[[t, j]] = sum * emission[[t, j]];
            }
            scale[t] = alpha.row(t).sum();
            if scale[t] > TINY {
                for j in 0..n {
                    alpha[[t, j]] /= scale[t];
                }
            }
        }

        let log_likelihood: f64 = scale.iter().map(|s| (s + TINY).ln()).sum::<f64>()
            + log_emission_scale.sum();

        let mut beta = Array2::zeros((t_len, n));
        for j in 0..n {
            beta[[t_len - 1, j]] = 1.0;
        }
        for t in (0..t_len - 1).rev() {
            for i in 0..n {
                let mut sum = 0.0;
                for j in 0..n {
                    sum += self.transition_matrix[[i, j]] * emission[[t + 1, j]] * beta[[t + 1, j]];
                }
                beta[[t, i]] = sum;
            }
            if scale[t + 1] > TINY {
                for i in 0..n {
                    beta[[t, i]] /= scale[t + 1];
                }
            }
        }

        let mut gamma = Array2::zeros((t_len, n));
        for t in 0..t_len {
            let mut sum = 0.0;
            for j in 0..n {
                gamma[[t, j]] = alpha[[t, j]] * beta[[t, j]];
                sum += gamma[[t, j]];
            }
            if sum > TINY {
                for j in 0..n {
                    gamma[[t, j]] /= sum;
                }
            }
        }

        (alpha, beta, gamma, emission, scale, log_likelihood)
    }

    /// Fit with Baum-Welch; returns the final log-likelihood.
    pub fn fit(&mut self, obs: &[f64], n_iter: usize, tol: f64) -> Result<f64> {
        if obs.len() < MIN_OBSERVATIONS {
            return Err(RiskError::Model(format!(
                "need at least {} observations, got {}",
                MIN_OBSERVATIONS,
                obs.len()
            )));
        }
        if obs.iter().any(|x| !x.is_finite()) {
            return Err(RiskError::Model("observations must be finite".to_string()));
        }

        let total_var = self.initialize(obs)?;
        let var_floor = total_var * 1e-6;
        let n = self.n_states;
        let t_len = obs.len();
        let mut prev_ll = f64::NEG_INFINITY;
        self.iterations = 0;

        for iter in 0..n_iter.max(1) {
            let (alpha, beta, gamma, emission, scale, ll) = self.forward_backward(obs);
            if !ll.is_finite() {
                return Err(RiskError::Model("log-likelihood diverged".to_string()));
            }

            // expected transition counts
            let mut xi_sum = Array2::<f64>::zeros((n, n));
            for t in 0..t_len - 1 {
                let norm = if scale[t + 1] > TINY { scale[t + 1] } else { 1.0 };
                for i in 0..n {
                    for j in 0..n {
                        xi_sum[[i, j]] += alpha[[t, i]]
                            * self.transition_matrix[[i, j]]
                            * emission[[t + 1, j]]
                            * beta[[t + 1, j]]
                            / norm;
                    }
                }
            }

            self.initial_probs = gamma.row(0).to_owned();
            for i in 0..n {
                let row_sum: f64 = xi_sum.row(i).sum();
                for j in 0..n {
                    self.transition_matrix[[i, j]] = if row_sum > TINY {
                        xi_sum[[i, j]] / row_sum
                    } else {
                        1.0 / n as f64
                    };
                }
            }

            for j in 0..n {
                let weight: f64 = gamma.column(j).sum();
                if weight <= TINY {
                    continue;
                }
                let mean = gamma
                    .column(j)
                    .iter()
                    .zip(obs)
                    .map(|(g, x)| g * x)
                    .sum::<f64>()
                    / weight;
                let var = gamma
                    .column(j)
                    .iter()
                    .zip(obs)
                    .map(|(g, x)| g * (x - mean).powi(2))
                    .sum::<f64>()
                    / weight;
                self.means[j] = mean;
                self.variances[j] = var.max(var_floor);
            }

            self.iterations = iter + 1;
            let converged = (ll - prev_ll).abs() < tol;
            prev_ll = ll;
            if converged {
                tracing::debug!(iterations = iter + 1, log_likelihood = ll, "hmm converged");
                break;
            }
        }

        self.sort_by_variance();
        self.is_fitted = true;
        self.log_likelihood = prev_ll;
        Ok(prev_ll)
    }

    /// Reorder states so state 0 has the smallest variance.
    fn sort_by_variance(&mut self) {
        let n = self.n_states;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| self.variances[a].total_cmp(&self.variances[b]));

        self.initial_probs = Array1::from_shape_fn(n, |i| self.initial_probs[order[i]]);
        self.means = Array1::from_shape_fn(n, |i| self.means[order[i]]);
        self.variances = Array1::from_shape_fn(n, |i| self.variances[order[i]]);
        self.transition_matrix =
            Array2::from_shape_fn((n, n), |(i, j)| self.transition_matrix[[order[i], order[j]]]);
    }

    /// Posterior state probabilities (T x N).
    pub fn predict_proba(&self, obs: &[f64]) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(RiskError::Model("model not fitted".to_string()));
        }
        if obs.is_empty() {
            return Ok(Array2::zeros((0, self.n_states)));
        }
        let (_, _, gamma, _, _, _) = self.forward_backward(obs);
        Ok(gamma)
    }

    /// Most likely state path (Viterbi).
    pub fn predict(&self, obs: &[f64]) -> Result<Vec<usize>> {
        if !self.is_fitted {
            return Err(RiskError::Model("model not fitted".to_string()));
        }
        let t_len = obs.len();
        let n = self.n_states;
        if t_len == 0 {
            return Ok(vec![]);
        }

        let log_initial = self.initial_probs.mapv(|p| (p + TINY).ln());
        let log_trans = self.transition_matrix.mapv(|p| (p + TINY).ln());
        let mut delta = Array2::<f64>::zeros((t_len, n));
        let mut psi = Array2::<usize>::zeros((t_len, n));

        for j in 0..n {
            delta[[0, j]] = log_initial[j] + log_pdf(obs[0], self.means[j], self.variances[j]);
        }
        for t in 1..t_len {
            for j in 0..n {
                let (best_state, best_val) = (0..n)
                    .map(|i| (i, delta[[t - 1, i]] + log_trans[[i, j]]))
                    .fold((0, f64::NEG_INFINITY), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
                delta[[t, j]] = best_val + log_pdf(obs[t], self.means[j], self.variances[j]);
                psi[[t, j]] = best_state;
            }
        }

        let mut path = vec![0; t_len];
        path[t_len - 1] = (0..n)
            .fold((0, f64::NEG_INFINITY), |acc, j| {
                let v = delta[[t_len - 1, j]];
                if v > acc.1 {
                    (j, v)
                } else {
                    acc
                }
            })
            .0;
        for t in (0..t_len - 1).rev() {
            path[t] = psi[[t + 1, path[t + 1]]];
        }
        Ok(path)
    }
}
