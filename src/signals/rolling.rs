//! Rolling-window statistics over index-aligned `f64` series.
//!
//! Every series produced here has the same length as its input. Positions
//! where the statistic is not yet defined hold `NaN`. A window statistic is
//! defined only when all values inside the window are finite.

/// Log returns of a price series; the first element is `NaN`.
pub fn log_returns(prices: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return out;
    }
    out.push(f64::NAN);
    for pair in prices.windows(2) {
        let r = (pair[1] / pair[0]).ln();
        out.push(if r.is_finite() { r } else { f64::NAN });
    }
    out
}

fn rolling<F>(values: &[f64], window: usize, stat: F) -> Vec<f64>
where
    F: Fn(&[f64]) -> f64,
{
    let mut out = vec![f64::NAN; values.len()];
    if window == 0 || values.len() < window {
        return out;
    }
    for end in window..=values.len() {
        let slice = &values[end - window..end];
        if slice.iter().all(|v| v.is_finite()) {
            out[end - 1] = stat(slice);
        }
    }
    out
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1).
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Population standard deviation (ddof = 0).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / values.len() as f64).sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Percentile with linear interpolation between closest ranks (`q` in 0..=100).
pub fn percentile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Adjusted Fisher-Pearson sample skewness.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 3 {
        return f64::NAN;
    }
    let m = mean(values);
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    if m2 == 0.0 {
        return f64::NAN;
    }
    (n * (n - 1.0)).sqrt() / (n - 2.0) * m3 / m2.powf(1.5)
}

/// Bias-corrected excess kurtosis.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 4 {
        return f64::NAN;
    }
    let m = mean(values);
    let s2: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    let s4: f64 = values.iter().map(|v| (v - m).powi(4)).sum();
    if s2 == 0.0 {
        return f64::NAN;
    }
    let a = (n + 1.0) * n * (n - 1.0) / ((n - 2.0) * (n - 3.0));
    let b = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    a * s4 / (s2 * s2) - b
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, mean)
}

pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, sample_std)
}

pub fn rolling_median(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, median)
}

pub fn rolling_skew(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, skewness)
}

pub fn rolling_kurt(values: &[f64], window: usize) -> Vec<f64> {
    rolling(values, window, excess_kurtosis)
}

/// Rolling maximum that only needs one finite value in the window.
pub fn rolling_max_partial(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            values[start..=i]
                .iter()
                .copied()
                .filter(|v| v.is_finite())
                .fold(f64::NAN, f64::max)
        })
        .collect()
}

/// Exponentially weighted mean with `alpha = 2 / (span + 1)` and adjusted
/// weights. Non-finite inputs are skipped but still decay earlier weights.
pub fn ewm_mean(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span.max(1) as f64 + 1.0);
    let decay = 1.0 - alpha;
    let mut num = 0.0;
    let mut den = 0.0;
    let mut seen = false;
    values
        .iter()
        .map(|&v| {
            num *= decay;
            den *= decay;
            if v.is_finite() {
                num += v;
                den += 1.0;
                seen = true;
            }
            if seen && den > 0.0 {
                num / den
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Element-wise `a / b`, with non-finite results mapped to `NaN`.
pub fn ratio(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let r = x / y;
            if r.is_finite() {
                r
            } else {
                f64::NAN
            }
        })
        .collect()
}

/// Percentile rank (average method, `pct = true`) of the last finite value
/// among all finite values of the series.
pub fn pct_rank_of_last(values: &[f64]) -> Option<f64> {
    let last = *values.iter().rev().find(|v| v.is_finite())?;
    let mut below = 0usize;
    let mut equal = 0usize;
    let mut count = 0usize;
    for v in values.iter().filter(|v| v.is_finite()) {
        count += 1;
        if *v < last {
            below += 1;
        } else if *v == last {
            equal += 1;
        }
    }
    let avg_rank = below as f64 + (equal as f64 + 1.0) / 2.0;
    Some(avg_rank / count as f64)
}

/// Last element if it is finite.
pub fn last_finite(values: &[f64]) -> Option<f64> {
    values.last().copied().filter(|v| v.is_finite())
}
