//! Seeded synthetic bars, used when no history file is available.

use chrono::{Duration, DurationRound, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use super::bar::Bar;

pub const DEFAULT_BARS: usize = 2000;
pub const DEFAULT_BASE_PRICE: f64 = 50_000.0;

/// Standard normal sample via Box-Muller
fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Geometric random walk of 15-minute bars ending at the current quarter hour.
pub fn random_walk(n: usize, base_price: f64, per_bar_vol: f64, seed: u64) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let step = Duration::minutes(15);
    let now = Utc::now();
    let end = now.duration_trunc(step).unwrap_or(now);

    let mut log_price = base_price.ln();
    (0..n)
        .map(|i| {
            log_price += per_bar_vol * standard_normal(&mut rng);
            let close = log_price.exp();
            let open = close * (1.0 + 0.001 * standard_normal(&mut rng));
            let high = close.max(open) * (1.0 + (0.002 * standard_normal(&mut rng)).abs());
            let low = close.min(open) * (1.0 - (0.002 * standard_normal(&mut rng)).abs());
            let volume = (10.0 + standard_normal(&mut rng)).exp();
            let timestamp = end - step * (n - 1 - i) as i32;
            Bar::new(timestamp, open, high, low, close, volume)
        })
        .collect()
}

/// Default synthetic history: 2000 bars around 50,000 with 1% per-bar moves.
pub fn default_history(seed: u64) -> Vec<Bar> {
    random_walk(DEFAULT_BARS, DEFAULT_BASE_PRICE, 0.01, seed)
}
