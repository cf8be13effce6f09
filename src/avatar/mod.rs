//! Risk avatar
//!
//! A small mood model driven by live oracle prices: volatility and drawdown
//! over a rolling window push stress up, quiet markets let it decay.

pub mod stress;

pub use stress::{update_avatar_state, AvatarProfile, AvatarState, MarketState, RiskMode};

use chrono::Utc;
use serde::Serialize;
use std::collections::VecDeque;

use crate::error::Result;
use crate::oracle::{usable_price, PriceSource};
use crate::signals::rolling::population_std;

pub const DEFAULT_WINDOW: usize = 30;

/// What `GET /v1/avatar` returns
#[derive(Debug, Clone, Serialize)]
pub struct AvatarView {
    pub state: AvatarState,
    pub market: Option<MarketState>,
    pub profile: AvatarProfile,
    pub samples: usize,
    pub oracle_timestamp: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct RiskAvatarManager {
    window: usize,
    prices: VecDeque<f64>,
    timestamps: VecDeque<u64>,
    prev_drawdown: f64,
    profile: AvatarProfile,
    avatar: AvatarState,
    last_market: Option<MarketState>,
}

impl Default for RiskAvatarManager {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl RiskAvatarManager {
    pub fn new(window: usize) -> Self {
        let window = window.max(2);
        Self {
            window,
            prices: VecDeque::with_capacity(window),
            timestamps: VecDeque::with_capacity(window),
            prev_drawdown: 0.0,
            profile: AvatarProfile::default(),
            avatar: AvatarState::default(),
            last_market: None,
        }
    }

    /// (volatility, drawdown, drawdown_speed) over the current window.
    fn features(&mut self) -> (f64, f64, f64) {
        if self.prices.len() < 2 {
            return (0.0, 0.0, 0.0);
        }
        let prices: Vec<f64> = self.prices.iter().copied().collect();
        let returns: Vec<f64> = prices.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
        let volatility = population_std(&returns);

        let peak = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let last = prices[prices.len() - 1];
        let drawdown = (peak - last) / peak;

        let speed = (drawdown - self.prev_drawdown).max(0.0);
        self.prev_drawdown = drawdown;
        (volatility, drawdown, speed)
    }

    /// Feed one price observation and advance the stress state.
    ///
    /// Prices that are not finite and positive are dropped; the state is
    /// returned unchanged.
    pub fn observe(&mut self, price: f64, timestamp: u64) -> AvatarState {
        if !usable_price(price) {
            tracing::warn!(price, timestamp, "avatar ignoring unusable price");
            return self.avatar;
        }
        if self.prices.len() == self.window {
            self.prices.pop_front();
            self.timestamps.pop_front();
        }
        self.prices.push_back(price);
        self.timestamps.push_back(timestamp);

        let (volatility, drawdown, drawdown_speed) = self.features();
        let market = MarketState {
            price,
            volatility,
            drawdown,
            drawdown_speed,
            timestamp: Utc::now().timestamp(),
        };
        self.avatar = update_avatar_state(&self.profile, &market, self.avatar);
        self.last_market = Some(market);

        tracing::debug!(
            price,
            stress = self.avatar.stress_level,
            mode = ?self.avatar.risk_mode,
            "avatar updated"
        );
        self.avatar
    }

    /// Pull the latest price from `source` and observe it.
    pub async fn update(&mut self, source: &dyn PriceSource) -> Result<AvatarState> {
        let quote = source.latest_price().await?;
        Ok(self.observe(quote.price, quote.timestamp))
    }

    pub fn state(&self) -> AvatarState {
        self.avatar
    }

    pub fn view(&self) -> AvatarView {
        AvatarView {
            state: self.avatar,
            market: self.last_market,
            profile: self.profile.clone(),
            samples: self.prices.len(),
            oracle_timestamp: self.timestamps.back().copied(),
        }
    }
}
