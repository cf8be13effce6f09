//! Price Source
//!
//! Live BTC/USD prices. The engine never needs one; when present the live
//! price is reported as `current_price`, otherwise the last close stands in.

pub mod abi;
pub mod ftso;

pub use ftso::FtsoV2Client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::error::{Result, RiskError};

/// A decoded oracle answer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OraclePrice {
    pub price: f64,
    pub decimals: i8,
    /// Unix seconds
    pub timestamp: u64,
}

impl OraclePrice {
    /// A finite, positive price.
    pub fn is_usable(&self) -> bool {
        usable_price(self.price)
    }
}

pub fn usable_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    fn name(&self) -> &str;
    async fn latest_price(&self) -> Result<OraclePrice>;
}

/// Fixed answers, or a fixed failure when empty. Used for offline runs.
#[derive(Debug, Default)]
pub struct StaticPriceSource {
    prices: Mutex<Vec<OraclePrice>>,
}

impl StaticPriceSource {
    pub fn new(price: f64, timestamp: u64) -> Self {
        Self::sequence(vec![price], timestamp)
    }

    /// Replays `prices` in order and keeps repeating the last one.
    pub fn sequence(prices: Vec<f64>, start_timestamp: u64) -> Self {
        let mut answers: Vec<OraclePrice> = prices
            .into_iter()
            .enumerate()
            .map(|(i, price)| OraclePrice {
                price,
                decimals: 0,
                timestamp: start_timestamp + i as u64,
            })
            .collect();
        answers.reverse();
        Self {
            prices: Mutex::new(answers),
        }
    }

    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn latest_price(&self) -> Result<OraclePrice> {
        let mut prices = self
            .prices
            .lock()
            .map_err(|_| RiskError::Oracle("price source lock poisoned".to_string()))?;
        match prices.len() {
            0 => Err(RiskError::Oracle("no price available".to_string())),
            1 => Ok(prices[0]),
            _ => prices
                .pop()
                .ok_or_else(|| RiskError::Oracle("no price available".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_sequence_repeats_last() {
        let source = StaticPriceSource::sequence(vec![1.0, 2.0, 3.0], 100);
        assert_eq!(source.latest_price().await.unwrap().price, 1.0);
        assert_eq!(source.latest_price().await.unwrap().price, 2.0);
        assert_eq!(source.latest_price().await.unwrap().price, 3.0);
        let last = source.latest_price().await.unwrap();
        assert_eq!(last.price, 3.0);
        assert_eq!(last.timestamp, 102);
    }

    #[tokio::test]
    async fn test_unavailable_source_errors() {
        let source = StaticPriceSource::unavailable();
        assert!(matches!(source.latest_price().await, Err(RiskError::Oracle(_))));
    }
}
