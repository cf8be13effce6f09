//! Binance spot kline client
//!
//! Fetches 15-minute BTCUSDT history for the bar store: one page at a time,
//! a full backwards backfill, or an incremental update after the last bar.

use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::bar::{normalize, Bar};
use crate::error::{Result, RiskError};

const BASE_URL: &str = "https://api.binance.com";
/// Maximum klines per request
pub const PAGE_LIMIT: usize = 1000;
const PAGE_PAUSE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
}

impl Default for BinanceClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BinanceClient {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch one page of klines, oldest first.
    pub async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_time_ms: Option<i64>,
        end_time_ms: Option<i64>,
        limit: usize,
    ) -> Result<Vec<Bar>> {
        let mut query: Vec<(&str, String)> = vec![
            ("symbol", symbol.to_uppercase()),
            ("interval", interval.to_string()),
            ("limit", limit.clamp(1, PAGE_LIMIT).to_string()),
        ];
        if let Some(start) = start_time_ms {
            query.push(("startTime", start.to_string()));
        }
        if let Some(end) = end_time_ms {
            query.push(("endTime", end.to_string()));
        }

        let url = format!("{}/api/v3/klines", self.base_url);
        debug!(symbol, interval, ?start_time_ms, ?end_time_ms, "fetching klines");
        let rows: Vec<Vec<Value>> = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        rows.iter().map(|row| parse_kline(row)).collect()
    }

    /// Page backwards from now until the exchange runs out of history.
    pub async fn backfill_history(
        &self,
        symbol: &str,
        interval: &str,
        max_batches: Option<usize>,
    ) -> Result<Vec<Bar>> {
        let mut all = Vec::new();
        let mut end_time_ms: Option<i64> = None;
        let mut batches = 0usize;

        loop {
            let page = self
                .fetch_klines(symbol, interval, None, end_time_ms, PAGE_LIMIT)
                .await?;
            let Some(first) = page.first() else {
                break;
            };
            end_time_ms = Some(first.open_time_ms() - 1);
            let page_len = page.len();
            all.extend(page);
            batches += 1;
            info!(batches, total = all.len(), "backfill page");

            tokio::time::sleep(PAGE_PAUSE).await;

            if page_len < PAGE_LIMIT {
                break;
            }
            if max_batches.is_some_and(|max| batches >= max) {
                break;
            }
        }

        Ok(normalize(all))
    }

    /// Append bars that opened after the last stored bar.
    pub async fn update_latest(&self, bars: Vec<Bar>, symbol: &str, interval: &str) -> Result<Vec<Bar>> {
        let Some(last) = bars.last() else {
            return self.backfill_history(symbol, interval, None).await;
        };
        let mut start = last.open_time_ms() + 1;
        let mut merged = bars;
        loop {
            let page = self
                .fetch_klines(symbol, interval, Some(start), None, PAGE_LIMIT)
                .await?;
            let Some(newest) = page.last() else {
                break;
            };
            start = newest.open_time_ms() + 1;
            let page_len = page.len();
            merged.extend(page);
            if page_len < PAGE_LIMIT {
                break;
            }
            tokio::time::sleep(PAGE_PAUSE).await;
        }
        Ok(normalize(merged))
    }
}

fn number(value: &Value, idx: usize) -> Result<f64> {
    match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .ok_or_else(|| RiskError::Data(format!("kline field {} is not numeric", idx)))
}

/// Parse a kline row: `[open_time, open, high, low, close, volume, close_time, ...]`.
pub fn parse_kline(row: &[Value]) -> Result<Bar> {
    if row.len() < 6 {
        return Err(RiskError::Data(format!("kline row has {} fields", row.len())));
    }
    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| RiskError::Data("kline open time is not an integer".to_string()))?;
    let timestamp = Utc
        .timestamp_millis_opt(open_time)
        .single()
        .ok_or_else(|| RiskError::Data(format!("kline open time out of range: {}", open_time)))?;
    Ok(Bar {
        timestamp,
        open: number(&row[1], 1)?,
        high: number(&row[2], 2)?,
        low: number(&row[3], 3)?,
        close: number(&row[4], 4)?,
        volume: number(&row[5], 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_kline_row() {
        let row = json!([
            1700000000000i64, "37000.1", "37100.0", "36950.5", "37050.0", "12.5",
            1700000899999i64, "463125.0", 1200, "6.0", "222000.0", "0"
        ]);
        let bar = parse_kline(row.as_array().unwrap()).unwrap();
        assert_eq!(bar.open_time_ms(), 1_700_000_000_000);
        assert_eq!(bar.close, 37050.0);
        assert_eq!(bar.volume, 12.5);
    }

    #[test]
    fn test_parse_kline_rejects_short_rows() {
        let row = json!([1700000000000i64, "1.0"]);
        assert!(parse_kline(row.as_array().unwrap()).is_err());
    }
}
