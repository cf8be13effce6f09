//! OHLCV bar type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Single OHLCV candlestick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: DateTime<Utc>, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Open time in epoch milliseconds
    pub fn open_time_ms(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// Sort ascending by timestamp and drop duplicate timestamps (the later row wins).
pub fn normalize(mut bars: Vec<Bar>) -> Vec<Bar> {
    // stable sort keeps input order among equal timestamps
    bars.sort_by_key(|b| b.timestamp);
    let mut out: Vec<Bar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match out.last_mut() {
            Some(last) if last.timestamp == bar.timestamp => *last = bar,
            _ => out.push(bar),
        }
    }
    out
}

pub fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

pub fn volumes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.volume).collect()
}
