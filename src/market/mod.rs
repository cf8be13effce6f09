//! Market Data Module
//!
//! Historical 15-minute BTC bars: the in-memory type, CSV persistence,
//! exchange backfill and a seeded synthetic fallback.

pub mod bar;
pub mod binance;
pub mod store;
pub mod synthetic;

pub use bar::Bar;
pub use binance::BinanceClient;
pub use store::{load_bars, save_bars};

use std::path::Path;
use tracing::warn;

use crate::error::Result;

/// Where a bar series came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarSource {
    File(String),
    Synthetic,
}

impl BarSource {
    pub fn label(&self) -> String {
        match self {
            BarSource::File(path) => path.clone(),
            BarSource::Synthetic => "synthetic".to_string(),
        }
    }
}

/// Load bars from `path`; when the file is missing and `synthetic_fallback`
/// is set, generate a seeded random walk instead.
pub fn load_or_synthetic(path: impl AsRef<Path>, synthetic_fallback: bool) -> Result<(Vec<Bar>, BarSource)> {
    let path = path.as_ref();
    if path.exists() || !synthetic_fallback {
        let bars = load_bars(path)?;
        return Ok((bars, BarSource::File(path.display().to_string())));
    }
    warn!(path = %path.display(), "bar file not found, using synthetic data");
    Ok((synthetic::default_history(42), BarSource::Synthetic))
}
