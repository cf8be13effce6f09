//! Snapshot Writer
//!
//! The snapshot is the one persisted artifact: a JSON document holding the
//! latest price and a full risk assessment. Writers replace the file
//! atomically so readers never see a partial document.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::desk::RiskDesk;
use crate::engine::{RiskAppetite, RiskAssessment};
use crate::error::{Result, RiskError};
use crate::oracle::{OraclePrice, PriceSource};

pub const ASSET: &str = "BTC/USD";
pub const PRICE_SOURCE_ORACLE: &str = "FTSOv2";
pub const PRICE_SOURCE_CLOSE: &str = "ohlcv_close";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub asset: String,
    pub price: f64,
    pub price_source: String,
    pub oracle_timestamp: Option<u64>,
    /// Where the bars came from
    pub source: String,
    pub risk: Value,
}

/// Oracle price if the source answers with a usable one.
///
/// An oracle failure is not fatal: callers fall back to the last close.
pub async fn oracle_price(price_source: Option<&dyn PriceSource>) -> Option<OraclePrice> {
    let source = price_source?;
    match source.latest_price().await {
        Ok(p) if p.is_usable() => Some(p),
        Ok(p) => {
            warn!(source = source.name(), price = p.price, "oracle returned an unusable price");
            None
        }
        Err(e) => {
            warn!(source = source.name(), error = %e, "oracle unavailable, using last close");
            None
        }
    }
}

/// Wrap an assessment with the best available price.
pub fn assemble(assessment: &RiskAssessment, oracle: Option<OraclePrice>, source_label: &str) -> Result<Snapshot> {
    let (price, price_source, oracle_timestamp) = match oracle {
        Some(p) => (p.price, PRICE_SOURCE_ORACLE, Some(p.timestamp)),
        None => (assessment.last_close, PRICE_SOURCE_CLOSE, None),
    };

    Ok(Snapshot {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        asset: ASSET.to_string(),
        price,
        price_source: price_source.to_string(),
        oracle_timestamp,
        source: source_label.to_string(),
        risk: serde_json::to_value(assessment)?,
    })
}

/// Fetch the oracle price, evaluate the desk on the blocking pool and wrap
/// the result.
pub async fn build(
    desk: Arc<RiskDesk>,
    price_source: Option<&dyn PriceSource>,
    appetite: RiskAppetite,
    horizon_hours: u32,
) -> Result<Snapshot> {
    let oracle = oracle_price(price_source).await;
    let source_label = desk.source().label();
    let assessment = desk
        .evaluate_blocking(appetite, horizon_hours, oracle.map(|p| p.price))
        .await?;
    assemble(&assessment, oracle, &source_label)
}

/// Write into a unique temp file beside `path`, then rename it over `path`.
pub fn write_atomic(path: impl AsRef<Path>, snapshot: &Snapshot) -> Result<()> {
    let path = path.as_ref();
    if path.file_name().is_none() {
        return Err(RiskError::Config(format!("invalid snapshot path: {}", path.display())));
    }
    let parent = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            std::fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(parent)?;
    serde_json::to_writer_pretty(&mut tmp, snapshot)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| RiskError::Io(e.error))?;
    info!(path = %path.display(), price = snapshot.price, "snapshot written");
    Ok(())
}

/// Latest snapshot as raw JSON; `None` when missing or unreadable.
pub fn load(path: impl AsRef<Path>) -> Option<Value> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read snapshot");
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot is not valid JSON");
            None
        }
    }
}
