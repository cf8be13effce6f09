//! CSV persistence for bar series.
//!
//! The loader accepts exchange dumps with extra columns: the first header
//! containing "time" is the timestamp, and `open/high/low/close/volume` are
//! matched case-insensitively (spaces are treated as underscores).

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use csv::{Reader, StringRecord, Writer};
use std::fs::File;
use std::path::Path;

use super::bar::{normalize, Bar};
use crate::error::{Result, RiskError};

struct Columns {
    time: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim().to_lowercase().replace(' ', "_"))
            .collect();
        let find = |name: &str| {
            names
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| RiskError::Data(format!("missing column '{}'", name)))
        };
        let time = names
            .iter()
            .position(|h| h.contains("time"))
            .ok_or_else(|| RiskError::Data("no timestamp column".to_string()))?;
        Ok(Self {
            time,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
        })
    }
}

/// Parse epoch milliseconds, RFC 3339, or `%Y-%m-%d %H:%M:%S` (UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Utc
            .timestamp_millis_opt(ms)
            .single()
            .ok_or_else(|| RiskError::Data(format!("timestamp out of range: {}", raw)));
    }
    if let Ok(ms) = raw.parse::<f64>() {
        return Utc
            .timestamp_millis_opt(ms as i64)
            .single()
            .ok_or_else(|| RiskError::Data(format!("timestamp out of range: {}", raw)));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| RiskError::Data(format!("unparseable timestamp: {}", raw)))
}

fn field(record: &StringRecord, idx: usize, name: &str, line: usize) -> Result<f64> {
    record
        .get(idx)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .ok_or_else(|| RiskError::Data(format!("row {}: invalid {}", line, name)))
}

/// Load bars from a CSV file, sorted and de-duplicated.
pub fn load_bars(path: impl AsRef<Path>) -> Result<Vec<Bar>> {
    let file = File::open(path.as_ref())?;
    let mut reader = Reader::from_reader(file);
    let cols = Columns::resolve(reader.headers()?)?;

    let mut bars = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let line = i + 2;
        let raw_time = record
            .get(cols.time)
            .ok_or_else(|| RiskError::Data(format!("row {}: missing timestamp", line)))?;
        bars.push(Bar {
            timestamp: parse_timestamp(raw_time)?,
            open: field(&record, cols.open, "open", line)?,
            high: field(&record, cols.high, "high", line)?,
            low: field(&record, cols.low, "low", line)?,
            close: field(&record, cols.close, "close", line)?,
            volume: field(&record, cols.volume, "volume", line)?,
        });
    }

    tracing::debug!(path = %path.as_ref().display(), rows = bars.len(), "loaded bars");
    Ok(normalize(bars))
}

/// Write bars as `open_time,open,high,low,close,volume` with millisecond open times.
pub fn save_bars(path: impl AsRef<Path>, bars: &[Bar]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path.as_ref())?;
    let mut writer = Writer::from_writer(file);
    writer.write_record(["open_time", "open", "high", "low", "close", "volume"])?;
    for bar in bars {
        writer.write_record([
            bar.open_time_ms().to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
            bar.volume.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_timestamp_formats() {
        let ms = parse_timestamp("1700000000000").unwrap();
        assert_eq!(ms.timestamp(), 1_700_000_000);
        let rfc = parse_timestamp("2024-01-01T00:15:00Z").unwrap();
        assert_eq!(rfc.timestamp() % 900, 0);
        let plain = parse_timestamp("2024-01-01 00:15:00").unwrap();
        assert_eq!(plain, rfc);
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_load_binance_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bars.csv");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "open_time,open,high,low,close,volume,close_time,quote_asset_volume").unwrap();
        writeln!(f, "1700000900000,2,3,1,2.5,10,1700001799999,25").unwrap();
        writeln!(f, "1700000000000,1,2,0.5,1.5,12,1700000899999,18").unwrap();
        drop(f);

        let bars = load_bars(&path).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 1.5);
        assert_eq!(bars[1].volume, 10.0);
    }

    #[test]
    fn test_save_then_load_preserves_series() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.csv");
        let ts = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let bars = vec![Bar::new(ts, 1.0, 2.0, 0.5, 1.5, 42.0)];
        save_bars(&path, &bars).unwrap();
        assert_eq!(load_bars(&path).unwrap(), bars);
    }

    #[test]
    fn test_missing_column_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "timestamp,open,high,low,close\n1,1,1,1,1\n").unwrap();
        let err = load_bars(&path).unwrap_err();
        assert!(err.to_string().contains("volume"));
    }
}
