use std::sync::Arc;

use crash_radar::market::{synthetic::random_walk, BarSource};
use crash_radar::oracle::StaticPriceSource;
use crash_radar::snapshot::{self, PRICE_SOURCE_CLOSE, PRICE_SOURCE_ORACLE};
use crash_radar::{RiskAppetite, RiskDesk, RiskEngine};

fn desk(seed: u64, source: BarSource) -> Arc<RiskDesk> {
    Arc::new(RiskDesk::new(RiskEngine::default(), random_walk(1000, 60_000.0, 0.005, seed), source))
}

#[tokio::test]
async fn test_snapshot_uses_oracle_price() {
    let oracle = StaticPriceSource::new(65_432.1, 1_700_000_000);
    let snap = snapshot::build(desk(12, BarSource::File("test.csv".into())), Some(&oracle), RiskAppetite::Medium, 24)
        .await
        .unwrap();

    assert_eq!(snap.asset, "BTC/USD");
    assert_eq!(snap.price, 65_432.1);
    assert_eq!(snap.price_source, PRICE_SOURCE_ORACLE);
    assert_eq!(snap.oracle_timestamp, Some(1_700_000_000));
    assert_eq!(snap.source, "test.csv");
    assert_eq!(snap.risk["current_price"], 65_432.1);
    assert_eq!(snap.risk["profile"], "medium");
}

#[tokio::test]
async fn test_snapshot_falls_back_to_close() {
    let desk = desk(13, BarSource::File("test.csv".into()));
    let last_close = desk.bars().last().unwrap().close;
    let down = StaticPriceSource::unavailable();
    let snap = snapshot::build(desk, Some(&down), RiskAppetite::Low, 24).await.unwrap();

    assert_eq!(snap.price, last_close);
    assert_eq!(snap.price_source, PRICE_SOURCE_CLOSE);
    assert_eq!(snap.oracle_timestamp, None);
}

#[tokio::test]
async fn test_write_then_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared").join("latest_update.json");
    assert!(snapshot::load(&path).is_none());

    let snap = snapshot::build(desk(14, BarSource::Synthetic), None, RiskAppetite::High, 6)
        .await
        .unwrap();
    assert_eq!(snap.source, "synthetic");
    snapshot::write_atomic(&path, &snap).unwrap();

    let loaded = snapshot::load(&path).unwrap();
    assert_eq!(loaded["asset"], "BTC/USD");
    assert_eq!(loaded["risk"]["horizon_hours"], 6);
    let parsed: snapshot::Snapshot = serde_json::from_value(loaded).unwrap();
    assert!((parsed.price - snap.price).abs() < 1e-6);
    assert_eq!(std::fs::read_dir(dir.path().join("shared")).unwrap().count(), 1);
}

#[tokio::test]
async fn test_snapshot_ignores_zero_oracle_price() {
    let desk = desk(15, BarSource::Synthetic);
    let last_close = desk.bars().last().unwrap().close;
    let broken = StaticPriceSource::new(0.0, 1_700_000_000);
    let snap = snapshot::build(desk, Some(&broken), RiskAppetite::Medium, 24).await.unwrap();
    assert_eq!(snap.price, last_close);
    assert_eq!(snap.price_source, PRICE_SOURCE_CLOSE);
}
