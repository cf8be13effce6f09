//! Full pipeline: CSV on disk → desk → assessment.

use std::path::PathBuf;

use crash_radar::market::{save_bars, synthetic::random_walk, BarSource};
use crash_radar::engine::RiskProfile;
use crash_radar::{RiskAppetite, RiskDesk, RiskError};

fn repo_params() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/parameters.yaml")
}

fn desk_from_csv(bars: usize, vol: f64, seed: u64) -> (tempfile::TempDir, RiskDesk) {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("btc_15m_data.csv");
    save_bars(&csv, &random_walk(bars, 60_000.0, vol, seed)).unwrap();
    let desk = RiskDesk::load(repo_params(), &csv, false).unwrap();
    (dir, desk)
}

#[test]
fn test_assessment_invariants() {
    let (_dir, desk) = desk_from_csv(1500, 0.006, 21);
    assert!(matches!(desk.source(), BarSource::File(_)));

    for appetite in [RiskAppetite::Low, RiskAppetite::Medium, RiskAppetite::High] {
        let a = desk.evaluate(appetite, 24, None).unwrap();
        assert!((0.0..=1.0).contains(&a.crash_prob));
        let probs = a.regime_probs.calm + a.regime_probs.volatile + a.regime_probs.crash;
        assert!((probs - 1.0).abs() < 1e-6);
        let cap = RiskProfile::for_appetite(appetite).max_exposure_normal;
        assert!(a.recommended_exposure >= 0.0 && a.recommended_exposure <= cap);
        assert!(a.var_1d.is_finite() && a.var_1d > 0.0);
        assert!(a.es_1d.is_finite() && a.es_1d > 0.0);
        assert!(!a.exposure_rationale.is_empty());
        assert_eq!(a.current_price, a.last_close);
        assert_eq!(a.profile, appetite);
    }
}

#[test]
fn test_evaluation_is_deterministic() {
    let (_dir, desk) = desk_from_csv(1200, 0.008, 4);
    let a = desk.evaluate(RiskAppetite::Medium, 12, None).unwrap();
    let b = desk.evaluate(RiskAppetite::Medium, 12, None).unwrap();
    assert_eq!(a.crash_prob, b.crash_prob);
    assert_eq!(a.regime, b.regime);
    assert_eq!(a.var_horizon, b.var_horizon);
    assert_eq!(a.recommended_exposure, b.recommended_exposure);
}

#[test]
fn test_strict_load_rejects_short_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv = dir.path().join("short.csv");
    save_bars(&csv, &random_walk(50, 60_000.0, 0.01, 1)).unwrap();
    let err = RiskDesk::load(repo_params(), &csv, false).err().unwrap();
    assert!(matches!(err, RiskError::InsufficientData { got: 50, .. }));
}

#[tokio::test]
async fn test_blocking_evaluation_matches_inline() {
    let (_dir, desk) = desk_from_csv(1200, 0.006, 9);
    let desk = std::sync::Arc::new(desk);
    let inline = desk.evaluate(RiskAppetite::High, 24, Some(61_000.0)).unwrap();
    let pooled = desk
        .clone()
        .evaluate_blocking(RiskAppetite::High, 24, Some(61_000.0))
        .await
        .unwrap();
    assert_eq!(inline.crash_prob, pooled.crash_prob);
    assert_eq!(pooled.current_price, 61_000.0);
}
