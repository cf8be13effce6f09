//! Exposure recommendation rules.

use super::params::Thresholds;
use super::profile::RiskProfile;
use crate::models::Regime;

pub const FULL_EXPOSURE_RATIONALE: &str = "Normal market conditions - full exposure";

/// Each breached rule caps the exposure and adds a reason.
pub fn recommend_exposure(
    crash_prob: f64,
    lcvi: f64,
    regime: Regime,
    profile: &RiskProfile,
    thresholds: &Thresholds,
) -> (f64, String) {
    let mut reasons = Vec::new();
    let mut exposure = profile.max_exposure_normal;

    if crash_prob > profile.crash_cutoff_high {
        exposure = exposure.min(profile.max_exposure_stress);
        reasons.push(format!("crash_prob={:.2} (HIGH)", crash_prob));
    } else if crash_prob > profile.crash_cutoff_medium {
        exposure = exposure.min(profile.max_exposure_normal * 0.6);
        reasons.push(format!("crash_prob={:.2} (MEDIUM)", crash_prob));
    }

    if lcvi > thresholds.lcvi_critical {
        exposure = exposure.min(profile.max_exposure_stress);
        reasons.push(format!("LCVI={:.2} (CRITICAL)", lcvi));
    } else if lcvi > thresholds.lcvi_warning {
        exposure = exposure.min(profile.max_exposure_normal * 0.7);
        reasons.push(format!("LCVI={:.2} (WARNING)", lcvi));
    }

    match regime {
        Regime::Crash => {
            exposure = exposure.min(profile.max_exposure_stress);
            reasons.push("regime=Crash".to_string());
        }
        Regime::Volatile => {
            exposure = exposure.min(profile.max_exposure_normal * 0.8);
            reasons.push("regime=Volatile".to_string());
        }
        Regime::Calm => {}
    }

    let rationale = if reasons.is_empty() {
        FULL_EXPOSURE_RATIONALE.to_string()
    } else {
        format!("Reduced exposure due to: {}", reasons.join(", "))
    };
    (exposure, rationale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calm_market_gets_full_exposure() {
        let profile = RiskProfile::medium();
        let (exposure, rationale) =
            recommend_exposure(0.1, 1.0, Regime::Calm, &profile, &Thresholds::default());
        assert_eq!(exposure, 1.0);
        assert_eq!(rationale, FULL_EXPOSURE_RATIONALE);
    }

    #[test]
    fn test_reasons_accumulate_and_cap() {
        let profile = RiskProfile::medium();
        let (exposure, rationale) =
            recommend_exposure(0.45, 2.5, Regime::Volatile, &profile, &Thresholds::default());
        assert!((exposure - 0.6).abs() < 1e-12);
        assert_eq!(
            rationale,
            "Reduced exposure due to: crash_prob=0.45 (MEDIUM), LCVI=2.50 (WARNING), regime=Volatile"
        );
    }

    #[test]
    fn test_stress_cap_wins() {
        let profile = RiskProfile::low();
        let (exposure, rationale) =
            recommend_exposure(0.9, 3.5, Regime::Crash, &profile, &Thresholds::default());
        assert_eq!(exposure, 0.1);
        assert!(rationale.contains("(HIGH)"));
        assert!(rationale.contains("(CRITICAL)"));
        assert!(rationale.ends_with("regime=Crash"));
    }

    #[test]
    fn test_nan_lcvi_triggers_nothing() {
        let profile = RiskProfile::high();
        let (exposure, _) =
            recommend_exposure(0.0, f64::NAN, Regime::Calm, &profile, &Thresholds::default());
        assert_eq!(exposure, 1.5);
    }
}
