//! User risk profiles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::RiskError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskAppetite {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskAppetite {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskAppetite::Low => "low",
            RiskAppetite::Medium => "medium",
            RiskAppetite::High => "high",
        }
    }
}

impl fmt::Display for RiskAppetite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskAppetite {
    type Err = RiskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskAppetite::Low),
            "medium" => Ok(RiskAppetite::Medium),
            "high" => Ok(RiskAppetite::High),
            other => Err(RiskError::Config(format!("unknown risk appetite: {}", other))),
        }
    }
}

/// Exposure limits and crash-signal weights for one appetite
#[derive(Debug, Clone, PartialEq)]
pub struct RiskProfile {
    pub appetite: RiskAppetite,
    pub crash_cutoff_high: f64,
    pub crash_cutoff_medium: f64,
    pub max_exposure_normal: f64,
    pub max_exposure_stress: f64,
    pub weights: BTreeMap<&'static str, f64>,
}

impl RiskProfile {
    pub fn low() -> Self {
        Self {
            appetite: RiskAppetite::Low,
            crash_cutoff_high: 0.5,
            crash_cutoff_medium: 0.25,
            max_exposure_normal: 0.6,
            max_exposure_stress: 0.1,
            weights: BTreeMap::from([
                ("regime_prob", 0.30),
                ("lcvi", 0.25),
                ("evt_tail", 0.20),
                ("vol_regime", 0.15),
                ("dd_velocity", 0.10),
            ]),
        }
    }

    pub fn medium() -> Self {
        Self {
            appetite: RiskAppetite::Medium,
            crash_cutoff_high: 0.6,
            crash_cutoff_medium: 0.3,
            max_exposure_normal: 1.0,
            max_exposure_stress: 0.3,
            weights: BTreeMap::from([
                ("regime_prob", 0.25),
                ("lcvi", 0.20),
                ("evt_tail", 0.15),
                ("vol_regime", 0.15),
                ("dd_velocity", 0.12),
                ("funding_stress", 0.08),
                ("illiquidity", 0.05),
            ]),
        }
    }

    pub fn high() -> Self {
        Self {
            appetite: RiskAppetite::High,
            crash_cutoff_high: 0.7,
            crash_cutoff_medium: 0.4,
            max_exposure_normal: 1.5,
            max_exposure_stress: 0.5,
            weights: BTreeMap::from([
                ("regime_prob", 0.20),
                ("lcvi", 0.18),
                ("evt_tail", 0.12),
                ("vol_regime", 0.15),
                ("dd_velocity", 0.15),
                ("funding_stress", 0.10),
                ("illiquidity", 0.10),
            ]),
        }
    }

    pub fn for_appetite(appetite: RiskAppetite) -> Self {
        match appetite {
            RiskAppetite::Low => Self::low(),
            RiskAppetite::Medium => Self::medium(),
            RiskAppetite::High => Self::high(),
        }
    }
}

impl From<RiskAppetite> for RiskProfile {
    fn from(appetite: RiskAppetite) -> Self {
        Self::for_appetite(appetite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        for appetite in [RiskAppetite::Low, RiskAppetite::Medium, RiskAppetite::High] {
            let total: f64 = RiskProfile::for_appetite(appetite).weights.values().sum();
            assert!((total - 1.0).abs() < 1e-9, "{} sums to {}", appetite, total);
        }
    }

    #[test]
    fn test_appetite_parsing() {
        assert_eq!("HIGH".parse::<RiskAppetite>().unwrap(), RiskAppetite::High);
        assert_eq!(" low ".parse::<RiskAppetite>().unwrap(), RiskAppetite::Low);
        assert!("reckless".parse::<RiskAppetite>().is_err());
        let json = serde_json::to_string(&RiskAppetite::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn test_profiles_get_more_permissive() {
        let low = RiskProfile::low();
        let high = RiskProfile::high();
        assert!(low.max_exposure_normal < high.max_exposure_normal);
        assert!(low.crash_cutoff_high < high.crash_cutoff_high);
    }
}
