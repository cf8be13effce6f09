//! Stress state machine behind the risk avatar.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskMode {
    #[default]
    Calm,
    Alert,
    Panic,
}

impl RiskMode {
    pub fn from_stress(stress: f64) -> Self {
        if stress < 30.0 {
            RiskMode::Calm
        } else if stress < 70.0 {
            RiskMode::Alert
        } else {
            RiskMode::Panic
        }
    }

    /// Stress shed per update; panic fades slowest.
    pub fn recovery(&self) -> f64 {
        match self {
            RiskMode::Panic => 0.15,
            RiskMode::Alert => 0.5,
            RiskMode::Calm => 1.0,
        }
    }
}

/// How strongly the avatar reacts to market moves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarProfile {
    /// 0-100
    pub risk_level: u8,
    pub max_drawdown: f64,
    pub leverage_allowed: bool,
    pub stress_sensitivity: f64,
    pub reaction_speed: f64,
}

impl Default for AvatarProfile {
    fn default() -> Self {
        Self {
            risk_level: 50,
            max_drawdown: 0.15,
            leverage_allowed: true,
            stress_sensitivity: 2.5,
            reaction_speed: 0.8,
        }
    }
}

/// Features derived from the rolling oracle price window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub price: f64,
    pub volatility: f64,
    pub drawdown: f64,
    pub drawdown_speed: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvatarState {
    pub stress_level: f64,
    pub risk_mode: RiskMode,
}

impl Default for AvatarState {
    fn default() -> Self {
        Self {
            stress_level: 20.0,
            risk_mode: RiskMode::Calm,
        }
    }
}

pub fn update_avatar_state(profile: &AvatarProfile, market: &MarketState, avatar: AvatarState) -> AvatarState {
    let shock = market.volatility.powf(1.5) * 180.0 * profile.stress_sensitivity
        + market.drawdown_speed.powf(1.3) * 500.0;
    let pain = market.drawdown.powf(1.3) * 300.0;

    let mut stress = avatar.stress_level + (shock + pain) * profile.reaction_speed * 0.01;
    stress -= avatar.risk_mode.recovery();
    let stress = stress.clamp(0.0, 100.0);

    AvatarState {
        stress_level: stress,
        risk_mode: RiskMode::from_stress(stress),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(volatility: f64, drawdown: f64, drawdown_speed: f64) -> MarketState {
        MarketState {
            price: 50_000.0,
            volatility,
            drawdown,
            drawdown_speed,
            timestamp: 0,
        }
    }

    #[test]
    fn test_quiet_market_recovers() {
        let profile = AvatarProfile::default();
        let next = update_avatar_state(&profile, &market(0.0, 0.0, 0.0), AvatarState::default());
        assert!((next.stress_level - 19.0).abs() < 1e-12);
        assert_eq!(next.risk_mode, RiskMode::Calm);
    }

    #[test]
    fn test_sharp_drawdown_panics() {
        let profile = AvatarProfile::default();
        let mut state = AvatarState::default();
        for _ in 0..30 {
            state = update_avatar_state(&profile, &market(0.5, 0.9, 0.9), state);
        }
        assert_eq!(state.risk_mode, RiskMode::Panic);
        assert!(state.stress_level <= 100.0);
    }

    #[test]
    fn test_stress_never_negative() {
        let profile = AvatarProfile::default();
        let state = AvatarState {
            stress_level: 0.2,
            risk_mode: RiskMode::Calm,
        };
        let next = update_avatar_state(&profile, &market(0.0, 0.0, 0.0), state);
        assert_eq!(next.stress_level, 0.0);
    }
}
