//! Deterministic rendering of a `RiskAssessment` for chat.

use std::fmt::Write;

use super::intent::UserIntent;
use crate::engine::RiskAssessment;

pub fn risk_level(crash_prob: f64) -> &'static str {
    if crash_prob > 0.6 {
        "HIGH RISK"
    } else if crash_prob > 0.3 {
        "MEDIUM RISK"
    } else {
        "LOW RISK"
    }
}

/// `0.1234` → `12.3%` for one decimal; NaN renders as `n/a`.
pub fn pct(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}%", decimals, value * 100.0)
    } else {
        "n/a".to_string()
    }
}

/// `64250.5` → `64,250.50`
pub fn with_thousands(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac)
}

fn num(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals, value)
    } else {
        "n/a".to_string()
    }
}

/// Markdown reply for a risk question.
pub fn format_assessment(intent: &UserIntent, a: &RiskAssessment) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "📊 **Risk Analysis for {:?} BTC ({} risk profile)**\n",
        intent.position_size_btc, a.profile
    );
    let _ = writeln!(
        out,
        "**Crash Probability ({}h):** {} ({})",
        a.horizon_hours,
        pct(a.crash_prob, 1),
        risk_level(a.crash_prob)
    );

    let _ = writeln!(out, "\n**Market Regime:** {}", a.regime);
    for (name, p) in [
        ("Calm", a.regime_probs.calm),
        ("Volatile", a.regime_probs.volatile),
        ("Crash", a.regime_probs.crash),
    ] {
        let _ = writeln!(out, "  - {}: {}", name, pct(p, 1));
    }

    let lcvi_flag = if a.lcvi > 2.0 { "⚠️ ELEVATED" } else { "✓ Normal" };
    let _ = writeln!(out, "\n**LCVI:** {} {}", num(a.lcvi, 2), lcvi_flag);
    let _ = writeln!(out, "**Realized Volatility:** {} annualized", pct(a.realized_vol, 1));
    let _ = writeln!(out, "**99% VaR (1-day):** {} potential loss", pct(a.var_1d, 1));
    let _ = writeln!(out, "**Expected Shortfall:** {}", pct(a.es_1d, 1));
    if a.horizon_hours != 24 {
        let _ = writeln!(
            out,
            "**99% VaR ({}h):** {} potential loss",
            a.horizon_hours,
            pct(a.var_horizon, 1)
        );
    }

    let _ = writeln!(
        out,
        "\n**Recommended Exposure:** {} of position",
        pct(a.recommended_exposure, 0)
    );
    let _ = writeln!(out, "**Rationale:** {}", a.exposure_rationale);

    let _ = writeln!(out, "\n_Current BTC Price: ${}_", with_thousands(a.current_price));
    let _ = write!(out, "_Analysis Time: {}_", a.analysis_timestamp);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RiskAppetite;
    use crate::models::{Regime, RegimeProbs};

    fn assessment() -> RiskAssessment {
        RiskAssessment {
            crash_prob: 0.45,
            regime: Regime::Volatile,
            regime_probs: RegimeProbs {
                calm: 0.2,
                volatile: 0.7,
                crash: 0.1,
            },
            lcvi: 2.5,
            vol_regime: 1.4,
            realized_vol: 0.62,
            var_1d: 0.051,
            es_1d: 0.072,
            var_horizon: 0.051,
            es_horizon: 0.072,
            tail_shape: 0.21,
            recommended_exposure: 0.5,
            exposure_rationale: "Reduced exposure due to: crash_prob=0.45 (MEDIUM)".to_string(),
            current_price: 64250.5,
            last_close: 64000.0,
            horizon_hours: 24,
            profile: RiskAppetite::Medium,
            analysis_timestamp: "2024-05-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_helpers() {
        assert_eq!(risk_level(0.61), "HIGH RISK");
        assert_eq!(risk_level(0.6), "MEDIUM RISK");
        assert_eq!(risk_level(0.3), "LOW RISK");
        assert_eq!(pct(0.1234, 1), "12.3%");
        assert_eq!(pct(f64::NAN, 1), "n/a");
        assert_eq!(with_thousands(1234567.891), "1,234,567.89");
        assert_eq!(with_thousands(999.0), "999.00");
        assert_eq!(with_thousands(-1000.0), "-1,000.00");
    }

    #[test]
    fn test_format_assessment() {
        let text = format_assessment(&UserIntent::default(), &assessment());
        assert!(text.contains("Risk Analysis for 1.0 BTC (medium risk profile)"));
        assert!(text.contains("**Crash Probability (24h):** 45.0% (MEDIUM RISK)"));
        assert!(text.contains("**Market Regime:** Volatile"));
        assert!(text.contains("**LCVI:** 2.50 ⚠️ ELEVATED"));
        assert!(text.contains("**Recommended Exposure:** 50% of position"));
        assert!(text.contains("_Current BTC Price: $64,250.50_"));
        assert!(!text.contains("VaR (24h)"));
    }

    #[test]
    fn test_format_shows_horizon_var_and_nan() {
        let mut a = assessment();
        a.horizon_hours = 6;
        a.lcvi = f64::NAN;
        let text = format_assessment(&UserIntent::default(), &a);
        assert!(text.contains("**99% VaR (6h):**"));
        assert!(text.contains("**LCVI:** n/a ✓ Normal"));
    }
}
