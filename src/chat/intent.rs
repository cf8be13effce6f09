//! User intent: what position, appetite and horizon a risk question is about.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

use crate::engine::RiskAppetite;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserIntent {
    pub position_size_btc: f64,
    pub risk_appetite: RiskAppetite,
    pub horizon_hours: u32,
    pub specific_concerns: String,
}

impl Default for UserIntent {
    fn default() -> Self {
        Self {
            position_size_btc: 1.0,
            risk_appetite: RiskAppetite::Medium,
            horizon_hours: 24,
            specific_concerns: String::new(),
        }
    }
}

const RISK_KEYWORDS: [&str; 14] = [
    "risk",
    "crash",
    "exposure",
    "volatile",
    "volatility",
    "btc",
    "bitcoin",
    "position",
    "hedge",
    "drawdown",
    "liquidation",
    "var",
    "downside",
    "portfolio",
];

const ANALYSIS_TRIGGERS: [&str; 7] = [
    "snapshot",
    "summaris",
    "summariz",
    "analy",
    "entropy",
    "what to watch",
    "state",
];

/// Longest horizon accepted from a user, one year
pub const MAX_HORIZON_HOURS: u32 = 24 * 365;

pub fn is_risk_query(message: &str) -> bool {
    let lower = message.to_lowercase();
    RISK_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Whether a conversational message should see the latest snapshot.
pub fn wants_analysis(message: &str) -> bool {
    let lower = message.to_lowercase();
    ANALYSIS_TRIGGERS.iter().any(|t| lower.contains(t))
}

fn fenced_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").unwrap())
}

fn object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)(\{.*\})").unwrap())
}

/// Parse model output that may be raw JSON, fenced JSON, or JSON wrapped in prose.
pub fn coerce_json(text: &str) -> serde_json::Result<Value> {
    let mut t = text.trim();

    if let Some(c) = fenced_re().captures(t).and_then(|c| c.get(1)) {
        t = c.as_str().trim();
    }
    if !(t.starts_with('{') && t.ends_with('}')) {
        if let Some(c) = object_re().captures(t).and_then(|c| c.get(1)) {
            t = c.as_str().trim();
        }
    }
    serde_json::from_str(t)
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Build an intent from extracted JSON. Missing fields take defaults;
/// present but unusable fields reject the whole object.
pub fn intent_from_json(value: &Value) -> Option<UserIntent> {
    let obj = value.as_object()?;
    let mut intent = UserIntent::default();

    if let Some(v) = obj.get("position_size_btc").filter(|v| !v.is_null()) {
        let size = number(v)?;
        if !(size.is_finite() && size >= 0.0) {
            return None;
        }
        intent.position_size_btc = size;
    }
    if let Some(v) = obj.get("risk_appetite").filter(|v| !v.is_null()) {
        intent.risk_appetite = v.as_str()?.parse().ok()?;
    }
    if let Some(v) = obj.get("horizon_hours").filter(|v| !v.is_null()) {
        let hours = number(v)?.round();
        if !(hours >= 1.0 && hours <= MAX_HORIZON_HOURS as f64) {
            return None;
        }
        intent.horizon_hours = hours as u32;
    }
    if let Some(v) = obj.get("specific_concerns").and_then(|v| v.as_str()) {
        intent.specific_concerns = v.to_string();
    }
    Some(intent)
}

/// Prompt asking the model to extract an intent object, and nothing else.
pub fn extraction_prompt(message: &str) -> String {
    format!(
        r#"Extract the following information from the user's message:

User message: "{}"

Return ONLY a JSON object with these fields:
{{
    "position_size_btc": <float, default 1.0 if not specified>,
    "risk_appetite": "<low|medium|high, default medium>",
    "horizon_hours": <int, default 24 if not specified>,
    "specific_concerns": "<any specific worries mentioned>"
}}

Example:
User: "I hold 2 BTC, medium risk, next 24h"
Output: {{"position_size_btc": 2.0, "risk_appetite": "medium", "horizon_hours": 24, "specific_concerns": ""}}

JSON:"#,
        message.replace('"', "'")
    )
}

fn size_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:btc|bitcoin|xbt)\b").unwrap())
}

fn horizon_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(h|hr|hrs|hour|hours|d|day|days|w|wk|week|weeks)\b").unwrap()
    })
}

fn appetite_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(low|conservative|cautious|medium|moderate|balanced|high|aggressive)\b").unwrap()
    })
}

/// Regex extraction used when the model is unavailable or returns junk.
pub fn heuristic_intent(message: &str) -> UserIntent {
    let mut intent = UserIntent {
        specific_concerns: message.to_string(),
        ..UserIntent::default()
    };

    if let Some(size) = size_re()
        .captures(message)
        .and_then(|c| c[1].parse::<f64>().ok())
    {
        intent.position_size_btc = size;
    }

    if let Some(c) = horizon_re().captures(message) {
        if let Ok(n) = c[1].parse::<u32>() {
            let unit = c[2].to_ascii_lowercase();
            let hours = match unit.chars().next() {
                Some('d') => n.saturating_mul(24),
                Some('w') => n.saturating_mul(24 * 7),
                _ => n,
            };
            if (1..=MAX_HORIZON_HOURS).contains(&hours) {
                intent.horizon_hours = hours;
            }
        }
    }

    if let Some(c) = appetite_re().captures(message) {
        intent.risk_appetite = match c[1].to_ascii_lowercase().as_str() {
            "low" | "conservative" | "cautious" => RiskAppetite::Low,
            "high" | "aggressive" => RiskAppetite::High,
            _ => RiskAppetite::Medium,
        };
    }

    intent
}
