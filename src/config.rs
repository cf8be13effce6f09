//! Runtime settings from the environment (and `.env`).

use std::env;
use std::fmt;

use crate::error::{Result, RiskError};
use crate::oracle::ftso::DEFAULT_RPC_URL;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Gemini through its OpenAI-compatible endpoint, or any other such endpoint
    OpenAi,
    Ollama,
    Simulated,
}

#[derive(Clone)]
pub struct Settings {
    pub simulate_ai: bool,
    pub llm_provider: ProviderKind,
    pub llm_base_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub web3_provider_url: String,
    pub latest_update_path: String,
    pub bars_path: String,
    pub risk_params_path: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub synthetic_fallback: bool,
    pub avatar_poll_secs: u64,
    pub llm_calls_per_minute: u32,
    pub log_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            simulate_ai: false,
            llm_provider: ProviderKind::OpenAi,
            llm_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_api_key: String::new(),
            gemini_model: "gemini-1.5-flash".to_string(),
            web3_provider_url: DEFAULT_RPC_URL.to_string(),
            latest_update_path: "shared/latest_update.json".to_string(),
            bars_path: "data/btc_15m_data.csv".to_string(),
            risk_params_path: "config/parameters.yaml".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            cors_origins: vec!["*".to_string()],
            synthetic_fallback: true,
            avatar_poll_secs: 60,
            llm_calls_per_minute: 30,
            log_dir: None,
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(RiskError::Config(format!("{} must be a boolean, got {:?}", key, other))),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| RiskError::Config(format!("{} must be a number, got {:?}", key, raw)))
}

impl Settings {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();

        if let Some(v) = lookup("SIMULATE_AI") {
            s.simulate_ai = parse_bool("SIMULATE_AI", &v)?;
        }
        if let Some(v) = lookup("LLM_PROVIDER") {
            s.llm_provider = match v.trim().to_ascii_lowercase().as_str() {
                "openai" | "gemini" => ProviderKind::OpenAi,
                "ollama" => ProviderKind::Ollama,
                "simulated" | "dummy" => ProviderKind::Simulated,
                other => return Err(RiskError::Config(format!("unknown LLM_PROVIDER: {}", other))),
            };
            if s.llm_provider == ProviderKind::Ollama {
                s.llm_base_url = DEFAULT_OLLAMA_URL.to_string();
            }
        }
        if s.simulate_ai {
            s.llm_provider = ProviderKind::Simulated;
        }
        if let Some(v) = lookup("LLM_BASE_URL") {
            s.llm_base_url = v;
        }
        if let Some(v) = lookup("GEMINI_API_KEY") {
            s.gemini_api_key = v;
        }
        if let Some(v) = lookup("GEMINI_MODEL") {
            s.gemini_model = v;
        }
        if let Some(v) = lookup("WEB3_PROVIDER_URL") {
            s.web3_provider_url = v;
        }
        if let Some(v) = lookup("LATEST_UPDATE_PATH") {
            s.latest_update_path = v;
        }
        if let Some(v) = lookup("BARS_PATH") {
            s.bars_path = v;
        }
        if let Some(v) = lookup("RISK_PARAMS_PATH") {
            s.risk_params_path = v;
        }
        if let Some(v) = lookup("BIND_ADDR") {
            s.bind_addr = v;
        }
        if let Some(v) = lookup("CORS_ORIGINS") {
            s.cors_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = lookup("SYNTHETIC_FALLBACK") {
            s.synthetic_fallback = parse_bool("SYNTHETIC_FALLBACK", &v)?;
        }
        if let Some(v) = lookup("AVATAR_POLL_SECS") {
            s.avatar_poll_secs = parse_num("AVATAR_POLL_SECS", &v)?;
        }
        if let Some(v) = lookup("LLM_CALLS_PER_MINUTE") {
            s.llm_calls_per_minute = parse_num("LLM_CALLS_PER_MINUTE", &v)?;
        }
        s.log_dir = lookup("LOG_DIR").filter(|v| !v.trim().is_empty());

        Ok(s)
    }

    pub fn api_key(&self) -> Option<String> {
        Some(self.gemini_api_key.clone()).filter(|k| !k.is_empty())
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = if self.gemini_api_key.is_empty() { "" } else { "***REDACTED***" };
        f.debug_struct("Settings")
            .field("simulate_ai", &self.simulate_ai)
            .field("llm_provider", &self.llm_provider)
            .field("llm_base_url", &self.llm_base_url)
            .field("gemini_api_key", &key)
            .field("gemini_model", &self.gemini_model)
            .field("web3_provider_url", &self.web3_provider_url)
            .field("latest_update_path", &self.latest_update_path)
            .field("bars_path", &self.bars_path)
            .field("risk_params_path", &self.risk_params_path)
            .field("bind_addr", &self.bind_addr)
            .field("cors_origins", &self.cors_origins)
            .field("synthetic_fallback", &self.synthetic_fallback)
            .field("avatar_poll_secs", &self.avatar_poll_secs)
            .field("llm_calls_per_minute", &self.llm_calls_per_minute)
            .field("log_dir", &self.log_dir)
            .finish()
    }
}
