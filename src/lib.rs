//! Crash Radar
//!
//! BTC/USD crash-risk engine with an oracle-priced snapshot writer and a
//! chat front end:
//! - Volatility, liquidity and leverage signals over 15-minute bars
//! - HMM regime detection, EVT tail risk and a composite crash probability
//! - FTSOv2 live prices over JSON-RPC
//! - Intent extraction and conversation through a pluggable LLM provider

pub mod agent;
pub mod avatar;
pub mod chat;
pub mod config;
pub mod desk;
pub mod engine;
pub mod error;
pub mod market;
pub mod models;
pub mod oracle;
pub mod safety;
pub mod server;
pub mod signals;
pub mod snapshot;
pub mod utils;

// Re-exports for convenience
pub use chat::ChatRouter;
pub use config::Settings;
pub use desk::RiskDesk;
pub use engine::{RiskAppetite, RiskAssessment, RiskEngine};
pub use error::{Result, RiskError};
