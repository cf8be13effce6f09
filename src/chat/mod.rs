//! Chat Router
//!
//! Routes a user message to a command, a deterministic risk analysis, or a
//! free-form conversation with the language model. The model only ever
//! extracts intent or talks; the numbers come from the engine.

pub mod format;
pub mod intent;
pub mod prompts;

pub use intent::{coerce_json, heuristic_intent, is_risk_query, wants_analysis, UserIntent};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::agent::LLMProvider;
use crate::desk::{self, RiskDesk};
use crate::oracle::PriceSource;
use crate::safety::{GuardError, SafetyGuard};
use crate::snapshot;
use crate::utils::log_preview;

pub const RISK_UNAVAILABLE: &str =
    "Risk analysis is currently unavailable. Please ensure btc_15m_data.csv is present or contact support.";
pub const UNEXPECTED_RESPONSE: &str = "Sorry, I got an unexpected response from the server.";

/// Conversation turns kept for context
const MAX_HISTORY: usize = 6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("model provider failed: {0}")]
    Provider(anyhow::Error),
}

pub struct ChatRouter {
    provider: Arc<dyn LLMProvider>,
    model: String,
    desk: Option<Arc<RiskDesk>>,
    price_source: Option<Arc<dyn PriceSource>>,
    snapshot_path: PathBuf,
    guard: Mutex<SafetyGuard>,
    history: Mutex<Vec<(String, String)>>,
}

impl ChatRouter {
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            desk: None,
            price_source: None,
            snapshot_path: PathBuf::from("shared/latest_update.json"),
            guard: Mutex::new(SafetyGuard::default()),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn with_desk(mut self, desk: Option<Arc<RiskDesk>>) -> Self {
        self.desk = desk;
        self
    }

    pub fn with_price_source(mut self, source: Arc<dyn PriceSource>) -> Self {
        self.price_source = Some(source);
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    pub fn with_guard(mut self, guard: SafetyGuard) -> Self {
        self.guard = Mutex::new(guard);
        self
    }

    fn guard(&self) -> MutexGuard<'_, SafetyGuard> {
        self.guard.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn history(&self) -> MutexGuard<'_, Vec<(String, String)>> {
        self.history.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn handle(&self, message: &str) -> Result<ChatReply, ChatError> {
        self.guard().validate_input(message)?;
        let text = message.trim();
        debug!(message = %log_preview(text), "chat message");

        if text.starts_with('/') {
            return Ok(ChatReply {
                response: self.handle_command(text),
            });
        }

        if is_risk_query(text) {
            info!("routing message to risk analysis");
            return Ok(ChatReply {
                response: self.handle_risk(text).await,
            });
        }

        self.handle_conversation(text).await
    }

    fn handle_command(&self, command: &str) -> String {
        match command.split_whitespace().next() {
            Some("/reset") => {
                self.provider.reset();
                self.history().clear();
                info!("chat session reset");
                "Reset complete".to_string()
            }
            _ => "Unknown command".to_string(),
        }
    }

    async fn handle_risk(&self, text: &str) -> String {
        let Some(desk) = self.desk.clone() else {
            return RISK_UNAVAILABLE.to_string();
        };

        let intent = self.extract_intent(text).await;
        let live = desk::live_price(self.price_source.as_deref()).await;

        match desk
            .evaluate_blocking(intent.risk_appetite, intent.horizon_hours, live)
            .await
        {
            Ok(assessment) => format::format_assessment(&intent, &assessment),
            Err(e) => {
                warn!(error = %e, "risk analysis failed");
                format!(
                    "Risk analysis encountered an error: {}\n\nPlease try again or contact support if the issue persists.",
                    e
                )
            }
        }
    }

    async fn extract_intent(&self, text: &str) -> UserIntent {
        let allowed = self.guard().check_llm_call();
        if allowed.is_err() {
            debug!("intent extraction over budget, using heuristic");
            return heuristic_intent(text);
        }

        let raw = self
            .provider
            .generate(
                &self.model,
                intent::extraction_prompt(text),
                Some(prompts::INTENT_SYSTEM.to_string()),
            )
            .await;

        match raw {
            Ok(raw) => match coerce_json(&raw).ok().and_then(|v| intent::intent_from_json(&v)) {
                Some(mut intent) => {
                    if intent.specific_concerns.is_empty() {
                        intent.specific_concerns = text.to_string();
                    }
                    intent
                }
                None => {
                    warn!("unusable intent from model, using heuristic");
                    heuristic_intent(text)
                }
            },
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "intent extraction failed");
                heuristic_intent(text)
            }
        }
    }

    async fn handle_conversation(&self, text: &str) -> Result<ChatReply, ChatError> {
        self.guard().check_llm_call()?;

        let snapshot = if wants_analysis(text) {
            snapshot::load(&self.snapshot_path)
        } else {
            None
        };
        let history = self.history().clone();
        let prompt = prompts::conversation_prompt(text, snapshot.as_ref(), &history);

        let out = self
            .provider
            .generate(&self.model, prompt, Some(prompts::CONVERSATION_SYSTEM.to_string()))
            .await
            .map_err(ChatError::Provider)?;

        let response = match out.trim() {
            "" => UNEXPECTED_RESPONSE.to_string(),
            trimmed => trimmed.to_string(),
        };

        let mut history = self.history();
        history.push((text.to_string(), response.clone()));
        if history.len() > MAX_HISTORY {
            let excess = history.len() - MAX_HISTORY;
            history.drain(..excess);
        }

        Ok(ChatReply { response })
    }
}
