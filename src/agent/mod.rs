//! Agent Module
//!
//! The language model collaborator. It is only ever asked to extract intent
//! or hold a conversation; risk numbers never come from here.

mod provider;

pub use provider::{LLMProvider, OllamaProvider, OpenAICompatibleProvider, SimulatedProvider};

use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ProviderKind, Settings};

/// Build the provider selected by `settings`.
pub fn provider_from_settings(settings: &Settings) -> Arc<dyn LLMProvider> {
    let provider: Arc<dyn LLMProvider> = match settings.llm_provider {
        ProviderKind::Simulated => Arc::new(SimulatedProvider),
        ProviderKind::Ollama => Arc::new(OllamaProvider::from_url(&settings.llm_base_url)),
        ProviderKind::OpenAi => {
            if settings.api_key().is_none() {
                warn!("GEMINI_API_KEY is empty; model calls will likely be rejected");
            }
            Arc::new(OpenAICompatibleProvider::new(
                settings.llm_base_url.clone(),
                settings.api_key(),
            ))
        }
    };
    info!(provider = provider.name(), model = %settings.gemini_model, "LLM provider ready");
    provider
}
