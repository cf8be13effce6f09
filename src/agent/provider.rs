use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use crate::utils::truncate::{truncate_text, TruncationPolicy};

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String>;

    fn name(&self) -> &str;

    /// Drop any provider-side session state.
    fn reset(&self) {}
}

pub struct OllamaProvider {
    client: ollama_rs::Ollama,
}

impl OllamaProvider {
    pub fn new(client: ollama_rs::Ollama) -> Self {
        Self { client }
    }

    /// Parse `http://host:port`; falls back to the local default.
    pub fn from_url(url: &str) -> Self {
        let trimmed = url.trim_end_matches('/');
        let (host, port) = match trimmed.rsplit_once(':') {
            Some((host, port)) if !host.ends_with("http") && !host.ends_with("https") => {
                (host.to_string(), port.parse().unwrap_or(11434))
            }
            _ => (trimmed.to_string(), 11434),
        };
        Self::new(ollama_rs::Ollama::new(host, port))
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String> {
        use ollama_rs::generation::chat::{request::ChatMessageRequest, ChatMessage};

        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(ChatMessage::system(sys));
        }
        messages.push(ChatMessage::user(prompt));

        let res = self
            .client
            .send_chat_messages(ChatMessageRequest::new(model.to_string(), messages))
            .await?;

        Ok(res.message.content)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Any `/chat/completions` endpoint, including Gemini's OpenAI-compatible one
pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    temperature: f32,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            api_key,
            temperature: 0.2,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate(&self, model: &str, prompt: String, system: Option<String>) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(sys) = system {
            messages.push(json!({ "role": "system", "content": sys }));
        }
        messages.push(json!({ "role": "user", "content": prompt }));

        let body = json!({
            "model": model,
            "messages": messages,
            "temperature": self.temperature,
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .json(&body);

        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let res = request.send().await?.error_for_status()?;
        let json: serde_json::Value = res.json().await?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .context("Failed to parse content from OpenAI response")?;

        Ok(content.to_string())
    }

    fn name(&self) -> &str {
        "openai-compatible"
    }
}

/// Offline stand-in that echoes the request
#[derive(Debug, Default)]
pub struct SimulatedProvider;

#[async_trait]
impl LLMProvider for SimulatedProvider {
    async fn generate(&self, _model: &str, prompt: String, _system: Option<String>) -> Result<String> {
        let last = prompt.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
        Ok(format!(
            "[SIMULATED AI] You said: {}",
            truncate_text(last.trim(), TruncationPolicy::Bytes(200))
        ))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}
