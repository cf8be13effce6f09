use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crash_radar::agent::LLMProvider;
use crash_radar::chat::{ChatError, ChatRouter, RISK_UNAVAILABLE, UNEXPECTED_RESPONSE};
use crash_radar::engine::RiskEngine;
use crash_radar::market::{synthetic::random_walk, BarSource};
use crash_radar::oracle::StaticPriceSource;
use crash_radar::RiskDesk;

/// Replays canned answers and records every prompt it was given.
struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(
                responses
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate(&self, _model: &str, prompt: String, _system: Option<String>) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(anyhow::anyhow!(e)),
            None => Ok(String::new()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn desk() -> Arc<RiskDesk> {
    let bars = random_walk(1200, 60_000.0, 0.006, 31);
    Arc::new(RiskDesk::new(RiskEngine::default(), bars, BarSource::Synthetic))
}

#[tokio::test]
async fn test_risk_query_uses_extracted_intent() {
    let provider = ScriptedProvider::new(vec![Ok(
        "```json\n{\"position_size_btc\": 2.5, \"risk_appetite\": \"high\", \"horizon_hours\": 6}\n```",
    )]);
    let router = ChatRouter::new(provider.clone(), "m")
        .with_desk(Some(desk()))
        .with_price_source(Arc::new(StaticPriceSource::new(70_000.0, 1)));

    let reply = router.handle("I hold some BTC, how risky is it?").await.unwrap();

    assert!(reply.response.contains("Risk Analysis for 2.5 BTC (high risk profile)"));
    assert!(reply.response.contains("**Crash Probability (6h):**"));
    assert!(reply.response.contains("**99% VaR (6h):**"));
    assert!(reply.response.contains("_Current BTC Price: $70,000.00_"));
    assert_eq!(provider.prompts().len(), 1);
}

#[tokio::test]
async fn test_risk_query_falls_back_to_heuristic() {
    let provider = ScriptedProvider::new(vec![Ok("I'm not sure what you mean.")]);
    let router = ChatRouter::new(provider, "m").with_desk(Some(desk()));

    let reply = router
        .handle("I have 3 BTC, aggressive, what's my crash risk over 12 hours?")
        .await
        .unwrap();

    assert!(reply.response.contains("Risk Analysis for 3.0 BTC (high risk profile)"));
    assert!(reply.response.contains("**Crash Probability (12h):**"));
}

#[tokio::test]
async fn test_risk_query_survives_provider_failure() {
    let provider = ScriptedProvider::new(vec![Err("connection refused")]);
    let router = ChatRouter::new(provider, "m").with_desk(Some(desk()));

    let reply = router.handle("bitcoin drawdown risk?").await.unwrap();
    assert!(reply.response.contains("Risk Analysis for 1.0 BTC (medium risk profile)"));
    assert!(reply.response.contains("**Crash Probability (24h):**"));
}

#[tokio::test]
async fn test_risk_query_without_desk() {
    let provider = ScriptedProvider::new(vec![]);
    let router = ChatRouter::new(provider.clone(), "m");
    let reply = router.handle("crash risk?").await.unwrap();
    assert_eq!(reply.response, RISK_UNAVAILABLE);
    assert!(provider.prompts().is_empty());
}

#[tokio::test]
async fn test_conversation_attaches_snapshot_when_asked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("latest_update.json");
    std::fs::write(&path, r#"{"asset": "BTC/USD", "price": 64000.0}"#).unwrap();

    let provider = ScriptedProvider::new(vec![Ok("Prices look steady."), Ok("Hello!")]);
    let router = ChatRouter::new(provider.clone(), "m").with_snapshot_path(&path);

    let reply = router.handle("Can you summarise the snapshot?").await.unwrap();
    assert_eq!(reply.response, "Prices look steady.");
    router.handle("hi").await.unwrap();

    let prompts = provider.prompts();
    assert!(prompts[0].contains("SNAPSHOT_JSON"));
    assert!(prompts[0].contains("64000"));
    assert!(!prompts[1].contains("SNAPSHOT_JSON"));
    assert!(prompts[1].contains("Prices look steady."));
}

#[tokio::test]
async fn test_conversation_empty_and_failed_output() {
    let provider = ScriptedProvider::new(vec![Ok("   "), Err("boom")]);
    let router = ChatRouter::new(provider, "m");

    let reply = router.handle("hello").await.unwrap();
    assert_eq!(reply.response, UNEXPECTED_RESPONSE);

    let err = router.handle("hello again").await.unwrap_err();
    assert!(matches!(err, ChatError::Provider(_)));
}
