//! Prompt text for the chat model.

use serde_json::Value;

pub const INTENT_SYSTEM: &str =
    "You extract structured parameters from messages about Bitcoin positions. Reply with JSON only.";

pub const CONVERSATION_SYSTEM: &str = "\
You are Artemis, a crypto risk assistant for BTC/USD.
You are not a financial advisor. Never tell the user to buy or sell.
You explain risk metrics and market state in plain language.
Never invent missing values. If a field is null/missing, say 'not provided'.
Be concise.";

/// Conversation prompt with optional snapshot context and recent turns.
pub fn conversation_prompt(message: &str, snapshot: Option<&Value>, history: &[(String, String)]) -> String {
    let mut prompt = String::new();

    if let Some(snapshot) = snapshot {
        let body = serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| snapshot.to_string());
        prompt.push_str("Background context (latest risk snapshot, use only if relevant):\n");
        prompt.push_str("SNAPSHOT_JSON:\n");
        prompt.push_str(&body);
        prompt.push_str("\n\nWhen summarizing, cover current price, regime, crash probability, ");
        prompt.push_str("tail risk and what to watch next.\n\n");
    }

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for (user, assistant) in history {
            prompt.push_str("USER: ");
            prompt.push_str(user);
            prompt.push_str("\nASSISTANT: ");
            prompt.push_str(assistant);
            prompt.push('\n');
        }
        prompt.push('\n');
    }

    prompt.push_str("USER:\n");
    prompt.push_str(message);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversation_prompt_ends_with_message() {
        let snap = json!({"price": 64000.0});
        let prompt = conversation_prompt("summarize the snapshot", Some(&snap), &[]);
        assert!(prompt.contains("SNAPSHOT_JSON"));
        assert!(prompt.contains("64000"));
        assert!(prompt.ends_with("USER:\nsummarize the snapshot"));

        let plain = conversation_prompt("hi", None, &[("a".into(), "b".into())]);
        assert!(!plain.contains("SNAPSHOT_JSON"));
        assert!(plain.contains("USER: a\nASSISTANT: b"));
    }
}
