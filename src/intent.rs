//! Intent extraction
//!
//! Turns free-form chat text into one of:
//! - Trade: buy/sell a token for a positive amount
//! - Analyze: a market briefing for a token
//! - Unknown: anything the oracle could not map cleanly
//!
//! The oracle is reachable-or-not: transport failures are errors, while
//! anything it says that does not fit the schema is `Intent::Unknown`.

use crate::error::{AgentError, Step};
use crate::llm::ChatClient;
use crate::models::{Intent, PositiveDecimal, TokenAddress, TradeOrder, TradeSide};
use crate::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

pub const CLASSIFICATION_PROMPT: &str = r#"You are a hyper-efficient Solana transaction parser that extracts token addresses and actions from user messages with machine-like precision.
Convert casual crypto chatter into structured JSON output. No explanations, no pleasantries, no emojis, no markdown.
Identify base58 token addresses exactly as written (case-perfect) and categorize the intent as buy, sell or analyze.

Reply only in the format: {"type": "buy|sell|analyze", "address": "token_address", "amount": amount}

Examples:
- "buy 0.1sol worth of fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump" -> {"type": "buy", "address": "fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump", "amount": 0.1}
- "sell 50 of fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump" -> {"type": "sell", "address": "fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump", "amount": 50}
- "what's your take on fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump" or "is now a good time to buy ..." -> {"type": "analyze", "address": "fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump"}

If you cannot extract a command exactly, reply that you could not extract any commands and nothing else."#;

/// Classifies raw user text
#[async_trait]
pub trait IntentExtractor: Send + Sync {
    /// `known_token` is an address the transport already has for this request
    async fn extract(&self, text: &str, known_token: Option<&TokenAddress>) -> Result<Intent>;
}

/// Classification backed by the chat-completions oracle
pub struct LlmIntentExtractor {
    client: ChatClient,
}

impl LlmIntentExtractor {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IntentExtractor for LlmIntentExtractor {
    async fn extract(&self, text: &str, known_token: Option<&TokenAddress>) -> Result<Intent> {
        let reply = match self
            .client
            .complete(Step::Classification, CLASSIFICATION_PROMPT, text)
            .await
        {
            Ok(reply) => reply,
            // Reachable oracle that said nothing usable
            Err(AgentError::MissingCompletion { .. }) | Err(AgentError::Decode { .. }) => {
                warn!("Classification reply had no usable completion");
                return Ok(Intent::Unknown);
            }
            Err(e) => return Err(e),
        };

        debug!(reply = %reply, "Classification reply received");
        Ok(parse_intent(&reply, known_token))
    }
}

/// Parse the oracle's reply. Never fails: bad shapes become `Intent::Unknown`.
pub fn parse_intent(reply: &str, known_token: Option<&TokenAddress>) -> Intent {
    let Some(value) = extract_json_object(reply) else {
        return Intent::Unknown;
    };

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase());

    // The request's token stands in only for an omitted or blank address
    let token = match value.get("address") {
        None => known_token.cloned(),
        Some(Value::String(raw)) if raw.trim().is_empty() => known_token.cloned(),
        Some(Value::String(raw)) => TokenAddress::parse(raw).ok(),
        Some(_) => None,
    };

    match (kind.as_deref(), token) {
        (Some("buy"), Some(token)) => trade(TradeSide::Buy, token, value.get("amount")),
        (Some("sell"), Some(token)) => trade(TradeSide::Sell, token, value.get("amount")),
        (Some("analyze"), Some(token)) => Intent::Analyze(token),
        _ => Intent::Unknown,
    }
}

fn trade(side: TradeSide, token: TokenAddress, amount: Option<&Value>) -> Intent {
    match amount.map(PositiveDecimal::from_json) {
        Some(Ok(amount)) => Intent::Trade(TradeOrder {
            side,
            token,
            amount,
        }),
        _ => Intent::Unknown,
    }
}

/// Find the JSON object in a reply, tolerating ```json fences and prose
fn extract_json_object(reply: &str) -> Option<Value> {
    let trimmed = reply.trim();

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return value.is_object().then_some(value);
    }

    // Largest { ... } block in the text
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }

    serde_json::from_str::<Value>(&trimmed[start..=end])
        .ok()
        .filter(Value::is_object)
}
