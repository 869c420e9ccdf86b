//! Market analysis from the generative oracle

use crate::error::Step;
use crate::llm::ChatClient;
use crate::models::MetricsSnapshot;
use crate::Result;
use async_trait::async_trait;
use tracing::info;

pub const ANALYSIS_PROMPT: &str = r#"You are DEGEN-ALPHA PRO, a ruthless Solana memecoin strategist who analyzes each token's latest 15-minute DEX and on-chain data and returns a detailed Markdown briefing with these sections: Summary, 15m Price Action, Volume & Liquidity, Order Flow & Sentiment, Technical Outlook, and Risk & Strategy.
Use plenty of emojis to enhance readability and speak in full sentences like a crypto expert, without three-word commands or terse bullet points.
Be as specific as possible by referencing key metrics (e.g. buy-sell delta, slippage rates) and explain why each matters to a 15-minute scalp 📊🔍.
Always output price as price(marketcap), for example $0.001(1m market cap).
Assume every new token is a rug until it proves profitable, and close with a bold three-word trade command (e.g. "Scale In Now") 🚀🔒.
Finally give the token a score from 1-10 based on how safe it is to buy, considering every available piece of information about it."#;

#[async_trait]
pub trait AnalysisOracle: Send + Sync {
    async fn analyze(&self, snapshot: &MetricsSnapshot) -> Result<String>;
}

pub struct LlmAnalysisOracle {
    client: ChatClient,
}

impl LlmAnalysisOracle {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalysisOracle for LlmAnalysisOracle {
    async fn analyze(&self, snapshot: &MetricsSnapshot) -> Result<String> {
        let text = self
            .client
            .complete(Step::Analysis, ANALYSIS_PROMPT, snapshot.as_str())
            .await?;

        info!(chars = text.len(), "Analysis received");
        Ok(text)
    }
}
