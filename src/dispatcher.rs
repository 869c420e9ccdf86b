//! Command dispatcher - routes one classified request to its operation
//!
//! RECEIVED → CLASSIFIED → {TRADE | ANALYZE | REJECTED} → COMPLETED
//!
//! Every path ends in a `DispatchOutcome`; errors and panics inside the
//! collaborators are turned into `DispatchOutcome::Failed` here.

use crate::analysis::{AnalysisOracle, LlmAnalysisOracle};
use crate::config::AgentConfig;
use crate::execution::{DryRunExecutor, PumpPortalExecutor, TradeExecutor};
use crate::intent::{IntentExtractor, LlmIntentExtractor};
use crate::llm::ChatClient;
use crate::metrics::{BitqueryClient, MetricsFetcher};
use crate::models::{AgentRequest, DispatchOutcome, Intent, TokenAddress, REJECTED_REASON};
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct Dispatcher {
    extractor: Arc<dyn IntentExtractor>,
    metrics: Arc<dyn MetricsFetcher>,
    analysis: Arc<dyn AnalysisOracle>,
    executor: Arc<dyn TradeExecutor>,
}

impl Dispatcher {
    pub fn new(
        extractor: Arc<dyn IntentExtractor>,
        metrics: Arc<dyn MetricsFetcher>,
        analysis: Arc<dyn AnalysisOracle>,
        executor: Arc<dyn TradeExecutor>,
    ) -> Self {
        Self {
            extractor,
            metrics,
            analysis,
            executor,
        }
    }

    /// Wire the HTTP-backed collaborators from configuration
    pub fn from_config(config: &AgentConfig) -> Result<Self> {
        let timeout = config.http_timeout;

        let extractor = LlmIntentExtractor::new(ChatClient::new(config.llm.clone(), timeout)?);
        let analysis = LlmAnalysisOracle::new(ChatClient::new(config.llm.clone(), timeout)?);
        let metrics = BitqueryClient::new(config.bitquery.clone(), timeout)?;

        let executor: Arc<dyn TradeExecutor> = if config.dry_run {
            warn!("AGENT_DRY_RUN enabled - trades will not be submitted");
            Arc::new(DryRunExecutor)
        } else {
            Arc::new(PumpPortalExecutor::new(config.pumpportal.clone(), timeout)?)
        };

        Ok(Self::new(
            Arc::new(extractor),
            Arc::new(metrics),
            Arc::new(analysis),
            executor,
        ))
    }

    /// Handle one request. Never panics and never returns an error.
    pub async fn dispatch(&self, request: AgentRequest) -> DispatchOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("dispatch", %request_id);
        let this = self.clone();

        let task = tokio::spawn(async move { this.run(request).await }.instrument(span));

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%request_id, error = %e, "Dispatch task aborted");
                DispatchOutcome::Failed(format!("internal fault: {}", e))
            }
        }
    }

    async fn run(&self, request: AgentRequest) -> DispatchOutcome {
        let start = Instant::now();
        info!(stage = "received", text = %request.text, "Command received");

        let outcome = match self.route(&request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    stage = "completed",
                    step = e.step().map(|s| s.as_str()).unwrap_or("dispatch"),
                    error = %e,
                    "Command failed"
                );
                DispatchOutcome::Failed(e.to_string())
            }
        };

        info!(
            stage = "completed",
            outcome = ?outcome.kind(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Command completed"
        );

        outcome
    }

    async fn route(&self, request: &AgentRequest) -> Result<DispatchOutcome> {
        let known_token = request
            .token_address
            .as_deref()
            .and_then(|raw| match TokenAddress::parse(raw) {
                Ok(token) => Some(token),
                Err(e) => {
                    warn!(error = %e, "Ignoring invalid token address on request");
                    None
                }
            });

        let intent = self
            .extractor
            .extract(&request.text, known_token.as_ref())
            .await?;

        info!(stage = "classified", intent = ?intent, "Command classified");

        match intent {
            Intent::Trade(order) => {
                let result = self.executor.execute(&order).await?;
                Ok(DispatchOutcome::TradeConfirmed { order, result })
            }
            Intent::Analyze(token) => self.analyze(&token).await.map(DispatchOutcome::AnalysisText),
            Intent::Unknown => Ok(DispatchOutcome::Rejected(REJECTED_REASON.to_string())),
        }
    }

    async fn analyze(&self, token: &TokenAddress) -> Result<String> {
        let snapshot = self.metrics.fetch(token).await?;
        let analysis = self.analysis.analyze(&snapshot).await?;
        info!(token = %token, "Analysis completed");
        Ok(analysis)
    }
}
