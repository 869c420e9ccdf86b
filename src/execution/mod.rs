//! Trade execution through PumpPortal
//!
//! Orders arrive already validated. The executor only maps them onto the
//! service's form fields and maps the answer back onto a `TradeResult`.

use crate::config::ServiceConfig;
use crate::error::{AgentError, Step};
use crate::http::{build_client, read_json, send_with_retry, RetryPolicy};
use crate::models::{TradeOrder, TradeResult};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Percent slippage allowed
pub const DEFAULT_SLIPPAGE_PERCENT: u32 = 10;
/// SOL tip for transaction speed
pub const DEFAULT_PRIORITY_FEE_SOL: Decimal = Decimal::ZERO;
/// Venue selection left to the service
pub const DEFAULT_POOL: &str = "auto";

/// Fixed execution parameters applied to every order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeDefaults {
    pub slippage_percent: u32,
    pub priority_fee_sol: Decimal,
    pub pool: String,
}

impl Default for TradeDefaults {
    fn default() -> Self {
        Self {
            slippage_percent: DEFAULT_SLIPPAGE_PERCENT,
            priority_fee_sol: DEFAULT_PRIORITY_FEE_SOL,
            pool: DEFAULT_POOL.to_string(),
        }
    }
}

#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn execute(&self, order: &TradeOrder) -> Result<TradeResult>;
}

/// Form body of a `/api/trade` call
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TradeForm {
    pub action: &'static str,
    pub mint: String,
    pub amount: String,
    pub denominated_in_sol: bool,
    pub slippage: u32,
    pub priority_fee: String,
    pub pool: String,
}

impl TradeForm {
    pub fn new(order: &TradeOrder, defaults: &TradeDefaults) -> Self {
        Self {
            action: order.side.action(),
            mint: order.token.as_str().to_string(),
            amount: order.amount.to_string(),
            denominated_in_sol: order.side.denominated_in_sol(),
            slippage: defaults.slippage_percent,
            priority_fee: defaults.priority_fee_sol.to_string(),
            pool: defaults.pool.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TradeResponse {
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

pub struct PumpPortalExecutor {
    client: Client,
    config: ServiceConfig,
    defaults: TradeDefaults,
}

impl PumpPortalExecutor {
    pub fn new(config: ServiceConfig, timeout: Duration) -> Result<Self> {
        Self::with_defaults(config, timeout, TradeDefaults::default())
    }

    pub fn with_defaults(config: ServiceConfig, timeout: Duration, defaults: TradeDefaults) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
            defaults,
        })
    }
}

#[async_trait]
impl TradeExecutor for PumpPortalExecutor {
    async fn execute(&self, order: &TradeOrder) -> Result<TradeResult> {
        if self.config.api_key.is_empty() {
            return Err(AgentError::MissingCredential {
                step: Step::Execution,
                name: "PUMPPORTAL_API_KEY",
            });
        }

        let url = format!("{}/api/trade", self.config.endpoint);
        let form = TradeForm::new(order, &self.defaults);

        info!(
            action = form.action,
            mint = %form.mint,
            amount = %form.amount,
            denominated_in_sol = form.denominated_in_sol,
            "Submitting trade"
        );

        // A timed-out submission may already have landed, so only connect
        // failures are retried.
        let response = send_with_retry(Step::Execution, RetryPolicy::ConnectOnly, || {
            self.client
                .post(&url)
                .query(&[("api-key", self.config.api_key.as_str())])
                .form(&form)
        })
        .await?;

        let body: TradeResponse = read_json(Step::Execution, response).await?;

        let result = TradeResult::new(body.signature, body.errors);
        if result.success() {
            info!(signature = ?result.transaction_id(), "Trade accepted");
        } else {
            warn!(errors = ?result.errors(), "Trade rejected by execution service");
        }

        Ok(result)
    }
}

/// Logs orders instead of submitting them
pub struct DryRunExecutor;

#[async_trait]
impl TradeExecutor for DryRunExecutor {
    async fn execute(&self, order: &TradeOrder) -> Result<TradeResult> {
        let form = TradeForm::new(order, &TradeDefaults::default());
        info!(?form, "Dry run: trade not submitted");
        Ok(TradeResult::dry_run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PositiveDecimal, TokenAddress, TradeSide};
    use serde_json::json;

    fn order(side: TradeSide, amount: serde_json::Value) -> TradeOrder {
        TradeOrder {
            side,
            token: TokenAddress::parse("fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump").unwrap(),
            amount: PositiveDecimal::from_json(&amount).unwrap(),
        }
    }

    #[test]
    fn test_buy_form() {
        let form = TradeForm::new(&order(TradeSide::Buy, json!(0.1)), &TradeDefaults::default());
        assert_eq!(
            serde_json::to_value(&form).unwrap(),
            json!({
                "action": "buy",
                "mint": "fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump",
                "amount": "0.1",
                "denominatedInSol": true,
                "slippage": 10,
                "priorityFee": "0",
                "pool": "auto"
            })
        );
    }

    #[test]
    fn test_sell_is_denominated_in_tokens() {
        let form = TradeForm::new(&order(TradeSide::Sell, json!(50)), &TradeDefaults::default());
        assert_eq!(form.action, "sell");
        assert!(!form.denominated_in_sol);
        assert_eq!(form.amount, "50");
    }

    #[test]
    fn test_response_mapping() {
        let ok: TradeResponse = serde_json::from_value(json!({"signature": "5abc", "errors": []})).unwrap();
        let result = TradeResult::new(ok.signature, ok.errors);
        assert!(result.success());
        assert_eq!(result.transaction_id(), Some("5abc"));

        let rejected: TradeResponse = serde_json::from_value(json!({"errors": ["Slippage exceeded"]})).unwrap();
        let result = TradeResult::new(rejected.signature, rejected.errors);
        assert!(!result.success());
        assert_eq!(result.errors(), ["Slippage exceeded".to_string()]);
    }

    #[test]
    fn test_dry_run_never_fails() {
        let result = tokio_test::block_on(DryRunExecutor.execute(&order(TradeSide::Buy, json!(1))))
            .unwrap();
        assert!(result.success());
        assert!(result.is_dry_run());
        assert_eq!(result.transaction_id(), None);
    }
}
