//! Token metrics from Bitquery
//!
//! One GraphQL query per request over a fixed lookback window. The response
//! body is handed back untouched as a `MetricsSnapshot`.

use crate::config::ServiceConfig;
use crate::error::{AgentError, Step};
use crate::http::{build_client, read_text, send_with_retry, RetryPolicy};
use crate::models::{MetricsSnapshot, TokenAddress};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// Lookback window for the trading snapshot
pub const METRICS_WINDOW: Duration = Duration::from_secs(15 * 60);

pub const METRICS_QUERY: &str = r#"
query TokenMetrics($token: String!, $time_15min_ago: DateTime!) {
  Solana(dataset: realtime) {
    DEXTradeByTokens(
      where: {Transaction: {Result: {Success: true}}, Trade: {Currency: {MintAddress: {is: $token}}, Market: {MarketAddress: {}}}, Block: {Time: {since: $time_15min_ago}}}
      limit: {count: 1}
    ) {
      Trade {
        Currency {
          Name
          MintAddress
          Symbol
        }
        start: PriceInUSD(minimum: Block_Time)
        end: PriceInUSD(maximum: Block_Time)
      }
      makers_15min: count(distinct: Transaction_Signer, if: {Block: {Time: {after: $time_15min_ago}}})
      buyers_15min: count(distinct: Transaction_Signer, if: {Trade: {Side: {Type: {is: buy}}}, Block: {Time: {after: $time_15min_ago}}})
      sellers_15min: count(distinct: Transaction_Signer, if: {Trade: {Side: {Type: {is: sell}}}, Block: {Time: {after: $time_15min_ago}}})
      trades_15min: count(if: {Block: {Time: {after: $time_15min_ago}}})
      traded_volume_15min: sum(of: Trade_Side_AmountInUSD, if: {Block: {Time: {after: $time_15min_ago}}})
      buy_volume_15min: sum(of: Trade_Side_AmountInUSD, if: {Trade: {Side: {Type: {is: buy}}}, Block: {Time: {after: $time_15min_ago}}})
      sell_volume_15min: sum(of: Trade_Side_AmountInUSD, if: {Trade: {Side: {Type: {is: sell}}}, Block: {Time: {after: $time_15min_ago}}})
      buys_15min: count(if: {Trade: {Side: {Type: {is: buy}}}, Block: {Time: {after: $time_15min_ago}}})
      sells_15min: count(if: {Trade: {Side: {Type: {is: sell}}}, Block: {Time: {after: $time_15min_ago}}})
      price_15min_allTimeHigh: quantile(of: Trade_PriceInUSD, level: 0.99)
    }
  }
}
"#;

/// Fetches a trading snapshot for one token
#[async_trait]
pub trait MetricsFetcher: Send + Sync {
    async fn fetch(&self, token: &TokenAddress) -> Result<MetricsSnapshot>;
}

/// Start of the lookback window, whole seconds, RFC3339 with `Z`
pub fn window_start(now: DateTime<Utc>) -> String {
    let window = TimeDelta::seconds(METRICS_WINDOW.as_secs() as i64);
    (now - window).to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Serialize)]
pub struct MetricsQuery<'a> {
    pub query: &'static str,
    pub variables: MetricsVariables<'a>,
}

#[derive(Debug, Serialize)]
pub struct MetricsVariables<'a> {
    pub token: &'a str,
    pub time_15min_ago: String,
}

impl<'a> MetricsQuery<'a> {
    pub fn new(token: &'a TokenAddress, now: DateTime<Utc>) -> Self {
        Self {
            query: METRICS_QUERY,
            variables: MetricsVariables {
                token: token.as_str(),
                time_15min_ago: window_start(now),
            },
        }
    }
}

pub struct BitqueryClient {
    client: Client,
    config: ServiceConfig,
}

impl BitqueryClient {
    pub fn new(config: ServiceConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }
}

#[async_trait]
impl MetricsFetcher for BitqueryClient {
    async fn fetch(&self, token: &TokenAddress) -> Result<MetricsSnapshot> {
        if self.config.api_key.is_empty() {
            return Err(AgentError::MissingCredential {
                step: Step::Metrics,
                name: "BITQUERY_API_KEY",
            });
        }

        info!(token = %token, "Fetching token metrics");

        let body = MetricsQuery::new(token, Utc::now());

        let response = send_with_retry(Step::Metrics, RetryPolicy::ConnectOrTimeout, || {
            self.client
                .post(&self.config.endpoint)
                .header("Authorization", &self.config.api_key)
                .json(&body)
        })
        .await
        .inspect_err(|e| error!(token = %token, "Metrics request failed: {}", e))?;

        let text = read_text(Step::Metrics, response).await?;

        Ok(MetricsSnapshot::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_start_truncates_to_seconds() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 30).unwrap()
            + TimeDelta::milliseconds(750);
        assert_eq!(window_start(now), "2025-03-01T11:45:30Z");
    }

    #[test]
    fn test_query_variables() {
        let token = TokenAddress::parse("fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump").unwrap();
        let now = Utc::now();
        let body = serde_json::to_value(MetricsQuery::new(&token, now)).unwrap();

        assert_eq!(body["variables"]["token"], token.as_str());
        assert!(body["query"].as_str().unwrap().contains("DEXTradeByTokens"));

        let since = DateTime::parse_from_rfc3339(body["variables"]["time_15min_ago"].as_str().unwrap())
            .unwrap()
            .with_timezone(&Utc);
        let drift = (now - TimeDelta::seconds(900)) - since;
        assert!(drift >= TimeDelta::zero() && drift < TimeDelta::seconds(1));
    }
}
