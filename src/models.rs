//! Core data models for the command agent

use crate::error::AgentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//
// ================= Token / Amount =================
//

/// Base58 token mint address. Only the alphabet is checked.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TokenAddress(String);

impl TokenAddress {
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AgentError::InvalidToken("address is empty".to_string()));
        }

        bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| AgentError::InvalidToken(format!("{}: {}", trimmed, e)))?;

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strictly positive decimal amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PositiveDecimal(Decimal);

impl PositiveDecimal {
    pub fn new(value: Decimal) -> crate::Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(AgentError::InvalidAmount(format!("{} is not positive", value)))
        }
    }

    /// Accepts a JSON number or a numeric string
    pub fn from_json(value: &serde_json::Value) -> crate::Result<Self> {
        let text = match value {
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::String(s) => s.trim().to_string(),
            other => {
                return Err(AgentError::InvalidAmount(format!(
                    "expected a number, got {}",
                    other
                )))
            }
        };

        let parsed = Decimal::from_str(&text)
            .or_else(|_| Decimal::from_scientific(&text))
            .map_err(|e| AgentError::InvalidAmount(format!("{}: {}", text, e)))?;

        Self::new(parsed.normalize())
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for PositiveDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ================= Intent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Action tag understood by the execution service
    pub fn action(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    /// Buys are sized in SOL, sells in token units
    pub fn denominated_in_sol(&self) -> bool {
        matches!(self, TradeSide::Buy)
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action())
    }
}

/// A validated trade request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeOrder {
    pub side: TradeSide,
    pub token: TokenAddress,
    pub amount: PositiveDecimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Trade(TradeOrder),
    Analyze(TokenAddress),
    Unknown,
}

//
// ================= Collaborator Payloads =================
//

/// Raw data-service response body, passed on untouched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot(String);

impl MetricsSnapshot {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of a trade submission. `success` always equals `errors.is_empty()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TradeResult {
    success: bool,
    transaction_id: Option<String>,
    errors: Vec<String>,
    dry_run: bool,
}

impl TradeResult {
    pub fn new(transaction_id: Option<String>, errors: Vec<String>) -> Self {
        Self {
            success: errors.is_empty(),
            transaction_id: transaction_id.filter(|id| !id.trim().is_empty()),
            errors,
            dry_run: false,
        }
    }

    /// Accepted order that was never sent to the execution service
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::new(None, vec![])
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn transaction_id(&self) -> Option<&str> {
        self.transaction_id.as_deref()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

//
// ================= Dispatch I/O =================
//

pub const SOLSCAN_TX_URL: &str = "https://solscan.io/tx/";
pub const REJECTED_REASON: &str = "could not extract a valid command";
pub const REJECTED_MESSAGE: &str = "I was unable to extract a valid command from your input.";
pub const FAILED_MESSAGE: &str =
    "An error occurred while processing your request. Please try again later.";

/// Inbound request from the transport layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRequest {
    pub text: String,
    #[serde(default)]
    pub token_address: Option<String>,
}

impl AgentRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            token_address: None,
        }
    }

    pub fn with_token(mut self, token_address: impl Into<String>) -> Self {
        self.token_address = Some(token_address.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    TradeConfirmed { order: TradeOrder, result: TradeResult },
    AnalysisText(String),
    Rejected(String),
    Failed(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    TradeConfirmed,
    AnalysisText,
    Rejected,
    Failed,
}

impl DispatchOutcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            DispatchOutcome::TradeConfirmed { .. } => OutcomeKind::TradeConfirmed,
            DispatchOutcome::AnalysisText(_) => OutcomeKind::AnalysisText,
            DispatchOutcome::Rejected(_) => OutcomeKind::Rejected,
            DispatchOutcome::Failed(_) => OutcomeKind::Failed,
        }
    }

    /// Plain-text reply for direct display
    pub fn to_message(&self) -> String {
        match self {
            DispatchOutcome::TradeConfirmed { order, result } => {
                format_trade_message(order, result)
            }
            DispatchOutcome::AnalysisText(text) => text.clone(),
            DispatchOutcome::Rejected(_) => REJECTED_MESSAGE.to_string(),
            DispatchOutcome::Failed(_) => FAILED_MESSAGE.to_string(),
        }
    }

    pub fn into_reply(self) -> AgentReply {
        AgentReply {
            kind: self.kind(),
            message: self.to_message(),
        }
    }
}

fn format_trade_message(order: &TradeOrder, result: &TradeResult) -> String {
    let mut out = format!(
        "{} order for {}, amount: {}",
        order.side, order.token, order.amount
    );

    if result.success() {
        out.push_str(" executed successfully.");
    } else {
        out.push_str(&format!(" failed: {}.", result.errors().join("; ")));
    }

    match result.transaction_id() {
        Some(signature) if result.success() => {
            out.push_str(&format!("\nTransaction: {}{}", SOLSCAN_TX_URL, signature));
        }
        Some(signature) => {
            out.push_str(&format!("\nInspect the error here: {}{}", SOLSCAN_TX_URL, signature));
        }
        None if result.is_dry_run() => out.push_str("\nNo transaction was submitted (dry run)."),
        None if result.success() => out.push_str("\nNo transaction id was returned."),
        None => {}
    }

    out
}

/// Outbound reply handed back to the transport layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentReply {
    pub kind: OutcomeKind,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const MINT: &str = "fNtHtsFz24kTUWUxS7wQJQnN8eQ37CcucaSkbA5pump";

    fn order(side: TradeSide) -> TradeOrder {
        TradeOrder {
            side,
            token: TokenAddress::parse(MINT).unwrap(),
            amount: PositiveDecimal::from_json(&json!(0.1)).unwrap(),
        }
    }

    #[test]
    fn test_token_address_validation() {
        assert_eq!(TokenAddress::parse(&format!("  {}  ", MINT)).unwrap().as_str(), MINT);
        assert!(TokenAddress::parse("").is_err());
        assert!(TokenAddress::parse("   ").is_err());
        // 0, O, I and l are outside the base58 alphabet
        assert!(TokenAddress::parse("0OIl").is_err());
        assert!(TokenAddress::parse("not an address").is_err());
    }

    #[test]
    fn test_positive_decimal() {
        assert_eq!(
            PositiveDecimal::from_json(&json!(0.1)).unwrap().to_string(),
            "0.1"
        );
        assert_eq!(
            PositiveDecimal::from_json(&json!("50")).unwrap().to_string(),
            "50"
        );
        assert!(PositiveDecimal::from_json(&json!(0)).is_err());
        assert!(PositiveDecimal::from_json(&json!(-1.5)).is_err());
        assert!(PositiveDecimal::from_json(&json!("none")).is_err());
        assert!(PositiveDecimal::from_json(&json!(null)).is_err());
    }

    #[test]
    fn test_trade_result_success_tracks_errors() {
        let cases = vec![
            (Some("sig".to_string()), vec![]),
            (None, vec![]),
            (Some("sig".to_string()), vec!["slippage exceeded".to_string()]),
            (None, vec!["a".to_string(), "b".to_string()]),
        ];

        for (signature, errors) in cases {
            let result = TradeResult::new(signature, errors.clone());
            assert_eq!(result.success(), errors.is_empty());
            assert_eq!(result.errors(), errors.as_slice());
        }

        assert_eq!(TradeResult::new(Some("".to_string()), vec![]).transaction_id(), None);
    }

    #[test]
    fn test_side_mapping() {
        assert!(TradeSide::Buy.denominated_in_sol());
        assert!(!TradeSide::Sell.denominated_in_sol());
        assert_eq!(TradeSide::Sell.action(), "sell");
    }

    #[test]
    fn test_trade_messages() {
        let ok = DispatchOutcome::TradeConfirmed {
            order: order(TradeSide::Buy),
            result: TradeResult::new(Some("5abc".to_string()), vec![]),
        };
        assert_eq!(
            ok.to_message(),
            format!(
                "buy order for {}, amount: 0.1 executed successfully.\nTransaction: https://solscan.io/tx/5abc",
                MINT
            )
        );

        let failed = DispatchOutcome::TradeConfirmed {
            order: order(TradeSide::Sell),
            result: TradeResult::new(None, vec!["insufficient balance".to_string()]),
        };
        let message = failed.to_message();
        assert!(message.starts_with("sell order for"));
        assert!(message.contains("failed: insufficient balance."));
        assert!(!message.contains("solscan"));
    }

    #[test]
    fn test_unsigned_success_is_not_called_a_dry_run() {
        let live = DispatchOutcome::TradeConfirmed {
            order: order(TradeSide::Buy),
            result: TradeResult::new(None, vec![]),
        };
        assert_eq!(
            live.to_message(),
            format!(
                "buy order for {}, amount: 0.1 executed successfully.\nNo transaction id was returned.",
                MINT
            )
        );

        let simulated = DispatchOutcome::TradeConfirmed {
            order: order(TradeSide::Buy),
            result: TradeResult::dry_run(),
        };
        assert!(simulated.to_message().ends_with("No transaction was submitted (dry run)."));
    }

    #[test]
    fn test_outcome_replies() {
        let rejected = DispatchOutcome::Rejected(REJECTED_REASON.to_string()).into_reply();
        assert_eq!(rejected.kind, OutcomeKind::Rejected);
        assert_eq!(rejected.message, REJECTED_MESSAGE);

        let failed = DispatchOutcome::Failed("metrics service returned 500".to_string());
        assert_eq!(failed.to_message(), FAILED_MESSAGE);
    }
}
