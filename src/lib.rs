//! Memecoin Command Agent
//!
//! A chat-driven Solana trading agent that:
//! - Classifies free-text commands with an LLM (buy / sell / analyze)
//! - Submits trades through PumpPortal
//! - Pulls 15-minute trading snapshots from Bitquery
//! - Asks the LLM for a market briefing on a snapshot
//!
//! FLOW:
//! RECEIVED → CLASSIFIED → {TRADE | ANALYZE | REJECTED} → COMPLETED

pub mod analysis;
pub mod api;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod execution;
pub mod http;
pub mod intent;
pub mod llm;
pub mod metrics;
pub mod models;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use dispatcher::Dispatcher;
