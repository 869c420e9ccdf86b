//! Agent configuration
//!
//! Everything the collaborators need (endpoints, keys, timeout) is loaded once
//! and passed into each client at construction time.

use crate::error::AgentError;
use crate::http::DEFAULT_TIMEOUT;
use crate::Result;
use std::env;
use std::time::Duration;

pub const DEFAULT_ASI1_URL: &str = "https://api.asi1.ai/v1/chat/completions";
pub const DEFAULT_ASI1_MODEL: &str = "asi1-mini";
pub const DEFAULT_BITQUERY_URL: &str = "https://streaming.bitquery.io/eap";
pub const DEFAULT_PUMPPORTAL_URL: &str = "https://pumpportal.fun";
pub const DEFAULT_API_PORT: u16 = 8080;

/// Chat-completions endpoint settings (classification + analysis)
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

/// Endpoint plus credential for a plain HTTP collaborator
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub llm: LlmConfig,
    pub bitquery: ServiceConfig,
    pub pumpportal: ServiceConfig,
    pub http_timeout: Duration,
    pub dry_run: bool,
    pub api_port: u16,
}

fn env_or(keys: &[&str], default: &str) -> String {
    keys.iter()
        .find_map(|key| env::var(key).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key).ok().map(|s| s.trim().to_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}

/// Per-call timeout in whole seconds; unset falls back to the default
fn parse_timeout(raw: Option<String>) -> Result<Duration> {
    let Some(raw) = raw else {
        return Ok(DEFAULT_TIMEOUT);
    };

    let secs: u64 = raw.trim().parse().map_err(|_| {
        AgentError::Config(format!("AGENT_HTTP_TIMEOUT_SECS is not a number: {}", raw))
    })?;
    if secs == 0 {
        return Err(AgentError::Config(
            "AGENT_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
        ));
    }

    Ok(Duration::from_secs(secs))
}

impl AgentConfig {
    /// Load from the process environment (call `dotenv` first to pick up `.env`)
    pub fn from_env() -> Result<Self> {
        let http_timeout = parse_timeout(
            env::var("AGENT_HTTP_TIMEOUT_SECS")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        )?;

        let port_raw = env_or(&["PORT", "API_PORT"], &DEFAULT_API_PORT.to_string());
        let api_port = port_raw
            .trim()
            .parse()
            .map_err(|_| AgentError::Config(format!("Invalid port: {}", port_raw)))?;

        Ok(Self {
            llm: LlmConfig {
                endpoint: env_or(&["ASI1_API_URL"], DEFAULT_ASI1_URL),
                api_key: env_or(&["ASI1_API_KEY", "AGENTVERSE_API_KEY"], ""),
                model: env_or(&["ASI1_MODEL"], DEFAULT_ASI1_MODEL),
            },
            bitquery: ServiceConfig {
                endpoint: env_or(&["BITQUERY_API_URL"], DEFAULT_BITQUERY_URL),
                api_key: env_or(&["BITQUERY_API_KEY"], ""),
            },
            pumpportal: ServiceConfig {
                endpoint: env_or(&["PUMPPORTAL_API_URL"], DEFAULT_PUMPPORTAL_URL)
                    .trim_end_matches('/')
                    .to_string(),
                api_key: env_or(&["PUMPPORTAL_API_KEY"], ""),
            },
            http_timeout,
            dry_run: env_bool("AGENT_DRY_RUN", false),
            api_port,
        })
    }
}
