//! Error types for the command agent

use std::fmt;
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// External call a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Classification,
    Metrics,
    Analysis,
    Execution,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Classification => "classification",
            Step::Metrics => "metrics",
            Step::Analysis => "analysis",
            Step::Execution => "execution",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // External Call Errors
    // =============================

    #[error("{step} request failed: {message}")]
    Transport { step: Step, message: String },

    #[error("{step} service returned {status}: {body}")]
    Status { step: Step, status: u16, body: String },

    #[error("{step} response contained no completion text")]
    MissingCompletion { step: Step },

    #[error("{step} response could not be decoded: {message}")]
    Decode { step: Step, message: String },

    #[error("{step} credential {name} not configured")]
    MissingCredential { step: Step, name: &'static str },

    // =============================
    // Validation / Setup Errors
    // =============================

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid token address: {0}")]
    InvalidToken(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Internal fault: {0}")]
    Internal(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl AgentError {
    /// The external step this error came from, if any
    pub fn step(&self) -> Option<Step> {
        match self {
            AgentError::Transport { step, .. }
            | AgentError::Status { step, .. }
            | AgentError::MissingCompletion { step }
            | AgentError::Decode { step, .. }
            | AgentError::MissingCredential { step, .. } => Some(*step),
            _ => None,
        }
    }

    /// True when the service was never reached or did not answer with 2xx
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AgentError::Transport { .. } | AgentError::Status { .. } | AgentError::HttpError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_is_reported() {
        let err = AgentError::Status {
            step: Step::Metrics,
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.step(), Some(Step::Metrics));
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "metrics service returned 500: boom");

        let missing = AgentError::MissingCompletion { step: Step::Analysis };
        assert!(!missing.is_transport());
        assert_eq!(AgentError::Config("x".into()).step(), None);

        let missing_key = AgentError::MissingCredential {
            step: Step::Metrics,
            name: "BITQUERY_API_KEY",
        };
        assert_eq!(missing_key.step(), Some(Step::Metrics));
        assert!(!missing_key.is_transport());
        assert_eq!(missing_key.to_string(), "metrics credential BITQUERY_API_KEY not configured");
    }
}
