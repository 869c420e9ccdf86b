//! ASI-1 chat-completions client
//!
//! Shared by the intent extractor and the analysis oracle.
//! Uses a long-lived reqwest::Client for connection pooling.

use crate::config::LlmConfig;
use crate::error::{AgentError, Step};
use crate::http::{build_client, read_json, send_with_retry, RetryPolicy};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const TEMPERATURE: f64 = 0.2;
const MAX_TOKENS: u32 = 5000;

/// Reusable chat-completions client (connection-pooled)
pub struct ChatClient {
    client: Client,
    config: LlmConfig,
}

impl ChatClient {
    pub fn new(config: LlmConfig, timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            config,
        })
    }

    /// Send one system + user exchange and return the first completion's text
    pub async fn complete(&self, step: Step, system: &str, user: &str) -> crate::Result<String> {
        if self.config.api_key.is_empty() {
            return Err(AgentError::MissingCredential {
                step,
                name: "ASI1_API_KEY",
            });
        }

        let request = build_request(&self.config.model, system, user);

        debug!(step = %step, model = %self.config.model, "Calling chat completions");

        let response = send_with_retry(step, RetryPolicy::ConnectOrTimeout, || {
            self.client
                .post(&self.config.endpoint)
                .bearer_auth(&self.config.api_key)
                .header("Accept", "application/json")
                .json(&request)
        })
        .await?;

        let body: ChatResponse = read_json(step, response)
            .await
            .inspect_err(|e| error!(step = %step, "Failed to read chat completion: {}", e))?;

        first_completion(body).ok_or(AgentError::MissingCompletion { step })
    }
}

fn build_request<'a>(model: &'a str, system: &'a str, user: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![
            Message {
                role: "system",
                content: system,
            },
            Message {
                role: "user",
                content: user,
            },
        ],
        temperature: TEMPERATURE,
        stream: false,
        max_tokens: MAX_TOKENS,
    }
}

fn first_completion(response: ChatResponse) -> Option<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    stream: bool,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<CompletionMessage>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}
