//! Shared HTTP plumbing for the external collaborators
//!
//! One pooled reqwest::Client per component, a bounded timeout on every
//! call, and at most one retry when the request never got an answer.

use crate::error::{AgentError, Step};
use crate::Result;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Which transport failures may be retried once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Connect failures and timeouts (read-only calls)
    ConnectOrTimeout,
    /// Connect failures only; the request provably never reached the server
    ConnectOnly,
}

impl RetryPolicy {
    fn allows(&self, error: &reqwest::Error) -> bool {
        match self {
            RetryPolicy::ConnectOrTimeout => error.is_connect() || error.is_timeout(),
            RetryPolicy::ConnectOnly => error.is_connect(),
        }
    }
}

pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(8)
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Send a request built by `make_request`, retrying once on transport failure.
/// Non-2xx answers are returned as `AgentError::Status` and never retried.
pub async fn send_with_retry<F>(step: Step, policy: RetryPolicy, make_request: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let response = match make_request().send().await {
        Ok(response) => response,
        Err(e) if policy.allows(&e) => {
            warn!(step = %step, error = %e, "Transport failure, retrying once");
            tokio::time::sleep(RETRY_BACKOFF).await;
            make_request().send().await.map_err(|e| transport(step, e))?
        }
        Err(e) => return Err(transport(step, e)),
    };

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AgentError::Status {
            step,
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}

/// Read a 2xx body in full and parse it as JSON. A body that stops arriving
/// (timeout, dropped connection) is a transport failure; only a complete body
/// that does not parse is `AgentError::Decode`.
pub async fn read_json<T: DeserializeOwned>(step: Step, response: Response) -> Result<T> {
    let body = response.bytes().await.map_err(|e| transport(step, e))?;
    serde_json::from_slice(&body).map_err(|e| AgentError::Decode {
        step,
        message: e.to_string(),
    })
}

/// Read a 2xx body in full as text
pub async fn read_text(step: Step, response: Response) -> Result<String> {
    let body = response.bytes().await.map_err(|e| transport(step, e))?;
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn transport(step: Step, error: reqwest::Error) -> AgentError {
    AgentError::Transport {
        step,
        message: error.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    /// Accepts connections and never answers; counts every connection
    async fn silent_server() -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = accepted.clone();

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    drop(socket);
                });
            }
        });

        (url, accepted)
    }

    #[tokio::test]
    async fn test_timeouts_retry_once_for_reads_only() {
        let cases = [
            (Step::Metrics, RetryPolicy::ConnectOrTimeout, 2),
            (Step::Execution, RetryPolicy::ConnectOnly, 1),
        ];

        for (step, policy, expected_calls) in cases {
            let (url, accepted) = silent_server().await;
            let client = build_client(Duration::from_millis(300)).unwrap();

            let result = send_with_retry(step, policy, || client.post(&url)).await;

            assert!(
                matches!(result, Err(AgentError::Transport { step: s, .. }) if s == step),
                "{:?}: {:?}",
                policy,
                result
            );
            assert_eq!(accepted.load(Ordering::SeqCst), expected_calls, "{:?}", policy);
        }
    }

    #[tokio::test]
    async fn test_stalled_body_is_transport_not_decode() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 500\r\n\r\n{\"choices\"")
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let client = build_client(Duration::from_millis(500)).unwrap();
        let response = send_with_retry(Step::Classification, RetryPolicy::ConnectOrTimeout, || {
            client.post(&url)
        })
        .await
        .unwrap();

        let result: Result<serde_json::Value> = read_json(Step::Classification, response).await;
        assert!(
            matches!(result, Err(AgentError::Transport { step: Step::Classification, .. })),
            "{:?}",
            result
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let client = build_client(Duration::from_secs(2)).unwrap();

        // Port 9 on loopback refuses connections; both attempts fail.
        let result = send_with_retry(Step::Metrics, RetryPolicy::ConnectOrTimeout, || {
            client.post("http://127.0.0.1:9/graphql")
        })
        .await;

        match result {
            Err(AgentError::Transport { step, .. }) => assert_eq!(step, Step::Metrics),
            other => panic!("expected transport error, got {:?}", other),
        }
    }
}
