pub mod reqwest_sender;
pub mod traits;

use crate::error::TransportError;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub use reqwest_sender::ReqwestSender;
pub use traits::{HttpReply, HttpSender};

/// Result of one `Transport::send`: the parsed body, uninterpreted.
pub type AttemptOutcome = std::result::Result<Value, TransportError>;

/// Transport-ready POST: endpoint, headers (credential included) and JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub endpoint: String,
    pub headers: HeaderMap,
    pub body: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Bound on each individual attempt.
    pub timeout: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: crate::config::DEFAULT_IMAGE_TIMEOUT,
            max_attempts: crate::config::DEFAULT_MAX_ATTEMPTS,
            backoff_base: crate::config::DEFAULT_BACKOFF_BASE,
        }
    }
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            timeout,
            max_attempts,
            ..Default::default()
        }
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Wait after the given (1-based) failed attempt: `base * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

#[derive(Clone)]
pub struct Transport {
    sender: Arc<dyn HttpSender>,
}

impl Transport {
    pub fn new(sender: Arc<dyn HttpSender>) -> Self {
        Self { sender }
    }

    pub fn with_reqwest() -> Self {
        Self::new(Arc::new(ReqwestSender::new()))
    }

    /// Sends `request`, retrying 429s and network failures with exponential
    /// backoff. Timeouts and other non-2xx statuses are returned immediately.
    pub async fn send(&self, request: &OutboundRequest, policy: &RetryPolicy) -> AttemptOutcome {
        let max_attempts = policy.max_attempts.max(1);
        let timeout_ms = policy.timeout.as_millis() as u64;
        let mut attempt = 1;

        loop {
            let reply = match tokio::time::timeout(policy.timeout, self.sender.post(request)).await {
                Ok(reply) => reply,
                Err(_) => {
                    log::warn!(
                        "Request to {} timed out after {}ms (attempt {}/{})",
                        request.endpoint,
                        timeout_ms,
                        attempt,
                        max_attempts
                    );
                    return Err(TransportError::Timeout { timeout_ms });
                }
            };

            let reason = match reply {
                Ok(reply) if reply.status == 429 => {
                    if attempt >= max_attempts {
                        log::error!("Still rate limited after {} attempts", attempt);
                        return Err(TransportError::RateLimited { attempts: attempt });
                    }
                    "rate limited (429)".to_string()
                }
                Ok(reply) => return interpret_reply(reply),
                Err(TransportError::NetworkError(cause)) => {
                    if attempt >= max_attempts {
                        log::error!("Network failure after {} attempts: {}", attempt, cause);
                        return Err(TransportError::NetworkError(cause));
                    }
                    cause
                }
                Err(other) => return Err(other),
            };

            let wait = policy.backoff_delay(attempt);
            log::warn!(
                "{}; retrying in {}ms ({}/{})",
                reason,
                wait.as_millis(),
                attempt,
                max_attempts
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }
}

fn interpret_reply(reply: HttpReply) -> AttemptOutcome {
    if !reply.is_success() {
        let message = server_error_message(&reply);
        log::error!("API returned HTTP {}: {}", reply.status, message);
        return Err(TransportError::ServerError {
            status: reply.status,
            message,
        });
    }

    serde_json::from_str(&reply.body).map_err(|e| TransportError::MalformedBody(e.to_string()))
}

/// Prefers the API's `error.message`, then a short raw body.
fn server_error_message(reply: &HttpReply) -> String {
    let from_json = serde_json::from_str::<Value>(&reply.body)
        .ok()
        .and_then(|json| json["error"]["message"].as_str().map(String::from));
    if let Some(message) = from_json {
        return message;
    }

    let raw = reply.body.trim();
    if !raw.is_empty() && raw.chars().count() <= 200 {
        raw.to_string()
    } else {
        format!("request failed with HTTP {}", reply.status)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{ok, Scripted, ScriptedSender};
    use super::*;
    use serde_json::json;
    use tokio::time::Instant;

    fn request() -> OutboundRequest {
        OutboundRequest {
            endpoint: "https://example.test/v1beta/models/m:generateContent".into(),
            headers: HeaderMap::new(),
            body: json!({}),
        }
    }

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(5), 3)
    }

    #[test]
    fn test_backoff_doubles_from_base() {
        let policy = policy();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_429_then_success_waits_once() {
        let sender = ScriptedSender::new(vec![
            Scripted::Reply(429, "{}".into()),
            ok(json!({ "candidates": [] })),
        ]);
        let transport = Transport::new(sender.clone());

        let start = Instant::now();
        let body = transport.send(&request(), &policy()).await.unwrap();
        let waited = start.elapsed();

        assert_eq!(body, json!({ "candidates": [] }));
        assert_eq!(sender.calls(), 2);
        assert!(waited >= Duration::from_millis(1000));
        assert!(waited < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_429s_exhaust_retries() {
        let sender = ScriptedSender::new(vec![
            Scripted::Reply(429, "{}".into()),
            Scripted::Reply(429, "{}".into()),
            Scripted::Reply(429, "{}".into()),
        ]);
        let transport = Transport::new(sender.clone());

        let start = Instant::now();
        let err = transport.send(&request(), &policy()).await.unwrap_err();

        assert_eq!(err, TransportError::RateLimited { attempts: 3 });
        assert_eq!(sender.calls(), 3);
        // 1s + 2s of backoff, no wait after the final attempt
        assert!(start.elapsed() < Duration::from_millis(3100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_retried() {
        let sender = ScriptedSender::new(vec![
            Scripted::Network("connection reset"),
            ok(json!({ "ok": true })),
        ]);
        let transport = Transport::new(sender.clone());

        let body = transport.send(&request(), &policy()).await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(sender.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_network_failure_surfaces_cause() {
        let sender = ScriptedSender::new(vec![
            Scripted::Network("dns"),
            Scripted::Network("dns"),
            Scripted::Network("refused"),
        ]);
        let transport = Transport::new(sender.clone());

        let err = transport.send(&request(), &policy()).await.unwrap_err();
        assert_eq!(err, TransportError::NetworkError("refused".into()));
        assert_eq!(sender.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_terminal_with_api_message() {
        let sender = ScriptedSender::new(vec![Scripted::Reply(
            500,
            json!({ "error": { "message": "backend exploded" } }).to_string(),
        )]);
        let transport = Transport::new(sender.clone());

        let err = transport.send(&request(), &policy()).await.unwrap_err();
        assert_eq!(
            err,
            TransportError::ServerError {
                status: 500,
                message: "backend exploded".into()
            }
        );
        assert_eq!(sender.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_without_json_uses_raw_text() {
        let sender = ScriptedSender::new(vec![Scripted::Reply(403, "forbidden".into())]);
        let transport = Transport::new(sender);

        match transport.send(&request(), &policy()).await {
            Err(TransportError::ServerError { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "forbidden");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_attempt_times_out_without_retry() {
        let sender = ScriptedSender::new(vec![Scripted::Hang]);
        let transport = Transport::new(sender.clone());

        let start = Instant::now();
        let err = transport.send(&request(), &policy()).await.unwrap_err();

        assert_eq!(err, TransportError::Timeout { timeout_ms: 5000 });
        assert_eq!(sender.calls(), 1);
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_json_success_body_is_malformed() {
        let sender = ScriptedSender::new(vec![Scripted::Reply(200, "<html>".into())]);
        let transport = Transport::new(sender);

        let err = transport.send(&request(), &policy()).await.unwrap_err();
        assert!(matches!(err, TransportError::MalformedBody(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_max_attempts_still_tries_once() {
        let sender = ScriptedSender::new(vec![Scripted::Reply(429, "{}".into())]);
        let transport = Transport::new(sender.clone());
        let policy = RetryPolicy::new(Duration::from_secs(1), 0);

        let err = transport.send(&request(), &policy).await.unwrap_err();
        assert_eq!(err, TransportError::RateLimited { attempts: 1 });
        assert_eq!(sender.calls(), 1);
    }
}
