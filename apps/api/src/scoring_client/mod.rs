//! Remote Scoring Client: the single point of entry for the optional hosted scorer.
//!
//! Only the Score Calculator's zero-match fallback uses this. Every failure is
//! returned as a `ScoringClientError`; callers decide how to degrade.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Total tries per request, the first one included.
const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ScoringClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Remote scorer unavailable after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ScoringClientError>,
    },
}

impl ScoringClientError {
    /// Transport failures, 429 and 5xx are worth another try.
    fn is_retryable(&self) -> bool {
        match self {
            ScoringClientError::Http(_) => true,
            ScoringClientError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            ScoringClientError::Parse(_) | ScoringClientError::Exhausted { .. } => false,
        }
    }
}

/// Body sent to the remote scorer.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteScoreRequest {
    pub job_description: String,
    pub resume_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

/// Only `overallScore` is required; the rest is passed through untouched.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteScoreResponse {
    pub overall_score: f64,
    #[serde(default)]
    pub category_scores: serde_json::Value,
    #[serde(default)]
    pub keyword_analysis: Vec<serde_json::Value>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteError {
    error: String,
}

#[derive(Clone)]
pub struct ScoringClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    backoff: Duration,
}

impl ScoringClient {
    pub fn new(
        endpoint: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ScoringClientError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            endpoint,
            api_key,
            backoff: BASE_BACKOFF,
        })
    }

    #[cfg(test)]
    fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POSTs the request, retrying on transport errors, 429 and 5xx with exponential
    /// backoff. Gives up with `Exhausted` after `MAX_ATTEMPTS` tries.
    pub async fn score(
        &self,
        request: &RemoteScoreRequest,
    ) -> Result<RemoteScoreResponse, ScoringClientError> {
        let mut attempt = 1;
        loop {
            let error = match self.try_score(request).await {
                Ok(parsed) => return Ok(parsed),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => e,
            };

            if attempt >= MAX_ATTEMPTS {
                return Err(ScoringClientError::Exhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            // 500ms, then 1s
            let delay = self.backoff * (1 << (attempt - 1));
            warn!(
                "Remote scoring attempt {} failed ({}), retrying after {}ms...",
                attempt,
                error,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn try_score(
        &self,
        request: &RemoteScoreRequest,
    ) -> Result<RemoteScoreResponse, ScoringClientError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!("Remote scorer returned {}: {}", status, body);
            let message = serde_json::from_str::<RemoteError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(ScoringClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed = parse_response(&body)?;
        debug!("Remote scorer returned overallScore={}", parsed.overall_score);
        Ok(parsed)
    }
}

/// Parses a response body, tolerating markdown code fences around the JSON.
pub fn parse_response(body: &str) -> Result<RemoteScoreResponse, ScoringClientError> {
    Ok(serde_json::from_str(strip_json_fences(body))?)
}

/// Strips ```json ... ``` or ``` ... ``` code fences.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(stripped)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode, routing::post, Router};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_request_serializes_camel_case_and_skips_missing_mode() {
        let request = RemoteScoreRequest {
            job_description: "Rust".to_string(),
            resume_content: "Wrote Rust".to_string(),
            mode: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["jobDescription"], "Rust");
        assert_eq!(value["resumeContent"], "Wrote Rust");
        assert!(value.get("mode").is_none());
    }

    #[test]
    fn test_parse_full_response() {
        let body = r#"{
            "overallScore": 72.5,
            "categoryScores": {"keywords": 60, "formatting": 90},
            "keywordAnalysis": [{"keyword": "rust", "found": true}],
            "suggestions": ["Mention Tokio"]
        }"#;
        let parsed = parse_response(body).unwrap();
        assert_eq!(parsed.overall_score, 72.5);
        assert_eq!(parsed.category_scores["formatting"], 90);
        assert_eq!(parsed.keyword_analysis.len(), 1);
        assert_eq!(parsed.suggestions, vec!["Mention Tokio"]);
    }

    #[test]
    fn test_parse_minimal_response() {
        let parsed = parse_response(r#"{"overallScore": 40}"#).unwrap();
        assert_eq!(parsed.overall_score, 40.0);
        assert!(parsed.suggestions.is_empty());
        assert!(parsed.category_scores.is_null());
    }

    #[test]
    fn test_parse_fenced_response() {
        let parsed = parse_response("```json\n{\"overallScore\": 33}\n```").unwrap();
        assert_eq!(parsed.overall_score, 33.0);
    }

    #[test]
    fn test_parse_missing_score_is_error() {
        assert!(matches!(
            parse_response(r#"{"suggestions": []}"#),
            Err(ScoringClientError::Parse(_))
        ));
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        assert_eq!(strip_json_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    fn sample_request() -> RemoteScoreRequest {
        RemoteScoreRequest {
            job_description: "x".to_string(),
            resume_content: "y".to_string(),
            mode: None,
        }
    }

    type Script = (Arc<AtomicUsize>, Arc<Vec<u16>>);

    /// Answers with the scripted statuses in order, repeating the last one.
    async fn scripted_scorer(State((calls, statuses)): State<Script>) -> (StatusCode, String) {
        let n = calls.fetch_add(1, Ordering::SeqCst);
        let code = statuses[n.min(statuses.len() - 1)];
        let status = StatusCode::from_u16(code).unwrap();
        let body = if status.is_success() {
            r#"{"overallScore": 41}"#
        } else {
            r#"{"error": "scorer overloaded"}"#
        };
        (status, body.to_string())
    }

    async fn spawn_scorer(statuses: &[u16]) -> (ScoringClient, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/score", post(scripted_scorer))
            .with_state((calls.clone(), Arc::new(statuses.to_vec())));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let client = ScoringClient::new(
            format!("http://{addr}/score"),
            Some("test-key".to_string()),
            Duration::from_secs(2),
        )
        .unwrap()
        .with_backoff(Duration::from_millis(1));
        (client, calls)
    }

    #[tokio::test]
    async fn test_retries_after_server_error_then_succeeds() {
        let (client, calls) = spawn_scorer(&[503, 200]).await;
        let parsed = client.score(&sample_request()).await.unwrap();
        assert_eq!(parsed.overall_score, 41.0);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_server_error_is_exhausted() {
        let (client, calls) = spawn_scorer(&[503]).await;
        match client.score(&sample_request()).await {
            Err(ScoringClientError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, MAX_ATTEMPTS);
                assert!(matches!(*last, ScoringClientError::Api { status: 503, .. }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried() {
        let (client, calls) = spawn_scorer(&[429, 429, 200]).await;
        assert!(client.score(&sample_request()).await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let (client, calls) = spawn_scorer(&[400]).await;
        match client.score(&sample_request()).await {
            Err(ScoringClientError::Api { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "scorer overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_exhausted_http_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let client = ScoringClient::new(
            "http://127.0.0.1:9/score".to_string(),
            None,
            Duration::from_millis(200),
        )
        .unwrap()
        .with_backoff(Duration::from_millis(1));
        match client.score(&sample_request()).await {
            Err(ScoringClientError::Exhausted { attempts, last }) => {
                assert_eq!(attempts, MAX_ATTEMPTS);
                assert!(matches!(*last, ScoringClientError::Http(_)));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }
}
