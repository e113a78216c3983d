//! Moderation gate for Parlance
//!
//! The gate calls an external safety-classification service and yields a
//! flagged/unflagged verdict with per-category scores. It is stateless and
//! purely advisory: it never mutates session state, and a transient failure
//! of the service is a hard failure surfaced to the caller, never silently
//! treated as "safe".

use crate::config::ModerationConfig;
use crate::error::{ParlanceError, Result};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Default API base when none is configured
const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Per-category verdict with its classifier score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    /// Whether this category was flagged
    pub flagged: bool,
    /// Classifier score in [0, 1], rounded to 3 decimals
    pub score: f64,
}

/// Verdict from a moderation check
///
/// Derived fresh per check and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationVerdict {
    /// Whether the input was flagged overall
    pub flagged: bool,
    /// Per-category flags and scores
    pub categories: HashMap<String, CategoryScore>,
}

/// Trait for safety-classification services
///
/// A single stateless operation with no caching and no retry.
#[async_trait]
pub trait ModerationGate: Send + Sync {
    /// Classify the given text
    async fn check(&self, text: &str) -> Result<ModerationVerdict>;
}

/// Request body for the moderations endpoint
#[derive(Debug, Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
}

/// Response body from the moderations endpoint
#[derive(Debug, Deserialize)]
struct ModerationResponse {
    #[serde(default)]
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: HashMap<String, bool>,
    #[serde(default)]
    category_scores: HashMap<String, f64>,
}

/// OpenAI-compatible moderation gate
///
/// # Examples
///
/// ```no_run
/// use parlance::config::ModerationConfig;
/// use parlance::moderation::{ModerationGate, OpenAiModerationGate};
///
/// # async fn example() -> parlance::error::Result<()> {
/// let gate = OpenAiModerationGate::new(ModerationConfig::default())?;
/// let verdict = gate.check("user: hello").await?;
/// assert!(!verdict.flagged);
/// # Ok(())
/// # }
/// ```
pub struct OpenAiModerationGate {
    http: Client,
    api_base: String,
    api_key: Option<String>,
}

impl OpenAiModerationGate {
    /// Create a new gate from configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: ModerationConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("parlance/0.2.0")
            .build()
            .map_err(|e| {
                ParlanceError::Moderation(format!("Failed to create HTTP client: {}", e))
            })?;

        let api_key = std::env::var(&config.api_key_env).ok();
        let api_base = config
            .api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        tracing::info!("Initialized moderation gate: api_base={}", api_base);

        Ok(Self {
            http,
            api_base,
            api_key,
        })
    }
}

#[async_trait]
impl ModerationGate for OpenAiModerationGate {
    async fn check(&self, text: &str) -> Result<ModerationVerdict> {
        let url = format!("{}/moderations", self.api_base);
        tracing::debug!("Moderation check: {} chars", text.len());

        let mut request = self.http.post(&url).json(&ModerationRequest { input: text });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            ParlanceError::Moderation(format!("Failed to reach moderation service: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Moderation service returned {}: {}", status, body);
            return Err(ParlanceError::Moderation(format!(
                "Moderation service returned {}",
                status
            ))
            .into());
        }

        let parsed: ModerationResponse = response.json().await.map_err(|e| {
            ParlanceError::Moderation(format!("Failed to parse moderation response: {}", e))
        })?;

        let result = parsed.results.into_iter().next().ok_or_else(|| {
            ParlanceError::Moderation("Moderation response contained no results".to_string())
        })?;

        let categories = result
            .categories
            .iter()
            .map(|(name, &flagged)| {
                let score = result.category_scores.get(name).copied().unwrap_or(0.0);
                (
                    name.clone(),
                    CategoryScore {
                        flagged,
                        score: round3(score),
                    },
                )
            })
            .collect();

        Ok(ModerationVerdict {
            flagged: result.flagged,
            categories,
        })
    }
}

/// Round a classifier score to 3 decimal places
fn round3(score: f64) -> f64 {
    (score * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round3() {
        assert_eq!(round3(0.123_456), 0.123);
        assert_eq!(round3(0.999_9), 1.0);
        assert_eq!(round3(0.0), 0.0);
    }

    #[test]
    fn test_parses_moderation_result() {
        let raw = r#"{
            "results": [{
                "flagged": true,
                "categories": {"violence": true, "self-harm": false},
                "category_scores": {"violence": 0.98765, "self-harm": 0.00012}
            }]
        }"#;
        let parsed: ModerationResponse = serde_json::from_str(raw).unwrap();
        let result = &parsed.results[0];
        assert!(result.flagged);
        assert_eq!(result.categories["violence"], true);
        assert!(result.category_scores["self-harm"] < 0.001);
    }

    #[tokio::test]
    async fn test_check_builds_verdict_with_rounded_scores() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/moderations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "flagged": true,
                    "categories": {"violence": true},
                    "category_scores": {"violence": 0.987654}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gate = OpenAiModerationGate::new(ModerationConfig {
            enabled: true,
            api_base: Some(server.uri()),
            api_key_env: "PARLANCE_TEST_KEY_UNSET".to_string(),
        })
        .unwrap();

        let verdict = gate.check("some text").await.unwrap();
        assert!(verdict.flagged);
        assert_eq!(verdict.categories["violence"].score, 0.988);
        assert!(verdict.categories["violence"].flagged);
    }

    #[tokio::test]
    async fn test_check_fails_hard_on_service_error() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/moderations"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let gate = OpenAiModerationGate::new(ModerationConfig {
            enabled: true,
            api_base: Some(server.uri()),
            api_key_env: "PARLANCE_TEST_KEY_UNSET".to_string(),
        })
        .unwrap();

        // A failing classifier is never treated as safe.
        assert!(gate.check("some text").await.is_err());
    }
}
