/**
 * LLMValidator (§4.4)
 *
 * DESIGN DECISION: Last-resort adjudicator that sends a structured JSON-response
 * instruction to a configured completion endpoint, retries on malformed JSON with
 * exponential backoff, and is gated by a `CircuitBreaker`
 * WHY: This is the slowest and least predictable stage (§2 weighting, 10%); it must
 * never block the pipeline past `llm_timeout` and must degrade to `unavailable`
 * rather than stall the cascade once it starts failing
 *
 * RELATED: circuit_breaker.rs, client.rs, pipeline::hybrid (decides whether this
 * stage runs at all via smart routing + `Checks::expert_validation`)
 */

pub mod circuit_breaker;
pub mod client;

use crate::types::{Method, Severity, Verdict};
use circuit_breaker::CircuitBreaker;
use client::AdjudicatorClient;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::timeout;

pub struct LLMValidatorConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub breaker_failure_threshold: u32,
    pub breaker_cool_down: Duration,
}

impl Default for LLMValidatorConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: "default-adjudicator".to_string(),
            max_tokens: 256,
            temperature: 0.0,
            timeout: Duration::from_secs(15),
            retry_attempts: 3,
            retry_delay: Duration::from_millis(500),
            breaker_failure_threshold: 5,
            breaker_cool_down: Duration::from_secs(60),
        }
    }
}

/// The JSON shape we instruct the adjudicator to respond with (§4.4).
#[derive(Debug, Deserialize)]
struct AdjudicatorResponse {
    is_secure: bool,
    category: Option<String>,
    #[serde(default)]
    severity: Option<String>,
    reason: Option<String>,
    #[serde(default)]
    suggestion: Option<String>,
    #[serde(default = "default_confidence")]
    confidence: f64,
}

fn default_confidence() -> f64 {
    0.75
}

fn parse_severity(raw: Option<&str>) -> Severity {
    match raw.map(|s| s.to_lowercase()) {
        Some(ref s) if s == "critical" => Severity::Critical,
        Some(ref s) if s == "high" => Severity::High,
        Some(ref s) if s == "medium" => Severity::Medium,
        Some(ref s) if s == "low" => Severity::Low,
        _ => Severity::Info,
    }
}

fn build_prompt(text: &str, context: &str) -> String {
    format!(
        "You are a security adjudicator for an LLM agent framework. Classify the \
         following text and respond with ONLY a JSON object of the shape \
         {{\"is_secure\": bool, \"category\": string, \"severity\": \
         \"info\"|\"low\"|\"medium\"|\"high\"|\"critical\", \"confidence\": number \
         between 0 and 1, \"reason\": string, \"suggestion\": string}}. No other text.\n\n\
         Context: {context}\n\nText to classify:\n{text}"
    )
}

pub struct LLMValidator {
    client: Option<AdjudicatorClient>,
    breaker: CircuitBreaker,
    retry_attempts: u32,
    retry_delay: Duration,
    call_timeout: Duration,
}

impl LLMValidator {
    pub fn new(config: LLMValidatorConfig) -> Self {
        let client = if config.endpoint.is_empty() {
            None
        } else {
            AdjudicatorClient::new(
                config.endpoint.clone(),
                config.api_key.clone(),
                config.model.clone(),
                config.max_tokens,
                config.temperature,
                config.timeout,
            )
            .ok()
        };

        Self {
            client,
            breaker: CircuitBreaker::new(config.breaker_failure_threshold, config.breaker_cool_down),
            retry_attempts: config.retry_attempts,
            retry_delay: config.retry_delay,
            call_timeout: config.timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        self.client.is_some() && !self.breaker.is_open()
    }

    /// Adjudicate `text` given free-form `context` (e.g. the conversation history
    /// summary or session tags). Never panics; every failure mode resolves to an
    /// `is_secure = false` verdict per §4.4 / §7 fail-closed semantics.
    pub async fn adjudicate(&self, text: &str, context: &str) -> Verdict {
        let Some(client) = &self.client else {
            return Verdict::unavailable(Method::Llm, "no adjudicator endpoint configured");
        };

        if !self.breaker.allow_request() {
            return Verdict::unavailable(Method::Llm, "circuit_breaker_open");
        }

        let prompt = build_prompt(text, context);
        let mut last_error = String::new();
        let mut delay = self.retry_delay;

        let outcome = timeout(self.call_timeout, async {
            for attempt in 0..self.retry_attempts {
                match client.complete(&prompt).await {
                    Ok(raw) => match parse_response(&raw) {
                        Ok(parsed) => return Ok(parsed),
                        Err(e) => {
                            last_error = e.to_string();
                            tracing::warn!(attempt, error = %last_error, "adjudicator returned malformed JSON");
                        }
                    },
                    Err(e) => {
                        last_error = e.to_string();
                        tracing::warn!(attempt, error = %last_error, "adjudicator call failed");
                    }
                }
                if attempt + 1 < self.retry_attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
            Err(last_error.clone())
        })
        .await;

        match outcome {
            Ok(Ok(parsed)) => {
                self.breaker.record_success();
                Verdict {
                    is_secure: parsed.is_secure,
                    method: Method::Llm,
                    confidence: parsed.confidence.clamp(0.0, 1.0),
                    reason: parsed.reason,
                    category: parsed.category,
                    severity: parse_severity(parsed.severity.as_deref()),
                    suggestions: parsed.suggestion.into_iter().collect(),
                    elapsed_ms: 0,
                    patterns_checked: 0,
                    anomaly_score: None,
                }
            }
            Ok(Err(_)) => {
                self.breaker.record_failure();
                Verdict::unavailable(Method::Llm, "adjudicator_unavailable")
            }
            Err(_) => {
                self.breaker.record_failure();
                Verdict::unavailable(Method::Llm, "adjudicator_unavailable")
            }
        }
    }
}

fn parse_response(raw: &str) -> Result<AdjudicatorResponse, serde_json::Error> {
    let trimmed = raw.trim();
    let start = trimmed.find('{');
    let end = trimmed.rfind('}');
    let candidate = match (start, end) {
        (Some(s), Some(e)) if e >= s => &trimmed[s..=e],
        _ => trimmed,
    };
    serde_json::from_str(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_validator_reports_unavailable() {
        let validator = LLMValidator::new(LLMValidatorConfig::default());
        assert!(!validator.is_available());
    }

    #[test]
    fn parse_response_tolerates_surrounding_prose() {
        let raw = "Sure, here is the JSON:\n{\"is_secure\": false, \"category\": \"prompt_injection\", \"severity\": \"high\", \"confidence\": 0.9, \"reason\": \"instruction override attempt\"}\nHope that helps!";
        let parsed = parse_response(raw).unwrap();
        assert!(!parsed.is_secure);
        assert_eq!(parsed.category.as_deref(), Some("prompt_injection"));
    }

    #[test]
    fn parse_response_rejects_non_json() {
        assert!(parse_response("not json at all").is_err());
    }

    #[tokio::test]
    async fn unconfigured_validator_adjudicate_is_unavailable() {
        let validator = LLMValidator::new(LLMValidatorConfig::default());
        let verdict = validator.adjudicate("hello", "").await;
        assert!(!verdict.is_secure);
        assert_eq!(verdict.method, Method::Llm);
    }
}
