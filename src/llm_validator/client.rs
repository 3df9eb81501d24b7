/**
 * AdjudicatorClient
 *
 * DESIGN DECISION: A thin reqwest wrapper that speaks the ecosystem-standard
 * chat-completion JSON shape (`model`, `messages`, `max_tokens`, `temperature`) to
 * whatever `llm_endpoint` is configured
 * WHY: §4.4 only requires "a configured text-completion endpoint"; the
 * chat-completion shape is the lowest-common-denominator most adjudicator backends
 * (hosted or self-run) already accept
 */

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}

pub struct AdjudicatorClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AdjudicatorClient {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        temperature: f64,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            temperature,
        })
    }

    /// Send `prompt` as a single user message and return the raw completion text.
    /// Any transport, auth, or non-2xx failure is reported as `AdjudicatorUnavailable`
    /// so the caller's retry loop can treat it uniformly with a malformed-JSON result.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::AdjudicatorUnavailable(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::AdjudicatorUnavailable(format!(
                "adjudicator returned status {}",
                response.status()
            )));
        }

        let body: CompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::AdjudicatorUnavailable(format!("invalid response envelope: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::AdjudicatorUnavailable("empty choices array".to_string()))
    }
}
