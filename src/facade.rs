/**
 * ValidationFacade (§4.10)
 *
 * DESIGN DECISION: The single public entry point; owns the `ProfileRegistry`,
 * `HybridPipeline`, and `Metrics`, and never lets an internal `Error` cross its
 * boundary (§7 "The facade never throws across its boundary")
 * WHY: §9 "Global mutable engine" design note: replace the source's process-wide
 * singleton with a constructible object the caller can choose to install globally
 * (`once_cell`/`OnceLock` at the call site) rather than baking a singleton in here
 *
 * RELATED: recommender.rs (attaches suggestions to blocking verdicts),
 * pipeline::hybrid (does the actual work), profile (resolves profile names)
 */

use crate::llm_validator::{LLMValidator, LLMValidatorConfig};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::ml_validator::MLValidator;
use crate::pipeline::{HybridPipeline, HybridPipelineConfig};
use crate::profile::ProfileRegistry;
use crate::recommender;
use crate::regex_validator::RegexValidator;
use crate::types::{Method, ValidationKind, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub llm_breaker_available: bool,
    pub cache_size: usize,
    pub pattern_count: usize,
    pub recent_error_rate: f64,
}

pub struct ValidationFacade {
    profiles: ProfileRegistry,
    pipeline: HybridPipeline,
    metrics: Metrics,
}

impl ValidationFacade {
    /// Build a facade from a fully resolved configuration. `ml_model_path` absent or
    /// unreadable is not fatal (§4.3); `llm_api_key` empty disables the LLM stage
    /// (every call short-circuits to `unavailable`, §4.4).
    pub fn new(config: &crate::config::SecurityEngineConfig) -> Self {
        let regex = RegexValidator::new().expect("seed regex rules must compile at startup");
        let ml = match &config.ml_model_path {
            Some(path) => MLValidator::load(Some(Path::new(path))),
            None => MLValidator::with_seed_model(),
        };
        let llm = LLMValidator::new(LLMValidatorConfig {
            endpoint: String::new(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model.clone(),
            max_tokens: config.llm_max_tokens,
            temperature: config.llm_temperature,
            timeout: std::time::Duration::from_secs(config.llm_timeout),
            retry_attempts: config.llm_retry_attempts,
            retry_delay: std::time::Duration::from_millis(config.llm_retry_delay),
            ..LLMValidatorConfig::default()
        });

        let pipeline_config = HybridPipelineConfig {
            cache_ttl: std::time::Duration::from_secs(config.cache_ttl),
            max_cache_size: config.max_cache_size,
            max_validation_time: std::time::Duration::from_secs(config.max_validation_time),
            enable_caching: config.enable_caching,
            enable_smart_routing: config.enable_smart_routing,
        };

        Self {
            profiles: ProfileRegistry::new(),
            pipeline: HybridPipeline::new(regex, ml, llm, pipeline_config),
            metrics: Metrics::new(),
        }
    }

    fn attach_suggestions(mut verdict: Verdict, fallback_text: &str) -> Verdict {
        if !verdict.is_secure && verdict.suggestions.is_empty() {
            if let Some(category) = verdict.category.clone() {
                verdict.suggestions = recommender::recommend(&category, fallback_text);
            }
        }
        verdict
    }

    async fn validate_internal(
        &self,
        text: &str,
        principal_id: &str,
        profile_name: &str,
        kind: ValidationKind,
        context_tags: &HashSet<String>,
    ) -> Verdict {
        let profile = self.profiles.resolve(profile_name);
        let kind_tag = match kind {
            ValidationKind::Prompt => "prompt",
            ValidationKind::Output => "output",
            ValidationKind::Operation => "operation",
            ValidationKind::InterAgent => "inter_agent",
        };

        let verdict = self
            .pipeline
            .validate(text, principal_id, kind_tag, context_tags, &profile)
            .await;

        self.metrics
            .record_request(!verdict.is_secure, verdict.method == Method::Cache);
        if verdict.method == Method::Error {
            self.metrics.record_error();
        }
        if !self.pipeline.llm_breaker_available() {
            self.metrics.record_breaker_trip();
        }

        Self::attach_suggestions(verdict, text)
    }

    pub async fn validate_prompt(&self, text: &str, principal_id: &str, profile_name: &str) -> Verdict {
        self.validate_internal(text, principal_id, profile_name, ValidationKind::Prompt, &HashSet::new())
            .await
    }

    pub async fn validate_output(&self, text: &str, principal_id: &str, profile_name: &str) -> Verdict {
        self.validate_internal(text, principal_id, profile_name, ValidationKind::Output, &HashSet::new())
            .await
    }

    /// Semantics identical to `validate_prompt` plus the operation-authenticity rule
    /// family, enabled by the profile's `expert_validation` check (§4.10).
    pub async fn validate_operation(&self, instructions: &str, principal_id: &str, profile_name: &str) -> Verdict {
        self.validate_internal(
            instructions,
            principal_id,
            profile_name,
            ValidationKind::Operation,
            &HashSet::new(),
        )
        .await
    }

    /// Adapter flavor for inter-agent message passing: piggybacks on
    /// `validate_prompt`'s pipeline with the sender's identity and the receiver's
    /// profile (§4.10).
    pub async fn validate_inter_agent_message(
        &self,
        text: &str,
        sender_principal_id: &str,
        receiver_profile_name: &str,
    ) -> Verdict {
        let mut tags = HashSet::new();
        tags.insert("inter_agent".to_string());
        self.validate_internal(
            text,
            sender_principal_id,
            receiver_profile_name,
            ValidationKind::InterAgent,
            &tags,
        )
        .await
    }

    pub fn register_custom_profile(
        &self,
        name: &str,
        thresholds: crate::profile::Thresholds,
        checks: crate::profile::Checks,
        description: impl Into<String>,
    ) -> crate::error::Result<()> {
        self.profiles.register_custom(name, thresholds, checks, description)
    }

    pub fn health_check(&self) -> HealthCheck {
        let snapshot = self.metrics.snapshot();
        let recent_error_rate = if snapshot.requests_total == 0 {
            0.0
        } else {
            snapshot.errors_total as f64 / snapshot.requests_total as f64
        };
        HealthCheck {
            llm_breaker_available: self.pipeline.llm_breaker_available(),
            cache_size: self.pipeline.cache_size(),
            pattern_count: self.pipeline.pattern_count(),
            recent_error_rate,
        }
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
