/**
 * HybridPipeline (§4.8)
 *
 * DESIGN DECISION: One struct owning the three base validators, the cache, and the
 * adaptive engine behind a single `Mutex<AdaptiveEngine>` standing in for the
 * "engine-scoped lock" of §5, composed the way `aetherlight-core`'s domain agents
 * compose a pattern library + embeddings + history behind one owning struct
 * WHY: §5 requires PatternStore/BehaviorStore mutation to happen under one lock and
 * requires "no lock spans an LLM call" — holding the adaptive lock only for the
 * synchronous `evaluate()` call (after the async ML/LLM stages have already
 * returned) satisfies both
 *
 * REASONING CHAIN (resolves an internal inconsistency in §4.8's own numbering):
 * 1. Step 3 ("Stage 2 — Smart route") says content_analysis off "skip[s] stages 2
 *    and 3"; step 5 ("Stage 3 — Adaptive") says adaptive "Always run[s] ... after
 *    the base validators (regardless of prior verdicts)"
 * 2. These two sentences cannot both be taken literally; "Always run" is the more
 *    specific and more load-bearing claim (learning must proceed even when content
 *    analysis is disabled, §4.7 intro)
 * 3. Resolution: `content_analysis` gates ML/LLM only. AdaptiveEngine runs on every
 *    request regardless of checks, consistent with §4.7's standalone algorithm
 *
 * RELATED: cache.rs, regex_validator, ml_validator, llm_validator, adaptive::engine
 */

use super::cache::CacheLayer;
use crate::adaptive::AdaptiveEngine;
use crate::llm_validator::LLMValidator;
use crate::ml_validator::MLValidator;
use crate::profile::{ResolvedProfile, Thresholds};
use crate::regex_validator::RegexValidator;
use crate::types::{Method, Severity, Verdict};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Below this length, smart routing sends text through ML only (§4.8 step 3).
const SHORT_TEXT_CHARS: usize = 200;

pub struct HybridPipelineConfig {
    pub cache_ttl: Duration,
    pub max_cache_size: usize,
    pub max_validation_time: Duration,
    pub enable_caching: bool,
    pub enable_smart_routing: bool,
}

impl Default for HybridPipelineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(300),
            max_cache_size: 10_000,
            max_validation_time: Duration::from_secs(30),
            enable_caching: true,
            enable_smart_routing: true,
        }
    }
}

pub struct HybridPipeline {
    regex: RegexValidator,
    ml: MLValidator,
    llm: LLMValidator,
    adaptive: Mutex<AdaptiveEngine>,
    cache: CacheLayer,
    config: HybridPipelineConfig,
}

fn ml_verdict_from(classification: &crate::ml_validator::MlClassification, threshold: f64) -> Verdict {
    let blocks = Thresholds::blocks(threshold, classification.prob_insecure);
    Verdict {
        is_secure: !blocks,
        method: Method::Ml,
        confidence: classification.prob_insecure,
        reason: if blocks {
            Some("ml classifier flagged input as insecure".to_string())
        } else {
            None
        },
        category: classification.category.clone(),
        severity: if blocks { Severity::Medium } else { Severity::Info },
        suggestions: if blocks {
            vec!["review rationale tokens and consider tightening the prompt".to_string()]
        } else {
            Vec::new()
        },
        elapsed_ms: 0,
        patterns_checked: 0,
        anomaly_score: None,
    }
}

fn is_ambiguous(ml: &Verdict) -> bool {
    (0.3..0.7).contains(&ml.confidence)
}

impl HybridPipeline {
    pub fn new(
        regex: RegexValidator,
        ml: MLValidator,
        llm: LLMValidator,
        config: HybridPipelineConfig,
    ) -> Self {
        let cache = CacheLayer::new(config.max_cache_size, config.cache_ttl);
        Self {
            regex,
            ml,
            llm,
            adaptive: Mutex::new(AdaptiveEngine::new()),
            cache,
            config,
        }
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }

    pub fn pattern_count(&self) -> usize {
        self.adaptive.lock().expect("adaptive lock poisoned").pattern_count()
    }

    pub fn llm_breaker_available(&self) -> bool {
        self.llm.is_available()
    }

    /// Run the full §4.8 algorithm for one request.
    pub async fn validate(
        &self,
        text: &str,
        principal_id: &str,
        kind_tag: &str,
        context_tags: &std::collections::HashSet<String>,
        profile: &ResolvedProfile,
    ) -> Verdict {
        let start = Instant::now();

        // Step 1: cache lookup.
        if self.config.enable_caching {
            if let Some(cached) = self.cache.get(&profile.name, kind_tag, text) {
                return Verdict {
                    method: Method::Cache,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    ..cached
                };
            }
        }

        let result = tokio::time::timeout(
            self.config.max_validation_time,
            self.validate_uncached(text, principal_id, kind_tag, context_tags, profile),
        )
        .await;

        let mut verdict = match result {
            Ok(v) => v,
            Err(_) => Verdict::unavailable(Method::Hybrid, "stage_timeout"),
        };
        verdict.elapsed_ms = start.elapsed().as_millis() as u64;

        if self.config.enable_caching {
            self.cache
                .insert_with_ttl(&profile.name, kind_tag, text, verdict.clone(), self.config.cache_ttl);
        }

        verdict
    }

    async fn validate_uncached(
        &self,
        text: &str,
        principal_id: &str,
        kind_tag: &str,
        context_tags: &std::collections::HashSet<String>,
        profile: &ResolvedProfile,
    ) -> Verdict {
        // Step 2: Stage 1 - regex, always run when critical_exploits or
        // system_commands is enabled.
        if profile.checks.critical_exploits || profile.checks.system_commands {
            let regex_verdict = self.regex.scan(text, profile);
            if !regex_verdict.is_secure {
                self.run_adaptive(text, principal_id, kind_tag, context_tags, profile, true);
                return regex_verdict;
            }
        }

        // Step 3/4: Stage 2 - ML/LLM smart routing, gated by content_analysis.
        let mut stage_verdicts: Vec<Verdict> = Vec::new();
        if profile.checks.content_analysis {
            let threshold = profile.thresholds.injection_score;
            let run_both = !self.config.enable_smart_routing || text.chars().count() >= SHORT_TEXT_CHARS;

            if run_both {
                let ml_fut = self.classify_ml(text, threshold);
                let llm_fut = self.llm.adjudicate(text, kind_tag);

                tokio::select! {
                    ml_result = ml_fut => {
                        if !ml_result.is_secure && Thresholds::blocks(threshold, ml_result.confidence) {
                            stage_verdicts.push(ml_result);
                        } else {
                            let llm_result = self.llm.adjudicate(text, kind_tag).await;
                            stage_verdicts.push(ml_result);
                            stage_verdicts.push(llm_result);
                        }
                    }
                    llm_result = llm_fut => {
                        if !llm_result.is_secure && Thresholds::blocks(threshold, llm_result.confidence) {
                            stage_verdicts.push(llm_result);
                        } else {
                            let ml_result = self.classify_ml(text, threshold).await;
                            stage_verdicts.push(ml_result);
                            stage_verdicts.push(llm_result);
                        }
                    }
                }
            } else {
                let ml_result = self.classify_ml(text, threshold).await;
                let ambiguous = is_ambiguous(&ml_result);
                stage_verdicts.push(ml_result);
                if ambiguous {
                    stage_verdicts.push(self.llm.adjudicate(text, kind_tag).await);
                }
            }
        }

        let base_insecure = stage_verdicts.iter().any(|v| !v.is_secure);

        // Step 5: Stage 3 - adaptive, always runs.
        let adaptive_verdict = self.run_adaptive(text, principal_id, kind_tag, context_tags, profile, base_insecure);

        // Step 6: merge.
        let mut all = stage_verdicts;
        all.push(adaptive_verdict);

        let blocking = all.iter().find(|v| !v.is_secure);
        if let Some(blocker) = blocking {
            return blocker.clone();
        }

        let min_confidence = all
            .iter()
            .map(|v| v.confidence)
            .fold(f64::INFINITY, f64::min);
        Verdict {
            is_secure: true,
            method: Method::Hybrid,
            confidence: if min_confidence.is_finite() { min_confidence } else { 0.0 },
            reason: None,
            category: None,
            severity: Severity::Info,
            suggestions: Vec::new(),
            elapsed_ms: 0,
            patterns_checked: all.iter().map(|v| v.patterns_checked).sum(),
            anomaly_score: all.iter().find_map(|v| v.anomaly_score),
        }
    }

    async fn classify_ml(&self, text: &str, threshold: f64) -> Verdict {
        match self.ml.classify(text) {
            Some(classification) => ml_verdict_from(&classification, threshold),
            None => Verdict::unavailable(Method::Ml, "ml_model_unavailable"),
        }
    }

    fn run_adaptive(
        &self,
        text: &str,
        principal_id: &str,
        kind_tag: &str,
        context_tags: &std::collections::HashSet<String>,
        profile: &ResolvedProfile,
        base_stage_insecure: bool,
    ) -> Verdict {
        let mut engine = self.adaptive.lock().expect("adaptive lock poisoned");
        engine.evaluate(
            text,
            principal_id,
            kind_tag,
            context_tags,
            profile.thresholds.injection_score,
            base_stage_insecure,
        )
    }
}
