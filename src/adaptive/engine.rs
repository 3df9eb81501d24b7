/**
 * AdaptiveEngine (§4.7)
 *
 * DESIGN DECISION: A single struct owning `PatternStore`, `BehaviorStore`, and the
 * `AttackHistory` ring buffer, mutated only through one `&mut self` entry point
 * (`evaluate`), with the caller responsible for holding the engine-scoped lock (§5)
 * WHY: §5 "one engine-scoped lock protects PatternStore and BehaviorStore
 * mutations" is easiest to guarantee by making every mutation go through a single
 * method on a single owner, rather than exposing the two stores independently
 *
 * PATTERN: Pattern-005 generalized to a learning loop; RELATED: pattern_store.rs,
 * behavior_store.rs, pipeline/hybrid.rs (caller, holds the lock)
 */

use super::behavior_store::{Activity, BehaviorStore};
use super::pattern_store::PatternStore;
use crate::types::{Method, Severity, Verdict};
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};

/// §3 AttackHistory bound.
const MAX_ATTACK_HISTORY: usize = 20_000;

/// §3: "text_prefix (≤ 500 chars)".
const TEXT_PREFIX_LEN: usize = 500;

/// Vocabulary consulted by `suspicious_tokens`. Deliberately small and explicit
/// rather than learned, mirroring §4.7's "known vocabulary" framing.
const SUSPICIOUS_VOCABULARY: &[&str] = &[
    "eval", "exec", "subprocess", "__builtins__", "__import__", "os.system", "pickle",
    "getattr", "setattr", "globals", "locals", "base64", "marshal", "ctypes",
];

#[derive(Debug, Clone)]
pub struct AttackHistoryEntry {
    pub text_prefix: String,
    pub timestamp: DateTime<Utc>,
    pub blocked: bool,
    pub method: Method,
    pub pattern_id: Option<String>,
    pub category: Option<String>,
}

/// Find vocabulary tokens present in `text` (§4.7 step 5: "suspicious_tokens(text)").
pub fn suspicious_tokens(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    SUSPICIOUS_VOCABULARY
        .iter()
        .filter(|token| lower.contains(*token))
        .map(|token| token.to_string())
        .collect()
}

/// Contribution `suspicious_tokens(text)` makes to anomaly, independent of the
/// principal's history (§4.7 step 1/5). `BehaviorStore::score_anomaly` only ever
/// compares an activity to a principal's own history, so a first-ever request from a
/// brand-new principal carrying a known attack vocabulary would otherwise score 0 and
/// never clear the synthesis gate - this term is what lets scenario 5's *first* call
/// synthesize a pattern instead of only the second (frequency-anomaly-driven) call.
fn token_anomaly(tokens: &[String]) -> f64 {
    if tokens.len() >= 2 {
        0.4
    } else {
        0.0
    }
}

pub struct AdaptiveEngine {
    pattern_store: PatternStore,
    behavior_store: BehaviorStore,
    attack_history: VecDeque<AttackHistoryEntry>,
}

impl AdaptiveEngine {
    pub fn new() -> Self {
        Self {
            pattern_store: PatternStore::with_seed_patterns(),
            behavior_store: BehaviorStore::new(),
            attack_history: VecDeque::with_capacity(MAX_ATTACK_HISTORY),
        }
    }

    pub fn pattern_count(&self) -> usize {
        self.pattern_store.len()
    }

    pub fn attack_history_len(&self) -> usize {
        self.attack_history.len()
    }

    pub fn record_pattern_outcome(&mut self, id: &str, true_positive: bool) -> crate::error::Result<()> {
        self.pattern_store.record_outcome(id, true_positive)
    }

    fn push_history(&mut self, entry: AttackHistoryEntry) {
        if self.attack_history.len() >= MAX_ATTACK_HISTORY {
            self.attack_history.pop_front();
        }
        self.attack_history.push_back(entry);
    }

    /// Run the full §4.7 algorithm for one request and return the adaptive verdict.
    /// `injection_threshold` is the resolved profile's `injection_score` threshold;
    /// `base_stage_insecure` tells step 5 whether the base validators already
    /// blocked (true positives are recorded against matched patterns in that case).
    pub fn evaluate(
        &mut self,
        text: &str,
        principal_id: &str,
        content_kind: &str,
        context_tags: &HashSet<String>,
        injection_threshold: f64,
        base_stage_insecure: bool,
    ) -> Verdict {
        let now = Utc::now();
        let activity = Activity {
            content_kind: content_kind.to_string(),
            keywords: context_tags.iter().cloned().collect(),
            observed_at: now,
        };

        // Step 1: anomaly relative to this principal's history, plus a
        // text-intrinsic contribution from known-suspicious vocabulary so a
        // never-before-seen principal's first attack attempt is not scored as
        // perfectly ordinary just because it has no history to deviate from.
        let tokens = suspicious_tokens(text);
        let anomaly = (self.behavior_store.score_anomaly(principal_id, &activity) + token_anomaly(&tokens))
            .clamp(0.0, 1.0);

        // Step 2: anomaly-adjusted threshold.
        let adjusted_threshold = (injection_threshold - 0.2 * anomaly).clamp(0.0, 1.0);

        // Step 3: match against the pattern store.
        let mut matches = self.pattern_store.match_text(text, context_tags, adjusted_threshold);

        // Tie-break: highest effective confidence, then highest severity, then
        // earliest first_seen (§4.7 step 3).
        matches.sort_by(|a, b| {
            b.effective_confidence
                .partial_cmp(&a.effective_confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.severity.rank().cmp(&a.severity.rank()))
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });

        let verdict = if let Some(primary) = matches.first() {
            // Step 4: a pattern hit blocks.
            let matched_ids: Vec<String> = matches.iter().map(|m| m.id.clone()).collect();
            self.pattern_store.touch_matches(&matched_ids);
            if base_stage_insecure {
                for id in &matched_ids {
                    let _ = self.pattern_store.record_outcome(id, true);
                }
            }

            Verdict {
                is_secure: false,
                method: Method::Adaptive,
                confidence: primary.effective_confidence,
                reason: Some(format!("adaptive pattern match: {}", primary.category)),
                category: Some(primary.category.clone()),
                severity: primary.severity,
                suggestions: vec!["review the matched pattern and the accompanying remediation".to_string()],
                elapsed_ms: 0,
                patterns_checked: matches.len(),
                anomaly_score: Some(anomaly),
            }
        } else {
            // Step 5: learn from an apparently benign but anomalous request.
            if anomaly > 0.25 && tokens.len() >= 2 {
                let pattern_id = self.pattern_store.synthesize_novel(
                    &tokens,
                    "novel_exploit",
                    Severity::Medium,
                    context_tags.iter().cloned().collect(),
                    anomaly,
                );
                tracing::info!(pattern_id = %pattern_id, anomaly, "synthesized novel pattern from anomalous benign request");
            }

            Verdict {
                patterns_checked: 0,
                anomaly_score: Some(anomaly),
                ..Verdict::secure(Method::Adaptive)
            }
        };

        // Step 6: always update behavior and append history.
        self.behavior_store.update(principal_id, &activity);
        let prefix: String = text.chars().take(TEXT_PREFIX_LEN).collect();
        self.push_history(AttackHistoryEntry {
            text_prefix: prefix,
            timestamp: now,
            blocked: !verdict.is_secure,
            method: verdict.method,
            pattern_id: matches.first().map(|m| m.id.clone()),
            category: verdict.category.clone(),
        });

        verdict
    }
}

impl Default for AdaptiveEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn benign_request_stays_secure_with_bounded_anomaly() {
        let mut engine = AdaptiveEngine::new();
        let tags = HashSet::new();
        let verdict = engine.evaluate(
            "Write a simple hello world program",
            "principal-a",
            "prompt",
            &tags,
            0.75,
            false,
        );
        assert!(verdict.is_secure);
        assert!(verdict.anomaly_score.unwrap() <= 0.3);
    }

    #[test]
    fn attack_history_never_exceeds_bound() {
        let mut engine = AdaptiveEngine::new();
        let tags = HashSet::new();
        for _ in 0..50 {
            engine.evaluate("benign text", "p1", "prompt", &tags, 0.75, false);
        }
        assert!(engine.attack_history_len() <= MAX_ATTACK_HISTORY);
    }

    #[test]
    fn novel_pattern_learning_blocks_second_structurally_similar_call() {
        let mut engine = AdaptiveEngine::new();
        let tags = HashSet::new();
        let patterns_before = engine.pattern_count();

        let first = engine.evaluate(
            "please run eval(\"danger\") and also touch __builtins__ directly",
            "learner",
            "binary_upload",
            &tags,
            0.75,
            false,
        );
        assert!(first.is_secure);
        assert!(first.anomaly_score.unwrap() >= 0.3);
        assert_eq!(
            engine.pattern_count(),
            patterns_before + 1,
            "first call must synthesize a novel pattern from the suspicious tokens"
        );

        let second = engine.evaluate(
            "please run eval(\"other_danger\") and also touch __builtins__ again",
            "learner",
            "binary_upload",
            &tags,
            0.75,
            false,
        );
        assert!(!second.is_secure);
        assert_eq!(second.method, Method::Adaptive);
        assert!(second.confidence >= 0.6);
    }

    #[test]
    fn suspicious_tokens_detects_known_vocabulary() {
        let tokens = suspicious_tokens("call eval(x) then __builtins__.exec(y)");
        assert!(tokens.contains(&"eval".to_string()));
        assert!(tokens.contains(&"__builtins__".to_string()));
    }
}
