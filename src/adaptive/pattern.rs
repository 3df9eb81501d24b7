/**
 * EnhancedPattern (§3 DATA MODEL)
 *
 * DESIGN DECISION: Content-hash identity plus a single mutation helper that is the
 * only code allowed to touch frequency/TP/FP/confidence, the way
 * `aetherlight-core::pattern::Pattern` keeps its fields private behind a builder and
 * a fixed set of methods
 * WHY: §9 "Pattern objects with many implicit invariants" calls for exactly this:
 * localize every invariant (confidence clamp, decay, context-boost cap) to one place
 * so the rest of the engine cannot accidentally violate them
 *
 * PATTERN: adapted from Pattern/PatternBuilder, trading immutability for a narrow
 * mutation surface (`record_outcome`, `touch`) since this pattern type evolves after
 * construction
 */

use crate::types::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Where a pattern originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternSource {
    Seed,
    ThreatIntel,
    Novel,
    User,
}

/// Confidence is never allowed above this ceiling (§3).
pub const CONFIDENCE_CEILING: f64 = 0.98;

/// Maximum boost a matching `context_tags` overlap can add to effective confidence.
const MAX_CONTEXT_BOOST: f64 = 0.2;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedPattern {
    pub id: String,
    pub expression: String,
    pub category: String,
    pub severity: Severity,
    pub confidence: f64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub frequency: u64,
    pub true_positives: u64,
    pub false_positives: u64,
    pub source: PatternSource,
    pub context_tags: Vec<String>,
    pub behavior_indicators: HashMap<String, f64>,
    pub decay_factor: f64,
    pub adaptation_rate: f64,
}

/// Content-hash a pattern's identity-bearing fields into a stable id (§3 "id (content
/// hash)").
fn content_hash(expression: &str, category: &str, source: PatternSource) -> String {
    let mut hasher = Sha256::new();
    hasher.update(expression.as_bytes());
    hasher.update(b"|");
    hasher.update(category.as_bytes());
    hasher.update(b"|");
    hasher.update(format!("{source:?}").as_bytes());
    hex::encode(hasher.finalize())
}

impl EnhancedPattern {
    pub fn new(
        expression: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        source: PatternSource,
        context_tags: Vec<String>,
    ) -> Self {
        let expression = expression.into();
        let category = category.into();
        let now = Utc::now();
        let id = content_hash(&expression, &category, source);
        Self {
            id,
            expression,
            category,
            severity,
            confidence: 0.7,
            first_seen: now,
            last_seen: now,
            frequency: 0,
            true_positives: 0,
            false_positives: 0,
            source,
            context_tags,
            behavior_indicators: HashMap::new(),
            decay_factor: 0.95,
            adaptation_rate: 0.1,
        }
    }

    /// Construct with an explicit initial confidence, used by `SynthesizeNovel`
    /// (§4.5: `initial confidence 0.6 + 0.2 · anomaly_score`).
    pub fn new_with_confidence(
        expression: impl Into<String>,
        category: impl Into<String>,
        severity: Severity,
        source: PatternSource,
        context_tags: Vec<String>,
        initial_confidence: f64,
    ) -> Self {
        let mut pattern = Self::new(expression, category, severity, source, context_tags);
        pattern.confidence = initial_confidence.clamp(0.0, CONFIDENCE_CEILING);
        pattern
    }

    fn accuracy(&self) -> f64 {
        let total = self.true_positives + self.false_positives;
        if total == 0 {
            0.5
        } else {
            self.true_positives as f64 / total as f64
        }
    }

    fn temporal_decay(&self) -> f64 {
        let age_days = (Utc::now() - self.last_seen).num_seconds().max(0) as f64 / 86_400.0;
        self.decay_factor.powf(age_days)
    }

    fn frequency_boost(&self) -> f64 {
        1.0 + self.adaptation_rate * (self.frequency as f64).ln_1p()
    }

    fn context_richness(&self) -> f64 {
        1.0 + 0.02 * (self.context_tags.len().min(5) as f64)
    }

    /// Recompute `confidence = accuracy · temporal_decay · frequency_boost ·
    /// context_richness`, clamped to `CONFIDENCE_CEILING` (§3).
    fn recompute_confidence(&mut self) {
        let raw = self.accuracy() * self.temporal_decay() * self.frequency_boost() * self.context_richness();
        self.confidence = raw.clamp(0.0, CONFIDENCE_CEILING);
    }

    /// Bump frequency/last_seen on every match, independent of TP/FP feedback.
    pub fn touch(&mut self) {
        self.frequency += 1;
        self.last_seen = Utc::now();
        self.recompute_confidence();
    }

    /// Apply caller-supplied feedback (§4.5 `RecordOutcome`) and recompute confidence.
    pub fn record_outcome(&mut self, true_positive: bool) {
        if true_positive {
            self.true_positives += 1;
        } else {
            self.false_positives += 1;
        }
        self.recompute_confidence();
    }

    /// Bounded context boost (§3: "≤ 0.2") granted when the request's context tags
    /// overlap this pattern's.
    pub fn context_boost(&self, request_tags: &std::collections::HashSet<String>) -> f64 {
        if self.context_tags.is_empty() || request_tags.is_empty() {
            return 0.0;
        }
        let overlap = self
            .context_tags
            .iter()
            .filter(|t| request_tags.contains(*t))
            .count();
        let fraction = overlap as f64 / self.context_tags.len() as f64;
        (fraction * MAX_CONTEXT_BOOST).min(MAX_CONTEXT_BOOST)
    }

    /// Effective confidence for a specific request: base confidence plus the bounded
    /// context boost, capped at 0.99 (§4.5).
    pub fn effective_confidence(&self, request_tags: &std::collections::HashSet<String>) -> f64 {
        (self.confidence + self.context_boost(request_tags)).min(0.99)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn confidence_never_exceeds_ceiling() {
        let mut pattern = EnhancedPattern::new(
            "evil",
            "test_category",
            Severity::High,
            PatternSource::Seed,
            vec![],
        );
        for _ in 0..1000 {
            pattern.record_outcome(true);
            pattern.touch();
        }
        assert!(pattern.confidence <= CONFIDENCE_CEILING);
        assert!(pattern.confidence >= 0.0);
    }

    #[test]
    fn context_boost_is_bounded() {
        let mut pattern = EnhancedPattern::new(
            "evil",
            "test_category",
            Severity::High,
            PatternSource::Seed,
            vec!["shell".to_string(), "admin".to_string()],
        );
        pattern.confidence = 0.9;
        let mut tags = HashSet::new();
        tags.insert("shell".to_string());
        tags.insert("admin".to_string());
        assert!(pattern.context_boost(&tags) <= MAX_CONTEXT_BOOST + 1e-9);
        assert!(pattern.effective_confidence(&tags) <= 0.99);
    }

    #[test]
    fn content_hash_is_deterministic_and_distinguishes_category() {
        let a = EnhancedPattern::new("x", "sql_injection", Severity::High, PatternSource::Seed, vec![]);
        let b = EnhancedPattern::new("x", "sql_injection", Severity::High, PatternSource::Seed, vec![]);
        let c = EnhancedPattern::new("x", "command_injection", Severity::High, PatternSource::Seed, vec![]);
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn synthesized_pattern_uses_anomaly_scaled_initial_confidence() {
        let pattern = EnhancedPattern::new_with_confidence(
            "eval|__builtins__",
            "novel_exploit",
            Severity::Medium,
            PatternSource::Novel,
            vec![],
            0.6 + 0.2 * 0.8,
        );
        assert!((pattern.confidence - 0.76).abs() < 1e-9);
        assert_eq!(pattern.source, PatternSource::Novel);
    }
}
