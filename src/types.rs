/**
 * Shared Data Model
 *
 * DESIGN DECISION: Data types shared by every validator and by the facade live in one
 * module, the way `aetherlight-core::pattern` centralizes the `Pattern` type
 * WHY: RegexValidator, MLValidator, LLMValidator, AdaptiveEngine and HybridPipeline
 * all produce and consume the same `Verdict`/`ValidationRequest` shapes; a single
 * definition keeps the merge logic in hybrid.rs honest
 *
 * PATTERN: Pattern-005 (Multi-Dimensional Matching), adapted to verdict merging
 */

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The kind of artifact being validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    Prompt,
    Output,
    Operation,
    InterAgent,
}

/// Which stage ultimately produced a `Verdict`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Regex,
    Ml,
    Llm,
    Adaptive,
    Cache,
    Hybrid,
    Error,
}

/// Severity of a detected issue, ordered `Critical > High > Medium > Low > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// Rank used for tie-breaking matches (§4.7 step 3): higher is more severe.
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }
}

/// A request to validate a piece of free text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub text: String,
    pub principal_id: String,
    pub session_id: String,
    pub kind: ValidationKind,
    pub profile_name: String,
    #[serde(default)]
    pub context_tags: HashSet<String>,
    #[serde(default)]
    pub behavior_hints: HashMap<String, serde_json::Value>,
}

impl ValidationRequest {
    pub fn new(
        text: impl Into<String>,
        principal_id: impl Into<String>,
        kind: ValidationKind,
        profile_name: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            principal_id: principal_id.into(),
            session_id: String::new(),
            kind,
            profile_name: profile_name.into(),
            context_tags: HashSet::new(),
            behavior_hints: HashMap::new(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_context_tags(mut self, tags: impl IntoIterator<Item = String>) -> Self {
        self.context_tags.extend(tags);
        self
    }
}

/// The structured result of a validation call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub is_secure: bool,
    pub method: Method,
    pub confidence: f64,
    pub reason: Option<String>,
    pub category: Option<String>,
    pub severity: Severity,
    pub suggestions: Vec<String>,
    pub elapsed_ms: u64,
    pub patterns_checked: usize,
    pub anomaly_score: Option<f64>,
}

impl Verdict {
    /// A trivially secure verdict (e.g. empty input, see §8 boundary cases).
    pub fn secure(method: Method) -> Self {
        Self {
            is_secure: true,
            method,
            confidence: 0.0,
            reason: None,
            category: None,
            severity: Severity::Info,
            suggestions: Vec::new(),
            elapsed_ms: 0,
            patterns_checked: 0,
            anomaly_score: None,
        }
    }

    /// Fail-closed verdict for an unavailable/timed-out/erroring stage (§7).
    pub fn unavailable(method: Method, reason: impl Into<String>) -> Self {
        Self {
            is_secure: false,
            method,
            confidence: 0.0,
            reason: Some(reason.into()),
            category: Some("validator_unavailable".to_string()),
            severity: Severity::Medium,
            suggestions: vec!["retry once the validator stage recovers".to_string()],
            elapsed_ms: 0,
            patterns_checked: 0,
            anomaly_score: None,
        }
    }

    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self {
            is_secure: false,
            method: Method::Error,
            confidence: 1.0,
            reason: Some(reason.into()),
            category: Some("internal_error".to_string()),
            severity: Severity::High,
            suggestions: Vec::new(),
            elapsed_ms: 0,
            patterns_checked: 0,
            anomaly_score: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ranks_monotonically() {
        assert!(Severity::Critical.rank() > Severity::High.rank());
        assert!(Severity::High.rank() > Severity::Medium.rank());
        assert!(Severity::Medium.rank() > Severity::Low.rank());
        assert!(Severity::Low.rank() > Severity::Info.rank());
    }

    #[test]
    fn secure_verdict_has_no_findings() {
        let v = Verdict::secure(Method::Regex);
        assert!(v.is_secure);
        assert!(v.category.is_none());
    }
}
