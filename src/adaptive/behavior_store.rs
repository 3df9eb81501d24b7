/**
 * BehaviorStore (§4.6)
 *
 * DESIGN DECISION: One `BehavioralProfile` per principal in a plain `HashMap`,
 * mutated only through `update`/`score_anomaly`, owned exclusively by
 * `AdaptiveEngine` under the engine-scoped lock (§5) the same way `PatternStore` is
 * WHY: §5 "Ordering guarantees" requires BehaviorStore updates for a single
 * principal to be serialized; a single lock around the whole engine gives that for
 * free without a per-principal lock table
 *
 * PATTERN: generalized from `aetherlight-core::agents::*`'s bounded `VecDeque`
 * session-history idiom (FIFO, fixed capacity) applied to `common_keywords`
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Bound on `common_keywords` (§3: "bounded_set<string, ≤ 20>").
const MAX_COMMON_KEYWORDS: usize = 20;

/// EMA smoothing factor for `session_patterns` and `ema_request_frequency` (§3, §4.6).
const EMA_ALPHA: f64 = 0.3;

/// A single observed request, as seen by the behavior store.
#[derive(Debug, Clone)]
pub struct Activity {
    pub content_kind: String,
    pub keywords: Vec<String>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehavioralProfile {
    pub principal_id: String,
    pub typical_content_kinds: HashSet<String>,
    pub common_keywords: VecDeque<String>,
    pub ema_request_frequency: f64,
    pub risk_score: f64,
    pub session_patterns: HashMap<String, f64>,
    pub last_updated: DateTime<Utc>,
}

impl BehavioralProfile {
    fn new(principal_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            principal_id: principal_id.into(),
            typical_content_kinds: HashSet::new(),
            common_keywords: VecDeque::with_capacity(MAX_COMMON_KEYWORDS),
            ema_request_frequency: 0.0,
            risk_score: 0.0,
            session_patterns: HashMap::new(),
            last_updated: now,
        }
    }
}

pub struct BehaviorStore {
    profiles: HashMap<String, BehavioralProfile>,
}

impl BehaviorStore {
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    fn profile_mut(&mut self, principal_id: &str) -> &mut BehavioralProfile {
        self.profiles
            .entry(principal_id.to_string())
            .or_insert_with(|| BehavioralProfile::new(principal_id))
    }

    pub fn profile(&self, principal_id: &str) -> Option<&BehavioralProfile> {
        self.profiles.get(principal_id)
    }

    pub fn principal_count(&self) -> usize {
        self.profiles.len()
    }

    /// Score how unlike `principal_id`'s history the given `activity` is, as the sum
    /// of three bounded contributions clamped to `[0, 1]` (§3).
    pub fn score_anomaly(&self, principal_id: &str, activity: &Activity) -> f64 {
        let Some(profile) = self.profiles.get(principal_id) else {
            // A brand-new principal has no history to compare against; §8 scenario 4
            // expects a fresh principal's anomaly to stay low (<=0.3), not zero,
            // since an unseen content kind alone should not saturate the score.
            return if profile_is_fresh_unusual(activity) { 0.3 } else { 0.0 };
        };

        let mut score = 0.0;

        if !profile.typical_content_kinds.is_empty()
            && !profile.typical_content_kinds.contains(&activity.content_kind)
        {
            score += 0.3;
        }

        let instantaneous = instantaneous_frequency(profile.last_updated, activity.observed_at);
        if profile.ema_request_frequency > 0.0 {
            let lower = profile.ema_request_frequency * 0.33;
            let upper = profile.ema_request_frequency * 3.0;
            if instantaneous < lower || instantaneous > upper {
                score += 0.4;
            }
        }

        if !profile.common_keywords.is_empty() {
            let unusual = activity
                .keywords
                .iter()
                .filter(|k| !profile.common_keywords.contains(k))
                .count();
            if activity.keywords.is_empty() || unusual * 2 > activity.keywords.len() {
                score += 0.3;
            }
        }

        score.clamp(0.0, 1.0)
    }

    /// Fold `activity` into `principal_id`'s profile: EMA session patterns, unseen
    /// content kinds, bounded FIFO keyword set (§4.6 `Update`).
    pub fn update(&mut self, principal_id: &str, activity: &Activity) {
        let instantaneous = {
            let existing = self.profiles.get(principal_id);
            existing
                .map(|p| instantaneous_frequency(p.last_updated, activity.observed_at))
                .unwrap_or(1.0)
        };

        let profile = self.profile_mut(principal_id);

        profile.typical_content_kinds.insert(activity.content_kind.clone());

        for keyword in &activity.keywords {
            if !profile.common_keywords.contains(keyword) {
                if profile.common_keywords.len() >= MAX_COMMON_KEYWORDS {
                    profile.common_keywords.pop_front();
                }
                profile.common_keywords.push_back(keyword.clone());
            }
        }

        profile.ema_request_frequency = if profile.ema_request_frequency == 0.0 {
            instantaneous
        } else {
            EMA_ALPHA * instantaneous + (1.0 - EMA_ALPHA) * profile.ema_request_frequency
        };

        let kind_counter = profile
            .session_patterns
            .entry(activity.content_kind.clone())
            .or_insert(0.0);
        *kind_counter = EMA_ALPHA * 1.0 + (1.0 - EMA_ALPHA) * *kind_counter;

        profile.last_updated = activity.observed_at;
    }
}

impl Default for BehaviorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn instantaneous_frequency(previous: DateTime<Utc>, current: DateTime<Utc>) -> f64 {
    let delta_seconds = (current - previous).num_milliseconds().max(1) as f64 / 1000.0;
    60.0 / delta_seconds
}

fn profile_is_fresh_unusual(activity: &Activity) -> bool {
    !activity.keywords.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn activity(kind: &str, keywords: &[&str], at: DateTime<Utc>) -> Activity {
        Activity {
            content_kind: kind.to_string(),
            keywords: keywords.iter().map(|s| s.to_string()).collect(),
            observed_at: at,
        }
    }

    #[test]
    fn fresh_principal_has_bounded_low_anomaly() {
        let store = BehaviorStore::new();
        let now = Utc::now();
        let score = store.score_anomaly("new-principal", &activity("prompt", &["hello"], now));
        assert!(score <= 0.3);
    }

    #[test]
    fn unusual_content_kind_contributes_to_anomaly() {
        let mut store = BehaviorStore::new();
        let base = Utc::now();
        store.update("p1", &activity("prompt", &["weather", "today"], base));
        store.update("p1", &activity("prompt", &["weather", "today"], base + Duration::seconds(30)));

        let score = store.score_anomaly(
            "p1",
            &activity("binary_upload", &["weather"], base + Duration::seconds(60)),
        );
        assert!(score >= 0.3);
    }

    #[test]
    fn common_keywords_bounded_to_twenty() {
        let mut store = BehaviorStore::new();
        let base = Utc::now();
        for i in 0..30 {
            let kw = format!("keyword{i}");
            store.update(
                "p1",
                &activity("prompt", &[kw.as_str()], base + Duration::seconds(i)),
            );
        }
        let profile = store.profile("p1").unwrap();
        assert!(profile.common_keywords.len() <= MAX_COMMON_KEYWORDS);
    }

    #[test]
    fn anomaly_score_is_always_bounded() {
        let mut store = BehaviorStore::new();
        let base = Utc::now();
        store.update("p1", &activity("prompt", &["a", "b"], base));
        let score = store.score_anomaly(
            "p1",
            &activity("totally_different", &["z", "y", "x"], base + Duration::hours(5)),
        );
        assert!((0.0..=1.0).contains(&score));
    }
}
