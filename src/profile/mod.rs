/**
 * ProfileRegistry
 *
 * DESIGN DECISION: Resolve a profile name to an immutable (Thresholds, Checks) record
 * through a registry, the way `aetherlight-core::config::policy::PolicyEnforcer`
 * resolves a named policy level to a `PolicyConfig`
 * WHY: Every validator in the pipeline consults the same resolved record; centralizing
 * resolution keeps the five built-in profiles and any custom profile consistent
 *
 * REASONING CHAIN:
 * 1. Five built-in profiles form a monotone lattice in what they permit (§3 invariant)
 * 2. Thresholds are "minimum confidence required to block" - higher is more permissive
 *    (§9 Open Question #2, resolved here once via `Thresholds::blocks`)
 * 3. Custom profiles bypass the lattice invariant by design
 * 4. Unknown names degrade to `standard` with a logged warning rather than failing
 *    the request (fail-closed belongs to the pipeline, not profile resolution)
 *
 * PATTERN: Pattern-CONFIG-001 (Hierarchical Configuration), adapted to a flat registry
 * RELATED: pipeline/hybrid.rs (consults Checks to decide which stages run)
 */

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// The five threshold dimensions from §3. Each is in `[0, 1]`; higher means more
/// confidence is required before a detector blocks, i.e. more permissive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub injection_score: f64,
    pub sensitive_data: f64,
    pub relevance_score: f64,
    pub reliability_score: f64,
    pub consistency_score: f64,
}

impl Thresholds {
    pub fn new(
        injection_score: f64,
        sensitive_data: f64,
        relevance_score: f64,
        reliability_score: f64,
        consistency_score: f64,
    ) -> Self {
        Self {
            injection_score,
            sensitive_data,
            relevance_score,
            reliability_score,
            consistency_score,
        }
    }

    /// Validate every field lies in `[0, 1]` (§4.1 RegisterCustom contract).
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("injection_score", self.injection_score),
            ("sensitive_data", self.sensitive_data),
            ("relevance_score", self.relevance_score),
            ("reliability_score", self.reliability_score),
            ("consistency_score", self.consistency_score),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::ThresholdOutOfRange(name.to_string(), value));
            }
        }
        Ok(())
    }

    /// §9 Open Question #2, resolved: a detector blocks when its confidence meets or
    /// exceeds the threshold for the dimension it speaks to. This is the only place in
    /// the crate that compares a confidence to a threshold for a block decision.
    pub fn blocks(threshold: f64, confidence: f64) -> bool {
        confidence >= threshold
    }

    /// True if `self` is at least as permissive as `other` in every dimension
    /// (used to assert the monotone-lattice invariant in tests, §8).
    pub fn at_least_as_permissive_as(&self, other: &Thresholds) -> bool {
        self.injection_score >= other.injection_score
            && self.sensitive_data >= other.sensitive_data
            && self.relevance_score <= other.relevance_score
            && self.reliability_score <= other.reliability_score
            && self.consistency_score <= other.consistency_score
    }
}

/// The boolean feature flags from §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checks {
    pub critical_exploits: bool,
    pub system_commands: bool,
    pub content_analysis: bool,
    pub format_validation: bool,
    pub context_validation: bool,
    pub output_validation: bool,
    pub expert_validation: bool,
}

impl Checks {
    pub fn all_enabled() -> Self {
        Self {
            critical_exploits: true,
            system_commands: true,
            content_analysis: true,
            format_validation: true,
            context_validation: true,
            output_validation: true,
            expert_validation: true,
        }
    }

    pub fn all_disabled() -> Self {
        Self {
            critical_exploits: false,
            system_commands: false,
            content_analysis: false,
            format_validation: false,
            context_validation: false,
            output_validation: false,
            expert_validation: false,
        }
    }
}

/// A resolved profile: a kind tag plus its thresholds and checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedProfile {
    pub name: String,
    pub thresholds: Thresholds,
    pub checks: Checks,
    pub is_custom: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CustomProfile {
    thresholds: Thresholds,
    checks: Checks,
    description: String,
}

/// Resolves profile names to threshold/check records; supports custom registration.
///
/// DESIGN DECISION: interior `RwLock` over a plain `HashMap` for custom profiles
/// WHY: `RegisterCustom` can be called concurrently with `Resolve` from many threads
/// (§5: the facade is reentrant); reads (the common path) take a shared lock
pub struct ProfileRegistry {
    custom: RwLock<HashMap<String, CustomProfile>>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self {
            custom: RwLock::new(HashMap::new()),
        }
    }

    fn built_in(name: &str) -> Option<(Thresholds, Checks, &'static str)> {
        match name {
            "minimal" => Some((
                Thresholds::new(0.98, 0.98, 0.02, 0.02, 0.02),
                // §9 Open Question #1, resolved: minimal still blocks real
                // system-destruction (critical_exploits stays on).
                Checks {
                    critical_exploits: true,
                    system_commands: false,
                    content_analysis: false,
                    format_validation: false,
                    context_validation: false,
                    output_validation: false,
                    expert_validation: false,
                },
                "Development-friendly security profile optimized for rapid iteration. \
                 Prioritizes code execution with light security awareness for critical \
                 exploits only.",
            )),
            "low" => Some((
                Thresholds::new(0.85, 0.85, 0.15, 0.15, 0.15),
                Checks {
                    critical_exploits: true,
                    system_commands: true,
                    content_analysis: false,
                    format_validation: false,
                    context_validation: false,
                    output_validation: false,
                    expert_validation: false,
                },
                "Streamlined security profile with basic protection against system \
                 commands and critical vulnerabilities while maintaining high code \
                 compatibility.",
            )),
            "standard" => Some((
                Thresholds::new(0.75, 0.75, 0.25, 0.25, 0.25),
                Checks::all_enabled(),
                "Balanced security profile suitable for most use cases. Provides \
                 moderate protection with reasonable workflow compatibility.",
            )),
            "high" => Some((
                Thresholds::new(0.40, 0.30, 0.60, 0.70, 0.70),
                Checks::all_enabled(),
                "Enhanced security profile with comprehensive protection mechanisms. \
                 Recommended for handling sensitive operations with strong security \
                 requirements.",
            )),
            "maximum" => Some((
                Thresholds::new(0.20, 0.10, 0.80, 0.90, 0.90),
                Checks::all_enabled(),
                "Enterprise-grade security profile with advanced protection layers. \
                 Ideal for production environments with strict security requirements \
                 and regulatory compliance needs.",
            )),
            _ => None,
        }
    }

    /// Resolve a profile name (case-insensitive). Unknown names default to
    /// `standard` with a logged warning (§4.1).
    pub fn resolve(&self, name: &str) -> ResolvedProfile {
        let lower = name.to_lowercase();

        if let Some((thresholds, checks, _)) = Self::built_in(&lower) {
            return ResolvedProfile {
                name: lower,
                thresholds,
                checks,
                is_custom: false,
            };
        }

        if let Some(custom) = self.custom.read().expect("profile lock poisoned").get(&lower) {
            return ResolvedProfile {
                name: lower,
                thresholds: custom.thresholds,
                checks: custom.checks,
                is_custom: true,
            };
        }

        tracing::warn!(profile = %name, "unknown security profile, defaulting to standard");
        let (thresholds, checks, _) = Self::built_in("standard").expect("standard is built-in");
        ResolvedProfile {
            name: "standard".to_string(),
            thresholds,
            checks,
            is_custom: false,
        }
    }

    /// Register a custom profile. Fails on name collision with a built-in, invalid
    /// thresholds, or (implicitly, by type) missing check flags (§4.1).
    pub fn register_custom(
        &self,
        name: &str,
        thresholds: Thresholds,
        checks: Checks,
        description: impl Into<String>,
    ) -> Result<()> {
        let lower = name.to_lowercase();
        if Self::built_in(&lower).is_some() {
            return Err(Error::InvalidProfile {
                name: lower,
                reason: "name collides with a built-in profile".to_string(),
            });
        }
        thresholds.validate().map_err(|e| Error::InvalidProfile {
            name: lower.clone(),
            reason: e.to_string(),
        })?;

        self.custom.write().expect("profile lock poisoned").insert(
            lower,
            CustomProfile {
                thresholds,
                checks,
                description: description.into(),
            },
        );
        Ok(())
    }

    /// Human-readable description for a profile name.
    pub fn describe(&self, name: &str) -> String {
        let lower = name.to_lowercase();
        if let Some((_, _, desc)) = Self::built_in(&lower) {
            return desc.to_string();
        }
        if let Some(custom) = self.custom.read().expect("profile lock poisoned").get(&lower) {
            return custom.description.clone();
        }
        format!("unknown profile '{}', resolves to standard", name)
    }

    /// The five built-in profile names, in strictness order.
    pub fn built_in_names() -> &'static [&'static str] {
        &["minimal", "low", "standard", "high", "maximum"]
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_profiles_form_monotone_lattice() {
        let registry = ProfileRegistry::new();
        let names = ProfileRegistry::built_in_names();
        for pair in names.windows(2) {
            let looser = registry.resolve(pair[0]).thresholds;
            let stricter = registry.resolve(pair[1]).thresholds;
            assert!(
                looser.at_least_as_permissive_as(&stricter),
                "{} should be at least as permissive as {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn minimal_keeps_critical_exploits_on() {
        let registry = ProfileRegistry::new();
        let resolved = registry.resolve("minimal");
        assert!(resolved.checks.critical_exploits);
        assert!(!resolved.checks.content_analysis);
    }

    #[test]
    fn unknown_profile_defaults_to_standard() {
        let registry = ProfileRegistry::new();
        let resolved = registry.resolve("totally-bogus");
        assert_eq!(resolved.name, "standard");
    }

    #[test]
    fn register_and_resolve_round_trips() {
        let registry = ProfileRegistry::new();
        let thresholds = Thresholds::new(0.5, 0.5, 0.5, 0.5, 0.5);
        let checks = Checks::all_enabled();
        registry
            .register_custom("acme-strict", thresholds, checks, "ACME's strict profile")
            .unwrap();

        let resolved = registry.resolve("ACME-Strict");
        assert!(resolved.is_custom);
        assert_eq!(resolved.thresholds.injection_score, 0.5);
        assert_eq!(resolved.checks, checks);
    }

    #[test]
    fn register_custom_rejects_builtin_collision() {
        let registry = ProfileRegistry::new();
        let err = registry
            .register_custom(
                "Standard",
                Thresholds::new(0.5, 0.5, 0.5, 0.5, 0.5),
                Checks::all_enabled(),
                "nope",
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProfile { .. }));
    }

    #[test]
    fn register_custom_rejects_out_of_range_threshold() {
        let registry = ProfileRegistry::new();
        let err = registry
            .register_custom(
                "acme-bad",
                Thresholds::new(1.5, 0.5, 0.5, 0.5, 0.5),
                Checks::all_enabled(),
                "bad",
            )
            .unwrap_err();
        assert!(matches!(err, Error::InvalidProfile { .. }));
    }
}
