/**
 * SecurityEngineConfig (§6 EXTERNAL INTERFACES)
 *
 * DESIGN DECISION: One flat, `#[serde(default)]` config struct covering every
 * recognized option from §6, following the same "struct mirrors a TOML file,
 * everything has a sane default" shape as
 * `aetherlight-core::config::AetherlightConfig`
 * WHY: §6 enumerates a flat option list (not a nested hierarchy like the teacher's
 * 4-tier config); a single struct keeps `loader.rs`'s merge/override logic simple
 *
 * PATTERN: Pattern-CONFIG-001 (Hierarchical Configuration), narrowed to a single
 * tier since §6 describes file + env override + hot-reload, not a 4-tier hierarchy
 * RELATED: loader.rs (file/env/hot-reload), profile::ProfileRegistry (security_thresholds)
 */

pub mod loader;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SecurityEngineConfig {
    pub security_level: String,

    pub enable_caching: bool,
    pub cache_ttl: u64,
    pub max_cache_size: usize,

    pub use_parallel_validation: bool,
    pub max_validation_time: u64,
    pub enable_smart_routing: bool,

    pub regex_timeout: u64,
    pub regex_max_patterns: usize,

    pub ml_confidence_threshold: f64,
    pub ml_model_path: Option<String>,
    pub ml_enable_training: bool,

    pub llm_api_key: String,
    pub llm_model: String,
    pub llm_max_tokens: u32,
    pub llm_temperature: f64,
    pub llm_timeout: u64,
    pub llm_retry_attempts: u32,
    pub llm_retry_delay: u64,

    pub enable_metrics: bool,
    pub metrics_export_interval: u64,
    pub enable_performance_logging: bool,

    /// profile name -> numeric threshold override (§6 `security_thresholds`).
    pub security_thresholds: HashMap<String, f64>,
}

impl Default for SecurityEngineConfig {
    fn default() -> Self {
        Self {
            security_level: "standard".to_string(),
            enable_caching: true,
            cache_ttl: 300,
            max_cache_size: 10_000,
            use_parallel_validation: true,
            max_validation_time: 30,
            enable_smart_routing: true,
            regex_timeout: 5,
            regex_max_patterns: 500,
            ml_confidence_threshold: 0.6,
            ml_model_path: None,
            ml_enable_training: false,
            llm_api_key: String::new(),
            llm_model: "default-adjudicator".to_string(),
            llm_max_tokens: 256,
            llm_temperature: 0.0,
            llm_timeout: 15,
            llm_retry_attempts: 3,
            llm_retry_delay: 500,
            enable_metrics: true,
            metrics_export_interval: 60,
            enable_performance_logging: false,
            security_thresholds: HashMap::new(),
        }
    }
}

impl SecurityEngineConfig {
    /// Basic sanity checks before a (re)load is accepted (§7 `configuration_invalid`).
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(0.0..=1.0).contains(&self.ml_confidence_threshold) {
            return Err(crate::error::Error::ConfigurationInvalid(format!(
                "ml_confidence_threshold {} out of range [0,1]",
                self.ml_confidence_threshold
            )));
        }
        if self.max_cache_size == 0 {
            return Err(crate::error::Error::ConfigurationInvalid(
                "max_cache_size must be > 0".to_string(),
            ));
        }
        if self.max_validation_time == 0 {
            return Err(crate::error::Error::ConfigurationInvalid(
                "max_validation_time must be > 0".to_string(),
            ));
        }
        for (profile, threshold) in &self.security_thresholds {
            if !(0.0..=1.0).contains(threshold) {
                return Err(crate::error::Error::ConfigurationInvalid(format!(
                    "security_thresholds.{profile} = {threshold} out of range [0,1]"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SecurityEngineConfig::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_ml_threshold_is_rejected() {
        let mut config = SecurityEngineConfig::default();
        config.ml_confidence_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
