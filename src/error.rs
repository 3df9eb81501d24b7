/**
 * Error Handling Module
 *
 * DESIGN DECISION: Centralized error types using thiserror for consistent error semantics
 * WHY: Library code must never panic; all fallible internal operations return Result
 *
 * REASONING CHAIN:
 * 1. thiserror provides ergonomic error derive macros without boilerplate
 * 2. Centralized error types enable consistent error handling across modules
 * 3. Error conversion (From trait) enables ? operator for error propagation
 * 4. The ValidationFacade never lets an Error cross its public boundary (see
 *    facade.rs) - these variants are for internal plumbing (config, snapshot I/O,
 *    pattern compilation) that the facade folds into Verdict fields
 *
 * PATTERN: Pattern-001 (Rust Core + Language Bindings)
 * RELATED: facade.rs (error -> Verdict folding), validation taxonomy (§7 of the spec)
 */

use thiserror::Error;

/// Primary error type for the security validation engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A regex rule failed to compile at load time. Fatal at startup per §4.2.
    #[error("pattern compile error in family '{family}': {message}")]
    PatternCompile { family: String, message: String },

    /// A named profile could not be resolved and no fallback was applicable.
    #[error("unknown security profile: {0}")]
    UnknownProfile(String),

    /// RegisterCustom rejected an invalid threshold/check record.
    #[error("invalid custom profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },

    /// A threshold value fell outside [0.0, 1.0].
    #[error("threshold '{0}' out of range [0,1]: {1}")]
    ThresholdOutOfRange(String, f64),

    /// A confidence value fell outside its valid range.
    #[error("invalid confidence score: {0} (must be between 0.0 and 0.98)")]
    InvalidConfidenceScore(f64),

    /// PatternStore lookup by id found nothing.
    #[error("pattern not found: {0}")]
    PatternNotFound(String),

    /// The LLM adjudicator's JSON response did not parse after all retries.
    #[error("malformed adjudicator response: {0}")]
    MalformedAdjudicatorResponse(String),

    /// The LLM adjudicator call failed to complete (network, timeout, breaker open).
    #[error("adjudicator unavailable: {0}")]
    AdjudicatorUnavailable(String),

    /// Configuration failed to parse or validate; previous config is retained.
    #[error("configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// Generic I/O error (snapshot read/write, config file read).
    #[error("I/O error: {0}")]
    Io(String),

    /// JSON/TOML serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Lock acquisition error (engine-scoped mutex poisoned).
    #[error("lock error: {0}")]
    Lock(String),

    /// Bug-class failure that should not occur in normal operation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigurationInvalid(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::PatternCompile {
            family: "unknown".to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_is_actionable() {
        let err = Error::PatternNotFound("abc123".to_string());
        assert_eq!(err.to_string(), "pattern not found: abc123");

        let err = Error::InvalidConfidenceScore(1.5);
        assert!(err.to_string().contains("must be between 0.0 and 0.98"));
    }

    #[test]
    fn error_traits_support_comparison() {
        let a = Error::PatternNotFound("x".to_string());
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Error::UnknownProfile("x".to_string()));
    }

    #[test]
    fn json_errors_convert() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: Error = json_err.into();
        matches!(err, Error::Serialization(_));
    }
}
