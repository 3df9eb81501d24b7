/**
 * Recommender (§4.11)
 *
 * DESIGN DECISION: A static `category -> Vec<template>` table, each template a plain
 * format string substituting a captured group when the rule's regex has one, the way
 * `aetherlight-core::agents::*` keep a static per-domain knowledge table rather than
 * generating remediation text dynamically
 * WHY: §4.11 requires remediation that "preserve[s] intent ... rather than merely
 * refuse"; a curated per-category template set keeps that editorial voice rather
 * than emitting a generic "this was blocked" message
 */

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn templates() -> &'static HashMap<&'static str, Vec<&'static str>> {
    static TEMPLATES: OnceLock<HashMap<&'static str, Vec<&'static str>>> = OnceLock::new();
    TEMPLATES.get_or_init(|| {
        let mut map = HashMap::new();
        map.insert(
            "sql_injection",
            vec![
                "Use parameterized queries / prepared statements instead of string-concatenated SQL.",
                "Validate and escape user-supplied identifiers through an allow-list, never interpolate them directly.",
            ],
        );
        map.insert(
            "command_injection",
            vec![
                "Call the target binary via an argument array (no shell interpretation) instead of a shell string.",
                "Replace the shell pipeline with the equivalent library call in-process.",
            ],
        );
        map.insert(
            "prompt_injection",
            vec![
                "Strip or quote user-supplied text before it is concatenated into the system instructions.",
                "Re-assert the original task constraints after any untrusted text block.",
            ],
        );
        map.insert(
            "instruction_extraction",
            vec![
                "Do not echo system or developer instructions back to the caller; summarize the task instead.",
            ],
        );
        map.insert(
            "tool_schema_extraction",
            vec![
                "Expose only the tool names and parameter types the current task needs, not the full schema.",
            ],
        );
        map.insert(
            "ssrf",
            vec![
                "Resolve the target host against an allow-list before issuing the request; reject loopback and link-local/metadata addresses.",
            ],
        );
        map.insert(
            "data_exfiltration",
            vec![
                "Redact or tokenize the sensitive fields before they leave the trust boundary.",
            ],
        );
        map.insert(
            "bola",
            vec![
                "Re-check object ownership against the authenticated principal before returning the resource.",
            ],
        );
        map.insert(
            "indirect_injection",
            vec![
                "Treat fetched/third-party content as data, not instructions; do not let it alter the active system prompt.",
            ],
        );
        map.insert(
            "evasion",
            vec![
                "Decode/normalize the input (base64, URL-encoding, homoglyphs) before re-running detection.",
            ],
        );
        map.insert(
            "denial_of_service",
            vec![
                "Apply a resource or iteration cap before executing the requested loop or allocation.",
            ],
        );
        map.insert(
            "privilege_escalation",
            vec![
                "Run the operation with the least-privileged credential that can satisfy the task.",
            ],
        );
        map.insert(
            "sensitive_data",
            vec![
                "Mask the matched field before logging or returning it to the caller.",
            ],
        );
        map.insert(
            "operation_authenticity",
            vec![
                "Confirm the requested operation matches the acting expert's declared specialty before proceeding.",
            ],
        );
        map.insert(
            "novel_exploit",
            vec![
                "This pattern was learned at runtime from anomalous input; review it manually before trusting it long-term.",
            ],
        );
        map
    })
}

/// Path-like capture used to make a couple of templates slightly more specific when
/// the matched text contains an obvious target (host, path, command name).
fn extract_target(text: &str) -> Option<String> {
    static TARGET_RE: OnceLock<Regex> = OnceLock::new();
    let re = TARGET_RE.get_or_init(|| Regex::new(r#"(?i)(?:https?://|/)[\w./:-]{3,}"#).unwrap());
    re.find(text).map(|m| m.as_str().to_string())
}

/// Return remediation suggestions for `category`, optionally sharpened with a target
/// extracted from the offending `matched_text`.
pub fn recommend(category: &str, matched_text: &str) -> Vec<String> {
    let Some(base_templates) = templates().get(category) else {
        return vec!["Review the flagged content and apply the principle of least privilege.".to_string()];
    };

    let target = extract_target(matched_text);
    base_templates
        .iter()
        .map(|template| match &target {
            Some(t) if matches!(category, "ssrf" | "command_injection" | "data_exfiltration") => {
                format!("{template} (flagged target: {t})")
            }
            _ => template.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_category_returns_curated_templates() {
        let suggestions = recommend("sql_injection", "'; DROP TABLE users; --");
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].contains("parameterized"));
    }

    #[test]
    fn unknown_category_returns_generic_fallback() {
        let suggestions = recommend("totally_unknown_category", "whatever");
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn ssrf_suggestion_mentions_flagged_target_when_present() {
        let suggestions = recommend("ssrf", "please fetch http://169.254.169.254/latest/meta-data/");
        assert!(suggestions[0].contains("flagged target"));
    }
}
