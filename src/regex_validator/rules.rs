/**
 * Curated Lexical Rule Sets
 *
 * DESIGN DECISION: Rules are plain data (family, severity, confidence_seed, compiled
 * regex) built once at `RegexValidator::new()` time, the way
 * `aetherlight-core::validation::security::SecurityScanner` keeps its checks as small
 * self-contained functions operating on combined text
 * WHY: A curated, auditable rule table is easier to extend/review than scattered
 * string checks, and a compile failure here is meant to be fatal at startup (§4.2)
 *
 * PATTERN: Pattern-VALIDATION-001 (Quality/Security-First Curation)
 */

use crate::error::{Error, Result};
use crate::profile::Checks;
use crate::types::Severity;
use regex::Regex;

/// The rule families named in §4.2, plus `operation_authenticity` which backs
/// `ValidateOperation`'s additional expert-specialty-consistency check (§4.10, §D of
/// the expanded spec).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleFamily {
    CommandInjection,
    PromptInjection,
    InstructionExtraction,
    ToolSchemaExtraction,
    Ssrf,
    DataExfiltration,
    SqlInjection,
    Bola,
    IndirectInjection,
    Evasion,
    DenialOfService,
    PrivilegeEscalation,
    SensitiveData,
    OperationAuthenticity,
}

impl RuleFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            RuleFamily::CommandInjection => "command_injection",
            RuleFamily::PromptInjection => "prompt_injection",
            RuleFamily::InstructionExtraction => "instruction_extraction",
            RuleFamily::ToolSchemaExtraction => "tool_schema_extraction",
            RuleFamily::Ssrf => "ssrf",
            RuleFamily::DataExfiltration => "data_exfiltration",
            RuleFamily::SqlInjection => "sql_injection",
            RuleFamily::Bola => "bola",
            RuleFamily::IndirectInjection => "indirect_injection",
            RuleFamily::Evasion => "evasion",
            RuleFamily::DenialOfService => "denial_of_service",
            RuleFamily::PrivilegeEscalation => "privilege_escalation",
            RuleFamily::SensitiveData => "sensitive_data",
            RuleFamily::OperationAuthenticity => "operation_authenticity",
        }
    }

    /// Which profile Check flag must be enabled for this family's rules to run.
    /// `critical_exploits` is the only gate every built-in profile leaves on (§9
    /// Open Question #1), so only genuinely destructive rules use it.
    pub fn gate(self) -> fn(&Checks) -> bool {
        match self {
            RuleFamily::CommandInjection => |c| c.critical_exploits || c.system_commands,
            RuleFamily::PrivilegeEscalation => |c| c.critical_exploits || c.system_commands,
            RuleFamily::SqlInjection => |c| c.system_commands,
            RuleFamily::Ssrf => |c| c.system_commands,
            RuleFamily::Bola => |c| c.system_commands,
            RuleFamily::DenialOfService => |c| c.system_commands,
            RuleFamily::PromptInjection => |c| c.content_analysis,
            RuleFamily::InstructionExtraction => |c| c.content_analysis,
            RuleFamily::ToolSchemaExtraction => |c| c.content_analysis,
            RuleFamily::Evasion => |c| c.content_analysis,
            RuleFamily::DataExfiltration => |c| c.content_analysis || c.output_validation,
            RuleFamily::IndirectInjection => |c| c.context_validation,
            RuleFamily::SensitiveData => |c| c.format_validation || c.output_validation,
            RuleFamily::OperationAuthenticity => |c| c.expert_validation,
        }
    }

    /// Which threshold dimension a match in this family is compared against.
    pub fn threshold_dimension(self) -> ThresholdDimension {
        match self {
            RuleFamily::SensitiveData => ThresholdDimension::SensitiveData,
            RuleFamily::OperationAuthenticity => ThresholdDimension::Consistency,
            _ => ThresholdDimension::Injection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdDimension {
    Injection,
    SensitiveData,
    Relevance,
    Reliability,
    Consistency,
}

/// A single compiled rule: a regex plus the metadata needed to build a `Verdict`.
pub struct Rule {
    pub family: RuleFamily,
    pub severity: Severity,
    /// Seed confidence in `[0, 1]` this rule reports on a match. Unlike
    /// `EnhancedPattern::confidence` (clamped to 0.98, §3), these are hand-curated
    /// constants for unambiguous lexical signatures and may reach 1.0.
    pub confidence_seed: f64,
    pub pattern: Regex,
    pub remediation: &'static str,
}

fn rule(
    family: RuleFamily,
    severity: Severity,
    confidence_seed: f64,
    expr: &str,
    remediation: &'static str,
) -> Result<Rule> {
    let pattern = Regex::new(&format!("(?i){}", expr)).map_err(|e| Error::PatternCompile {
        family: family.as_str().to_string(),
        message: e.to_string(),
    })?;
    Ok(Rule {
        family,
        severity,
        confidence_seed,
        pattern,
        remediation,
    })
}

/// Build the seed rule set loaded at startup (§4.5 "Seed content": an enhanced
/// Unit-42-style set, a MITRE-ATT&CK-derived set, and a custom AI-safety set,
/// folded here into one curated table since RegexValidator is the lexical front-end
/// all three informed).
pub fn seed_rules() -> Result<Vec<Rule>> {
    let mut rules = Vec::new();

    // command_injection: real system destruction stays gated on critical_exploits
    // alone so that `minimal` still blocks it (§9 Open Question #1).
    rules.push(rule(
        RuleFamily::CommandInjection,
        Severity::Critical,
        1.0,
        r"\bsudo\s+rm\s+-rf\s+/(\s|$)|\brm\s+-rf\s+/(\s|$)|\bmkfs(\.\w+)?\s+/dev/|:\(\)\{\s*:\|:&\s*\};:",
        "Never execute destructive filesystem commands from model-controlled text; run commands through an allowlisted, sandboxed executor.",
    )?);
    rules.push(rule(
        RuleFamily::CommandInjection,
        Severity::High,
        0.85,
        r"[;&|`]\s*(cat|curl|wget|nc|bash|sh|python3?|perl)\s|\$\([^)]*\)|`[^`]*`",
        "Sanitize shell metacharacters and use an argument-vector API instead of a shell string.",
    )?);

    // sql_injection
    rules.push(rule(
        RuleFamily::SqlInjection,
        Severity::High,
        0.9,
        r"(drop\s+table|union\s+select|or\s+'1'\s*=\s*'1'|or\s+1\s*=\s*1|;\s*--)",
        "Use parameterized queries or prepared statements instead of string-built SQL.",
    )?);

    // prompt_injection
    rules.push(rule(
        RuleFamily::PromptInjection,
        Severity::High,
        0.85,
        r"ignore\s+(all\s+|your\s+)?(previous|prior|above)\s+instructions|disregard\s+(all\s+|your\s+)?(previous|prior)\s+instructions|you\s+are\s+now\s+in\s+developer\s+mode",
        "Treat embedded instructions in user/tool content as data, never as control input.",
    )?);

    // instruction_extraction
    rules.push(rule(
        RuleFamily::InstructionExtraction,
        Severity::Medium,
        0.8,
        r"(reveal|tell me|show me|print|output)\s+(your\s+)?(exact\s+)?system\s+prompt|what\s+(are|were)\s+your\s+instructions",
        "Refuse to disclose system/developer instructions; respond with a fixed deflection message.",
    )?);

    // tool_schema_extraction
    rules.push(rule(
        RuleFamily::ToolSchemaExtraction,
        Severity::Medium,
        0.8,
        r"(complete\s+schema|full\s+list|all)\s+of\s+(all\s+)?(the\s+)?(tools|functions)(\s+and\s+(tools|functions))*\s+(you\s+have\s+access\s+to|available)|dump\s+(your\s+)?tool\s+definitions",
        "Do not enumerate internal tool/function schemas to untrusted callers.",
    )?);

    // ssrf
    rules.push(rule(
        RuleFamily::Ssrf,
        Severity::High,
        0.8,
        r"https?://(169\.254\.169\.254|localhost|127\.0\.0\.1|0\.0\.0\.0|\[::1\])",
        "Block requests to loopback/link-local/metadata addresses at the network layer, not just lexically.",
    )?);

    // data_exfiltration
    rules.push(rule(
        RuleFamily::DataExfiltration,
        Severity::High,
        0.8,
        r"(send|post|exfiltrate|upload)\s+.*(to|via)\s+https?://|base64\s+encode.*\bsend\b",
        "Block outbound transmission of response content to attacker-controlled endpoints.",
    )?);

    // bola (broken object-level authorization)
    rules.push(rule(
        RuleFamily::Bola,
        Severity::Medium,
        0.75,
        r"(user_id|account_id|object_id)\s*=\s*(\d+|['\x22]?\w+['\x22]?)\s*(and|or)\s*(user_id|account_id|object_id)\s*=\s*(\d+|['\x22]?\w+['\x22]?)",
        "Enforce object-level authorization checks server-side; never trust caller-supplied identifiers.",
    )?);

    // indirect_injection (content embedded from a third-party source carrying
    // instructions, e.g. a fetched web page or document)
    rules.push(rule(
        RuleFamily::IndirectInjection,
        Severity::Medium,
        0.75,
        r"<!--\s*(system|assistant)\s*:|\[system\]|\{\{\s*system\s*\}\}",
        "Strip or neutralize role markers embedded in untrusted retrieved content before it reaches the model.",
    )?);

    // evasion (obfuscation attempts to dodge lexical filters)
    rules.push(rule(
        RuleFamily::Evasion,
        Severity::Medium,
        0.7,
        r"(\\u00[0-9a-f]{2}){4,}|[a-z]\s-\s[a-z]\s-\s[a-z]\s-\s[a-z]|[bB][4a][sS][eE]64",
        "Normalize/decode text before lexical scanning so obfuscated payloads cannot slip through.",
    )?);

    // denial_of_service
    rules.push(rule(
        RuleFamily::DenialOfService,
        Severity::Medium,
        0.75,
        r"(.)\1{200,}|(repeat|loop)\s+(forever|infinitely|\d{6,}\s+times)",
        "Enforce input-length and repetition caps before tokenizing or forwarding to the model.",
    )?);

    // privilege_escalation
    rules.push(rule(
        RuleFamily::PrivilegeEscalation,
        Severity::Critical,
        0.95,
        r"(grant|elevate|escalate)\s+(me\s+)?(admin|root|superuser)\s+(access|privileges)|chmod\s+(-R\s+)?[47]77\s+/|setuid\(0\)",
        "Never act on requests to change privilege levels from untrusted text; route through an authenticated admin API.",
    )?);

    // sensitive_data
    rules.push(rule(
        RuleFamily::SensitiveData,
        Severity::High,
        0.85,
        r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}",
        "Redact email addresses before logging or forwarding; use a [EMAIL_REDACTED] token.",
    )?);
    rules.push(rule(
        RuleFamily::SensitiveData,
        Severity::High,
        0.85,
        r"\b\d{3}-\d{2}-\d{4}\b",
        "Redact SSN-shaped sequences; use a [SSN_REDACTED] token.",
    )?);
    rules.push(rule(
        RuleFamily::SensitiveData,
        Severity::High,
        0.85,
        r"\b(?:\d[ -]*?){13,19}\b",
        "Redact credit-card-shaped sequences; validate with Luhn before treating as a false positive.",
    )?);
    rules.push(rule(
        RuleFamily::SensitiveData,
        Severity::High,
        0.9,
        r"\b(sk|pk)-[A-Za-z0-9]{16,}\b|AKIA[0-9A-Z]{16}|ghp_[A-Za-z0-9]{20,}|-----BEGIN\s+(RSA|EC|OPENSSH)?\s*PRIVATE KEY-----",
        "Redact API keys/tokens/private key material before logging or echoing back to the caller.",
    )?);
    rules.push(rule(
        RuleFamily::SensitiveData,
        Severity::Medium,
        0.8,
        r"\b(?:\+?\d{1,2}[\s.-]?)?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}\b",
        "Redact phone-number-shaped sequences before logging.",
    )?);

    // operation_authenticity (expert-specialty / operation-authenticity consistency,
    // §4.10 ValidateOperation, §D of the expanded spec)
    rules.push(rule(
        RuleFamily::OperationAuthenticity,
        Severity::Medium,
        0.75,
        r"act\s+as\s+(a\s+)?(different|another)\s+expert|pretend\s+you\s+are\s+not\s+(the\s+)?assigned\s+expert",
        "Reject operation instructions that ask an expert agent to impersonate a different specialty.",
    )?);

    Ok(rules)
}
