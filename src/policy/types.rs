use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::verdict::{Category, Confidence, DecisionClass};

/// Operator-supplied policy document, as read from JSON.
///
/// ```json
/// {"enabled": true, "version": "2024-05",
///  "profiles": {"gmail": {"enhanced_rules": [...], "retry": {"greylist": 600}}}}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileDocument>,
}

fn enabled_by_default() -> bool {
    true
}

/// A profile as written by the operator. Absent fields inherit from the
/// `generic` profile.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_rules: Option<Vec<EnhancedRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_code_rules: Option<Vec<CodeRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_rules: Option<Vec<MessageRule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryDocument>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RetryDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tempfail: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub greylist: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_blocked: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unknown: Option<u64>,
}

/// What a matching rule resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    pub category: Category,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<String>,
    pub decision_class: DecisionClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedRule {
    pub id: String,
    pub prefix: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeRule {
    pub id: String,
    pub code: u16,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRule {
    pub id: String,
    pub contains: String,
    #[serde(flatten)]
    pub outcome: RuleOutcome,
}

/// Retry delays in seconds, fully resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryTable {
    pub default: u64,
    pub tempfail: u64,
    pub greylist: u64,
    pub policy_blocked: u64,
    pub unknown: u64,
}

impl RetryTable {
    pub(crate) fn overlay(self, doc: &RetryDocument) -> Self {
        Self {
            default: doc.default.unwrap_or(self.default),
            tempfail: doc.tempfail.unwrap_or(self.tempfail),
            greylist: doc.greylist.unwrap_or(self.greylist),
            policy_blocked: doc.policy_blocked.unwrap_or(self.policy_blocked),
            unknown: doc.unknown.unwrap_or(self.unknown),
        }
    }
}

/// A normalized provider profile: every field resolved, substrings and
/// names lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReplyPolicy {
    pub name: String,
    pub enhanced_rules: Vec<EnhancedRule>,
    pub code_rules: Vec<CodeRule>,
    pub message_rules: Vec<MessageRule>,
    pub retry: RetryTable,
}

/// Which rule family produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Enhanced,
    Code,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch<'a> {
    pub profile: &'a str,
    pub rule_id: &'a str,
    pub kind: RuleKind,
    pub outcome: &'a RuleOutcome,
}
