use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse bucket used by downstream routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Valid,
    Invalid,
    Risky,
}

impl Category {
    /// Ordering used when several MX hosts produce competing results.
    /// `valid > risky > invalid`; an absent result ranks 0.
    pub fn rank(self) -> u8 {
        match self {
            Self::Valid => 3,
            Self::Risky => 2,
            Self::Invalid => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Risky => "risky",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deliverability taxonomy driving retry eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionClass {
    Deliverable,
    Undeliverable,
    Retryable,
    PolicyBlocked,
    Unknown,
}

impl DecisionClass {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Deliverable => "deliverable",
            Self::Undeliverable => "undeliverable",
            Self::Retryable => "retryable",
            Self::PolicyBlocked => "policy_blocked",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DecisionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryStrategy {
    #[default]
    None,
    Tempfail,
    Greylist,
    PolicyDelay,
}

impl fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "none",
            Self::Tempfail => "tempfail",
            Self::Greylist => "greylist",
            Self::PolicyDelay => "policy_delay",
        })
    }
}

/// Protocol step at which a reply was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmtpStep {
    Connect,
    Banner,
    Ehlo,
    Helo,
    MailFrom,
    RcptTo,
    Quit,
}

impl SmtpStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Banner => "banner",
            Self::Ehlo => "ehlo",
            Self::Helo => "helo",
            Self::MailFrom => "mail_from",
            Self::RcptTo => "rcpt_to",
            Self::Quit => "quit",
        }
    }
}

impl fmt::Display for SmtpStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw signals that produced a verdict, kept for audit and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_class: Option<DecisionClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mx_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<SmtpStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transcript: Vec<String>,
}

/// Outcome of one verification. Every failure mode of the pipeline ends up
/// here; callers never see a raw error for a single address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub category: Category,
    pub reason: String,
    pub reason_code: String,
    pub decision_class: DecisionClass,
    pub decision_confidence: Confidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
    pub retry_strategy: RetryStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_profile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    pub evidence: Evidence,
}
