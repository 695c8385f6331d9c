use std::collections::{HashMap, HashSet};
use std::path::Path;

use tracing::{debug, error};

use super::builtin::{FALLBACK_RETRY, builtin_document, generic_profile};
use super::error::PolicyError;
use super::types::{
    PolicyDocument, ProfileDocument, ProviderReplyPolicy, RuleKind, RuleMatch, RuleOutcome,
};
use crate::smtp::ProtocolReply;
use crate::verdict::{Category, DecisionClass};

pub const GENERIC_PROFILE: &str = "generic";

/// Immutable set of normalized provider profiles.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    enabled: bool,
    version: String,
    generic: ProviderReplyPolicy,
    profiles: HashMap<String, ProviderReplyPolicy>,
}

impl PolicyEngine {
    /// Engine built from the profiles shipped with the crate.
    pub fn builtin() -> Self {
        Self::from_document(builtin_document()).unwrap_or_else(|err| {
            error!(error = %err, "built-in policy document rejected; using bare generic profile");
            Self::bare()
        })
    }

    fn bare() -> Self {
        Self {
            enabled: true,
            version: String::new(),
            generic: ProviderReplyPolicy {
                name: GENERIC_PROFILE.to_string(),
                enhanced_rules: Vec::new(),
                code_rules: Vec::new(),
                message_rules: Vec::new(),
                retry: FALLBACK_RETRY,
            },
            profiles: HashMap::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, PolicyError> {
        let doc: PolicyDocument = serde_json::from_str(json).map_err(PolicyError::json)?;
        Self::from_document(doc)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| PolicyError::read(path.display().to_string(), err))?;
        Self::from_json_str(&raw)
    }

    /// Normalize a document: lowercase names, resolve inheritance from
    /// `generic`, validate every rule.
    pub fn from_document(doc: PolicyDocument) -> Result<Self, PolicyError> {
        let mut raw: HashMap<String, ProfileDocument> = HashMap::new();
        for (name, profile) in doc.profiles {
            let name = name.trim().to_ascii_lowercase();
            if name.is_empty() {
                return Err(PolicyError::EmptyProfileName);
            }
            raw.insert(name, profile);
        }
        let generic_doc = raw
            .remove(GENERIC_PROFILE)
            .unwrap_or_else(generic_profile);

        let generic = normalize_profile(GENERIC_PROFILE, &generic_doc, None)?;
        let mut profiles = HashMap::with_capacity(raw.len());
        for (name, profile) in &raw {
            let normalized = normalize_profile(name, profile, Some(&generic))?;
            profiles.insert(name.clone(), normalized);
        }

        debug!(
            version = %doc.version,
            profiles = profiles.len() + 1,
            enabled = doc.enabled,
            "policy document loaded"
        );

        Ok(Self {
            enabled: doc.enabled,
            version: doc.version,
            generic,
            profiles,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn has_profile(&self, name: &str) -> bool {
        name == GENERIC_PROFILE || self.profiles.contains_key(name)
    }

    /// Profile by name, falling back to `generic`.
    pub fn profile(&self, name: &str) -> &ProviderReplyPolicy {
        self.profiles.get(name).unwrap_or(&self.generic)
    }

    /// First matching rule of the provider's profile. Enhanced-code rules are
    /// consulted first, then numeric codes, then message substrings.
    pub fn evaluate(&self, provider: &str, reply: &ProtocolReply) -> Option<RuleMatch<'_>> {
        let profile = self.profile(provider);

        if reply.enhanced_code.is_some() {
            if let Some(rule) = profile
                .enhanced_rules
                .iter()
                .find(|rule| reply.enhanced_matches(&rule.prefix))
            {
                return Some(rule_match(profile, &rule.id, RuleKind::Enhanced, &rule.outcome));
            }
        }

        if let Some(rule) = profile
            .code_rules
            .iter()
            .find(|rule| rule.code == reply.status_code)
        {
            return Some(rule_match(profile, &rule.id, RuleKind::Code, &rule.outcome));
        }

        let text = reply.lowercase_text();
        profile
            .message_rules
            .iter()
            .find(|rule| text.contains(&rule.contains))
            .map(|rule| rule_match(profile, &rule.id, RuleKind::Message, &rule.outcome))
    }

    /// Retry delay in seconds for a decision under `provider`'s table.
    pub fn retry_delay(&self, provider: &str, class: DecisionClass, greylist: bool) -> u64 {
        let table = self.profile(provider).retry;
        if greylist {
            return table.greylist;
        }
        match class {
            DecisionClass::Retryable => table.tempfail,
            DecisionClass::PolicyBlocked => table.policy_blocked,
            DecisionClass::Unknown => table.unknown,
            DecisionClass::Deliverable | DecisionClass::Undeliverable => table.default,
        }
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

fn rule_match<'a>(
    profile: &'a ProviderReplyPolicy,
    rule_id: &'a str,
    kind: RuleKind,
    outcome: &'a RuleOutcome,
) -> RuleMatch<'a> {
    RuleMatch {
        profile: &profile.name,
        rule_id,
        kind,
        outcome,
    }
}

fn normalize_profile(
    name: &str,
    doc: &ProfileDocument,
    parent: Option<&ProviderReplyPolicy>,
) -> Result<ProviderReplyPolicy, PolicyError> {
    let mut enhanced_rules = match (&doc.enhanced_rules, parent) {
        (Some(rules), _) => rules.clone(),
        (None, Some(parent)) => parent.enhanced_rules.clone(),
        (None, None) => Vec::new(),
    };
    let code_rules = match (&doc.smtp_code_rules, parent) {
        (Some(rules), _) => rules.clone(),
        (None, Some(parent)) => parent.code_rules.clone(),
        (None, None) => Vec::new(),
    };
    let mut message_rules = match (&doc.message_rules, parent) {
        (Some(rules), _) => rules.clone(),
        (None, Some(parent)) => parent.message_rules.clone(),
        (None, None) => Vec::new(),
    };

    let base = parent.map(|p| p.retry).unwrap_or(FALLBACK_RETRY);
    let retry = match &doc.retry {
        Some(overrides) => base.overlay(overrides),
        None => base,
    };

    let mut seen = HashSet::new();
    for rule in &mut enhanced_rules {
        rule.prefix = rule.prefix.trim().to_string();
        check_rule(name, &rule.id, &rule.prefix, &rule.outcome, &mut seen)?;
    }
    for rule in &code_rules {
        let pattern = rule.code.to_string();
        check_rule(name, &rule.id, &pattern, &rule.outcome, &mut seen)?;
    }
    for rule in &mut message_rules {
        rule.contains = rule.contains.trim().to_ascii_lowercase();
        check_rule(name, &rule.id, &rule.contains, &rule.outcome, &mut seen)?;
    }

    Ok(ProviderReplyPolicy {
        name: name.to_string(),
        enhanced_rules,
        code_rules,
        message_rules,
        retry,
    })
}

fn check_rule(
    profile: &str,
    id: &str,
    pattern: &str,
    outcome: &RuleOutcome,
    seen: &mut HashSet<String>,
) -> Result<(), PolicyError> {
    if id.trim().is_empty() {
        return Err(PolicyError::EmptyRuleId {
            profile: profile.to_string(),
        });
    }
    if !seen.insert(id.to_string()) {
        return Err(PolicyError::duplicate(profile, id));
    }
    if pattern.is_empty() {
        return Err(PolicyError::empty_pattern(profile, id));
    }
    if outcome.reason.trim().is_empty() {
        return Err(PolicyError::EmptyReason {
            profile: profile.to_string(),
            id: id.to_string(),
        });
    }
    if outcome.category == Category::Valid && outcome.decision_class != DecisionClass::Deliverable
    {
        return Err(PolicyError::InconsistentOutcome {
            profile: profile.to_string(),
            id: id.to_string(),
        });
    }
    Ok(())
}
