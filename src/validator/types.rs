use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address split and normalized: both parts lowercase, domain ASCII (IDNA).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParsedAddress {
    pub local: String,
    pub domain: String,
}

impl fmt::Display for ParsedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local, self.domain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,
    #[error("total length {0} > 254")]
    TooLong(usize),
    #[error("must contain exactly one '@'")]
    AtSign,
    #[error("local part length {0} invalid (1..=64)")]
    LocalLength(usize),
    #[error("invalid local part")]
    LocalChars,
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    Idna,
    #[error("invalid domain: {0}")]
    Domain(String),
}

impl AddressError {
    pub(crate) fn domain(reason: impl Into<String>) -> Self {
        Self::Domain(reason.into())
    }
}

/// How role accounts (`postmaster@`, `info@`, ...) are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolePolicy {
    /// Role accounts are probed like any other address.
    #[default]
    Allow,
    /// Role accounts short-circuit to a `risky` verdict.
    Risky,
}

/// Operator overrides for the screening lists. A list that is present
/// replaces the built-in one entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreeningLists {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disposable_domains: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_accounts: Option<Vec<String>>,
    /// Misspelled domain to corrected domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typo_domains: Option<BTreeMap<String, String>>,
}
