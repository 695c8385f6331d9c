//! Address parsing and pre-network screening.
//!
//! [`parse_address`] normalizes an address (trim, lowercase, IDNA domain).
//! [`Screener::screen`] then applies, in order and short-circuiting, the
//! typo map, the disposable-domain set (matched on the domain and each
//! parent), and, under [`RolePolicy::Risky`], the role-account set. Nothing
//! here touches the network.

mod domain;
mod lists;
mod local;
mod types;

pub use types::{AddressError, ParsedAddress, RolePolicy, ScreeningLists};

use lists::{DISPOSABLE_DOMAINS, ROLE_ACCOUNTS, TYPO_DOMAINS, TypoMap, WordList};
use tracing::debug;

use crate::verdict::{Confidence, DecisionClass, Verdict};

pub fn parse_address(raw: &str) -> Result<ParsedAddress, AddressError> {
    let input = raw.trim();
    if input.is_empty() {
        return Err(AddressError::Empty);
    }
    if input.len() > 254 {
        return Err(AddressError::TooLong(input.len()));
    }
    let mut parts = input.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AddressError::AtSign);
    };

    let local = local.to_lowercase();
    local::check_local(&local)?;
    let domain = domain::ascii_domain(domain)?;

    Ok(ParsedAddress { local, domain })
}

#[derive(Debug, Clone)]
pub struct Screener {
    disposable: WordList,
    roles: WordList,
    typos: TypoMap,
    role_policy: RolePolicy,
}

impl Default for Screener {
    fn default() -> Self {
        Self::new(&ScreeningLists::default(), RolePolicy::default())
    }
}

impl Screener {
    pub fn new(lists: &ScreeningLists, role_policy: RolePolicy) -> Self {
        Self {
            disposable: lists
                .disposable_domains
                .as_deref()
                .map_or(WordList::Builtin(&DISPOSABLE_DOMAINS), WordList::custom),
            roles: lists
                .role_accounts
                .as_deref()
                .map_or(WordList::Builtin(&ROLE_ACCOUNTS), WordList::custom),
            typos: lists
                .typo_domains
                .as_ref()
                .map_or(TypoMap::Builtin(&TYPO_DOMAINS), TypoMap::custom),
            role_policy,
        }
    }

    pub fn role_policy(&self) -> RolePolicy {
        self.role_policy
    }

    /// Parse and screen `raw`. `Err` is a terminal verdict.
    pub fn screen(&self, raw: &str) -> Result<ParsedAddress, Verdict> {
        let parsed = parse_address(raw).map_err(|err| {
            debug!(error = %err, "address rejected by syntax check");
            let mut verdict = Verdict::invalid("syntax");
            verdict.evidence.message = Some(err.to_string());
            verdict
        })?;

        if let Some(fix) = self.typos.get(&parsed.domain) {
            debug!(domain = %parsed.domain, suggestion = fix, "domain typo");
            return Err(Verdict::risky(format!("suggest={fix}"))
                .with_reason_code("domain_typo")
                .with_decision(DecisionClass::Undeliverable)
                .with_confidence(Confidence::Medium)
                .with_suggestion(fix));
        }

        if domain::suffixes(&parsed.domain).any(|suffix| self.disposable.contains(suffix)) {
            debug!(domain = %parsed.domain, "disposable domain");
            return Err(screened("disposable"));
        }

        if self.role_policy == RolePolicy::Risky
            && self.roles.contains(local::base_local(&parsed.local))
        {
            debug!(local = %parsed.local, "role account");
            return Err(screened("role_account"));
        }

        Ok(parsed)
    }
}

/// Screened out on policy grounds: the mailbox may well exist, so the
/// decision stays `deliverable`. Routing keys on `category == risky`;
/// `unknown` would make the verdict retry-eligible.
fn screened(reason: &str) -> Verdict {
    Verdict::risky(reason)
        .with_decision(DecisionClass::Deliverable)
        .with_confidence(Confidence::Medium)
}

#[cfg(test)]
mod tests;
