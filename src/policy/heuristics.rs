//! Fixed reply heuristics used when no policy rule applies.

use crate::smtp::ProtocolReply;

const POLICY_KEYWORDS: &[&str] = &[
    "policy",
    "blocked",
    "blocklist",
    "blacklist",
    "spam",
    "denied",
    "forbidden",
    "authentication",
    "auth",
];

const MAILBOX_SIGNATURES: &[&str] = &[
    "user unknown",
    "unknown user",
    "no such user",
    "user not found",
    "no such mailbox",
    "mailbox not found",
    "mailbox unavailable",
    "mailbox does not exist",
    "does not exist",
    "doesn't exist",
    "recipient not found",
    "unknown recipient",
    "invalid recipient",
    "not a valid mailbox",
    "no mailbox here",
];

const GREYLIST_SIGNATURES: &[&str] = &["greylist", "graylist", "try again later"];

pub(crate) fn has_policy_keyword(text: &str) -> bool {
    POLICY_KEYWORDS.iter().any(|kw| text.contains(kw))
}

pub(crate) fn is_greylist_signal(reply: &ProtocolReply) -> bool {
    if reply.enhanced_matches("4.7") {
        return true;
    }
    let text = reply.lowercase_text();
    GREYLIST_SIGNATURES.iter().any(|sig| text.contains(sig))
}

/// `4.7.*` with explicit enforcement wording, and not a greylist deferral.
pub(crate) fn is_transient_policy_block(reply: &ProtocolReply) -> bool {
    if !reply.enhanced_matches("4.7") {
        return false;
    }
    let text = reply.lowercase_text();
    let greylisted = GREYLIST_SIGNATURES.iter().any(|sig| text.contains(sig));
    !greylisted && has_policy_keyword(&text)
}

pub(crate) fn is_policy_block(reply: &ProtocolReply) -> bool {
    reply.enhanced_matches("5.7") || has_policy_keyword(&reply.lowercase_text())
}

pub(crate) fn is_mailbox_missing(reply: &ProtocolReply) -> bool {
    if reply.enhanced_matches("5.1.1")
        || reply.enhanced_matches("5.1.10")
        || reply.enhanced_matches("5.2")
    {
        return true;
    }
    let text = reply.lowercase_text();
    MAILBOX_SIGNATURES.iter().any(|sig| text.contains(sig))
}

/// Non-adaptive delay, 30..=180 seconds.
pub(crate) fn static_retry_delay(reply: &ProtocolReply) -> u64 {
    if reply.enhanced_matches("4.7") || reply.enhanced_matches("5.7") {
        return 180;
    }
    if is_greylist_signal(reply) {
        return 180;
    }
    if reply.enhanced_matches("4.2") || reply.status_code == 421 {
        return 120;
    }
    if reply.enhanced_matches("4.3") {
        return 90;
    }
    match reply.status_code {
        450..=452 => 90,
        400..=499 => 60,
        500..=599 => 120,
        _ => 30,
    }
}
