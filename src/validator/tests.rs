use std::collections::BTreeMap;

use super::*;
use crate::verdict::{Category, DecisionClass};

#[test]
fn accepts_basic() {
    let parsed = parse_address("  Alice@Example.COM ").expect("valid");
    assert_eq!(parsed.local, "alice");
    assert_eq!(parsed.domain, "example.com");
    assert_eq!(parsed.to_string(), "alice@example.com");
}

#[test]
fn rejects_missing_or_double_at() {
    assert_eq!(parse_address("bad-email"), Err(AddressError::AtSign));
    assert_eq!(parse_address("a@@b.com"), Err(AddressError::AtSign));
    assert_eq!(parse_address("a@b@c.com"), Err(AddressError::AtSign));
}

#[test]
fn rejects_empty_parts() {
    assert!(matches!(
        parse_address("@example.com"),
        Err(AddressError::LocalLength(0))
    ));
    assert_eq!(parse_address("alice@"), Err(AddressError::EmptyDomain));
    assert_eq!(parse_address("   "), Err(AddressError::Empty));
}

#[test]
fn idna_domain_is_ascii() {
    let parsed = parse_address("bob@exämple.com").expect("valid");
    assert_eq!(parsed.domain, "xn--exmple-cua.com");
}

#[test]
fn bad_email_is_invalid_syntax() {
    let verdict = Screener::default().screen("bad-email").expect_err("syntax");
    assert_eq!(verdict.category, Category::Invalid);
    assert_eq!(verdict.reason, "syntax");
    assert_eq!(verdict.decision_class, DecisionClass::Undeliverable);
    assert!(verdict.evidence.message.is_some());
}

#[test]
fn typo_suggests_correction() {
    let verdict = Screener::default()
        .screen("carol@gmial.com")
        .expect_err("typo");
    assert_eq!(verdict.category, Category::Risky);
    assert_eq!(verdict.reason, "suggest=gmail.com");
    assert_eq!(verdict.reason_code, "domain_typo");
    assert_eq!(verdict.suggestion.as_deref(), Some("gmail.com"));
    assert!(!verdict.is_retryable());
}

#[test]
fn disposable_matches_parent_labels() {
    let screener = Screener::default();
    for addr in ["x@mailinator.com", "x@eu.mx.mailinator.com"] {
        let verdict = screener.screen(addr).expect_err("disposable");
        assert_eq!(verdict.reason, "disposable", "{addr}");
        assert_eq!(verdict.category, Category::Risky);
        assert_eq!(verdict.decision_class, DecisionClass::Deliverable);
        assert_eq!(verdict.retry_strategy, crate::verdict::RetryStrategy::None);
        assert!(verdict.retry_after_secs.is_none());
        assert!(!verdict.is_retryable());
    }
    assert!(screener.screen("x@notmailinator.com").is_ok());
}

#[test]
fn roles_only_flagged_in_risky_mode() {
    assert!(Screener::default().screen("postmaster@example.com").is_ok());

    let screener = Screener::new(&ScreeningLists::default(), RolePolicy::Risky);
    let verdict = screener
        .screen("Info+promo@example.com")
        .expect_err("role");
    assert_eq!(verdict.reason, "role_account");
    assert!(screener.screen("alice@example.com").is_ok());
}

#[test]
fn checks_short_circuit_in_order() {
    let lists = ScreeningLists {
        disposable_domains: Some(vec!["gmial.com".to_string()]),
        ..ScreeningLists::default()
    };
    let screener = Screener::new(&lists, RolePolicy::Risky);
    let verdict = screener.screen("admin@gmial.com").expect_err("typo first");
    assert_eq!(verdict.reason_code, "domain_typo");
}

#[test]
fn configured_lists_replace_builtins() {
    let mut typos = BTreeMap::new();
    typos.insert("exmaple.com".to_string(), "example.com".to_string());
    let lists = ScreeningLists {
        disposable_domains: Some(vec!["*.burner.test".to_string()]),
        role_accounts: Some(vec!["Ops".to_string()]),
        typo_domains: Some(typos),
    };
    let screener = Screener::new(&lists, RolePolicy::Risky);

    assert!(screener.screen("x@mailinator.com").is_ok());
    assert!(screener.screen("x@gmial.com").is_ok());
    assert!(screener.screen("postmaster@example.com").is_ok());
    assert_eq!(
        screener.screen("x@a.burner.test").expect_err("disposable").reason,
        "disposable"
    );
    assert_eq!(
        screener.screen("ops@example.com").expect_err("role").reason,
        "role_account"
    );
    assert_eq!(
        screener.screen("x@exmaple.com").expect_err("typo").suggestion.as_deref(),
        Some("example.com")
    );
}

#[test]
fn screening_is_idempotent() {
    let screener = Screener::new(&ScreeningLists::default(), RolePolicy::Risky);
    for raw in [
        " Dave@Example.ORG ",
        "bad-email",
        "x@yopmail.com",
        "sales@example.com",
        "eve@bücher.de",
        "frank@hotmial.com",
    ] {
        let first = screener.screen(raw);
        assert_eq!(first, screener.screen(raw), "{raw}");
        if let Ok(parsed) = &first {
            assert_eq!(screener.screen(&parsed.to_string()).as_ref(), Ok(parsed));
        }
    }
}
