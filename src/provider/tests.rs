use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::mx::MxHost;
use crate::mx::tests::StubResolver;
use crate::pipeline::tests::{ScriptedProber, quiet_config};
use crate::validator::RolePolicy;
use crate::verdict::Category;

fn gmail() -> ProviderOverride {
    ProviderOverride {
        name: "Gmail".to_string(),
        domains: vec!["gmail.com".to_string(), "*.googlemail.com".to_string()],
        per_domain_concurrency: Some(2),
        connects_per_minute: Some(30),
        backoff_secs: Some(3),
        retry_count: Some(0),
        ..ProviderOverride::default()
    }
}

fn outlook() -> ProviderOverride {
    ProviderOverride {
        name: "outlook".to_string(),
        domains: vec![".outlook.com".to_string(), "hotmail.com".to_string()],
        profile: Some("Microsoft".to_string()),
        ..ProviderOverride::default()
    }
}

fn verifier(
    providers: Vec<ProviderOverride>,
    resolver: Arc<StubResolver>,
    prober: Arc<ScriptedProber>,
) -> ProviderAwareVerifier {
    ProviderAwareVerifier::new(quiet_config(), providers, resolver, prober)
}

fn idle() -> ProviderAwareVerifier {
    verifier(
        vec![gmail(), outlook()],
        Arc::new(StubResolver::hosts(Vec::new())),
        Arc::new(ScriptedProber::default()),
    )
}

#[test]
fn suffix_match_ignores_wildcard_and_dot() {
    let p = gmail();
    assert!(p.matches("gmail.com"));
    assert!(p.matches("eu.gmail.com"));
    assert!(p.matches("googlemail.com"));
    assert!(!p.matches("notgmail.com"));
    assert!(!p.matches("gmail.com.evil.net"));

    let o = outlook();
    assert!(o.matches("outlook.com"));
    assert!(o.matches("eu.outlook.com"));
}

#[test]
fn first_enabled_match_in_declaration_order() {
    let shadow = ProviderOverride {
        name: "catch-gmail".to_string(),
        domains: vec!["com".to_string()],
        ..ProviderOverride::default()
    };
    let v = verifier(
        vec![gmail(), shadow],
        Arc::new(StubResolver::hosts(Vec::new())),
        Arc::new(ScriptedProber::default()),
    );
    assert_eq!(v.resolve_policy("gmail.com").map(|p| p.key()).as_deref(), Some("gmail"));
    assert_eq!(
        v.resolve_policy("example.com").map(|p| p.key()).as_deref(),
        Some("catch-gmail")
    );
    assert!(v.resolve_policy("example.org").is_none());
}

#[test]
fn disabled_provider_is_skipped() {
    let v = verifier(
        vec![ProviderOverride {
            enabled: false,
            ..gmail()
        }],
        Arc::new(StubResolver::hosts(Vec::new())),
        Arc::new(ScriptedProber::default()),
    );
    assert!(v.resolve_policy("gmail.com").is_none());
    assert_eq!(v.pipeline_for("gmail.com").config(), &quiet_config());
}

#[test]
fn overrides_apply_on_top_of_base() {
    let config = gmail().apply(&quiet_config());
    assert_eq!(config.per_domain_concurrency, 2);
    assert_eq!(config.connects_per_minute, 30);
    assert_eq!(config.backoff_base_ms, 3_000);
    assert_eq!(config.max_attempts, 1);
    assert_eq!(config.provider_hint, "gmail");
    assert_eq!(config.dns_retries, quiet_config().dns_retries);

    let config = outlook().apply(&quiet_config());
    assert_eq!(config.provider_hint, "microsoft");
    assert_eq!(config.max_attempts, quiet_config().max_attempts);
}

#[test]
fn pipelines_are_cached_per_policy() {
    let v = idle();
    let a = v.pipeline_for("gmail.com");
    let b = v.pipeline_for("eu.gmail.com");
    let c = v.pipeline_for("example.org");
    let d = v.pipeline_for("example.net");

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(&c, &d));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(v.cached(), 2);
}

#[tokio::test]
async fn concurrent_lookups_build_once() {
    let v = Arc::new(idle());
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let v = Arc::clone(&v);
        tasks.spawn(async move { v.pipeline_for("hotmail.com") });
    }

    let mut built = Vec::new();
    while let Some(res) = tasks.join_next().await {
        built.push(res.expect("join"));
    }
    assert!(built.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(v.cached(), 1);
}

#[tokio::test(start_paused = true)]
async fn providers_share_one_rate_clock() {
    let resolver = Arc::new(StubResolver::hosts(vec![MxHost::new("mx.example.com", 5)]));
    let prober = Arc::new(ScriptedProber::new(vec![(
        "mx.example.com",
        Verdict::valid("rcpt_ok"),
    )]));
    let base = PipelineConfig {
        connects_per_minute: 1,
        ..quiet_config()
    };
    let v = ProviderAwareVerifier::new(base, vec![outlook()], resolver, prober);
    let cancel = CancellationToken::new();

    let start = Instant::now();
    assert!(v.verify("alice@example.com", &cancel).await.is_valid());
    assert!(v.verify("bob@outlook.com", &cancel).await.is_valid());
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_secs(60), "{elapsed:?}");
    assert!(Arc::ptr_eq(
        &v.pipeline_for("example.com").rate(),
        &v.pipeline_for("outlook.com").rate()
    ));
}

#[test]
fn rate_override_gets_its_own_clock() {
    let v = idle();
    let default = v.pipeline_for("example.com");
    let gmail = v.pipeline_for("gmail.com");
    let outlook = v.pipeline_for("outlook.com");

    assert!(!Arc::ptr_eq(&default.rate(), &gmail.rate()));
    assert_eq!(gmail.rate().interval(), Duration::from_secs(2));
    assert!(!Arc::ptr_eq(&default.slots(), &gmail.slots()));
    assert!(Arc::ptr_eq(&default.slots(), &outlook.slots()));
}

#[test]
fn provider_named_default_keeps_its_own_pipeline() {
    let named_default = ProviderOverride {
        name: "Default".to_string(),
        domains: vec!["example.com".to_string()],
        retry_count: Some(4),
        ..ProviderOverride::default()
    };
    let v = verifier(
        vec![named_default],
        Arc::new(StubResolver::hosts(Vec::new())),
        Arc::new(ScriptedProber::default()),
    );

    let fallback = v.pipeline_for("example.org");
    let provider = v.pipeline_for("example.com");
    assert!(!Arc::ptr_eq(&fallback, &provider));
    assert_eq!(fallback.config().max_attempts, quiet_config().max_attempts);
    assert_eq!(provider.config().max_attempts, 5);
}

#[tokio::test]
async fn provider_hint_routes_classification() {
    let resolver = Arc::new(StubResolver::hosts(vec![MxHost::new("mx.gmail.com", 5)]));
    let prober = Arc::new(ScriptedProber::new(vec![(
        "mx.gmail.com",
        Verdict::valid("rcpt_ok"),
    )]));
    let v = verifier(vec![gmail(), outlook()], resolver, Arc::clone(&prober));
    let cancel = CancellationToken::new();

    assert!(v.verify("alice@gmail.com", &cancel).await.is_valid());
    assert!(v.verify("bob@eu.outlook.com", &cancel).await.is_valid());
    assert!(v.verify("carol@example.com", &cancel).await.is_valid());

    let hints = prober.hints.lock().map(|h| h.clone()).unwrap_or_default();
    assert_eq!(hints, ["gmail", "microsoft", ""]);
}

#[tokio::test]
async fn syntax_errors_use_default_pipeline() {
    let resolver = Arc::new(StubResolver::hosts(Vec::new()));
    let v = verifier(
        vec![gmail()],
        Arc::clone(&resolver),
        Arc::new(ScriptedProber::default()),
    );
    let verdict = v.verify("bad-email", &CancellationToken::new()).await;

    assert_eq!(verdict.category, Category::Invalid);
    assert_eq!(verdict.reason, "syntax");
    assert_eq!(resolver.calls(), 0);
}

#[test]
fn config_document_parses_with_defaults() {
    let config = VerifierConfig::from_json_str(
        r#"{
            "pipeline": {"max_attempts": 5, "role_policy": "risky",
                         "probe": {"mail_from": "probe@example.net"}},
            "providers": [{"name": "gmail", "domains": ["gmail.com"], "retry_count": 2}],
            "policy": {"version": "ops-3", "profiles": {}}
        }"#,
    )
    .expect("config");

    assert_eq!(config.pipeline.max_attempts, 5);
    assert_eq!(config.pipeline.role_policy, RolePolicy::Risky);
    assert_eq!(config.pipeline.probe.mail_from, "probe@example.net");
    assert_eq!(config.pipeline.dns_retries, 2);
    assert!(config.providers[0].enabled);
    assert_eq!(config.providers[0].apply(&config.pipeline).max_attempts, 3);

    let engine = config.policy_engine().expect("engine");
    assert_eq!(engine.version(), "ops-3");
    assert!(engine.has_profile("generic"));
}

#[test]
fn empty_config_is_default() {
    let config = VerifierConfig::from_json_str("{}").expect("config");
    assert_eq!(config, VerifierConfig::default());
    assert!(config.policy_engine().expect("builtin").is_enabled());
}

#[test]
fn config_errors_are_reported() {
    assert!(matches!(
        VerifierConfig::from_json_str("{"),
        Err(ConfigError::Json { .. })
    ));
    assert!(matches!(
        VerifierConfig::from_json_str(r#"{"providers": [{"domains": ["x.com"]}]}"#),
        Err(ConfigError::UnnamedProvider { index: 0 })
    ));
    assert!(matches!(
        VerifierConfig::from_json_str(r#"{"providers": [{"name": " DEFAULT ", "domains": ["x.com"]}]}"#),
        Err(ConfigError::ReservedProviderName { index: 0, .. })
    ));
    assert!(matches!(
        VerifierConfig::from_path("/nonexistent/mailprobe.json"),
        Err(ConfigError::Read { .. })
    ));
}
