//! Classification over realistic rule tables

use trafficctrl::config::{AlgorithmParams, EndpointRule, HumanDuration, TenantStrategy};
use trafficctrl::core::classifier::{match_rule, normalize_path, sanitize_tenant_key};

fn rule(path: &str, methods: &[&str], bypass: bool) -> EndpointRule {
    EndpointRule {
        path: path.to_string(),
        methods: methods.iter().map(|m| m.to_string()).collect(),
        bypass,
        tenant_strategy: Some(TenantStrategy::Ip),
        algorithm: if bypass {
            None
        } else {
            Some(AlgorithmParams::FixedWindow {
                window_size: HumanDuration::from_millis(1000),
                limit: 10,
            })
        },
    }
}

fn routing_table() -> Vec<EndpointRule> {
    vec![
        rule("/health", &[], true),
        rule("/api/auth/*", &["POST"], false),
        rule("/api/*", &["GET", "POST", "PUT", "DELETE"], false),
        rule("*", &[], false),
    ]
}

#[test]
fn test_specific_rule_beats_catch_all() {
    let rules = routing_table();

    let matched = match_rule(&rules, "/api/auth/login", "POST").unwrap();
    assert_eq!(matched.path, "/api/auth/*");

    let matched = match_rule(&rules, "/api/users", "GET").unwrap();
    assert_eq!(matched.path, "/api/*");

    let matched = match_rule(&rules, "/static/logo.png", "GET").unwrap();
    assert_eq!(matched.path, "*");
}

#[test]
fn test_method_mismatch_falls_through() {
    let rules = routing_table();

    // GET on the auth prefix falls through to the general API rule
    let matched = match_rule(&rules, "/api/auth/login", "GET").unwrap();
    assert_eq!(matched.path, "/api/*");

    // PATCH is not in the API rule's method list; catch-all takes it
    let matched = match_rule(&rules, "/api/users", "PATCH").unwrap();
    assert_eq!(matched.path, "*");
}

#[test]
fn test_bypass_rule_matches_first() {
    let rules = routing_table();
    let matched = match_rule(&rules, "/health", "GET").unwrap();
    assert!(matched.bypass);
}

#[test]
fn test_trailing_slashes_are_equivalent() {
    let rules = routing_table();
    let with = match_rule(&rules, "/api/users/", "GET").unwrap();
    let without = match_rule(&rules, "/api/users", "GET").unwrap();
    assert_eq!(with.path, without.path);
}

#[test]
fn test_no_rules_means_no_match() {
    assert!(match_rule(&[], "/anything", "GET").is_none());
}

#[test]
fn test_normalization_round_trips_through_matching() {
    // the same path with and without decoration normalizes identically
    for raw in ["api/v1", "/api/v1", "/api/v1/"] {
        assert_eq!(normalize_path(raw), "/api/v1");
    }
}

#[test]
fn test_sanitized_keys_are_store_safe() {
    // sanitation output must only contain characters safe inside a
    // colon-delimited store key
    let hostile = "tenant name\r\n{DEL}\u{7f}*?[]#%|/\\\"'`~!$^&()=+<>,;";
    let sanitized = sanitize_tenant_key(hostile);
    assert!(sanitized
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '@')));
    assert!(sanitized.chars().count() <= 128);
}
