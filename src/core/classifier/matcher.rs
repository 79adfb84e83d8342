//! Endpoint rule matching
//!
//! Linear scan over the ordered rule list; the first rule whose path and
//! method both match wins. Paths are normalized on both sides so `/api/`
//! and `/api` behave identically.

use crate::config::EndpointRule;

/// Find the first rule matching a request, if any.
pub fn match_rule<'a>(
    rules: &'a [EndpointRule],
    request_path: &str,
    request_method: &str,
) -> Option<&'a EndpointRule> {
    rules.iter().find(|rule| {
        path_matches(&rule.path, request_path) && method_matches(&rule.methods, request_method)
    })
}

/// Ensure a leading `/` and strip a trailing `/` (except for `/` itself).
pub fn normalize_path(path: &str) -> String {
    let mut normalized = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };

    if normalized.len() > 1 && normalized.ends_with('/') {
        normalized.pop();
    }

    normalized
}

/// Path matching: lone `*` catch-all, exact equality, or a single trailing
/// `/*` prefix wildcard. `/api/*` matches `/api` and anything under
/// `/api/`, but not `/apiv2`.
pub fn path_matches(rule_path: &str, request_path: &str) -> bool {
    let rule = normalize_path(rule_path);
    let request = normalize_path(request_path);

    if rule_path == "*" || rule == "/*" {
        return true;
    }

    if rule == request {
        return true;
    }

    if let Some(prefix) = rule.strip_suffix("/*") {
        return request == prefix || request.starts_with(&format!("{prefix}/"));
    }

    false
}

/// An empty method list matches any method; otherwise case-insensitive.
pub fn method_matches(rule_methods: &[String], request_method: &str) -> bool {
    if rule_methods.is_empty() {
        return true;
    }

    rule_methods
        .iter()
        .any(|method| method.eq_ignore_ascii_case(request_method))
}
