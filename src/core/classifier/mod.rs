//! Request classification
//!
//! Maps an inbound request onto the endpoint routing table and derives the
//! tenant key the limiter tiers will be keyed on.

mod matcher;
mod tenant;

pub use matcher::{match_rule, method_matches, normalize_path, path_matches};
pub use tenant::{extract_ip, extract_tenant_key, sanitize_tenant_key};
