//! Canonical path and route-key normalization
//!
//! The same logical route is written with different parameter names in each
//! layer (`{orgId}` in Terraform, `${orgId}` template substitutions in the
//! frontend, `pathParameters['org_id']` in handlers). Normalization replaces
//! every parameter segment with the fixed `{param}` placeholder so routes
//! compare by position and literal segments only.
//!
//! This is a best-effort analysis tool: malformed paths are coerced, never
//! rejected.

use crate::routes::{HttpMethod, RouteKey};

/// Placeholder token substituted for every parameter segment
pub const PARAM_TOKEN: &str = "{param}";

/// Canonicalize a route path.
///
/// - ensures a single leading `/`
/// - collapses duplicate slashes
/// - strips the trailing slash (except for the root)
/// - replaces every `{identifier}` segment with `{param}`
///
/// Literal segment casing is preserved: URL paths are case-sensitive.
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }

    let mut out = String::with_capacity(trimmed.len() + 1);
    out.push('/');

    for segment in trimmed.split('/').filter(|s| !s.is_empty()) {
        if out.len() > 1 {
            out.push('/');
        }
        if is_param_segment(segment) {
            out.push_str(PARAM_TOKEN);
        } else {
            out.push_str(segment);
        }
    }

    out
}

/// Build the unique route identity: uppercased method + normalized path.
///
/// Two raw inputs produce the same key iff they share the method and the
/// same literal-segment sequence after placeholder substitution.
pub fn route_key(method: HttpMethod, raw_path: &str) -> RouteKey {
    RouteKey::new(method, normalize(raw_path))
}

/// A segment counts as a parameter when wrapped in `{}` (any identifier,
/// including greedy `{proxy+}` forms).
fn is_param_segment(segment: &str) -> bool {
    segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("/orgs/{orgId}/invites"), "/orgs/{param}/invites");
        assert_eq!(normalize("/orgs"), "/orgs");
        assert_eq!(normalize("/"), "/");
    }

    #[test]
    fn test_normalize_coerces_malformed() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("orgs/invites"), "/orgs/invites");
        assert_eq!(normalize("//orgs///invites/"), "/orgs/invites");
        assert_eq!(normalize("  /orgs "), "/orgs");
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in [
            "/orgs/{orgId}/invites/{inviteId}",
            "orgs//members/",
            "",
            "/",
            "/admin/org/chat/messages/{id}",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_param_name_invariance() {
        let a = route_key(HttpMethod::Get, "/ws/{id}/members");
        let b = route_key(HttpMethod::Get, "/ws/{workspaceId}/members");
        assert_eq!(a, b);
    }

    #[test]
    fn test_literal_casing_preserved() {
        assert_ne!(normalize("/Orgs"), normalize("/orgs"));
    }

    #[test]
    fn test_greedy_proxy_segment() {
        assert_eq!(normalize("/api/{proxy+}"), "/api/{param}");
    }

    #[test]
    fn test_method_distinguishes_keys() {
        let get = route_key(HttpMethod::Get, "/orgs");
        let post = route_key(HttpMethod::Post, "/orgs");
        assert_ne!(get, post);
    }
}
