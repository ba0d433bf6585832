//! Frontend HTTP call-site extractor
//!
//! Scans TypeScript/JavaScript sources for API call expressions:
//!
//! - `fetch(path, { method: 'POST' })`, the low-level direct form
//! - `apiFetch(path, { method: 'POST' })`, the authenticated wrapper
//! - `api.get(path)` / `client.delete(path)`, method-per-member clients
//!
//! Path expressions may be string literals or template strings; template
//! substitutions become `{param}` segments without resolving their values.
//! A leading substitution followed by `/` (a base-URL prefix such as
//! `` `${API_BASE}/orgs` ``) is dropped.

use std::path::Path;

use tracing::warn;
use tree_sitter::Node;

use crate::extractors::{
    collect_source_files, node_text, parse_source, read_source, strip_quotes, visit_all,
};
use crate::lang::Lang;
use crate::normalize;
use crate::routes::{HttpMethod, RouteKey, RouteLayer, RouteRecord, ScanWarning};

/// Wrapper identifiers treated as the authenticated call form
const AUTH_WRAPPERS: &[&str] = &["apiFetch", "authFetch", "authenticatedFetch"];

/// Receivers whose method-named members are API calls (`api.get(...)`)
const CLIENT_RECEIVERS: &[&str] = &["api", "client", "apiClient", "http"];

/// Result of one frontend scan
#[derive(Debug, Default)]
pub struct FrontendScan {
    pub records: Vec<RouteRecord>,
    pub warnings: Vec<ScanWarning>,
}

impl FrontendScan {
    /// Sorted, deduplicated set of normalized endpoints (frontend-only
    /// diagnostic mode)
    pub fn unique_endpoints(&self) -> Vec<RouteKey> {
        let mut keys: Vec<RouteKey> = self
            .records
            .iter()
            .map(|r| normalize::route_key(r.method, &r.raw_path))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

/// Scan a frontend source tree for HTTP call sites
pub fn scan_frontend(root: &Path) -> FrontendScan {
    let mut scan = FrontendScan::default();

    for file in collect_source_files(root, Lang::frontend_extensions()) {
        let Some(lang) = Lang::from_path(&file) else { continue };
        let Some(source) = read_source(&file) else {
            scan.warnings
                .push(ScanWarning::new(&file, None, "unreadable file skipped"));
            continue;
        };

        let tree = match parse_source(&file, &source, lang) {
            Ok(t) => t,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "skipping unparseable frontend file");
                scan.warnings
                    .push(ScanWarning::new(&file, None, format!("parse failed: {e}")));
                continue;
            }
        };

        visit_all(&tree.root_node(), |node| {
            if node.kind() == "call_expression" {
                if let Some(record) = extract_call_site(node, &source, &file) {
                    scan.records.push(record);
                }
            }
        });
    }

    scan
}

/// Recognize one API call expression, or None for unrelated calls
fn extract_call_site(node: &Node, source: &str, file: &Path) -> Option<RouteRecord> {
    let function = node.child_by_field_name("function")?;
    let arguments = node.child_by_field_name("arguments")?;

    let (method_hint, auth_required) = match function.kind() {
        "identifier" => {
            let name = node_text(&function, source);
            if name == "fetch" {
                (None, false)
            } else if AUTH_WRAPPERS.contains(&name.as_str()) {
                (None, true)
            } else {
                return None;
            }
        }
        "member_expression" => {
            let object = function.child_by_field_name("object")?;
            let property = function.child_by_field_name("property")?;
            let receiver = node_text(&object, source);
            if !CLIENT_RECEIVERS.contains(&receiver.as_str()) {
                return None;
            }
            let method = HttpMethod::parse(&node_text(&property, source))?;
            (Some(method), true)
        }
        _ => return None,
    };

    let mut args = arguments_of(&arguments);
    let path_expr = args.next()?;
    let raw_path = resolve_path_expr(&path_expr, source)?;

    // Method from the options object when the callee doesn't imply one
    let method = match method_hint {
        Some(m) => m,
        None => args
            .next()
            .and_then(|opts| method_from_options(&opts, source))
            .unwrap_or(HttpMethod::Get),
    };

    let line = node.start_position().row + 1;
    let snippet = first_line(&node_text(node, source));

    Some(
        RouteRecord::new(RouteLayer::Frontend, file, line, method, raw_path)
            .with_auth(auth_required)
            .with_snippet(snippet),
    )
}

/// Named children of an `arguments` node
fn arguments_of<'a>(arguments: &'a Node) -> impl Iterator<Item = Node<'a>> {
    let mut items = Vec::new();
    let mut cursor = arguments.walk();
    for child in arguments.named_children(&mut cursor) {
        items.push(child);
    }
    items.into_iter()
}

/// Resolve a path expression to a raw route path starting with `/`.
///
/// Template substitutions map to `{param}`; non-path expressions (full URLs,
/// computed variables) yield None and the call site is skipped.
fn resolve_path_expr(node: &Node, source: &str) -> Option<String> {
    let raw = match node.kind() {
        "string" => strip_quotes(&node_text(node, source)),
        "template_string" => {
            let mut out = String::new();
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                match child.kind() {
                    "template_substitution" => out.push_str("{param}"),
                    "`" => {}
                    _ => out.push_str(&node_text(&child, source)),
                }
            }
            // Leading substitution is a base-URL prefix, not a segment
            if let Some(rest) = out.strip_prefix("{param}/") {
                out = format!("/{rest}");
            }
            out
        }
        _ => return None,
    };

    if raw.starts_with('/') {
        Some(raw)
    } else {
        None
    }
}

/// Pull `method: 'POST'` out of a fetch-style options object literal
fn method_from_options(options: &Node, source: &str) -> Option<HttpMethod> {
    if options.kind() != "object" {
        return None;
    }
    let mut cursor = options.walk();
    for pair in options.named_children(&mut cursor) {
        if pair.kind() != "pair" {
            continue;
        }
        let key = pair.child_by_field_name("key")?;
        if strip_quotes(&node_text(&key, source)) != "method" {
            continue;
        }
        let value = pair.child_by_field_name("value")?;
        if value.kind() == "string" {
            return HttpMethod::parse(&strip_quotes(&node_text(&value, source)));
        }
    }
    None
}

fn first_line(text: &str) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.len() > 100 {
        let cut = line
            .char_indices()
            .take_while(|(i, _)| *i < 100)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &line[..cut])
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan_snippet(name: &str, source: &str) -> FrontendScan {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(name), source).unwrap();
        scan_frontend(dir.path())
    }

    #[test]
    fn test_fetch_with_method_option() {
        let scan = scan_snippet(
            "invites.ts",
            r#"
async function createInvite(orgId: string) {
    return fetch(`/orgs/${orgId}/invites`, { method: 'POST' });
}
"#,
        );
        assert_eq!(scan.records.len(), 1);
        let rec = &scan.records[0];
        assert_eq!(rec.method, HttpMethod::Post);
        assert_eq!(rec.raw_path, "/orgs/{param}/invites");
        assert_eq!(rec.auth_required, Some(false));
        assert_eq!(rec.line, 3);
    }

    #[test]
    fn test_fetch_defaults_to_get() {
        let scan = scan_snippet("orgs.ts", "const res = fetch('/orgs');");
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].method, HttpMethod::Get);
        assert_eq!(scan.records[0].raw_path, "/orgs");
    }

    #[test]
    fn test_auth_wrapper_form() {
        let scan = scan_snippet(
            "members.tsx",
            r#"
export async function removeMember(wsId: string, userId: string) {
    await apiFetch(`/ws/${wsId}/members/${userId}`, { method: 'DELETE' });
}
"#,
        );
        assert_eq!(scan.records.len(), 1);
        let rec = &scan.records[0];
        assert_eq!(rec.method, HttpMethod::Delete);
        assert_eq!(rec.raw_path, "/ws/{param}/members/{param}");
        assert_eq!(rec.auth_required, Some(true));
    }

    #[test]
    fn test_client_member_call() {
        let scan = scan_snippet(
            "chat.ts",
            r#"
const messages = await api.get(`/admin/org/chat/messages/${id}`);
await api.post('/admin/org/chat/messages', body);
"#,
        );
        assert_eq!(scan.records.len(), 2);
        assert_eq!(scan.records[0].method, HttpMethod::Get);
        assert_eq!(scan.records[0].raw_path, "/admin/org/chat/messages/{param}");
        assert_eq!(scan.records[1].method, HttpMethod::Post);
    }

    #[test]
    fn test_base_url_prefix_dropped() {
        let scan = scan_snippet(
            "base.ts",
            "const r = fetch(`${API_BASE}/orgs/${orgId}`, { method: 'PUT' });",
        );
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].raw_path, "/orgs/{param}");
    }

    #[test]
    fn test_unrelated_calls_ignored() {
        let scan = scan_snippet(
            "misc.ts",
            r#"
console.log('/not/a/call');
doWork('GET', '/also/not/a/call');
const url = fetch('https://example.com/full/url');
"#,
        );
        assert!(scan.records.is_empty());
    }

    #[test]
    fn test_malformed_file_is_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("good.ts"), "fetch('/ok');").unwrap();
        // Invalid UTF-8 makes the read fail; the scan must continue.
        fs::write(dir.path().join("bad.ts"), [0xff, 0xfe, 0x00, 0xd8]).unwrap();

        let scan = scan_frontend(dir.path());
        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.warnings.len(), 1);
    }

    #[test]
    fn test_unique_endpoints_deduplicates() {
        let scan = scan_snippet(
            "dupes.ts",
            r#"
fetch('/orgs/{orgId}');
fetch(`/orgs/${anything}`);
"#,
        );
        assert_eq!(scan.records.len(), 2);
        let unique = scan.unique_endpoints();
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].to_string(), "GET /orgs/{param}");
    }
}
