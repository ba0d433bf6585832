//! Gateway route extractor (static Terraform/HCL mode)
//!
//! Parses `aws_apigatewayv2_route` declarations, including routes generated
//! by `for_each` over a `locals` route table: each generated instance expands
//! into its own [`RouteRecord`], never collapsed into one.
//!
//! Beyond method + path, every route carries the resolved integration target
//! (the lambda function behind it), whether an authorizer is attached, and
//! whether the owning API has CORS enabled.
//!
//! The scan is two-phase: all files are parsed once into declarations
//! (routes, locals tables, integrations, CORS), then routes are expanded and
//! resolved against the merged declaration set, so cross-file references
//! work the way Terraform modules do.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::warn;
use tree_sitter::Node;

use crate::extractors::{collect_source_files, node_text, parse_source, read_source, visit_all};
use crate::lang::Lang;
use crate::normalize;
use crate::routes::{HttpMethod, RouteKey, RouteLayer, RouteRecord, ScanWarning};

/// Result of one gateway scan
#[derive(Debug, Default)]
pub struct GatewayScan {
    pub records: Vec<RouteRecord>,
    pub warnings: Vec<ScanWarning>,
}

impl GatewayScan {
    /// Sorted, deduplicated set of normalized endpoints (gateway-only
    /// diagnostic mode)
    pub fn unique_routes(&self) -> Vec<RouteKey> {
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

/// One entry of a `locals` route table (`{ method = "GET", path = "/x" }`)
///
/// The iteration source is an explicit enumerable structure; expansion never
/// re-derives it through string substitution over the whole file.
#[derive(Debug, Clone)]
struct RouteTableEntry {
    key: String,
    method: String,
    path: String,
}

/// An `aws_apigatewayv2_route` declaration before expansion/resolution
#[derive(Debug)]
struct RouteDecl {
    file: PathBuf,
    line: usize,
    /// `route_key` expression text, quotes stripped (may contain `${each...}`)
    route_key: String,
    /// `local.NAME` referenced by `for_each`, when present
    for_each_local: Option<String>,
    /// integration label referenced by `target`
    integration: Option<String>,
    auth_required: bool,
}

/// Declarations merged across all scanned files
#[derive(Debug, Default)]
struct Declarations {
    routes: Vec<RouteDecl>,
    /// locals name -> route table entries (sorted by entry key, matching
    /// Terraform's for_each iteration order)
    route_tables: BTreeMap<String, Vec<RouteTableEntry>>,
    /// integration label -> lambda function name
    integrations: BTreeMap<String, String>,
    cors_enabled: bool,
}

/// Scan an infrastructure source tree for declared gateway routes
pub fn scan_gateway(root: &Path) -> GatewayScan {
    let mut scan = GatewayScan::default();
    let mut decls = Declarations::default();

    for file in collect_source_files(root, Lang::infra_extensions()) {
        let Some(source) = read_source(&file) else {
            scan.warnings
                .push(ScanWarning::new(&file, None, "unreadable file skipped"));
            continue;
        };
        let tree = match parse_source(&file, &source, Lang::Hcl) {
            Ok(t) => t,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "skipping unparseable infra file");
                scan.warnings
                    .push(ScanWarning::new(&file, None, format!("parse failed: {e}")));
                continue;
            }
        };
        collect_declarations(&tree.root_node(), &source, &file, &mut decls);
    }

    expand_routes(&decls, &mut scan);
    scan
}

/// First phase: walk one file's blocks into the merged declaration set
fn collect_declarations(root: &Node, source: &str, file: &Path, decls: &mut Declarations) {
    visit_all(root, |node| {
        if node.kind() != "block" {
            return;
        }
        let (block_type, labels, body) = block_parts(node, source);
        let Some(body) = body else { return };

        match (block_type.as_deref(), labels.first().map(String::as_str)) {
            (Some("resource"), Some("aws_apigatewayv2_route")) => {
                if let Some(decl) = route_decl(node, &body, source, file) {
                    decls.routes.push(decl);
                }
            }
            (Some("resource"), Some("aws_apigatewayv2_integration")) => {
                if let (Some(label), Some(uri)) =
                    (labels.get(1), attr_text(&body, "integration_uri", source))
                {
                    if let Some(fn_name) = ident_after(&uri, "aws_lambda_function.") {
                        decls.integrations.insert(label.clone(), fn_name);
                    }
                }
            }
            (Some("resource"), Some("aws_apigatewayv2_api")) => {
                if has_nested_block(&body, "cors_configuration", source) {
                    decls.cors_enabled = true;
                }
            }
            (Some("locals"), _) => {
                collect_route_tables(&body, source, &mut decls.route_tables);
            }
            _ => {}
        }
    });
}

/// Parse one route resource block into a declaration
fn route_decl(block: &Node, body: &Node, source: &str, file: &Path) -> Option<RouteDecl> {
    let route_key = unquote(&attr_text(body, "route_key", source)?);

    let for_each_local = attr_text(body, "for_each", source)
        .and_then(|expr| ident_after(expr.trim(), "local."));

    let integration = attr_text(body, "target", source)
        .and_then(|t| ident_after(&t, "aws_apigatewayv2_integration."));

    let auth_required = match attr_text(body, "authorization_type", source) {
        Some(t) => {
            let t = unquote(&t);
            !t.is_empty() && !t.eq_ignore_ascii_case("NONE")
        }
        None => attr_text(body, "authorizer_id", source).is_some(),
    };

    Some(RouteDecl {
        file: file.to_path_buf(),
        line: block.start_position().row + 1,
        route_key,
        for_each_local,
        integration,
        auth_required,
    })
}

/// Second phase: expand declarations into concrete records
fn expand_routes(decls: &Declarations, scan: &mut GatewayScan) {
    for decl in &decls.routes {
        match &decl.for_each_local {
            None => {
                emit_route(decl, &decl.route_key, decls, scan);
            }
            Some(local_name) => match decls.route_tables.get(local_name) {
                Some(entries) => {
                    for entry in entries {
                        let key = decl
                            .route_key
                            .replace("${each.value.method}", &entry.method)
                            .replace("${each.value.path}", &entry.path)
                            .replace("${each.key}", &entry.key);
                        emit_route(decl, &key, decls, scan);
                    }
                }
                None => {
                    scan.warnings.push(ScanWarning::new(
                        &decl.file,
                        Some(decl.line),
                        format!("for_each references unknown local.{local_name}"),
                    ));
                }
            },
        }
    }
}

/// Parse a concrete `"METHOD /path"` key and push the record
fn emit_route(decl: &RouteDecl, route_key: &str, decls: &Declarations, scan: &mut GatewayScan) {
    let Some((method_str, path)) = route_key.split_once(' ') else {
        scan.warnings.push(ScanWarning::new(
            &decl.file,
            Some(decl.line),
            format!("unparseable route_key {route_key:?}"),
        ));
        return;
    };
    let Some(method) = HttpMethod::parse(method_str) else {
        scan.warnings.push(ScanWarning::new(
            &decl.file,
            Some(decl.line),
            format!("unknown HTTP method in route_key {route_key:?}"),
        ));
        return;
    };

    let mut record = RouteRecord::new(
        RouteLayer::Gateway,
        &decl.file,
        decl.line,
        method,
        path.trim(),
    )
    .with_auth(decl.auth_required)
    .with_cors(decls.cors_enabled);

    if let Some(label) = &decl.integration {
        // Resolve through the integration map; keep the label when the
        // integration lives outside the scanned tree
        let target = decls
            .integrations
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.clone());
        record = record.with_target(target);
    }

    scan.records.push(record);
}

// ============================================================================
// HCL helpers
// ============================================================================

/// Split a block node into (type, labels, body)
fn block_parts<'a>(node: &Node<'a>, source: &str) -> (Option<String>, Vec<String>, Option<Node<'a>>) {
    let mut block_type = None;
    let mut labels = Vec::new();
    let mut body = None;

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "identifier" if block_type.is_none() => {
                block_type = Some(node_text(&child, source));
            }
            "string_lit" => labels.push(unquote(&node_text(&child, source))),
            "body" => body = Some(child),
            _ => {}
        }
    }

    (block_type, labels, body)
}

/// Text of a named attribute's expression within a body, if present
fn attr_text(body: &Node, name: &str, source: &str) -> Option<String> {
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() != "attribute" {
            continue;
        }
        let mut attr_name = None;
        let mut expr = None;
        let mut inner = child.walk();
        for part in child.children(&mut inner) {
            match part.kind() {
                "identifier" if attr_name.is_none() => {
                    attr_name = Some(node_text(&part, source));
                }
                "expression" => expr = Some(node_text(&part, source)),
                _ => {}
            }
        }
        if attr_name.as_deref() == Some(name) {
            return expr;
        }
    }
    None
}

/// Whether a body directly contains a nested block of the given type
fn has_nested_block(body: &Node, block_type: &str, source: &str) -> bool {
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() == "block" {
            let (ty, _, _) = block_parts(&child, source);
            if ty.as_deref() == Some(block_type) {
                return true;
            }
        }
    }
    false
}

fn unquote(text: &str) -> String {
    let t = text.trim();
    t.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(t)
        .to_string()
}

/// Extract the identifier immediately following `prefix` in an expression
/// (e.g. `aws_lambda_function.invites_fn.invoke_arn` -> `invites_fn`)
fn ident_after(text: &str, prefix: &str) -> Option<String> {
    let start = text.find(prefix)? + prefix.len();
    let ident: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if ident.is_empty() {
        None
    } else {
        Some(ident)
    }
}

/// Collect route tables from a locals body: attributes whose value is a map
/// of objects each carrying `method` and `path` string attributes
fn collect_route_tables(
    body: &Node,
    source: &str,
    tables: &mut BTreeMap<String, Vec<RouteTableEntry>>,
) {
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() != "attribute" {
            continue;
        }
        let mut attr_name = None;
        let mut expr = None;
        let mut inner = child.walk();
        for part in child.children(&mut inner) {
            match part.kind() {
                "identifier" if attr_name.is_none() => {
                    attr_name = Some(node_text(&part, source));
                }
                "expression" => expr = Some(part),
                _ => {}
            }
        }
        let (Some(name), Some(expr)) = (attr_name, expr) else {
            continue;
        };

        let mut entries = route_table_entries(&expr, source);
        if !entries.is_empty() {
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            tables.insert(name, entries);
        }
    }
}

/// Parse `{ list = { method = "GET", path = "/x" }, ... }` into entries
fn route_table_entries(expr: &Node, source: &str) -> Vec<RouteTableEntry> {
    let Some(object) = first_descendant(expr, "object") else {
        return Vec::new();
    };

    let mut entries = Vec::new();
    let mut cursor = object.walk();
    for elem in object.named_children(&mut cursor) {
        if elem.kind() != "object_elem" {
            continue;
        }
        let (Some(key_node), Some(val_node)) = (
            elem.child_by_field_name("key"),
            elem.child_by_field_name("val"),
        ) else {
            continue;
        };
        let Some(inner) = first_descendant(&val_node, "object") else {
            continue;
        };
        let (Some(method), Some(path)) = (
            object_string_attr(&inner, "method", source),
            object_string_attr(&inner, "path", source),
        ) else {
            continue;
        };
        entries.push(RouteTableEntry {
            key: unquote(&node_text(&key_node, source)),
            method,
            path,
        });
    }
    entries
}

/// Look up a string-valued attribute inside an HCL object literal
fn object_string_attr(object: &Node, name: &str, source: &str) -> Option<String> {
    let mut cursor = object.walk();
    for elem in object.named_children(&mut cursor) {
        if elem.kind() != "object_elem" {
            continue;
        }
        let key = elem.child_by_field_name("key")?;
        if unquote(&node_text(&key, source)) != name {
            continue;
        }
        let val = elem.child_by_field_name("val")?;
        return Some(unquote(&node_text(&val, source)));
    }
    None
}

/// First descendant of the given kind (breadth-irrelevant; any order works
/// because HCL expressions have a single collection child)
fn first_descendant<'a>(node: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let mut did_visit_children = false;

    loop {
        if !did_visit_children {
            if cursor.node().kind() == kind {
                return Some(cursor.node());
            }
            if cursor.goto_first_child() {
                continue;
            }
        }

        if cursor.goto_next_sibling() {
            did_visit_children = false;
            continue;
        }

        if !cursor.goto_parent() {
            return None;
        }
        did_visit_children = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan_snippet(files: &[(&str, &str)]) -> GatewayScan {
        let dir = TempDir::new().unwrap();
        for (name, source) in files {
            fs::write(dir.path().join(name), source).unwrap();
        }
        scan_gateway(dir.path())
    }

    #[test]
    fn test_static_route_declaration() {
        let scan = scan_snippet(&[(
            "routes.tf",
            r#"
resource "aws_apigatewayv2_route" "create_invite" {
  api_id    = aws_apigatewayv2_api.main.id
  route_key = "POST /orgs/{orgId}/invites"
  target    = "integrations/${aws_apigatewayv2_integration.invites.id}"

  authorization_type = "JWT"
  authorizer_id      = aws_apigatewayv2_authorizer.jwt.id
}
"#,
        )]);

        assert_eq!(scan.records.len(), 1);
        let rec = &scan.records[0];
        assert_eq!(rec.method, HttpMethod::Post);
        assert_eq!(rec.raw_path, "/orgs/{orgId}/invites");
        assert_eq!(rec.auth_required, Some(true));
        assert_eq!(rec.target.as_deref(), Some("invites"));
        assert_eq!(rec.line, 2);
    }

    #[test]
    fn test_for_each_expansion() {
        let scan = scan_snippet(&[(
            "routes.tf",
            r#"
locals {
  admin_routes = {
    list_messages  = { method = "GET", path = "/admin/org/chat/messages" }
    get_message    = { method = "GET", path = "/admin/org/chat/messages/{id}" }
    purge_messages = { method = "DELETE", path = "/admin/org/chat/messages" }
  }
}

resource "aws_apigatewayv2_route" "admin" {
  for_each  = local.admin_routes
  api_id    = aws_apigatewayv2_api.main.id
  route_key = "${each.value.method} ${each.value.path}"
  target    = "integrations/${aws_apigatewayv2_integration.admin.id}"
}
"#,
        )]);

        // Each generated instance is its own record, never collapsed
        assert_eq!(scan.records.len(), 3);
        let mut keys: Vec<String> = scan
            .records
            .iter()
            .map(|r| format!("{} {}", r.method, r.raw_path))
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "DELETE /admin/org/chat/messages",
                "GET /admin/org/chat/messages",
                "GET /admin/org/chat/messages/{id}",
            ]
        );
    }

    #[test]
    fn test_integration_target_resolution_across_files() {
        let scan = scan_snippet(&[
            (
                "integrations.tf",
                r#"
resource "aws_apigatewayv2_integration" "invites" {
  api_id           = aws_apigatewayv2_api.main.id
  integration_type = "AWS_PROXY"
  integration_uri  = aws_lambda_function.invites_fn.invoke_arn
}
"#,
            ),
            (
                "routes.tf",
                r#"
resource "aws_apigatewayv2_route" "list" {
  api_id    = aws_apigatewayv2_api.main.id
  route_key = "GET /orgs/{orgId}/invites"
  target    = "integrations/${aws_apigatewayv2_integration.invites.id}"
}
"#,
            ),
        ]);

        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].target.as_deref(), Some("invites_fn"));
        // No authorizer attached
        assert_eq!(scan.records[0].auth_required, Some(false));
    }

    #[test]
    fn test_cors_flag_from_api_resource() {
        let scan = scan_snippet(&[(
            "api.tf",
            r#"
resource "aws_apigatewayv2_api" "main" {
  name          = "app-api"
  protocol_type = "HTTP"

  cors_configuration {
    allow_origins = ["https://app.example.com"]
    allow_methods = ["GET", "POST", "DELETE"]
  }
}

resource "aws_apigatewayv2_route" "health" {
  api_id    = aws_apigatewayv2_api.main.id
  route_key = "GET /health"
}
"#,
        )]);

        assert_eq!(scan.records.len(), 1);
        assert_eq!(scan.records[0].cors_enabled, Some(true));
    }

    #[test]
    fn test_duplicate_declarations_retained() {
        let scan = scan_snippet(&[(
            "routes.tf",
            r#"
resource "aws_apigatewayv2_route" "a" {
  route_key = "GET /orgs"
}

resource "aws_apigatewayv2_route" "b" {
  route_key = "GET /orgs"
}
"#,
        )]);

        assert_eq!(scan.records.len(), 2);
        assert_eq!(scan.unique_routes().len(), 1);
    }

    #[test]
    fn test_unknown_local_warns_instead_of_failing() {
        let scan = scan_snippet(&[(
            "routes.tf",
            r#"
resource "aws_apigatewayv2_route" "broken" {
  for_each  = local.missing_table
  route_key = "${each.value.method} ${each.value.path}"
}
"#,
        )]);

        assert!(scan.records.is_empty());
        assert_eq!(scan.warnings.len(), 1);
        assert!(scan.warnings[0].message.contains("missing_table"));
    }

    #[test]
    fn test_first_descendant_finds_nested_object() {
        let source = "locals {\n  tables = { list = { method = \"GET\", path = \"/x\" } }\n}\n";
        let tree = parse_source(Path::new("x.tf"), source, Lang::Hcl).unwrap();
        let root = tree.root_node();

        let object = first_descendant(&root, "object").expect("outer object");
        // preorder: the outer table object comes back first
        assert!(node_text(&object, source).contains("list"));
        assert!(first_descendant(&object, "object_elem").is_some());
        assert!(first_descendant(&root, "tuple").is_none());
    }

    #[test]
    fn test_ident_after() {
        assert_eq!(
            ident_after("aws_lambda_function.invites_fn.invoke_arn", "aws_lambda_function."),
            Some("invites_fn".to_string())
        );
        assert_eq!(ident_after("no match here", "aws_lambda_function."), None);
    }
}
