//! Backend handler extractor (Python Lambda dispatch)
//!
//! Lambda handlers in this codebase dispatch on the incoming event with
//! chained `if`/`elif` conditions over the HTTP method and request path.
//! The extractor pattern-matches those conditions instead of executing
//! anything: a branch contributes a route only when both a method check and
//! a path check are in scope.
//!
//! Recognized condition shapes:
//!   - `method == 'GET'` / `event['httpMethod'] == 'GET'` (either operand
//!     order), where the non-literal operand mentions the method
//!   - `path == '/orgs'` exact comparison
//!   - `'/invites' in path` containment
//!   - `path.startswith('/orgs')` / `path.endswith('/invites')`
//!
//! Method and path checks combine across `and` operators and across nested
//! `if` statements, so `if method == 'POST': if path == '/orgs':` yields
//! `POST /orgs`. Access to `pathParameters` / `path_parameters` inside a
//! matched branch appends a `/{param}` segment per distinct key.
//!
//! Only functions whose name contains `handler` are inspected; helper
//! functions that happen to compare strings are left alone.

use std::path::Path;

use tracing::warn;
use tree_sitter::Node;

use crate::extractors::{
    collect_source_files, node_text, parse_source, read_source, strip_quotes, visit_all,
};
use crate::lang::Lang;
use crate::normalize;
use crate::routes::{HttpMethod, RouteKey, RouteLayer, RouteRecord, ScanWarning};

/// Result of one backend scan
#[derive(Debug, Default)]
pub struct HandlerScan {
    pub records: Vec<RouteRecord>,
    pub warnings: Vec<ScanWarning>,
}

impl HandlerScan {
    /// Sorted, deduplicated set of normalized endpoints (lambda-only
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

/// Method/path checks accumulated while descending a dispatch chain
#[derive(Debug, Clone, Copy, Default)]
struct DispatchContext<'s> {
    method: Option<HttpMethod>,
    path: Option<&'s str>,
}

/// Scan a backend source tree for routes served by Lambda dispatch code
pub fn scan_handlers(root: &Path) -> HandlerScan {
    let mut scan = HandlerScan::default();

    for file in collect_source_files(root, Lang::backend_extensions()) {
        let Some(source) = read_source(&file) else {
            scan.warnings
                .push(ScanWarning::new(&file, None, "unreadable file skipped"));
            continue;
        };
        let tree = match parse_source(&file, &source, Lang::Python) {
            Ok(t) => t,
            Err(e) => {
                warn!(file = %file.display(), error = %e, "skipping unparseable backend file");
                scan.warnings
                    .push(ScanWarning::new(&file, None, format!("parse failed: {e}")));
                continue;
            }
        };

        visit_all(&tree.root_node(), |node| {
            if node.kind() != "function_definition" {
                return;
            }
            let Some(name_node) = node.child_by_field_name("name") else {
                return;
            };
            let name = node_text(&name_node, &source);
            if !name.contains("handler") {
                return;
            }
            if let Some(body) = node.child_by_field_name("body") {
                walk_dispatch(&body, &source, &file, &name, DispatchContext::default(), &mut scan);
            }
        });
    }

    scan
}

/// Walk one suite for `if`/`elif` dispatch branches, carrying the checks
/// already established by enclosing conditions
fn walk_dispatch<'s>(
    suite: &Node,
    source: &'s str,
    file: &Path,
    handler: &str,
    ctx: DispatchContext<'s>,
    scan: &mut HandlerScan,
) {
    let mut cursor = suite.walk();
    for stmt in suite.named_children(&mut cursor) {
        if stmt.kind() != "if_statement" {
            continue;
        }

        if let (Some(cond), Some(consequence)) = (
            stmt.child_by_field_name("condition"),
            stmt.child_by_field_name("consequence"),
        ) {
            dispatch_branch(&cond, &consequence, source, file, handler, ctx, scan);
        }

        let mut alt_cursor = stmt.walk();
        for alternative in stmt.named_children(&mut alt_cursor) {
            match alternative.kind() {
                "elif_clause" => {
                    if let (Some(cond), Some(consequence)) = (
                        alternative.child_by_field_name("condition"),
                        alternative.child_by_field_name("consequence"),
                    ) {
                        dispatch_branch(&cond, &consequence, source, file, handler, ctx, scan);
                    }
                }
                "else_clause" => {
                    if let Some(body) = alternative.child_by_field_name("body") {
                        walk_dispatch(&body, source, file, handler, ctx, scan);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Merge one branch condition into the context; emit a record when the
/// condition completed a method + path pair, otherwise keep descending
fn dispatch_branch<'s>(
    cond: &Node,
    consequence: &Node,
    source: &'s str,
    file: &Path,
    handler: &str,
    mut ctx: DispatchContext<'s>,
    scan: &mut HandlerScan,
) {
    let own = analyze_condition(cond, source);
    if ctx.method.is_none() {
        ctx.method = own.method;
    }
    if ctx.path.is_none() {
        ctx.path = own.path;
    }

    let completed = own.method.is_some() || own.path.is_some();
    match (ctx.method, ctx.path) {
        (Some(method), Some(path)) if completed => {
            let raw_path = with_path_params(path, consequence, source);
            scan.records.push(
                RouteRecord::new(
                    RouteLayer::Handler,
                    file,
                    cond.start_position().row + 1,
                    method,
                    raw_path,
                )
                .with_target(handler)
                .with_snippet(node_text(cond, source)),
            );
        }
        (None, Some(_)) if own.path.is_some() => {
            // A path check with no method in scope dispatches on path alone;
            // the served methods cannot be recovered statically
            scan.warnings.push(ScanWarning::new(
                file,
                Some(cond.start_position().row + 1),
                format!("path check without a method check in {handler}"),
            ));
        }
        _ => {}
    }

    walk_dispatch(consequence, source, file, handler, ctx, scan);
}

/// Extract method/path checks from one condition expression. Both sides of
/// an `and`/`or` chain are inspected; the first hit of each kind wins.
fn analyze_condition<'s>(cond: &Node, source: &'s str) -> DispatchContext<'s> {
    let mut ctx = DispatchContext::default();
    collect_checks(cond, source, &mut ctx);
    ctx
}

fn collect_checks<'s>(node: &Node, source: &'s str, ctx: &mut DispatchContext<'s>) {
    match node.kind() {
        "boolean_operator" | "parenthesized_expression" | "not_operator" => {
            let mut cursor = node.walk();
            for child in node.named_children(&mut cursor) {
                collect_checks(&child, source, ctx);
            }
        }
        "comparison_operator" => comparison_check(node, source, ctx),
        "call" => {
            if ctx.path.is_none() {
                ctx.path = prefix_suffix_check(node, source);
            }
        }
        _ => {}
    }
}

/// `method == 'GET'`, `path == '/orgs'`, `'/invites' in path`
fn comparison_check<'s>(node: &Node, source: &'s str, ctx: &mut DispatchContext<'s>) {
    let mut operands = Vec::new();
    let mut operator = None;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "==" | "in" => operator = Some(child.kind()),
            _ if child.is_named() => operands.push(child),
            _ => {}
        }
    }
    let (Some(op), [a, b]) = (operator, operands.as_slice()) else {
        return;
    };

    let (literal, other) = match (a.kind(), b.kind()) {
        ("string", _) => (a, b),
        (_, "string") => (b, a),
        _ => return,
    };
    let value = strip_quotes(&node_text(literal, source));
    let other_text = node_text(other, source).to_ascii_lowercase();

    match op {
        "==" => {
            if ctx.method.is_none() && other_text.contains("method") {
                ctx.method = HttpMethod::parse(&value);
            } else if ctx.path.is_none() && value.starts_with('/') && other_text.contains("path") {
                ctx.path = literal_path(literal, source);
            }
        }
        "in" => {
            // `'/frag' in path` -- the literal must be the left operand
            if ctx.path.is_none()
                && a.kind() == "string"
                && value.starts_with('/')
                && other_text.contains("path")
            {
                ctx.path = literal_path(literal, source);
            }
        }
        _ => {}
    }
}

/// `path.startswith('/x')` / `path.endswith('/x')`
fn prefix_suffix_check<'s>(call: &Node, source: &'s str) -> Option<&'s str> {
    let function = call.child_by_field_name("function")?;
    if function.kind() != "attribute" {
        return None;
    }
    let object = function.child_by_field_name("object")?;
    let attr = function.child_by_field_name("attribute")?;
    let attr_name = node_text(&attr, source);
    if attr_name != "startswith" && attr_name != "endswith" {
        return None;
    }
    if !node_text(&object, source).to_ascii_lowercase().contains("path") {
        return None;
    }

    let args = call.child_by_field_name("arguments")?;
    let mut cursor = args.walk();
    let arg = args.named_children(&mut cursor).find(|n| n.kind() == "string")?;
    let path = literal_path(&arg, source)?;
    path.starts_with('/').then_some(path)
}

/// Borrow a string literal's content out of the source text (quotes
/// stripped without allocating, so the context can stay `Copy`)
fn literal_path<'s>(literal: &Node, source: &'s str) -> Option<&'s str> {
    let range = literal.byte_range();
    let text = source.get(range)?.trim();
    let inner = text
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| text.strip_prefix('"').and_then(|s| s.strip_suffix('"')))?;
    Some(inner)
}

/// Append a `/{key}` segment for each distinct path parameter the branch
/// body reads, in first-use order
fn with_path_params(path: &str, consequence: &Node, source: &str) -> String {
    let mut params: Vec<String> = Vec::new();

    visit_all(consequence, |node| match node.kind() {
        // event['pathParameters']['inviteId'] / params['inviteId']
        "subscript" => {
            let (Some(value), Some(sub)) = (
                node.child_by_field_name("value"),
                node.child_by_field_name("subscript"),
            ) else {
                return;
            };
            if !mentions_path_parameters(&node_text(&value, source)) || sub.kind() != "string" {
                return;
            }
            let key = strip_quotes(&node_text(&sub, source));
            if key != "pathParameters" && key != "path_parameters" && !params.contains(&key) {
                params.push(key);
            }
        }
        // params.get('inviteId')
        "call" => {
            let Some(function) = node.child_by_field_name("function") else {
                return;
            };
            if function.kind() != "attribute" {
                return;
            }
            let (Some(object), Some(attr)) = (
                function.child_by_field_name("object"),
                function.child_by_field_name("attribute"),
            ) else {
                return;
            };
            if node_text(&attr, source) != "get"
                || !mentions_path_parameters(&node_text(&object, source))
            {
                return;
            }
            let Some(args) = node.child_by_field_name("arguments") else {
                return;
            };
            let mut cursor = args.walk();
            let arg = args.named_children(&mut cursor).find(|n| n.kind() == "string");
            if let Some(arg) = arg {
                let key = strip_quotes(&node_text(&arg, source));
                if !params.contains(&key) {
                    params.push(key);
                }
            }
        }
        _ => {}
    });

    let mut out = path.to_string();
    for key in params {
        out.push('/');
        out.push('{');
        out.push_str(&key);
        out.push('}');
    }
    out
}

fn mentions_path_parameters(text: &str) -> bool {
    text.contains("pathParameters") || text.contains("path_parameters")
}
