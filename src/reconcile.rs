//! Cross-layer route reconciliation
//!
//! Takes the four extracted route sets (frontend call sites, gateway
//! declarations, handler dispatch branches, component annotations) and folds
//! them into one classified diff. Classification is data, never an error:
//! the reconciler always produces a complete report, even when every route
//! drifted.
//!
//! Handler records are lower-confidence evidence than the other layers, so
//! a gateway route counts as implemented when a handler fragment is
//! contained in it, not only on exact key equality. `'/invites' in path`
//! covers `POST /orgs/{param}/invites` as well as
//! `GET /orgs/{param}/invites/{param}`.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::extractors::{AnnotationScan, ComponentAnnotation, FrontendScan, GatewayScan, HandlerScan};
use crate::normalize;
use crate::report::ValidationReport;
use crate::routes::{RouteKey, RouteRecord};

/// Gateway routes under these prefixes legitimately have no frontend
/// caller, so an uncalled one is informational rather than a warning
const PRIVILEGED_PREFIXES: &[&str] = &["/admin", "/internal", "/webhooks"];

/// Minimum similarity for a "did you mean" suggestion
const SUGGESTION_THRESHOLD: f64 = 0.6;

/// How one route key relates across the layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Declared, implemented, and called consistently
    Matched,
    /// Present on both sides of the frontend/gateway seam but with a
    /// conflicting auth expectation
    Mismatched,
    /// Declared at the gateway with no frontend caller or annotation
    OrphanedRoute,
    /// Called from the frontend but not declared at the gateway
    OrphanedFrontendCall,
    /// Declared at the gateway with no handler branch implementing it
    MissingHandler,
    /// Matched, but declared more than once at the gateway
    DuplicateRoute,
    /// Handler branch serving a route the gateway never declares
    UnroutedHandler,
    /// Annotation declaring a route no layer knows about
    StaleAnnotation,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Matched => "matched",
            Classification::Mismatched => "mismatched",
            Classification::OrphanedRoute => "orphaned_route",
            Classification::OrphanedFrontendCall => "orphaned_frontend_call",
            Classification::MissingHandler => "missing_handler",
            Classification::DuplicateRoute => "duplicate_route",
            Classification::UnroutedHandler => "unrouted_handler",
            Classification::StaleAnnotation => "stale_annotation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

/// Best-effort alternate key for an unmatched route
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub key: RouteKey,
    pub similarity: f64,
}

/// One route key with everything each layer knows about it
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationEntry {
    pub key: RouteKey,
    pub classification: Classification,
    pub severity: Severity,
    pub issue: String,
    pub frontend: Vec<RouteRecord>,
    pub gateway: Vec<RouteRecord>,
    pub handlers: Vec<RouteRecord>,
    pub components: Vec<ComponentRef>,
    pub suggestion: Option<Suggestion>,
}

/// A component annotation's claim on a route, reduced for reporting
#[derive(Debug, Clone, Serialize)]
pub struct ComponentRef {
    pub component: String,
    pub file: std::path::PathBuf,
    pub line: usize,
}

impl ReconciliationEntry {
    /// The record a finding's file/line should point at: the gateway
    /// declaration when one exists, else the frontend call, else the
    /// handler branch
    pub fn primary_record(&self) -> Option<&RouteRecord> {
        self.gateway
            .first()
            .or_else(|| self.frontend.first())
            .or_else(|| self.handlers.first())
    }
}

#[derive(Debug, Default)]
struct Buckets {
    frontend: Vec<RouteRecord>,
    gateway: Vec<RouteRecord>,
    handlers: Vec<RouteRecord>,
    components: Vec<ComponentRef>,
}

/// Reconcile the four layers into a classified report
pub fn reconcile(
    frontend: &FrontendScan,
    gateway: &GatewayScan,
    handlers: &HandlerScan,
    annotations: &AnnotationScan,
) -> ValidationReport {
    let mut buckets: BTreeMap<RouteKey, Buckets> = BTreeMap::new();

    for rec in &frontend.records {
        let key = normalize::route_key(rec.method, &rec.raw_path);
        buckets.entry(key).or_default().frontend.push(rec.clone());
    }
    for rec in &gateway.records {
        let key = normalize::route_key(rec.method, &rec.raw_path);
        buckets.entry(key).or_default().gateway.push(rec.clone());
    }
    for rec in &handlers.records {
        let key = normalize::route_key(rec.method, &rec.raw_path);
        buckets.entry(key).or_default().handlers.push(rec.clone());
    }
    for ann in &annotations.components {
        for key in &ann.routes {
            buckets
                .entry(key.clone())
                .or_default()
                .components
                .push(component_ref(ann));
        }
    }

    // Duplicate gateway declarations: first in (file, line) scan order is
    // canonical, the rest are reported, never dropped
    for bucket in buckets.values_mut() {
        bucket.gateway.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    }

    let gateway_keys: Vec<RouteKey> = buckets
        .iter()
        .filter(|(_, b)| !b.gateway.is_empty())
        .map(|(k, _)| k.clone())
        .collect();
    let frontend_keys: Vec<RouteKey> = buckets
        .iter()
        .filter(|(_, b)| !b.frontend.is_empty())
        .map(|(k, _)| k.clone())
        .collect();
    let handler_keys: Vec<RouteKey> = buckets
        .iter()
        .filter(|(_, b)| !b.handlers.is_empty())
        .map(|(k, _)| k.clone())
        .collect();
    let annotation_index = annotations.route_index();

    debug!(
        frontend = frontend_keys.len(),
        gateway = gateway_keys.len(),
        handlers = handler_keys.len(),
        "reconciling route sets"
    );

    let mut entries = Vec::with_capacity(buckets.len());
    for (key, bucket) in &buckets {
        entries.push(classify(
            key,
            bucket,
            &gateway_keys,
            &frontend_keys,
            &handler_keys,
            &annotation_index,
        ));
    }

    let mut report = ValidationReport::new(entries);
    for w in frontend
        .warnings
        .iter()
        .chain(&gateway.warnings)
        .chain(&handlers.warnings)
        .chain(&annotations.warnings)
    {
        report.push_scan_warning(w.clone());
    }
    report
}

fn component_ref(ann: &ComponentAnnotation) -> ComponentRef {
    ComponentRef {
        component: ann.component.clone(),
        file: ann.file.clone(),
        line: ann.line,
    }
}

fn classify(
    key: &RouteKey,
    bucket: &Buckets,
    gateway_keys: &[RouteKey],
    frontend_keys: &[RouteKey],
    handler_keys: &[RouteKey],
    annotation_index: &BTreeMap<RouteKey, Vec<String>>,
) -> ReconciliationEntry {
    let mut entry = ReconciliationEntry {
        key: key.clone(),
        classification: Classification::Matched,
        severity: Severity::Info,
        issue: String::new(),
        frontend: bucket.frontend.clone(),
        gateway: bucket.gateway.clone(),
        handlers: bucket.handlers.clone(),
        components: bucket.components.clone(),
        suggestion: None,
    };

    if !bucket.gateway.is_empty() {
        if !handler_covers(key, handler_keys) {
            entry.classification = Classification::MissingHandler;
            entry.severity = Severity::Error;
            entry.issue = format!("{key} is declared at the gateway but no handler implements it");
            entry.suggestion = best_suggestion(key, handler_keys);
        } else if let Some(conflict) = auth_conflict(&bucket.frontend, &bucket.gateway) {
            entry.classification = Classification::Mismatched;
            entry.severity = Severity::Error;
            entry.issue = conflict;
        } else if bucket.frontend.is_empty() && !annotation_index.contains_key(key) {
            entry.classification = Classification::OrphanedRoute;
            entry.severity = if is_privileged(&key.path) {
                Severity::Info
            } else {
                Severity::Warning
            };
            entry.issue = format!(
                "{key} is declared at the gateway but never called from the frontend"
            );
            entry.suggestion = best_suggestion(key, frontend_keys);
        } else if bucket.gateway.len() > 1 {
            entry.classification = Classification::DuplicateRoute;
            entry.severity = Severity::Info;
            entry.issue = format!(
                "{key} is declared {} times at the gateway",
                bucket.gateway.len()
            );
        } else {
            entry.issue = format!("{key} is consistent across layers");
        }
    } else if !bucket.frontend.is_empty() {
        entry.classification = Classification::OrphanedFrontendCall;
        entry.severity = Severity::Error;
        entry.issue = format!("{key} is called from the frontend but not declared at the gateway");
        entry.suggestion = best_suggestion(key, gateway_keys);
    } else if !bucket.handlers.is_empty() {
        if handler_key_is_routed(key, gateway_keys) {
            entry.issue = format!("{key} backs one or more gateway routes");
        } else {
            entry.classification = Classification::UnroutedHandler;
            entry.severity = Severity::Info;
            entry.issue = format!("{key} is handled by the backend but never routed");
        }
    } else {
        entry.classification = Classification::StaleAnnotation;
        entry.severity = Severity::Warning;
        let names: Vec<&str> = bucket
            .components
            .iter()
            .map(|c| c.component.as_str())
            .collect();
        entry.issue = format!(
            "{key} is declared by {} but exists in no layer",
            names.join(", ")
        );
        entry.suggestion = best_suggestion(key, gateway_keys);
    }

    entry
}

/// Whether the handler layer implements this gateway key: exact match, or
/// a same-method handler fragment contained in the path
fn handler_covers(key: &RouteKey, handler_keys: &[RouteKey]) -> bool {
    handler_keys.iter().any(|hk| {
        hk.method == key.method
            && (hk.path == key.path
                || key.path.ends_with(&hk.path)
                || key.path.contains(&format!("{}/", hk.path)))
    })
}

/// Inverse of [`handler_covers`]: whether this handler fragment backs some
/// declared gateway route
fn handler_key_is_routed(key: &RouteKey, gateway_keys: &[RouteKey]) -> bool {
    gateway_keys.iter().any(|gk| {
        gk.method == key.method
            && (gk.path == key.path
                || gk.path.ends_with(&key.path)
                || gk.path.contains(&format!("{}/", key.path)))
    })
}

/// A frontend/gateway pair where both sides state an auth expectation and
/// they disagree
fn auth_conflict(frontend: &[RouteRecord], gateway: &[RouteRecord]) -> Option<String> {
    let fe = frontend.iter().find_map(|r| r.auth_required)?;
    let gw = gateway.iter().find_map(|r| r.auth_required)?;
    if fe == gw {
        return None;
    }
    Some(if gw {
        "the gateway requires authorization but the frontend calls it unauthenticated".to_string()
    } else {
        "the frontend sends credentials but the gateway declares no authorizer".to_string()
    })
}

fn is_privileged(path: &str) -> bool {
    PRIVILEGED_PREFIXES
        .iter()
        .any(|p| path == *p || path.starts_with(&format!("{p}/")))
}

/// Highest-similarity candidate above the threshold. Candidates are scored
/// on path similarity; equal scores break lexicographically on the rendered
/// candidate key, so suggestions are stable across runs.
fn best_suggestion(key: &RouteKey, candidates: &[RouteKey]) -> Option<Suggestion> {
    let mut best: Option<Suggestion> = None;
    for candidate in candidates {
        if candidate == key {
            continue;
        }
        let score = similarity_ratio(&key.path, &candidate.path);
        if score < SUGGESTION_THRESHOLD {
            continue;
        }
        let better = match &best {
            None => true,
            Some(current) => {
                score > current.similarity
                    || (score == current.similarity
                        && candidate.to_string() < current.key.to_string())
            }
        };
        if better {
            best = Some(Suggestion {
                key: candidate.clone(),
                similarity: score,
            });
        }
    }
    best
}

/// difflib-style ratio: `2 * M / T` where M is the longest common
/// subsequence length and T the total length of both strings
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // single-row LCS table
    let mut row = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut prev_diag = 0;
        for (j, cb) in b.iter().enumerate() {
            let prev_row = row[j + 1];
            row[j + 1] = if ca == cb {
                prev_diag + 1
            } else {
                row[j + 1].max(row[j])
            };
            prev_diag = prev_row;
        }
    }

    2.0 * row[b.len()] as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{HttpMethod, RouteLayer, ScanWarning};

    fn record(layer: RouteLayer, method: HttpMethod, path: &str) -> RouteRecord {
        RouteRecord::new(layer, format!("{}.src", layer.as_str()), 1, method, path)
    }

    fn frontend(records: Vec<RouteRecord>) -> FrontendScan {
        FrontendScan {
            records,
            warnings: Vec::new(),
        }
    }

    fn gateway(records: Vec<RouteRecord>) -> GatewayScan {
        GatewayScan {
            records,
            warnings: Vec::new(),
        }
    }

    fn handlers(records: Vec<RouteRecord>) -> HandlerScan {
        HandlerScan {
            records,
            warnings: Vec::new(),
        }
    }

    fn annotated(routes: &[(HttpMethod, &str)]) -> AnnotationScan {
        AnnotationScan {
            components: vec![ComponentAnnotation {
                component: "Widget".to_string(),
                file: "Widget.tsx".into(),
                line: 1,
                routes: routes
                    .iter()
                    .map(|(m, p)| normalize::route_key(*m, p))
                    .collect(),
            }],
            warnings: Vec::new(),
        }
    }

    fn entry_for<'r>(
        report: &'r ValidationReport,
        classification: Classification,
    ) -> &'r ReconciliationEntry {
        report
            .entries
            .iter()
            .find(|e| e.classification == classification)
            .unwrap_or_else(|| panic!("no {classification:?} entry in {:#?}", report.entries))
    }

    #[test]
    fn test_fully_matched_route_passes() {
        let report = reconcile(
            &frontend(vec![record(RouteLayer::Frontend, HttpMethod::Get, "/orgs/{orgId}")]),
            &gateway(vec![record(RouteLayer::Gateway, HttpMethod::Get, "/orgs/{id}")]),
            &handlers(vec![record(RouteLayer::Handler, HttpMethod::Get, "/orgs")]),
            &AnnotationScan::default(),
        );

        assert!(report.passed());
        assert_eq!(report.entries.len(), 2);
        assert!(report
            .entries
            .iter()
            .all(|e| e.classification == Classification::Matched));
        // parameter names differ between layers; normalization merges them
        assert!(report
            .entries
            .iter()
            .any(|e| e.key.to_string() == "GET /orgs/{param}"));
    }

    #[test]
    fn test_missing_handler_is_an_error() {
        let report = reconcile(
            &frontend(vec![]),
            &gateway(vec![record(
                RouteLayer::Gateway,
                HttpMethod::Post,
                "/orgs/{orgId}/invites",
            )]),
            &handlers(vec![record(RouteLayer::Handler, HttpMethod::Get, "/invites")]),
            &AnnotationScan::default(),
        );

        assert!(!report.passed());
        let entry = entry_for(&report, Classification::MissingHandler);
        assert_eq!(entry.severity, Severity::Error);
        assert_eq!(entry.key.to_string(), "POST /orgs/{param}/invites");
    }

    #[test]
    fn test_handler_containment_covers_parameterized_routes() {
        // one '/invites' GET branch covers both declared GET shapes
        let report = reconcile(
            &frontend(vec![]),
            &gateway(vec![
                record(RouteLayer::Gateway, HttpMethod::Get, "/orgs/{orgId}/invites"),
                record(
                    RouteLayer::Gateway,
                    HttpMethod::Get,
                    "/orgs/{orgId}/invites/{inviteId}",
                ),
            ]),
            &handlers(vec![record(RouteLayer::Handler, HttpMethod::Get, "/invites")]),
            &AnnotationScan::default(),
        );

        assert!(report
            .entries
            .iter()
            .all(|e| e.classification != Classification::MissingHandler));
    }

    #[test]
    fn test_orphaned_route_warns_and_privileged_prefix_downgrades() {
        let report = reconcile(
            &frontend(vec![]),
            &gateway(vec![
                record(RouteLayer::Gateway, HttpMethod::Get, "/reports"),
                record(RouteLayer::Gateway, HttpMethod::Get, "/admin/reports"),
            ]),
            &handlers(vec![
                record(RouteLayer::Handler, HttpMethod::Get, "/reports"),
                record(RouteLayer::Handler, HttpMethod::Get, "/admin/reports"),
            ]),
            &AnnotationScan::default(),
        );

        assert!(report.passed());
        let orphans: Vec<&ReconciliationEntry> = report
            .entries
            .iter()
            .filter(|e| e.classification == Classification::OrphanedRoute)
            .collect();
        assert_eq!(orphans.len(), 2);
        let by_path =
            |p: &str| orphans.iter().find(|e| e.key.path == p).unwrap().severity;
        assert_eq!(by_path("/reports"), Severity::Warning);
        assert_eq!(by_path("/admin/reports"), Severity::Info);
    }

    #[test]
    fn test_annotation_suppresses_orphan() {
        let report = reconcile(
            &frontend(vec![]),
            &gateway(vec![record(
                RouteLayer::Gateway,
                HttpMethod::Get,
                "/admin/org/chat/messages/{id}",
            )]),
            &handlers(vec![record(RouteLayer::Handler, HttpMethod::Get, "/messages")]),
            // parameter name differs from the declaration; normalization
            // makes the suppression hold anyway
            &annotated(&[(HttpMethod::Get, "/admin/org/chat/messages/{messageId}")]),
        );

        assert!(report
            .entries
            .iter()
            .all(|e| e.classification != Classification::OrphanedRoute));
        let matched = entry_for(&report, Classification::Matched);
        assert_eq!(matched.components.len(), 1);
        assert_eq!(matched.components[0].component, "Widget");
    }

    #[test]
    fn test_orphaned_frontend_call_suggests_existing_route() {
        let report = reconcile(
            &frontend(vec![record(
                RouteLayer::Frontend,
                HttpMethod::Delete,
                "/orgs/{orgId}/invites/{inviteId}",
            )]),
            &gateway(vec![
                record(RouteLayer::Gateway, HttpMethod::Get, "/orgs/{orgId}/invites/{inviteId}"),
                record(RouteLayer::Gateway, HttpMethod::Post, "/orgs/{orgId}/invites/{inviteId}"),
            ]),
            &handlers(vec![record(RouteLayer::Handler, HttpMethod::Get, "/invites"), record(RouteLayer::Handler, HttpMethod::Post, "/invites")]),
            &AnnotationScan::default(),
        );

        assert!(!report.passed());
        let entry = entry_for(&report, Classification::OrphanedFrontendCall);
        let suggestion = entry.suggestion.as_ref().unwrap();
        // identical paths on both candidates; the lexicographically
        // smaller key string wins so the suggestion is reproducible
        assert_eq!(suggestion.key.method, HttpMethod::Get);
        assert!((suggestion.similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_auth_conflict_is_mismatched() {
        let fe =
            record(RouteLayer::Frontend, HttpMethod::Get, "/billing").with_auth(false);
        let gw = record(RouteLayer::Gateway, HttpMethod::Get, "/billing").with_auth(true);
        let report = reconcile(
            &frontend(vec![fe]),
            &gateway(vec![gw]),
            &handlers(vec![record(RouteLayer::Handler, HttpMethod::Get, "/billing")]),
            &AnnotationScan::default(),
        );

        assert!(!report.passed());
        let entry = entry_for(&report, Classification::Mismatched);
        assert!(entry.issue.contains("authorization"));
    }

    #[test]
    fn test_duplicate_gateway_declarations_are_informational() {
        let mut second = record(RouteLayer::Gateway, HttpMethod::Get, "/orgs");
        second.line = 9;
        let report = reconcile(
            &frontend(vec![record(RouteLayer::Frontend, HttpMethod::Get, "/orgs")]),
            &gateway(vec![record(RouteLayer::Gateway, HttpMethod::Get, "/orgs"), second]),
            &handlers(vec![record(RouteLayer::Handler, HttpMethod::Get, "/orgs")]),
            &AnnotationScan::default(),
        );

        assert!(report.passed());
        let entry = entry_for(&report, Classification::DuplicateRoute);
        assert_eq!(entry.severity, Severity::Info);
        // first by (file, line) stays canonical
        assert_eq!(entry.gateway[0].line, 1);
    }

    #[test]
    fn test_every_key_lands_in_exactly_one_entry() {
        let report = reconcile(
            &frontend(vec![
                record(RouteLayer::Frontend, HttpMethod::Get, "/a"),
                record(RouteLayer::Frontend, HttpMethod::Post, "/b"),
            ]),
            &gateway(vec![
                record(RouteLayer::Gateway, HttpMethod::Get, "/a"),
                record(RouteLayer::Gateway, HttpMethod::Delete, "/c"),
            ]),
            &handlers(vec![record(RouteLayer::Handler, HttpMethod::Get, "/a")]),
            &annotated(&[(HttpMethod::Put, "/d")]),
        );

        let mut keys: Vec<String> = report.entries.iter().map(|e| e.key.to_string()).collect();
        let total = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(
            keys,
            vec!["DELETE /c", "GET /a", "POST /b", "PUT /d"]
        );
    }

    #[test]
    fn test_scan_warnings_fold_into_report() {
        let mut fe = frontend(vec![]);
        fe.warnings.push(ScanWarning::new("app.ts", Some(3), "parse failed"));
        let report = reconcile(&fe, &gateway(vec![]), &handlers(vec![]), &AnnotationScan::default());

        assert_eq!(report.scan_warnings.len(), 1);
        assert!(report.passed());
    }

    #[test]
    fn test_suggestion_tie_breaks_on_candidate_string() {
        let key = normalize::route_key(HttpMethod::Delete, "/widgets/{id}");
        // BTreeMap key order puts PUT before PATCH; the rendered strings
        // order the other way, and the string order is what readers see
        let candidates = vec![
            normalize::route_key(HttpMethod::Put, "/widgets/{id}"),
            normalize::route_key(HttpMethod::Patch, "/widgets/{id}"),
        ];
        let suggestion = best_suggestion(&key, &candidates).unwrap();
        assert_eq!(suggestion.key.method, HttpMethod::Patch);
        assert!((suggestion.similarity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_similarity_ratio() {
        assert!((similarity_ratio("/orgs", "/orgs") - 1.0).abs() < f64::EPSILON);
        assert!(similarity_ratio("/orgs/{param}/invites", "/orgs/{param}/invite") > 0.9);
        assert!(similarity_ratio("/health", "/webhooks/github") < 0.6);
        assert!((similarity_ratio("", "") - 1.0).abs() < f64::EPSILON);
    }
}
