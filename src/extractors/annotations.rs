//! Component route annotation extractor
//!
//! Frontend components document the endpoints they depend on in comment
//! blocks:
//!
//! ```text
//! /**
//!  * @component InviteList
//!  * @routes
//!  * - GET /orgs/{orgId}/invites - fetch pending invites
//!  * - DELETE /orgs/{orgId}/invites/{inviteId} - revoke an invite
//!  */
//! ```
//!
//! Annotations are declarative metadata, not call sites, so they never
//! create routes on their own. The reconciler uses them to suppress
//! orphaned-route findings for endpoints a component declares without a
//! statically visible call, and to attribute findings to components.
//!
//! The block format is line-oriented, so this extractor runs on raw text
//! with regexes rather than a syntax tree; annotations survive in files the
//! parser cannot handle.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::extractors::collect_source_files;
use crate::extractors::read_source;
use crate::lang::Lang;
use crate::normalize;
use crate::routes::{HttpMethod, RouteKey, ScanWarning};

/// One `@component` block with its declared routes
#[derive(Debug, Clone)]
pub struct ComponentAnnotation {
    pub component: String,
    pub file: std::path::PathBuf,
    pub line: usize,
    /// Normalized keys of the `@routes` list, in declaration order
    pub routes: Vec<RouteKey>,
}

/// Result of one annotation scan
#[derive(Debug, Default)]
pub struct AnnotationScan {
    pub components: Vec<ComponentAnnotation>,
    pub warnings: Vec<ScanWarning>,
}

impl AnnotationScan {
    /// Whether a named component carries any route annotations
    pub fn has_metadata(&self, component: &str) -> bool {
        self.components.iter().any(|c| c.component == component)
    }

    /// Index from normalized route key to the components declaring it
    pub fn route_index(&self) -> BTreeMap<RouteKey, Vec<String>> {
        let mut index: BTreeMap<RouteKey, Vec<String>> = BTreeMap::new();
        for ann in &self.components {
            for key in &ann.routes {
                let components = index.entry(key.clone()).or_default();
                if !components.contains(&ann.component) {
                    components.push(ann.component.clone());
                }
            }
        }
        index
    }
}

fn component_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@component\s+([A-Za-z0-9_.-]+)").unwrap())
}

fn route_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // "- GET /orgs/{orgId}/invites - fetch pending invites"
    RE.get_or_init(|| Regex::new(r"^\s*\*?\s*-\s+([A-Za-z*]+)\s+(/\S*)(?:\s+-\s+.*)?$").unwrap())
}

/// Scan frontend sources for `@component` annotation blocks
pub fn scan_annotations(root: &Path) -> AnnotationScan {
    let mut scan = AnnotationScan::default();

    for file in collect_source_files(root, Lang::frontend_extensions()) {
        let Some(source) = read_source(&file) else {
            continue;
        };
        scan_file(&file, &source, &mut scan);
    }

    scan
}

fn scan_file(file: &Path, source: &str, scan: &mut AnnotationScan) {
    let lines: Vec<&str> = source.lines().collect();
    let mut i = 0;

    while i < lines.len() {
        let Some(caps) = component_re().captures(lines[i]) else {
            i += 1;
            continue;
        };
        let component = caps[1].to_string();
        let start_line = i + 1;
        let mut routes = Vec::new();
        let mut saw_routes_tag = false;

        // Consume the rest of the comment block
        let mut j = i + 1;
        while j < lines.len() {
            let line = lines[j];
            if line.contains("*/") || component_re().is_match(line) {
                break;
            }
            if line.contains("@routes") {
                saw_routes_tag = true;
            } else if saw_routes_tag {
                if let Some(caps) = route_line_re().captures(line) {
                    match HttpMethod::parse(&caps[1]) {
                        Some(method) => {
                            routes.push(normalize::route_key(method, &caps[2]));
                        }
                        None => scan.warnings.push(ScanWarning::new(
                            file,
                            Some(j + 1),
                            format!("unknown HTTP method in @routes entry for {component}"),
                        )),
                    }
                }
            }
            j += 1;
        }

        if saw_routes_tag && routes.is_empty() {
            scan.warnings.push(ScanWarning::new(
                file,
                Some(start_line),
                format!("@component {component} declares an empty @routes list"),
            ));
        }

        scan.components.push(ComponentAnnotation {
            component,
            file: file.to_path_buf(),
            line: start_line,
            routes,
        });
        i = j;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn scan_snippet(source: &str) -> AnnotationScan {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("InviteList.tsx"), source).unwrap();
        scan_annotations(dir.path())
    }

    #[test]
    fn test_annotation_block() {
        let scan = scan_snippet(
            r#"
/**
 * @component InviteList
 * @routes
 * - GET /orgs/{orgId}/invites - fetch pending invites
 * - DELETE /orgs/{orgId}/invites/{inviteId} - revoke an invite
 */
export function InviteList() {}
"#,
        );

        assert_eq!(scan.components.len(), 1);
        let ann = &scan.components[0];
        assert_eq!(ann.component, "InviteList");
        assert_eq!(ann.line, 3);
        assert_eq!(ann.routes.len(), 2);
        assert_eq!(ann.routes[0].to_string(), "GET /orgs/{param}/invites");
        assert_eq!(
            ann.routes[1].to_string(),
            "DELETE /orgs/{param}/invites/{param}"
        );
    }

    #[test]
    fn test_route_index_merges_components() {
        let scan = scan_snippet(
            r#"
/**
 * @component InviteList
 * @routes
 * - GET /invites
 */
export function InviteList() {}

/**
 * @component InviteBadge
 * @routes
 * - GET /invites
 */
export function InviteBadge() {}
"#,
        );

        let index = scan.route_index();
        assert_eq!(index.len(), 1);
        let components = index.values().next().unwrap();
        assert_eq!(components, &vec!["InviteList".to_string(), "InviteBadge".to_string()]);
    }

    #[test]
    fn test_empty_routes_list_warns() {
        let scan = scan_snippet(
            r#"
/**
 * @component Orphan
 * @routes
 */
export function Orphan() {}
"#,
        );

        assert_eq!(scan.components.len(), 1);
        assert!(scan.components[0].routes.is_empty());
        assert_eq!(scan.warnings.len(), 1);
        assert!(scan.warnings[0].message.contains("Orphan"));
    }

    #[test]
    fn test_has_metadata() {
        let scan = scan_snippet(
            r#"
/**
 * @component Documented
 * @routes
 * - GET /x
 */
export function Documented() {}
export function Plain() {}
"#,
        );
        assert!(scan.has_metadata("Documented"));
        assert!(!scan.has_metadata("Plain"));
        assert!(scan.warnings.is_empty());
    }

    #[test]
    fn test_description_suffix_optional() {
        let scan = scan_snippet(
            r#"
/**
 * @component Health
 * @routes
 * - GET /health
 */
"#,
        );

        assert_eq!(scan.components[0].routes.len(), 1);
        assert_eq!(scan.components[0].routes[0].to_string(), "GET /health");
    }
}
