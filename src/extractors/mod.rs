//! Route extractors for the three artifact layers plus component annotations
//!
//! Each extractor performs one synchronous scan over its layer's source tree
//! and owns the resulting `Vec<RouteRecord>`. Extractors share the directory
//! walker and tree-sitter helpers in this module; per-file failures are
//! logged and skipped, never aborting the enclosing scan.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::warn;
use tree_sitter::{Node, Tree};

use crate::error::{DriftError, Result};
use crate::lang::Lang;

pub mod annotations;
pub mod frontend;
pub mod gateway;
pub mod gateway_live;
pub mod handler;

pub use annotations::{scan_annotations, AnnotationScan, ComponentAnnotation};
pub use frontend::{scan_frontend, FrontendScan};
pub use gateway::{scan_gateway, GatewayScan};
pub use gateway_live::{
    query_live_gateway, GatewayApiError, GatewayClientConfig, GatewayControlPlane,
    HttpGatewayClient, IntegrationDetail, RoutePage, RoutePageItem,
};
pub use handler::{scan_handlers, HandlerScan};

/// Directories never worth scanning, regardless of gitignore state
const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "target",
    "dist",
    "build",
    ".next",
    "coverage",
    "__pycache__",
    ".terraform",
];

/// Collect source files under `root` matching the given extensions.
///
/// Respects .gitignore, never follows symlinks, and returns paths sorted
/// so scan order (and therefore duplicate tie-breaking) is deterministic.
pub fn collect_source_files(root: &Path, extensions: &[&str]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkBuilder::new(root)
        .follow_links(false)
        .filter_entry(|entry| {
            entry
                .file_name()
                .to_str()
                .map(|name| !SKIP_DIRS.contains(&name))
                .unwrap_or(true)
        })
        .build();

    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                files.push(path.to_path_buf());
            }
        }
    }

    files.sort();
    files
}

/// Parse one source file into a tree-sitter AST
pub fn parse_source(path: &Path, source: &str, lang: Lang) -> Result<Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&lang.tree_sitter_language())
        .map_err(|e| DriftError::ParseFailure {
            path: path.display().to_string(),
            message: format!("failed to set language {}: {e:?}", lang.name()),
        })?;

    parser.parse(source, None).ok_or_else(|| DriftError::ParseFailure {
        path: path.display().to_string(),
        message: "parser returned no tree".to_string(),
    })
}

/// Read a file, logging and returning None on failure (per-file isolation)
pub fn read_source(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "skipping unreadable file");
            None
        }
    }
}

/// Get text content of a node
pub fn node_text(node: &Node, source: &str) -> String {
    node.utf8_text(source.as_bytes()).unwrap_or("").to_string()
}

/// Strip matching single or double quotes from a literal's text
pub fn strip_quotes(text: &str) -> String {
    let t = text.trim();
    let t = t.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or_else(|| {
        t.strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .unwrap_or(t)
    });
    t.to_string()
}

/// Visit all nodes in a tree with a visitor function (iterative to avoid
/// stack overflow on deep ASTs)
pub fn visit_all<F>(node: &Node, mut visitor: F)
where
    F: FnMut(&Node),
{
    let mut cursor = node.walk();
    let mut did_visit_children = false;

    loop {
        if !did_visit_children {
            visitor(&cursor.node());

            if cursor.goto_first_child() {
                continue;
            }
        }

        if cursor.goto_next_sibling() {
            did_visit_children = false;
            continue;
        }

        if !cursor.goto_parent() {
            break;
        }
        did_visit_children = true;
    }
}
