//! Core route data model
//!
//! A route is an (HTTP method, path template) pair representing one logical
//! API endpoint. Each extractor produces immutable [`RouteRecord`]s for one
//! source layer; the reconciler compares layers through [`RouteKey`]s built
//! with the shared normalizer.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// HTTP methods recognized across all layers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// Gateway catch-all (`ANY /path`)
    Any,
}

impl HttpMethod {
    /// Parse a method name case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "PATCH" => Some(Self::Patch),
            "DELETE" => Some(Self::Delete),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "ANY" | "*" => Some(Self::Any),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Any => "ANY",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which artifact layer a record was discovered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteLayer {
    Frontend,
    Gateway,
    Handler,
    Component,
}

impl RouteLayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Frontend => "frontend",
            Self::Gateway => "gateway",
            Self::Handler => "handler",
            Self::Component => "component",
        }
    }
}

/// Unique identity of a logical route: method + normalized path.
///
/// `Ord` gives the deterministic report ordering (method, then path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RouteKey {
    pub method: HttpMethod,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// One discovered route occurrence.
///
/// Created during a single scan pass, immutable afterwards, held only for
/// the duration of one validation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteRecord {
    pub layer: RouteLayer,
    pub file: PathBuf,
    /// 1-based line of the call site / declaration / dispatch branch
    pub line: usize,
    pub method: HttpMethod,
    /// Raw, non-normalized path as written in the source
    pub raw_path: String,
    /// Gateway layer: resolved handler function name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Whether this layer expects the route to require authorization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_required: Option<bool>,
    /// Gateway layer: whether CORS is enabled for the owning API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_enabled: Option<bool>,
    /// Short source snippet for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl RouteRecord {
    pub fn new(
        layer: RouteLayer,
        file: impl Into<PathBuf>,
        line: usize,
        method: HttpMethod,
        raw_path: impl Into<String>,
    ) -> Self {
        Self {
            layer,
            file: file.into(),
            line,
            method,
            raw_path: raw_path.into(),
            target: None,
            auth_required: None,
            cors_enabled: None,
            snippet: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_auth(mut self, auth_required: bool) -> Self {
        self.auth_required = Some(auth_required);
        self
    }

    pub fn with_cors(mut self, cors_enabled: bool) -> Self {
        self.cors_enabled = Some(cors_enabled);
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

/// A non-fatal problem encountered during a scan (unparseable file,
/// malformed annotation block). Folds into the report's warnings bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanWarning {
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub message: String,
}

impl ScanWarning {
    pub fn new(file: impl Into<PathBuf>, line: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse_case_insensitive() {
        assert_eq!(HttpMethod::parse("get"), Some(HttpMethod::Get));
        assert_eq!(HttpMethod::parse("DELETE"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse(" Post "), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("*"), Some(HttpMethod::Any));
        assert_eq!(HttpMethod::parse("FETCH"), None);
    }

    #[test]
    fn test_route_key_ordering() {
        let mut keys = vec![
            RouteKey::new(HttpMethod::Post, "/orgs".to_string()),
            RouteKey::new(HttpMethod::Get, "/orgs/{param}".to_string()),
            RouteKey::new(HttpMethod::Get, "/orgs".to_string()),
        ];
        keys.sort();
        assert_eq!(keys[0].to_string(), "GET /orgs");
        assert_eq!(keys[1].to_string(), "GET /orgs/{param}");
        assert_eq!(keys[2].to_string(), "POST /orgs");
    }
}
