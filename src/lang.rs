//! Language detection and tree-sitter grammar loading
//!
//! apidrift parses exactly the languages its three artifact layers are
//! written in: TypeScript/JavaScript (frontend call sites), HCL/Terraform
//! (gateway route declarations), and Python (Lambda handler dispatch).

use std::path::Path;
use tree_sitter::Language;

/// Supported source languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lang {
    TypeScript,
    Tsx,
    JavaScript,
    Jsx,
    Python,
    Hcl,
}

impl Lang {
    /// Detect language from file path extension, `None` for anything else
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|e| e.to_str())?;
        Self::from_extension(ext)
    }

    /// Detect language from file extension string
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "ts" | "mts" | "cts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            "js" | "mjs" | "cjs" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            "py" => Some(Self::Python),
            "tf" | "hcl" => Some(Self::Hcl),
            _ => None,
        }
    }

    /// Get the canonical name of the language
    pub fn name(&self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Tsx => "tsx",
            Self::JavaScript => "javascript",
            Self::Jsx => "jsx",
            Self::Python => "python",
            Self::Hcl => "hcl",
        }
    }

    /// Get the tree-sitter Language for parsing
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Self::JavaScript | Self::Jsx => tree_sitter_javascript::LANGUAGE.into(),
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Hcl => tree_sitter_hcl::LANGUAGE.into(),
        }
    }

    /// Whether this language belongs to the frontend source layer
    pub fn is_frontend(&self) -> bool {
        matches!(
            self,
            Self::TypeScript | Self::Tsx | Self::JavaScript | Self::Jsx
        )
    }

    /// Extensions scanned for frontend call sites and component annotations
    pub fn frontend_extensions() -> &'static [&'static str] {
        &["ts", "tsx", "js", "jsx", "mts", "mjs"]
    }

    /// Extensions scanned for gateway route declarations
    pub fn infra_extensions() -> &'static [&'static str] {
        &["tf", "hcl"]
    }

    /// Extensions scanned for backend handler dispatch
    pub fn backend_extensions() -> &'static [&'static str] {
        &["py"]
    }
}
