//! Command modules for the apidrift CLI
//!
//! Each command module implements a single top-level command:
//! - `validate` - Full cross-layer reconciliation (or single-layer diagnostics)
//! - `routes` - List one layer's unique endpoints
//!
//! Command handlers take their `Args` struct from `cli.rs` and a shared
//! `CommandContext` for output format and verbosity, and return a
//! [`CommandOutput`] so `main` can separate rendering from the exit code.

pub mod routes;
pub mod validate;

pub use routes::run_routes;
pub use validate::run_validate;

use serde_json::json;

use crate::cli::OutputFormat;
use crate::error::Result;
use crate::routes::RouteKey;

/// Shared context passed to all command handlers
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Output format (text, json, or markdown)
    pub format: OutputFormat,
    /// Show verbose output
    pub verbose: bool,
}

impl Default for CommandContext {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            verbose: false,
        }
    }
}

impl CommandContext {
    /// Create a new CommandContext from CLI args
    pub fn from_cli(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }
}

/// What a command produced, plus whether validation failed (exit code 1)
#[derive(Debug)]
pub struct CommandOutput {
    pub text: String,
    pub failed: bool,
}

impl CommandOutput {
    pub fn ok(text: String) -> Self {
        Self {
            text,
            failed: false,
        }
    }
}

/// Render a single layer's unique endpoint listing
pub fn render_endpoints(
    layer: &str,
    keys: &[RouteKey],
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = format!("{} endpoints ({}):\n", layer, keys.len());
            for key in keys {
                out.push_str(&format!("  {key}\n"));
            }
            Ok(out)
        }
        OutputFormat::Json => {
            let value = json!({
                "layer": layer,
                "count": keys.len(),
                "endpoints": keys.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            });
            serde_json::to_string_pretty(&value).map_err(|e| {
                crate::error::DriftError::ReportFailure {
                    message: e.to_string(),
                }
            })
        }
        OutputFormat::Markdown => {
            let mut out = format!("## {} endpoints ({})\n\n", layer, keys.len());
            for key in keys {
                out.push_str(&format!("- `{key}`\n"));
            }
            Ok(out)
        }
    }
}
