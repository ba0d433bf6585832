//! Error types and exit codes for apidrift

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for apidrift operations
///
/// Domain findings (missing handlers, orphaned routes, ...) are data carried
/// in the validation report, never errors. This type covers tool-level
/// failures only.
#[derive(Error, Debug)]
pub enum DriftError {
    #[error("Path not found: {path}")]
    PathNotFound { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    #[error("Failed to parse {path}: {message}")]
    ParseFailure { path: String, message: String },

    #[error("Report serialization failed: {message}")]
    ReportFailure { message: String },

    #[error("Gateway client error: {message}")]
    GatewayClient { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriftError {
    /// Convert error to the tool-level exit code.
    ///
    /// - 0: validation passed (no error-level findings)
    /// - 1: validation failed (>= 1 error-level finding)
    /// - 2: tool-internal failure (bad root path, parse infrastructure crash)
    ///
    /// 0 and 1 are decided from the report in `main`; every `DriftError`
    /// reaching `main` is a tool-internal failure.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(2)
    }
}

/// Result type alias for apidrift operations
pub type Result<T> = std::result::Result<T, DriftError>;
