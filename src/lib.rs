//! apidrift - full-stack API contract validator
//!
//! Statically cross-validates the three places a web app's API surface is
//! defined: frontend call sites (TypeScript/JavaScript), API gateway route
//! declarations (Terraform for AWS API Gateway v2, or the live control
//! plane), and backend Lambda dispatch code (Python). Component annotations
//! add a fourth, declarative layer. All four are normalized onto a common
//! route key and reconciled into a classified drift report.
//!
//! The library exposes each stage separately; the CLI in `main.rs` wires
//! them together:
//!
//! ```no_run
//! use apidrift::extractors::{scan_frontend, scan_gateway, scan_handlers, scan_annotations};
//! use apidrift::reconcile::reconcile;
//!
//! let root = std::path::Path::new(".");
//! let frontend = scan_frontend(root);
//! let gateway = scan_gateway(root);
//! let handlers = scan_handlers(root);
//! let annotations = scan_annotations(root);
//! let report = reconcile(&frontend, &gateway, &handlers, &annotations);
//! println!("{}", report.render_text(false));
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod extractors;
pub mod lang;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod routes;

pub use cli::{Cli, Commands, OutputFormat};
pub use commands::{CommandContext, CommandOutput};
pub use error::{DriftError, Result};
pub use lang::Lang;
pub use reconcile::{reconcile, Classification, ReconciliationEntry, Severity, Suggestion};
pub use report::ValidationReport;
pub use routes::{HttpMethod, RouteKey, RouteLayer, RouteRecord, ScanWarning};
