//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Full-stack API contract validator
#[derive(Parser, Debug)]
#[command(name = "apidrift")]
#[command(about = "Cross-validates frontend calls, gateway routes, and backend handlers")]
#[command(version)]
#[command(author)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output (includes matched and informational entries)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands for apidrift
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Reconcile every layer and report drift
    #[command(visible_alias = "v")]
    Validate(ValidateArgs),

    /// List one layer's unique endpoints
    #[command(visible_alias = "r")]
    Routes(RoutesArgs),
}

/// Arguments for the validate command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Project root to scan
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub path: PathBuf,

    /// Frontend sources, relative to the root (defaults to the root itself)
    #[arg(long, value_name = "DIR")]
    pub frontend_dir: Option<PathBuf>,

    /// Terraform sources, relative to the root (defaults to the root itself)
    #[arg(long, value_name = "DIR")]
    pub infra_dir: Option<PathBuf>,

    /// Backend handler sources, relative to the root (defaults to the root itself)
    #[arg(long, value_name = "DIR")]
    pub backend_dir: Option<PathBuf>,

    /// Query the deployed API instead of parsing Terraform
    #[arg(long, value_name = "API_ID")]
    pub live_api_id: Option<String>,

    /// Control-plane endpoint override (emulators, recorded fixtures)
    #[arg(long, value_name = "URL", requires = "live_api_id")]
    pub gateway_endpoint: Option<String>,

    /// Only scan frontend call sites and print their endpoints
    #[arg(long, conflicts_with_all = ["gateway_only", "lambda_only"])]
    pub frontend_only: bool,

    /// Only scan gateway declarations and print their endpoints
    #[arg(long, conflicts_with = "lambda_only")]
    pub gateway_only: bool,

    /// Only scan backend handlers and print their endpoints
    #[arg(long)]
    pub lambda_only: bool,
}

/// Arguments for the routes command
#[derive(Args, Debug)]
pub struct RoutesArgs {
    /// Which layer to list
    #[arg(value_enum, value_name = "LAYER")]
    pub layer: LayerArg,

    /// Project root to scan
    #[arg(long, default_value = ".", value_name = "DIR")]
    pub path: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerArg {
    Frontend,
    Gateway,
    Lambda,
}

/// Output format for reports and endpoint listings
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable terminal output
    Text,
    /// Machine-readable JSON
    Json,
    /// CI-pasteable Markdown
    Markdown,
}
