//! Routes command - list one layer's unique endpoints

use crate::cli::{LayerArg, RoutesArgs};
use crate::commands::{render_endpoints, CommandContext, CommandOutput};
use crate::error::{DriftError, Result};
use crate::extractors::{scan_frontend, scan_gateway, scan_handlers};

/// Run the routes command
pub fn run_routes(args: &RoutesArgs, ctx: &CommandContext) -> Result<CommandOutput> {
    if !args.path.exists() {
        return Err(DriftError::PathNotFound {
            path: args.path.display().to_string(),
        });
    }
    if !args.path.is_dir() {
        return Err(DriftError::NotADirectory {
            path: args.path.display().to_string(),
        });
    }

    let (layer, keys) = match args.layer {
        LayerArg::Frontend => ("frontend", scan_frontend(&args.path).unique_endpoints()),
        LayerArg::Gateway => ("gateway", scan_gateway(&args.path).unique_routes()),
        LayerArg::Lambda => ("lambda", scan_handlers(&args.path).unique_endpoints()),
    };

    Ok(CommandOutput::ok(render_endpoints(layer, &keys, ctx.format)?))
}
