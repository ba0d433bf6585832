//! Validate command - full cross-layer reconciliation

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::{OutputFormat, ValidateArgs};
use crate::commands::{render_endpoints, CommandContext, CommandOutput};
use crate::error::{DriftError, Result};
use crate::extractors::{
    query_live_gateway, scan_annotations, scan_frontend, scan_gateway, scan_handlers,
    GatewayClientConfig, GatewayScan, HttpGatewayClient,
};
use crate::reconcile::reconcile;

/// Run the validate command
pub fn run_validate(args: &ValidateArgs, ctx: &CommandContext) -> Result<CommandOutput> {
    let root = checked_dir(&args.path)?;
    let frontend_dir = layer_dir(&root, args.frontend_dir.as_deref())?;
    let infra_dir = layer_dir(&root, args.infra_dir.as_deref())?;
    let backend_dir = layer_dir(&root, args.backend_dir.as_deref())?;

    // Single-layer diagnostic modes print endpoints and never fail the run
    if args.frontend_only {
        let scan = scan_frontend(&frontend_dir);
        return Ok(CommandOutput::ok(render_endpoints(
            "frontend",
            &scan.unique_endpoints(),
            ctx.format,
        )?));
    }
    if args.gateway_only {
        let scan = gateway_layer(args, &infra_dir)?;
        return Ok(CommandOutput::ok(render_endpoints(
            "gateway",
            &scan.unique_routes(),
            ctx.format,
        )?));
    }
    if args.lambda_only {
        let scan = scan_handlers(&backend_dir);
        return Ok(CommandOutput::ok(render_endpoints(
            "lambda",
            &scan.unique_endpoints(),
            ctx.format,
        )?));
    }

    // Live mode builds its client up front so a broken TLS/config setup is
    // a tool failure, not a silently empty gateway layer
    let live_client = match &args.live_api_id {
        Some(_) => Some(
            HttpGatewayClient::new(GatewayClientConfig {
                endpoint: args.gateway_endpoint.clone(),
                ..GatewayClientConfig::default()
            })
            .map_err(|e| DriftError::GatewayClient {
                message: e.to_string(),
            })?,
        ),
        None => None,
    };

    let ((frontend, annotations), (gateway, handlers)) = rayon::join(
        || {
            rayon::join(
                || scan_frontend(&frontend_dir),
                || scan_annotations(&frontend_dir),
            )
        },
        || {
            rayon::join(
                || match (&args.live_api_id, &live_client) {
                    (Some(api_id), Some(client)) => query_live_gateway(client, api_id),
                    _ => scan_gateway(&infra_dir),
                },
                || scan_handlers(&backend_dir),
            )
        },
    );

    info!(
        frontend = frontend.records.len(),
        gateway = gateway.records.len(),
        handlers = handlers.records.len(),
        components = annotations.components.len(),
        "extraction complete"
    );

    let report = reconcile(&frontend, &gateway, &handlers, &annotations);
    let text = match ctx.format {
        OutputFormat::Text => report.render_text(ctx.verbose),
        OutputFormat::Json => report.render_json()?,
        OutputFormat::Markdown => report.render_markdown(),
    };

    Ok(CommandOutput {
        text,
        failed: !report.passed(),
    })
}

fn gateway_layer(args: &ValidateArgs, infra_dir: &Path) -> Result<GatewayScan> {
    match &args.live_api_id {
        Some(api_id) => {
            let client = HttpGatewayClient::new(GatewayClientConfig {
                endpoint: args.gateway_endpoint.clone(),
                ..GatewayClientConfig::default()
            })
            .map_err(|e| DriftError::GatewayClient {
                message: e.to_string(),
            })?;
            Ok(query_live_gateway(&client, api_id))
        }
        None => Ok(scan_gateway(infra_dir)),
    }
}

fn checked_dir(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(DriftError::PathNotFound {
            path: path.display().to_string(),
        });
    }
    if !path.is_dir() {
        return Err(DriftError::NotADirectory {
            path: path.display().to_string(),
        });
    }
    Ok(path.to_path_buf())
}

fn layer_dir(root: &Path, sub: Option<&Path>) -> Result<PathBuf> {
    match sub {
        Some(dir) => checked_dir(&root.join(dir)),
        None => Ok(root.to_path_buf()),
    }
}
