//! Gateway route extractor (live control-plane mode)
//!
//! Instead of parsing Terraform, this mode asks the API Gateway v2 control
//! plane what routes are actually deployed. Listing is paginated; every page
//! is fetched until the service stops returning a continuation token, so a
//! 60-route API comes back complete even at the service's page size.
//!
//! The control plane sits behind the [`GatewayControlPlane`] trait so the
//! pipeline can run against a recorded or in-memory implementation in tests.
//! [`HttpGatewayClient`] is the real one: plain HTTPS against the regional
//! endpoint (or an explicit `--gateway-endpoint` override, which is also how
//! localstack-style emulators are reached).
//!
//! Failure policy: a live query never aborts a validation run. An unknown
//! API id, throttling, or transport errors each degrade to an empty scan
//! with a warning attached, and the static layers still reconcile.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::routes::{HttpMethod, RouteLayer, RouteRecord, ScanWarning};

use super::gateway::GatewayScan;

/// Hard cap on pages fetched per API, guarding against a control plane that
/// keeps echoing the same continuation token
const MAX_PAGES: usize = 100;

/// A control-plane failure, classified for the degradation policy
#[derive(Debug, thiserror::Error)]
pub enum GatewayApiError {
    #[error("API {0} not found")]
    NotFound(String),
    #[error("request throttled by the control plane")]
    Throttled,
    #[error("{0}")]
    Other(String),
}

/// One route as the control plane reports it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePageItem {
    pub route_key: String,
    /// `integrations/<id>` when the route is wired to an integration
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub authorization_type: Option<String>,
}

/// One page of the route listing
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePage {
    #[serde(default)]
    pub items: Vec<RoutePageItem>,
    #[serde(default)]
    pub next_token: Option<String>,
}

/// Integration detail, reduced to what target resolution needs
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationDetail {
    #[serde(default)]
    pub integration_uri: Option<String>,
}

/// Read access to the API Gateway v2 control plane
pub trait GatewayControlPlane {
    fn list_routes(
        &self,
        api_id: &str,
        next_token: Option<&str>,
    ) -> Result<RoutePage, GatewayApiError>;

    fn get_integration(
        &self,
        api_id: &str,
        integration_id: &str,
    ) -> Result<IntegrationDetail, GatewayApiError>;
}

/// Connection settings for [`HttpGatewayClient`]
#[derive(Debug, Clone)]
pub struct GatewayClientConfig {
    /// Base URL of the control plane; defaults to the us-east-1 regional
    /// endpoint when unset
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for GatewayClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(10),
        }
    }
}

const DEFAULT_ENDPOINT: &str = "https://apigateway.us-east-1.amazonaws.com";

/// Blocking HTTP client for the v2 control plane
pub struct HttpGatewayClient {
    http: reqwest::blocking::Client,
    base: String,
}

impl HttpGatewayClient {
    pub fn new(config: GatewayClientConfig) -> Result<Self, GatewayApiError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Other(e.to_string()))?;
        let base = config
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();
        Ok(Self { http, base })
    }

    fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        api_id: &str,
        url: &str,
    ) -> Result<T, GatewayApiError> {
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|e| GatewayApiError::Other(e.to_string()))?;

        match response.status().as_u16() {
            404 => Err(GatewayApiError::NotFound(api_id.to_string())),
            429 => Err(GatewayApiError::Throttled),
            s if !response.status().is_success() => {
                Err(GatewayApiError::Other(format!("control plane returned {s}")))
            }
            _ => response
                .json::<T>()
                .map_err(|e| GatewayApiError::Other(format!("malformed response: {e}"))),
        }
    }
}

impl GatewayControlPlane for HttpGatewayClient {
    fn list_routes(
        &self,
        api_id: &str,
        next_token: Option<&str>,
    ) -> Result<RoutePage, GatewayApiError> {
        let mut url = format!("{}/v2/apis/{api_id}/routes?maxResults=100", self.base);
        if let Some(token) = next_token {
            url.push_str("&nextToken=");
            url.push_str(token);
        }
        debug!(%url, "listing gateway routes");
        self.get_json(api_id, &url)
    }

    fn get_integration(
        &self,
        api_id: &str,
        integration_id: &str,
    ) -> Result<IntegrationDetail, GatewayApiError> {
        let url = format!("{}/v2/apis/{api_id}/integrations/{integration_id}", self.base);
        self.get_json(api_id, &url)
    }
}

/// Query every deployed route of one API into a gateway scan
pub fn query_live_gateway(client: &dyn GatewayControlPlane, api_id: &str) -> GatewayScan {
    let mut scan = GatewayScan::default();
    let origin = PathBuf::from(format!("apigateway://{api_id}"));
    // integration id -> resolved lambda name, memoized across routes
    let mut resolved: BTreeMap<String, Option<String>> = BTreeMap::new();

    let mut next_token: Option<String> = None;
    for page_no in 0.. {
        if page_no >= MAX_PAGES {
            scan.warnings.push(ScanWarning::new(
                &origin,
                None,
                format!("route listing did not terminate after {MAX_PAGES} pages"),
            ));
            break;
        }

        let page = match client.list_routes(api_id, next_token.as_deref()) {
            Ok(page) => page,
            Err(e) => {
                warn!(api_id, error = %e, "live gateway query degraded to empty");
                scan.warnings
                    .push(ScanWarning::new(&origin, None, e.to_string()));
                break;
            }
        };

        for item in page.items {
            let Some((method_str, path)) = item.route_key.split_once(' ') else {
                scan.warnings.push(ScanWarning::new(
                    &origin,
                    None,
                    format!("unparseable route key {:?}", item.route_key),
                ));
                continue;
            };
            let Some(method) = HttpMethod::parse(method_str) else {
                scan.warnings.push(ScanWarning::new(
                    &origin,
                    None,
                    format!("unknown HTTP method in route key {:?}", item.route_key),
                ));
                continue;
            };

            let auth = item
                .authorization_type
                .as_deref()
                .is_some_and(|t| !t.eq_ignore_ascii_case("NONE"));

            let mut record =
                RouteRecord::new(RouteLayer::Gateway, &origin, 0, method, path.trim())
                    .with_auth(auth);

            if let Some(integration_id) = item
                .target
                .as_deref()
                .and_then(|t| t.strip_prefix("integrations/"))
            {
                let lambda = resolved
                    .entry(integration_id.to_string())
                    .or_insert_with(|| {
                        match client.get_integration(api_id, integration_id) {
                            Ok(detail) => detail
                                .integration_uri
                                .as_deref()
                                .and_then(lambda_name_from_uri),
                            Err(e) => {
                                warn!(api_id, integration_id, error = %e, "integration lookup failed");
                                None
                            }
                        }
                    })
                    .clone();
                if let Some(name) = lambda {
                    record = record.with_target(name);
                }
            }

            scan.records.push(record);
        }

        next_token = page.next_token;
        if next_token.is_none() {
            break;
        }
    }

    scan
}

/// Pull the function name out of a lambda invocation ARN, e.g.
/// `arn:aws:lambda:us-east-1:123:function:invites-fn/invocations`
fn lambda_name_from_uri(uri: &str) -> Option<String> {
    let after = uri.split("function:").nth(1)?;
    let name: String = after
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect();
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}
