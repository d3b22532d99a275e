//! axum adapter for the gateway pipeline.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::gateway::Gateway;
use crate::observability::metrics;
use crate::security::unix_millis;

/// Runs every request through the gateway. Passed requests carry the resolved
/// [`Identity`](crate::identity::Identity) in their extensions.
pub async fn gateway_middleware(
    State(gateway): State<Arc<Gateway>>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let now_ms = unix_millis();

    let gateway_request = gateway.request_from_http(&request);
    let outcome = gateway.evaluate(&gateway_request, now_ms);
    metrics::record_decision(outcome.zone.as_str(), outcome.action.label(), start);

    let mut response = match gateway.action_response(&outcome.action, now_ms) {
        None => {
            if let Some(identity) = outcome.identity.clone() {
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }
        Some(response) => {
            tracing::info!(
                zone = %outcome.zone,
                method = %gateway_request.method,
                path = %gateway_request.path,
                client_ip = %gateway_request.client_ip,
                action = outcome.action.label(),
                "Request stopped at gateway"
            );
            response
        }
    };

    gateway.stamp(response.headers_mut(), &outcome);
    response
}
