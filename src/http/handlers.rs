//! Handlers served by the gateway itself.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Serialize;

use crate::error::{json_error, GatewayError};
use crate::http::server::AppState;
use crate::identity::Identity;

#[derive(Serialize)]
pub struct HealthStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub identity: Identity,
    pub permissions: Vec<String>,
    pub wildcard: bool,
}

pub async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
    })
}

/// The caller's identity and effective permissions.
pub async fn me(State(state): State<AppState>, identity: Option<Extension<Identity>>) -> Response {
    let Some(Extension(identity)) = identity else {
        return GatewayError::AuthenticationMissing.into_response();
    };

    let set = state.gateway.permissions().permissions_for(identity.role);
    Json(MeResponse {
        permissions: set.map(|s| s.to_sorted_vec()).unwrap_or_default(),
        wildcard: set.is_some_and(|s| s.is_wildcard()),
        identity,
    })
    .into_response()
}

/// Fallback for passed requests when no upstream is configured.
pub async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not found")
}
