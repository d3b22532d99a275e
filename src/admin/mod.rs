//! Rate-limit administration API.
//!
//! Mounted under `/api/admin`, which the default route table places in the
//! `api_admin` zone. Access control is the gateway's job; these handlers
//! assume the caller is already authorized.

pub mod handlers;

use axum::routing::get;
use axum::Router;

use crate::http::server::AppState;
use self::handlers::{rate_limit_report, reset_rate_limits};

pub const RATE_LIMITS_PATH: &str = "/api/admin/rate-limits";

pub fn admin_router() -> Router<AppState> {
    Router::new().route(
        RATE_LIMITS_PATH,
        get(rate_limit_report).delete(reset_rate_limits),
    )
}
