//! Rate limiting through the full router, plus the admin report and reset.

mod common;

use axum::http::{header, StatusCode};
use authz_gateway::rbac::Role;
use common::{app, bearer, body_json, config, get, send, token};

fn from_ip(path: &str, ip: &str) -> axum::http::request::Builder {
    get(path).header("x-forwarded-for", ip)
}

#[tokio::test]
async fn test_eleventh_request_is_rejected() {
    let mut config = config();
    config.rate_limit.max = 10;
    config.rate_limit.window_ms = 60_000;
    let app = app(&config);

    for i in 0..10u32 {
        let response = send(&app, from_ip("/api/health", "203.0.113.1")).await;
        assert_eq!(response.status(), StatusCode::OK, "request {}", i + 1);
        assert_eq!(response.headers()["x-ratelimit-limit"], "10");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            (9 - i).to_string().as_str()
        );
    }

    let response = send(&app, from_ip("/api/health", "203.0.113.1")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()[header::RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    assert!(response.headers().contains_key("x-ratelimit-reset"));
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert_eq!(
        body_json(response).await["error"],
        "Too many requests, please try again later."
    );

    // Other callers keep their own budget.
    let other = send(&app, from_ip("/api/health", "203.0.113.2")).await;
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_beats_authorization() {
    let mut config = config();
    config.rate_limit.max = 1;
    let app = app(&config);
    let admin = token("a-1", Role::Admin, true);

    send(&app, bearer(from_ip("/dashboard", "198.51.100.1"), &admin)).await;
    let response = send(&app, bearer(from_ip("/dashboard", "198.51.100.1"), &admin)).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Pages get the JSON 429 too.
    let page = send(&app, from_ip("/dashboard", "198.51.100.1")).await;
    assert_eq!(page.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_preflights_are_rate_limited() {
    let mut config = config();
    config.rate_limit.max = 1;
    let app = app(&config);
    let preflight = || {
        from_ip("/api/goals", "198.51.100.9")
            .method("OPTIONS")
            .header(header::ORIGIN, "http://localhost:3000")
    };

    assert_eq!(send(&app, preflight()).await.status(), StatusCode::NO_CONTENT);
    for _ in 0..4 {
        let response = send(&app, preflight()).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }
}

#[tokio::test]
async fn test_auth_routes_use_their_own_bucket() {
    let app = app(&config());

    for _ in 0..5 {
        let response = send(&app, from_ip("/api/auth/signin", "192.0.2.10")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    let limited = send(&app, from_ip("/api/auth/signin", "192.0.2.10")).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    // The global limiter still has room for this caller elsewhere.
    let health = send(&app, from_ip("/api/health", "192.0.2.10")).await;
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_per_user_limit_layers_on_global() {
    let mut config = config();
    config.user_rate_limit.enabled = true;
    config.user_rate_limit.max = 2;
    let app = app(&config);

    let alice = token("alice", Role::User, true);
    let bob = token("bob", Role::User, true);

    for _ in 0..2 {
        let response = send(&app, bearer(from_ip("/api/me", "10.1.1.1"), &alice)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let limited = send(&app, bearer(from_ip("/api/me", "10.1.1.1"), &alice)).await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);

    // Same IP, different user.
    let response = send(&app, bearer(from_ip("/api/me", "10.1.1.1"), &bob)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Anonymous callers skip the per-user limiter.
    for _ in 0..3 {
        let response = send(&app, from_ip("/api/health", "10.1.1.1")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn test_admin_report_and_reset() {
    let mut config = config();
    config.rate_limit.max = 2;
    let app = app(&config);
    let admin = token("root", Role::Admin, true);

    for _ in 0..4 {
        send(&app, from_ip("/api/goals", "203.0.113.50")).await;
    }

    let report = send(&app, bearer(from_ip("/api/admin/rate-limits?window=600&limit=1", "10.0.0.1"), &admin)).await;
    assert_eq!(report.status(), StatusCode::OK);
    let body = body_json(report).await;
    assert_eq!(body["stats"]["windowSecs"], 600);
    assert_eq!(body["stats"]["total"], 2);
    assert_eq!(body["stats"]["uniqueKeys"], 1);
    assert_eq!(body["stats"]["topPaths"][0]["path"], "/api/goals");
    assert_eq!(body["recent"].as_array().unwrap().len(), 1);
    assert_eq!(body["recent"][0]["key"], "203.0.113.50");
    assert_eq!(body["recent"][0]["bucket"], "global");

    let reset = send(
        &app,
        bearer(from_ip("/api/admin/rate-limits", "10.0.0.1"), &admin).method("DELETE"),
    )
    .await;
    assert_eq!(reset.status(), StatusCode::OK);
    let body = body_json(reset).await;
    assert_eq!(body["clearedViolations"], 2);

    let after = send(&app, from_ip("/api/goals", "203.0.113.50")).await;
    assert_eq!(after.status(), StatusCode::UNAUTHORIZED);
}
