//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use authz_gateway::config::GatewayConfig;
use authz_gateway::identity::CredentialIssuer;
use authz_gateway::rbac::Role;
use authz_gateway::{Gateway, GatewayServer};
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

pub const SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Default config with a usable secret and forwarded-for trust, so tests can
/// pick the client IP per request.
pub fn config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.identity.secret = SECRET.to_string();
    config.listener.trust_forwarded_for = true;
    config
}

pub fn app(config: &GatewayConfig) -> Router {
    let gateway = Arc::new(Gateway::from_config(config).expect("valid config"));
    GatewayServer::new(gateway).expect("valid server").router()
}

pub fn token(subject: &str, role: Role, email_verified: bool) -> String {
    CredentialIssuer::new(SECRET, 3600)
        .issue(subject, &format!("{subject}@example.com"), role, email_verified)
        .expect("token")
}

pub fn get(path: &str) -> axum::http::request::Builder {
    Request::builder().method("GET").uri(path)
}

pub fn bearer(builder: axum::http::request::Builder, token: &str) -> axum::http::request::Builder {
    builder.header(header::AUTHORIZATION, format!("Bearer {token}"))
}

pub async fn send(app: &Router, builder: axum::http::request::Builder) -> Response<Body> {
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Upstream stand-in that answers every request with the `x-gateway-role`
/// header it received (or `none`).
pub async fn start_mock_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            buf.extend_from_slice(&chunk[..n]);
                            if buf.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }

                let head = String::from_utf8_lossy(&buf).to_lowercase();
                let role = head
                    .lines()
                    .find_map(|line| line.strip_prefix("x-gateway-role:"))
                    .map(|v| v.trim().to_string())
                    .unwrap_or_else(|| "none".to_string());
                let body = format!("role={role}");
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}
