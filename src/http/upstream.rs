//! Forwarding of passed requests to the application server.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the configured upstream authority
//! - Describe the resolved identity in `x-gateway-*` headers
//! - Map transport failures to 502
//!
//! # Design Decisions
//! - Client-supplied `x-gateway-*` headers are always stripped first
//! - No retries: passed requests may be non-idempotent

use axum::body::Body;
use axum::extract::Request;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::Response;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::ValidationError;
use crate::error::json_error;
use crate::identity::Identity;

pub const X_GATEWAY_SUBJECT: HeaderName = HeaderName::from_static("x-gateway-subject");
pub const X_GATEWAY_ROLE: HeaderName = HeaderName::from_static("x-gateway-role");

/// HTTP client bound to one upstream base URL.
#[derive(Clone)]
pub struct Upstream {
    client: Client<HttpConnector, Body>,
    authority: Authority,
}

impl Upstream {
    pub fn new(url: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidUpstream(url.to_string());
        let uri: Uri = url.parse().map_err(|_| invalid())?;
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(invalid());
        }
        let authority = uri.authority().cloned().ok_or_else(invalid)?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { client, authority })
    }

    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    pub async fn forward(&self, request: Request) -> Response {
        let identity = request.extensions().get::<Identity>().cloned();
        let (mut parts, body) = request.into_parts();

        let mut uri_parts = parts.uri.clone().into_parts();
        uri_parts.scheme = Some(Scheme::HTTP);
        uri_parts.authority = Some(self.authority.clone());
        if uri_parts.path_and_query.is_none() {
            uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        parts.uri = match Uri::from_parts(uri_parts) {
            Ok(uri) => uri,
            Err(e) => {
                tracing::error!(error = %e, "Failed to build upstream URI");
                return bad_gateway();
            }
        };
        identity_headers(&mut parts.headers, identity.as_ref());

        let path = parts.uri.path().to_string();
        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Response::from_parts(parts, Body::new(body))
            }
            Err(e) => {
                tracing::error!(upstream = %self.authority, path = %path, error = %e, "Upstream error");
                bad_gateway()
            }
        }
    }
}

fn identity_headers(headers: &mut HeaderMap, identity: Option<&Identity>) {
    headers.remove(X_GATEWAY_SUBJECT);
    headers.remove(X_GATEWAY_ROLE);
    let Some(identity) = identity else {
        return;
    };
    // Subject and role travel together or not at all.
    let Ok(subject) = HeaderValue::from_str(&identity.subject_id) else {
        tracing::warn!(role = identity.role.as_str(), "Subject not encodable as header, identity not forwarded");
        return;
    };
    headers.insert(X_GATEWAY_SUBJECT, subject);
    headers.insert(X_GATEWAY_ROLE, HeaderValue::from_static(identity.role.as_str()));
}

fn bad_gateway() -> Response {
    json_error(StatusCode::BAD_GATEWAY, "Upstream request failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::Role;

    #[test]
    fn test_rejects_non_http_upstreams() {
        assert!(Upstream::new("http://127.0.0.1:3000").is_ok());
        assert!(Upstream::new("https://app.example").is_err());
        assert!(Upstream::new("/relative").is_err());
    }

    #[test]
    fn test_identity_headers_replace_client_values() {
        let mut headers = HeaderMap::new();
        headers.insert(X_GATEWAY_ROLE, HeaderValue::from_static("admin"));

        identity_headers(&mut headers, None);
        assert!(!headers.contains_key(X_GATEWAY_ROLE));

        let identity = Identity {
            subject_id: "u-7".into(),
            email: "u7@example.com".into(),
            role: Role::Moderator,
            email_verified: true,
            issued_at: 0,
            expires_at: i64::MAX,
        };
        identity_headers(&mut headers, Some(&identity));
        assert_eq!(headers[X_GATEWAY_SUBJECT], "u-7");
        assert_eq!(headers[X_GATEWAY_ROLE], "moderator");
    }

    #[test]
    fn test_unencodable_subject_drops_role_too() {
        let mut headers = HeaderMap::new();
        headers.insert(X_GATEWAY_ROLE, HeaderValue::from_static("admin"));

        let identity = Identity {
            subject_id: "u-7\nx-injected: 1".into(),
            email: "u7@example.com".into(),
            role: Role::Admin,
            email_verified: true,
            issued_at: 0,
            expires_at: i64::MAX,
        };
        identity_headers(&mut headers, Some(&identity));
        assert!(!headers.contains_key(X_GATEWAY_SUBJECT));
        assert!(!headers.contains_key(X_GATEWAY_ROLE));
    }
}
