//! Transport-neutral view of an inbound request.

use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request};

use crate::identity::extract_credential;

/// How to read gateway-relevant facts out of HTTP requests.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub cookie_name: String,
    pub trust_forwarded_for: bool,
}

/// Everything the pipeline looks at. Built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub client_ip: String,
    pub origin: Option<String>,
    pub credential: Option<String>,
}

const UNKNOWN_IP: &str = "unknown";

impl GatewayRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            client_ip: UNKNOWN_IP.to_string(),
            origin: None,
            credential: None,
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn from_http<B>(request: &Request<B>, options: &RequestOptions) -> Self {
        let headers = request.headers();
        let uri = request.uri();

        Self {
            method: request.method().clone(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            client_ip: client_ip(request, options.trust_forwarded_for),
            origin: headers
                .get(header::ORIGIN)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            credential: extract_credential(headers, &options.cookie_name),
        }
    }

    /// First value of a decoded query parameter.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

fn client_ip<B>(request: &Request<B>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(request.headers()) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_IP.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn options(trust: bool) -> RequestOptions {
        RequestOptions {
            cookie_name: "session-token".into(),
            trust_forwarded_for: trust,
        }
    }

    #[test]
    fn test_from_http() {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri("/api/goals?page=2")
            .header("Origin", "http://localhost:3000")
            .header("Authorization", "Bearer tok")
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo("192.0.2.1:5555".parse::<SocketAddr>().unwrap()));

        let untrusted = GatewayRequest::from_http(&request, &options(false));
        assert_eq!(untrusted.method, Method::POST);
        assert_eq!(untrusted.path, "/api/goals");
        assert_eq!(untrusted.query.as_deref(), Some("page=2"));
        assert_eq!(untrusted.client_ip, "192.0.2.1");
        assert_eq!(untrusted.origin.as_deref(), Some("http://localhost:3000"));
        assert_eq!(untrusted.credential.as_deref(), Some("tok"));

        let trusted = GatewayRequest::from_http(&request, &options(true));
        assert_eq!(trusted.client_ip, "203.0.113.9");
    }

    #[test]
    fn test_unknown_ip_without_connect_info() {
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        assert_eq!(GatewayRequest::from_http(&request, &options(false)).client_ip, "unknown");
    }

    #[test]
    fn test_query_param_decoding() {
        let request = GatewayRequest::new(Method::GET, "/auth/signin")
            .with_query("callbackUrl=%2Fdashboard%2Fgoals&x=1");
        assert_eq!(request.query_param("callbackUrl").as_deref(), Some("/dashboard/goals"));
        assert_eq!(request.query_param("missing"), None);
    }
}
