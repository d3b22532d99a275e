//! Request authorization gateway library.

// Request path
pub mod gateway;
pub mod identity;
pub mod rbac;
pub mod routing;

// Serving
pub mod admin;
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
