//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, env overrides)
//!     → validation.rs (semantic checks, all errors collected)
//!     → GatewayConfig (validated, immutable)
//!     → compiled into the Gateway at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; route tables never change at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Any validation failure is fatal at startup, never per request

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, SECRET_ENV_VAR};
pub use schema::{
    CorsConfig, CounterStoreConfig, GatewayConfig, IdentityConfig, KeyStrategy, ListenerConfig,
    MonitoringConfig, ObservabilityConfig, PipelineConfig, RateLimitConfig, RedirectConfig,
    RouteConfig, RoutingConfig, SecurityConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
