//! HTTP front end.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request ID, trace span, timeout, body limit)
//!     → gateway middleware (decide; render or pass)
//!     → handlers.rs (/api/health, /api/me) | admin (rate-limit report)
//!     → upstream.rs (forward everything else, when configured)
//! ```

pub mod handlers;
pub mod request_id;
pub mod server;
pub mod upstream;

pub use request_id::X_REQUEST_ID;
pub use server::{build_router, AppState, GatewayServer};
pub use upstream::Upstream;
