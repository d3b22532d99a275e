//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Rate limiting (per pipeline stage):
//!     GatewayRequest + Option<Identity>
//!     → rate_limit.rs (key generator → RateLimitKey)
//!     → store.rs (CounterStore::increment, fixed window)
//!     → RateLimitStatus { allowed, remaining, reset }
//!     → on denial: monitor.rs (ViolationRecord appended)
//!
//! Housekeeping:
//!     sweeper.rs (periodic CounterStore::sweep until shutdown)
//!
//! Every response:
//!     → headers.rs (baseline, CORS for API zones, X-RateLimit-*)
//! ```
//!
//! # Design Decisions
//! - Counters live behind the CounterStore trait, never a global
//! - Shared mutable state is limited to the counter map and violation log
//! - Headers are stamped on every branch, including denials

pub mod headers;
pub mod monitor;
pub mod rate_limit;
pub mod store;
pub mod sweeper;

pub use headers::SecurityHeaders;
pub use monitor::{ViolationLog, ViolationRecord, ViolationStats};
pub use rate_limit::{unix_millis, KeyGenerator, LimitReached, RateLimitStatus, RateLimiter};
pub use store::{CounterStore, InMemoryCounterStore, RateLimitCounter, RateLimitKey};
pub use sweeper::CounterSweeper;
