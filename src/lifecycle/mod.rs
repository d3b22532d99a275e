//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Env overrides → Validate → Build gateway → Bind → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Broadcast → Server drains, sweeper exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then gateway, then listeners
//! - Any startup error is fatal; nothing is retried
//! - No reload: configuration is fixed for the life of the process

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
