//! Route classification.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → matcher.rs (compile path patterns)
//!     → Sort by specificity (longest prefix first, declared order on ties)
//!     → Freeze as immutable RouteClassifier
//!
//! Per request:
//!     path
//!     → path.rs (refuse non-canonical spellings)
//!     → classifier.rs (first matching rule, else Public)
//!     → API prefix lifts page zones to their Api* variants
//!     → Classification (zone + rule metadata)
//! ```
//!
//! # Design Decisions
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path always yields the same zone
//! - Exactly one zone per request; unmatched paths are Public

pub mod classifier;
pub mod matcher;
pub mod path;
pub mod zone;

pub use classifier::{Classification, RouteClassifier, RouteRule};
pub use matcher::PathPattern;
pub use path::{check_canonical, is_canonical, PathDefect};
pub use zone::Zone;
