//! Role-based access control.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     [permissions] config (or built-in defaults)
//!     → permissions.rs (completeness check over Role::ALL)
//!     → PermissionTable (immutable, shared via Arc)
//!
//! Per request:
//!     Option<&Identity> + permission string
//!     → PermissionTable::has_permission
//!     → bool
//! ```
//!
//! # Design Decisions
//! - Roles are a closed enum; unknown role strings never deserialize
//! - Admin satisfies every check without enumerating permissions
//! - Absent identity is denied every permission
//! - The same table is used by downstream handlers after the gate passes

pub mod permissions;
pub mod role;

pub use permissions::{PermissionSet, PermissionTable, WILDCARD};
pub use role::Role;
