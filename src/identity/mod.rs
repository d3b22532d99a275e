//! Identity resolution from signed credentials.
//!
//! # Data Flow
//! ```text
//! Request headers
//!     → credential.rs (Authorization: Bearer, then session cookie)
//!     → resolver.rs (HS256 signature + exp check against shared secret)
//!     → Option<Identity> (never an error)
//!
//! Issuance (CLI, tests, sign-in collaborators):
//!     subject + role + flags → issuer.rs → signed token
//! ```
//!
//! # Design Decisions
//! - No data-store access: role and verification are claims fixed at issuance
//! - Every verification failure degrades to "no identity"
//! - Identity lives for one request and is never persisted here

pub mod claims;
pub mod credential;
pub mod issuer;
pub mod resolver;

use serde::Serialize;

use crate::rbac::Role;

pub use claims::Claims;
pub use credential::extract_credential;
pub use issuer::CredentialIssuer;
pub use resolver::IdentityResolver;

/// Per-request principal derived from a verified credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub subject_id: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
    /// Credential issue time, seconds since the Unix epoch.
    pub issued_at: i64,
    /// Credential expiry, seconds since the Unix epoch.
    pub expires_at: i64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject_id: claims.sub,
            email: claims.email,
            role: claims.role,
            email_verified: claims.email_verified,
            issued_at: claims.iat,
            expires_at: claims.exp,
        }
    }
}
