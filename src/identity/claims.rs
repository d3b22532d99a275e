//! Credential claim set.

use serde::{Deserialize, Serialize};

use crate::rbac::Role;

/// Claims carried by a gateway credential.
///
/// `role` is the closed [`Role`] enum, so a token naming any other role
/// fails to decode and resolves to no identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(rename = "emailVerified", default)]
    pub email_verified: bool,
    pub iat: i64,
    pub exp: i64,
}
