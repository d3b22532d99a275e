//! Credential issuance.

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};

use crate::error::GatewayError;
use crate::identity::Claims;
use crate::rbac::Role;

/// Signs credentials with the same secret the resolver verifies against.
#[derive(Clone)]
pub struct CredentialIssuer {
    key: EncodingKey,
    ttl_secs: u64,
}

impl CredentialIssuer {
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Issue a credential valid from now for the configured TTL.
    pub fn issue(
        &self,
        subject_id: &str,
        email: &str,
        role: Role,
        email_verified: bool,
    ) -> Result<String, GatewayError> {
        let iat = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl_secs).unwrap_or(i64::MAX);

        self.sign(&Claims {
            sub: subject_id.to_string(),
            email: email.to_string(),
            role,
            email_verified,
            iat,
            exp: iat.saturating_add(ttl),
        })
    }

    /// Sign an explicit claim set.
    pub fn sign(&self, claims: &Claims) -> Result<String, GatewayError> {
        encode(&Header::default(), claims, &self.key).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode credential");
            GatewayError::Credential(e)
        })
    }
}
