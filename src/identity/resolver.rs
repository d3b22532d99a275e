//! Credential verification.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use crate::identity::{Claims, Identity};

/// Verifies HS256 credentials against the shared secret.
///
/// Resolution is total: missing, malformed, expired, or badly signed
/// credentials all yield `None`.
#[derive(Clone)]
pub struct IdentityResolver {
    key: DecodingKey,
    validation: Validation,
}

impl IdentityResolver {
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn resolve(&self, credential: Option<&str>) -> Option<Identity> {
        let token = credential?;
        match decode::<Claims>(token, &self.key, &self.validation) {
            Ok(data) => Some(Identity::from(data.claims)),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("Credential expired"),
                    ErrorKind::InvalidSignature => tracing::warn!("Credential signature mismatch"),
                    _ => tracing::debug!(error = %e, "Credential rejected"),
                }
                None
            }
        }
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::CredentialIssuer;
    use crate::rbac::Role;
    use chrono::Utc;

    const SECRET: &str = "unit-test-secret-that-is-long-enough-000";

    #[test]
    fn test_valid_credential() {
        let issuer = CredentialIssuer::new(SECRET, 3600);
        let token = issuer.issue("user-1", "a@example.com", Role::Moderator, true).unwrap();

        let identity = IdentityResolver::new(SECRET, 0).resolve(Some(&token)).unwrap();
        assert_eq!(identity.subject_id, "user-1");
        assert_eq!(identity.email, "a@example.com");
        assert_eq!(identity.role, Role::Moderator);
        assert!(identity.email_verified);
        assert!(identity.expires_at > identity.issued_at);
    }

    #[test]
    fn test_missing_credential() {
        assert_eq!(IdentityResolver::new(SECRET, 0).resolve(None), None);
    }

    #[test]
    fn test_malformed_credential() {
        let resolver = IdentityResolver::new(SECRET, 0);
        assert_eq!(resolver.resolve(Some("not-a-token")), None);
        assert_eq!(resolver.resolve(Some("a.b.c")), None);
        assert_eq!(resolver.resolve(Some("")), None);
    }

    #[test]
    fn test_wrong_secret() {
        let issuer = CredentialIssuer::new("another-secret-that-is-long-enough-11111", 3600);
        let token = issuer.issue("user-1", "a@example.com", Role::Admin, true).unwrap();
        assert_eq!(IdentityResolver::new(SECRET, 0).resolve(Some(&token)), None);
    }

    #[test]
    fn test_expired_credential() {
        let now = Utc::now().timestamp();
        let issuer = CredentialIssuer::new(SECRET, 3600);
        let token = issuer
            .sign(&Claims {
                sub: "user-1".into(),
                email: String::new(),
                role: Role::User,
                email_verified: true,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert_eq!(IdentityResolver::new(SECRET, 0).resolve(Some(&token)), None);
    }

    #[test]
    fn test_unknown_role_rejected() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = Utc::now().timestamp();
        let claims = serde_json::json!({
            "sub": "user-1",
            "role": "owner",
            "emailVerified": true,
            "iat": now,
            "exp": now + 600,
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert_eq!(IdentityResolver::new(SECRET, 0).resolve(Some(&token)), None);
    }
}
