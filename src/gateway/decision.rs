//! Response decision engine.
//!
//! # State Machine
//! ```text
//! START → CLASSIFIED → [IDENTITY_CHECKED] → [PERMISSION_CHECKED] → terminal
//! ```
//!
//! # Precedence
//! 1. Rate limit denial (any zone) → JSON 429
//! 2. Public zones → PASS
//! 3. Missing identity → sign-in redirect (pages) / 401 (API)
//! 4. Unverified email → verify-email redirect (pages only)
//! 5. Wrong role or missing permission → dashboard redirect (pages) / 403 (API)
//!
//! `decide` is pure: identical inputs always give the identical action.

use axum::http::StatusCode;

use crate::config::RedirectConfig;
use crate::error::GatewayError;
use crate::identity::Identity;
use crate::rbac::{PermissionTable, Role};
use crate::routing::Zone;
use crate::security::RateLimitStatus;

/// Terminal gateway action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Pass,
    Redirect(String),
    JsonError {
        status: StatusCode,
        message: &'static str,
        /// Window reset for 429s, milliseconds since the epoch.
        reset_at_ms: Option<u64>,
    },
    /// CORS preflight answered by the gateway itself.
    Preflight,
}

impl Action {
    pub fn from_error(error: &GatewayError) -> Self {
        let reset_at_ms = match error {
            GatewayError::RateLimitExceeded { reset_at_ms } => Some(*reset_at_ms),
            _ => None,
        };
        Action::JsonError {
            status: error.status(),
            message: error.public_message(),
            reset_at_ms,
        }
    }

    pub fn rate_limited(status: &RateLimitStatus) -> Self {
        Self::from_error(&GatewayError::RateLimitExceeded {
            reset_at_ms: status.reset_at_ms,
        })
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Action::Pass)
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Action::Pass => "pass",
            Action::Redirect(_) => "redirect",
            Action::JsonError { status, .. } => match status.as_u16() {
                400 => "bad_request",
                401 => "unauthorized",
                403 => "forbidden",
                429 => "rate_limited",
                _ => "error",
            },
            Action::Preflight => "preflight",
        }
    }
}

/// Facts the engine folds into one action.
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub zone: Zone,
    pub identity: Option<&'a Identity>,
    pub required_permissions: &'a [String],
    pub path: &'a str,
    /// `callbackUrl` query parameter, honored on sign-in pages.
    pub callback_url: Option<&'a str>,
    pub rate_limit: Option<&'a RateLimitStatus>,
}

pub fn decide(input: &DecisionInput<'_>, table: &PermissionTable, redirects: &RedirectConfig) -> Action {
    if let Some(status) = input.rate_limit.filter(|s| !s.allowed) {
        return Action::rate_limited(status);
    }

    match input.zone {
        Zone::Public | Zone::ApiPublic => Action::Pass,
        Zone::AuthPage => auth_page(input, redirects),
        Zone::Protected | Zone::Admin | Zone::Moderator => page_gate(input, table, redirects),
        Zone::ApiProtected | Zone::ApiAdmin | Zone::ApiModerator => api_gate(input, table),
    }
}

/// Signed-in users have no business on sign-in pages.
fn auth_page(input: &DecisionInput<'_>, redirects: &RedirectConfig) -> Action {
    match input.identity {
        None => Action::Pass,
        Some(identity) if !identity.email_verified => {
            Action::Redirect(redirects.verify_email.clone())
        }
        Some(_) => {
            let target = input
                .callback_url
                .filter(|url| is_local_path(url))
                .unwrap_or(redirects.dashboard.as_str());
            Action::Redirect(target.to_string())
        }
    }
}

fn page_gate(input: &DecisionInput<'_>, table: &PermissionTable, redirects: &RedirectConfig) -> Action {
    let Some(identity) = input.identity else {
        return Action::Redirect(signin_url(&redirects.signin, input.path));
    };
    if !identity.email_verified {
        return Action::Redirect(redirects.verify_email.clone());
    }
    if !role_allowed(input.zone, identity.role) || !permissions_met(input, table) {
        return Action::Redirect(redirects.dashboard.clone());
    }
    Action::Pass
}

fn api_gate(input: &DecisionInput<'_>, table: &PermissionTable) -> Action {
    let Some(identity) = input.identity else {
        return Action::from_error(&GatewayError::AuthenticationMissing);
    };
    if !role_allowed(input.zone, identity.role) || !permissions_met(input, table) {
        return Action::from_error(&GatewayError::AuthorizationDenied);
    }
    Action::Pass
}

fn role_allowed(zone: Zone, role: Role) -> bool {
    match zone {
        Zone::Admin | Zone::ApiAdmin => role == Role::Admin,
        Zone::Moderator | Zone::ApiModerator => role.is_staff(),
        _ => true,
    }
}

fn permissions_met(input: &DecisionInput<'_>, table: &PermissionTable) -> bool {
    input.required_permissions.is_empty()
        || table.has_any_permission(input.identity, input.required_permissions)
}

/// Same-site relative path; rejects scheme-relative `//host`, backslash
/// tricks, and anything a browser would strip or a header cannot carry.
fn is_local_path(url: &str) -> bool {
    url.starts_with('/')
        && !url.starts_with("//")
        && !url
            .chars()
            .any(|c| c == '\\' || c.is_control() || c.is_whitespace())
}

/// `/auth/signin?callbackUrl=/dashboard`. Slashes stay readable; everything
/// else is form-encoded.
pub fn signin_url(signin: &str, path: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("{signin}?callbackUrl={}", encoded.replace("%2F", "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(role: Role, verified: bool) -> Identity {
        Identity {
            subject_id: "u1".into(),
            email: "u1@example.com".into(),
            role,
            email_verified: verified,
            issued_at: 0,
            expires_at: i64::MAX,
        }
    }

    fn run(zone: Zone, identity: Option<&Identity>, path: &str) -> Action {
        let input = DecisionInput {
            zone,
            identity,
            required_permissions: &[],
            path,
            callback_url: None,
            rate_limit: None,
        };
        decide(&input, &PermissionTable::default(), &RedirectConfig::default())
    }

    #[test]
    fn test_public_zones_pass_for_everyone() {
        let user = identity(Role::User, false);
        for zone in [Zone::Public, Zone::ApiPublic] {
            assert_eq!(run(zone, None, "/"), Action::Pass);
            assert_eq!(run(zone, Some(&user), "/"), Action::Pass);
        }
    }

    #[test]
    fn test_protected_page() {
        assert_eq!(
            run(Zone::Protected, None, "/dashboard"),
            Action::Redirect("/auth/signin?callbackUrl=/dashboard".into())
        );
        assert_eq!(
            run(Zone::Protected, Some(&identity(Role::User, false)), "/dashboard"),
            Action::Redirect("/auth/verify-email".into())
        );
        assert_eq!(
            run(Zone::Protected, Some(&identity(Role::User, true)), "/dashboard"),
            Action::Pass
        );
    }

    #[test]
    fn test_admin_page() {
        let signin = run(Zone::Admin, None, "/admin");
        assert!(matches!(signin, Action::Redirect(ref t) if t.starts_with("/auth/signin")));
        assert_eq!(
            run(Zone::Admin, Some(&identity(Role::User, true)), "/admin"),
            Action::Redirect("/dashboard".into())
        );
        assert_eq!(
            run(Zone::Admin, Some(&identity(Role::Moderator, true)), "/admin"),
            Action::Redirect("/dashboard".into())
        );
        assert_eq!(run(Zone::Admin, Some(&identity(Role::Admin, true)), "/admin"), Action::Pass);
    }

    #[test]
    fn test_verification_checked_before_role() {
        assert_eq!(
            run(Zone::Admin, Some(&identity(Role::User, false)), "/admin"),
            Action::Redirect("/auth/verify-email".into())
        );
    }

    #[test]
    fn test_moderator_zones() {
        let user = identity(Role::User, true);
        let moderator = identity(Role::Moderator, true);
        let admin = identity(Role::Admin, true);
        assert_eq!(run(Zone::Moderator, Some(&user), "/moderation"), Action::Redirect("/dashboard".into()));
        assert_eq!(run(Zone::Moderator, Some(&moderator), "/moderation"), Action::Pass);
        assert_eq!(run(Zone::Moderator, Some(&admin), "/moderation"), Action::Pass);

        assert_eq!(run(Zone::ApiModerator, Some(&user), "/api/moderation").label(), "forbidden");
        assert_eq!(run(Zone::ApiModerator, Some(&moderator), "/api/moderation"), Action::Pass);
    }

    #[test]
    fn test_api_zones_use_json() {
        let missing = run(Zone::ApiProtected, None, "/api/goals");
        assert_eq!(
            missing,
            Action::JsonError {
                status: StatusCode::UNAUTHORIZED,
                message: "Authentication required",
                reset_at_ms: None,
            }
        );
        assert_eq!(run(Zone::ApiAdmin, None, "/api/admin").label(), "unauthorized");
        assert_eq!(
            run(Zone::ApiAdmin, Some(&identity(Role::User, true)), "/api/admin").label(),
            "forbidden"
        );
        assert_eq!(
            run(Zone::ApiAdmin, Some(&identity(Role::Admin, true)), "/api/admin/rate-limits"),
            Action::Pass
        );
    }

    #[test]
    fn test_api_zone_ignores_verification() {
        assert_eq!(
            run(Zone::ApiProtected, Some(&identity(Role::User, false)), "/api/goals"),
            Action::Pass
        );
    }

    #[test]
    fn test_auth_page() {
        let redirects = RedirectConfig::default();
        let table = PermissionTable::default();
        let verified = identity(Role::User, true);
        let mut input = DecisionInput {
            zone: Zone::AuthPage,
            identity: None,
            required_permissions: &[],
            path: "/auth/signin",
            callback_url: Some("/goals/3"),
            rate_limit: None,
        };
        assert_eq!(decide(&input, &table, &redirects), Action::Pass);

        input.identity = Some(&verified);
        assert_eq!(decide(&input, &table, &redirects), Action::Redirect("/goals/3".into()));

        input.callback_url = Some("//evil.example/phish");
        assert_eq!(decide(&input, &table, &redirects), Action::Redirect("/dashboard".into()));

        for hostile in ["/\t/evil.example", "/x\ny", "/x\ry", "/ /evil.example", "/\\evil.example"] {
            input.callback_url = Some(hostile);
            assert_eq!(
                decide(&input, &table, &redirects),
                Action::Redirect("/dashboard".into()),
                "{hostile:?}"
            );
        }

        let unverified = identity(Role::User, false);
        input.identity = Some(&unverified);
        assert_eq!(
            decide(&input, &table, &redirects),
            Action::Redirect("/auth/verify-email".into())
        );
    }

    #[test]
    fn test_required_permissions() {
        let required = vec!["reports:read".to_string(), "billing:refund".to_string()];
        let table = PermissionTable::default();
        let redirects = RedirectConfig::default();
        let user = identity(Role::User, true);
        let moderator = identity(Role::Moderator, true);

        let mut input = DecisionInput {
            zone: Zone::Protected,
            identity: Some(&user),
            required_permissions: &required,
            path: "/reports",
            callback_url: None,
            rate_limit: None,
        };
        assert_eq!(decide(&input, &table, &redirects), Action::Redirect("/dashboard".into()));

        input.identity = Some(&moderator);
        assert_eq!(decide(&input, &table, &redirects), Action::Pass);

        input.zone = Zone::ApiProtected;
        input.identity = Some(&user);
        assert_eq!(decide(&input, &table, &redirects).label(), "forbidden");
    }

    #[test]
    fn test_rate_limit_beats_everything() {
        let status = RateLimitStatus {
            allowed: false,
            limit: 10,
            remaining: 0,
            reset_at_ms: 90_000,
            standard_headers: false,
        };
        let admin = identity(Role::Admin, true);
        for zone in [Zone::Public, Zone::Protected, Zone::ApiAdmin] {
            let input = DecisionInput {
                zone,
                identity: Some(&admin),
                required_permissions: &[],
                path: "/x",
                callback_url: None,
                rate_limit: Some(&status),
            };
            let action = decide(&input, &PermissionTable::default(), &RedirectConfig::default());
            assert_eq!(
                action,
                Action::JsonError {
                    status: StatusCode::TOO_MANY_REQUESTS,
                    message: "Too many requests, please try again later.",
                    reset_at_ms: Some(90_000),
                }
            );
        }
    }

    #[test]
    fn test_decide_is_deterministic() {
        let user = identity(Role::User, true);
        let first = run(Zone::Admin, Some(&user), "/admin/users");
        let second = run(Zone::Admin, Some(&user), "/admin/users");
        assert_eq!(first, second);
    }

    #[test]
    fn test_signin_url_encoding() {
        assert_eq!(
            signin_url("/auth/signin", "/dashboard/goals"),
            "/auth/signin?callbackUrl=/dashboard/goals"
        );
        assert_eq!(
            signin_url("/auth/signin", "/a b&c"),
            "/auth/signin?callbackUrl=/a+b%26c"
        );
    }
}
