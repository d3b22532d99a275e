//! Security zones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Security classification assigned to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Zone {
    Public,
    AuthPage,
    Protected,
    Admin,
    Moderator,
    ApiPublic,
    ApiProtected,
    ApiAdmin,
    ApiModerator,
}

impl Zone {
    /// API zones answer with JSON errors instead of redirects.
    pub fn is_api(&self) -> bool {
        matches!(
            self,
            Zone::ApiPublic | Zone::ApiProtected | Zone::ApiAdmin | Zone::ApiModerator
        )
    }

    /// Zones that never require an identity.
    pub fn is_public(&self) -> bool {
        matches!(self, Zone::Public | Zone::ApiPublic)
    }

    /// The JSON-answering counterpart of this zone. Sign-in pages have no
    /// API meaning and map to `ApiPublic`.
    pub fn api_variant(&self) -> Zone {
        match self {
            Zone::Public | Zone::AuthPage | Zone::ApiPublic => Zone::ApiPublic,
            Zone::Protected | Zone::ApiProtected => Zone::ApiProtected,
            Zone::Admin | Zone::ApiAdmin => Zone::ApiAdmin,
            Zone::Moderator | Zone::ApiModerator => Zone::ApiModerator,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Public => "public",
            Zone::AuthPage => "auth_page",
            Zone::Protected => "protected",
            Zone::Admin => "admin",
            Zone::Moderator => "moderator",
            Zone::ApiPublic => "api_public",
            Zone::ApiProtected => "api_protected",
            Zone::ApiAdmin => "api_admin",
            Zone::ApiModerator => "api_moderator",
        }
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
