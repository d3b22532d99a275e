//! Role → permission table.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::validation::ValidationError;
use crate::identity::Identity;
use crate::rbac::Role;

/// Marker granting every permission to a role.
pub const WILDCARD: &str = "*";

/// Permissions granted to a single role.
#[derive(Debug, Clone, Default)]
pub struct PermissionSet {
    wildcard: bool,
    permissions: HashSet<String>,
}

impl PermissionSet {
    pub fn new<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let permissions: HashSet<String> = permissions.into_iter().map(Into::into).collect();
        Self {
            wildcard: permissions.contains(WILDCARD),
            permissions,
        }
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.wildcard || self.permissions.contains(permission)
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Explicit permissions, sorted for stable output.
    pub fn to_sorted_vec(&self) -> Vec<String> {
        let mut out: Vec<String> = self.permissions.iter().cloned().collect();
        out.sort();
        out
    }
}

/// Immutable mapping from every role to its permission set.
///
/// Construction fails unless every role in [`Role::ALL`] has an entry, so
/// lookups at request time cannot miss.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    roles: HashMap<Role, PermissionSet>,
}

impl PermissionTable {
    pub fn new(entries: &BTreeMap<Role, Vec<String>>) -> Result<Self, ValidationError> {
        let missing: Vec<Role> = Role::ALL
            .into_iter()
            .filter(|role| !entries.contains_key(role))
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::IncompletePermissionTable(missing));
        }

        let roles = entries
            .iter()
            .map(|(role, perms)| (*role, PermissionSet::new(perms.iter().cloned())))
            .collect();
        Ok(Self { roles })
    }

    /// Built-in table for the dashboard application.
    pub fn default_entries() -> BTreeMap<Role, Vec<String>> {
        let user = vec![
            "dashboard:read",
            "profile:read",
            "profile:write",
            "goals:read",
            "goals:write",
            "billing:read",
        ];
        let mut moderator = user.clone();
        moderator.extend(["users:read", "content:moderate", "reports:read"]);

        let to_owned = |perms: Vec<&str>| perms.into_iter().map(String::from).collect::<Vec<_>>();

        BTreeMap::from([
            (Role::Guest, to_owned(vec!["public:read"])),
            (Role::User, to_owned(user)),
            (Role::Moderator, to_owned(moderator)),
            (Role::Admin, to_owned(vec![WILDCARD])),
        ])
    }

    pub fn permissions_for(&self, role: Role) -> Option<&PermissionSet> {
        self.roles.get(&role)
    }

    pub fn role_has(&self, role: Role, permission: &str) -> bool {
        if role == Role::Admin {
            return true;
        }
        self.roles
            .get(&role)
            .map(|set| set.contains(permission))
            .unwrap_or(false)
    }

    pub fn has_permission(&self, identity: Option<&Identity>, permission: &str) -> bool {
        match identity {
            Some(identity) => self.role_has(identity.role, permission),
            None => false,
        }
    }

    pub fn has_any_permission<S: AsRef<str>>(
        &self,
        identity: Option<&Identity>,
        permissions: &[S],
    ) -> bool {
        permissions
            .iter()
            .any(|p| self.has_permission(identity, p.as_ref()))
    }

    pub fn has_all_permissions<S: AsRef<str>>(
        &self,
        identity: Option<&Identity>,
        permissions: &[S],
    ) -> bool {
        identity.is_some()
            && permissions
                .iter()
                .all(|p| self.has_permission(identity, p.as_ref()))
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        let roles = Self::default_entries()
            .into_iter()
            .map(|(role, perms)| (role, PermissionSet::new(perms)))
            .collect();
        Self { roles }
    }
}
