use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashSet;

/// Stable permission identifiers, grouped by category.
///
/// These strings are the wire contract; renaming one is a breaking change.
pub mod permissions {
    // User
    pub const USER_READ: &str = "user:read";
    pub const USER_WRITE: &str = "user:write";
    pub const USER_DELETE: &str = "user:delete";
    pub const USER_LIST: &str = "user:list";
    pub const USER_SEARCH: &str = "user:search";
    pub const USER_ADMIN: &str = "user:admin";
    pub const USER_IMPERSONATE: &str = "user:impersonate";
    pub const USER_EXPORT: &str = "user:export";

    // Organization
    pub const ORG_READ: &str = "organization:read";
    pub const ORG_WRITE: &str = "organization:write";
    pub const ORG_DELETE: &str = "organization:delete";
    pub const ORG_LIST: &str = "organization:list";
    pub const ORG_ADMIN: &str = "organization:admin";
    pub const ORG_MEMBER_ADD: &str = "organization:member:add";
    pub const ORG_MEMBER_REMOVE: &str = "organization:member:remove";
    pub const ORG_MEMBER_LIST: &str = "organization:member:list";
    pub const ORG_SETTINGS: &str = "organization:settings";
    pub const ORG_AUDIT: &str = "organization:audit";

    // Role
    pub const ROLE_READ: &str = "role:read";
    pub const ROLE_WRITE: &str = "role:write";
    pub const ROLE_DELETE: &str = "role:delete";
    pub const ROLE_LIST: &str = "role:list";
    pub const ROLE_ASSIGN: &str = "role:assign";
    pub const ROLE_REVOKE: &str = "role:revoke";
    pub const ROLE_ADMIN: &str = "role:admin";
    pub const ROLE_CREATE: &str = "role:create";
    pub const ROLE_UPDATE: &str = "role:update";
    pub const ROLE_AUDIT: &str = "role:audit";

    // Auth
    pub const AUTH_LOGIN: &str = "auth:login";
    pub const AUTH_LOGOUT: &str = "auth:logout";
    pub const AUTH_PASSWORD_CHANGE: &str = "auth:password:change";
    pub const AUTH_PASSWORD_RESET: &str = "auth:password:reset";
    pub const AUTH_TOKEN_REFRESH: &str = "auth:token:refresh";
    pub const AUTH_SESSION_LIST: &str = "auth:session:list";
    pub const AUTH_SESSION_REVOKE: &str = "auth:session:revoke";

    // System
    pub const SYSTEM_ADMIN: &str = "system:admin";
    pub const SYSTEM_READ: &str = "system:read";
    pub const SYSTEM_WRITE: &str = "system:write";
    pub const SYSTEM_MONITOR: &str = "system:monitor";
    pub const SYSTEM_AUDIT: &str = "system:audit";
    pub const SYSTEM_CONFIG: &str = "system:config";
    pub const SYSTEM_BACKUP: &str = "system:backup";
    pub const SYSTEM_MAINTENANCE: &str = "system:maintenance";

    /// Every built-in permission, in catalogue order.
    pub const ALL: &[&str] = &[
        USER_READ,
        USER_WRITE,
        USER_DELETE,
        USER_LIST,
        USER_SEARCH,
        USER_ADMIN,
        USER_IMPERSONATE,
        USER_EXPORT,
        ORG_READ,
        ORG_WRITE,
        ORG_DELETE,
        ORG_LIST,
        ORG_ADMIN,
        ORG_MEMBER_ADD,
        ORG_MEMBER_REMOVE,
        ORG_MEMBER_LIST,
        ORG_SETTINGS,
        ORG_AUDIT,
        ROLE_READ,
        ROLE_WRITE,
        ROLE_DELETE,
        ROLE_LIST,
        ROLE_ASSIGN,
        ROLE_REVOKE,
        ROLE_ADMIN,
        ROLE_CREATE,
        ROLE_UPDATE,
        ROLE_AUDIT,
        AUTH_LOGIN,
        AUTH_LOGOUT,
        AUTH_PASSWORD_CHANGE,
        AUTH_PASSWORD_RESET,
        AUTH_TOKEN_REFRESH,
        AUTH_SESSION_LIST,
        AUTH_SESSION_REVOKE,
        SYSTEM_ADMIN,
        SYSTEM_READ,
        SYSTEM_WRITE,
        SYSTEM_MONITOR,
        SYSTEM_AUDIT,
        SYSTEM_CONFIG,
        SYSTEM_BACKUP,
        SYSTEM_MAINTENANCE,
    ];
}

static EXTERNAL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*(:[a-z0-9_-]+)+$").unwrap());

/// The set of permission strings the RBAC engine recognizes.
///
/// The built-in catalogue is always present. Services that proxy through
/// the identity core register their own namespaced permissions at startup
/// (for example `state:data:write`); registration validates the shape.
pub struct PermissionRegistry {
    builtin: HashSet<&'static str>,
    external: RwLock<HashSet<String>>,
}

impl PermissionRegistry {
    pub fn new() -> Self {
        Self {
            builtin: permissions::ALL.iter().copied().collect(),
            external: RwLock::new(HashSet::new()),
        }
    }

    pub fn contains(&self, permission: &str) -> bool {
        self.builtin.contains(permission) || self.external.read().contains(permission)
    }

    /// Register an external service permission. Returns false when the
    /// string does not look like a namespaced permission.
    pub fn register(&self, permission: &str) -> bool {
        if self.builtin.contains(permission) {
            return true;
        }
        if !EXTERNAL_SHAPE.is_match(permission) {
            return false;
        }
        self.external.write().insert(permission.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.builtin.len() + self.external.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalogue_is_registered() {
        let registry = PermissionRegistry::new();
        assert!(registry.contains("user:read"));
        assert!(registry.contains("organization:member:add"));
        assert!(registry.contains("auth:password:reset"));
        assert!(registry.contains("system:maintenance"));
        assert!(!registry.contains("user:frobnicate"));
    }

    #[test]
    fn external_permissions_register_with_shape_check() {
        let registry = PermissionRegistry::new();
        assert!(registry.register("state:data:write"));
        assert!(registry.contains("state:data:write"));

        assert!(!registry.register("NotAPermission"));
        assert!(!registry.register("nocolon"));
        assert!(!registry.contains("nocolon"));
    }

    #[test]
    fn catalogue_has_no_duplicates() {
        let unique: HashSet<_> = permissions::ALL.iter().collect();
        assert_eq!(unique.len(), permissions::ALL.len());
    }
}
