use crate::domain::{PermissionRegistry, Role, RoleScope};
use crate::error::{ApiError, Result};
use crate::rbac::PermissionCache;
use crate::repository::{RoleRepository, UserRepository};
use metrics::increment_counter;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

/// Permission evaluation over a subject's role assignments.
///
/// A subject's effective permission set for scope S is the union of the
/// permissions of every global role assigned to it plus every role bound
/// to organization S. A global role assigned with an organization binding
/// acts globally anyway. Inactive users have an empty set regardless of
/// their assignments.
pub struct RbacEngine {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    registry: Arc<PermissionRegistry>,
    cache: PermissionCache,
}

impl RbacEngine {
    pub fn new(
        users: Arc<dyn UserRepository>,
        roles: Arc<dyn RoleRepository>,
        registry: Arc<PermissionRegistry>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            users,
            roles,
            registry,
            cache: PermissionCache::new(cache_ttl),
        }
    }

    pub fn registry(&self) -> &Arc<PermissionRegistry> {
        &self.registry
    }

    /// The effective permission set of a user for the given scope.
    pub async fn effective_permissions(
        &self,
        user_id: i64,
        scope: Option<i64>,
    ) -> Result<HashSet<String>> {
        if let Some(cached) = self.cache.get(user_id, scope) {
            return Ok(cached);
        }

        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        let permissions = if !user.is_active {
            HashSet::new()
        } else {
            let mut permissions = HashSet::new();
            for role in self.contributing_roles(user_id, scope).await? {
                permissions.extend(role.permissions.iter().cloned());
            }
            permissions
        };

        self.cache.insert(user_id, scope, permissions.clone());
        Ok(permissions)
    }

    /// Roles contributing to the effective set for a scope: global roles
    /// under any binding, plus organization roles bound to the scope.
    async fn contributing_roles(&self, user_id: i64, scope: Option<i64>) -> Result<Vec<Role>> {
        let assignments = self.roles.assignments_of(user_id).await?;
        let mut seen = HashSet::new();
        let mut roles = Vec::new();
        for assignment in assignments {
            if !seen.insert((assignment.role_id, assignment.organization_id)) {
                continue;
            }
            // Deleted roles contribute nothing
            let role = match self.roles.find_by_id(assignment.role_id).await? {
                Some(role) => role,
                None => continue,
            };
            let contributes = match role.scope {
                RoleScope::Global => true,
                RoleScope::Organization => {
                    scope.is_some() && assignment.organization_id == scope
                }
            };
            if contributes {
                roles.push(role);
            }
        }
        Ok(roles)
    }

    pub async fn has_permission(
        &self,
        user_id: i64,
        permission: &str,
        scope: Option<i64>,
    ) -> Result<bool> {
        if !self.registry.contains(permission) {
            return Err(ApiError::permission_unknown(permission));
        }
        let granted = self
            .effective_permissions(user_id, scope)
            .await?
            .contains(permission);
        let result = if granted { "granted" } else { "denied" };
        increment_counter!("permission_checks_total", "result" => result);
        Ok(granted)
    }

    pub async fn has_any(
        &self,
        user_id: i64,
        permissions: &[&str],
        scope: Option<i64>,
    ) -> Result<bool> {
        for permission in permissions {
            if !self.registry.contains(permission) {
                return Err(ApiError::permission_unknown(permission));
            }
        }
        let effective = self.effective_permissions(user_id, scope).await?;
        Ok(permissions.iter().any(|p| effective.contains(*p)))
    }

    pub async fn has_all(
        &self,
        user_id: i64,
        permissions: &[&str],
        scope: Option<i64>,
    ) -> Result<bool> {
        for permission in permissions {
            if !self.registry.contains(permission) {
                return Err(ApiError::permission_unknown(permission));
            }
        }
        let effective = self.effective_permissions(user_id, scope).await?;
        Ok(permissions.iter().all(|p| effective.contains(*p)))
    }

    /// Assign a role to a user, optionally bound to an organization.
    /// Idempotent per `(user, role, organization)` tuple.
    pub async fn assign_role(
        &self,
        user_id: i64,
        role_id: i64,
        scope: Option<i64>,
    ) -> Result<()> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(ApiError::user_not_found)?;
        self.roles
            .find_by_id(role_id)
            .await?
            .ok_or_else(ApiError::role_not_found)?;

        // Invalidate before the mutation becomes visible, and again after,
        // so no reader caches a pre-mutation set across the commit.
        self.cache.invalidate_user(user_id);
        let result = self.roles.assign(user_id, role_id, scope).await;
        self.cache.invalidate_user(user_id);
        result
    }

    pub async fn revoke_role(
        &self,
        user_id: i64,
        role_id: i64,
        scope: Option<i64>,
    ) -> Result<()> {
        self.cache.invalidate_user(user_id);
        let result = self.roles.revoke(user_id, role_id, scope).await;
        self.cache.invalidate_user(user_id);
        result
    }

    /// The roles contributing to a user's effective set for a scope.
    pub async fn roles_of(&self, user_id: i64, scope: Option<i64>) -> Result<Vec<Role>> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or_else(ApiError::user_not_found)?;
        self.contributing_roles(user_id, scope).await
    }

    /// Names of every role assigned to a user across all scopes, for
    /// embedding into token claims.
    pub async fn role_names_of(&self, user_id: i64) -> Result<Vec<String>> {
        let assignments = self.roles.assignments_of(user_id).await?;
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        for assignment in assignments {
            if !seen.insert(assignment.role_id) {
                continue;
            }
            if let Some(role) = self.roles.find_by_id(assignment.role_id).await? {
                names.push(role.name);
            }
        }
        Ok(names)
    }

    /// Union of permissions from every role of the user, across all
    /// bindings, for embedding into token claims.
    pub async fn all_permissions_of(&self, user_id: i64) -> Result<HashSet<String>> {
        let assignments = self.roles.assignments_of(user_id).await?;
        let mut permissions = HashSet::new();
        let mut seen = HashSet::new();
        for assignment in assignments {
            if !seen.insert(assignment.role_id) {
                continue;
            }
            if let Some(role) = self.roles.find_by_id(assignment.role_id).await? {
                permissions.extend(role.permissions);
            }
        }
        Ok(permissions)
    }

    /// Drop the cached permission sets of a user. Membership and role
    /// mutations outside this engine call this before and after they
    /// commit.
    pub fn invalidate_user(&self, user_id: i64) {
        self.cache.invalidate_user(user_id);
    }

    /// Drop every cached set. Role-definition mutations affect an unknown
    /// set of users, so they clear the whole cache.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NewRole, NewUser, PermissionRegistry};
    use crate::repository::memory::{MemoryRoleRepository, MemoryUserRepository};
    use crate::repository::UserChanges;
    use pretty_assertions::assert_eq;

    async fn setup() -> (RbacEngine, i64, Arc<MemoryRoleRepository>) {
        let users = Arc::new(MemoryUserRepository::new());
        let roles = Arc::new(MemoryRoleRepository::new());
        let registry = Arc::new(PermissionRegistry::new());
        registry.register("state:data:write");

        let user = users
            .create(NewUser {
                email: "u@example.com".to_string(),
                username: "u".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                first_name: "U".to_string(),
                last_name: "Ser".to_string(),
                email_verified: false,
            })
            .await
            .unwrap();

        let engine = RbacEngine::new(
            users,
            roles.clone(),
            registry,
            Duration::from_secs(300),
        );
        (engine, user.id, roles)
    }

    fn editor(scope: RoleScope) -> NewRole {
        NewRole {
            name: "editor".to_string(),
            description: String::new(),
            permissions: vec!["state:data:write".to_string()],
            scope,
        }
    }

    #[tokio::test]
    async fn org_bound_roles_apply_only_in_their_scope() {
        let (engine, user, roles) = setup().await;
        let role = roles.create(editor(RoleScope::Organization)).await.unwrap();
        engine.assign_role(user, role.id, Some(1)).await.unwrap();

        assert!(engine.has_permission(user, "state:data:write", Some(1)).await.unwrap());
        assert!(!engine.has_permission(user, "state:data:write", Some(2)).await.unwrap());
        assert!(!engine.has_permission(user, "state:data:write", None).await.unwrap());
    }

    #[tokio::test]
    async fn global_roles_ignore_their_binding() {
        let (engine, user, roles) = setup().await;
        let role = roles.create(editor(RoleScope::Global)).await.unwrap();
        // Assigned with an organization binding, but the role is global
        engine.assign_role(user, role.id, Some(1)).await.unwrap();

        assert!(engine.has_permission(user, "state:data:write", None).await.unwrap());
        assert!(engine.has_permission(user, "state:data:write", Some(2)).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_permissions_are_rejected() {
        let (engine, user, _) = setup().await;
        let err = engine
            .has_permission(user, "no:such:permission", None)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::PermissionUnknown);
    }

    #[tokio::test]
    async fn revocation_invalidates_the_cache_immediately() {
        let (engine, user, roles) = setup().await;
        let role = roles.create(editor(RoleScope::Global)).await.unwrap();
        engine.assign_role(user, role.id, None).await.unwrap();
        assert!(engine.has_permission(user, "state:data:write", None).await.unwrap());

        engine.revoke_role(user, role.id, None).await.unwrap();
        assert!(!engine.has_permission(user, "state:data:write", None).await.unwrap());
    }

    #[tokio::test]
    async fn inactive_users_have_no_permissions() {
        let (engine, user, roles) = setup().await;
        let role = roles.create(editor(RoleScope::Global)).await.unwrap();
        engine.assign_role(user, role.id, None).await.unwrap();

        engine
            .users
            .update(
                user,
                UserChanges {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        engine.invalidate_user(user);

        assert!(!engine.has_permission(user, "state:data:write", None).await.unwrap());
        assert!(engine.effective_permissions(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleted_roles_stop_contributing() {
        let (engine, user, roles) = setup().await;
        let role = roles.create(editor(RoleScope::Global)).await.unwrap();
        engine.assign_role(user, role.id, None).await.unwrap();
        assert!(engine.has_permission(user, "state:data:write", None).await.unwrap());

        roles.soft_delete(role.id).await.unwrap();
        engine.invalidate_all();
        assert!(!engine.has_permission(user, "state:data:write", None).await.unwrap());
    }

    #[tokio::test]
    async fn has_any_and_has_all() {
        let (engine, user, roles) = setup().await;
        let role = roles
            .create(NewRole {
                name: "viewer".to_string(),
                description: String::new(),
                permissions: vec!["user:read".to_string(), "user:list".to_string()],
                scope: RoleScope::Global,
            })
            .await
            .unwrap();
        engine.assign_role(user, role.id, None).await.unwrap();

        assert!(engine.has_any(user, &["user:read", "user:delete"], None).await.unwrap());
        assert!(!engine.has_all(user, &["user:read", "user:delete"], None).await.unwrap());
        assert!(engine.has_all(user, &["user:read", "user:list"], None).await.unwrap());
    }
}
