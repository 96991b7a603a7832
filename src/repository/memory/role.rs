use crate::domain::{Assignment, NewRole, Role, RoleScope};
use crate::error::{ApiError, Result};
use crate::repository::memory::paginate;
use crate::repository::role::RoleChanges;
use crate::repository::{ListQuery, Page, RoleRepository, SortOrder};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    next_id: i64,
    roles: HashMap<i64, Role>,
    assignments: Vec<Assignment>,
}

impl Inner {
    fn live(&self) -> impl Iterator<Item = &Role> {
        self.roles.values().filter(|r| r.deleted_at.is_none())
    }

    fn name_taken(&self, name: &str, scope: RoleScope, except: Option<i64>) -> bool {
        self.live()
            .any(|r| r.name == name && r.scope == scope && Some(r.id) != except)
    }

    fn get_live_mut(&mut self, id: i64) -> Result<&mut Role> {
        self.roles
            .get_mut(&id)
            .filter(|r| r.deleted_at.is_none())
            .ok_or_else(ApiError::role_not_found)
    }
}

/// Reject empty or duplicated permission entries, preserving order.
fn normalized_permissions(permissions: Vec<String>) -> Result<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(permissions.len());
    for permission in permissions {
        if permission.is_empty() {
            return Err(ApiError::validation(
                "Empty permission entry",
                Some(serde_json::json!({"field": "permissions"})),
            ));
        }
        if seen.insert(permission.clone()) {
            out.push(permission);
        }
    }
    Ok(out)
}

#[derive(Default)]
pub struct MemoryRoleRepository {
    inner: RwLock<Inner>,
}

impl MemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoleRepository for MemoryRoleRepository {
    async fn create(&self, new: NewRole) -> Result<Role> {
        let permissions = normalized_permissions(new.permissions)?;
        let mut inner = self.inner.write();

        if inner.name_taken(&new.name, new.scope, None) {
            return Err(ApiError::conflict("Role name already in use for this scope"));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let role = Role {
            id: inner.next_id,
            name: new.name,
            description: new.description,
            permissions,
            scope: new.scope,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Role>> {
        let inner = self.inner.read();
        let result = inner.live().find(|r| r.id == id).cloned();
        Ok(result)
    }

    async fn find_by_name(&self, name: &str, scope: RoleScope) -> Result<Option<Role>> {
        let inner = self.inner.read();
        let result = inner
            .live()
            .find(|r| r.name == name && r.scope == scope)
            .cloned();
        Ok(result)
    }

    async fn update(&self, id: i64, changes: RoleChanges) -> Result<Role> {
        let permissions = changes.permissions.map(normalized_permissions).transpose()?;
        let mut inner = self.inner.write();

        if let Some(name) = &changes.name {
            let scope = inner
                .live()
                .find(|r| r.id == id)
                .map(|r| r.scope)
                .ok_or_else(ApiError::role_not_found)?;
            if inner.name_taken(name, scope, Some(id)) {
                return Err(ApiError::conflict("Role name already in use for this scope"));
            }
        }

        let role = inner.get_live_mut(id)?;
        if let Some(name) = changes.name {
            role.name = name;
        }
        if let Some(description) = changes.description {
            role.description = description;
        }
        if let Some(permissions) = permissions {
            role.permissions = permissions;
        }
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write();
        let role = inner.get_live_mut(id)?;
        role.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<Page<Role>> {
        let inner = self.inner.read();
        let mut roles: Vec<Role> = inner.live().cloned().collect();

        let key = query.sort_by.as_deref().unwrap_or("id");
        roles.sort_by(|a, b| {
            let ord = match key {
                "name" => a.name.cmp(&b.name),
                "created_at" => a.created_at.cmp(&b.created_at),
                _ => Ordering::Equal,
            };
            let ord = match query.sort_order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            };
            ord.then(a.id.cmp(&b.id))
        });

        Ok(paginate(roles, query))
    }

    async fn assign(
        &self,
        user_id: i64,
        role_id: i64,
        organization_id: Option<i64>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        if !inner.live().any(|r| r.id == role_id) {
            return Err(ApiError::role_not_found());
        }
        let exists = inner.assignments.iter().any(|a| {
            a.user_id == user_id && a.role_id == role_id && a.organization_id == organization_id
        });
        if !exists {
            inner.assignments.push(Assignment {
                user_id,
                role_id,
                organization_id,
                created_at: Utc::now(),
            });
        }
        Ok(())
    }

    async fn revoke(
        &self,
        user_id: i64,
        role_id: i64,
        organization_id: Option<i64>,
    ) -> Result<()> {
        let mut inner = self.inner.write();
        inner.assignments.retain(|a| {
            !(a.user_id == user_id
                && a.role_id == role_id
                && a.organization_id == organization_id)
        });
        Ok(())
    }

    async fn assignments_of(&self, user_id: i64) -> Result<Vec<Assignment>> {
        let inner = self.inner.read();
        Ok(inner
            .assignments
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn assignment_count(&self, role_id: i64) -> Result<i64> {
        let inner = self.inner.read();
        Ok(inner
            .assignments
            .iter()
            .filter(|a| a.role_id == role_id)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn editor() -> NewRole {
        NewRole {
            name: "editor".to_string(),
            description: "Can edit".to_string(),
            permissions: vec!["user:read".to_string(), "user:write".to_string()],
            scope: RoleScope::Organization,
        }
    }

    #[tokio::test]
    async fn name_scope_uniqueness() {
        let repo = MemoryRoleRepository::new();
        repo.create(editor()).await.unwrap();

        let dup = repo.create(editor()).await;
        assert_eq!(dup.unwrap_err().code, crate::error::ErrorCode::Conflict);

        // Same name in a different scope is fine
        let global = NewRole {
            scope: RoleScope::Global,
            ..editor()
        };
        repo.create(global).await.unwrap();
    }

    #[tokio::test]
    async fn permission_lists_deduplicate_and_reject_empty() {
        let repo = MemoryRoleRepository::new();
        let role = repo
            .create(NewRole {
                name: "dupes".to_string(),
                description: String::new(),
                permissions: vec![
                    "user:read".to_string(),
                    "user:read".to_string(),
                    "user:write".to_string(),
                ],
                scope: RoleScope::Global,
            })
            .await
            .unwrap();
        assert_eq!(role.permissions, vec!["user:read", "user:write"]);

        let bad = repo
            .create(NewRole {
                name: "bad".to_string(),
                description: String::new(),
                permissions: vec![String::new()],
                scope: RoleScope::Global,
            })
            .await;
        assert!(bad.is_err());
    }

    #[tokio::test]
    async fn assignment_is_idempotent_per_tuple() {
        let repo = MemoryRoleRepository::new();
        let role = repo.create(editor()).await.unwrap();

        repo.assign(1, role.id, Some(10)).await.unwrap();
        repo.assign(1, role.id, Some(10)).await.unwrap();
        assert_eq!(repo.assignment_count(role.id).await.unwrap(), 1);

        // A different binding is a distinct assignment
        repo.assign(1, role.id, None).await.unwrap();
        assert_eq!(repo.assignment_count(role.id).await.unwrap(), 2);

        repo.revoke(1, role.id, Some(10)).await.unwrap();
        assert_eq!(repo.assignment_count(role.id).await.unwrap(), 1);
    }
}
