use crate::domain::{Assignment, NewRole, Role, RoleScope};
use crate::error::Result;
use crate::repository::{ListQuery, Page};
use async_trait::async_trait;

/// Partial update for role fields.
#[derive(Debug, Clone, Default)]
pub struct RoleChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Role persistence plus the assignment join table.
///
/// Assignments are keyed `(user_id, role_id, organization_id)` so each side
/// owns only the join table's keys; lookups traverse one direction.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Create a role. Fails `Conflict` when `(name, scope)` is already
    /// taken by a non-deleted row.
    async fn create(&self, new: NewRole) -> Result<Role>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Role>>;

    async fn find_by_name(&self, name: &str, scope: RoleScope) -> Result<Option<Role>>;

    async fn update(&self, id: i64, changes: RoleChanges) -> Result<Role>;

    async fn soft_delete(&self, id: i64) -> Result<()>;

    async fn list(&self, query: &ListQuery) -> Result<Page<Role>>;

    /// Assign a role to a user, optionally bound to an organization.
    /// Idempotent: re-assigning the same tuple leaves one assignment.
    async fn assign(&self, user_id: i64, role_id: i64, organization_id: Option<i64>)
        -> Result<()>;

    /// Remove an assignment. Idempotent.
    async fn revoke(&self, user_id: i64, role_id: i64, organization_id: Option<i64>)
        -> Result<()>;

    /// Every assignment of a user, across all scopes.
    async fn assignments_of(&self, user_id: i64) -> Result<Vec<Assignment>>;

    /// Number of live assignments referencing a role.
    async fn assignment_count(&self, role_id: i64) -> Result<i64>;
}
