use crate::domain::{NewOrganization, Organization};
use crate::error::Result;
use crate::repository::{ListQuery, Page};
use async_trait::async_trait;

/// Partial update for organization fields.
#[derive(Debug, Clone, Default)]
pub struct OrganizationChanges {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Organization persistence plus the membership join table.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Create an organization. Fails `Conflict` when the name or slug is
    /// already taken by a non-deleted row.
    async fn create(&self, new: NewOrganization) -> Result<Organization>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>>;

    async fn update(&self, id: i64, changes: OrganizationChanges) -> Result<Organization>;

    async fn soft_delete(&self, id: i64) -> Result<()>;

    async fn list(&self, query: &ListQuery) -> Result<Page<Organization>>;

    /// Case-insensitive substring search over name and slug.
    async fn search(&self, term: &str, query: &ListQuery) -> Result<Page<Organization>>;

    /// Add a user to an organization. Idempotent.
    async fn add_member(&self, organization_id: i64, user_id: i64) -> Result<()>;

    /// Remove a user from an organization. Idempotent.
    async fn remove_member(&self, organization_id: i64, user_id: i64) -> Result<()>;

    /// Ids of the organization's members, ordered by join time.
    async fn members(&self, organization_id: i64, query: &ListQuery) -> Result<Page<i64>>;

    async fn member_count(&self, organization_id: i64) -> Result<i64>;

    /// Drop every membership of the organization (cascade delete path).
    async fn remove_all_members(&self, organization_id: i64) -> Result<()>;

    /// Ids of the organizations a user belongs to.
    async fn organizations_of(&self, user_id: i64) -> Result<Vec<i64>>;
}
