use crate::audit::{AuditEvent, AuditEventType, SharedAuditSink};
use crate::domain::{NewOrganization, Organization, User};
use crate::error::{ApiError, Result};
use crate::rbac::RbacEngine;
use crate::repository::{ListQuery, OrganizationChanges, Page, Repositories};
use std::sync::Arc;
use tracing::instrument;

/// Organization lifecycle and membership operations.
pub struct OrganizationService {
    repos: Repositories,
    rbac: Arc<RbacEngine>,
    audit: SharedAuditSink,
}

impl OrganizationService {
    pub fn new(repos: Repositories, rbac: Arc<RbacEngine>, audit: SharedAuditSink) -> Self {
        Self { repos, rbac, audit }
    }

    #[instrument(skip_all, fields(name = %new.name))]
    pub async fn create(&self, new: NewOrganization) -> Result<Organization> {
        let organization = self.repos.organizations.create(new).await?;
        self.audit.emit(
            AuditEvent::success(AuditEventType::OrganizationCreated)
                .with_metadata(serde_json::json!({
                    "organization_id": organization.id,
                    "slug": organization.slug,
                })),
        );
        Ok(organization)
    }

    pub async fn get(&self, id: i64) -> Result<Organization> {
        self.repos
            .organizations
            .find_by_id(id)
            .await?
            .ok_or_else(ApiError::organization_not_found)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<Organization> {
        self.repos
            .organizations
            .find_by_slug(slug)
            .await?
            .ok_or_else(ApiError::organization_not_found)
    }

    #[instrument(skip_all, fields(organization_id = id))]
    pub async fn update(&self, id: i64, changes: OrganizationChanges) -> Result<Organization> {
        let organization = self.repos.organizations.update(id, changes).await?;
        self.audit.emit(
            AuditEvent::success(AuditEventType::OrganizationUpdated)
                .with_metadata(serde_json::json!({ "organization_id": id })),
        );
        Ok(organization)
    }

    /// Soft delete. Fails `DependentRecordsExist` while active members
    /// remain, unless `cascade` removes the memberships first.
    #[instrument(skip_all, fields(organization_id = id, cascade))]
    pub async fn delete(&self, id: i64, cascade: bool) -> Result<()> {
        self.get(id).await?;
        let members = self.repos.organizations.member_count(id).await?;
        if members > 0 {
            if !cascade {
                return Err(ApiError::dependent_records(format!(
                    "Organization has {} member(s); pass cascade to remove them",
                    members
                )));
            }
            // Cached permission sets of departing members go stale
            let mut query = ListQuery {
                limit: crate::repository::MAX_PAGE_SIZE,
                ..Default::default()
            };
            loop {
                let page = self.repos.organizations.members(id, &query).await?;
                let fetched = page.items.len() as i64;
                for user_id in page.items {
                    self.rbac.invalidate_user(user_id);
                }
                if fetched < query.limit {
                    break;
                }
                query.offset += query.limit;
            }
            self.repos.organizations.remove_all_members(id).await?;
        }

        self.repos.organizations.soft_delete(id).await?;
        self.audit.emit(
            AuditEvent::success(AuditEventType::OrganizationDeleted)
                .with_metadata(serde_json::json!({ "organization_id": id, "cascade": cascade })),
        );
        Ok(())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Organization>> {
        self.repos.organizations.list(query).await
    }

    pub async fn search(&self, term: &str, query: &ListQuery) -> Result<Page<Organization>> {
        self.repos.organizations.search(term, query).await
    }

    /// Add a user to the organization. Idempotent.
    #[instrument(skip_all, fields(organization_id, user_id))]
    pub async fn add_member(&self, organization_id: i64, user_id: i64) -> Result<()> {
        self.repos
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(ApiError::user_not_found)?;

        // Membership feeds scoped permission evaluation; invalidate around
        // the commit so no stale set survives it
        self.rbac.invalidate_user(user_id);
        self.repos
            .organizations
            .add_member(organization_id, user_id)
            .await?;
        self.rbac.invalidate_user(user_id);

        self.audit.emit(
            AuditEvent::success(AuditEventType::MemberAdded)
                .with_user(user_id)
                .with_metadata(serde_json::json!({ "organization_id": organization_id })),
        );
        Ok(())
    }

    /// Remove a user from the organization. Idempotent.
    #[instrument(skip_all, fields(organization_id, user_id))]
    pub async fn remove_member(&self, organization_id: i64, user_id: i64) -> Result<()> {
        self.rbac.invalidate_user(user_id);
        self.repos
            .organizations
            .remove_member(organization_id, user_id)
            .await?;
        self.rbac.invalidate_user(user_id);

        self.audit.emit(
            AuditEvent::success(AuditEventType::MemberRemoved)
                .with_user(user_id)
                .with_metadata(serde_json::json!({ "organization_id": organization_id })),
        );
        Ok(())
    }

    /// The organization's members as user records.
    pub async fn members(&self, organization_id: i64, query: &ListQuery) -> Result<Page<User>> {
        let page = self.repos.organizations.members(organization_id, query).await?;
        let mut users = Vec::with_capacity(page.items.len());
        for user_id in &page.items {
            if let Some(user) = self.repos.users.find_by_id(*user_id).await? {
                users.push(user);
            }
        }
        Ok(Page {
            items: users,
            offset: page.offset,
            limit: page.limit,
            total: page.total,
        })
    }
}
