use crate::audit::{AuditEvent, AuditEventType, SharedAuditSink};
use crate::domain::{NewRole, Role};
use crate::error::{ApiError, Result};
use crate::rbac::RbacEngine;
use crate::repository::{ListQuery, Page, Repositories, RoleChanges};
use std::sync::Arc;
use tracing::instrument;

/// Role lifecycle and assignment operations.
pub struct RoleService {
    repos: Repositories,
    rbac: Arc<RbacEngine>,
    audit: SharedAuditSink,
}

impl RoleService {
    pub fn new(repos: Repositories, rbac: Arc<RbacEngine>, audit: SharedAuditSink) -> Self {
        Self { repos, rbac, audit }
    }

    fn check_permissions_known(&self, permissions: &[String]) -> Result<()> {
        for permission in permissions {
            if !self.rbac.registry().contains(permission) {
                return Err(ApiError::permission_unknown(permission));
            }
        }
        Ok(())
    }

    #[instrument(skip_all, fields(name = %new.name))]
    pub async fn create(&self, new: NewRole) -> Result<Role> {
        self.check_permissions_known(&new.permissions)?;
        let role = self.repos.roles.create(new).await?;
        self.audit.emit(
            AuditEvent::success(AuditEventType::RoleCreated).with_metadata(serde_json::json!({
                "role_id": role.id,
                "scope": role.scope.as_str(),
            })),
        );
        Ok(role)
    }

    pub async fn get(&self, id: i64) -> Result<Role> {
        self.repos
            .roles
            .find_by_id(id)
            .await?
            .ok_or_else(ApiError::role_not_found)
    }

    /// Update a role. A permission-list change affects an unknown set of
    /// subjects, so the whole cache is dropped around the commit.
    #[instrument(skip_all, fields(role_id = id))]
    pub async fn update(&self, id: i64, changes: RoleChanges) -> Result<Role> {
        if let Some(permissions) = &changes.permissions {
            self.check_permissions_known(permissions)?;
        }

        self.rbac.invalidate_all();
        let role = self.repos.roles.update(id, changes).await?;
        self.rbac.invalidate_all();

        self.audit.emit(
            AuditEvent::success(AuditEventType::RoleUpdated)
                .with_metadata(serde_json::json!({ "role_id": id })),
        );
        Ok(role)
    }

    /// Delete a role. Fails `DependentRecordsExist` while assignments
    /// reference it.
    #[instrument(skip_all, fields(role_id = id))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.get(id).await?;
        let assigned = self.repos.roles.assignment_count(id).await?;
        if assigned > 0 {
            return Err(ApiError::dependent_records(format!(
                "Role is assigned to {} subject(s)",
                assigned
            )));
        }

        self.rbac.invalidate_all();
        self.repos.roles.soft_delete(id).await?;
        self.rbac.invalidate_all();

        self.audit.emit(
            AuditEvent::success(AuditEventType::RoleDeleted)
                .with_metadata(serde_json::json!({ "role_id": id })),
        );
        Ok(())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Page<Role>> {
        self.repos.roles.list(query).await
    }

    #[instrument(skip_all, fields(user_id, role_id))]
    pub async fn assign(&self, user_id: i64, role_id: i64, scope: Option<i64>) -> Result<()> {
        self.rbac.assign_role(user_id, role_id, scope).await?;
        self.audit.emit(
            AuditEvent::success(AuditEventType::RoleAssigned)
                .with_user(user_id)
                .with_metadata(serde_json::json!({ "role_id": role_id, "scope": scope })),
        );
        Ok(())
    }

    #[instrument(skip_all, fields(user_id, role_id))]
    pub async fn revoke(&self, user_id: i64, role_id: i64, scope: Option<i64>) -> Result<()> {
        self.rbac.revoke_role(user_id, role_id, scope).await?;
        self.audit.emit(
            AuditEvent::success(AuditEventType::RoleRevoked)
                .with_user(user_id)
                .with_metadata(serde_json::json!({ "role_id": role_id, "scope": scope })),
        );
        Ok(())
    }

    pub async fn roles_of(&self, user_id: i64, scope: Option<i64>) -> Result<Vec<Role>> {
        self.rbac.roles_of(user_id, scope).await
    }
}
