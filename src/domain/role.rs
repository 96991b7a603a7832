use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a role's permissions apply.
///
/// A `Global` role contributes its permissions everywhere, even when the
/// assignment carries an organization binding. An `Organization` role
/// contributes only within the organization its assignment is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleScope {
    Global,
    Organization,
}

impl RoleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Organization => "organization",
        }
    }
}

/// A named bundle of permissions. `(name, scope)` is unique among
/// non-deleted rows; the permission list is ordered, deduplicated, and
/// contains only registered permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub scope: RoleScope,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Role {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Parameters for creating a role.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub name: String,
    pub description: String,
    pub permissions: Vec<String>,
    pub scope: RoleScope,
}

/// User membership in an organization. `(user_id, organization_id)` unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub user_id: i64,
    pub organization_id: i64,
    pub created_at: DateTime<Utc>,
}

/// A role assigned to a user, optionally bound to an organization.
/// `(user_id, role_id, organization_id)` unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub user_id: i64,
    pub role_id: i64,
    pub organization_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
