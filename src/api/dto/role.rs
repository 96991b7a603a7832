use crate::api::dto::ListParams;
use crate::api::envelope::RequestHeader;
use crate::domain::RoleScope;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleRequest {
    pub header: RequestHeader,
    pub token: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub description: String,
    #[validate(length(min = 1))]
    pub permissions: Vec<String>,
    pub scope: RoleScope,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GetRoleRequest {
    pub header: RequestHeader,
    pub token: String,
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    pub header: RequestHeader,
    pub token: String,
    pub id: i64,
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteRoleRequest {
    pub header: RequestHeader,
    pub token: String,
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListRolesRequest {
    pub header: RequestHeader,
    pub token: String,
    #[serde(default)]
    #[validate]
    pub page: ListParams,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignRoleRequest {
    pub header: RequestHeader,
    pub token: String,
    pub user_id: i64,
    pub role_id: i64,
    /// Bind the assignment to an organization; absent means global.
    #[serde(default)]
    pub organization_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RevokeRoleRequest {
    pub header: RequestHeader,
    pub token: String,
    pub user_id: i64,
    pub role_id: i64,
    #[serde(default)]
    pub organization_id: Option<i64>,
}
