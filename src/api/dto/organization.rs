use crate::api::dto::ListParams;
use crate::api::envelope::RequestHeader;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    pub header: RequestHeader,
    pub token: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Derived from the name when absent.
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub description: String,
}

/// Lookup by id or slug.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GetOrganizationRequest {
    pub header: RequestHeader,
    pub token: String,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateOrganizationRequest {
    pub header: RequestHeader,
    pub token: String,
    pub id: i64,
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 255))]
    pub slug: Option<String>,
    #[serde(default)]
    #[validate(length(max = 2048))]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeleteOrganizationRequest {
    pub header: RequestHeader,
    pub token: String,
    pub id: i64,
    /// Remove remaining memberships instead of failing on them.
    #[serde(default)]
    pub cascade: bool,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListOrganizationsRequest {
    pub header: RequestHeader,
    pub token: String,
    #[serde(default)]
    #[validate]
    pub page: ListParams,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchOrganizationsRequest {
    pub header: RequestHeader,
    pub token: String,
    #[validate(length(min = 1, max = 255))]
    pub term: String,
    #[serde(default)]
    #[validate]
    pub page: ListParams,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddMemberRequest {
    pub header: RequestHeader,
    pub token: String,
    pub organization_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RemoveMemberRequest {
    pub header: RequestHeader,
    pub token: String,
    pub organization_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct MembersRequest {
    pub header: RequestHeader,
    pub token: String,
    pub organization_id: i64,
    #[serde(default)]
    #[validate]
    pub page: ListParams,
}
