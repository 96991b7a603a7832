use super::{client_info, page_payload, parse, Services};
use crate::api::dto::{
    AssignRoleRequest, CreateRoleRequest, DeleteRoleRequest, GetRoleRequest, ListRolesRequest,
    RevokeRoleRequest, UpdateRoleRequest,
};
use crate::domain::{permissions, NewRole};
use crate::error::Result;
use crate::repository::RoleChanges;
use serde_json::{json, Value};

pub async fn create(services: &Services, payload: Value) -> Result<Value> {
    let request: CreateRoleRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ROLE_CREATE,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let role = services
        .roles
        .create(NewRole {
            name: request.name,
            description: request.description,
            permissions: request.permissions,
            scope: request.scope,
        })
        .await?;
    Ok(json!({ "role": role }))
}

pub async fn get(services: &Services, payload: Value) -> Result<Value> {
    let request: GetRoleRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ROLE_READ,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let role = services.roles.get(request.id).await?;
    Ok(json!({ "role": role }))
}

pub async fn update(services: &Services, payload: Value) -> Result<Value> {
    let request: UpdateRoleRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ROLE_UPDATE,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let role = services
        .roles
        .update(
            request.id,
            RoleChanges {
                name: request.name,
                description: request.description,
                permissions: request.permissions,
            },
        )
        .await?;
    Ok(json!({ "role": role }))
}

pub async fn delete(services: &Services, payload: Value) -> Result<Value> {
    let request: DeleteRoleRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ROLE_DELETE,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    services.roles.delete(request.id).await?;
    Ok(json!({}))
}

pub async fn list(services: &Services, payload: Value) -> Result<Value> {
    let request: ListRolesRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ROLE_LIST,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let page = services.roles.list(&request.page.into()).await?;
    page_payload("roles", page)
}

pub async fn assign(services: &Services, payload: Value) -> Result<Value> {
    let request: AssignRoleRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ROLE_ASSIGN,
            request.organization_id,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    services
        .roles
        .assign(request.user_id, request.role_id, request.organization_id)
        .await?;
    Ok(json!({}))
}

pub async fn revoke(services: &Services, payload: Value) -> Result<Value> {
    let request: RevokeRoleRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ROLE_REVOKE,
            request.organization_id,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    services
        .roles
        .revoke(request.user_id, request.role_id, request.organization_id)
        .await?;
    Ok(json!({}))
}
