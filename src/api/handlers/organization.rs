use super::{client_info, page_payload, parse, Services};
use crate::api::dto::{
    AddMemberRequest, CreateOrganizationRequest, DeleteOrganizationRequest,
    GetOrganizationRequest, ListOrganizationsRequest, MembersRequest, PublicUser,
    RemoveMemberRequest, SearchOrganizationsRequest, UpdateOrganizationRequest,
};
use crate::domain::{permissions, NewOrganization};
use crate::error::{ApiError, Result};
use crate::repository::OrganizationChanges;
use serde_json::{json, Value};

pub async fn create(services: &Services, payload: Value) -> Result<Value> {
    let request: CreateOrganizationRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ORG_WRITE,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let organization = services
        .organizations
        .create(NewOrganization {
            name: request.name,
            slug: request.slug,
            description: request.description,
        })
        .await?;
    Ok(json!({ "organization": organization }))
}

pub async fn get(services: &Services, payload: Value) -> Result<Value> {
    let request: GetOrganizationRequest = parse(payload)?;
    let client = client_info(&request.header);

    let organization = match (request.id, &request.slug) {
        (Some(id), _) => {
            services
                .gate
                .authorize(
                    &request.token,
                    permissions::ORG_READ,
                    Some(id),
                    &request.header.request_id,
                    &client.client_id,
                )
                .await?;
            services.organizations.get(id).await?
        }
        (None, Some(slug)) => {
            let organization = services.organizations.get_by_slug(slug).await?;
            services
                .gate
                .authorize(
                    &request.token,
                    permissions::ORG_READ,
                    Some(organization.id),
                    &request.header.request_id,
                    &client.client_id,
                )
                .await?;
            organization
        }
        (None, None) => {
            return Err(ApiError::validation("One of id or slug is required", None))
        }
    };
    Ok(json!({ "organization": organization }))
}

pub async fn update(services: &Services, payload: Value) -> Result<Value> {
    let request: UpdateOrganizationRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ORG_WRITE,
            Some(request.id),
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let organization = services
        .organizations
        .update(
            request.id,
            OrganizationChanges {
                name: request.name,
                slug: request.slug,
                description: request.description,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(json!({ "organization": organization }))
}

pub async fn delete(services: &Services, payload: Value) -> Result<Value> {
    let request: DeleteOrganizationRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ORG_DELETE,
            Some(request.id),
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    services
        .organizations
        .delete(request.id, request.cascade)
        .await?;
    Ok(json!({}))
}

pub async fn list(services: &Services, payload: Value) -> Result<Value> {
    let request: ListOrganizationsRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ORG_LIST,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let page = services.organizations.list(&request.page.into()).await?;
    page_payload("organizations", page)
}

pub async fn search(services: &Services, payload: Value) -> Result<Value> {
    let request: SearchOrganizationsRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ORG_LIST,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let page = services
        .organizations
        .search(&request.term, &request.page.into())
        .await?;
    page_payload("organizations", page)
}

pub async fn add_member(services: &Services, payload: Value) -> Result<Value> {
    let request: AddMemberRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ORG_MEMBER_ADD,
            Some(request.organization_id),
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    services
        .organizations
        .add_member(request.organization_id, request.user_id)
        .await?;
    Ok(json!({}))
}

pub async fn remove_member(services: &Services, payload: Value) -> Result<Value> {
    let request: RemoveMemberRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ORG_MEMBER_REMOVE,
            Some(request.organization_id),
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    services
        .organizations
        .remove_member(request.organization_id, request.user_id)
        .await?;
    Ok(json!({}))
}

pub async fn members(services: &Services, payload: Value) -> Result<Value> {
    let request: MembersRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::ORG_MEMBER_LIST,
            Some(request.organization_id),
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let page = services
        .organizations
        .members(request.organization_id, &request.page.into())
        .await?;
    page_payload("members", page.map(PublicUser::from))
}
