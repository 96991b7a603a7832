use super::{client_info, page_payload, parse, Services};
use crate::api::dto::{
    CreateUserRequest, DeleteUserRequest, GetUserRequest, ListUsersRequest, PublicUser,
    UpdateUserRequest,
};
use crate::domain::permissions;
use crate::error::{ApiError, Result};
use crate::repository::UserChanges;
use crate::services::RegisterUserInput;
use serde_json::{json, Value};

pub async fn create(services: &Services, payload: Value) -> Result<Value> {
    let request: CreateUserRequest = parse(payload)?;
    let client = client_info(&request.header);

    // Either an authorized caller creates the account, or the instance
    // allows self-registration
    match &request.token {
        Some(token) => {
            services
                .gate
                .authorize(
                    token,
                    permissions::USER_WRITE,
                    None,
                    &request.header.request_id,
                    &client.client_id,
                )
                .await?;
        }
        None if services.users.allow_self_registration() => {}
        None => {
            return Err(ApiError::authentication_failed(
                "Self-registration is disabled",
            ))
        }
    }

    let user = services
        .users
        .create(RegisterUserInput {
            email: request.email,
            username: request.username,
            password: request.password,
            first_name: request.first_name,
            last_name: request.last_name,
        })
        .await?;

    let mut payload = json!({ "user": PublicUser::from(user.clone()) });
    if services.auth.require_email_verification() {
        let verification = services.auth.initiate_email_verification(&user).await?;
        payload["verification_token"] = verification.token.into();
    }
    Ok(payload)
}

pub async fn get(services: &Services, payload: Value) -> Result<Value> {
    let request: GetUserRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::USER_READ,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let user = if let Some(id) = request.id {
        services.users.get_by_id(id).await?
    } else if let Some(email) = &request.email {
        services.users.get_by_email(email).await?
    } else if let Some(username) = &request.username {
        services.users.get_by_username(username).await?
    } else {
        return Err(ApiError::validation(
            "One of id, email, or username is required",
            None,
        ));
    };

    Ok(json!({ "user": PublicUser::from(user) }))
}

pub async fn update(services: &Services, payload: Value) -> Result<Value> {
    let request: UpdateUserRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::USER_WRITE,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let user = services
        .users
        .update(
            request.id,
            UserChanges {
                email: request.email,
                username: request.username,
                first_name: request.first_name,
                last_name: request.last_name,
                is_active: request.is_active,
            },
        )
        .await?;
    Ok(json!({ "user": PublicUser::from(user) }))
}

pub async fn delete(services: &Services, payload: Value) -> Result<Value> {
    let request: DeleteUserRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::USER_DELETE,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    services.users.delete(request.id).await?;
    Ok(json!({}))
}

pub async fn list(services: &Services, payload: Value) -> Result<Value> {
    let request: ListUsersRequest = parse(payload)?;
    let client = client_info(&request.header);
    services
        .gate
        .authorize(
            &request.token,
            permissions::USER_LIST,
            None,
            &request.header.request_id,
            &client.client_id,
        )
        .await?;

    let page = services.users.list(&request.page.into()).await?;
    page_payload("users", page.map(PublicUser::from))
}
