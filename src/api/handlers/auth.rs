use super::{client_info, parse, Services};
use crate::api::dto::{
    ChangePasswordRequest, CompleteResetRequest, LoginRequest, LoginResponse, LogoutRequest,
    RefreshRequest, RefreshResponse, ResetPasswordRequest, ResetPasswordResponse, ValidateRequest,
    ValidateResponse, VerifyEmailRequest,
};
use crate::error::{ApiError, Result};
use serde_json::{json, Value};

pub async fn login(services: &Services, payload: Value) -> Result<Value> {
    let request: LoginRequest = parse(payload)?;
    let client = client_info(&request.header);

    let outcome = services
        .auth
        .login(&request.identifier, &request.password, &client)
        .await?;

    let response = LoginResponse {
        access_token: outcome.access.token,
        refresh_token: outcome.refresh.token,
        expires_at: outcome.access.claims.exp,
        user: outcome.user.into(),
    };
    serde_json::to_value(response).map_err(|e| ApiError::internal(e))
}

pub async fn logout(services: &Services, payload: Value) -> Result<Value> {
    let request: LogoutRequest = parse(payload)?;
    let client = client_info(&request.header);
    services.auth.logout(&request.token, &client);
    Ok(json!({}))
}

pub async fn refresh(services: &Services, payload: Value) -> Result<Value> {
    let request: RefreshRequest = parse(payload)?;
    let client = client_info(&request.header);

    let (access, refresh) = services.auth.refresh(&request.refresh_token, &client).await?;
    let response = RefreshResponse {
        access_token: access.token,
        refresh_token: refresh.token,
        expires_at: access.claims.exp,
    };
    serde_json::to_value(response).map_err(|e| ApiError::internal(e))
}

pub async fn validate(services: &Services, payload: Value) -> Result<Value> {
    let request: ValidateRequest = parse(payload)?;
    let claims = services.auth.validate_access_token(&request.token)?;
    let response = ValidateResponse {
        valid: true,
        claims,
    };
    serde_json::to_value(response).map_err(|e| ApiError::internal(e))
}

pub async fn change_password(services: &Services, payload: Value) -> Result<Value> {
    let request: ChangePasswordRequest = parse(payload)?;
    let client = client_info(&request.header);

    // The subject is whoever the token says; no extra permission needed to
    // change one's own password
    let subject = services
        .gate
        .authenticate(&request.token, &request.header.request_id, &client.client_id)
        .await?;

    services
        .auth
        .change_password(
            subject.user_id,
            &request.current_password,
            &request.new_password,
            &client,
        )
        .await?;
    Ok(json!({}))
}

pub async fn reset_password(services: &Services, payload: Value) -> Result<Value> {
    let request: ResetPasswordRequest = parse(payload)?;
    let client = client_info(&request.header);

    let reset = services
        .auth
        .initiate_password_reset(&request.email, &client)
        .await?;
    let response = ResetPasswordResponse {
        reset_token: reset.token,
        expires_at: reset.claims.exp,
    };
    serde_json::to_value(response).map_err(|e| ApiError::internal(e))
}

pub async fn complete_reset(services: &Services, payload: Value) -> Result<Value> {
    let request: CompleteResetRequest = parse(payload)?;
    let client = client_info(&request.header);

    services
        .auth
        .complete_password_reset(&request.reset_token, &request.new_password, &client)
        .await?;
    Ok(json!({}))
}

pub async fn verify_email(services: &Services, payload: Value) -> Result<Value> {
    let request: VerifyEmailRequest = parse(payload)?;
    let client = client_info(&request.header);

    let user = services
        .auth
        .verify_email(&request.verification_token, &client)
        .await?;
    Ok(json!({
        "user": crate::api::dto::PublicUser::from(user),
    }))
}
