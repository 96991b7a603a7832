//! Operation dispatch
//!
//! A broker message arrives as an operation name (`service.operation`) and
//! a JSON envelope. The dispatcher parses and validates the request,
//! applies the authorization gate where the operation requires it, invokes
//! the domain service, and wraps the outcome in the response envelope.

mod auth;
mod health;
mod organization;
mod role;
mod user;

use crate::api::envelope::{error_response, success_response, RequestHeader};
use crate::api::validate_request;
use crate::error::{ApiError, Result};
use crate::middleware::AuthorizationGate;
use crate::repository::Page;
use crate::services::{AuthService, ClientInfo, OrganizationService, RoleService, UserService};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;
use validator::Validate;

/// Everything the handlers need, shared across workers.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<AuthService>,
    pub users: Arc<UserService>,
    pub organizations: Arc<OrganizationService>,
    pub roles: Arc<RoleService>,
    pub gate: Arc<AuthorizationGate>,
}

/// Routes operations to handlers and owns the envelope contract.
pub struct Dispatcher {
    services: Services,
    started_at: Instant,
}

impl Dispatcher {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            started_at: Instant::now(),
        }
    }

    /// Handle one request. Never fails: every error becomes an error
    /// envelope carrying the request id it arrived with.
    pub async fn dispatch(&self, operation: &str, payload: Value) -> Value {
        let request_id = payload
            .get("header")
            .and_then(|h| h.get("request_id"))
            .and_then(|id| id.as_str())
            .unwrap_or_default()
            .to_string();
        debug!(operation, request_id = %request_id, "dispatching request");

        match self.route(operation, payload).await {
            Ok(payload) => success_response(&request_id, payload),
            Err(err) => error_response(&request_id, &err),
        }
    }

    async fn route(&self, operation: &str, payload: Value) -> Result<Value> {
        let services = &self.services;
        match operation {
            "auth.login" => auth::login(services, payload).await,
            "auth.logout" => auth::logout(services, payload).await,
            "auth.refresh" => auth::refresh(services, payload).await,
            "auth.validate" => auth::validate(services, payload).await,
            "auth.change_password" => auth::change_password(services, payload).await,
            "auth.reset_password" => auth::reset_password(services, payload).await,
            "auth.complete_reset" => auth::complete_reset(services, payload).await,
            "auth.verify_email" => auth::verify_email(services, payload).await,

            "user.create" => user::create(services, payload).await,
            "user.get" => user::get(services, payload).await,
            "user.update" => user::update(services, payload).await,
            "user.delete" => user::delete(services, payload).await,
            "user.list" => user::list(services, payload).await,

            "organization.create" => organization::create(services, payload).await,
            "organization.get" => organization::get(services, payload).await,
            "organization.update" => organization::update(services, payload).await,
            "organization.delete" => organization::delete(services, payload).await,
            "organization.list" => organization::list(services, payload).await,
            "organization.search" => organization::search(services, payload).await,
            "organization.add_member" => organization::add_member(services, payload).await,
            "organization.remove_member" => organization::remove_member(services, payload).await,
            "organization.members" => organization::members(services, payload).await,

            "role.create" => role::create(services, payload).await,
            "role.get" => role::get(services, payload).await,
            "role.update" => role::update(services, payload).await,
            "role.delete" => role::delete(services, payload).await,
            "role.list" => role::list(services, payload).await,
            "role.assign" => role::assign(services, payload).await,
            "role.revoke" => role::revoke(services, payload).await,

            "health.check" => health::check(self.started_at),

            _ => Err(ApiError::validation(
                format!("Unknown operation '{}'", operation),
                Some(json!({"operation": operation})),
            )),
        }
    }
}

/// Parse the envelope into a typed request and run field validation.
/// Unknown fields are ignored for forward compatibility.
fn parse<T>(payload: Value) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let request: T = serde_json::from_value(payload)
        .map_err(|e| ApiError::validation(format!("Malformed request: {}", e), None))?;
    validate_request(&request)?;
    Ok(request)
}

/// Client identity for rate limiting and audit, from the header the
/// gateway stamped.
fn client_info(header: &RequestHeader) -> ClientInfo {
    ClientInfo {
        client_id: header
            .ip
            .clone()
            .unwrap_or_else(|| "unknown".to_string()),
        ip: header.ip.clone(),
        user_agent: header.user_agent.clone(),
    }
}

/// Page payload under an operation-specific key; `total` appears only when
/// it was computed.
fn page_payload<T: serde::Serialize>(key: &str, page: Page<T>) -> Result<Value> {
    let mut payload = json!({
        key: page.items,
        "offset": page.offset,
        "limit": page.limit,
    });
    if let Some(total) = page.total {
        payload["total"] = total.into();
    }
    Ok(payload)
}
