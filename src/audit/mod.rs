//! Structured security audit events
//!
//! Every authentication, authorization, token, user-management, and
//! role-management decision emits an [`AuditEvent`] through an abstract
//! [`AuditSink`]. The audit record carries the full internal detail; wire
//! responses only ever carry the safe subset.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Closed enumeration of auditable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Authentication
    LoginSuccess,
    LoginFailure,
    AccountLocked,
    Logout,
    RateLimited,

    // Tokens
    TokenRefreshed,
    TokenRevoked,
    TokenValidationFailed,

    // Credentials
    PasswordChanged,
    PasswordResetInitiated,
    PasswordResetCompleted,
    EmailVerified,

    // Authorization
    PermissionGranted,
    PermissionDenied,

    // User management
    UserCreated,
    UserUpdated,
    UserDeleted,

    // Organization management
    OrganizationCreated,
    OrganizationUpdated,
    OrganizationDeleted,
    MemberAdded,
    MemberRemoved,

    // Role management
    RoleCreated,
    RoleUpdated,
    RoleDeleted,
    RoleAssigned,
    RoleRevoked,
}

/// A single structured audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub event_type: AuditEventType,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn success(event_type: AuditEventType) -> Self {
        Self::new(event_type, true)
    }

    pub fn failure(event_type: AuditEventType, reason: impl Into<String>) -> Self {
        let mut event = Self::new(event_type, false);
        event.failure_reason = Some(reason.into());
        event
    }

    fn new(event_type: AuditEventType, success: bool) -> Self {
        Self {
            user_id: None,
            email: None,
            event_type,
            success,
            failure_reason: None,
            ip: None,
            user_agent: None,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_client(mut self, ip: Option<String>, user_agent: Option<String>) -> Self {
        self.ip = ip;
        self.user_agent = user_agent;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Destination for audit records. Implementations must be cheap; emission
/// happens on the request path.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

pub type SharedAuditSink = Arc<dyn AuditSink>;

/// Emits audit records as structured tracing events under the `audit`
/// target.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        tracing::info!(target: "audit", event = %payload, "audit event");
    }
}

/// Collects events in memory. Test sink.
#[derive(Default)]
pub struct MemoryAuditSink {
    events: parking_lot::Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn count_of(&self, event_type: AuditEventType) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_populates_fields() {
        let event = AuditEvent::failure(AuditEventType::LoginFailure, "invalid password")
            .with_email("user@example.com")
            .with_client(Some("10.1.2.3".to_string()), None)
            .with_metadata(serde_json::json!({"attempts": 2}));

        assert!(!event.success);
        assert_eq!(event.failure_reason.as_deref(), Some("invalid password"));
        assert_eq!(event.ip.as_deref(), Some("10.1.2.3"));
        assert_eq!(event.metadata.unwrap()["attempts"], 2);
    }

    #[test]
    fn tracing_sink_serializes_without_panicking() {
        let subscriber = crate::telemetry::get_subscriber(
            "audit-test".to_string(),
            "info",
            || std::io::sink(),
        );
        tracing::subscriber::with_default(subscriber, || {
            TracingAuditSink.emit(
                AuditEvent::success(AuditEventType::LoginSuccess).with_user(1),
            );
        });
    }

    #[test]
    fn memory_sink_counts_by_type() {
        let sink = MemoryAuditSink::new();
        sink.emit(AuditEvent::success(AuditEventType::LoginSuccess));
        sink.emit(AuditEvent::success(AuditEventType::LoginSuccess));
        sink.emit(AuditEvent::failure(AuditEventType::LoginFailure, "nope"));

        assert_eq!(sink.count_of(AuditEventType::LoginSuccess), 2);
        assert_eq!(sink.count_of(AuditEventType::LoginFailure), 1);
    }
}
