use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Header every request carries. `ip` and `user_agent` are optional
/// additions a gateway may stamp; clients that do not send them are fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestHeader {
    pub request_id: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl RequestHeader {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            timestamp: chrono::Utc::now().timestamp(),
            ip: None,
            user_agent: None,
        }
    }
}

/// Build a success envelope: the standard header plus the operation
/// payload merged at the root.
pub fn success_response(request_id: &str, payload: Value) -> Value {
    let mut response = json!({
        "header": {
            "success": true,
            "request_id": request_id,
        }
    });
    if let (Some(response_map), Value::Object(payload_map)) =
        (response.as_object_mut(), payload)
    {
        for (key, value) in payload_map {
            response_map.insert(key, value);
        }
    }
    response
}

/// Build an error envelope. Only the safe subset of the error reaches the
/// wire; validation and permission details ride in `detail`.
pub fn error_response(request_id: &str, error: &ApiError) -> Value {
    let mut header = json!({
        "success": false,
        "error": error.message,
        "error_code": error.code.as_str(),
        "request_id": request_id,
    });
    if let Some(detail) = error.wire_detail() {
        header["detail"] = detail;
    }
    json!({ "header": header })
}

/// The minimal authenticated request form used by services that proxy
/// through the identity core: a `token` and a `service` scope identifier
/// at the envelope root.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedRequest {
    pub token: String,
    pub service: String,
}

/// Rejection shape for the proxied form: a bare error name and numeric
/// code, so non-envelope clients can match on it.
pub fn gate_rejection(error: &ApiError) -> Value {
    json!({
        "error": error.code.as_str(),
        "code": error.code.status(),
        "message": error.message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    #[test]
    fn success_envelope_merges_payload_at_root() {
        let response = success_response("req-1", json!({"user": {"id": 7}}));
        assert_eq!(response["header"]["success"], true);
        assert_eq!(response["header"]["request_id"], "req-1");
        assert_eq!(response["user"]["id"], 7);
    }

    #[test]
    fn error_envelope_carries_stable_code() {
        let err = ApiError::validation(
            "Invalid input",
            Some(json!({"field": "email"})),
        );
        let response = error_response("req-2", &err);
        assert_eq!(response["header"]["success"], false);
        assert_eq!(response["header"]["error_code"], "VALIDATION_FAILED");
        assert_eq!(response["header"]["detail"]["field"], "email");
    }

    #[test]
    fn internal_detail_stays_off_the_wire() {
        let err = ApiError::new(
            ErrorCode::Internal,
            "Internal error",
            crate::error::ErrorContext::new()
                .with_details(json!({"cause": "pg pool exhausted"})),
        );
        let response = error_response("req-3", &err);
        assert!(response["header"].get("detail").is_none());
    }

    #[test]
    fn authenticated_request_form_parses() {
        let request: AuthenticatedRequest = serde_json::from_value(json!({
            "token": "eyJ...",
            "service": "state",
            "extra_field": 1,
        }))
        .unwrap();
        assert_eq!(request.service, "state");
    }

    #[test]
    fn gate_rejections_use_numeric_codes() {
        let rejection = gate_rejection(&ApiError::authentication_failed("Authentication failed"));
        assert_eq!(rejection["error"], "AUTHENTICATION_FAILED");
        assert_eq!(rejection["code"], 401);

        let rejection = gate_rejection(&ApiError::permission_denied("state:data:write", Some(1)));
        assert_eq!(rejection["error"], "PERMISSION_DENIED");
        assert_eq!(rejection["code"], 403);
    }
}
