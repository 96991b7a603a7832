use crate::error::{ApiError, Result};
use serde_json::{json, Map, Value};
use validator::Validate;

/// Run derive-based field validation and map failures to the wire shape:
/// `error_code = VALIDATION_FAILED` with a `detail` map of
/// field -> [violation codes].
pub fn validate_request<T: Validate>(request: &T) -> Result<()> {
    let errors = match request.validate() {
        Ok(()) => return Ok(()),
        Err(errors) => errors,
    };

    let mut detail = Map::new();
    for (field, violations) in errors.field_errors() {
        let codes: Vec<Value> = violations
            .iter()
            .map(|v| Value::String(v.code.to_string().to_uppercase()))
            .collect();
        detail.insert(field.to_string(), Value::Array(codes));
    }

    Err(ApiError::validation(
        "Request validation failed",
        Some(json!(detail)),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(email)]
        email: String,
        #[validate(length(min = 3, max = 10))]
        name: String,
    }

    #[test]
    fn failures_map_to_field_detail() {
        let probe = Probe {
            email: "not-an-email".to_string(),
            name: "ab".to_string(),
        };
        let err = validate_request(&probe).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationFailed);

        let detail = err.context.details.unwrap();
        assert!(detail.get("email").is_some());
        assert!(detail.get("name").is_some());
    }

    #[test]
    fn valid_input_passes() {
        let probe = Probe {
            email: "a@example.com".to_string(),
            name: "abc".to_string(),
        };
        assert!(validate_request(&probe).is_ok());
    }
}
