use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

/// Failures rendered as JSON:API `api_error` documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    NotFound,
    Unauthorized,
    Invalid { field: String, code: &'static str },
    InvalidType { expected: &'static str },
}

impl ApiError {
    pub fn invalid(field: &str, code: &'static str) -> Self {
        ApiError::Invalid {
            field: field.to_string(),
            code,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Invalid { .. } | ApiError::InvalidType { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }

    fn attributes(&self) -> Value {
        match self {
            ApiError::NotFound => json!({"code": "NOT_FOUND", "details": {}}),
            ApiError::Unauthorized => {
                json!({"code": "INVALID_AUTHORIZATION_HEADER", "details": {}})
            }
            ApiError::Invalid { field, code } => json!({
                "code": "INVALID_FIELD",
                "details": {
                    "field": field,
                    "code": code,
                    "message": format!("{field} is invalid ({code})"),
                }
            }),
            ApiError::InvalidType { expected } => json!({
                "code": "INVALID_FORMAT",
                "details": {"field": "type", "code": "VALIDATION_INVALID_TYPE",
                            "message": format!("expected type {expected}")}
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "data": [{
                "id": Uuid::new_v4().to_string(),
                "type": "api_error",
                "attributes": self.attributes(),
            }]
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_field_details_name_the_field() {
        let attrs = ApiError::invalid("api_key", "VALIDATION_UNIQUENESS").attributes();
        assert_eq!(attrs["code"], "INVALID_FIELD");
        assert_eq!(attrs["details"]["field"], "api_key");
        assert_eq!(attrs["details"]["code"], "VALIDATION_UNIQUENESS");
    }

    #[test]
    fn statuses_match_error_kinds() {
        assert_eq!(ApiError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::invalid("name", "VALIDATION_REQUIRED").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
