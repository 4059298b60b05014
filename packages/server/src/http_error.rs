//! HTTP error handling
//!
//! Every failed request answers with the same JSON body
//! (`{message, code, details?}`); the status is derived from `code`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use ordertree_core::{MutationOutcome, StoreError};
use serde::{Deserialize, Serialize};

/// HTTP error response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpError {
    /// User-facing error message
    pub message: String,
    /// Machine-readable error code
    pub code: String,
    /// Optional detailed error information for debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl HttpError {
    /// Create a new HTTP error
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: None,
        }
    }

    /// Create a new HTTP error with details
    pub fn with_details(
        message: impl Into<String>,
        code: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            details: Some(details.into()),
        }
    }

    /// Error for a store refusal; `None` when the mutation was applied
    pub fn from_outcome(outcome: MutationOutcome, node_id: i64) -> Option<Self> {
        let code = match outcome {
            MutationOutcome::Applied => return None,
            MutationOutcome::NotFound => "NODE_NOT_FOUND",
            MutationOutcome::PreconditionFailed => "PRECONDITION_FAILED",
            MutationOutcome::WouldCreateCycle => "WOULD_CREATE_CYCLE",
            MutationOutcome::HasChildren => "HAS_CHILDREN",
        };
        Some(Self::new(
            format!("Node {}: {}", node_id, outcome),
            code,
        ))
    }

    pub fn status(&self) -> StatusCode {
        match self.code.as_str() {
            "NODE_NOT_FOUND" => StatusCode::NOT_FOUND,
            "INVALID_INPUT" | "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "PRECONDITION_FAILED" | "WOULD_CREATE_CYCLE" | "HAS_CHILDREN" => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(e) => HttpError::new(e.to_string(), "VALIDATION_ERROR"),
            StoreError::Database(e) => {
                tracing::error!("Storage failure: {:?}", e);
                HttpError::with_details("Storage failure", "DATABASE_ERROR", e.to_string())
            }
            StoreError::Serialization(message) => HttpError::new(message, "SERIALIZATION_ERROR"),
        }
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::with_details("Invalid JSON body", "INVALID_INPUT", rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ordertree_core::ValidationError;

    #[test]
    fn test_outcome_status_mapping() {
        assert!(HttpError::from_outcome(MutationOutcome::Applied, 1).is_none());

        let cases = [
            (MutationOutcome::NotFound, StatusCode::NOT_FOUND),
            (MutationOutcome::PreconditionFailed, StatusCode::CONFLICT),
            (MutationOutcome::WouldCreateCycle, StatusCode::CONFLICT),
            (MutationOutcome::HasChildren, StatusCode::CONFLICT),
        ];
        for (outcome, status) in cases {
            let err = HttpError::from_outcome(outcome, 7).unwrap();
            assert_eq!(err.status(), status, "{:?}", outcome);
            assert!(err.message.starts_with("Node 7"));
        }
    }

    #[test]
    fn test_store_error_mapping() {
        let err = HttpError::from(StoreError::Validation(ValidationError::MissingField(
            "Name".to_string(),
        )));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = HttpError::from(StoreError::serialization("bad tags"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_details_skipped_when_absent() {
        let value = serde_json::to_value(HttpError::new("gone", "NODE_NOT_FOUND")).unwrap();
        assert_eq!(value["code"], "NODE_NOT_FOUND");
        assert!(value.get("details").is_none());
    }
}
