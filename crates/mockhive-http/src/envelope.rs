//! Admin API response envelope

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Envelope wrapping every admin response:
/// `{success, data?, error?, message?}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    /// Whether the operation succeeded
    pub success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error description on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Human-readable note
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Admin handler result: status plus envelope
pub type AdminResult = (StatusCode, Json<ApiResponse>);

/// 200 with data.
pub fn ok<T: Serialize>(data: T) -> AdminResult {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            message: None,
        }),
    )
}

/// 200 with data and a message.
pub fn ok_with_message<T: Serialize>(data: T, message: impl Into<String>) -> AdminResult {
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            message: Some(message.into()),
        }),
    )
}

/// 201 with the created entity.
pub fn created<T: Serialize>(data: T) -> AdminResult {
    (
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            message: None,
        }),
    )
}

/// Failure with an explicit status.
pub fn fail(status: StatusCode, error: impl Into<String>) -> AdminResult {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
        }),
    )
}

/// Map a core error onto the envelope: not-found → 404, validation →
/// 400, everything else → 500.
pub fn from_error(error: &mockhive_core::Error) -> AdminResult {
    let status = match error {
        mockhive_core::Error::NotFound { .. } => StatusCode::NOT_FOUND,
        mockhive_core::Error::Validation { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    fail(status, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let (status, Json(body)) = ok(serde_json::json!({"id": 1}));
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
        assert!(body.data.is_some());
        assert!(body.error.is_none());

        let (status, Json(body)) = fail(StatusCode::NOT_FOUND, "missing");
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
        assert_eq!(body.error.as_deref(), Some("missing"));
    }

    #[test]
    fn test_error_mapping() {
        let (status, _) = from_error(&mockhive_core::Error::not_found("x"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = from_error(&mockhive_core::Error::validation("x"));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = from_error(&mockhive_core::Error::generic("x"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
