//! Server response types.
//!
//! All Booking API REST responses follow a common envelope format with
//! status, message, and optional data/error fields.

use serde::{Deserialize, Serialize};

/// Standard response envelope.
///
/// ```json
/// { "status": 200, "message": "ok", "data": { ... } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T = serde_json::Value> {
    /// HTTP-like status code from the server.
    pub status: u16,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Response payload data (type varies by endpoint).
    pub data: Option<T>,
    /// Error details (present only on error responses).
    pub error: Option<ApiErrorDetail>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    /// Machine-readable error code (e.g. "otp_mismatch").
    #[serde(rename = "type")]
    pub error_type: Option<String>,
    /// Error message.
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Whether the response indicates success (status 200).
    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    /// Machine-readable error code, if any.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().and_then(|e| e.error_type.as_deref())
    }

    /// Get the error message if this is an error response.
    pub fn error_message(&self) -> Option<String> {
        if self.is_success() {
            None
        } else {
            self.error
                .as_ref()
                .and_then(|e| e.message.clone())
                .or_else(|| Some(self.message.clone()))
        }
    }
}
