use serde::{Deserialize, Serialize};

use crate::Error;

/// The `{"error": {...}}` envelope the API uses for failures, both as an HTTP
/// error body and as an in-stream event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The error details.
    pub error: ErrorDetail,
}

/// Details of an API failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// HTTP-equivalent status code.
    #[serde(default)]
    pub code: Option<u16>,

    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,

    /// Canonical status string, e.g. `RESOURCE_EXHAUSTED`.
    #[serde(default)]
    pub status: Option<String>,
}

impl ErrorDetail {
    /// Map the failure onto the crate's error taxonomy.
    ///
    /// `fallback_code` is used when the body carries no code, and
    /// `fallback_message` when it carries no message.
    pub fn into_error(
        self,
        fallback_code: u16,
        fallback_message: &str,
        retry_after: Option<u64>,
    ) -> Error {
        let code = self.code.unwrap_or(fallback_code);
        let message = self
            .message
            .unwrap_or_else(|| fallback_message.to_string());
        match code {
            400 => Error::bad_request(message, None),
            401 => Error::authentication(message),
            403 => Error::permission(message),
            404 => Error::not_found(message),
            408 => Error::timeout(message, None),
            429 => Error::rate_limit(message, retry_after),
            500 => Error::internal_server(message),
            502..=504 => Error::service_unavailable(message, retry_after),
            _ => Error::api(code, self.status, message),
        }
    }
}
