use thiserror::Error;

/// Recognised failures of the remote API.
///
/// Transport failures (no response received) report status code 0; every
/// other variant carries the HTTP status the server answered with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("API request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown status");
        let message = if body.trim().is_empty() {
            reason.to_string()
        } else {
            format!("{}: {}", reason, Self::truncate_body(body))
        };
        match status.as_u16() {
            404 => ApiError::NotFound(message),
            429 => ApiError::RateLimited,
            code @ 500..=599 => ApiError::ServerError { status: code, message },
            code => ApiError::RequestFailed { status: code, message },
        }
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }

    /// HTTP status of the failure, or 0 when no response was received.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Network(_) => 0,
            ApiError::NotFound(_) => 404,
            ApiError::RateLimited => 429,
            ApiError::ServerError { status, .. } | ApiError::RequestFailed { status, .. } => {
                *status
            }
        }
    }

    pub fn is_transport(&self) -> bool {
        self.status_code() == 0
    }

    /// Message shown to the user for a failed fetch: the `ApiError` text when
    /// the failure is one, `fallback` for anything unrecognised.
    pub fn user_message(err: &anyhow::Error, fallback: &str) -> String {
        match err.downcast_ref::<ApiError>() {
            Some(api) => api.to_string(),
            None => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ApiError::from_status(StatusCode::NOT_FOUND, ""),
            ApiError::NotFound(_)
        ));
        assert_eq!(
            ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down"),
            ApiError::RateLimited
        );
        assert_eq!(
            ApiError::from_status(StatusCode::BAD_GATEWAY, "").status_code(),
            502
        );
        assert_eq!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "bad page").to_string(),
            "API request failed (400): Bad Request: bad page"
        );
    }

    #[test]
    fn test_transport_status_is_zero() {
        let err = ApiError::Network("connection refused".to_string());
        assert_eq!(err.status_code(), 0);
        assert!(err.is_transport());
        assert!(!ApiError::RateLimited.is_transport());
    }

    #[test]
    fn test_truncate_body() {
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let truncated = ApiError::truncate_body(&long);
        assert!(truncated.contains("truncated, 520 total bytes"));
        assert_eq!(ApiError::truncate_body("short"), "short");
    }

    #[test]
    fn test_user_message() {
        let api: anyhow::Error = ApiError::NotFound("Not Found".to_string()).into();
        assert_eq!(
            ApiError::user_message(&api, "An error occurred"),
            "Resource not found: Not Found"
        );

        let wrapped = anyhow::Error::from(ApiError::RateLimited).context("Failed to fetch events");
        assert_eq!(
            ApiError::user_message(&wrapped, "An error occurred"),
            "Rate limited - please wait before retrying"
        );

        let other = anyhow::anyhow!("expected value at line 1 column 1");
        assert_eq!(ApiError::user_message(&other, "An error occurred"), "An error occurred");
    }
}
