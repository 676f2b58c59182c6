use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")] Database(#[from] sea_orm::DbErr),

    #[error("Encryption error: {0}")] Encryption(String),

    #[error("Invalid input: {0}")] InvalidInput(String),

    #[error("Not found: {0}")] NotFound(String),

    #[error("Wallet error: {0}")] Wallet(String),

    #[error("Provider error: {0}")] Provider(#[from] ProbeError),

    #[error("Configuration error: {0}")] Config(String),

    #[error("Internal error: {0}")] Internal(String),
}

/// Failure of a single outbound provider call.
///
/// Probes never panic and never return `AppError`; everything a provider can do
/// wrong is folded into one of these variants at the probe boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")] Http(u16),

    #[error("transport error: {0}")] Transport(String),

    #[error("malformed response: {0}")] Malformed(String),

    #[error("API key is not configured")]
    MissingApiKey,

    #[error("capability not supported by this provider")]
    Unsupported,
}

impl ProbeError {
    /// True when the provider simply gave no usable data, false when the probe
    /// could not have worked because of local configuration.
    pub fn is_no_data(&self) -> bool {
        !matches!(self, ProbeError::MissingApiKey | ProbeError::Unsupported)
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProbeError::Timeout
        } else if let Some(status) = e.status() {
            ProbeError::Http(status.as_u16())
        } else if e.is_decode() {
            ProbeError::Malformed(e.to_string())
        } else {
            ProbeError::Transport(e.to_string())
        }
    }
}

pub type ProbeResult<T> = std::result::Result<T, ProbeError>;

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn to_error_response(&self) -> ErrorResponse {
        let (code, message, field) = match self {
            AppError::Database(e) => ("DATABASE_ERROR", e.to_string(), None),
            AppError::Encryption(msg) => ("ENCRYPTION_ERROR", msg.clone(), None),
            AppError::InvalidInput(msg) => ("INVALID_INPUT", msg.clone(), None),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone(), None),
            AppError::Wallet(msg) => ("WALLET_ERROR", msg.clone(), None),
            AppError::Provider(e) => ("PROVIDER_ERROR", e.to_string(), None),
            AppError::Config(msg) => ("CONFIG_ERROR", msg.clone(), None),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone(), None),
        };

        ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => axum::http::StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::Provider(_) => axum::http::StatusCode::BAD_GATEWAY,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let response = self.to_error_response();
        (status, axum::Json(response)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_error_no_data_classification() {
        assert!(ProbeError::Timeout.is_no_data());
        assert!(ProbeError::Http(503).is_no_data());
        assert!(ProbeError::Malformed("x".into()).is_no_data());
        assert!(!ProbeError::MissingApiKey.is_no_data());
        assert!(!ProbeError::Unsupported.is_no_data());
    }

    #[test]
    fn test_error_response_codes() {
        let response = AppError::NotFound("Address not found".into()).to_error_response();
        assert_eq!(response.error.code, "NOT_FOUND");
        assert_eq!(response.error.message, "Address not found");

        let response = AppError::Provider(ProbeError::Http(429)).to_error_response();
        assert_eq!(response.error.code, "PROVIDER_ERROR");
        assert_eq!(response.error.message, "HTTP status 429");
    }
}
