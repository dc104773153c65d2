use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable machine-readable codes carried in the `error` field of every failure body.
pub mod codes {
    pub const PROMPT_REQUIRED: &str = "prompt_required";
    pub const INVALID_JSON: &str = "invalid_json";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const MISSING_FAL_KEY: &str = "missing_fal_key";
    pub const MISSING_PROVIDER_URL: &str = "missing_provider_url";
    pub const PROVIDER_ERROR: &str = "provider_error";
    pub const SERVER_ERROR: &str = "server_error";
    pub const CONFIG_ERROR: &str = "config_error";
}

#[derive(Debug, Error)]
pub enum AppError {
    /// The client sent something unusable.
    #[error("Bad request: {code}")]
    BadRequest {
        code: &'static str,
        detail: Option<String>,
    },

    /// The request body exceeded the configured limit.
    #[error("Payload too large")]
    PayloadTooLarge(Option<String>),

    /// A secret or endpoint the deployment must provide is absent.
    #[error("Service misconfigured: {0}")]
    Misconfigured(&'static str),

    /// The upstream provider answered with a failure, or did not answer in time.
    #[error("Provider error (status {status:?})")]
    ProviderError {
        status: Option<u16>,
        detail: Option<String>,
    },

    #[error("Internal server error: {0}")]
    InternalError(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    ConfigError(anyhow::Error),
}

impl AppError {
    pub fn bad_request(code: &'static str) -> Self {
        AppError::BadRequest { code, detail: None }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadRequest { code, .. } => *code,
            AppError::PayloadTooLarge(_) => codes::PAYLOAD_TOO_LARGE,
            AppError::Misconfigured(code) => *code,
            AppError::ProviderError { .. } => codes::PROVIDER_ERROR,
            AppError::InternalError(_) => codes::SERVER_ERROR,
            AppError::ConfigError(_) => codes::CONFIG_ERROR,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ProviderError { .. } => StatusCode::BAD_GATEWAY,
            AppError::Misconfigured(_) | AppError::InternalError(_) | AppError::ConfigError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(anyhow::Error::new(err).context("failed to parse provider JSON"))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::ProviderError {
                status: None,
                detail: Some(format!("provider request timed out: {}", err)),
            }
        } else {
            AppError::InternalError(anyhow::Error::new(err))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error = self.code().to_string();

        let (status, detail) = match self {
            AppError::BadRequest { detail, .. } => (None, detail),
            AppError::PayloadTooLarge(detail) => (None, detail),
            AppError::Misconfigured(_) => (None, None),
            AppError::ProviderError { status, detail } => (status, detail),
            AppError::InternalError(err) | AppError::ConfigError(err) => {
                (None, Some(format!("{:#}", err)))
            }
        };

        (
            status_code,
            Json(ErrorResponse {
                error,
                status,
                detail,
            }),
        )
            .into_response()
    }
}
