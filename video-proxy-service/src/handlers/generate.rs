use crate::models::RawGenerationRequest;
use crate::services::ProxyResponse;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
};
use proxy_core::error::{codes, AppError};

/// Largest accepted `POST /generate` body.
pub const MAX_REQUEST_BYTES: usize = 1024 * 1024;

/// `POST /generate`: validate, forward to the provider, normalize the reply.
///
/// Every failure leaves here as an [`AppError`] JSON envelope.
pub async fn generate_video(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<ProxyResponse, AppError> {
    let request = body
        .map_err(body_rejection)
        .and_then(|body| RawGenerationRequest::from_body(&body))
        .and_then(RawGenerationRequest::validate)
        .map_err(|e| {
            tracing::warn!(error = e.code(), "Rejected generation request");
            e
        })?;

    state.proxy.generate(request).await.map_err(|e| {
        match &e {
            AppError::Misconfigured(code) => {
                tracing::error!(error = *code, "Generation proxy is misconfigured")
            }
            AppError::ProviderError { status, detail } => tracing::warn!(
                upstream_status = ?status,
                detail = detail.as_deref().unwrap_or("-"),
                "Provider returned an error"
            ),
            other => tracing::error!(error = %other, "Generation failed"),
        }
        e
    })
}

fn body_rejection(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(Some(rejection.body_text()))
    } else {
        AppError::BadRequest {
            code: codes::INVALID_JSON,
            detail: Some(rejection.body_text()),
        }
    }
}
