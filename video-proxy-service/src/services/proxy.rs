//! Client for the text-to-video provider.

use crate::config::ProviderConfig;
use crate::models::GenerationRequest;
use crate::services::metrics::record_provider_call;
use crate::services::provider_response::{ProviderResponse, ProxyResponse};
use proxy_core::error::{codes, AppError};
use reqwest::{header::AUTHORIZATION, Client};
use secrecy::ExposeSecret;
use std::time::Instant;

/// Forwards generation requests to the provider and normalizes the reply.
///
/// Holds only read-only configuration and a pooled HTTP client, so one
/// instance is shared by every in-flight request.
#[derive(Clone)]
pub struct GenerationProxy {
    client: Client,
    config: ProviderConfig,
}

impl GenerationProxy {
    pub fn new(config: ProviderConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AppError::ConfigError(anyhow::Error::new(e)))?;

        Ok(Self { client, config })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some() && self.config.url.is_some()
    }

    /// One provider call per request: no retries, no caching.
    ///
    /// Missing credentials or endpoint fail before any network activity.
    pub async fn generate(&self, request: GenerationRequest) -> Result<ProxyResponse, AppError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or(AppError::Misconfigured(codes::MISSING_FAL_KEY))?;
        let url = self
            .config
            .url
            .as_deref()
            .ok_or(AppError::Misconfigured(codes::MISSING_PROVIDER_URL))?;

        let payload = request.into_payload(&self.config.model, &self.config.aspect_ratio);

        tracing::info!(
            model = %payload.model,
            prompt_len = payload.prompt.len(),
            duration = payload.duration,
            style = %payload.style,
            "Calling video provider"
        );

        let start = Instant::now();
        let sent = self
            .client
            .post(url)
            .header(
                AUTHORIZATION,
                self.config.auth_scheme.header_value(api_key.expose_secret()),
            )
            .json(&payload)
            .send()
            .await;

        let result = match sent {
            Ok(response) => {
                tracing::debug!(
                    status = %response.status(),
                    content_type = ?response.headers().get(reqwest::header::CONTENT_TYPE),
                    "Provider responded"
                );
                ProviderResponse::classify(response, self.config.binary_policy).await
            }
            Err(e) => Err(AppError::from(e)),
        };

        let outcome = match &result {
            Ok(response) => response.kind(),
            Err(AppError::ProviderError { .. }) => "provider_error",
            Err(_) => "internal_error",
        };
        record_provider_call(outcome, start.elapsed());

        tracing::info!(
            outcome,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Provider call finished"
        );

        Ok(result?.normalize())
    }
}
