//! Normalization of whatever the provider sends back.
//!
//! The provider gives no signal besides its HTTP status and declared content
//! type, so those two alone decide between the error, JSON and binary paths.

use crate::config::BinaryPolicy;
use crate::models::GenerationEnvelope;
use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use proxy_core::error::AppError;
use serde_json::Value;

/// JSON pointers probed, in order, for a playable video URL.
pub const VIDEO_URL_POINTERS: [&str; 5] = [
    "/video_url",
    "/result/video_url",
    "/output/video_url",
    "/video",
    "/data/0/url",
];

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

pub type ByteStream = BoxStream<'static, Result<Bytes, reqwest::Error>>;

/// A successful provider reply, by encoding.
pub enum ProviderResponse {
    JsonPayload(Value),
    BinaryPayload {
        bytes: Bytes,
        content_type: String,
    },
    StreamPayload {
        stream: ByteStream,
        content_type: String,
        content_length: Option<u64>,
    },
}

impl std::fmt::Debug for ProviderResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderResponse::JsonPayload(json) => f.debug_tuple("JsonPayload").field(json).finish(),
            ProviderResponse::BinaryPayload {
                bytes,
                content_type,
            } => f
                .debug_struct("BinaryPayload")
                .field("len", &bytes.len())
                .field("content_type", content_type)
                .finish(),
            ProviderResponse::StreamPayload {
                content_type,
                content_length,
                ..
            } => f
                .debug_struct("StreamPayload")
                .field("content_type", content_type)
                .field("content_length", content_length)
                .finish(),
        }
    }
}

impl ProviderResponse {
    /// Sort a raw provider reply into one of the three payload kinds.
    ///
    /// Non-2xx statuses, and 2xx replies without a content type, become
    /// `ProviderError` carrying the upstream status and best-effort body text.
    pub async fn classify(
        response: reqwest::Response,
        policy: BinaryPolicy,
    ) -> Result<Self, AppError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .map(str::to_string);

        let content_type = match content_type {
            Some(ct) if status.is_success() => ct,
            _ => return Err(provider_failure(response).await),
        };

        if is_json(&content_type) {
            let bytes = response.bytes().await?;
            return Ok(ProviderResponse::JsonPayload(serde_json::from_slice(&bytes)?));
        }

        match policy {
            BinaryPolicy::DataUri => Ok(ProviderResponse::BinaryPayload {
                bytes: response.bytes().await?,
                content_type,
            }),
            BinaryPolicy::Stream => Ok(ProviderResponse::StreamPayload {
                content_length: response.content_length(),
                stream: response.bytes_stream().boxed(),
                content_type,
            }),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProviderResponse::JsonPayload(_) => "json",
            ProviderResponse::BinaryPayload { .. } => "binary",
            ProviderResponse::StreamPayload { .. } => "stream",
        }
    }

    pub fn normalize(self) -> ProxyResponse {
        match self {
            ProviderResponse::JsonPayload(json) => ProxyResponse::Envelope(GenerationEnvelope {
                video: extract_video_url(&json),
                raw: Some(json),
            }),
            ProviderResponse::BinaryPayload {
                bytes,
                content_type,
            } => ProxyResponse::Envelope(GenerationEnvelope {
                video: Some(data_uri(&content_type, &bytes)),
                raw: None,
            }),
            ProviderResponse::StreamPayload {
                stream,
                content_type,
                content_length,
            } => ProxyResponse::Attachment {
                stream,
                content_type,
                content_length,
            },
        }
    }
}

async fn provider_failure(response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();
    // A body that cannot be read still yields a provider error, just without detail.
    let detail = response.text().await.ok();

    AppError::ProviderError {
        status: Some(status),
        detail,
    }
}

fn is_json(content_type: &str) -> bool {
    content_type
        .to_ascii_lowercase()
        .contains("application/json")
}

/// First non-empty string found under [`VIDEO_URL_POINTERS`].
pub fn extract_video_url(json: &Value) -> Option<String> {
    VIDEO_URL_POINTERS
        .iter()
        .filter_map(|pointer| json.pointer(pointer))
        .filter_map(Value::as_str)
        .find(|url| !url.is_empty())
        .map(str::to_string)
}

pub fn data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

fn file_extension(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",
        "image/gif" => "gif",
        _ => "bin",
    }
}

/// What the client receives on success.
pub enum ProxyResponse {
    Envelope(GenerationEnvelope),
    /// Provider bytes forwarded as they arrive. Dropping the response body
    /// (e.g. on client disconnect) drops the upstream stream with it.
    Attachment {
        stream: ByteStream,
        content_type: String,
        content_length: Option<u64>,
    },
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        match self {
            ProxyResponse::Envelope(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
            ProxyResponse::Attachment {
                stream,
                content_type,
                content_length,
            } => {
                let disposition = format!(
                    "attachment; filename=\"video.{}\"",
                    file_extension(&content_type)
                );
                let mut response = Response::new(Body::from_stream(stream));
                let headers = response.headers_mut();

                headers.insert(
                    header::CONTENT_TYPE,
                    HeaderValue::from_str(&content_type)
                        .unwrap_or_else(|_| HeaderValue::from_static(FALLBACK_CONTENT_TYPE)),
                );
                if let Ok(value) = HeaderValue::from_str(&disposition) {
                    headers.insert(header::CONTENT_DISPOSITION, value);
                }
                if let Some(len) = content_length {
                    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
                }

                response
            }
        }
    }
}
