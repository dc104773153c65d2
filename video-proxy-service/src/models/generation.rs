//! Generation request as received from the browser, and the payload sent to
//! the provider.

use proxy_core::error::{codes, AppError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_DURATION_SECS: f64 = 8.0;
pub const MIN_DURATION_SECS: u32 = 3;
pub const MAX_DURATION_SECS: u32 = 30;
pub const DEFAULT_STYLE: &str = "cinematic";

/// Inbound body exactly as the client sent it.
///
/// Fields are kept as raw JSON so that odd client input (numeric prompts,
/// string durations) degrades to defaults instead of failing deserialization.
/// Unknown top-level fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct RawGenerationRequest {
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub duration: Option<Value>,
    #[serde(default)]
    pub style: Option<Value>,
    #[serde(default)]
    pub voice: Option<Value>,
    #[serde(default)]
    pub mode: Option<Value>,
    #[serde(default)]
    pub options: Option<Value>,
}

/// A validated request. Only lives for the duration of one proxied call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Trimmed, never empty.
    pub prompt: String,
    /// Already clamped to `[MIN_DURATION_SECS, MAX_DURATION_SECS]`.
    pub duration: u32,
    pub style: String,
    pub voice: Option<String>,
    pub mode: Option<String>,
    /// Client-supplied provider options, passed through untouched.
    pub options: Map<String, Value>,
}

impl RawGenerationRequest {
    /// Parse a request body. An empty body reads as `{}`.
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let invalid = |detail: String| AppError::BadRequest {
            code: codes::INVALID_JSON,
            detail: Some(detail),
        };

        // Structs also deserialize from JSON arrays, so the shape is checked first.
        match serde_json::from_slice::<Value>(body).map_err(|e| invalid(e.to_string()))? {
            object @ Value::Object(_) => {
                serde_json::from_value(object).map_err(|e| invalid(e.to_string()))
            }
            _ => Err(invalid("request body must be a JSON object".to_string())),
        }
    }

    pub fn validate(self) -> Result<GenerationRequest, AppError> {
        let prompt = self
            .prompt
            .as_ref()
            .and_then(scalar_to_string)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::bad_request(codes::PROMPT_REQUIRED))?;

        let style = self
            .style
            .as_ref()
            .and_then(non_empty_str)
            .unwrap_or_else(|| DEFAULT_STYLE.to_string());

        let options = match self.options {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Ok(GenerationRequest {
            prompt,
            duration: clamp_duration(self.duration.as_ref()),
            style,
            voice: self.voice.as_ref().and_then(non_empty_str),
            mode: self.mode.as_ref().and_then(non_empty_str),
            options,
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `clamp(round(duration), 3, 30)`; anything non-numeric means the default of 8.
pub fn clamp_duration(value: Option<&Value>) -> u32 {
    let requested = value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|d| d.is_finite())
        .unwrap_or(DEFAULT_DURATION_SECS);

    requested
        .round()
        .clamp(f64::from(MIN_DURATION_SECS), f64::from(MAX_DURATION_SECS)) as u32
}

/// Body of the outbound provider call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderPayload {
    pub model: String,
    pub prompt: String,
    pub duration: u32,
    pub style: String,
    pub aspect_ratio: String,
    pub options: Map<String, Value>,
}

impl GenerationRequest {
    /// Merge the request with the deployment's fixed provider defaults.
    /// `voice` and `mode` win over same-named keys in the client's `options`.
    pub fn into_payload(self, model: &str, aspect_ratio: &str) -> ProviderPayload {
        let mut options = self.options;
        if let Some(voice) = self.voice {
            options.insert("voice".to_string(), Value::String(voice));
        }
        if let Some(mode) = self.mode {
            options.insert("mode".to_string(), Value::String(mode));
        }

        ProviderPayload {
            model: model.to_string(),
            prompt: self.prompt,
            duration: self.duration,
            style: self.style,
            aspect_ratio: aspect_ratio.to_string(),
            options,
        }
    }
}

/// Uniform success body returned to the client.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationEnvelope {
    /// A playable URL or data URI; `null` when the provider's JSON had none.
    pub video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}
