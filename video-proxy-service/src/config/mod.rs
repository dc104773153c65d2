use config::Config as Cfg;
use proxy_core::config as core_config;
use proxy_core::error::AppError;
use secrecy::Secret;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PROVIDER_URL: &str = "https://api.fal.ai/fal/pika-v2.2/video";
const DEFAULT_MODEL: &str = "pika-v2.2";
const DEFAULT_ASPECT_RATIO: &str = "16:9";
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_STATIC_DIR: &str = "public";

/// Immutable service configuration, built once at startup and handed to the
/// router and the generation proxy.
#[derive(Debug, Clone)]
pub struct VideoProxyConfig {
    pub common: core_config::Config,
    pub provider: ProviderConfig,
    pub assets: AssetConfig,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// `None` keeps the server up but makes `/generate` answer `missing_fal_key`.
    pub api_key: Option<Secret<String>>,
    /// `None` makes `/generate` answer `missing_provider_url`.
    pub url: Option<String>,
    pub auth_scheme: AuthScheme,
    pub model: String,
    pub aspect_ratio: String,
    /// Bounds the whole provider exchange, body included.
    pub timeout: Duration,
    pub binary_policy: BinaryPolicy,
}

#[derive(Debug, Clone)]
pub struct AssetConfig {
    pub static_dir: PathBuf,
    /// Serve `index.html` for unknown GET paths instead of 404.
    pub spa_fallback: bool,
}

impl AssetConfig {
    pub fn index_file(&self) -> PathBuf {
        self.static_dir.join("index.html")
    }
}

/// How the provider's key is presented in the `Authorization` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `Authorization: Key <key>` (fal.ai's native scheme)
    Key,
}

impl AuthScheme {
    pub fn header_value(&self, key: &str) -> String {
        match self {
            AuthScheme::Bearer => format!("Bearer {}", key),
            AuthScheme::Key => format!("Key {}", key),
        }
    }
}

impl FromStr for AuthScheme {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(AuthScheme::Bearer),
            "key" => Ok(AuthScheme::Key),
            _ => Err(InvalidSetting::new("PROVIDER_AUTH_SCHEME", s)),
        }
    }
}

/// What to do with a non-JSON provider body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryPolicy {
    /// Buffer it and answer `{video: "data:<type>;base64,..."}`.
    DataUri,
    /// Forward the bytes as they arrive, as an attachment.
    Stream,
}

impl FromStr for BinaryPolicy {
    type Err = InvalidSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "data_uri" | "data-uri" | "base64" => Ok(BinaryPolicy::DataUri),
            "stream" => Ok(BinaryPolicy::Stream),
            _ => Err(InvalidSetting::new("BINARY_RESPONSE_MODE", s)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid value '{value}' for {setting}")]
pub struct InvalidSetting {
    setting: &'static str,
    value: String,
}

impl InvalidSetting {
    fn new(setting: &'static str, value: &str) -> Self {
        Self {
            setting,
            value: value.to_string(),
        }
    }
}

impl From<InvalidSetting> for AppError {
    fn from(err: InvalidSetting) -> Self {
        AppError::ConfigError(anyhow::Error::new(err))
    }
}

/// Flat view of the environment (`FAL_KEY`, `PROVIDER_URL`, ...).
#[derive(Debug, Deserialize)]
struct ServiceSettings {
    #[serde(default)]
    fal_key: Option<String>,
    #[serde(default = "default_provider_url")]
    provider_url: String,
    #[serde(default = "default_auth_scheme")]
    provider_auth_scheme: String,
    #[serde(default = "default_model")]
    provider_model: String,
    #[serde(default = "default_aspect_ratio")]
    provider_aspect_ratio: String,
    #[serde(default = "default_timeout_secs")]
    provider_timeout_secs: u64,
    #[serde(default = "default_binary_mode")]
    binary_response_mode: String,
    #[serde(default = "default_static_dir")]
    static_dir: String,
    #[serde(default = "default_spa_fallback")]
    spa_fallback: bool,
}

fn default_provider_url() -> String {
    DEFAULT_PROVIDER_URL.to_string()
}

fn default_auth_scheme() -> String {
    "bearer".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_aspect_ratio() -> String {
    DEFAULT_ASPECT_RATIO.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_binary_mode() -> String {
    "data_uri".to_string()
}

fn default_static_dir() -> String {
    DEFAULT_STATIC_DIR.to_string()
}

fn default_spa_fallback() -> bool {
    true
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl VideoProxyConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_sources(&core_config::sources()?)
    }

    pub fn from_sources(sources: &Cfg) -> Result<Self, AppError> {
        let common = core_config::Config::from_sources(sources)?;
        let settings: ServiceSettings = sources.clone().try_deserialize()?;

        if settings.provider_timeout_secs == 0 {
            return Err(InvalidSetting::new("PROVIDER_TIMEOUT_SECS", "0").into());
        }

        Ok(VideoProxyConfig {
            common,
            provider: ProviderConfig {
                api_key: settings.fal_key.and_then(non_empty).map(Secret::new),
                url: non_empty(settings.provider_url),
                auth_scheme: settings.provider_auth_scheme.parse()?,
                model: settings.provider_model,
                aspect_ratio: settings.provider_aspect_ratio,
                timeout: Duration::from_secs(settings.provider_timeout_secs),
                binary_policy: settings.binary_response_mode.parse()?,
            },
            assets: AssetConfig {
                static_dir: PathBuf::from(settings.static_dir),
                spa_fallback: settings.spa_fallback,
            },
        })
    }
}
