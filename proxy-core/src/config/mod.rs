use crate::error::AppError;
use config::{Config as Cfg, Environment, File};
use serde::Deserialize;

/// Settings shared by every service binary.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector endpoint; trace export is disabled when unset or empty.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

fn default_port() -> u16 {
    8787
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Collect the raw configuration sources: `.env`, an optional
/// `configuration.*` file, then plain environment variables (`PORT`, `FAL_KEY`, ...).
///
/// Services deserialize their own settings from the returned value so that
/// every source is read exactly once at startup.
pub fn sources() -> Result<Cfg, AppError> {
    dotenvy::dotenv().ok();

    let config = Cfg::builder()
        .add_source(File::with_name("configuration").required(false))
        .add_source(Environment::default())
        .build()?;

    Ok(config)
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Self::from_sources(&sources()?)
    }

    pub fn from_sources(config: &Cfg) -> Result<Self, AppError> {
        Ok(config.clone().try_deserialize()?)
    }

    pub fn otlp_endpoint(&self) -> Option<&str> {
        self.otlp_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|endpoint| !endpoint.is_empty())
    }
}
