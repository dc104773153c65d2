#![allow(dead_code)]

use proxy_core::config::Config as CoreConfig;
use secrecy::Secret;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use video_proxy_service::config::{
    AssetConfig, AuthScheme, BinaryPolicy, ProviderConfig, VideoProxyConfig,
};
use video_proxy_service::startup::Application;

pub const TEST_API_KEY: &str = "test-fal-key";
pub const PROVIDER_PATH: &str = "/fal/pika-v2.2/video";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

/// Configuration pointing at `provider_base` (a wiremock server), with a short timeout.
pub fn test_config(provider_base: &str) -> VideoProxyConfig {
    VideoProxyConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            log_level: "debug".to_string(),
            otlp_endpoint: None,
        },
        provider: ProviderConfig {
            api_key: Some(Secret::new(TEST_API_KEY.to_string())),
            url: Some(format!("{}{}", provider_base, PROVIDER_PATH)),
            auth_scheme: AuthScheme::Bearer,
            model: "pika-v2.2".to_string(),
            aspect_ratio: "16:9".to_string(),
            timeout: Duration::from_secs(5),
            binary_policy: BinaryPolicy::DataUri,
        },
        assets: AssetConfig {
            static_dir: PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/public")),
            spa_fallback: true,
        },
    }
}

impl TestApp {
    pub async fn spawn(config: VideoProxyConfig) -> Self {
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        TestApp {
            address,
            port,
            client: reqwest::Client::new(),
        }
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn generate(&self, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}/generate", self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }
}
