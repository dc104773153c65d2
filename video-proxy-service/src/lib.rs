pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use crate::config::VideoProxyConfig;
use crate::services::GenerationProxy;
use std::sync::Arc;

/// Read-only state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VideoProxyConfig>,
    pub proxy: GenerationProxy,
}

impl AppState {
    pub fn new(config: VideoProxyConfig, proxy: GenerationProxy) -> Self {
        Self {
            config: Arc::new(config),
            proxy,
        }
    }
}
