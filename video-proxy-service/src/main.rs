use proxy_core::observability::init_tracing;
use video_proxy_service::config::VideoProxyConfig;
use video_proxy_service::services::init_metrics;
use video_proxy_service::startup::Application;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = VideoProxyConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    init_tracing(
        "video-proxy-service",
        &config.common.log_level,
        config.common.otlp_endpoint(),
    );

    if let Err(e) = init_metrics() {
        tracing::warn!(error = %e, "Prometheus recorder not installed");
    }

    let application = Application::build(config).await?;
    application.run_until_stopped().await?;

    Ok(())
}
