use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use x402_search_proxy::{AppState, config::ProxyConfig, router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "x402_search_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProxyConfig::from_env()?;
    if config.api_key().is_none() {
        tracing::warn!("SEARCH_API_KEY is not set, every search will fail with a configuration error");
    }

    tracing::info!(
        bind = %config.bind,
        upstream = %config.upstream_url,
        network = %config.expected_network,
        timeout_secs = config.upstream_timeout.as_secs(),
        "Starting search proxy"
    );

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, router(AppState::new(config))).await?;

    Ok(())
}
