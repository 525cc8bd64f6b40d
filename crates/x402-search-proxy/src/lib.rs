//! Pay-per-search proxy.
//!
//! The proxy holds the search provider credential and forwards searches to the provider. It never
//! pays and never inspects payments beyond logging them: the caller's `X-PAYMENT` header is
//! forwarded as is, `402` challenges are relayed so the caller can pay, and settlement
//! confirmations are relayed back in `X-PAYMENT-RESPONSE`.
//!
//! ```no_run
//! use x402_search_proxy::{AppState, config::ProxyConfig, router};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProxyConfig::from_env()?;
//! let listener = tokio::net::TcpListener::bind(config.bind).await?;
//! axum::serve(listener, router(AppState::new(config))).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use http::{HeaderName, Method, header::CONTENT_TYPE};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use x402_search_core::transport::{X_PAYMENT, X_PAYMENT_RESPONSE};

use crate::{
    config::ProxyConfig,
    observability::{X_REQUEST_ID, correlate},
    upstream::UpstreamClient,
};

pub mod config;
pub mod errors;
pub mod handler;
pub mod observability;
pub mod upstream;

/// Shared state of the proxy.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub upstream: UpstreamClient,
}

impl AppState {
    pub fn new(config: ProxyConfig) -> Self {
        let upstream = UpstreamClient::new(&config);
        AppState {
            config: Arc::new(config),
            upstream,
        }
    }
}

/// Routes of the proxy: `POST /search` (and its alias `POST /scrape`) plus `GET /health`.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(X_PAYMENT)])
        .expose_headers([HeaderName::from_static(X_PAYMENT_RESPONSE), X_REQUEST_ID]);

    Router::new()
        .route("/search", post(handler::search))
        .route("/scrape", post(handler::search))
        .route("/health", get(handler::health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(correlate))
        .layer(cors)
}
