use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http::{
    HeaderMap, HeaderValue, StatusCode,
    header::{ACCESS_CONTROL_EXPOSE_HEADERS, CONTENT_TYPE},
};
use serde_json::json;
use x402_search_core::{
    search::SearchRequest,
    transport::{X_PAYMENT, X_PAYMENT_RESPONSE},
    types::AnyJson,
};

use crate::{
    AppState,
    errors::ProxyError,
    observability::{log_challenge, log_payment, log_success},
    upstream::UpstreamResponse,
};

/// Forward one search to the provider.
///
/// The caller's `X-PAYMENT` header is passed through untouched, a `402` is relayed verbatim so the
/// caller can pay, and a `200` is relayed with its `X-PAYMENT-RESPONSE`.
pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let request: SearchRequest =
        serde_json::from_slice(&body).map_err(|err| ProxyError::InvalidBody(err.to_string()))?;
    let upstream_request = request
        .normalize()
        .map_err(|_| ProxyError::MissingQuery)?;

    let api_key = state.config.api_key().ok_or(ProxyError::MissingApiKey)?;

    let payment = headers.get(X_PAYMENT);
    match payment {
        Some(header) => log_payment(
            header,
            &state.config.expected_network,
            state.config.expected_asset.as_deref(),
        ),
        None => tracing::info!("No payment attached, expecting a 402"),
    }
    tracing::info!(
        query_len = upstream_request.query.len(),
        limit = upstream_request.limit,
        sources = ?upstream_request.sources,
        "Forwarding search"
    );

    let upstream = state
        .upstream
        .search(api_key, &upstream_request, payment)
        .await
        .map_err(|err| ProxyError::UpstreamUnreachable {
            cause: err.cause(),
            message: api_key.scrub(&err.to_string()),
            upstream_url: state.upstream.url().to_string(),
            timeout_secs: state.upstream.timeout().as_secs(),
        })?;

    relay(upstream, payment, |text| api_key.scrub(text))
}

fn relay(
    upstream: UpstreamResponse,
    payment: Option<&HeaderValue>,
    scrub: impl Fn(&str) -> String,
) -> Result<Response, ProxyError> {
    match upstream.status {
        StatusCode::PAYMENT_REQUIRED => {
            log_challenge(&upstream.body, payment);
            Ok(json_response(StatusCode::PAYMENT_REQUIRED, upstream.body).into_response())
        }
        StatusCode::OK => {
            log_success(&upstream.body, upstream.payment_response.as_ref());
            let mut response = json_response(StatusCode::OK, upstream.body).into_response();
            if let Some(payment_response) = upstream.payment_response {
                let headers = response.headers_mut();
                headers.insert(X_PAYMENT_RESPONSE, payment_response);
                headers.insert(
                    ACCESS_CONTROL_EXPOSE_HEADERS,
                    HeaderValue::from_static(X_PAYMENT_RESPONSE),
                );
            }
            Ok(response)
        }
        status => {
            let body = match serde_json::from_slice::<AnyJson>(&upstream.body) {
                Ok(body) => scrub_json(body, &scrub),
                Err(_) => AnyJson::String(scrub(&String::from_utf8_lossy(&upstream.body))),
            };
            Err(ProxyError::UpstreamStatus { status, body })
        }
    }
}

/// Apply `scrub` to every string of a JSON value, object keys included.
fn scrub_json(value: AnyJson, scrub: &impl Fn(&str) -> String) -> AnyJson {
    match value {
        AnyJson::String(text) => AnyJson::String(scrub(&text)),
        AnyJson::Array(items) => {
            AnyJson::Array(items.into_iter().map(|item| scrub_json(item, scrub)).collect())
        }
        AnyJson::Object(fields) => AnyJson::Object(
            fields
                .into_iter()
                .map(|(key, item)| (scrub(&key), scrub_json(item, scrub)))
                .collect(),
        ),
        other => other,
    }
}

fn json_response(status: StatusCode, body: Bytes) -> impl IntoResponse {
    (status, [(CONTENT_TYPE, "application/json")], body)
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
