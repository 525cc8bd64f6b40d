use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy::signers::local::PrivateKeySigner;
use axum::{
    Json, Router,
    body::Body,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use http::{
    HeaderMap, Request, StatusCode,
    header::{ACCESS_CONTROL_EXPOSE_HEADERS, AUTHORIZATION, CONTENT_TYPE, ORIGIN},
};
use bytes::Bytes;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use x402_search_client::{client::SearchClient, transport::ReqwestTransport};
use x402_search_core::{
    search::SearchRequest,
    transport::{DecodedPayment, X_PAYMENT, X_PAYMENT_RESPONSE},
    types::Base64EncodedHeader,
};
use x402_search_proxy::{AppState, config::ProxyConfig, router};

const API_KEY: &str = "fc-test-secret";
const PAY_TO: &str = "0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20";
const USDC_BASE: &str = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913";
const TX_HASH: &str = "0x8f5e2b0c4d6a1e3f7b9c2d4e6f8a0b1c3d5e7f9a2b4c6d8e0f1a3b5c7d9e1f2a";

#[derive(Clone, Copy)]
enum Behavior {
    /// 402 without a payment, results with one.
    Paywall,
    /// Always answer with this status and raw body.
    Fixed(u16, &'static str),
    /// Never answer in time.
    Hang,
}

/// What the provider received.
struct Seen {
    headers: HeaderMap,
    body: Value,
}

/// A fake search provider listening on a local port.
#[derive(Clone)]
struct Provider {
    behavior: Behavior,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Provider {
    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn body(&self, call: usize) -> Value {
        self.seen.lock().unwrap()[call].body.clone()
    }

    fn header(&self, call: usize, name: &str) -> Option<String> {
        self.seen.lock().unwrap()[call]
            .headers
            .get(name)
            .map(|value| value.to_str().unwrap().to_string())
    }
}

fn challenge() -> Value {
    json!({
        "x402Version": 1,
        "error": "X-PAYMENT header is required",
        "accepts": [{
            "scheme": "exact",
            "network": "base",
            "maxAmountRequired": "10000",
            "payTo": PAY_TO,
            "asset": USDC_BASE,
            "maxTimeoutSeconds": 60,
            "resource": "https://api.firecrawl.dev/v2/x402/search",
            "extra": { "name": "USD Coin", "version": "2" }
        }]
    })
}

fn results() -> Value {
    json!({
        "success": true,
        "data": {
            "web": [
                { "url": "https://www.x402.org", "title": "x402" },
                { "url": "https://github.com/coinbase/x402", "title": "coinbase/x402" },
                { "url": "https://eips.ethereum.org/EIPS/eip-3009", "title": "EIP-3009" }
            ]
        }
    })
}

async fn provide(
    State(provider): State<Provider>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let paid = headers.contains_key(X_PAYMENT);
    provider.seen.lock().unwrap().push(Seen { headers, body });

    match provider.behavior {
        Behavior::Paywall if paid => {
            let settlement = Base64EncodedHeader::encode(&json!({
                "success": true,
                "transaction": TX_HASH,
                "network": "base",
                "payer": "0x1111111111111111111111111111111111111111"
            }))
            .unwrap();
            (
                StatusCode::OK,
                [(X_PAYMENT_RESPONSE, settlement.0)],
                Json(results()),
            )
                .into_response()
        }
        Behavior::Paywall => (StatusCode::PAYMENT_REQUIRED, Json(challenge())).into_response(),
        Behavior::Fixed(status, body) => {
            (StatusCode::from_u16(status).unwrap(), body).into_response()
        }
        Behavior::Hang => {
            tokio::time::sleep(Duration::from_secs(5)).await;
            StatusCode::OK.into_response()
        }
    }
}

async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

async fn spawn_provider(behavior: Behavior) -> (Provider, String) {
    let provider = Provider {
        behavior,
        seen: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/v2/x402/search", post(provide))
        .with_state(provider.clone());
    let addr = serve(app).await;
    (provider, format!("http://{addr}/v2/x402/search"))
}

fn proxy(upstream_url: &str, api_key: Option<&str>) -> Router {
    let config = ProxyConfig::builder()
        .upstream_url(upstream_url.parse().unwrap())
        .maybe_api_key(api_key)
        .upstream_timeout(Duration::from_secs(1))
        .build();
    router(AppState::new(config))
}

fn search_request() -> http::request::Builder {
    Request::post("/search").header(CONTENT_TYPE, "application/json")
}

async fn call_raw(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes)
}

async fn call(app: Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let (status, headers, bytes) = call_raw(app, request).await;
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

async fn post_search(app: Router, body: Value) -> (StatusCode, HeaderMap, Value) {
    let request = search_request()
        .body(Body::from(body.to_string()))
        .unwrap();
    call(app, request).await
}

#[tokio::test]
async fn clamps_and_defaults_before_forwarding() {
    let (provider, url) = spawn_provider(Behavior::Paywall).await;

    let (status, _, _) = post_search(proxy(&url, Some(API_KEY)), json!({ "query": "x402", "limit": 100 })).await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(provider.calls(), 1);
    assert_eq!(
        provider.body(0),
        json!({ "query": "x402", "limit": 30, "sources": ["web"] })
    );
    assert_eq!(
        provider.header(0, AUTHORIZATION.as_str()).as_deref(),
        Some("Bearer fc-test-secret")
    );
    assert_eq!(provider.header(0, X_PAYMENT), None);
}

#[tokio::test]
async fn oversized_and_fractional_limits_are_clamped() {
    let (provider, url) = spawn_provider(Behavior::Paywall).await;
    let app = proxy(&url, Some(API_KEY));

    for body in [
        r#"{"query":"x402","limit":99999999999999999999}"#,
        r#"{"query":"x402","limit":100.0}"#,
        r#"{"query":"x402","limit":1e3}"#,
    ] {
        let request = search_request().body(Body::from(body)).unwrap();
        let (status, _, _) = call(app.clone(), request).await;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED, "body: {body}");
    }

    assert_eq!(provider.calls(), 3);
    for call in 0..3 {
        assert_eq!(provider.body(call)["limit"], 30);
    }
}

#[tokio::test]
async fn invalid_requests_never_reach_the_provider() {
    let (provider, url) = spawn_provider(Behavior::Paywall).await;

    let (status, _, body) = post_search(proxy(&url, Some(API_KEY)), json!({ "query": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Query is required");
    assert_eq!(body["kind"], "ValidationError");

    let request = search_request()
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, _, body) = call(proxy(&url, Some(API_KEY)), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid JSON body");
    assert_eq!(body["status"], 400);

    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_error() {
    let (provider, url) = spawn_provider(Behavior::Paywall).await;

    let (status, _, body) = post_search(proxy(&url, None), json!({ "query": "x402" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Search provider API key not configured");
    assert_eq!(body["kind"], "ConfigurationError");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn relays_challenge_verbatim() {
    const CHALLENGE: &str = r#"{ "accepts": [{"scheme":"exact","network":"base","maxAmountRequired":"10000","payTo":"0x3CB9B3bBfde8501f411bB69Ad3DC07908ED0dE20","asset":"USDC","vendorField": 1.50}],
  "error": "X-PAYMENT header is required", "x402Version": 1 }"#;
    let (_, url) = spawn_provider(Behavior::Fixed(402, CHALLENGE)).await;

    let request = search_request()
        .body(Body::from(json!({ "query": "x402" }).to_string()))
        .unwrap();
    let (status, headers, body) = call_raw(proxy(&url, Some(API_KEY)), request).await;

    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    assert_eq!(body, Bytes::from_static(CHALLENGE.as_bytes()));
}

#[tokio::test]
async fn forwards_payment_untouched_and_exposes_confirmation() {
    let (provider, url) = spawn_provider(Behavior::Paywall).await;
    let app = proxy(&url, Some(API_KEY));

    let request = search_request()
        .header(X_PAYMENT, "opaque-payment-token")
        .header(ORIGIN, "http://localhost:3000")
        .body(Body::from(json!({ "query": "x402" }).to_string()))
        .unwrap();
    let (status, headers, body) = call(app.clone(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, results());
    assert_eq!(
        provider.header(0, X_PAYMENT).as_deref(),
        Some("opaque-payment-token")
    );

    let confirmation = Base64EncodedHeader(
        headers
            .get(X_PAYMENT_RESPONSE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string(),
    );
    let settlement: Value = confirmation.decode().unwrap();
    assert_eq!(settlement["transaction"], TX_HASH);

    let exposed = headers
        .get_all(ACCESS_CONTROL_EXPOSE_HEADERS)
        .iter()
        .map(|value| value.to_str().unwrap().to_lowercase())
        .collect::<Vec<_>>()
        .join(",");
    assert!(exposed.contains("x-payment-response"), "exposed: {exposed}");
    assert!(headers.contains_key("x-request-id"));

    // A payment belongs to one request only.
    let (status, _, _) = post_search(app, json!({ "query": "x402" })).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(provider.calls(), 2);
    assert_eq!(provider.header(1, X_PAYMENT), None);
}

#[tokio::test]
async fn provider_errors_are_wrapped() {
    let (_, url) = spawn_provider(Behavior::Fixed(503, r#"{"error":"overloaded"}"#)).await;

    let (status, _, body) = post_search(proxy(&url, Some(API_KEY)), json!({ "query": "x402" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Search provider server error");
    assert_eq!(body["kind"], "ProviderError");
    assert_eq!(body["details"]["upstreamStatus"], 503);
    assert_eq!(body["details"]["body"], json!({ "error": "overloaded" }));
}

#[tokio::test]
async fn echoed_credentials_are_scrubbed_from_json_errors() {
    let (_, url) =
        spawn_provider(Behavior::Fixed(401, r#"{"error":"Invalid API key: fc-test-secret"}"#)).await;

    let request = search_request()
        .body(Body::from(json!({ "query": "x402" }).to_string()))
        .unwrap();
    let (status, _, body) = call_raw(proxy(&url, Some(API_KEY)), request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let text = String::from_utf8_lossy(&body);
    assert!(!text.contains(API_KEY), "body: {text}");

    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["details"]["upstreamStatus"], 401);
    assert_eq!(body["details"]["body"]["error"], "Invalid API key: [REDACTED]");
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let url = format!("http://{addr}/v2/x402/search");

    let (status, _, body) = post_search(proxy(&url, Some(API_KEY)), json!({ "query": "x402" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Could not reach search provider");
    assert_eq!(body["kind"], "TransportError");
    assert_eq!(body["details"]["upstreamUrl"], url);
    assert!(!body.to_string().contains(API_KEY));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let (_, url) = spawn_provider(Behavior::Hang).await;

    let (status, _, body) = post_search(proxy(&url, Some(API_KEY)), json!({ "query": "x402" })).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "TransportError");
    assert_eq!(body["details"]["cause"], "timeout");
    assert_eq!(body["details"]["timeoutSecs"], 1);
}

#[tokio::test]
async fn scrape_alias_and_health() {
    let (provider, url) = spawn_provider(Behavior::Paywall).await;
    let app = proxy(&url, Some(API_KEY));

    let request = Request::post("/scrape")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "query": "x402" }).to_string()))
        .unwrap();
    let (status, _, _) = call(app.clone(), request).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(provider.calls(), 1);

    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, _, body) = call(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn client_pays_through_the_proxy() {
    let (provider, url) = spawn_provider(Behavior::Paywall).await;
    let proxy_addr = serve(proxy(&url, Some(API_KEY))).await;

    let client = SearchClient::builder()
        .transport(ReqwestTransport::default())
        .endpoint(format!("http://{proxy_addr}/search").parse().unwrap())
        .build();
    let signer = PrivateKeySigner::random();
    let request = SearchRequest::builder().query("x402 protocol").limit(3).build();

    let success = client.search(&request, &signer).await.unwrap();

    assert_eq!(success.response.data.web.len(), 3);
    assert_eq!(
        success.transaction_url().as_deref(),
        Some(format!("https://basescan.org/tx/{TX_HASH}").as_str())
    );

    assert_eq!(provider.calls(), 2);
    assert_eq!(provider.body(0), provider.body(1));
    assert_eq!(provider.header(0, X_PAYMENT), None);

    let payment = DecodedPayment::decode(&provider.header(1, X_PAYMENT).unwrap()).unwrap();
    let authorization = payment.authorization().unwrap();
    assert_eq!(payment.network.as_deref(), Some("base"));
    assert_eq!(
        authorization.from.as_deref().map(str::to_lowercase),
        Some(signer.address().to_string().to_lowercase())
    );
    assert_eq!(
        authorization.to.as_deref().map(str::to_lowercase),
        Some(PAY_TO.to_lowercase())
    );
}
