//! The ingress router around a small application router.

use std::time::Duration;

use axum::{
    body::Body,
    extract::Path,
    http::{Method, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use utoipa::OpenApi;

use api_ingress::{ApiIngress, ApiIngressConfig};

#[utoipa::path(get, path = "/items/{id}", params(("id" = u32, Path)), responses((status = 200)))]
async fn get_item(Path(id): Path<u32>) -> Json<Value> {
    Json(json!({ "id": id }))
}

async fn echo(Json(v): Json<Value>) -> Json<Value> {
    Json(v)
}

#[derive(OpenApi)]
#[openapi(paths(get_item))]
struct ItemsDoc;

fn app_routes() -> Router {
    Router::new()
        .route("/items/{id}", get(get_item))
        .route("/echo", post(echo))
}

fn ingress(cfg: ApiIngressConfig) -> ApiIngress {
    let mut ingress = ApiIngress::new(cfg);
    ingress.add_openapi(ItemsDoc::openapi());
    ingress
}

async fn json_of(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn app_routes_and_health_are_served() {
    let router = ingress(ApiIngressConfig::default())
        .build_router(app_routes())
        .unwrap();

    let resp = router.clone().oneshot(get_req("/items/7")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_of(resp).await["id"], 7);

    let resp = router.oneshot(get_req("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_of(resp).await["status"], "healthy");
}

#[tokio::test]
async fn openapi_document_merges_module_paths() {
    let router = ingress(ApiIngressConfig::default())
        .build_router(app_routes())
        .unwrap();

    let resp = router.oneshot(get_req("/openapi.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let doc = json_of(resp).await;
    assert_eq!(doc["info"]["title"], "Virtual Education API");
    assert!(doc["paths"]["/items/{id}"]["get"].is_object());
}

#[tokio::test]
async fn docs_can_be_disabled() {
    let router = ingress(ApiIngressConfig {
        enable_docs: false,
        ..Default::default()
    })
    .build_router(app_routes())
    .unwrap();

    let resp = router.oneshot(get_req("/openapi.json")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_routes_get_json_404() {
    let router = ingress(ApiIngressConfig::default())
        .build_router(app_routes())
        .unwrap();

    let resp = router
        .oneshot(
            Request::builder()
                .uri("/nope")
                .header("x-request-id", "rid-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = json_of(resp).await;
    assert_eq!(body["code"], 404);
    assert_eq!(body["request_id"], "rid-1");
    assert_eq!(body["error"], "No route for /nope");
}

#[tokio::test]
async fn oversized_bodies_are_rejected() {
    let router = ingress(ApiIngressConfig {
        body_limit_bytes: 16,
        ..Default::default()
    })
    .build_router(app_routes())
    .unwrap();

    let payload = json!({ "padding": "x".repeat(64) }).to_string();
    let resp = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/echo")
                .header("content-type", "application/json")
                .header("content-length", payload.len())
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn serve_stops_on_cancellation() {
    let router = ingress(ApiIngressConfig::default())
        .build_router(app_routes())
        .unwrap();
    let listener = ApiIngress::bind("127.0.0.1:0").await.unwrap();
    let cancel = CancellationToken::new();

    let server = tokio::spawn(ApiIngress::serve(listener, router, cancel.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .expect("server task panicked");
    assert!(result.is_ok());
}
