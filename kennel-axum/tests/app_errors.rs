use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, Request};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use kennel_auth::{ApiKeyGuard, ApiKeyOptions};
use kennel_axum::{map_json_rejection, AxumApp, KennelAxumError};
use kennel_core::errors::KennelError;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn echo(body: Result<Json<Value>, JsonRejection>) -> Result<Json<Value>, KennelAxumError> {
    let Json(body) = body.map_err(map_json_rejection)?;
    Ok(Json(body))
}

async fn unprocessable() -> Result<Json<Value>, KennelAxumError> {
    Err(KennelError::unprocessable("Invalid")
        .with_errors(json!({"title": ["required"]}))
        .into())
}

async fn boom() -> Result<Json<Value>, KennelAxumError> {
    Err(anyhow::anyhow!("database password is hunter2").into())
}

fn guard() -> ApiKeyGuard {
    ApiKeyGuard::new(&ApiKeyOptions {
        header_name: "X-API-Key".to_string(),
        keys: vec!["secret-key".to_string()],
    })
}

fn app() -> Router {
    let api = Router::new()
        .route("/echo", post(echo))
        .route("/invalid", post(unprocessable))
        .route("/boom", post(boom));

    AxumApp::new()
        .use_get("/health", || async { "ok" })
        .use_router("/open", api.clone())
        .protected("/locked", api, guard())
        .unwrap()
        .into_router()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn malformed_json_returns_bad_request() {
    let res = app().oneshot(post_json("/open/echo", "{\"title\":\"x\"")).await.unwrap();

    assert_eq!(res.status().as_u16(), 400);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["name"], "BadRequest");
    assert_eq!(body["code"], 400);
    assert_eq!(body["className"], "bad-request");
    assert!(body["errors"]["_schema"].is_array());
}

#[tokio::test]
async fn request_id_is_preserved_when_provided() {
    let provided = HeaderValue::from_static("req-test-123");
    let mut req = post_json("/open/echo", "{\"title\":\"ok\"}");
    req.headers_mut().insert("x-request-id", provided.clone());

    let res = app().oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers().get("x-request-id").unwrap(), &provided);
}

#[tokio::test]
async fn kennel_error_preserves_status_and_shape() {
    let res = app().oneshot(post_json("/open/invalid", "{}")).await.unwrap();

    assert_eq!(res.status().as_u16(), 422);
    let body = json_body(res).await;
    assert_eq!(body["name"], "Unprocessable");
    assert_eq!(body["className"], "unprocessable");
    assert_eq!(body["errors"], json!({"title": ["required"]}));
}

#[tokio::test]
async fn other_errors_become_opaque_general_errors() {
    let res = app().oneshot(post_json("/open/boom", "{}")).await.unwrap();

    assert_eq!(res.status().as_u16(), 500);
    let body = json_body(res).await;
    assert_eq!(body["name"], "GeneralError");
    assert_eq!(body["className"], "general-error");
    assert!(!body["message"].as_str().unwrap().contains("hunter2"));
}

#[tokio::test]
async fn protected_routes_require_the_api_key() {
    let res = app().oneshot(post_json("/locked/echo", "{}")).await.unwrap();
    assert_eq!(res.status().as_u16(), 401);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotAuthenticated");
    assert_eq!(body["message"], "Missing API key");

    let mut req = post_json("/locked/echo", "{}");
    req.headers_mut().insert("x-api-key", HeaderValue::from_static("wrong"));
    let res = app().oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 403);
    assert_eq!(json_body(res).await["message"], "Invalid API key");

    let mut req = post_json("/locked/echo", "{\"a\":1}");
    req.headers_mut().insert("x-api-key", HeaderValue::from_static("secret-key"));
    let res = app().oneshot(req).await.unwrap();
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(json_body(res).await, json!({"a": 1}));
}

#[tokio::test]
async fn health_is_open_and_unknown_paths_are_json_404s() {
    let res = app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);

    let res = app()
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
    assert_eq!(json_body(res).await["name"], "NotFound");
}
