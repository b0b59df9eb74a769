use axum::body::Body;
use axum::http::Request;
use http_body_util::BodyExt;
use kennel_core::models::RolePermissions;
use kennel_core::KennelConfig;
use kennel_server::{build, config, Server};
use serde_json::{json, Value};
use tower::ServiceExt;

const API_KEY: &str = "test-api-key";
const PATH: &str = "/auth/api/create-user-and-workspace";

fn test_config() -> KennelConfig {
    config::defaults()
        .with("auth.api_keys", API_KEY)
        .with("auth.jwt.secret", "0123456789abcdef0123456789abcdef")
        .with("bootstrap.support_email", "help@acme.dev")
}

async fn server() -> Server {
    build(&test_config()).await.unwrap()
}

fn create_request(api_key: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(PATH)
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn valid_body() -> String {
    json!({
        "email": "jane@acme.dev",
        "firstName": "Jane",
        "lastName": "Doe",
        "picture": "https://cdn.acme.dev/jane.png",
        "locale": "en",
        "workspaceName": "Acme"
    })
    .to_string()
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_ok() {
    let res = server()
        .await
        .router()
        .oneshot(Request::builder().method("GET").uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(std::str::from_utf8(&bytes).unwrap(), "ok");
}

#[tokio::test]
async fn missing_api_key_is_401() {
    let res = server()
        .await
        .router()
        .oneshot(create_request(None, &valid_body()))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 401);
    let body = json_body(res).await;
    assert_eq!(body["name"], "NotAuthenticated");
    assert_eq!(body["className"], "not-authenticated");
}

#[tokio::test]
async fn wrong_api_key_is_403_and_creates_nothing() {
    let server = server().await;
    let res = server
        .router()
        .oneshot(create_request(Some("nope"), &valid_body()))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 403);
    assert!(server.store.snapshot().await.workspaces.is_empty());
}

#[tokio::test]
async fn invalid_fields_are_422() {
    let body = json!({
        "email": "jane",
        "firstName": "Jane",
        "lastName": "Doe",
        "workspaceName": ""
    })
    .to_string();

    let res = server()
        .await
        .router()
        .oneshot(create_request(Some(API_KEY), &body))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 422);
    let body = json_body(res).await;
    assert_eq!(body["name"], "Unprocessable");
    assert_eq!(body["code"], 422);
    assert!(body["errors"].get("email").is_some());
}

#[tokio::test]
async fn malformed_json_is_400() {
    let res = server()
        .await
        .router()
        .oneshot(create_request(Some(API_KEY), "{\"email\":"))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 400);
    assert_eq!(json_body(res).await["name"], "BadRequest");
}

#[tokio::test]
async fn creates_user_workspace_and_token() {
    let server = server().await;
    let res = server
        .router()
        .oneshot(create_request(Some(API_KEY), &valid_body()))
        .await
        .unwrap();

    assert_eq!(res.status().as_u16(), 200);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;

    let token = body["apiToken"].as_str().unwrap();
    let claims = server.issuer.verify(token).unwrap();
    assert_eq!(claims.workspace_id.to_string(), body["workspaceId"].as_str().unwrap());

    let subdomain_url = body["workspaceUrls"]["subdomainUrl"].as_str().unwrap();
    assert!(subdomain_url.starts_with("https://ws-"));
    assert!(subdomain_url.ends_with(".kennel.dev/"));
    assert!(body["workspaceUrls"].get("customUrl").is_none());

    let expires_at: chrono::DateTime<chrono::Utc> =
        serde_json::from_value(body["expiresAt"].clone()).unwrap();
    let remaining = expires_at - chrono::Utc::now();
    assert!(remaining > chrono::Duration::days(5 * 365 - 1));
    assert!(remaining <= chrono::Duration::days(5 * 365));

    let state = server.store.snapshot().await;
    let support = state.user_by_email("help@acme.dev").unwrap();
    let workspace = state.workspaces.values().next().unwrap();
    assert!(state.membership_of(workspace.id, support.id).is_some());
    let member = state.role_by_label(workspace.id, "Member").unwrap();
    assert_eq!(member.permissions, RolePermissions::restricted_member());
}

#[tokio::test]
async fn duplicate_sign_up_is_409() {
    let server = server().await;
    let router = server.router();

    let first = router
        .clone()
        .oneshot(create_request(Some(API_KEY), &valid_body()))
        .await
        .unwrap();
    assert_eq!(first.status().as_u16(), 200);

    let second = router
        .oneshot(create_request(Some(API_KEY), &valid_body()))
        .await
        .unwrap();
    assert_eq!(second.status().as_u16(), 409);
    assert_eq!(json_body(second).await["name"], "Conflict");
}

#[tokio::test]
async fn build_fails_without_jwt_secret_or_keys() {
    let no_secret = config::defaults().with("auth.api_keys", API_KEY);
    assert!(build(&no_secret).await.is_err());

    let no_keys = config::defaults().with("auth.jwt.secret", "0123456789abcdef0123456789abcdef");
    assert!(build(&no_keys).await.is_err());
}
