//! Router-level tests. The pool is lazy and never reached: every request here is answered
//! before a query would run.

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use storefront::auth::{JwtConfig, JwtService};
use storefront::{app, AppConfig, AppState};
use tower::ServiceExt;

const SECRET: &str = "router-test-secret-with-at-least-32-chars";

fn router() -> Router {
    let pool = PgPoolOptions::new()
        .connect_lazy("postgres://localhost/storefront_unreachable")
        .unwrap();
    app(AppState::new(pool, AppConfig::with_secret(SECRET)).unwrap())
}

async fn send(req: Request<Body>) -> (StatusCode, Value) {
    let res = router().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    for uri in ["/api/auth/me", "/api/users", "/api/orders/my", "/api/admin/reviews", "/api/contacts"] {
        let (status, body) = send(get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(error_code(&body), "unauthorized", "{}", uri);
    }
}

#[tokio::test]
async fn garbage_token_is_invalid() {
    let (status, body) = send(with_bearer("/api/auth/me", "not.a.jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "invalid_token");
}

#[tokio::test]
async fn token_signed_with_another_secret_is_invalid() {
    let other = JwtService::new(JwtConfig {
        secret: "a-completely-different-secret-of-32-chars".into(),
        expiration_hours: 24,
        issuer: "storefront".into(),
    });
    let token = other
        .generate_token("7d1c1f4e-2b8f-4a55-9d0e-0d6a1d3f9b10", "a@example.com", "admin")
        .unwrap();
    let (status, body) = send(with_bearer("/api/users", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "invalid_token");
}

#[tokio::test]
async fn expired_token_is_reported() {
    let expired = JwtService::new(JwtConfig {
        secret: SECRET.into(),
        expiration_hours: -2,
        issuer: "storefront".into(),
    });
    let token = expired
        .generate_token("7d1c1f4e-2b8f-4a55-9d0e-0d6a1d3f9b10", "a@example.com", "store_owner")
        .unwrap();
    let (status, body) = send(with_bearer("/api/auth/me", &token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "token_expired");
}

#[tokio::test]
async fn review_with_bad_email_is_rejected() {
    let req = json_request(
        Method::POST,
        "/api/reviews",
        json!({"storeId": "7d1c1f4e-2b8f-4a55-9d0e-0d6a1d3f9b10", "name": "Ann", "email": "nope", "rating": 4}),
    );
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");
}

#[tokio::test]
async fn review_rating_out_of_range_is_rejected() {
    for rating in [0, 6] {
        let req = json_request(
            Method::POST,
            "/api/reviews",
            json!({"productId": "7d1c1f4e-2b8f-4a55-9d0e-0d6a1d3f9b10", "name": "Ann", "email": "ann@example.com", "rating": rating}),
        );
        let (status, _) = send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "rating {}", rating);
    }
}

#[tokio::test]
async fn review_needs_a_target() {
    let req = json_request(
        Method::POST,
        "/api/reviews",
        json!({"name": "Ann", "email": "ann@example.com"}),
    );
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap().contains("storeId"));
}

#[tokio::test]
async fn contact_without_email_is_rejected() {
    let req = json_request(Method::POST, "/api/contacts", json!({"name": "Ann", "message": "Hello"}));
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "validation_error");
    assert!(body["error"]["message"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn unknown_submission_segment_is_not_found() {
    let req = json_request(Method::POST, "/api/nothing-here", json!({}));
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not_found");
}

#[tokio::test]
async fn malformed_ids_and_bodies_get_the_error_envelope() {
    let (status, body) = send(get("/api/products/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "bad_request");

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "bad_request");
}

#[tokio::test]
async fn register_validates_before_touching_the_database() {
    let req = json_request(
        Method::POST,
        "/api/auth/register",
        json!({"name": "Ann", "email": "ann@example.com", "password": "short"}),
    );
    let (status, _) = send(req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let req = json_request(
        Method::POST,
        "/api/auth/register",
        json!({"name": "Ann", "email": "ann@example.com", "password": "long-enough-password", "role": "admin"}),
    );
    let (status, body) = send(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "forbidden");
}

#[tokio::test]
async fn multipart_routes_answer_with_the_envelope() {
    for uri in ["/api/products", "/api/collections", "/api/sliders", "/api/seo", "/api/stores"] {
        let req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=x")
            .body(Body::from("--x--\r\n"))
            .unwrap();
        let (status, body) = send(req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(error_code(&body), "unauthorized", "{}", uri);
    }
}
