#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use rostra::modules::users::registration::{IdentifierIssuer, RegistrationService};
use rostra::router::init_router;
use rostra::state::AppState;
use rostra_config::{CorsConfig, IdAllocationConfig, IdStrategy, JwtConfig};
use rostra_models::{CreateUserDto, UserRole, UserWithProfile};
use serde_json::{Value, json};
use sqlx::PgPool;
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

pub fn test_jwt_config() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".to_string(),
        access_token_expiry: 3600,
    }
}

pub fn issuer(strategy: IdStrategy) -> IdentifierIssuer {
    IdentifierIssuer::from_config(IdAllocationConfig {
        strategy,
        max_attempts: 10,
        lock_timeout: Duration::from_secs(2),
        backoff: Duration::from_millis(5),
    })
}

pub fn test_state(pool: PgPool, strategy: IdStrategy) -> AppState {
    AppState {
        db: pool,
        jwt_config: test_jwt_config(),
        cors_config: CorsConfig::from_env(),
        ids: issuer(strategy),
    }
}

pub fn setup_test_app(pool: PgPool) -> Router {
    init_router(test_state(pool, IdStrategy::Counter), None)
}

pub fn generate_unique_email() -> String {
    format!("test-{}@test.com", Uuid::new_v4())
}

pub fn create_dto(email: &str, password: &str, role: UserRole) -> CreateUserDto {
    CreateUserDto {
        name: "Test User".to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role,
        department: None,
        specialization: None,
        course: None,
        year_level: None,
        section: None,
    }
}

/// Registers a user directly through the service, bypassing HTTP.
pub async fn create_test_user(
    state: &AppState,
    email: &str,
    password: &str,
    role: UserRole,
) -> UserWithProfile {
    RegistrationService::register(&state.db, &state.ids, create_dto(email, password, role))
        .await
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, body)
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": email, "password": password }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["access_token"].as_str().unwrap().to_string()
}
