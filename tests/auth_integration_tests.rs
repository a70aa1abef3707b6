mod common;

use axum::{
    extract::FromRequestParts,
    http::{Method, Request, StatusCode, Uri, header, request::Parts},
};
use common::*;
use devcamper_api::{
    AppState,
    auth::{AuthUser, Claims},
    config::{AppConfig, Env},
    error::AppError,
    models::Role,
    storage::MockStorageService,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "auth-tests-secret-value";

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize
}

/// Signs a token for `sub` that expires `ttl_secs` from now (negative for the past).
fn create_token(sub: Uuid, ttl_secs: i64, secret: &str) -> String {
    let iat = now();
    let claims = Claims {
        sub,
        iat,
        exp: (iat as i64 + ttl_secs) as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to encode test token")
}

fn create_app_state(env: Env) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    test_context_with_config(seeded_repo(), MockStorageService::new(), boston(), config).state
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(token: &str) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
    parts
}

fn with_bypass(user_id: Uuid) -> Parts {
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        header::HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
    parts
}

fn assert_unauthorized(result: Result<AuthUser, AppError>) {
    let err = result.expect_err("extraction should be rejected");
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

// --- Tests ---

#[tokio::test]
async fn test_auth_success_with_valid_jwt() {
    let state = create_app_state(Env::Production);
    let mut parts = with_bearer(&create_token(PUBLISHER_ID, 3600, TEST_JWT_SECRET));

    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(user.id, PUBLISHER_ID);
    assert_eq!(user.role, Role::Publisher);
}

#[tokio::test]
async fn test_role_comes_from_user_record() {
    let state = create_app_state(Env::Production);
    let mut parts = with_bearer(&create_token(ADMIN_ID, 3600, TEST_JWT_SECRET));

    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert!(user.is_admin());
}

#[tokio::test]
async fn test_auth_failure_with_missing_header() {
    let state = create_app_state(Env::Production);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_auth_failure_with_non_bearer_scheme() {
    let state = create_app_state(Env::Production);
    let token = create_token(PUBLISHER_ID, 3600, TEST_JWT_SECRET);
    let mut parts = get_request_parts(Method::GET, "/".parse().unwrap());
    parts.headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Token {}", token)).unwrap(),
    );

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_auth_failure_with_expired_jwt() {
    let state = create_app_state(Env::Production);
    // Well past the validator's default leeway.
    let mut parts = with_bearer(&create_token(PUBLISHER_ID, -3600, TEST_JWT_SECRET));

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_auth_failure_with_wrong_secret() {
    let state = create_app_state(Env::Production);
    let mut parts = with_bearer(&create_token(PUBLISHER_ID, 3600, "some-other-secret"));

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_auth_failure_for_unknown_user() {
    let state = create_app_state(Env::Production);
    let mut parts = with_bearer(&create_token(Uuid::new_v4(), 3600, TEST_JWT_SECRET));

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_local_bypass_success() {
    let state = create_app_state(Env::Local);
    let mut parts = with_bypass(ADMIN_ID);

    let user = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap();

    assert_eq!(user.id, ADMIN_ID);
    assert_eq!(user.role, Role::Admin);
}

#[tokio::test]
async fn test_local_bypass_unknown_user_falls_through() {
    let state = create_app_state(Env::Local);
    let mut parts = with_bypass(Uuid::new_v4());

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let state = create_app_state(Env::Production);
    let mut parts = with_bypass(ADMIN_ID);

    assert_unauthorized(AuthUser::from_request_parts(&mut parts, &state).await);
}

// --- Role Gate & Ownership ---

#[test]
fn test_authorize_role_gate() {
    assert!(publisher().authorize(&[Role::Publisher, Role::Admin]).is_ok());
    assert!(admin().authorize(&[Role::Publisher, Role::Admin]).is_ok());

    let err = plain_user()
        .authorize(&[Role::Publisher, Role::Admin])
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        err.to_string(),
        "User role user is not authorized to access this route"
    );
}

#[test]
fn test_ensure_can_modify() {
    let bootcamp = sample_bootcamp(PUBLISHER_ID);

    assert!(publisher().ensure_can_modify(&bootcamp, "update").is_ok());
    assert!(admin().ensure_can_modify(&bootcamp, "delete").is_ok());

    let err = other_publisher()
        .ensure_can_modify(&bootcamp, "delete")
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!(
            "User {} is not authorized to delete this bootcamp",
            OTHER_PUBLISHER_ID
        )
    );
}

// --- Lookup Failures ---

fn failing_lookup_state(env: Env) -> AppState {
    let config = AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    };
    test_context_with_config(
        seeded_repo().failing_user_lookup(),
        MockStorageService::new(),
        boston(),
        config,
    )
    .state
}

#[tokio::test]
async fn test_user_lookup_failure_is_server_error() {
    let state = failing_lookup_state(Env::Production);
    let mut parts = with_bearer(&create_token(PUBLISHER_ID, 3600, TEST_JWT_SECRET));

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_bypass_lookup_failure_is_server_error() {
    let state = failing_lookup_state(Env::Local);
    let mut parts = with_bypass(PUBLISHER_ID);

    let err = AuthUser::from_request_parts(&mut parts, &state)
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
