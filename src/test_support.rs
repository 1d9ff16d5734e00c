//! Router and fixtures shared by handler tests.

use std::sync::{Arc, OnceLock};

use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue, Request, Response, StatusCode},
    Router,
};
use time::OffsetDateTime;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{jwt::JwtKeys, password::hash_password},
    state::AppState,
    users::{
        memory::MemoryUserRepository,
        repo::UserRepository,
        repo_types::{NewUserRecord, User},
    },
};

pub struct TestApp {
    pub app: Router,
    pub users: Arc<MemoryUserRepository>,
    pub state: AppState,
}

pub fn test_app() -> TestApp {
    let users = Arc::new(MemoryUserRepository::new());
    let state = AppState::fake(users.clone());
    TestApp {
        app: build_app(state.clone()),
        users,
        state,
    }
}

pub async fn seed_user(
    users: &MemoryUserRepository,
    username: &str,
    email: &str,
    password: &str,
) -> User {
    insert(users, username, email, password, OffsetDateTime::now_utc()).await
}

pub async fn seed_user_at(
    users: &MemoryUserRepository,
    username: &str,
    email: &str,
    created_at: OffsetDateTime,
) -> User {
    insert(users, username, email, "Fakepassword", created_at).await
}

/// Argon2 is slow in debug builds; the common fixture password is hashed once.
fn hash_fixture(password: &str) -> String {
    static FAKE_HASH: OnceLock<String> = OnceLock::new();
    if password == "Fakepassword" {
        return FAKE_HASH
            .get_or_init(|| hash_password(password).expect("hash"))
            .clone();
    }
    hash_password(password).expect("hash")
}

async fn insert(
    users: &MemoryUserRepository,
    username: &str,
    email: &str,
    password: &str,
    created_at: OffsetDateTime,
) -> User {
    users
        .insert(NewUserRecord {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: hash_fixture(password),
            is_active: true,
            is_superuser: true,
            created_at,
            updated_at: None,
        })
        .await
        .expect("seed user")
}

pub fn token_for(state: &AppState, user: &User) -> String {
    JwtKeys::new(&state.config.jwt)
        .sign(user.id)
        .expect("sign token")
}

pub fn bearer(token: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    );
    headers
}

pub fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn send_raw(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.expect("router is infallible")
}

/// Status plus the JSON body (`Null` when the body is empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = send_raw(app, request).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, body)
}
