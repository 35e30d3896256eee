#![allow(dead_code)]

/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - In-memory store wiring (no Redis needed)
/// - Request builders and response decoding
/// - User registration shortcuts

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use kvtodo_api::app::{build_router, AppState};
use kvtodo_api::config::{ApiConfig, Config, JwtConfig};
use kvtodo_shared::auth::password::HashParams;
use kvtodo_shared::store::{KvStore, MemoryStore, RedisConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::Service as _;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: MemoryStore,
    pub app: axum::Router,
    pub config: Config,
}

/// A registered user and its token
pub struct TestUser {
    pub user_id: String,
    pub token: String,
}

impl TestUser {
    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        redis: RedisConfig::local(),
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            expiration_hours: 24,
        },
        password: HashParams::minimal(),
    }
}

impl TestContext {
    /// Creates a new test context over an empty in-memory store
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let config = test_config();
        let state = AppState::new(Arc::new(store.clone()) as Arc<dyn KvStore>, &config)
            .expect("test config is valid");
        let app = build_router(state);

        Self { store, app, config }
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().call(request).await.unwrap()
    }

    /// Sends a JSON request, optionally with a bearer token
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = self
            .send(builder.body(Body::from(body.to_string())).unwrap())
            .await;
        read_json(response).await
    }

    /// Sends a GET request, optionally with a bearer token
    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = self.send(builder.body(Body::empty()).unwrap()).await;
        read_json(response).await
    }

    /// Registers a user and returns its id and token
    pub async fn register(&self, username: &str, password: &str) -> TestUser {
        let (status, body) = self
            .json(
                "POST",
                "/api/auth/register",
                None,
                json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        TestUser {
            user_id: body["user_id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a task for `user` and returns the response body
    pub async fn create_task(&self, user: &TestUser, task: &str) -> Value {
        let (status, body) = self
            .json(
                "POST",
                "/api/todo",
                Some(&user.token),
                json!({ "task": task, "userId": user.user_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create failed: {}", body);
        body
    }
}

/// Decodes a response body as JSON (`Value::Null` for an empty body)
pub async fn read_json(response: Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            panic!("non-JSON body: {}", String::from_utf8_lossy(&body))
        })
    };
    (status, value)
}
