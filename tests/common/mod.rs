#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use assetrack::auth::{PasswordManager, TokenIssuer};
use assetrack::server::{AppState, create_router};
use assetrack::store::{SqliteStore, Store};
use assetrack::types::{NewUser, Role};

pub const ADMIN_PASSWORD: &str = "admin-secret";
const TEST_SECRET: &str = "integration-test-secret";

/// An in-process server over a throwaway database.
pub struct TestApp {
    _temp_dir: TempDir,
    pub store: Arc<SqliteStore>,
    pub state: Arc<AppState>,
    router: Router,
    pub admin_token: String,
}

pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let store = Arc::new(SqliteStore::new(temp_dir.path().join("test.db")).expect("open db"));
        store.initialize().expect("initialize db");

        let passwords = PasswordManager::new();
        let admin = store
            .create_user(
                &NewUser {
                    username: "admin".to_string(),
                    email: "admin@example.com".to_string(),
                    password_hash: passwords.hash(ADMIN_PASSWORD).expect("hash"),
                    role: Role::Admin,
                    employee_id: None,
                    is_active: true,
                },
                &[],
            )
            .expect("create admin");

        let state = Arc::new(AppState::new(
            store.clone(),
            TokenIssuer::new(TEST_SECRET, 1),
        ));
        let admin_token = state.tokens.issue(&admin).expect("issue admin token");
        let router = create_router(state.clone());

        Self {
            _temp_dir: temp_dir,
            store,
            state,
            router,
            admin_token,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec();
        RawResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a JSON request and parses the JSON reply (`Null` when empty).
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.send(request).await;
        let value = if response.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&response.body).unwrap_or(Value::Null)
        };
        (response.status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Uploads `bytes` as the multipart `file` field.
    pub async fn upload(&self, uri: &str, token: &str, file_name: &str, bytes: &[u8]) -> (StatusCode, Value) {
        let boundary = "assetrack-test-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("build upload");

        let response = self.send(request).await;
        let value = serde_json::from_slice(&response.body).unwrap_or(Value::Null);
        (response.status, value)
    }

    /// Creates a non-admin user through the API and returns its id and a
    /// fresh token.
    pub async fn create_user(&self, username: &str, permissions: Value) -> (i64, String) {
        let (status, body) = self
            .post(
                "/api/v1/users",
                &self.admin_token,
                serde_json::json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "password123",
                    "permissions": permissions,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user: {body}");
        let id = body["data"]["id"].as_i64().expect("user id");

        let (status, body) = self
            .request(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(serde_json::json!({"username": username, "password": "password123"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login: {body}");
        let token = body["data"]["token"].as_str().expect("token").to_string();
        (id, token)
    }

    pub async fn create_asset_type(&self, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/asset-types",
                &self.admin_token,
                serde_json::json!({ "type_name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create asset type: {body}");
        body["data"]["id"].as_i64().expect("asset type id")
    }

    pub async fn create_employee(&self, code: &str, name: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/employees",
                &self.admin_token,
                serde_json::json!({
                    "employee_code": code,
                    "full_name": name,
                    "email": format!("{}@example.com", code.to_lowercase()),
                    "department": "IT",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create employee: {body}");
        body["data"]["id"].as_i64().expect("employee id")
    }

    pub async fn create_asset(&self, code: &str, name: &str, asset_type_id: i64) -> i64 {
        let (status, body) = self
            .post(
                "/api/v1/assets",
                &self.admin_token,
                serde_json::json!({
                    "asset_code": code,
                    "asset_name": name,
                    "asset_type_id": asset_type_id,
                    "status": "available",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create asset: {body}");
        body["data"]["id"].as_i64().expect("asset id")
    }
}
