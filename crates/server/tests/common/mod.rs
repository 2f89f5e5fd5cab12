//! Common test utilities for API testing with a mock engine.
//!
//! This module provides a test fixture that builds the full router in
//! process with a scripted engine injected, so every endpoint can be
//! exercised without an ffmpeg binary.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use audiokit_core::testing::{MockEngine, MockEngineLoader};
use audiokit_core::{Config, EngineManager, ServerConfig};
use audiokit_server::api::create_router;
use audiokit_server::state::AppState;

/// Re-export fixtures for test convenience
pub use audiokit_core::testing::fixtures;

const BOUNDARY: &str = "audiokit-test-boundary";

/// Test fixture with a mock engine behind the router.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_cover() {
///     let fixture = TestFixture::new();
///     fixture.engine.set_output(fixtures::png_bytes());
///
///     let response = fixture
///         .upload("/api/v1/cover", MultipartForm::new().file("song.mp3", b"audio"))
///         .await;
///
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock engine - script exec behaviour, inspect argument vectors
    pub engine: MockEngine,
    /// Mock loader - control load failures and count loads
    pub loader: Arc<MockEngineLoader>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
    /// Body parsed as JSON, `Null` when it is not JSON.
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }
}

impl TestFixture {
    /// Create a new test fixture with default configuration.
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(config: Config) -> Self {
        let engine = MockEngine::new();
        let loader = Arc::new(MockEngineLoader::new(engine.clone()));
        let manager = Arc::new(EngineManager::new(loader.clone()));
        let state = Arc::new(AppState::new(config, manager));
        let router = create_router(state);

        Self {
            router,
            engine,
            loader,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Send a multipart POST request.
    pub async fn upload(&self, path: &str, form: MultipartForm) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", form.content_type())
            .body(Body::from(form.encode()))
            .unwrap();
        self.send(request).await
    }

    /// Send a POST request with a raw body and content type.
    pub async fn post_raw(&self, path: &str, body: Vec<u8>, content_type: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", content_type)
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// Default configuration for tests.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: 0, // Not used for in-process testing
            max_upload_mb: 4,
        },
        ..Default::default()
    }
}

struct Part {
    name: String,
    filename: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

/// Builder for `multipart/form-data` bodies.
#[derive(Default)]
pub struct MultipartForm {
    parts: Vec<Part>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `file` part.
    pub fn file(mut self, filename: &str, bytes: &[u8]) -> Self {
        self.parts.push(Part {
            name: "file".to_string(),
            filename: Some(filename.to_string()),
            content_type: "application/octet-stream".to_string(),
            bytes: bytes.to_vec(),
        });
        self
    }

    /// Adds the `cover` part.
    pub fn cover(mut self, bytes: &[u8]) -> Self {
        self.parts.push(Part {
            name: "cover".to_string(),
            filename: Some("cover.img".to_string()),
            content_type: "application/octet-stream".to_string(),
            bytes: bytes.to_vec(),
        });
        self
    }

    /// Adds the `params` part.
    pub fn params(mut self, params: Value) -> Self {
        self.parts.push(Part {
            name: "params".to_string(),
            filename: None,
            content_type: "application/json".to_string(),
            bytes: params.to_string().into_bytes(),
        });
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        for part in &self.parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            let disposition = match &part.filename {
                Some(filename) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    part.name, filename
                ),
                None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", part.content_type).as_bytes());
            body.extend_from_slice(&part.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
