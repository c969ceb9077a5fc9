//! Common test utilities for API testing with mock backends.
//!
//! This module provides a test fixture that creates an in-process server
//! with scriptable conversion backends, real SQLite and filesystem stores
//! in a temp directory, and no external tools.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use tuneshift_core::{
    testing::MockBackend, BlobStore, Config, ConversionBackend, ConversionManager,
    ConversionOrchestrator, DatabaseConfig, EncoderCapabilities, FsBlobStore, RecordStore,
    SqliteRecordStore, StorageConfig,
};
use tuneshift_server::state::AppState;

const BOUNDARY: &str = "tuneshift-test-boundary";

/// Test fixture for API testing with mock backends.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_upload() {
///     let fixture = TestFixture::new();
///     fixture.primary.set_converting(b"ID3");
///
///     let response = fixture
///         .upload(&[("title", "Song")], Some(("song.wav", b"RIFF")))
///         .await;
///
///     assert_eq!(response.status, 201);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// First backend tried; starts out unavailable
    pub primary: MockBackend,
    /// Second backend tried; starts out unavailable
    pub fallback: MockBackend,
    pub records: Arc<SqliteRecordStore>,
    pub blobs: Arc<FsBlobStore>,
    /// Temporary directory for the test database and blobs
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub bytes: Vec<u8>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Create a fixture after letting the caller adjust the config.
    pub fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let mut config = Config {
            database: DatabaseConfig {
                path: temp_dir.path().join("test.db"),
            },
            storage: StorageConfig {
                root: temp_dir.path().join("media"),
            },
            ..Config::default()
        };
        config.server.port = 0; // Not used for in-process testing
        customize(&mut config);

        let records = Arc::new(
            SqliteRecordStore::new(&config.database.path).expect("Failed to create record store"),
        );
        let blobs = Arc::new(FsBlobStore::new(&config.storage.root));

        let primary = MockBackend::named("primary");
        let fallback = MockBackend::named("fallback");
        let orchestrator = Arc::new(ConversionOrchestrator::new(vec![
            Arc::new(primary.clone()) as Arc<dyn ConversionBackend>,
            Arc::new(fallback.clone()),
        ]));
        let conversions = Arc::new(ConversionManager::new(
            orchestrator,
            Arc::clone(&records) as Arc<dyn RecordStore>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
        ));

        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&records) as Arc<dyn RecordStore>,
            Arc::clone(&blobs) as Arc<dyn BlobStore>,
            conversions,
            EncoderCapabilities::default(),
        ));

        let router = tuneshift_server::api::create_router(state);

        Self {
            router,
            primary,
            fallback,
            records,
            blobs,
            temp_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request without a body.
    pub async fn post_empty(&self, path: &str) -> TestResponse {
        self.request("POST", path, None).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// POST a multipart upload to `/api/v1/records`.
    pub async fn upload(&self, fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> TestResponse {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some((filename, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    BOUNDARY, filename
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/records")
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap();

        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        let request = request_builder.body(body).unwrap();
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
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            bytes: body_bytes.to_vec(),
        }
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
