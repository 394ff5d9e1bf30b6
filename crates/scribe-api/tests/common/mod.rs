//! Shared helpers for API integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use scribe_api::{build_router, AppState, ServerConfig};
use scribe_jobs::{
    Error, FilesystemBackend, JobContext, JobCoordinator, JobQueue, JobStore, ProcessingEngine,
    ResultAccess, Result, StorageBackend, WorkerBuilder, WorkerConfig,
};

pub const BOUNDARY: &str = "scribe-test-boundary";

/// Engine driven by the uploaded content: `fail` errors, `hang` never
/// finishes, anything else is upper-cased.
pub struct ScriptedEngine;

#[async_trait]
impl ProcessingEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn process(&self, ctx: JobContext) -> Result<String> {
        let input = String::from_utf8_lossy(&ctx.read_input().await?).to_string();
        ctx.report_progress(50, Some("halfway"));
        match input.as_str() {
            "fail" => Err(Error::Processing("corrupt input".into())),
            "hang" => std::future::pending().await,
            other => Ok(other.to_uppercase()),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _dir: TempDir,
}

/// Build the full router over temp-dir storage and a two-slot pool.
pub fn build_test_app(max_upload_bytes: usize) -> TestApp {
    let dir = TempDir::new().unwrap();
    let uploads: Arc<dyn StorageBackend> =
        Arc::new(FilesystemBackend::new(dir.path().join("uploads")));
    let outputs: Arc<dyn StorageBackend> =
        Arc::new(FilesystemBackend::new(dir.path().join("outputs")));
    let store = Arc::new(JobStore::new());
    let queue = Arc::new(JobQueue::new());

    let workers = WorkerBuilder::new(store.clone(), queue.clone())
        .with_config(WorkerConfig::default().with_worker_count(2))
        .with_engine(ScriptedEngine)
        .with_input_storage(uploads.clone())
        .with_output_storage(outputs.clone())
        .build()
        .unwrap()
        .start();

    let config = ServerConfig::default().with_max_upload_bytes(max_upload_bytes);
    let state = AppState {
        coordinator: Arc::new(
            JobCoordinator::new(store.clone(), queue, uploads)
                .with_max_upload_bytes(max_upload_bytes),
        ),
        results: Arc::new(ResultAccess::new(store, outputs)),
        workers: Arc::new(workers),
        config: Arc::new(config),
    };

    TestApp {
        router: build_router(state.clone()),
        state,
        _dir: dir,
    }
}

/// One multipart part: field name, optional filename, content.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    part.name, filename
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, _, json) = self.send(request).await;
        (status, json)
    }

    pub async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let (status, _, json) = self.send(request).await;
        (status, json)
    }

    pub async fn submit(&self, parts: &[Part<'_>]) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/jobs")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();
        let (status, _, json) = self.send(request).await;
        (status, json)
    }

    /// Submit a single `file` part and return the new job id.
    pub async fn submit_file(&self, filename: &str, data: &[u8]) -> String {
        let (status, json) = self
            .submit(&[Part {
                name: "file",
                filename: Some(filename),
                data,
            }])
            .await;
        assert_eq!(status, StatusCode::OK, "{}", json);
        json["job_id"].as_str().unwrap().to_string()
    }

    /// Poll a job until it reaches a terminal status.
    pub async fn wait_terminal(&self, job_id: &str) -> Value {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let (status, json) = self.get(&format!("/api/v1/jobs/{}", job_id)).await;
            assert_eq!(status, StatusCode::OK);
            if json["status"] == "completed" || json["status"] == "failed" {
                return json;
            }
            assert!(Instant::now() < deadline, "job {} never finished: {}", job_id, json);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}
