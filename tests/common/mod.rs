#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use enrollment_intake::{
    AppConfig, AppState, create_router,
    repository::{RepositoryState, SqliteRepository},
    storage::{DiskImageStore, ImageStore, ImageStoreState},
};
use serde_json::Value;
use std::{path::PathBuf, sync::Arc};
use tempfile::TempDir;

pub const ADMIN_TOKEN: &str = "test-admin-token";
const BOUNDARY: &str = "----enrollment-test-boundary";

/// A router over an in-memory database and a throwaway content directory.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub upload_dir: PathBuf,
    // Held so the directory outlives the test.
    pub root: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let sqlite = SqliteRepository::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        sqlite.init_schema().await.expect("schema");
        Self::with_repo(Arc::new(sqlite)).await
    }

    pub async fn with_repo(repo: RepositoryState) -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        let upload_dir = root.path().join("uploads");

        let disk = DiskImageStore::new(&upload_dir);
        disk.ensure_dir().await.expect("upload dir");
        let images = Arc::new(disk) as ImageStoreState;

        let config = AppConfig {
            admin_token: ADMIN_TOKEN.to_string(),
            upload_dir: upload_dir.clone(),
            static_dir: root.path().to_path_buf(),
            rate_limit_max: 10_000,
            ..AppConfig::default()
        };

        let state = AppState::new(repo, images, config);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            upload_dir,
            root,
        }
    }

    pub fn stored_files(&self) -> Vec<String> {
        std::fs::read_dir(&self.upload_dir)
            .expect("read upload dir")
            .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect()
    }
}

/// Hand-built `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}

pub fn admin_get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-admin-token", ADMIN_TOKEN)
        .body(Body::empty())
        .unwrap()
}

pub fn admin_delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("x-admin-token", ADMIN_TOKEN)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}

/// A few bytes that pass for a PNG by declared type; contents are never sniffed.
pub fn tiny_png() -> Vec<u8> {
    b"\x89PNG\r\n\x1a\nnot-really-a-png".to_vec()
}
