use async_trait::async_trait;
use aws_sdk_s3 as s3;
use axum::body::Bytes;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

// 1. StorageService Contract
/// StorageService
///
/// Defines the contract for persisting uploaded photos. Handlers only decide the
/// file name; where and how the bytes land is up to the implementation:
/// - **Local:** a directory on disk (`LocalStorageService`), served under `/uploads`.
/// - **Production:** an S3-compatible bucket (`S3StorageClient`).
/// - **Tests:** the in-memory `MockStorageService`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Makes sure the destination exists (directory or bucket). Safe to call at startup.
    async fn prepare(&self);

    /// Writes `bytes` under `file_name` and returns the stored location.
    async fn save_file(&self, file_name: &str, bytes: Bytes) -> Result<String, String>;
}

/// sanitize_key
///
/// Strips directory navigation (`..`, `.`, empty segments) from a name so it
/// cannot escape the configured destination.
pub fn sanitize_key(key: &str) -> String {
    key.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 2. Local Directory Implementation
/// LocalStorageService
///
/// Writes uploads into `FILE_UPLOAD_PATH`.
#[derive(Clone)]
pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn prepare(&self) {
        if let Err(e) = tokio::fs::create_dir_all(&self.root).await {
            tracing::error!("could not create upload directory {:?}: {}", self.root, e);
        }
    }

    async fn save_file(&self, file_name: &str, bytes: Bytes) -> Result<String, String> {
        let key = sanitize_key(file_name);
        if key.is_empty() {
            return Err("empty file name".to_string());
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| e.to_string())?;

        let path = self.root.join(&key);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| e.to_string())?;

        Ok(path.to_string_lossy().into_owned())
    }
}

// 3. The S3 Implementation (MinIO/Supabase/AWS)
/// S3StorageClient
///
/// Stores uploads as objects under `<prefix>/<file_name>` in one bucket.
/// `force_path_style(true)` keeps MinIO and Supabase gateways working.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    prefix: String,
}

impl S3StorageClient {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        prefix: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            prefix: sanitize_key(prefix),
        }
    }

    pub fn object_key(&self, file_name: &str) -> String {
        let name = sanitize_key(file_name);
        if self.prefix.is_empty() {
            name
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent; an "already owned" error is expected and ignored.
    async fn prepare(&self) {
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn save_file(&self, file_name: &str, bytes: Bytes) -> Result<String, String> {
        let key = self.object_key(file_name);

        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&key)
            .body(s3::primitives::ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        Ok(key)
    }
}

// 4. The Mock Implementation (For Tests)
/// MockStorageService
///
/// Records every saved file name and size so tests can assert on them.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, all writes return a simulated failure.
    pub should_fail: bool,
    pub saved: Arc<Mutex<Vec<(String, usize)>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    pub fn saved_files(&self) -> Vec<(String, usize)> {
        self.saved.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn prepare(&self) {}

    async fn save_file(&self, file_name: &str, bytes: Bytes) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }

        let key = sanitize_key(file_name);
        if let Ok(mut saved) = self.saved.lock() {
            saved.push((key.clone(), bytes.len()));
        }
        Ok(format!("mock://uploads/{}", key))
    }
}

/// StorageState
///
/// The shared handle to the storage layer held in `AppState`.
pub type StorageState = Arc<dyn StorageService>;
