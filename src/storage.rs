use async_trait::async_trait;
use log::{debug, error, info, warn};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{AppConfig, MediaBackend};
use crate::models::MediaType;

#[derive(Debug, Error)]
pub enum MediaStoreError {
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("Unsupported file format '{0}'")]
    UnsupportedFormat(String),
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// Resize/trim instructions forwarded to the media host alongside the blob.
#[derive(Debug, Clone, PartialEq)]
pub struct Transformation {
    pub width: u32,
    pub height: u32,
    pub crop: &'static str,
    pub duration_secs: Option<u32>,
}

impl Transformation {
    pub fn header_value(&self) -> String {
        let mut v = format!("w_{},h_{},c_{}", self.width, self.height, self.crop);
        if let Some(d) = self.duration_secs {
            v.push_str(&format!(",du_{d}"));
        }
        v
    }
}

/// Upload constraints for one media kind.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadPolicy {
    pub folder: &'static str,
    pub allowed_formats: &'static [&'static str],
    pub max_bytes: usize,
    pub transformation: Transformation,
}

pub const IMAGE_MAX_BYTES: usize = 5 * 1024 * 1024;
pub const VIDEO_MAX_BYTES: usize = 50 * 1024 * 1024;

impl UploadPolicy {
    pub fn for_kind(kind: MediaType) -> Self {
        match kind {
            MediaType::Image => Self {
                folder: "milestone-images",
                allowed_formats: &["jpg", "jpeg", "png", "gif"],
                max_bytes: IMAGE_MAX_BYTES,
                transformation: Transformation { width: 800, height: 600, crop: "limit", duration_secs: None },
            },
            MediaType::Video => Self {
                folder: "milestone-videos",
                allowed_formats: &["mp4", "mov", "avi", "wmv"],
                max_bytes: VIDEO_MAX_BYTES,
                transformation: Transformation { width: 1280, height: 720, crop: "limit", duration_secs: Some(30) },
            },
        }
    }

    /// Format of the blob: sniffed from its bytes, else taken from the file name extension.
    pub fn detect_format(file_name: &str, bytes: &[u8]) -> Option<String> {
        infer::get(bytes)
            .map(|t| t.extension().to_string())
            .or_else(|| {
                file_name
                    .rsplit_once('.')
                    .map(|(_, ext)| ext.to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
            })
    }

    /// Size and format checks every backend applies before storing. Returns the format.
    pub fn check(&self, file_name: &str, bytes: &[u8]) -> Result<String, MediaStoreError> {
        if bytes.len() > self.max_bytes {
            return Err(MediaStoreError::TooLarge { size: bytes.len(), limit: self.max_bytes });
        }
        let format = Self::detect_format(file_name, bytes).unwrap_or_default();
        if !self.allowed_formats.contains(&format.as_str()) {
            return Err(MediaStoreError::UnsupportedFormat(format));
        }
        Ok(format)
    }
}

/// What the media host hands back after a successful upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMedia {
    pub url: String,
    pub mimetype: String,
    pub size: usize,
    pub original_filename: String,
}

fn content_key(policy: &UploadPolicy, format: &str, bytes: &[u8]) -> String {
    let hash = format!("{:x}", Sha256::digest(bytes));
    format!("{}/{}.{}", policy.folder, hash, format)
}

fn sniff_mime(bytes: &[u8], fallback: &str) -> String {
    infer::get(bytes).map(|t| t.mime_type().to_string()).unwrap_or_else(|| fallback.to_string())
}

#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(
        &self,
        policy: &UploadPolicy,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredMedia, MediaStoreError>;
    /// Fetch a blob by the key embedded in its URL (`<folder>/<file>`).
    async fn load(&self, key: &str) -> Result<(Vec<u8>, String), MediaStoreError>;
}

// ---------------- Local filesystem (default; served under /media) ----------------
pub struct FsMediaStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self { root: root.into(), public_base_url: public_base_url.into().trim_end_matches('/').to_string() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, MediaStoreError> {
        // keys are "<folder>/<file>" with no traversal
        let mut parts = key.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(folder), Some(file), None)
                if !folder.is_empty() && !file.is_empty() && !folder.starts_with('.') && !file.starts_with('.') =>
            {
                Ok(self.root.join(folder).join(file))
            }
            _ => Err(MediaStoreError::NotFound),
        }
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn upload(
        &self,
        policy: &UploadPolicy,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredMedia, MediaStoreError> {
        let format = policy.check(file_name, &bytes)?;
        let key = content_key(policy, &format, &bytes);
        let path = self.path_for(&key)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| MediaStoreError::Other(e.to_string()))?;
        }
        // content addressed: identical uploads map to the same file
        if tokio::fs::metadata(&path).await.is_err() {
            tokio::fs::write(&path, &bytes).await.map_err(|e| {
                error!("media write failed key={key}: {e}");
                MediaStoreError::Other(e.to_string())
            })?;
        }
        debug!("stored {key} locally; transformation {} not applied", policy.transformation.header_value());
        Ok(StoredMedia {
            url: format!("{}/media/{}", self.public_base_url, key),
            mimetype: sniff_mime(&bytes, content_type),
            size: bytes.len(),
            original_filename: file_name.to_string(),
        })
    }

    async fn load(&self, key: &str) -> Result<(Vec<u8>, String), MediaStoreError> {
        let path = self.path_for(key)?;
        let bytes = tokio::fs::read(&path).await.map_err(|_| MediaStoreError::NotFound)?;
        let mime = sniff_mime(&bytes, "application/octet-stream");
        Ok((bytes, mime))
    }
}

// ---------------- S3 Implementation (MinIO compatible) ----------------
pub struct S3MediaStore {
    bucket: String,
    client: aws_sdk_s3::Client,
    public_base_url: String,
}

impl S3MediaStore {
    pub async fn new(cfg: &AppConfig) -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "kidsteps-media".into());
        let endpoint = std::env::var("S3_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("S3_ENDPOINT must be set when MEDIA_BACKEND=s3"))?;
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let access = std::env::var("S3_ACCESS_KEY").unwrap_or_default();
        let secret = std::env::var("S3_SECRET_KEY").unwrap_or_default();
        let public_base_url = std::env::var("S3_PUBLIC_URL")
            .unwrap_or_else(|_| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region));
        loader = loader.endpoint_url(endpoint);
        if !access.is_empty() && !secret.is_empty() {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // path-style addressing for MinIO/local endpoints without wildcard DNS
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf).force_path_style(true).build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!("Initialized S3 media client (bucket '{bucket}', public base {})", cfg.public_base_url);

        if let Err(e) = client.head_bucket().bucket(&bucket).send().await {
            warn!("head_bucket failed for '{bucket}' (will attempt create): {e:?}");
            let mut attempt = 0u32;
            let max_attempts = 8;
            loop {
                attempt += 1;
                match client.create_bucket().bucket(&bucket).send().await {
                    Ok(_) => {
                        info!("created bucket '{bucket}' (attempt {attempt})");
                        break;
                    }
                    Err(e2) if attempt >= max_attempts => {
                        error!("create_bucket failed for '{bucket}' after {attempt} attempts: {e2:?}");
                        return Err(anyhow::anyhow!("failed to ensure bucket '{bucket}': {e2}"));
                    }
                    Err(e2) => {
                        let backoff_ms = 200 * attempt.pow(2);
                        warn!("create_bucket attempt {attempt} failed for '{bucket}': {e2:?} (retrying in {backoff_ms}ms)");
                        tokio::time::sleep(std::time::Duration::from_millis(backoff_ms as u64)).await;
                    }
                }
            }
        }

        Ok(Self { bucket, client, public_base_url: public_base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(
        &self,
        policy: &UploadPolicy,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredMedia, MediaStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let format = policy.check(file_name, &bytes)?;
        let key = content_key(policy, &format, &bytes);
        let mime = sniff_mime(&bytes, content_type);
        let size = bytes.len();
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(mime.clone())
            .metadata("transformation", policy.transformation.header_value())
            .metadata("original-filename", file_name)
            .body(ByteStream::from(bytes));
        if let Err(e) = put.send().await {
            error!("put_object failed key={key} bucket={} err={:?}", self.bucket, e);
            let hint = if e.to_string().contains("NoSuchBucket") {
                " (bucket missing or not yet propagated)"
            } else if e.to_string().contains("AccessDenied") {
                " (check S3_ACCESS_KEY/S3_SECRET_KEY permissions)"
            } else {
                ""
            };
            return Err(MediaStoreError::Other(format!("{e}{hint}")));
        }
        Ok(StoredMedia {
            url: format!("{}/{}", self.public_base_url, key),
            mimetype: mime,
            size,
            original_filename: file_name.to_string(),
        })
    }

    async fn load(&self, key: &str) -> Result<(Vec<u8>, String), MediaStoreError> {
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|_| MediaStoreError::NotFound)?;
        let data = obj.body.collect().await.map_err(|e| MediaStoreError::Other(e.to_string()))?;
        let bytes = Vec::from(data.into_bytes().as_ref());
        let mime = sniff_mime(&bytes, "application/octet-stream");
        Ok((bytes, mime))
    }
}

pub async fn build_media_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn MediaStore>> {
    match cfg.media_backend {
        MediaBackend::Fs => {
            info!("Using local media store at '{}'", cfg.media_dir.display());
            Ok(Arc::new(FsMediaStore::new(cfg.media_dir.clone(), cfg.public_base_url.clone())))
        }
        MediaBackend::S3 => Ok(Arc::new(S3MediaStore::new(cfg).await?)),
    }
}
