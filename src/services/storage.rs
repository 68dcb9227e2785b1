use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client as S3Client;
use thiserror::Error;

use crate::config::StorageSettings;

/// Errors that can occur when talking to blob storage
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Upload timed out after {0}s")]
    Timeout(u64),
}

/// Blob storage contract. Names are generated by the caller and must be unique.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Store `content` under `name` and return its public path
    async fn upload(&self, name: &str, content: &[u8]) -> Result<String, StorageError>;

    async fn delete(&self, name: &str) -> Result<(), StorageError>;
}

/// S3-compatible blob storage (AWS or MinIO)
#[derive(Clone)]
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    public_url: String,
}

impl S3Storage {
    /// Build a client from settings.
    ///
    /// Static credentials and a custom endpoint are used when an access key is
    /// configured; otherwise the ambient AWS credential chain is loaded.
    pub async fn from_settings(settings: &StorageSettings) -> Self {
        let region = Region::new(settings.region.clone());

        let config = match (&settings.access_key, &settings.secret_key) {
            (Some(access_key), Some(secret_key)) => {
                let credentials = Credentials::new(access_key, secret_key, None, None, "static");
                let mut builder = aws_sdk_s3::Config::builder()
                    .behavior_version(BehaviorVersion::latest())
                    .region(region)
                    .credentials_provider(credentials)
                    .force_path_style(true);
                if let Some(endpoint) = &settings.endpoint {
                    builder = builder.endpoint_url(endpoint);
                }
                builder.build()
            }
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                let mut builder = aws_sdk_s3::config::Builder::from(&shared);
                if let Some(endpoint) = &settings.endpoint {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }
                builder.build()
            }
        };

        tracing::info!(
            "Object storage client initialized (bucket={}, endpoint={:?})",
            settings.bucket,
            settings.endpoint
        );

        Self {
            client: S3Client::from_conf(config),
            bucket: settings.bucket.clone(),
            public_url: settings.public_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_url, self.bucket, key)
    }
}

#[async_trait]
impl FileStorage for S3Storage {
    async fn upload(&self, name: &str, content: &[u8]) -> Result<String, StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(name)
            .body(content.to_vec().into())
            .content_type(content_type_for(name))
            .send()
            .await
            .map_err(|e| StorageError::Upload(format!("{name}: {e}")))?;

        tracing::debug!("Uploaded blob {} ({} bytes)", name, content.len());

        Ok(self.object_url(name))
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(name)
            .send()
            .await
            .map_err(|e| StorageError::Delete(format!("{name}: {e}")))?;

        Ok(())
    }
}

fn content_type_for(name: &str) -> &'static str {
    let extension = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
