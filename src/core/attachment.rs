use std::sync::Arc;
use std::time::Duration;

use crate::core::error::ServiceError;
use crate::models::domain::NewAttachment;
use crate::models::requests::UploadFile;
use crate::services::storage::{FileStorage, StorageError};

/// Uploads and removes attachment blobs
///
/// Blob calls happen outside of any database transaction. The manager only
/// produces in-memory [`NewAttachment`] records; writing rows is the caller's job.
#[derive(Clone)]
pub struct AttachmentManager {
    storage: Arc<dyn FileStorage>,
    upload_timeout: Duration,
    delete_timeout: Duration,
}

impl AttachmentManager {
    /// Deletes share the upload timeout unless [`Self::with_delete_timeout`] overrides it
    pub fn new(storage: Arc<dyn FileStorage>, upload_timeout: Duration) -> Self {
        Self {
            storage,
            upload_timeout,
            delete_timeout: upload_timeout,
        }
    }

    pub fn with_delete_timeout(mut self, delete_timeout: Duration) -> Self {
        self.delete_timeout = delete_timeout;
        self
    }

    /// Upload a file under a freshly generated name and return its record.
    ///
    /// The record is built as pending and only marked in use once the upload
    /// succeeded. A timed-out upload is cleaned up before the error is returned.
    pub async fn upload_and_prepare(&self, file: &UploadFile) -> Result<NewAttachment, ServiceError> {
        let extension = extension_from_file_name(&file.original_name)?;
        let mut attachment = NewAttachment::pending(unique_file_name(extension));

        let upload = self
            .storage
            .upload(&attachment.file_name, &file.content);

        let path = match tokio::time::timeout(self.upload_timeout, upload).await {
            Ok(result) => result.map_err(|e| {
                tracing::error!("Failed to upload {}: {}", attachment.file_name, e);
                e
            })?,
            Err(_) => {
                tracing::error!(
                    "Upload of {} timed out after {:?}",
                    attachment.file_name,
                    self.upload_timeout
                );
                self.cleanup(&attachment.file_name).await;
                return Err(StorageError::Timeout(self.upload_timeout.as_secs()).into());
            }
        };

        attachment.mark_in_use(path);
        Ok(attachment)
    }

    /// Best-effort blob delete bounded by the delete timeout.
    /// Failures and timeouts are logged, never returned.
    pub async fn cleanup(&self, file_name: &str) {
        let delete = self.storage.delete(file_name);

        match tokio::time::timeout(self.delete_timeout, delete).await {
            Ok(Ok(())) => tracing::debug!("Deleted blob {}", file_name),
            Ok(Err(e)) => tracing::warn!("Failed to delete blob {}: {}", file_name, e),
            Err(_) => tracing::warn!(
                "Delete of blob {} timed out after {:?}",
                file_name,
                self.delete_timeout
            ),
        }
    }

    pub async fn cleanup_all(&self, file_names: &[String]) {
        for name in file_names {
            self.cleanup(name).await;
        }
    }
}

/// Extension of the last path segment, including the leading dot
pub fn extension_from_file_name(file_name: &str) -> Result<&str, ServiceError> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);

    match base.rfind('.') {
        Some(idx) if idx + 1 < base.len() => Ok(&base[idx..]),
        _ => Err(ServiceError::EmptyValue("file extension")),
    }
}

pub fn unique_file_name(extension: &str) -> String {
    format!("{}{}", uuid::Uuid::new_v4(), extension)
}
