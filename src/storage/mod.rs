//! Evidence photo storage.
//!
//! Photos are written under `returns/<order_id>/<timestamp>_<index>.<ext>`
//! and exposed at `<public_base_url>/<key>`.

use crate::errors::ServiceError;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, error};
use uuid::Uuid;

/// A decoded photo ready to be stored.
#[derive(Debug, Clone)]
pub struct EvidencePhoto {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Object storage for evidence photos.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Stores `photo` under `key` and returns its retrievable URL.
    async fn put(&self, key: &str, photo: &EvidencePhoto) -> Result<String, ServiceError>;

    /// Removes the object under `key`. Removing a missing object succeeds.
    async fn delete(&self, key: &str) -> Result<(), ServiceError>;
}

/// Builds the storage key of the `index`-th photo of one return.
pub fn evidence_key(order_id: Uuid, at: DateTime<Utc>, index: usize, photo: &EvidencePhoto) -> String {
    format!(
        "returns/{}/{}_{}.{}",
        order_id,
        at.timestamp_millis(),
        index,
        file_extension(photo)
    )
}

/// Extension taken from the file name when it is plain alphanumeric,
/// otherwise derived from the image subtype.
fn file_extension(photo: &EvidencePhoto) -> String {
    let from_name = photo
        .file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    from_name.unwrap_or_else(|| {
        match photo
            .content_type
            .split_once('/')
            .map(|(_, sub)| sub.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpeg") | Some("pjpeg") => "jpg".to_string(),
            Some("svg+xml") => "svg".to_string(),
            Some(sub) if !sub.is_empty() && sub.chars().all(|c| c.is_ascii_alphanumeric()) => {
                sub.to_string()
            }
            _ => "bin".to_string(),
        }
    })
}

/// Filesystem-backed store; the directory is expected to be served at
/// `public_base_url` by the fronting web server.
#[derive(Debug, Clone)]
pub struct LocalEvidenceStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalEvidenceStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ServiceError> {
        if key.split('/').any(|segment| segment.is_empty() || segment == "..") {
            return Err(ServiceError::StorageError(format!("invalid storage key: {}", key)));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl EvidenceStore for LocalEvidenceStore {
    async fn put(&self, key: &str, photo: &EvidencePhoto) -> Result<String, ServiceError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                let msg = format!("Failed to create evidence directory {}: {}", parent.display(), e);
                error!("{}", msg);
                ServiceError::StorageError(msg)
            })?;
        }

        tokio::fs::write(&path, &photo.data).await.map_err(|e| {
            let msg = format!("Failed to write evidence photo {}: {}", path.display(), e);
            error!("{}", msg);
            ServiceError::StorageError(msg)
        })?;

        debug!(key, bytes = photo.data.len(), "Evidence photo stored");
        Ok(self.url_for(key))
    }

    async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key, "Evidence photo removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                let msg = format!("Failed to remove evidence photo {}: {}", path.display(), e);
                error!("{}", msg);
                Err(ServiceError::StorageError(msg))
            }
        }
    }
}
