//! Photo storage collaborator
//!
//! Evidence photos live outside the ticket record; tickets only hold URLs.
//! An upload failure aborts the action that needed the photo. A failed
//! delete is logged by the caller and otherwise ignored.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// URL scheme used by [`MemoryPhotoStore`]
pub const MEMORY_SCHEME: &str = "mem://photos/";

/// URL scheme used by [`DirPhotoStore`]
pub const FILE_SCHEME: &str = "file://";

/// Error type for photo store operations
#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("Photo store unavailable: {0}")]
    Unavailable(String),

    #[error("Photo payload rejected: {0}")]
    InvalidPayload(String),

    #[error("Photo not found: {0}")]
    NotFound(String),
}

/// Result type for photo store operations
pub type PhotoResult<T> = Result<T, PhotoError>;

/// Image bytes as captured by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhotoPayload {
    Binary { bytes: Vec<u8>, content_type: String },
    /// `data:<mime>;base64,<...>` as produced by browser canvases
    DataUri { uri: String },
}

impl PhotoPayload {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self::Binary {
            bytes,
            content_type: "image/jpeg".to_string(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        match self {
            Self::Binary { content_type, .. } => Some(content_type.as_str()),
            Self::DataUri { uri } => uri
                .strip_prefix("data:")
                .and_then(|rest| rest.split(';').next())
                .filter(|mime| !mime.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Binary { bytes, .. } => bytes.is_empty(),
            Self::DataUri { uri } => uri.split_once(',').map_or(true, |(_, data)| data.is_empty()),
        }
    }
}

/// Shared photo store handle
pub type SharedPhotoStore = Arc<dyn PhotoStore>;

/// Blob storage for evidence photos
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Store a photo and return its URL
    async fn upload(&self, payload: PhotoPayload, suggested_name: &str) -> PhotoResult<String>;

    async fn delete(&self, url: &str) -> PhotoResult<()>;
}

/// In-process photo store
#[derive(Debug, Default)]
pub struct MemoryPhotoStore {
    blobs: RwLock<BTreeMap<String, PhotoPayload>>,
    counter: AtomicU64,
    offline: AtomicBool,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.blobs.read().await.contains_key(url)
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn check(&self) -> PhotoResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(PhotoError::Unavailable("memory photo store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PhotoStore for MemoryPhotoStore {
    async fn upload(&self, payload: PhotoPayload, suggested_name: &str) -> PhotoResult<String> {
        self.check()?;
        if payload.is_empty() {
            return Err(PhotoError::InvalidPayload(format!("{} is empty", suggested_name)));
        }
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let url = format!("{}{}-{}", MEMORY_SCHEME, seq, suggested_name);
        self.blobs.write().await.insert(url.clone(), payload);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> PhotoResult<()> {
        self.check()?;
        match self.blobs.write().await.remove(url) {
            Some(_) => Ok(()),
            None => Err(PhotoError::NotFound(url.to_string())),
        }
    }
}

/// Photos written as files under one directory.
///
/// Every upload gets a fresh `<millis>_<nonce>_` prefix, so a second upload
/// under the same suggested name never overwrites a file a ticket already
/// references. Data URIs are stored verbatim; decoding them is left to
/// whoever serves the file.
#[derive(Debug, Clone)]
pub struct DirPhotoStore {
    root: PathBuf,
}

impl DirPhotoStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, url: &str) -> PhotoResult<PathBuf> {
        let path = url
            .strip_prefix(FILE_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| PhotoError::NotFound(url.to_string()))?;
        if path.parent() != Some(self.root.as_path()) {
            return Err(PhotoError::NotFound(url.to_string()));
        }
        Ok(path)
    }
}

#[async_trait]
impl PhotoStore for DirPhotoStore {
    async fn upload(&self, payload: PhotoPayload, suggested_name: &str) -> PhotoResult<String> {
        if payload.is_empty() {
            return Err(PhotoError::InvalidPayload(format!("{} is empty", suggested_name)));
        }
        let safe_name: String = suggested_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let file_name = format!(
            "{}_{}_{}",
            chrono::Utc::now().timestamp_millis(),
            &nonce[..8],
            safe_name
        );
        let (bytes, file_name) = match payload {
            PhotoPayload::Binary { bytes, .. } => (bytes, file_name),
            PhotoPayload::DataUri { uri } => (uri.into_bytes(), format!("{}.datauri", file_name)),
        };

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| PhotoError::Unavailable(e.to_string()))?;
        let path = self.root.join(file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| PhotoError::Unavailable(e.to_string()))?;
        Ok(format!("{}{}", FILE_SCHEME, path.display()))
    }

    async fn delete(&self, url: &str) -> PhotoResult<()> {
        let path = self.path_for(url)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PhotoError::NotFound(url.to_string()))
            }
            Err(e) => Err(PhotoError::Unavailable(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_content_type() {
        let payload = PhotoPayload::DataUri {
            uri: "data:image/png;base64,iVBORw0".to_string(),
        };
        assert_eq!(payload.content_type(), Some("image/png"));
        assert!(!payload.is_empty());

        let empty = PhotoPayload::DataUri {
            uri: "data:image/png;base64,".to_string(),
        };
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_upload_and_delete() {
        let store = MemoryPhotoStore::new();
        let url = store
            .upload(PhotoPayload::jpeg(vec![0xFF, 0xD8]), "issue.jpg")
            .await
            .unwrap();
        assert!(url.starts_with(MEMORY_SCHEME));
        assert!(store.contains(&url).await);

        store.delete(&url).await.unwrap();
        assert!(store.is_empty().await);
        assert!(matches!(store.delete(&url).await, Err(PhotoError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_dir_store_writes_and_removes_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirPhotoStore::new(dir.path());

        let url = store
            .upload(PhotoPayload::jpeg(vec![0xFF, 0xD8]), "HYG-1_issue.jpg")
            .await
            .unwrap();
        let path = PathBuf::from(url.strip_prefix(FILE_SCHEME).unwrap());
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.to_string_lossy().ends_with("_HYG-1_issue.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), vec![0xFF, 0xD8]);

        store.delete(&url).await.unwrap();
        assert!(!path.exists());
        assert!(store.delete("file:///etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn test_dir_store_same_name_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirPhotoStore::new(dir.path());

        let first = store
            .upload(PhotoPayload::jpeg(vec![1]), "HYG-1_resolution.jpg")
            .await
            .unwrap();
        let second = store
            .upload(PhotoPayload::jpeg(vec![2]), "HYG-1_resolution.jpg")
            .await
            .unwrap();
        assert_ne!(first, second);

        store.delete(&second).await.unwrap();
        let kept = PathBuf::from(first.strip_prefix(FILE_SCHEME).unwrap());
        assert_eq!(std::fs::read(kept).unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_offline_upload_fails() {
        let store = MemoryPhotoStore::new();
        store.set_available(false);
        assert!(matches!(
            store.upload(PhotoPayload::jpeg(vec![1]), "a.jpg").await,
            Err(PhotoError::Unavailable(_))
        ));
    }
}
