//! Object store for payment screenshots.

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::{DomainError, ErrorKind};

/// Largest accepted upload (5 MiB)
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Accepted content types
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unsupported image type: {0}. Use JPEG, PNG or WebP")]
    UnsupportedType(String),

    #[error("Image exceeds the {} MiB limit", MAX_IMAGE_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("Image is empty")]
    Empty,

    #[error("Failed to store image: {0}")]
    Io(#[from] std::io::Error),
}

impl DomainError for StorageError {
    fn kind(&self) -> ErrorKind {
        match self {
            StorageError::Io(_) => ErrorKind::Infrastructure,
            _ => ErrorKind::Validation,
        }
    }
}

/// Check an upload before it is stored
pub fn validate_image(bytes: &[u8], content_type: &str) -> Result<(), StorageError> {
    let content_type = content_type.trim().to_ascii_lowercase();
    if !ALLOWED_IMAGE_TYPES.contains(&content_type.as_str()) {
        return Err(StorageError::UnsupportedType(content_type));
    }
    if bytes.is_empty() {
        return Err(StorageError::Empty);
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(StorageError::TooLarge);
    }
    Ok(())
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// Accepts an image and returns the URL it is served from
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError>;

    /// Delete an image previously returned by `store`.
    ///
    /// URLs this store did not issue are ignored, as are files that are
    /// already gone.
    async fn remove(&self, url: &str) -> Result<(), StorageError>;
}

/// Image store writing into a local directory
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalImageStore {
    /// # Arguments
    ///
    /// * `root` - Directory files are written to; created on first use
    /// * `public_base_url` - URL prefix the directory is served under
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, StorageError> {
        validate_image(&bytes, content_type)?;

        tokio::fs::create_dir_all(&self.root).await?;
        let file_name = format!(
            "{}.{}",
            Uuid::new_v4(),
            extension_for(&content_type.trim().to_ascii_lowercase())
        );
        tokio::fs::write(self.root.join(&file_name), bytes).await?;

        log::debug!("Stored upload {file_name}");
        Ok(format!("{}/{}", self.public_base_url, file_name))
    }

    async fn remove(&self, url: &str) -> Result<(), StorageError> {
        let Some(file_name) = url
            .strip_prefix(&self.public_base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && *name != ".." && !name.contains(['/', '\\']))
        else {
            log::warn!("Refusing to remove upload outside the store: {url}");
            return Ok(());
        };

        match tokio::fs::remove_file(self.root.join(file_name)).await {
            Ok(()) => {
                log::debug!("Removed upload {file_name}");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_image() {
        assert!(validate_image(b"\x89PNG", "image/png").is_ok());
        assert!(validate_image(b"\xff\xd8", "IMAGE/JPEG").is_ok());
        assert!(matches!(
            validate_image(b"GIF89a", "image/gif"),
            Err(StorageError::UnsupportedType(_))
        ));
        assert!(matches!(
            validate_image(&[], "image/png"),
            Err(StorageError::Empty)
        ));
        assert!(matches!(
            validate_image(&vec![0; MAX_IMAGE_BYTES + 1], "image/webp"),
            Err(StorageError::TooLarge)
        ));
    }

    #[tokio::test]
    async fn test_local_store_writes_file() {
        let root = std::env::temp_dir().join(format!("referral_hub_uploads_{}", Uuid::new_v4()));
        let store = LocalImageStore::new(&root, "/uploads/");

        let url = store.store(b"\x89PNG".to_vec(), "image/png").await.unwrap();

        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".png"));
        let file_name = url.trim_start_matches("/uploads/");
        assert!(root.join(file_name).exists());

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_store_removes_only_its_files() {
        let root = std::env::temp_dir().join(format!("referral_hub_uploads_{}", Uuid::new_v4()));
        let store = LocalImageStore::new(&root, "/uploads");

        let url = store.store(b"\xff\xd8".to_vec(), "image/jpeg").await.unwrap();
        let path = root.join(url.trim_start_matches("/uploads/"));
        assert!(path.exists());

        store.remove(&url).await.unwrap();
        assert!(!path.exists());

        // Second removal and foreign URLs are no-ops
        store.remove(&url).await.unwrap();
        store.remove("/uploads/../secret.txt").await.unwrap();
        store.remove("https://cdn.example.com/a.png").await.unwrap();

        tokio::fs::remove_dir_all(&root).await.unwrap();
    }
}
