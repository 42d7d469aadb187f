//! Pluggable storage for uploaded files (deposit receipts, level images).

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

use crate::error::{AppError, Result};

/// Storage backend for user and staff uploads
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Save `content` under `name` and return the stored name
    async fn save(&self, name: &str, content: &[u8]) -> Result<String>;

    /// Remove a stored file; removing a missing file is not an error
    async fn delete(&self, name: &str) -> Result<()>;

    /// Public URL under which a stored file is served
    fn url(&self, name: &str) -> String;
}

/// Files under a local directory, served by the router at `/media`
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative name inside the root, refusing traversal
    fn path_for(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let safe = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::InvalidInput(format!("Invalid file name: {}", name)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, name: &str, content: &[u8]) -> Result<String> {
        let path = self.path_for(name)?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, content).await?;
        tracing::debug!("Stored upload {} ({} bytes)", name, content.len());

        Ok(name.to_string())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

/// File extension for an accepted image content type
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

/// Unique name for a new upload inside `folder`
pub fn upload_name(folder: &str, extension: &str) -> String {
    format!("{}/{}.{}", folder, uuid::Uuid::new_v4().simple(), extension)
}
