use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

/// Object storage boundary for finished session audio
#[async_trait::async_trait]
pub trait MediaStore: Send + Sync {
    /// Store a blob and return a reference to it
    async fn put(&self, data: &[u8], content_type: &str) -> Result<String>;
}

/// Media store backed by a local recordings directory
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn extension_for(content_type: &str) -> &'static str {
        if content_type.starts_with("audio/wav") {
            "wav"
        } else if content_type.starts_with("audio/pcm") {
            "pcm"
        } else {
            "bin"
        }
    }
}

#[async_trait::async_trait]
impl MediaStore for FsMediaStore {
    async fn put(&self, data: &[u8], content_type: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("Failed to create recordings directory")?;

        let file_name = format!(
            "{}.{}",
            uuid::Uuid::new_v4(),
            Self::extension_for(content_type)
        );
        let path = self.root.join(file_name);

        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write session audio: {:?}", path))?;

        info!("Session audio stored: {} ({} bytes)", path.display(), data.len());

        Ok(path.display().to_string())
    }
}
