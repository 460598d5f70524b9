//! Persistence of finished rips.

use crate::ripper::RippedFile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

/// Sink that each finished file is handed to exactly once.
#[async_trait]
pub trait SaveSink: Send + Sync {
    async fn save(&self, file: &RippedFile) -> Result<()>;
}

/// Writes finished files into a directory, sanitizing names on the way.
pub struct DirSaveSink {
    dir: PathBuf,
}

impl DirSaveSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Keeps file names inside the target directory: path separators and
    /// control characters become underscores, leading dots are dropped.
    fn sanitize(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| match c {
                '/' | '\\' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        let trimmed = cleaned.trim().trim_start_matches('.');
        if trimmed.is_empty() {
            "download".to_string()
        } else {
            trimmed.to_string()
        }
    }
}

#[async_trait]
impl SaveSink for DirSaveSink {
    async fn save(&self, file: &RippedFile) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create output directory {:?}", self.dir))?;
        let path = self.dir.join(Self::sanitize(&file.name));
        tokio::fs::write(&path, &file.bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!(path = ?path, bytes = file.bytes.len(), "saved rip");
        Ok(())
    }
}
