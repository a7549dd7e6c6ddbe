use super::FileStore;
use crate::error::StoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A store backed by a directory on disk. Relative paths resolve against
/// `root`; absolute paths are used as given.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }
}

#[async_trait]
impl FileStore for FsStore {
    async fn read(&self, path: &str) -> Result<String, StoreError> {
        tokio::fs::read_to_string(self.resolve(path))
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), StoreError> {
        let target = self.resolve(path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(path, e))?;
        }
        tokio::fs::write(&target, content)
            .await
            .map_err(|e| StoreError::io(path, e))
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        tokio::fs::remove_file(self.resolve(path))
            .await
            .map_err(|e| StoreError::io(path, e))
    }
}
