use super::FileStore;
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// In-memory store for embedding hosts that keep files elsewhere, and for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut map = store.lock();
            for (path, content) in files {
                map.insert(path.to_string(), content.to_string());
            }
        }
        store
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.lock().get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn read(&self, path: &str) -> Result<String, StoreError> {
        self.get(path).ok_or_else(|| StoreError::NotFound {
            path: path.to_string(),
        })
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), StoreError> {
        self.lock().insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        match self.lock().remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
        }
    }
}
