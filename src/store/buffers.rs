use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Content of a file currently open in the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBuffer {
    pub content: String,
    /// Unsaved-changes marker
    pub dirty: bool,
}

/// Shared handle to the editor's open buffers. Clones share state, so the
/// handle can be moved into background write tasks.
#[derive(Debug, Clone, Default)]
pub struct OpenBuffers {
    inner: Arc<Mutex<HashMap<String, OpenBuffer>>>,
}

impl OpenBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, path: &str, content: &str) {
        self.lock().insert(
            path.to_string(),
            OpenBuffer {
                content: content.to_string(),
                dirty: false,
            },
        );
    }

    pub fn close(&self, path: &str) -> Option<OpenBuffer> {
        self.lock().remove(path)
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<OpenBuffer> {
        self.lock().get(path).cloned()
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.lock().get(path).map(|b| b.content.clone())
    }

    /// Replace the content of an open buffer. Returns false (and does nothing)
    /// when no buffer is open for `path`.
    pub fn replace(&self, path: &str, content: &str, dirty: bool) -> bool {
        match self.lock().get_mut(path) {
            Some(buffer) => {
                buffer.content = content.to_string();
                buffer.dirty = dirty;
                true
            }
            None => false,
        }
    }

    pub fn set_dirty(&self, path: &str, dirty: bool) {
        if let Some(buffer) = self.lock().get_mut(path) {
            buffer.dirty = dirty;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, OpenBuffer>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
