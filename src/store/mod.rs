//! Collaborators the engine reads from and writes through: the persistence
//! layer (`FileStore`) and the editor's open-buffer cache (`OpenBuffers`).
//!
//! Paths are opaque keys here. Normalizing them is the caller's job.

mod buffers;
mod fs;
mod memory;

pub use buffers::{OpenBuffer, OpenBuffers};
pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::error::StoreError;
use async_trait::async_trait;

/// Persistence collaborator: whole-file reads, writes and deletes by path
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn read(&self, path: &str) -> Result<String, StoreError>;
    async fn write(&self, path: &str, content: &str) -> Result<(), StoreError>;
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}
