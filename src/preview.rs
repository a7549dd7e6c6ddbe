//! Preview building: pairs every proposed operation with the content it
//! replaces and the diff between the two.
//!
//! Reads for a batch run concurrently. A read that fails degrades that one
//! preview to an empty "before" and never blocks the rest of the batch.

use crate::diff::{change_counts, diff_contents, DiffEntry, DiffLimits};
use crate::ops::{FileOperation, OperationKind};
use crate::store::{FileStore, OpenBuffers};
use futures::future::join_all;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Compute SHA-256 hash of file content (for staleness detection)
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A proposed operation together with its comparison data
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewedOperation {
    #[serde(flatten)]
    pub operation: FileOperation,
    pub before: String,
    pub after: String,
    pub diff: Vec<DiffEntry>,
    /// Hash of `before` at preview time
    pub before_hash: String,
    /// The target did not exist when the preview was built
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub before_missing: bool,
}

impl PreviewedOperation {
    /// Build a preview from already-resolved "before" content. `before` is
    /// ignored for creates, which always start from nothing.
    pub fn new(operation: FileOperation, before: String, limits: &DiffLimits) -> Self {
        let before = match operation.kind {
            OperationKind::Create => String::new(),
            OperationKind::Edit | OperationKind::Delete => before,
        };
        let after = match operation.kind {
            OperationKind::Create | OperationKind::Edit => operation.content.clone(),
            OperationKind::Delete => String::new(),
        };
        let diff = diff_contents(&before, &after, limits);
        let before_hash = content_hash(&before);
        Self {
            operation,
            before,
            after,
            diff,
            before_hash,
            before_missing: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.operation.path
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind
    }

    /// (added, removed) line counts
    pub fn change_counts(&self) -> (usize, usize) {
        change_counts(&self.diff)
    }
}

/// Identifies one preview request; only the most recent one is current
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PreviewToken(u64);

/// Monotonic source of preview request tokens
#[derive(Debug, Default)]
pub struct PreviewRequests {
    latest: AtomicU64,
}

impl PreviewRequests {
    pub fn begin(&self) -> PreviewToken {
        PreviewToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: PreviewToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }
}

pub struct PreviewBuilder {
    store: Arc<dyn FileStore>,
    buffers: OpenBuffers,
    limits: DiffLimits,
    requests: PreviewRequests,
}

impl PreviewBuilder {
    pub fn new(store: Arc<dyn FileStore>, buffers: OpenBuffers, limits: DiffLimits) -> Self {
        Self {
            store,
            buffers,
            limits,
            requests: PreviewRequests::default(),
        }
    }

    pub fn limits(&self) -> &DiffLimits {
        &self.limits
    }

    /// Start a new preview request, superseding any still in flight
    pub fn begin_request(&self) -> PreviewToken {
        self.requests.begin()
    }

    /// Preview every operation, preserving input order regardless of the
    /// order reads complete in.
    pub async fn build_previews(&self, operations: &[FileOperation]) -> Vec<PreviewedOperation> {
        join_all(operations.iter().map(|op| self.build_one(op))).await
    }

    /// Like [`build_previews`](Self::build_previews), but returns `None` when
    /// a newer request was started while this one was reading.
    pub async fn build_latest(
        &self,
        token: PreviewToken,
        operations: &[FileOperation],
    ) -> Option<Vec<PreviewedOperation>> {
        let previews = self.build_previews(operations).await;
        if self.requests.is_current(token) {
            Some(previews)
        } else {
            log::debug!("discarding superseded preview request {:?}", token);
            None
        }
    }

    async fn build_one(&self, op: &FileOperation) -> PreviewedOperation {
        let (before, missing) = match op.kind {
            OperationKind::Create => (String::new(), false),
            OperationKind::Edit | OperationKind::Delete => self.resolve_before(&op.path).await,
        };
        let mut preview = PreviewedOperation::new(op.clone(), before, &self.limits);
        preview.before_missing = missing;
        preview
    }

    /// Current content for `path`: the open buffer if there is one, else a
    /// read through the store. A failed read falls back to empty content;
    /// the flag is set when the store reports the file as absent.
    async fn resolve_before(&self, path: &str) -> (String, bool) {
        if let Some(content) = self.buffers.content(path) {
            return (content, false);
        }
        match self.store.read(path).await {
            Ok(content) => (content, false),
            Err(e) if e.is_not_found() => {
                log::debug!("{} does not exist yet; previewing against empty content", path);
                (String::new(), true)
            }
            Err(e) => {
                log::warn!("Failed to read {} for preview: {}", path, e);
                (String::new(), false)
            }
        }
    }
}
