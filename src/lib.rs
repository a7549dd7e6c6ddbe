//! Line-level diff and selective patch review for proposed file edits.
//!
//! Proposed operations are coalesced per path, previewed against current
//! content, and reviewed line by line: each accept or decline recomputes the
//! file from the diff and the decisions so far, and apply or discard settles
//! the whole batch.

pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod ops;
pub mod preview;
pub mod review;
pub mod store;

pub use config::{load_config, ReviewConfig};
pub use diff::{diff_contents, diff_lines, DiffEntry, DiffKind, DiffLimits};
pub use engine::ReviewEngine;
pub use error::{ReviewError, StoreError, WriteFailure};
pub use ops::{coalesce, FileOperation, OperationKind};
pub use preview::{PreviewBuilder, PreviewToken, PreviewedOperation};
pub use review::{LineKind, ReviewSession, ReviewState};
pub use store::{FileStore, FsStore, MemoryStore, OpenBuffers};
