//! Per-path write scheduling with latest-wins semantics.
//!
//! Every write for a path takes a fresh version stamp. Writes for one path run
//! one at a time; a write whose stamp is no longer the newest when its turn
//! comes is dropped. Unrelated paths never wait on each other.

use crate::error::{StoreError, WriteFailure};
use crate::preview::content_hash;
use crate::store::{FileStore, OpenBuffers};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteIntent {
    Write(String),
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    Deleted,
    /// Same content as the last write for this path; nothing sent
    Unchanged,
    /// A newer write for this path was scheduled first
    Superseded,
}

#[derive(Debug, Default)]
struct PathSlot {
    latest: AtomicU64,
    gate: tokio::sync::Mutex<()>,
    last_written: Mutex<Option<String>>,
}

impl PathSlot {
    fn next_stamp(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_latest(&self, stamp: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == stamp
    }

    fn last_written(&self) -> MutexGuard<'_, Option<String>> {
        self.last_written.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct WriteScheduler {
    store: Arc<dyn FileStore>,
    buffers: OpenBuffers,
    slots: Mutex<HashMap<String, Arc<PathSlot>>>,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
    failures: Arc<Mutex<Vec<WriteFailure>>>,
}

impl WriteScheduler {
    pub fn new(store: Arc<dyn FileStore>, buffers: OpenBuffers) -> Self {
        Self {
            store,
            buffers,
            slots: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(Vec::new()),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn FileStore> {
        &self.store
    }

    pub fn buffers(&self) -> &OpenBuffers {
        &self.buffers
    }

    /// Queue a background write of `content` to `path` and return at once.
    ///
    /// Identical content to the previous write for the path is skipped. On
    /// failure the path's open buffer is marked unsaved again and the failure
    /// is kept for [`take_failures`](Self::take_failures).
    pub fn schedule(&self, path: &str, content: String) {
        let slot = self.slot(path);
        let stamp = slot.next_stamp();
        let store = Arc::clone(&self.store);
        let buffers = self.buffers.clone();
        let failures = Arc::clone(&self.failures);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("No async runtime; write to {} not scheduled", path);
            self.buffers.set_dirty(path, true);
            lock(&self.failures).push(WriteFailure {
                path: path.to_string(),
                message: "no async runtime to run the write".into(),
            });
            return;
        };
        let path = path.to_string();

        let task = async move {
            let intent = WriteIntent::Write(content);
            match run_write(store.as_ref(), &slot, stamp, &path, &intent, true).await {
                Ok(WriteOutcome::Superseded) => {
                    log::debug!("write to {} superseded by a newer one", path);
                }
                Ok(_) => {}
                Err(e) => {
                    log::warn!("Failed to persist reconciled {}: {}", path, e);
                    buffers.set_dirty(&path, true);
                    lock(&failures).push(WriteFailure::new(&path, &e));
                }
            }
        };

        let mut in_flight = lock(&self.in_flight);
        in_flight.retain(|handle| !handle.is_finished());
        in_flight.push(runtime.spawn(task));
    }

    /// Write or delete `path` now, superseding any queued write for it
    pub async fn commit(&self, path: &str, intent: WriteIntent) -> Result<WriteOutcome, StoreError> {
        let slot = self.slot(path);
        let stamp = slot.next_stamp();
        run_write(self.store.as_ref(), &slot, stamp, path, &intent, false).await
    }

    /// Wait for every queued background write to finish
    pub async fn flush(&self) {
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *lock(&self.in_flight));
        for result in join_all(handles).await {
            if let Err(e) = result {
                log::warn!("Background write task failed: {}", e);
            }
        }
    }

    /// Drain failures recorded by background writes
    pub fn take_failures(&self) -> Vec<WriteFailure> {
        std::mem::take(&mut *lock(&self.failures))
    }

    fn slot(&self, path: &str) -> Arc<PathSlot> {
        Arc::clone(lock(&self.slots).entry(path.to_string()).or_default())
    }
}

async fn run_write(
    store: &dyn FileStore,
    slot: &PathSlot,
    stamp: u64,
    path: &str,
    intent: &WriteIntent,
    skip_unchanged: bool,
) -> Result<WriteOutcome, StoreError> {
    let _turn = slot.gate.lock().await;
    if !slot.is_latest(stamp) {
        return Ok(WriteOutcome::Superseded);
    }

    match intent {
        WriteIntent::Write(content) => {
            let hash = content_hash(content);
            if skip_unchanged && slot.last_written().as_deref() == Some(hash.as_str()) {
                return Ok(WriteOutcome::Unchanged);
            }
            // Forget the old hash first so a failed write is never mistaken for a landed one
            *slot.last_written() = None;
            store.write(path, content).await?;
            *slot.last_written() = Some(hash);
            Ok(WriteOutcome::Written)
        }
        WriteIntent::Delete => {
            *slot.last_written() = None;
            store.delete(path).await?;
            Ok(WriteOutcome::Deleted)
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
