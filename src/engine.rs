use crate::config::ReviewConfig;
use crate::error::ReviewError;
use crate::ops::{coalesce, FileOperation};
use crate::preview::{PreviewBuilder, PreviewToken, PreviewedOperation};
use crate::review::{ReviewSession, WriteScheduler};
use crate::store::{FileStore, OpenBuffers};
use std::sync::Arc;

/// Entry point for a host: turns each batch of proposed operations into a
/// review session sharing one store, one set of open buffers and one write
/// scheduler.
pub struct ReviewEngine {
    builder: PreviewBuilder,
    writer: Arc<WriteScheduler>,
    config: ReviewConfig,
}

impl ReviewEngine {
    pub fn new(store: Arc<dyn FileStore>, buffers: OpenBuffers, config: ReviewConfig) -> Self {
        let builder = PreviewBuilder::new(Arc::clone(&store), buffers.clone(), config.diff_limits());
        let writer = Arc::new(WriteScheduler::new(store, buffers));
        Self {
            builder,
            writer,
            config,
        }
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    pub fn builder(&self) -> &PreviewBuilder {
        &self.builder
    }

    pub fn begin_request(&self) -> PreviewToken {
        self.builder.begin_request()
    }

    /// Coalesce and preview a batch, then load it into a fresh session.
    /// An empty batch (after coalescing) yields an idle session.
    pub async fn propose(&self, operations: Vec<FileOperation>) -> Result<ReviewSession, ReviewError> {
        let operations = coalesce(operations);
        let previews = self.builder.build_previews(&operations).await;
        self.session_with(previews)
    }

    /// Like [`propose`](Self::propose), but yields `None` when a newer request
    /// started while this one was reading.
    pub async fn propose_latest(
        &self,
        token: PreviewToken,
        operations: Vec<FileOperation>,
    ) -> Result<Option<ReviewSession>, ReviewError> {
        let operations = coalesce(operations);
        match self.builder.build_latest(token, &operations).await {
            Some(previews) => self.session_with(previews).map(Some),
            None => Ok(None),
        }
    }

    fn session_with(&self, previews: Vec<PreviewedOperation>) -> Result<ReviewSession, ReviewError> {
        let mut session = ReviewSession::new(Arc::clone(&self.writer), self.config.session_options());
        session.load(previews)?;
        Ok(session)
    }
}
