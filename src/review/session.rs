//! Review session over one batch of proposed operations.
//!
//! `Idle -> PendingReview -> Reviewing -> {Applied | Discarded}`. Every line
//! decision recomputes that operation's content, pushes it into any open
//! buffer and queues a background write. Apply and discard are awaited and
//! supersede queued writes for the same path.

use super::decisions::{Decision, Decisions, LineKey, LineKind};
use super::filter::{apply_filter, parse_filter_expr, FilterRule};
use super::reconcile::{group_containing, has_undecided_added, reconcile};
use super::writer::{WriteIntent, WriteScheduler};
use crate::error::{ReviewError, WriteFailure};
use crate::ops::OperationKind;
use crate::preview::{content_hash, PreviewedOperation};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Added lines at most this far apart are decided as one group
pub const DEFAULT_GROUP_GAP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Idle,
    PendingReview,
    Reviewing,
    Applied,
    Discarded,
}

impl ReviewState {
    pub fn label(&self) -> &'static str {
        match self {
            ReviewState::Idle => "idle",
            ReviewState::PendingReview => "pending review",
            ReviewState::Reviewing => "reviewing",
            ReviewState::Applied => "applied",
            ReviewState::Discarded => "discarded",
        }
    }

    /// Apply and discard are allowed
    pub fn is_open(&self) -> bool {
        matches!(self, ReviewState::PendingReview | ReviewState::Reviewing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ReviewState::Applied | ReviewState::Discarded)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub group_gap: usize,
    /// Filter expression applied to the visible file list
    pub filter: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            group_gap: DEFAULT_GROUP_GAP,
            filter: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub written: Vec<String>,
    pub deleted: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscardSummary {
    /// Edited or deleted files written back to their original content
    pub restored: Vec<String>,
    /// Created files removed again
    pub removed: Vec<String>,
    pub failures: Vec<WriteFailure>,
}

pub struct ReviewSession {
    state: ReviewState,
    operations: Vec<PreviewedOperation>,
    active: usize,
    decisions: Decisions,
    /// Operations with at least one decided line
    resolved: BTreeSet<usize>,
    /// Operations whose target this session has written or deleted, by a
    /// reconcile write or by apply
    written: BTreeSet<usize>,
    writer: Arc<WriteScheduler>,
    filter_expr: String,
    filter: Vec<FilterRule>,
    group_gap: usize,
}

impl ReviewSession {
    pub fn new(writer: Arc<WriteScheduler>, options: SessionOptions) -> Self {
        let filter = parse_filter_expr(&options.filter);
        Self {
            state: ReviewState::Idle,
            operations: Vec::new(),
            active: 0,
            decisions: Decisions::new(),
            resolved: BTreeSet::new(),
            written: BTreeSet::new(),
            writer,
            filter_expr: options.filter.trim().to_string(),
            filter,
            group_gap: options.group_gap,
        }
    }

    pub fn state(&self) -> ReviewState {
        self.state
    }

    pub fn operations(&self) -> &[PreviewedOperation] {
        &self.operations
    }

    pub fn operation(&self, index: usize) -> Result<&PreviewedOperation, ReviewError> {
        self.operations
            .get(index)
            .ok_or(ReviewError::UnknownOperation { index })
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn active(&self) -> Option<&PreviewedOperation> {
        self.operations.get(self.active)
    }

    pub fn decisions(&self) -> &Decisions {
        &self.decisions
    }

    pub fn is_resolved(&self, index: usize) -> bool {
        self.resolved.contains(&index)
    }

    pub fn group_gap(&self) -> usize {
        self.group_gap
    }

    // ── Lifecycle ──

    /// Take ownership of a batch of previews. An empty batch leaves the
    /// session idle.
    pub fn load(&mut self, operations: Vec<PreviewedOperation>) -> Result<(), ReviewError> {
        if self.state != ReviewState::Idle {
            return Err(self.invalid("load operations"));
        }
        if operations.is_empty() {
            log::debug!("no operations proposed; session stays idle");
            return Ok(());
        }
        log::info!("{} operation(s) ready for review", operations.len());
        self.operations = operations;
        self.active = 0;
        self.state = ReviewState::PendingReview;
        Ok(())
    }

    pub fn start_review(&mut self) -> Result<(), ReviewError> {
        if self.state != ReviewState::PendingReview {
            return Err(self.invalid("start review"));
        }
        self.state = ReviewState::Reviewing;
        let visible = self.visible_indices();
        self.active = visible
            .iter()
            .copied()
            .find(|&i| self.is_pending(i))
            .or_else(|| visible.first().copied())
            .unwrap_or(0);
        log::info!(
            "review started at {}",
            self.active().map(|op| op.path()).unwrap_or_default()
        );
        Ok(())
    }

    /// Persist every operation's reconciled content, or delete the target of
    /// a delete whose removals all stand.
    ///
    /// When any file fails, the error lists every failure and the session
    /// keeps its state and decisions so the caller can retry.
    pub async fn apply(&mut self) -> Result<ApplySummary, ReviewError> {
        if !self.state.is_open() {
            return Err(self.invalid("apply"));
        }

        let plan: Vec<(usize, String, WriteIntent)> = self
            .operations
            .iter()
            .enumerate()
            .map(|(i, op)| (i, op.path().to_string(), self.final_intent(i, op)))
            .collect();
        let writer = &self.writer;
        let results = join_all(
            plan.iter()
                .map(|(_, path, intent)| writer.commit(path, intent.clone())),
        )
        .await;

        let buffers = self.writer.buffers().clone();
        let mut summary = ApplySummary::default();
        let mut failures = Vec::new();
        for ((index, path, intent), result) in plan.into_iter().zip(results) {
            match (intent, result) {
                (WriteIntent::Write(content), Ok(_)) => {
                    self.written.insert(index);
                    buffers.replace(&path, &content, false);
                    summary.written.push(path);
                }
                (WriteIntent::Delete, Ok(_)) => {
                    self.written.insert(index);
                    buffers.close(&path);
                    summary.deleted.push(path);
                }
                (WriteIntent::Delete, Err(e)) if e.is_not_found() => {
                    log::debug!("{} already absent", path);
                    buffers.close(&path);
                    summary.deleted.push(path);
                }
                (_, Err(e)) => {
                    log::warn!("Failed to apply {}: {}", path, e);
                    buffers.set_dirty(&path, true);
                    failures.push(WriteFailure::new(&path, &e));
                }
            }
        }

        if !failures.is_empty() {
            return Err(ReviewError::WriteFailures(failures));
        }

        self.drain_background_writes().await;
        self.finish(ReviewState::Applied);
        log::info!(
            "applied review: {} written, {} deleted",
            summary.written.len(),
            summary.deleted.len()
        );
        Ok(summary)
    }

    /// Undo everything this session wrote, including the partial result of
    /// a failed apply: created files are removed and edited or deleted files
    /// get their original content back. A target that did not exist at
    /// preview time is removed instead. Files the session never wrote are
    /// left alone. Failures are reported in the summary; the session ends
    /// regardless.
    pub async fn discard(&mut self) -> Result<DiscardSummary, ReviewError> {
        if !self.state.is_open() {
            return Err(self.invalid("discard"));
        }

        let buffers = self.writer.buffers().clone();
        let mut summary = DiscardSummary::default();
        for (i, op) in self.operations.iter().enumerate() {
            if !self.written.contains(&i) {
                continue;
            }
            let path = op.path();
            match op.kind() {
                OperationKind::Edit | OperationKind::Delete if !op.before_missing => {
                    buffers.replace(path, &op.before, false);
                    match self
                        .writer
                        .commit(path, WriteIntent::Write(op.before.clone()))
                        .await
                    {
                        Ok(_) => summary.restored.push(path.to_string()),
                        Err(e) => {
                            log::warn!("Failed to restore {} on discard: {}", path, e);
                            buffers.set_dirty(path, true);
                            summary.failures.push(WriteFailure::new(path, &e));
                        }
                    }
                }
                // Created, or edited where nothing existed before
                _ => {
                    buffers.close(path);
                    match self.writer.commit(path, WriteIntent::Delete).await {
                        Ok(_) => summary.removed.push(path.to_string()),
                        Err(e) if e.is_not_found() => {}
                        Err(e) => {
                            log::warn!("Failed to remove {} on discard: {}", path, e);
                            summary.failures.push(WriteFailure::new(path, &e));
                        }
                    }
                }
            }
        }

        self.drain_background_writes().await;
        self.finish(ReviewState::Discarded);
        log::info!(
            "discarded review: {} restored, {} removed",
            summary.restored.len(),
            summary.removed.len()
        );
        Ok(summary)
    }

    /// Wait for queued reconcile writes and collect the ones that failed
    pub async fn settle(&self) -> Vec<WriteFailure> {
        self.writer.flush().await;
        self.writer.take_failures()
    }

    // ── Decisions ──

    /// Accept lines of one operation; returns the operation's new content
    pub fn accept_lines(
        &mut self,
        operation: usize,
        kind: LineKind,
        lines: &[usize],
    ) -> Result<String, ReviewError> {
        self.decide(operation, kind, lines, Decision::Accepted)
    }

    pub fn decline_lines(
        &mut self,
        operation: usize,
        kind: LineKind,
        lines: &[usize],
    ) -> Result<String, ReviewError> {
        self.decide(operation, kind, lines, Decision::Declined)
    }

    /// Accept the group of adjacent added lines that contains `line`
    pub fn accept_group(&mut self, operation: usize, line: usize) -> Result<String, ReviewError> {
        let group = self.group_of(operation, line)?;
        self.decide(operation, LineKind::Added, &group, Decision::Accepted)
    }

    pub fn decline_group(&mut self, operation: usize, line: usize) -> Result<String, ReviewError> {
        let group = self.group_of(operation, line)?;
        self.decide(operation, LineKind::Added, &group, Decision::Declined)
    }

    /// Forget the decision on one line. Returns what the decision was.
    pub fn undo_line(
        &mut self,
        operation: usize,
        kind: LineKind,
        line: usize,
    ) -> Result<Option<Decision>, ReviewError> {
        self.ensure_reviewing("undo a decision")?;
        self.operation(operation)?;
        let previous = self.decisions.undo(&LineKey {
            operation,
            line,
            kind,
        });
        if previous.is_some() {
            if self.decisions.for_operation(operation).is_empty() {
                self.resolved.remove(&operation);
            }
            self.reconcile_and_write(operation);
        }
        Ok(previous)
    }

    /// Forget every decision on one operation, returning it to "apply everything"
    pub fn undo_operation(&mut self, operation: usize) -> Result<usize, ReviewError> {
        self.ensure_reviewing("undo decisions")?;
        self.operation(operation)?;
        let cleared = self.decisions.clear_operation(operation);
        self.resolved.remove(&operation);
        if cleared > 0 {
            self.reconcile_and_write(operation);
        }
        Ok(cleared)
    }

    /// Content the operation would produce with the current decisions
    pub fn reconciled_content(&self, operation: usize) -> Result<String, ReviewError> {
        let op = self.operation(operation)?;
        Ok(reconcile(op, self.decisions.for_operation(operation)))
    }

    fn decide(
        &mut self,
        operation: usize,
        kind: LineKind,
        lines: &[usize],
        decision: Decision,
    ) -> Result<String, ReviewError> {
        self.ensure_reviewing("decide lines")?;
        self.operation(operation)?;
        self.decisions.decide(
            lines.iter().map(|&line| LineKey {
                operation,
                line,
                kind,
            }),
            decision,
        );
        self.resolved.insert(operation);
        Ok(self.reconcile_and_write(operation))
    }

    fn group_of(&self, operation: usize, line: usize) -> Result<Vec<usize>, ReviewError> {
        let op = self.operation(operation)?;
        Ok(group_containing(op, line, self.group_gap).unwrap_or_else(|| vec![line]))
    }

    fn reconcile_and_write(&mut self, operation: usize) -> String {
        let Some(op) = self.operations.get(operation) else {
            return String::new();
        };
        let content = reconcile(op, self.decisions.for_operation(operation));
        self.writer.buffers().replace(op.path(), &content, false);
        self.writer.schedule(op.path(), content.clone());
        self.written.insert(operation);
        content
    }

    fn final_intent(&self, index: usize, op: &PreviewedOperation) -> WriteIntent {
        let decisions = self.decisions.for_operation(index);
        if op.kind() == OperationKind::Delete && !decisions.any_declined(LineKind::Removed) {
            WriteIntent::Delete
        } else {
            WriteIntent::Write(reconcile(op, decisions))
        }
    }

    // ── Navigation ──

    /// Whether the operation still has an added line nobody decided on
    pub fn is_pending(&self, index: usize) -> bool {
        self.operations
            .get(index)
            .is_some_and(|op| has_undecided_added(op, self.decisions.for_operation(index)))
    }

    /// Operations with at least one undecided added line, filter or not
    pub fn pending_count(&self) -> usize {
        (0..self.operations.len())
            .filter(|&i| self.is_pending(i))
            .count()
    }

    /// Move to the next visible operation with undecided added lines,
    /// wrapping around. Stays put and returns `None` when there is none.
    pub fn next_pending(&mut self) -> Result<Option<usize>, ReviewError> {
        self.ensure_state(ReviewState::Reviewing, "navigate")?;
        let visible = self.visible_indices();
        let start = visible
            .iter()
            .position(|&i| i == self.active)
            .map_or(0, |pos| pos + 1);
        let found = visible[start..]
            .iter()
            .chain(&visible[..start])
            .copied()
            .find(|&i| self.is_pending(i));
        if let Some(index) = found {
            self.active = index;
        }
        Ok(found)
    }

    /// Step through the visible list, stopping at either end
    pub fn navigate(&mut self, direction: Direction) -> Result<usize, ReviewError> {
        self.ensure_state(ReviewState::Reviewing, "navigate")?;
        let visible = self.visible_indices();
        let Some(&first) = visible.first() else {
            return Ok(self.active);
        };
        self.active = match visible.iter().position(|&i| i == self.active) {
            Some(pos) => match direction {
                Direction::Next => visible[(pos + 1).min(visible.len() - 1)],
                Direction::Previous => visible[pos.saturating_sub(1)],
            },
            // Current selection filtered out; snap to first
            None => first,
        };
        Ok(self.active)
    }

    pub fn select(&mut self, index: usize) -> Result<(), ReviewError> {
        self.ensure_state(ReviewState::Reviewing, "select a file")?;
        self.operation(index)?;
        self.active = index;
        Ok(())
    }

    // ── Filter ──

    pub fn set_filter(&mut self, expr: &str) {
        self.filter_expr = expr.trim().to_string();
        self.filter = parse_filter_expr(expr);
    }

    pub fn clear_filter(&mut self) {
        self.set_filter("");
    }

    pub fn filter_expr(&self) -> &str {
        &self.filter_expr
    }

    pub fn visible_operations(&self) -> Vec<(usize, &PreviewedOperation)> {
        self.operations
            .iter()
            .enumerate()
            .filter(|(_, op)| apply_filter(&self.filter, op))
            .collect()
    }

    fn visible_indices(&self) -> Vec<usize> {
        self.visible_operations().into_iter().map(|(i, _)| i).collect()
    }

    // ── Staleness ──

    /// Paths whose stored content changed since the preview was built, other
    /// than by this session's own writes.
    pub async fn stale_paths(&self) -> Vec<String> {
        self.writer.flush().await;
        let store = self.writer.store();
        let checks = self
            .operations
            .iter()
            .enumerate()
            .filter(|(_, op)| op.kind() != OperationKind::Create)
            .map(|(i, op)| async move {
                let current = match store.read(op.path()).await {
                    Ok(content) => content,
                    Err(e) if e.is_not_found() => String::new(),
                    Err(e) => {
                        log::warn!("Failed to re-read {}: {}", op.path(), e);
                        return None;
                    }
                };
                let current = content_hash(&current);
                if current == op.before_hash {
                    return None;
                }
                if self.written.contains(&i)
                    && current == content_hash(&reconcile(op, self.decisions.for_operation(i)))
                {
                    return None;
                }
                Some(op.path().to_string())
            });
        join_all(checks).await.into_iter().flatten().collect()
    }

    // ── Internals ──

    fn finish(&mut self, state: ReviewState) {
        self.decisions.clear();
        self.resolved.clear();
        self.written.clear();
        self.state = state;
    }

    async fn drain_background_writes(&self) {
        self.writer.flush().await;
        let superseded = self.writer.take_failures();
        if !superseded.is_empty() {
            log::debug!(
                "{} earlier background write failure(s) superseded",
                superseded.len()
            );
        }
    }

    /// Decisions are allowed once proposals are loaded; the first one starts
    /// the review if the caller skipped that step.
    fn ensure_reviewing(&mut self, action: &'static str) -> Result<(), ReviewError> {
        match self.state {
            ReviewState::Reviewing => Ok(()),
            ReviewState::PendingReview => {
                log::info!("review started by first decision");
                self.state = ReviewState::Reviewing;
                Ok(())
            }
            _ => Err(self.invalid(action)),
        }
    }

    fn ensure_state(&self, state: ReviewState, action: &'static str) -> Result<(), ReviewError> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> ReviewError {
        ReviewError::InvalidTransition {
            state: self.state.label(),
            action,
        }
    }
}
