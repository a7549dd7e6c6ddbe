use crate::diff::{DiffEntry, DiffKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which side of the diff a decided line lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// Keyed by the entry's new line number
    Added,
    /// Keyed by the entry's old line number
    Removed,
}

impl LineKind {
    /// Decision key of a diff entry, if the entry can be decided at all
    pub fn key_of(entry: &DiffEntry) -> Option<(LineKind, usize)> {
        match entry.kind {
            DiffKind::Added => entry.new_line.map(|n| (LineKind::Added, n)),
            DiffKind::Removed => entry.old_line.map(|n| (LineKind::Removed, n)),
            DiffKind::Context | DiffKind::Skip => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineKey {
    pub operation: usize,
    pub line: usize,
    pub kind: LineKind,
}

impl LineKey {
    pub fn added(operation: usize, line: usize) -> Self {
        Self {
            operation,
            line,
            kind: LineKind::Added,
        }
    }

    pub fn removed(operation: usize, line: usize) -> Self {
        Self {
            operation,
            line,
            kind: LineKind::Removed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accepted,
    Declined,
}

/// Accepted and declined line sets for one review session. A key is in at
/// most one of the two sets at any time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decisions {
    accepted: BTreeSet<LineKey>,
    declined: BTreeSet<LineKey>,
}

impl Decisions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `decision` for every key, evicting each from the opposite set
    pub fn decide(&mut self, keys: impl IntoIterator<Item = LineKey>, decision: Decision) {
        let (into, out_of) = match decision {
            Decision::Accepted => (&mut self.accepted, &mut self.declined),
            Decision::Declined => (&mut self.declined, &mut self.accepted),
        };
        for key in keys {
            out_of.remove(&key);
            into.insert(key);
        }
    }

    /// Forget any decision for `key`, returning what it was
    pub fn undo(&mut self, key: &LineKey) -> Option<Decision> {
        if self.accepted.remove(key) {
            Some(Decision::Accepted)
        } else if self.declined.remove(key) {
            Some(Decision::Declined)
        } else {
            None
        }
    }

    pub fn get(&self, key: &LineKey) -> Option<Decision> {
        if self.accepted.contains(key) {
            Some(Decision::Accepted)
        } else if self.declined.contains(key) {
            Some(Decision::Declined)
        } else {
            None
        }
    }

    pub fn accepted(&self) -> impl Iterator<Item = &LineKey> {
        self.accepted.iter()
    }

    pub fn declined(&self) -> impl Iterator<Item = &LineKey> {
        self.declined.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty() && self.declined.is_empty()
    }

    pub fn clear(&mut self) {
        self.accepted.clear();
        self.declined.clear();
    }

    /// Forget every decision made on `operation`, returning how many there were
    pub fn clear_operation(&mut self, operation: usize) -> usize {
        let before = self.accepted.len() + self.declined.len();
        self.accepted.retain(|k| k.operation != operation);
        self.declined.retain(|k| k.operation != operation);
        before - self.accepted.len() - self.declined.len()
    }

    /// View restricted to one operation's keys
    pub fn for_operation(&self, operation: usize) -> OperationDecisions<'_> {
        OperationDecisions {
            operation,
            decisions: self,
        }
    }
}

/// Decisions scoped to a single operation. Reconciliation only ever sees this
/// view, so it cannot consult another operation's lines.
#[derive(Debug, Clone, Copy)]
pub struct OperationDecisions<'a> {
    operation: usize,
    decisions: &'a Decisions,
}

impl OperationDecisions<'_> {
    pub fn operation(&self) -> usize {
        self.operation
    }

    pub fn get(&self, kind: LineKind, line: usize) -> Option<Decision> {
        self.decisions.get(&LineKey {
            operation: self.operation,
            line,
            kind,
        })
    }

    pub fn is_declined(&self, kind: LineKind, line: usize) -> bool {
        self.get(kind, line) == Some(Decision::Declined)
    }

    pub fn is_decided(&self, kind: LineKind, line: usize) -> bool {
        self.get(kind, line).is_some()
    }

    pub fn any_declined(&self, kind: LineKind) -> bool {
        self.decisions
            .declined
            .iter()
            .any(|k| k.operation == self.operation && k.kind == kind)
    }

    /// True when no line of this operation has been decided
    pub fn is_empty(&self) -> bool {
        !self
            .decisions
            .accepted
            .iter()
            .chain(&self.decisions.declined)
            .any(|k| k.operation == self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_then_decline_leaves_only_declined() {
        let mut decisions = Decisions::new();
        let key = LineKey::added(0, 5);
        decisions.decide([key], Decision::Accepted);
        decisions.decide([key], Decision::Declined);
        assert_eq!(decisions.get(&key), Some(Decision::Declined));
        assert_eq!(decisions.accepted().count(), 0);
        assert_eq!(decisions.declined().collect::<Vec<_>>(), vec![&key]);
    }

    #[test]
    fn decline_then_accept_leaves_only_accepted() {
        let mut decisions = Decisions::new();
        let key = LineKey::removed(1, 2);
        decisions.decide([key], Decision::Declined);
        decisions.decide([key], Decision::Accepted);
        assert_eq!(decisions.get(&key), Some(Decision::Accepted));
        assert_eq!(decisions.declined().count(), 0);
    }

    #[test]
    fn undo_reports_previous_decision() {
        let mut decisions = Decisions::new();
        let key = LineKey::added(0, 1);
        assert_eq!(decisions.undo(&key), None);
        decisions.decide([key], Decision::Declined);
        assert_eq!(decisions.undo(&key), Some(Decision::Declined));
        assert!(decisions.is_empty());
    }

    #[test]
    fn added_and_removed_keys_are_distinct() {
        let mut decisions = Decisions::new();
        decisions.decide([LineKey::added(0, 3)], Decision::Declined);
        assert_eq!(decisions.get(&LineKey::removed(0, 3)), None);
    }

    #[test]
    fn operation_view_ignores_other_operations() {
        let mut decisions = Decisions::new();
        decisions.decide([LineKey::added(1, 4)], Decision::Declined);
        let view = decisions.for_operation(0);
        assert!(!view.is_declined(LineKind::Added, 4));
        assert!(!view.any_declined(LineKind::Added));
        let view = decisions.for_operation(1);
        assert!(view.is_declined(LineKind::Added, 4));
        assert!(view.any_declined(LineKind::Added));
        assert!(!view.any_declined(LineKind::Removed));
    }

    #[test]
    fn clear_operation_keeps_other_operations() {
        let mut decisions = Decisions::new();
        decisions.decide([LineKey::added(0, 1), LineKey::removed(0, 2)], Decision::Declined);
        decisions.decide([LineKey::added(1, 1)], Decision::Accepted);
        assert_eq!(decisions.clear_operation(0), 2);
        assert!(decisions.for_operation(0).is_empty());
        assert!(!decisions.for_operation(1).is_empty());
        assert_eq!(decisions.clear_operation(0), 0);
    }

    #[test]
    fn key_of_uses_side_specific_line_number() {
        assert_eq!(
            LineKind::key_of(&DiffEntry::added(7, "x")),
            Some((LineKind::Added, 7))
        );
        assert_eq!(
            LineKind::key_of(&DiffEntry::removed(3, "y")),
            Some((LineKind::Removed, 3))
        );
        assert_eq!(LineKind::key_of(&DiffEntry::context(1, 2, "z")), None);
        assert_eq!(LineKind::key_of(&DiffEntry::skip(9)), None);
    }
}
