use super::decisions::{LineKind, OperationDecisions};
use crate::diff::{split_lines, DiffKind};
use crate::preview::PreviewedOperation;
use std::collections::{BTreeMap, HashSet};

/// Recompute an operation's resulting content from its diff and the current
/// decisions for that operation.
///
/// The baseline is "apply everything": undecided added lines are kept and
/// undecided removals stand. Declining an added line drops it; declining a
/// removed line restores it at its original position, after the last
/// "after" line that precedes it in the diff. Lines beyond the diffed
/// region (when the diff was truncated) pass through unchanged.
pub fn reconcile(op: &PreviewedOperation, decisions: OperationDecisions<'_>) -> String {
    let after = split_lines(&op.after);

    let mut dropped: HashSet<usize> = HashSet::new();
    // Anchor = number of "after" lines that precede the restored line
    let mut restored: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    // Removed lines seen since a skip row, waiting for the next anchor
    let mut unanchored: Vec<&str> = Vec::new();
    let mut last_new: Option<usize> = Some(0);

    for entry in &op.diff {
        match entry.kind {
            DiffKind::Context | DiffKind::Added => {
                let Some(n) = entry.new_line else { continue };
                if !unanchored.is_empty() {
                    restored
                        .entry(n - 1)
                        .or_default()
                        .extend(unanchored.drain(..));
                }
                last_new = Some(n);
                if entry.kind == DiffKind::Added && decisions.is_declined(LineKind::Added, n) {
                    dropped.insert(n);
                }
            }
            DiffKind::Removed => {
                let Some(o) = entry.old_line else { continue };
                if !decisions.is_declined(LineKind::Removed, o) {
                    continue;
                }
                match last_new {
                    Some(anchor) => restored.entry(anchor).or_default().push(&entry.text),
                    None => unanchored.push(&entry.text),
                }
            }
            DiffKind::Skip => last_new = None,
        }
    }
    if !unanchored.is_empty() {
        restored.entry(after.len()).or_default().extend(unanchored);
    }

    let restored_count: usize = restored.values().map(Vec::len).sum();
    let mut lines: Vec<&str> = Vec::with_capacity(after.len() + restored_count);
    for (idx, line) in after.iter().copied().enumerate() {
        if let Some(extra) = restored.get(&idx) {
            lines.extend(extra);
        }
        if !dropped.contains(&(idx + 1)) {
            lines.push(line);
        }
    }
    if let Some(extra) = restored.get(&after.len()) {
        lines.extend(extra);
    }

    lines.join("\n")
}

/// New line numbers of every added row, in diff order
pub fn added_lines(op: &PreviewedOperation) -> Vec<usize> {
    op.diff
        .iter()
        .filter(|e| e.kind == DiffKind::Added)
        .filter_map(|e| e.new_line)
        .collect()
}

/// Old line numbers of every removed row, in diff order
pub fn removed_lines(op: &PreviewedOperation) -> Vec<usize> {
    op.diff
        .iter()
        .filter(|e| e.kind == DiffKind::Removed)
        .filter_map(|e| e.old_line)
        .collect()
}

/// True when some added line has no decision yet
pub fn has_undecided_added(op: &PreviewedOperation, decisions: OperationDecisions<'_>) -> bool {
    added_lines(op)
        .into_iter()
        .any(|n| !decisions.is_decided(LineKind::Added, n))
}

/// Added lines grouped for deciding together: a line joins the previous
/// group when its number is at most `gap` past the group's last line.
pub fn added_groups(op: &PreviewedOperation, gap: usize) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for line in added_lines(op) {
        match groups.last_mut() {
            Some(group) if group.last().is_some_and(|&prev| line - prev <= gap) => {
                group.push(line)
            }
            _ => groups.push(vec![line]),
        }
    }
    groups
}

/// The added-line group that contains `line`
pub fn group_containing(op: &PreviewedOperation, line: usize, gap: usize) -> Option<Vec<usize>> {
    added_groups(op, gap)
        .into_iter()
        .find(|group| group.contains(&line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffEntry, DiffLimits};
    use crate::ops::FileOperation;
    use crate::review::decisions::{Decision, Decisions, LineKey};

    fn make_edit(before: &str, after: &str) -> PreviewedOperation {
        PreviewedOperation::new(
            FileOperation::edit("f.txt", after),
            before.to_string(),
            &DiffLimits::default(),
        )
    }

    fn decline_all(op: &PreviewedOperation, decisions: &mut Decisions) {
        let added = added_lines(op).into_iter().map(|n| LineKey::added(0, n));
        let removed = removed_lines(op).into_iter().map(|n| LineKey::removed(0, n));
        decisions.decide(added.chain(removed), Decision::Declined);
    }

    #[test]
    fn scenario_declined_addition_with_undecided_removal() {
        let op = make_edit("a\nb\nc", "a\nX\nc");
        let mut decisions = Decisions::new();
        decisions.decide([LineKey::added(0, 2)], Decision::Declined);
        assert_eq!(reconcile(&op, decisions.for_operation(0)), "a\nc");
    }

    #[test]
    fn no_decisions_yields_after() {
        let op = make_edit("a\nb\nc", "a\nX\nc\nd");
        assert_eq!(reconcile(&op, Decisions::new().for_operation(0)), op.after);
    }

    #[test]
    fn accepting_everything_yields_after() {
        let op = make_edit("one\ntwo\nthree\n", "zero\none\n3\nthree\nfour\n");
        let mut decisions = Decisions::new();
        decisions.decide(
            added_lines(&op).into_iter().map(|n| LineKey::added(0, n)),
            Decision::Accepted,
        );
        assert_eq!(reconcile(&op, decisions.for_operation(0)), op.after);
    }

    #[test]
    fn declining_everything_yields_before() {
        let cases = [
            ("a\nb\nc", "a\nX\nc"),
            ("one\ntwo\nthree\n", "zero\none\n3\nthree\nfour\n"),
            ("x\nx\ny", "y\nx\nx\nx"),
            ("keep\ndrop1\ndrop2\nkeep", "keep\nkeep"),
            ("", "fresh\nfile"),
        ];
        for (before, after) in cases {
            let op = make_edit(before, after);
            let mut decisions = Decisions::new();
            decline_all(&op, &mut decisions);
            assert_eq!(
                reconcile(&op, decisions.for_operation(0)),
                before,
                "after={after:?}"
            );
        }
    }

    #[test]
    fn declined_removal_is_restored_in_place() {
        let op = make_edit("a\nb\nc", "a\nX\nc");
        let mut decisions = Decisions::new();
        decisions.decide([LineKey::removed(0, 2)], Decision::Declined);
        assert_eq!(reconcile(&op, decisions.for_operation(0)), "a\nb\nX\nc");
    }

    #[test]
    fn declining_in_any_order_gives_same_content() {
        let op = make_edit("l1\nl2\nl3\nl4", "l1\nl2\nl3\nl4\nn5\nn6\nn7");
        assert_eq!(added_lines(&op), vec![5, 6, 7]);

        let results: Vec<String> = [[6, 5, 7], [5, 6, 7], [7, 6, 5]]
            .iter()
            .map(|order| {
                let mut decisions = Decisions::new();
                for &n in order {
                    decisions.decide([LineKey::added(0, n)], Decision::Declined);
                }
                reconcile(&op, decisions.for_operation(0))
            })
            .collect();
        assert_eq!(results[0], "l1\nl2\nl3\nl4");
        assert!(results.iter().all(|r| r == &results[0]));
    }

    #[test]
    fn decisions_for_other_operations_are_ignored() {
        let op = make_edit("a\nb\nc", "a\nX\nc");
        let mut decisions = Decisions::new();
        decisions.decide(
            [LineKey::added(1, 2), LineKey::removed(1, 2)],
            Decision::Declined,
        );
        assert_eq!(reconcile(&op, decisions.for_operation(0)), "a\nX\nc");
    }

    #[test]
    fn reconcile_is_idempotent() {
        let op = make_edit("a\nb\nc\nd", "a\nc\nE\nd");
        let mut decisions = Decisions::new();
        decisions.decide([LineKey::removed(0, 2)], Decision::Declined);
        let first = reconcile(&op, decisions.for_operation(0));
        assert_eq!(first, reconcile(&op, decisions.for_operation(0)));
    }

    #[test]
    fn delete_with_all_removals_declined_restores_file() {
        let op = PreviewedOperation::new(
            FileOperation::delete("f.txt"),
            "a\nb\n".to_string(),
            &DiffLimits::default(),
        );
        let mut decisions = Decisions::new();
        decline_all(&op, &mut decisions);
        assert_eq!(reconcile(&op, decisions.for_operation(0)), "a\nb\n");
        assert_eq!(reconcile(&op, Decisions::new().for_operation(0)), "");
    }

    #[test]
    fn lines_past_truncated_region_pass_through() {
        let before: Vec<String> = (1..=10).map(|n| format!("b{n}")).collect();
        let after: Vec<String> = (1..=10).map(|n| format!("a{n}")).collect();
        let limits = DiffLimits {
            max_lines_per_side: 3,
            max_diff_entries: 100,
        };
        let op = PreviewedOperation::new(
            FileOperation::edit("f.txt", &after.join("\n")),
            before.join("\n"),
            &limits,
        );
        let mut decisions = Decisions::new();
        decline_all(&op, &mut decisions);
        let result = reconcile(&op, decisions.for_operation(0));
        let expected: Vec<String> = ["b1", "b2", "b3"]
            .iter()
            .map(|s| s.to_string())
            .chain((4..=10).map(|n| format!("a{n}")))
            .collect();
        assert_eq!(result, expected.join("\n"));
    }

    #[test]
    fn removal_after_skip_anchors_to_next_line() {
        let op = PreviewedOperation {
            operation: FileOperation::edit("f.txt", "n1\nn2\nn3"),
            before: String::new(),
            after: "n1\nn2\nn3".into(),
            diff: vec![
                DiffEntry::added(1, "n1"),
                DiffEntry::skip(4),
                DiffEntry::removed(9, "old9"),
                DiffEntry::added(3, "n3"),
            ],
            before_hash: String::new(),
            before_missing: false,
        };
        let mut decisions = Decisions::new();
        decisions.decide([LineKey::removed(0, 9)], Decision::Declined);
        assert_eq!(
            reconcile(&op, decisions.for_operation(0)),
            "n1\nn2\nold9\nn3"
        );
    }

    #[test]
    fn added_groups_split_on_gap() {
        let op = make_edit("", "a\nb\nc");
        assert_eq!(added_groups(&op, 2), vec![vec![1, 2, 3]]);

        let op = make_edit("k1\nk2\nk3\nk4", "n1\nk1\nk2\nk3\nn5\nn6\nk4\nn8");
        assert_eq!(added_lines(&op), vec![1, 5, 6, 8]);
        assert_eq!(added_groups(&op, 2), vec![vec![1], vec![5, 6, 8]]);
        assert_eq!(added_groups(&op, 1), vec![vec![1], vec![5, 6], vec![8]]);
        assert_eq!(group_containing(&op, 6, 1), Some(vec![5, 6]));
        assert_eq!(group_containing(&op, 2, 1), None);
    }

    #[test]
    fn group_decisions_match_individual_decisions() {
        let op = make_edit("k1\nk2", "k1\nn2\nn3\nk2\nn5");
        let group = group_containing(&op, 3, 2).unwrap();
        assert_eq!(group, vec![2, 3, 5]);

        let mut grouped = Decisions::new();
        grouped.decide(
            group.iter().map(|&n| LineKey::added(0, n)),
            Decision::Declined,
        );
        let mut single = Decisions::new();
        for &n in group.iter().rev() {
            single.decide([LineKey::added(0, n)], Decision::Declined);
        }
        assert_eq!(
            reconcile(&op, grouped.for_operation(0)),
            reconcile(&op, single.for_operation(0))
        );
        assert_eq!(reconcile(&op, grouped.for_operation(0)), "k1\nk2");
    }

    #[test]
    fn undecided_added_detection() {
        let op = make_edit("a", "a\nb\nc");
        let mut decisions = Decisions::new();
        assert!(has_undecided_added(&op, decisions.for_operation(0)));
        decisions.decide([LineKey::added(0, 2)], Decision::Accepted);
        assert!(has_undecided_added(&op, decisions.for_operation(0)));
        decisions.decide([LineKey::added(0, 3)], Decision::Declined);
        assert!(!has_undecided_added(&op, decisions.for_operation(0)));
    }
}
