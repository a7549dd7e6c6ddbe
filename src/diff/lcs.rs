use super::DiffEntry;

/// Line-level diff of `before` against `after` using a longest-common-subsequence
/// table. Only context, added and removed entries are produced.
///
/// When backtracking hits a tie, the added line (from `after`) is emitted before
/// the removed line (from `before`). After reversal this places removals ahead of
/// additions within a hunk, and fixes the shape of otherwise ambiguous diffs.
///
/// Cost is O(m·n) time and space; callers cap both sides first
/// (see [`super::truncate_lines`]).
pub fn diff_lines(before: &[&str], after: &[&str]) -> Vec<DiffEntry> {
    let m = before.len();
    let n = after.len();

    let mut dp = vec![vec![0u32; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if before[i - 1] == after[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }

    let mut entries = Vec::with_capacity(m + n);
    let (mut i, mut j) = (m, n);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && before[i - 1] == after[j - 1] {
            entries.push(DiffEntry::context(i, j, before[i - 1]));
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || dp[i][j - 1] >= dp[i - 1][j]) {
            entries.push(DiffEntry::added(j, after[j - 1]));
            j -= 1;
        } else {
            entries.push(DiffEntry::removed(i, before[i - 1]));
            i -= 1;
        }
    }

    entries.reverse();
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffKind;

    /// Replay a diff against `before`, checking every line it claims to keep or remove
    fn replay(before: &[&str], entries: &[DiffEntry]) -> Vec<String> {
        let mut out = Vec::new();
        for entry in entries {
            match entry.kind {
                DiffKind::Context => {
                    let old = entry.old_line.unwrap();
                    assert_eq!(before[old - 1], entry.text);
                    out.push(entry.text.clone());
                }
                DiffKind::Removed => {
                    let old = entry.old_line.unwrap();
                    assert_eq!(before[old - 1], entry.text);
                }
                DiffKind::Added => out.push(entry.text.clone()),
                DiffKind::Skip => panic!("engine never emits skip"),
            }
        }
        out
    }

    fn assert_monotonic(entries: &[DiffEntry]) {
        let olds: Vec<usize> = entries.iter().filter_map(|e| e.old_line).collect();
        let news: Vec<usize> = entries.iter().filter_map(|e| e.new_line).collect();
        assert!(olds.windows(2).all(|w| w[0] < w[1]), "old lines out of order: {olds:?}");
        assert!(news.windows(2).all(|w| w[0] < w[1]), "new lines out of order: {news:?}");
    }

    #[test]
    fn replaying_diff_reproduces_after() {
        let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec!["a", "b", "c"], vec!["a", "X", "c"]),
            (vec!["a", "b", "c", "d"], vec!["b", "d", "e"]),
            (vec!["x", "x", "y"], vec!["y", "x", "x", "x"]),
            (vec!["fn main() {", "}", ""], vec!["fn main() {", "    run();", "}", ""]),
            (vec![], vec!["only", "new"]),
            (vec!["only", "old"], vec![]),
            (vec!["same"], vec!["different"]),
        ];
        for (before, after) in cases {
            let entries = diff_lines(&before, &after);
            assert_monotonic(&entries);
            assert_eq!(replay(&before, &entries), after, "before={before:?}");
        }
    }

    #[test]
    fn identical_sequences_are_all_context() {
        let lines = vec!["a", "b", "a", ""];
        let entries = diff_lines(&lines, &lines);
        assert_eq!(entries.len(), lines.len());
        for (idx, entry) in entries.iter().enumerate() {
            assert_eq!(entry, &DiffEntry::context(idx + 1, idx + 1, lines[idx]));
        }
    }

    #[test]
    fn diff_is_deterministic() {
        let before = vec!["a", "b", "c", "b", "a"];
        let after = vec!["b", "a", "c", "a", "b"];
        assert_eq!(diff_lines(&before, &after), diff_lines(&before, &after));
    }

    #[test]
    fn empty_inputs_yield_empty_diff() {
        assert!(diff_lines(&[], &[]).is_empty());
    }

    #[test]
    fn empty_before_is_all_added() {
        let entries = diff_lines(&[], &["a", "b"]);
        assert_eq!(entries, vec![DiffEntry::added(1, "a"), DiffEntry::added(2, "b")]);
    }

    #[test]
    fn empty_after_is_all_removed() {
        let entries = diff_lines(&["a", "b"], &[]);
        assert_eq!(entries, vec![DiffEntry::removed(1, "a"), DiffEntry::removed(2, "b")]);
    }

    #[test]
    fn tie_break_puts_removals_before_additions() {
        let entries = diff_lines(&["a", "b", "c"], &["a", "X", "c"]);
        assert_eq!(
            entries,
            vec![
                DiffEntry::context(1, 1, "a"),
                DiffEntry::removed(2, "b"),
                DiffEntry::added(2, "X"),
                DiffEntry::context(3, 3, "c"),
            ]
        );
    }

    #[test]
    fn tie_break_on_swapped_lines_keeps_earlier_line_as_context() {
        // Either line could be the common one. Backtracking takes the trailing
        // addition first, so "b" survives as context.
        let entries = diff_lines(&["a", "b"], &["b", "a"]);
        assert_eq!(
            entries,
            vec![
                DiffEntry::removed(1, "a"),
                DiffEntry::context(2, 1, "b"),
                DiffEntry::added(2, "a"),
            ]
        );
    }
}
