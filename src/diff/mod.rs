mod lcs;
mod truncate;

pub use lcs::diff_lines;
pub use truncate::{
    collapse_diff, truncate_lines, DiffLimits, DEFAULT_MAX_DIFF_ENTRIES, DEFAULT_MAX_LINES_PER_SIDE,
};

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Kind of one aligned diff row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffKind {
    Context,
    Added,
    Removed,
    /// Placeholder for entries elided by [`collapse_diff`]
    Skip,
}

impl DiffKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            DiffKind::Context => " ",
            DiffKind::Added => "+",
            DiffKind::Removed => "-",
            DiffKind::Skip => "…",
        }
    }
}

/// One aligned row of a before/after comparison.
///
/// Line numbers are 1-based. `old_line` is absent for added and skip rows,
/// `new_line` is absent for removed and skip rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub kind: DiffKind,
    pub old_line: Option<usize>,
    pub new_line: Option<usize>,
    pub text: String,
}

impl DiffEntry {
    pub fn context(old_line: usize, new_line: usize, text: &str) -> Self {
        Self {
            kind: DiffKind::Context,
            old_line: Some(old_line),
            new_line: Some(new_line),
            text: text.to_string(),
        }
    }

    pub fn added(new_line: usize, text: &str) -> Self {
        Self {
            kind: DiffKind::Added,
            old_line: None,
            new_line: Some(new_line),
            text: text.to_string(),
        }
    }

    pub fn removed(old_line: usize, text: &str) -> Self {
        Self {
            kind: DiffKind::Removed,
            old_line: Some(old_line),
            new_line: None,
            text: text.to_string(),
        }
    }

    pub fn skip(hidden: usize) -> Self {
        Self {
            kind: DiffKind::Skip,
            old_line: None,
            new_line: None,
            text: format!("{} lines hidden", hidden),
        }
    }

    pub fn is_change(&self) -> bool {
        matches!(self.kind, DiffKind::Added | DiffKind::Removed)
    }
}

/// Split file content into lines. Empty content has no lines; a trailing
/// newline yields a trailing empty line so that joining with `\n` restores
/// the input exactly.
pub fn split_lines(content: &str) -> Vec<&str> {
    if content.is_empty() {
        Vec::new()
    } else {
        content.split('\n').collect()
    }
}

/// Diff two file contents with both size caps applied: each side is
/// truncated before alignment and the result is collapsed afterwards.
pub fn diff_contents(before: &str, after: &str, limits: &DiffLimits) -> Vec<DiffEntry> {
    let before_lines = split_lines(before);
    let after_lines = split_lines(after);
    let entries = diff_lines(
        truncate_lines(&before_lines[..], limits.max_lines_per_side),
        truncate_lines(&after_lines[..], limits.max_lines_per_side),
    );
    collapse_diff(entries, limits.max_diff_entries)
}

/// Index ranges of contiguous non-context runs (hunks) in `entries`.
/// Skip rows end a hunk without belonging to one.
pub fn hunks(entries: &[DiffEntry]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, entry) in entries.iter().enumerate() {
        if entry.is_change() {
            start.get_or_insert(idx);
        } else if let Some(s) = start.take() {
            ranges.push(s..idx);
        }
    }
    if let Some(s) = start {
        ranges.push(s..entries.len());
    }
    ranges
}

/// Count of (added, removed) rows
pub fn change_counts(entries: &[DiffEntry]) -> (usize, usize) {
    entries.iter().fold((0, 0), |(adds, dels), e| match e.kind {
        DiffKind::Added => (adds + 1, dels),
        DiffKind::Removed => (adds, dels + 1),
        _ => (adds, dels),
    })
}

/// Format entries as displayable text (for terminal output and clipboard)
pub fn render_entries(entries: &[DiffEntry]) -> String {
    let mut text = String::new();
    for entry in entries {
        text.push_str(entry.kind.prefix());
        if entry.kind == DiffKind::Skip {
            text.push(' ');
        }
        text.push_str(&entry.text);
        text.push('\n');
    }
    text
}
