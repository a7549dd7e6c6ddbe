use super::DiffEntry;

/// Lines kept per side before alignment
pub const DEFAULT_MAX_LINES_PER_SIDE: usize = 220;
/// Entries kept after alignment before collapsing the middle
pub const DEFAULT_MAX_DIFF_ENTRIES: usize = 260;

/// Size caps that bound the alignment table and the rendered diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffLimits {
    pub max_lines_per_side: usize,
    pub max_diff_entries: usize,
}

impl Default for DiffLimits {
    fn default() -> Self {
        Self {
            max_lines_per_side: DEFAULT_MAX_LINES_PER_SIDE,
            max_diff_entries: DEFAULT_MAX_DIFF_ENTRIES,
        }
    }
}

/// Keep at most `max_lines` leading lines
pub fn truncate_lines<'a, T>(lines: &'a [T], max_lines: usize) -> &'a [T] {
    &lines[..lines.len().min(max_lines)]
}

/// Collapse an oversized diff to its first and last `max_entries / 2` entries
/// with one skip entry in between reporting how many were elided.
/// The result never exceeds `max_entries + 1` entries.
pub fn collapse_diff(mut entries: Vec<DiffEntry>, max_entries: usize) -> Vec<DiffEntry> {
    if entries.len() <= max_entries {
        return entries;
    }

    let half = max_entries / 2;
    let hidden = entries.len() - 2 * half;
    log::debug!(
        "collapsing diff of {} entries, hiding {}",
        entries.len(),
        hidden
    );

    let tail = entries.split_off(entries.len() - half);
    entries.truncate(half);
    entries.push(DiffEntry::skip(hidden));
    entries.extend(tail);
    entries
}
