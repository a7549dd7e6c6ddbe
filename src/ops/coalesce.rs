use super::FileOperation;
use std::collections::HashSet;

/// Reduce a turn's operations to one per path: the last operation for a path
/// wins outright (earlier ones are discarded, not merged). Survivors keep the
/// relative order of their last occurrence, with their path trimmed.
/// Operations without a usable path are dropped.
pub fn coalesce(operations: Vec<FileOperation>) -> Vec<FileOperation> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<FileOperation> = Vec::with_capacity(operations.len());

    for op in operations.into_iter().rev() {
        let Some(key) = op.key().map(str::to_string) else {
            log::debug!("dropping {} operation with empty path", op.kind.label());
            continue;
        };
        if seen.insert(key.clone()) {
            kept.push(FileOperation { path: key, ..op });
        } else {
            log::debug!("dropping superseded {} of {}", op.kind.label(), op.path);
        }
    }

    kept.reverse();
    kept
}
