use crate::diff::{DiffLimits, DEFAULT_MAX_DIFF_ENTRIES, DEFAULT_MAX_LINES_PER_SIDE};
use crate::review::{SessionOptions, DEFAULT_GROUP_GAP};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-workspace override file, looked up in the workspace root
pub const LOCAL_CONFIG_FILE: &str = ".patch-review.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub diff: DiffConfig,
    #[serde(default)]
    pub review: ReviewSection,
}

/// [diff] section: size caps applied before and after diffing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffConfig {
    #[serde(default = "default_max_lines_per_side")]
    pub max_lines_per_side: usize,
    #[serde(default = "default_max_diff_entries")]
    pub max_diff_entries: usize,
}

/// [review] section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSection {
    /// Added lines whose numbers differ by at most this much form one group
    #[serde(default = "default_group_gap")]
    pub group_gap: usize,
    /// File-list filter applied to every new session
    #[serde(default)]
    pub default_filter: String,
}

fn default_max_lines_per_side() -> usize {
    DEFAULT_MAX_LINES_PER_SIDE
}

fn default_max_diff_entries() -> usize {
    DEFAULT_MAX_DIFF_ENTRIES
}

fn default_group_gap() -> usize {
    DEFAULT_GROUP_GAP
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            max_lines_per_side: default_max_lines_per_side(),
            max_diff_entries: default_max_diff_entries(),
        }
    }
}

impl Default for ReviewSection {
    fn default() -> Self {
        Self {
            group_gap: default_group_gap(),
            default_filter: String::new(),
        }
    }
}

impl ReviewConfig {
    pub fn diff_limits(&self) -> DiffLimits {
        DiffLimits {
            max_lines_per_side: self.diff.max_lines_per_side,
            max_diff_entries: self.diff.max_diff_entries,
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            group_gap: self.review.group_gap,
            filter: self.review.default_filter.clone(),
        }
    }
}

/// Global config file: `<config_dir>/patch-review/config.toml`
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("patch-review").join("config.toml"))
}

/// Load config by merging global defaults with per-workspace overrides.
/// Priority: `<root>/.patch-review.toml` > global config > built-in defaults.
/// Merging is deep: fields within a section override independently.
pub fn load_config(root: &Path) -> ReviewConfig {
    load_config_from(global_config_path().as_deref(), &root.join(LOCAL_CONFIG_FILE))
}

/// Like [`load_config`] with explicit file locations. Missing files are
/// skipped; unreadable or invalid ones are logged and skipped.
pub fn load_config_from(global: Option<&Path>, local: &Path) -> ReviewConfig {
    let global_table = global.and_then(read_table_logged);
    let local_table = read_table_logged(local);

    let merged = match (global_table, local_table) {
        (Some(mut global), Some(local)) => {
            deep_merge(&mut global, local);
            global
        }
        (Some(table), None) | (None, Some(table)) => table,
        (None, None) => return ReviewConfig::default(),
    };

    match toml::Value::Table(merged).try_into() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("Invalid configuration, using defaults: {}", e);
            ReviewConfig::default()
        }
    }
}

fn read_table_logged(path: &Path) -> Option<toml::Table> {
    match read_table(path) {
        Ok(table) => table,
        Err(e) => {
            log::warn!("Ignoring config file: {:#}", e);
            None
        }
    }
}

fn read_table(path: &Path) -> Result<Option<toml::Table>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let table = content
        .parse::<toml::Table>()
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Some(table))
}

/// Recursively merge `overlay` into `base`. Overlay values win; nested tables are merged recursively.
fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(overlay_table)) => {
                deep_merge(base_table, overlay_table);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}
