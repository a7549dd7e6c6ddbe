mod coalesce;

pub use coalesce::coalesce;

use serde::{Deserialize, Serialize};

/// What a proposed operation does to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Edit,
    Delete,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Edit => "edit",
            OperationKind::Delete => "delete",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            OperationKind::Create => "+",
            OperationKind::Edit => "~",
            OperationKind::Delete => "-",
        }
    }
}

/// A single file change proposed by the assistant in one conversational turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperation {
    pub kind: OperationKind,
    pub path: String,
    /// Full replacement content; ignored for deletes
    #[serde(default, alias = "proposed_content")]
    pub content: String,
}

impl FileOperation {
    pub fn create(path: &str, content: &str) -> Self {
        Self {
            kind: OperationKind::Create,
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    pub fn edit(path: &str, content: &str) -> Self {
        Self {
            kind: OperationKind::Edit,
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    pub fn delete(path: &str) -> Self {
        Self {
            kind: OperationKind::Delete,
            path: path.to_string(),
            content: String::new(),
        }
    }

    /// Coalescing key, or `None` when the path is unusable
    pub fn key(&self) -> Option<&str> {
        let trimmed = self.path.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}
