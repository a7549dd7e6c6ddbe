use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Failure reported by a persistence collaborator
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{path}: not found")]
    NotFound { path: String },
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {reason}")]
    Rejected { path: String, reason: String },
}

impl StoreError {
    pub fn io(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound {
                path: path.to_string(),
            }
        } else {
            StoreError::Io {
                path: path.to_string(),
                source,
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// A write or delete that did not land, reported per file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteFailure {
    pub path: String,
    pub message: String,
}

impl WriteFailure {
    pub fn new(path: &str, err: &StoreError) -> Self {
        Self {
            path: path.to_string(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("cannot {action} while session is {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },
    #[error("no operation at index {index}")]
    UnknownOperation { index: usize },
    #[error("{} file(s) failed to write: {}", .0.len(), join_failures(.0))]
    WriteFailures(Vec<WriteFailure>),
}

fn join_failures(failures: &[WriteFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
