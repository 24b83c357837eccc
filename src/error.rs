use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can go wrong while auditing.
///
/// Per-item variants are logged and skipped by the traversal engine;
/// [`AuditError::is_fatal`] variants stop the run.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("{argument}: not found")]
    NotFound { argument: String },

    #[error("{}: cannot be read: {source}", path.display())]
    NotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{argument}: {reason}")]
    InvalidArgument { argument: String, reason: String },

    #[error("{name}: unreadable content: {source:#}")]
    UnreadableContent {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("lookup of size {size} checksum {checksum} failed: {source:#}")]
    LookupFailure {
        size: u64,
        checksum: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("report {target}: {source}")]
    ReportFailure {
        target: String,
        #[source]
        source: csv::Error,
    },

    #[error("configuration: {0}")]
    Config(String),
}

impl AuditError {
    pub fn not_readable(path: &Path, source: std::io::Error) -> Self {
        Self::NotReadable {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_argument(argument: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    pub fn unreadable(name: impl Into<String>, source: anyhow::Error) -> Self {
        Self::UnreadableContent {
            name: name.into(),
            source,
        }
    }

    /// Errors that abort the remaining traversal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::LookupFailure { .. } | Self::ReportFailure { .. } | Self::Config(_)
        )
    }

    /// Short tag used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotReadable { .. } => "not_readable",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::UnreadableContent { .. } => "unreadable_content",
            Self::LookupFailure { .. } => "lookup_failure",
            Self::ReportFailure { .. } => "report_failure",
            Self::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;
