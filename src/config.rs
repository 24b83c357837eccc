//! Settings consumed by the audit core.
//!
//! The command line owns parsing; the core only sees [`AuditConfig`] and
//! [`LookupSource`].

use std::path::PathBuf;

use clap::ValueEnum;
use time::OffsetDateTime;
use time::macros::format_description;

/// Report path meaning "write to standard output".
pub const STDOUT_REPORT: &str = "-";

/// How lookups returning several rows are flattened into records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Aggregation {
    /// One record per returned row, each carrying the full match count.
    #[default]
    PerRow,
    /// A single record holding the last row, as legacy reports did.
    LastRow,
}

/// Where repository rows come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupSource {
    /// Postgres connection URL.
    Database(String),
    /// CSV export of the repository index.
    Index(PathBuf),
}

#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Descend into subdirectories.
    pub recursive: bool,
    pub report_enabled: bool,
    pub report_path: PathBuf,
    /// Tried in order for arguments that do not exist as given.
    pub search_dirs: Vec<PathBuf>,
    pub aggregation: Aggregation,
    /// Accepted for compatibility; nothing is ever deleted.
    pub delete: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            report_enabled: true,
            report_path: PathBuf::from(default_report_file("file2ingest", OffsetDateTime::UNIX_EPOCH)),
            search_dirs: Vec::new(),
            aggregation: Aggregation::default(),
            delete: false,
        }
    }
}

/// `<command>-YYYYMMDD-HHMMSS.csv`, stamped with `at`.
pub fn default_report_file(command: &str, at: OffsetDateTime) -> String {
    let stamp = format_description!("[year][month][day]-[hour][minute][second]");
    let stamp = at
        .format(&stamp)
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("{command}-{stamp}.csv")
}

/// Local wall-clock time, falling back to UTC when the offset is unknown.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}
