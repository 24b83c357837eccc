//! Report sinks.
//!
//! The CSV report has a fixed column layout; its header is written when
//! the report is created, so even a run that finds nothing leaves a
//! well-formed file behind.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{AuditError, Result};
use crate::record::ReconciliationRecord;

pub const COLUMNS: [&str; 16] = [
    "parentType",
    "parent",
    "file",
    "size",
    "checksum",
    "matchCount",
    "nameMatch",
    "ieId",
    "repId",
    "flId",
    "originalName",
    "owner",
    "label",
    "groupId",
    "entityType",
    "userClass",
];

/// Destination for reconciliation records, written in discovery order.
pub trait ReportSink: Send {
    fn write(&mut self, record: &ReconciliationRecord) -> Result<()>;

    /// Flush everything written so far.
    fn finish(&mut self) -> Result<()>;
}

/// Flat row in [`COLUMNS`] order.
#[derive(Serialize)]
struct Row<'a> {
    parent_type: &'a str,
    parent: &'a str,
    file: &'a str,
    size: u64,
    checksum: &'a str,
    match_count: usize,
    name_match: Option<bool>,
    ie_id: &'a str,
    rep_id: &'a str,
    fl_id: &'a str,
    original_name: &'a str,
    owner: &'a str,
    label: &'a str,
    group_id: &'a str,
    entity_type: &'a str,
    user_class: &'a str,
}

impl<'a> From<&'a ReconciliationRecord> for Row<'a> {
    fn from(record: &'a ReconciliationRecord) -> Self {
        let field = |get: fn(&crate::lookup::LookupRow) -> &str| {
            record.row.as_ref().map(get).unwrap_or_default()
        };
        Self {
            parent_type: record.parent_type.as_str(),
            parent: &record.parent,
            file: &record.file,
            size: record.size,
            checksum: &record.checksum,
            match_count: record.match_count,
            name_match: record.name_match,
            ie_id: field(|r| r.ie_id.as_str()),
            rep_id: field(|r| r.rep_id.as_str()),
            fl_id: field(|r| r.fl_id.as_str()),
            original_name: field(|r| r.original_name.as_str()),
            owner: field(|r| r.owner.as_str()),
            label: field(|r| r.label.as_str()),
            group_id: field(|r| r.group_id.as_str()),
            entity_type: field(|r| r.entity_type.as_str()),
            user_class: field(|r| r.user_class.as_str()),
        }
    }
}

/// CSV report over any writer.
pub struct CsvReport<W: Write> {
    writer: csv::Writer<W>,
    target: String,
}

impl CsvReport<File> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| AuditError::ReportFailure {
            target: path.display().to_string(),
            source: csv::Error::from(e),
        })?;
        info!(report = %path.display(), "writing report");
        Self::new(file, path.display().to_string())
    }
}

impl CsvReport<io::Stdout> {
    pub fn stdout() -> Result<Self> {
        Self::new(io::stdout(), "<stdout>".to_string())
    }
}

impl<W: Write> CsvReport<W> {
    pub fn new(inner: W, target: String) -> Result<Self> {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        let mut report = Self { writer, target };
        report
            .writer
            .write_record(COLUMNS)
            .map_err(|e| report.failure(e))?;
        Ok(report)
    }

    fn failure(&self, source: csv::Error) -> AuditError {
        AuditError::ReportFailure {
            target: self.target.clone(),
            source,
        }
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        let target = self.target;
        self.writer
            .into_inner()
            .map_err(|e| AuditError::ReportFailure {
                target,
                source: csv::Error::from(e.into_error()),
            })
    }
}

impl<W: Write + Send> ReportSink for CsvReport<W> {
    fn write(&mut self, record: &ReconciliationRecord) -> Result<()> {
        self.writer
            .serialize(Row::from(record))
            .map_err(|e| self.failure(e))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| self.failure(csv::Error::from(e)))
    }
}

/// Used when reporting is disabled: records only reach the log.
#[derive(Debug, Default)]
pub struct LogReport;

impl ReportSink for LogReport {
    fn write(&mut self, record: &ReconciliationRecord) -> Result<()> {
        info!(
            parent_type = %record.parent_type,
            parent = %record.parent,
            file = %record.file,
            size = record.size,
            checksum = %record.checksum,
            match_count = record.match_count,
            name_match = ?record.name_match,
            "audited"
        );
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}
