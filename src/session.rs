//! Run-long resources and their release.

use tracing::{error, info};

use crate::audit::{AuditStats, Auditor};
use crate::config::{AuditConfig, LookupSource, STDOUT_REPORT};
use crate::error::Result;
use crate::lookup::{self, LookupService};
use crate::report::{CsvReport, LogReport, ReportSink};

/// The lookup connection and the report, owned for the whole run.
///
/// Call [`Session::close`] on every exit path. Dropping a session without
/// closing it still releases both (the connection socket and the report
/// file handle close on drop), but flush errors then go unreported.
pub struct Session {
    lookup: Box<dyn LookupService>,
    sink: Box<dyn ReportSink>,
}

impl Session {
    pub fn new(lookup: Box<dyn LookupService>, sink: Box<dyn ReportSink>) -> Self {
        Self { lookup, sink }
    }

    /// Connect to the index, then create the report.
    ///
    /// The index comes first so a failed connection leaves no empty report
    /// file behind.
    pub async fn open(config: &AuditConfig, source: &LookupSource) -> Result<Self> {
        let lookup = lookup::open(source).await?;
        let sink: Box<dyn ReportSink> = if !config.report_enabled {
            Box::new(LogReport)
        } else if config.report_path.as_os_str() == STDOUT_REPORT {
            Box::new(CsvReport::stdout()?)
        } else {
            Box::new(CsvReport::create(&config.report_path)?)
        };
        Ok(Self::new(lookup, sink))
    }

    pub async fn audit(&mut self, config: &AuditConfig, arguments: &[String]) -> Result<AuditStats> {
        Auditor::new(config, &mut *self.lookup, &mut *self.sink)
            .run(arguments)
            .await
    }

    /// Flush the report and close the connection.
    ///
    /// Both are attempted even if the first fails; the first failure is
    /// returned.
    pub async fn close(mut self) -> Result<()> {
        let flushed = self.sink.finish();
        if let Err(e) = self.lookup.close().await {
            error!("closing the repository index: {e:#}");
        }
        if flushed.is_ok() {
            info!("session closed");
        }
        flushed
    }
}
