//! # rosetta-checker
//!
//! Audits staged content against a Rosetta preservation repository before
//! the staging copy is cleaned up.
//!
//! Every file found under the given directories, files and list-files is
//! fingerprinted (exact byte count plus MD5) and looked up in the
//! repository's fixity index. Zip members and the content of `.bz2` files
//! are audited individually, streamed in bounded chunks without unpacking
//! anything to disk. When the content is already held, the stored file
//! names are compared with the staged name using a separator-tolerant
//! heuristic, so a report reader can tell a plausible duplicate from a
//! coincidental one.
//!
//! ## Example
//!
//! ```no_run
//! use rosetta_checker::{AuditConfig, CsvIndex, CsvReport, Session};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AuditConfig::default();
//!     let index = CsvIndex::open("repository-index.csv".as_ref())?;
//!     let report = CsvReport::create("audit.csv".as_ref())?;
//!
//!     let mut session = Session::new(Box::new(index), Box::new(report));
//!     let stats = session.audit(&config, &["/staging/batch-17".to_string()]).await;
//!     session.close().await?;
//!     println!("{} units audited", stats?.units);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod io;
pub mod lookup;
pub mod name_match;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod resolve;
pub mod session;
pub mod zip;

pub use audit::{AuditStats, Auditor};
pub use cli::Cli;
pub use config::{Aggregation, AuditConfig, LookupSource};
pub use error::AuditError;
pub use fingerprint::{Fingerprint, Fingerprinter};
pub use lookup::{CsvIndex, LookupRow, LookupService, PgLookup};
pub use record::{ContainerKind, LogicalUnit, ParentType, ReconciliationRecord};
pub use report::{CsvReport, LogReport, ReportSink};
pub use session::Session;
