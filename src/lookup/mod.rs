//! The repository index the audit reconciles against.
//!
//! The core only needs one exact-match query, `(size, checksum)` with the
//! checksum algorithm fixed, repeated for every logical unit over a single
//! connection. Two back-ends implement it: a Postgres mirror of the
//! repository's file table and a CSV export of the same rows.

mod csv_index;
mod postgres;

pub use csv_index::CsvIndex;
pub use postgres::PgLookup;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::LookupSource;
use crate::error::AuditError;

/// One repository file whose stored size and checksum matched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LookupRow {
    pub ie_id: String,
    pub rep_id: String,
    pub fl_id: String,
    pub original_name: String,
    pub owner: String,
    pub label: String,
    pub group_id: String,
    pub entity_type: String,
    pub user_class: String,
}

#[async_trait]
pub trait LookupService: Send {
    /// All rows whose stored size and checksum equal the given ones.
    ///
    /// An empty result is a normal outcome; `Err` means the query itself
    /// failed.
    async fn lookup(&mut self, size: u64, checksum: &str) -> Result<Vec<LookupRow>>;

    /// Release the underlying connection. Further lookups fail.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Open the back-end named by the configuration.
pub async fn open(source: &LookupSource) -> crate::error::Result<Box<dyn LookupService>> {
    match source {
        LookupSource::Database(url) => {
            let lookup = PgLookup::connect(url)
                .await
                .map_err(|e| AuditError::Config(format!("cannot connect to the repository database: {e:#}")))?;
            Ok(Box::new(lookup))
        }
        LookupSource::Index(path) => {
            let index = CsvIndex::open(path).map_err(|e| {
                AuditError::Config(format!("cannot load index {}: {e:#}", path.display()))
            })?;
            Ok(Box::new(index))
        }
    }
}
