use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use super::{LookupRow, LookupService};
use crate::fingerprint::CHECKSUM_ALGORITHM;

/// One line of an exported index: the match key plus the row returned.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexLine {
    size: u64,
    checksum: String,
    #[serde(default)]
    algorithm: Option<String>,
    #[serde(default)]
    ie_id: String,
    #[serde(default)]
    rep_id: String,
    #[serde(default)]
    fl_id: String,
    #[serde(default)]
    original_name: String,
    #[serde(default)]
    owner: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    group_id: String,
    #[serde(default)]
    entity_type: String,
    #[serde(default)]
    user_class: String,
}

impl IndexLine {
    fn into_parts(self) -> ((u64, String), LookupRow) {
        let key = (self.size, self.checksum.to_ascii_lowercase());
        let row = LookupRow {
            ie_id: self.ie_id,
            rep_id: self.rep_id,
            fl_id: self.fl_id,
            original_name: self.original_name,
            owner: self.owner,
            label: self.label,
            group_id: self.group_id,
            entity_type: self.entity_type,
            user_class: self.user_class,
        };
        (key, row)
    }
}

/// Repository index loaded from a CSV export.
///
/// Columns are `size`, `checksum`, an optional `algorithm` (lines for
/// other algorithms are ignored) and the [`LookupRow`] fields in camel
/// case. Rows sharing a key are returned in file order.
#[derive(Debug, Default)]
pub struct CsvIndex {
    rows: HashMap<(u64, String), Vec<LookupRow>>,
}

impl CsvIndex {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening index {}", path.display()))?;
        let index = Self::from_reader(file)?;
        info!(index = %path.display(), keys = index.rows.len(), "repository index loaded");
        Ok(index)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut index = Self::default();
        let mut skipped = 0usize;

        for (line, record) in csv.deserialize::<IndexLine>().enumerate() {
            let record = record.with_context(|| format!("index line {}", line + 2))?;
            let matches_algorithm = record
                .algorithm
                .as_deref()
                .is_none_or(|a| a.is_empty() || a.eq_ignore_ascii_case(CHECKSUM_ALGORITHM));
            if !matches_algorithm {
                skipped += 1;
                continue;
            }
            let (key, row) = record.into_parts();
            index.insert(key.0, &key.1, row);
        }

        if skipped > 0 {
            debug!(skipped, "index lines for other checksum algorithms ignored");
        }
        Ok(index)
    }

    pub fn insert(&mut self, size: u64, checksum: &str, row: LookupRow) {
        self.rows
            .entry((size, checksum.to_ascii_lowercase()))
            .or_default()
            .push(row);
    }
}

#[async_trait]
impl LookupService for CsvIndex {
    async fn lookup(&mut self, size: u64, checksum: &str) -> Result<Vec<LookupRow>> {
        Ok(self
            .rows
            .get(&(size, checksum.to_ascii_lowercase()))
            .cloned()
            .unwrap_or_default())
    }
}
