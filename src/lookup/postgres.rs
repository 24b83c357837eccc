use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use tracing::debug;

use super::{LookupRow, LookupService};
use crate::fingerprint::CHECKSUM_ALGORITHM;

/// Exact-match lookup against the repository's file fixity view.
///
/// Identifier columns may be numeric and any column may be null for files
/// without an owning IE; everything is cast to text and coalesced so each
/// row maps onto [`LookupRow`].
const LOOKUP_SQL: &str = r#"
    SELECT COALESCE(ie_id::text, '')         AS ie_id,
           COALESCE(rep_id::text, '')        AS rep_id,
           COALESCE(fl_id::text, '')         AS fl_id,
           COALESCE(original_name::text, '') AS original_name,
           COALESCE(owner::text, '')         AS owner,
           COALESCE(label::text, '')         AS label,
           COALESCE(group_id::text, '')      AS group_id,
           COALESCE(entity_type::text, '')   AS entity_type,
           COALESCE(user_class::text, '')    AS user_class
    FROM file_fixity
    WHERE file_size = $1 AND checksum = $2 AND checksum_type = $3
    ORDER BY fl_id
"#;

/// Repository index held in Postgres.
///
/// One connection serves the whole run; sqlx prepares the statement on
/// first use and reuses it from the connection's statement cache.
pub struct PgLookup {
    conn: Option<PgConnection>,
}

impl PgLookup {
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = PgConnection::connect(url)
            .await
            .context("connecting to the repository database")?;
        debug!("repository database connection open");
        Ok(Self { conn: Some(conn) })
    }
}

#[async_trait]
impl LookupService for PgLookup {
    async fn lookup(&mut self, size: u64, checksum: &str) -> Result<Vec<LookupRow>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| anyhow!("repository database connection already closed"))?;
        let size = i64::try_from(size).context("file size exceeds the database range")?;

        let rows = sqlx::query_as::<_, LookupRow>(LOOKUP_SQL)
            .bind(size)
            .bind(checksum)
            .bind(CHECKSUM_ALGORITHM)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
            debug!("repository database connection closed");
        }
        Ok(())
    }
}
