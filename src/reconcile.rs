//! Matching a fingerprint against the repository index.

use tracing::debug;

use crate::error::{AuditError, Result};
use crate::fingerprint::Fingerprint;
use crate::lookup::{LookupRow, LookupService};
use crate::name_match::NamePattern;

/// A repository row with the same content, and whether its stored name
/// plausibly is the candidate's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub row: LookupRow,
    pub name_match: bool,
}

/// Outcome of one lookup, candidates in the order the index returned them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub candidates: Vec<Candidate>,
}

impl Reconciliation {
    pub fn match_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn any_name_match(&self) -> bool {
        self.candidates.iter().any(|c| c.name_match)
    }
}

/// Query the index for `fingerprint` and name-match every row against
/// `candidate_name`.
///
/// A query error is fatal for the run and comes back as
/// [`AuditError::LookupFailure`]; zero rows is an ordinary result.
pub async fn reconcile(
    lookup: &mut dyn LookupService,
    fingerprint: &Fingerprint,
    candidate_name: &str,
) -> Result<Reconciliation> {
    let rows = lookup
        .lookup(fingerprint.size, &fingerprint.checksum)
        .await
        .map_err(|source| AuditError::LookupFailure {
            size: fingerprint.size,
            checksum: fingerprint.checksum.clone(),
            source,
        })?;

    let pattern = NamePattern::new(candidate_name);
    let candidates = rows
        .into_iter()
        .map(|row| {
            let name_match = pattern.is_match(&row.original_name);
            debug!(
                candidate = candidate_name,
                stored = %row.original_name,
                %pattern,
                name_match,
                "name check"
            );
            Candidate { row, name_match }
        })
        .collect();

    Ok(Reconciliation { candidates })
}
