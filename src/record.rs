//! Data flowing from traversal to the report.

use std::fmt;
use std::path::PathBuf;

use crate::config::Aggregation;
use crate::fingerprint::Fingerprint;
use crate::lookup::LookupRow;
use crate::reconcile::Reconciliation;

/// How a logical unit was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// A plain file inside a traversed directory.
    DirectoryFile,
    /// The decompressed content of a `.bz2` file.
    Bzip2SingleStream,
    /// One member of a `.zip` container.
    ZipMember,
    /// A plain file named by a line of a list-file.
    ListFileEntry,
}

impl ContainerKind {
    pub fn parent_type(self) -> ParentType {
        match self {
            Self::DirectoryFile | Self::ListFileEntry => ParentType::Directory,
            Self::Bzip2SingleStream => ParentType::SingleStreamArchive,
            Self::ZipMember => ParentType::ZipContainer,
        }
    }
}

/// Classification of the container a record's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentType {
    Directory,
    SingleStreamArchive,
    ZipContainer,
}

impl ParentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Directory => "D",
            Self::SingleStreamArchive => "F",
            Self::ZipContainer => "Z",
        }
    }
}

impl fmt::Display for ParentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The smallest fingerprintable item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalUnit {
    pub kind: ContainerKind,
    /// Enclosing directory, or the archive file itself.
    pub parent: PathBuf,
    /// Basename, archive member name, or `.bz2` basename without extension.
    ///
    /// For a `.bz2` unit the directory part lives in `parent` (the archive
    /// path), so the name is only the final component with `.bz2` removed.
    /// It is also the candidate compared against stored repository names,
    /// which never carry staging directories.
    pub name: String,
}

impl fmt::Display for LogicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ContainerKind::ZipMember | ContainerKind::Bzip2SingleStream => {
                write!(f, "{}!{}", self.parent.display(), self.name)
            }
            ContainerKind::DirectoryFile | ContainerKind::ListFileEntry => {
                write!(f, "{}", self.parent.join(&self.name).display())
            }
        }
    }
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationRecord {
    pub parent_type: ParentType,
    pub parent: String,
    pub file: String,
    pub size: u64,
    pub checksum: String,
    /// Rows the lookup returned, regardless of name matching.
    pub match_count: usize,
    /// `None` when nothing matched by content.
    pub name_match: Option<bool>,
    pub row: Option<LookupRow>,
}

impl ReconciliationRecord {
    fn base(unit: &LogicalUnit, fingerprint: &Fingerprint, match_count: usize) -> Self {
        Self {
            parent_type: unit.kind.parent_type(),
            parent: unit.parent.display().to_string(),
            file: unit.name.clone(),
            size: fingerprint.size,
            checksum: fingerprint.checksum.clone(),
            match_count,
            name_match: None,
            row: None,
        }
    }

    /// Build the records for one unit.
    ///
    /// Without candidates there is exactly one record with empty detail
    /// fields. Otherwise [`Aggregation`] decides between one record per
    /// candidate and a single record for the last one.
    pub fn assemble(
        unit: &LogicalUnit,
        fingerprint: &Fingerprint,
        reconciliation: Reconciliation,
        aggregation: Aggregation,
    ) -> Vec<Self> {
        let match_count = reconciliation.match_count();
        let mut candidates = reconciliation.candidates;
        if aggregation == Aggregation::LastRow && candidates.len() > 1 {
            let superseded = candidates.len() - 1;
            candidates.drain(..superseded);
        }

        if candidates.is_empty() {
            return vec![Self::base(unit, fingerprint, match_count)];
        }

        candidates
            .into_iter()
            .map(|candidate| Self {
                name_match: Some(candidate.name_match),
                row: Some(candidate.row),
                ..Self::base(unit, fingerprint, match_count)
            })
            .collect()
    }
}
