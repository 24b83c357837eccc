//! The traversal engine.
//!
//! Arguments are processed one at a time, depth first. Every logical unit
//! is fingerprinted, reconciled and reported before the next one is
//! produced, so records come out in discovery order: directory entries in
//! enumeration order, zip members in container order, list-file lines in
//! file order.
//!
//! Failures confined to one item are logged and counted; only errors that
//! make further progress meaningless ([`AuditError::is_fatal`]) end the run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::fingerprint::Fingerprinter;
use crate::io::{Bzip2Codec, ChunkRead, DecodeStream, LocalFileReader, RangeStream};
use crate::lookup::LookupService;
use crate::reconcile::reconcile;
use crate::record::{ContainerKind, LogicalUnit, ReconciliationRecord};
use crate::report::ReportSink;
use crate::resolve::{LIST_MARKER, check_readable, resolve};
use crate::zip::ZipArchive;

/// List-files may name further list-files up to this depth.
pub const MAX_LIST_DEPTH: usize = 8;

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditStats {
    /// Logical units fingerprinted and reconciled.
    pub units: u64,
    /// Records handed to the report.
    pub records: u64,
    /// Units whose content is held at least once.
    pub matched: u64,
    /// Matched units where some row's stored name also fits.
    pub name_matched: u64,
    /// Items skipped because of a per-item error.
    pub errors: u64,
}

/// Container format recognised from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Bzip2,
    Zip,
}

fn archive_kind(path: &Path) -> Option<ArchiveKind> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("bz2") {
        Some(ArchiveKind::Bzip2)
    } else if ext.eq_ignore_ascii_case("zip") {
        Some(ArchiveKind::Zip)
    } else {
        None
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

pub struct Auditor<'a> {
    config: &'a AuditConfig,
    lookup: &'a mut dyn LookupService,
    sink: &'a mut dyn ReportSink,
    fingerprinter: Fingerprinter,
    stats: AuditStats,
    /// Canonical paths of the directories currently being walked.
    walking: Vec<PathBuf>,
}

impl<'a> Auditor<'a> {
    pub fn new(
        config: &'a AuditConfig,
        lookup: &'a mut dyn LookupService,
        sink: &'a mut dyn ReportSink,
    ) -> Self {
        Self {
            config,
            lookup,
            sink,
            fingerprinter: Fingerprinter::new(),
            stats: AuditStats::default(),
            walking: Vec::new(),
        }
    }

    /// Use a different read size; mainly for tests.
    pub fn with_fingerprinter(mut self, fingerprinter: Fingerprinter) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    /// Audit every argument in order.
    ///
    /// Returns the run's counters, or the fatal error that stopped it.
    /// Records written before a fatal error stay in the report.
    pub async fn run(mut self, arguments: &[String]) -> Result<AuditStats> {
        let search_dirs = self.config.search_dirs.clone();
        for argument in arguments {
            let outcome = self.process_argument(argument, &search_dirs, 0).await;
            self.absorb(outcome)?;
        }
        Ok(self.stats)
    }

    /// Log and count a per-item error; pass fatal ones on.
    fn absorb(&mut self, outcome: Result<()>) -> Result<()> {
        match outcome {
            Err(e) if !e.is_fatal() => {
                warn!(kind = e.kind(), "{e}");
                self.stats.errors += 1;
                Ok(())
            }
            other => other,
        }
    }

    async fn process_argument(&mut self, raw: &str, search_dirs: &[PathBuf], depth: usize) -> Result<()> {
        if let Some(list) = raw.strip_prefix(LIST_MARKER) {
            // A directory that happens to start with the marker is still a directory
            let is_dir = fs::metadata(raw).await.is_ok_and(|m| m.is_dir());
            if !is_dir {
                return self.process_list_file(list, search_dirs, depth).await;
            }
        }

        let path = resolve(raw, search_dirs).await?;
        let meta = fs::metadata(&path)
            .await
            .map_err(|e| AuditError::not_readable(&path, e))?;

        if meta.is_dir() {
            info!(directory = %path.display(), "auditing directory");
            self.walk_directory(&path).await
        } else if meta.is_file() {
            let kind = if depth > 0 {
                ContainerKind::ListFileEntry
            } else {
                ContainerKind::DirectoryFile
            };
            self.classify(&path, kind).await
        } else {
            Err(AuditError::invalid_argument(
                raw,
                "neither a regular file nor a directory",
            ))
        }
    }

    async fn process_list_file(&mut self, raw: &str, search_dirs: &[PathBuf], depth: usize) -> Result<()> {
        if depth >= MAX_LIST_DEPTH {
            return Err(AuditError::invalid_argument(
                format!("{LIST_MARKER}{raw}"),
                format!("list-files nested deeper than {MAX_LIST_DEPTH}"),
            ));
        }

        let path = resolve(raw, search_dirs).await?;
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AuditError::not_readable(&path, e))?;
        info!(list = %path.display(), "auditing list-file");

        let mut nested_dirs = Vec::with_capacity(search_dirs.len() + 1);
        nested_dirs.push(parent_dir(&path));
        nested_dirs.extend(search_dirs.iter().cloned());

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let outcome = Box::pin(self.process_argument(line, &nested_dirs, depth + 1)).await;
            self.absorb(outcome)?;
        }
        Ok(())
    }

    /// Walk `dir` unless it is already one of the directories being walked,
    /// which happens when a symlink points back at an ancestor.
    async fn walk_directory(&mut self, dir: &Path) -> Result<()> {
        let real = fs::canonicalize(dir)
            .await
            .map_err(|e| AuditError::not_readable(dir, e))?;
        if self.walking.contains(&real) {
            warn!(
                directory = %dir.display(),
                target = %real.display(),
                "link leads back into the walk; not descending"
            );
            return Ok(());
        }

        self.walking.push(real);
        let outcome = self.walk_entries(dir).await;
        self.walking.pop();
        outcome
    }

    async fn walk_entries(&mut self, dir: &Path) -> Result<()> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| AuditError::not_readable(dir, e))?;

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => return Ok(()),
                Err(e) => return Err(AuditError::not_readable(dir, e)),
            };
            let path = entry.path();
            let outcome = self.visit_entry(&path).await;
            self.absorb(outcome)?;
        }
    }

    async fn visit_entry(&mut self, path: &Path) -> Result<()> {
        // Follows symlinks, so a link to a directory is a directory
        let meta = fs::metadata(path)
            .await
            .map_err(|e| AuditError::not_readable(path, e))?;

        if meta.is_dir() {
            if !self.config.recursive {
                debug!(directory = %path.display(), "not recursing");
                return Ok(());
            }
            check_readable(path, true).await?;
            return Box::pin(self.walk_directory(path)).await;
        }
        if !meta.is_file() {
            // Opening a FIFO would block until a writer shows up
            return Err(AuditError::invalid_argument(
                path.display().to_string(),
                "neither a regular file nor a directory",
            ));
        }
        self.classify(path, ContainerKind::DirectoryFile).await
    }

    /// Dispatch a file on its extension.
    async fn classify(&mut self, path: &Path, plain_kind: ContainerKind) -> Result<()> {
        match archive_kind(path) {
            Some(ArchiveKind::Bzip2) => self.audit_bzip2(path).await,
            Some(ArchiveKind::Zip) => self.audit_zip(path).await,
            None => self.audit_plain(path, plain_kind).await,
        }
    }

    async fn audit_plain(&mut self, path: &Path, kind: ContainerKind) -> Result<()> {
        let reader = LocalFileReader::open(path).map_err(|e| AuditError::not_readable(path, e))?;
        let unit = LogicalUnit {
            kind,
            parent: parent_dir(path),
            name: file_name(path),
        };
        self.audit_unit(unit, RangeStream::whole(Arc::new(reader))).await
    }

    async fn audit_bzip2(&mut self, path: &Path) -> Result<()> {
        let reader = LocalFileReader::open(path).map_err(|e| AuditError::not_readable(path, e))?;
        // Basename only; the full archive path is the unit's parent
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let unit = LogicalUnit {
            kind: ContainerKind::Bzip2SingleStream,
            parent: path.to_path_buf(),
            name,
        };
        let stream = DecodeStream::new(RangeStream::whole(Arc::new(reader)), Bzip2Codec::new());
        self.audit_unit(unit, stream).await
    }

    async fn audit_zip(&mut self, path: &Path) -> Result<()> {
        let reader = LocalFileReader::open(path).map_err(|e| AuditError::not_readable(path, e))?;
        let archive = ZipArchive::new(Arc::new(reader));
        let members = archive
            .members()
            .await
            .map_err(|e| AuditError::unreadable(path.display().to_string(), e))?;
        debug!(archive = %path.display(), entries = members.len(), "zip container");

        for member in members.iter().filter(|m| !m.is_directory) {
            let unit = LogicalUnit {
                kind: ContainerKind::ZipMember,
                parent: path.to_path_buf(),
                name: member.name.clone(),
            };
            let outcome = match archive.open_member(member).await {
                Ok(stream) => self.audit_unit(unit, stream).await,
                Err(e) => Err(AuditError::unreadable(unit.to_string(), e)),
            };
            self.absorb(outcome)?;
        }
        Ok(())
    }

    /// Fingerprint, reconcile and report one unit.
    async fn audit_unit<S: ChunkRead>(&mut self, unit: LogicalUnit, stream: S) -> Result<()> {
        let fingerprint = self
            .fingerprinter
            .compute(stream)
            .await
            .map_err(|e| AuditError::unreadable(unit.to_string(), e))?;

        let reconciliation = reconcile(&mut *self.lookup, &fingerprint, &unit.name).await?;

        self.stats.units += 1;
        if reconciliation.match_count() > 0 {
            self.stats.matched += 1;
        }
        if reconciliation.any_name_match() {
            self.stats.name_matched += 1;
        }
        debug!(
            unit = %unit,
            size = fingerprint.size,
            checksum = %fingerprint.checksum,
            matches = reconciliation.match_count(),
            "reconciled"
        );

        let records =
            ReconciliationRecord::assemble(&unit, &fingerprint, reconciliation, self.config.aggregation);
        for record in &records {
            self.sink.write(record)?;
            self.stats.records += 1;
        }
        Ok(())
    }
}
