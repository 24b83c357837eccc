#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::bail;
use async_trait::async_trait;
use md5::{Digest, Md5};

use rosetta_checker::error::Result as AuditResult;
use rosetta_checker::{
    AuditConfig, AuditStats, Auditor, CsvIndex, Fingerprinter, LookupRow, LookupService,
    ReconciliationRecord, ReportSink,
};

pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

pub fn stored_row(fl_id: &str, original_name: &str) -> LookupRow {
    LookupRow {
        ie_id: format!("IE-{fl_id}"),
        rep_id: format!("REP-{fl_id}"),
        fl_id: fl_id.to_string(),
        original_name: original_name.to_string(),
        owner: "CRS00".to_string(),
        label: "Staging test".to_string(),
        group_id: "G1".to_string(),
        entity_type: "Document".to_string(),
        user_class: "MASTER".to_string(),
    }
}

/// Index holding `rows` for the content `data`.
pub fn index_with(entries: &[(&[u8], LookupRow)]) -> CsvIndex {
    let mut index = CsvIndex::default();
    for (data, row) in entries {
        index.insert(data.len() as u64, &md5_hex(data), row.clone());
    }
    index
}

/// Sink that keeps records for inspection.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub records: Vec<ReconciliationRecord>,
    pub finished: bool,
}

impl ReportSink for CollectingSink {
    fn write(&mut self, record: &ReconciliationRecord) -> AuditResult<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> AuditResult<()> {
        self.finished = true;
        Ok(())
    }
}

/// Answers the first `healthy` queries from `inner`, then fails.
pub struct FlakyLookup {
    pub inner: CsvIndex,
    pub healthy: usize,
}

#[async_trait]
impl LookupService for FlakyLookup {
    async fn lookup(&mut self, size: u64, checksum: &str) -> anyhow::Result<Vec<LookupRow>> {
        if self.healthy == 0 {
            bail!("connection lost");
        }
        self.healthy -= 1;
        self.inner.lookup(size, checksum).await
    }
}

/// Run an audit with a small read size so multi-chunk paths are exercised.
pub async fn audit(
    config: &AuditConfig,
    lookup: &mut dyn LookupService,
    arguments: &[String],
) -> (AuditResult<AuditStats>, Vec<ReconciliationRecord>) {
    let mut sink = CollectingSink::default();
    let result = Auditor::new(config, lookup, &mut sink)
        .with_fingerprinter(Fingerprinter::with_chunk_size(7))
        .run(arguments)
        .await;
    (result, sink.records)
}

pub fn arg(path: &Path) -> String {
    path.display().to_string()
}

pub fn write(path: &Path, data: &[u8]) -> PathBuf {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, data).unwrap();
    path.to_path_buf()
}

pub fn bzip2(data: &[u8]) -> Vec<u8> {
    let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

struct ZipEntry {
    name: String,
    data: Vec<u8>,
    payload: Vec<u8>,
    method: u16,
    flags: u16,
}

/// Minimal zip writer for fixtures: local headers, central directory, EOCD.
#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<ZipEntry>,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(mut self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, data.to_vec(), 0, 0);
        self
    }

    pub fn deflated(mut self, name: &str, data: &[u8]) -> Self {
        let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::best());
        enc.write_all(data).unwrap();
        let payload = enc.finish().unwrap();
        self.push(name, data, payload, 8, 0);
        self
    }

    pub fn directory(mut self, name: &str) -> Self {
        assert!(name.ends_with('/'));
        self.push(name, b"", Vec::new(), 0, 0);
        self
    }

    /// A member using a compression method the reader does not support.
    pub fn with_method(mut self, name: &str, data: &[u8], method: u16) -> Self {
        self.push(name, data, data.to_vec(), method, 0);
        self
    }

    pub fn encrypted(mut self, name: &str, data: &[u8]) -> Self {
        self.push(name, data, data.to_vec(), 0, 1);
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    fn push(&mut self, name: &str, data: &[u8], payload: Vec<u8>, method: u16, flags: u16) {
        self.entries.push(ZipEntry {
            name: name.to_string(),
            data: data.to_vec(),
            payload,
            method,
            flags,
        });
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut central = Vec::new();

        for entry in &self.entries {
            let mut crc = flate2::Crc::new();
            crc.update(&entry.data);
            let offset = out.len() as u32;

            out.extend(b"PK\x03\x04");
            out.extend(20u16.to_le_bytes());
            out.extend(entry.flags.to_le_bytes());
            out.extend(entry.method.to_le_bytes());
            out.extend(0u16.to_le_bytes()); // time
            out.extend(0x21u16.to_le_bytes()); // date: 1980-01-01
            out.extend(crc.sum().to_le_bytes());
            out.extend((entry.payload.len() as u32).to_le_bytes());
            out.extend((entry.data.len() as u32).to_le_bytes());
            out.extend((entry.name.len() as u16).to_le_bytes());
            out.extend(0u16.to_le_bytes());
            out.extend(entry.name.as_bytes());
            out.extend(&entry.payload);

            central.extend(b"PK\x01\x02");
            central.extend(20u16.to_le_bytes());
            central.extend(20u16.to_le_bytes());
            central.extend(entry.flags.to_le_bytes());
            central.extend(entry.method.to_le_bytes());
            central.extend(0u16.to_le_bytes());
            central.extend(0x21u16.to_le_bytes());
            central.extend(crc.sum().to_le_bytes());
            central.extend((entry.payload.len() as u32).to_le_bytes());
            central.extend((entry.data.len() as u32).to_le_bytes());
            central.extend((entry.name.len() as u16).to_le_bytes());
            central.extend(0u16.to_le_bytes()); // extra
            central.extend(0u16.to_le_bytes()); // comment
            central.extend(0u16.to_le_bytes()); // disk
            central.extend(0u16.to_le_bytes()); // internal attrs
            central.extend(0u32.to_le_bytes()); // external attrs
            central.extend(offset.to_le_bytes());
            central.extend(entry.name.as_bytes());
        }

        let cd_offset = out.len() as u32;
        let count = self.entries.len() as u16;
        out.extend(&central);

        out.extend(b"PK\x05\x06");
        out.extend(0u16.to_le_bytes());
        out.extend(0u16.to_le_bytes());
        out.extend(count.to_le_bytes());
        out.extend(count.to_le_bytes());
        out.extend((central.len() as u32).to_le_bytes());
        out.extend(cd_offset.to_le_bytes());
        out.extend((self.comment.len() as u16).to_le_bytes());
        out.extend(&self.comment);
        out
    }
}
