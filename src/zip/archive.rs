use std::sync::Arc;

use anyhow::{Result, bail};

use crate::io::{ChunkRead, DecodeStream, DeflateCodec, RangeStream, ReadAt};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipMember};

/// Read-only view of a zip container that hands out member streams.
pub struct ZipArchive<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt + 'static> ZipArchive<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// All central directory entries in container order.
    pub async fn members(&self) -> Result<Vec<ZipMember>> {
        self.parser.list_members().await
    }

    /// Open a decompressed stream over one member's content.
    ///
    /// The stream is bounded by the member's compressed size, so a member
    /// cut short by a truncated archive ends early instead of bleeding
    /// into the next header.
    pub async fn open_member(&self, member: &ZipMember) -> Result<Box<dyn ChunkRead>> {
        if member.is_directory {
            bail!("{} is a directory entry", member.name);
        }
        if member.is_encrypted() {
            bail!("{} is encrypted", member.name);
        }

        let offset = self.parser.data_offset(member).await?;
        let raw = RangeStream::new(
            Arc::clone(self.parser.reader()),
            offset,
            Some(member.compressed_size),
        );

        match member.method {
            CompressionMethod::Stored => Ok(Box::new(raw)),
            CompressionMethod::Deflate => Ok(Box::new(DecodeStream::new(raw, DeflateCodec::new()))),
            CompressionMethod::Unknown(code) => {
                bail!("{} uses unsupported compression method {code}", member.name)
            }
        }
    }
}
