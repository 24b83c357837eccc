use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::{ChunkRead, ReadAt};

/// Sequential window over a [`ReadAt`] source.
///
/// Reads from `offset` until `limit` bytes have been delivered or the
/// source runs dry, whichever comes first. A stored zip member whose
/// archive was cut short therefore yields only the bytes that exist.
pub struct RangeStream<R: ReadAt> {
    reader: Arc<R>,
    pos: u64,
    end: Option<u64>,
}

impl<R: ReadAt> RangeStream<R> {
    pub fn new(reader: Arc<R>, offset: u64, limit: Option<u64>) -> Self {
        Self {
            reader,
            pos: offset,
            end: limit.map(|len| offset.saturating_add(len)),
        }
    }

    /// The whole source, read up to its actual end of data.
    pub fn whole(reader: Arc<R>) -> Self {
        Self::new(reader, 0, None)
    }
}

#[async_trait]
impl<R: ReadAt + 'static> ChunkRead for RangeStream<R> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        let want = match self.end {
            Some(end) => end.saturating_sub(self.pos).min(buf.len() as u64) as usize,
            None => buf.len(),
        };
        if want == 0 {
            return Ok(0);
        }

        let n = self.reader.read_at(self.pos, &mut buf[..want]).await?;
        self.pos += n as u64;
        Ok(n)
    }
}
