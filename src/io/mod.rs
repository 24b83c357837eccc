//! Byte sources used by the traversal engine.
//!
//! Two seams live here. [`ReadAt`] gives random access to a container
//! (the zip parser seeks to the central directory before touching member
//! data). [`ChunkRead`] is the forward-only stream the fingerprinter
//! consumes; every logical unit, whatever produced it, is handed over as
//! one of these.

mod decode;
mod local;
mod stream;

pub use decode::{Bzip2Codec, Codec, DecodeStream, DeflateCodec, Step};
pub use local::LocalFileReader;
pub use stream::RangeStream;

use anyhow::{Result, bail};
use async_trait::async_trait;

/// Trait for random access reading from a data source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer.
    ///
    /// Returns the number of bytes read; `0` means `offset` is at or past
    /// the end of the source.
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill `buf` completely from `offset`, failing on a short source.
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let at = offset + filled as u64;
            let n = self.read_at(at, &mut buf[filled..]).await?;
            if n == 0 {
                bail!("unexpected end of data at offset {at}");
            }
            filled += n;
        }
        Ok(())
    }
}

/// Forward-only byte stream.
#[async_trait]
pub trait ChunkRead: Send {
    /// Read the next chunk into `buf`. `Ok(0)` signals end of data.
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize>;
}

#[async_trait]
impl<T: ChunkRead + ?Sized> ChunkRead for Box<T> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read_chunk(buf).await
    }
}
