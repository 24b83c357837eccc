//! Streaming decompression on top of a [`ChunkRead`] source.
//!
//! The decoders are driven through their low-level state machines
//! (`flate2::Decompress`, `bzip2::Decompress`) so compressed input is
//! pulled in bounded pieces and decompressed output is handed straight to
//! the caller's buffer. Nothing is ever held whole in memory.

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::ChunkRead;

/// Compressed input buffered between source reads.
const INPUT_BUFFER_SIZE: usize = 256 * 1024;

/// Progress made by one call to [`Codec::decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub consumed: usize,
    pub produced: usize,
    /// The codec saw its end-of-stream marker.
    pub finished: bool,
}

/// A decompressor that can be fed arbitrary slices of its input.
pub trait Codec: Send {
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<Step>;

    /// Prepare for another stream concatenated after the one that just
    /// ended. Returns `false` when the format has no such notion, in
    /// which case trailing bytes are ignored.
    fn restart(&mut self) -> bool {
        false
    }
}

/// Raw DEFLATE, as stored in zip members (method 8).
pub struct DeflateCodec {
    inner: flate2::Decompress,
}

impl DeflateCodec {
    pub fn new() -> Self {
        Self {
            inner: flate2::Decompress::new(false),
        }
    }
}

impl Default for DeflateCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for DeflateCodec {
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<Step> {
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let status = self
            .inner
            .decompress(input, output, flate2::FlushDecompress::None)?;
        Ok(Step {
            consumed: (self.inner.total_in() - in_before) as usize,
            produced: (self.inner.total_out() - out_before) as usize,
            finished: status == flate2::Status::StreamEnd,
        })
    }
}

/// bzip2, including the multi-stream files written by parallel
/// compressors.
pub struct Bzip2Codec {
    inner: bzip2::Decompress,
}

impl Bzip2Codec {
    pub fn new() -> Self {
        Self {
            inner: bzip2::Decompress::new(false),
        }
    }
}

impl Default for Bzip2Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for Bzip2Codec {
    fn decode(&mut self, input: &[u8], output: &mut [u8]) -> Result<Step> {
        let (in_before, out_before) = (self.inner.total_in(), self.inner.total_out());
        let status = self.inner.decompress(input, output)?;
        Ok(Step {
            consumed: (self.inner.total_in() - in_before) as usize,
            produced: (self.inner.total_out() - out_before) as usize,
            finished: status == bzip2::Status::StreamEnd,
        })
    }

    fn restart(&mut self) -> bool {
        self.inner = bzip2::Decompress::new(false);
        true
    }
}

/// Decompressed view of a compressed [`ChunkRead`].
pub struct DecodeStream<S, C> {
    source: S,
    codec: C,
    input: Vec<u8>,
    start: usize,
    end: usize,
    source_done: bool,
    stream_ended: bool,
}

impl<S: ChunkRead, C: Codec> DecodeStream<S, C> {
    pub fn new(source: S, codec: C) -> Self {
        Self {
            source,
            codec,
            input: vec![0u8; INPUT_BUFFER_SIZE],
            start: 0,
            end: 0,
            source_done: false,
            stream_ended: false,
        }
    }

    async fn refill(&mut self) -> Result<()> {
        if self.start == self.end && !self.source_done {
            let n = self.source.read_chunk(&mut self.input).await?;
            self.start = 0;
            self.end = n;
            self.source_done = n == 0;
        }
        Ok(())
    }
}

#[async_trait]
impl<S: ChunkRead, C: Codec> ChunkRead for DecodeStream<S, C> {
    async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            self.refill().await?;

            if self.stream_ended {
                if self.start == self.end {
                    if self.source_done {
                        return Ok(0);
                    }
                    continue;
                }
                if !self.codec.restart() {
                    return Ok(0);
                }
                self.stream_ended = false;
            }

            let step = self
                .codec
                .decode(&self.input[self.start..self.end], buf)?;
            self.start += step.consumed;
            self.stream_ended = step.finished;

            if step.produced > 0 {
                return Ok(step.produced);
            }
            if step.finished || step.consumed > 0 {
                continue;
            }
            if self.start < self.end {
                bail!("decoder stalled with {} bytes of input pending", self.end - self.start);
            }
            if self.source_done {
                bail!("compressed data ends before the end-of-stream marker");
            }
        }
    }
}
