//! Content fingerprinting.
//!
//! A fingerprint is the pair the repository index is keyed on: the exact
//! number of bytes in a logical unit and the MD5 digest of those bytes.

use md5::{Digest, Md5};

use crate::io::ChunkRead;

/// Bytes requested from a stream per read.
pub const CHUNK_SIZE: usize = 2_000_000;

/// The only checksum algorithm computed and compared.
pub const CHECKSUM_ALGORITHM: &str = "MD5";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Bytes actually read from the stream.
    pub size: u64,
    /// Lowercase hex MD5 digest.
    pub checksum: String,
}

/// Computes fingerprints, reusing one chunk buffer across units.
pub struct Fingerprinter {
    buf: Vec<u8>,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self::with_chunk_size(CHUNK_SIZE)
    }

    pub fn with_chunk_size(chunk_size: usize) -> Self {
        Self {
            buf: vec![0u8; chunk_size.max(1)],
        }
    }

    /// Consume `stream` to its end in one forward pass.
    ///
    /// The stream is taken by value and dropped before returning, on
    /// success and on a read failure alike.
    ///
    /// Local reads complete without suspending, so the loop yields after
    /// every chunk to let a pending interrupt win a `select!`.
    pub async fn compute<S: ChunkRead>(&mut self, mut stream: S) -> anyhow::Result<Fingerprint> {
        let mut hasher = Md5::new();
        let mut size = 0u64;

        loop {
            let n = stream.read_chunk(&mut self.buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&self.buf[..n]);
            size += n as u64;
            tokio::task::yield_now().await;
        }

        Ok(Fingerprint {
            size,
            checksum: hex::encode(hasher.finalize()),
        })
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new()
    }
}
