//! ZIP container reading.
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 records, member metadata)
//! - [`parser`]: locating and decoding the central directory
//! - [`archive`]: member listing and per-member content streams
//!
//! Members are listed from the central directory, so their order is the
//! container order recorded by the archiver. STORED and DEFLATE members
//! can be streamed; encrypted members and other methods are reported as
//! unreadable.

mod archive;
mod parser;
mod structures;

pub use archive::ZipArchive;
pub use parser::ZipParser;
pub use structures::*;
