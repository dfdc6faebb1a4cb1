//! Error types for the BIGF archive crate.

use thiserror::Error;

/// Errors that can occur when working with BIGF archives.
///
/// Every variant except [`Error::Io`] describes a malformed archive or key;
/// callers processing a batch should skip the archive and carry on.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Common library error.
    #[error("{0}")]
    Common(#[from] bigf_common::Error),

    /// The first four bytes are not `BIGF` (or there are fewer than four).
    #[error("missing BIGF magic header, got {0:02x?}")]
    InvalidMagic(Vec<u8>),

    /// The buffer is shorter than the fixed 0x24-byte header.
    #[error("truncated header: {len} bytes, need at least 0x24")]
    TruncatedHeader { len: usize },

    /// The buffer ends before the declared entry table does.
    #[error("truncated entry table: {entry_count} entries need {needed} bytes, archive has {len}")]
    TruncatedTable {
        entry_count: u32,
        needed: u64,
        len: usize,
    },

    /// An entry's payload window does not fit inside the archive.
    #[error("payload of {name:?} out of range: {start:#x}..{end:#x} exceeds archive length {len:#x}")]
    PayloadOutOfRange {
        name: String,
        start: u64,
        end: u64,
        len: usize,
    },

    /// A cipher key must contain at least one byte.
    #[error("cipher key is empty")]
    EmptyKey,
}

/// Result type for BIGF operations.
pub type Result<T> = std::result::Result<T, Error>;
