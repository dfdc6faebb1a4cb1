//! BIGF archive reader and payload extraction.

use std::fs::File;
use std::ops::{Deref, Range};
use std::path::Path;

use memmap2::Mmap;

use crate::cipher::{decipher, CipherKey};
use crate::entry::BigEntry;
use crate::header::{self, ArchiveHeader};
use crate::{Error, Result};

/// Backing storage for an archive's bytes.
enum ArchiveData {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Deref for ArchiveData {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => &mmap[..],
            Self::Owned(bytes) => &bytes[..],
        }
    }
}

/// A parsed BIGF archive together with its bytes.
///
/// The header and entry table are decoded once on construction; payloads
/// are sliced out on demand and never modify the archive buffer.
pub struct BigArchive {
    data: ArchiveData,
    name: String,
    header: ArchiveHeader,
    entries: Vec<BigEntry>,
}

impl BigArchive {
    /// Open and parse an archive from disk using a memory map.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        // Zero-length files cannot be mapped on every platform.
        let data = if file.metadata()?.len() == 0 {
            ArchiveData::Owned(Vec::new())
        } else {
            ArchiveData::Mapped(unsafe { Mmap::map(&file)? })
        };

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Self::with_data(name, data)
    }

    /// Parse an archive from an owned buffer.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self> {
        Self::with_data(name.into(), ArchiveData::Owned(data))
    }

    fn with_data(name: String, data: ArchiveData) -> Result<Self> {
        let (header, entries) = header::parse(&data)?;
        Ok(Self {
            data,
            name,
            header,
            entries,
        })
    }

    /// Get the archive name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the decoded header.
    #[inline]
    pub fn header(&self) -> &ArchiveHeader {
        &self.header
    }

    /// Get the raw archive bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the number of entries.
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Get all entries in table order.
    #[inline]
    pub fn entries(&self) -> &[BigEntry] {
        &self.entries
    }

    /// Iterate over entries in table order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &BigEntry> + '_ {
        self.entries.iter()
    }

    /// Get entry by index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&BigEntry> {
        self.entries.get(index)
    }

    /// Find the first entry with the given name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&BigEntry> {
        self.entries
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }

    /// Borrow an entry's payload exactly as stored.
    pub fn read(&self, entry: &BigEntry) -> Result<&[u8]> {
        let window = payload_window(&self.header, entry, self.data.len())?;
        Ok(&self.data[window])
    }

    /// Copy an entry's payload, deciphering it when a key is given.
    pub fn extract(&self, entry: &BigEntry, key: Option<&CipherKey>) -> Result<Vec<u8>> {
        extract_payload(&self.data, &self.header, entry, key)
    }

    /// Extract every entry in table order.
    ///
    /// Fails on the first entry whose payload is out of range; no partial
    /// result is returned.
    pub fn extract_all(&self, key: Option<&CipherKey>) -> Result<Vec<(&BigEntry, Vec<u8>)>> {
        self.entries
            .iter()
            .map(|entry| self.extract(entry, key).map(|payload| (entry, payload)))
            .collect()
    }

    /// Parallel extraction of every entry.
    ///
    /// Results keep table order. Like [`extract_all`](Self::extract_all),
    /// any out-of-range entry fails the whole archive.
    #[cfg(feature = "parallel")]
    pub fn extract_parallel(
        &self,
        key: Option<&CipherKey>,
    ) -> Result<Vec<(&BigEntry, Vec<u8>)>> {
        use rayon::prelude::*;

        self.entries
            .par_iter()
            .map(|entry| self.extract(entry, key).map(|payload| (entry, payload)))
            .collect()
    }
}

impl std::fmt::Debug for BigArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BigArchive")
            .field("name", &self.name)
            .field("header", &self.header)
            .field("entries", &self.entries.len())
            .finish()
    }
}

/// Compute the absolute byte range of an entry's payload.
///
/// The range is `table_offset + payload_offset` for `payload_size` bytes.
/// Fails with [`Error::PayloadOutOfRange`] if it does not fit in `len`.
pub fn payload_window(header: &ArchiveHeader, entry: &BigEntry, len: usize) -> Result<Range<usize>> {
    let start = u64::from(header.table_offset).checked_add(u64::from(entry.payload_offset()));
    let end = start.and_then(|start| start.checked_add(u64::from(entry.payload_size())));

    let out_of_range = || Error::PayloadOutOfRange {
        name: entry.name().to_string(),
        start: start.unwrap_or(u64::MAX),
        end: end.unwrap_or(u64::MAX),
        len,
    };

    let (start, end) = match (start, end) {
        (Some(start), Some(end)) if end <= len as u64 => (start, end),
        _ => return Err(out_of_range()),
    };

    let start = usize::try_from(start).map_err(|_| out_of_range())?;
    let end = usize::try_from(end).map_err(|_| out_of_range())?;

    log::trace!("{}: payload window {:#x}..{:#x}", entry.name(), start, end);

    Ok(start..end)
}

/// Slice an entry's payload out of `data` and optionally decipher it.
///
/// `data` is never modified; the returned buffer is always a copy.
pub fn extract_payload(
    data: &[u8],
    header: &ArchiveHeader,
    entry: &BigEntry,
    key: Option<&CipherKey>,
) -> Result<Vec<u8>> {
    let window = payload_window(header, entry, data.len())?;
    Ok(decipher(&data[window], key))
}
