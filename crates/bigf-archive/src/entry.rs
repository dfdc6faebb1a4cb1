//! BIGF archive entry.

use std::collections::HashSet;
use std::path::Path;

/// An entry (named payload) within a BIGF archive.
///
/// This contains metadata about the payload, not the payload itself.
/// Use [`BigArchive::extract`](crate::BigArchive::extract) to get the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BigEntry {
    /// Position in the descriptor table.
    index: usize,
    /// Name with every NUL byte removed.
    name: String,
    /// Payload size in bytes.
    payload_size: u32,
    /// Payload offset, relative to the header's table offset.
    payload_offset: u32,
}

impl BigEntry {
    pub(crate) fn new(index: usize, name: String, payload_size: u32, payload_offset: u32) -> Self {
        Self {
            index,
            name,
            payload_size,
            payload_offset,
        }
    }

    /// Get the position of this entry in the descriptor table.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the entry name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the payload size in bytes.
    #[inline]
    pub fn payload_size(&self) -> u32 {
        self.payload_size
    }

    /// Get the payload offset relative to the table offset.
    #[inline]
    pub fn payload_offset(&self) -> u32 {
        self.payload_offset
    }

    /// Get the file extension, if any.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    /// File name to write this entry under: `<stem>_<name>`.
    ///
    /// Path separators in the entry name are replaced with `_` so the result
    /// is always a single path component.
    pub fn output_name(&self, stem: &str) -> String {
        format!("{stem}_{}", self.flat_name())
    }

    /// File name qualified by table index: `<stem>_<index>_<name>`.
    pub fn indexed_output_name(&self, stem: &str) -> String {
        format!("{stem}_{}_{}", self.index, self.flat_name())
    }

    fn flat_name(&self) -> String {
        self.name.replace(['/', '\\'], "_")
    }
}

/// Output file names for a whole entry table, in table order.
///
/// The first entry with a given name keeps `<stem>_<name>`; any later entry
/// with the same name gets `<stem>_<index>_<name>` so no two entries share a
/// destination.
pub fn output_names(entries: &[BigEntry], stem: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .map(|entry| {
            if seen.insert(entry.name()) {
                entry.output_name(stem)
            } else {
                entry.indexed_output_name(stem)
            }
        })
        .collect()
}
