//! BIGF header and entry table decoding.
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! 0x00  magic "BIGF"
//! 0x04  entry_count
//! 0x08  table_offset   base for every payload offset
//! 0x0C  reserved (0x18 bytes)
//! 0x24  entry_count descriptors of 0x18 bytes each:
//!         0x00 name[16]  NUL-padded
//!         0x10 payload_size
//!         0x14 payload_offset  relative to table_offset
//! ```

use bigf_common::BinaryReader;
use zerocopy::byteorder::little_endian::U32;
use zerocopy::{FromBytes, Immutable, KnownLayout, Unaligned};

use crate::entry::BigEntry;
use crate::{Error, Result};

/// Archive magic bytes.
pub const MAGIC: &[u8; 4] = b"BIGF";

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 0x24;

/// Size of one entry descriptor in bytes.
pub const ENTRY_SIZE: usize = 0x18;

/// Size of the reserved block between `table_offset` and the entry table.
const RESERVED_SIZE: usize = 0x18;

/// Size of the name field inside a descriptor.
pub const NAME_SIZE: usize = 0x10;

/// On-disk entry descriptor.
#[derive(Debug, Clone, Copy, FromBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub(crate) struct RawEntry {
    pub name: [u8; NAME_SIZE],
    pub payload_size: U32,
    pub payload_offset: U32,
}

/// Decoded archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArchiveHeader {
    /// Number of entries in the descriptor table.
    pub entry_count: u32,
    /// Byte offset that every entry's payload offset is relative to.
    pub table_offset: u32,
}

/// Parse the header and entry table of a BIGF archive.
///
/// Entries are returned in table order. Payload windows are not checked
/// here; see [`crate::payload_window`].
pub fn parse(data: &[u8]) -> Result<(ArchiveHeader, Vec<BigEntry>)> {
    let mut reader = BinaryReader::new(data);
    reader.expect_magic(MAGIC).map_err(|_| {
        Error::InvalidMagic(data[..data.len().min(MAGIC.len())].to_vec())
    })?;

    if data.len() < HEADER_SIZE {
        return Err(Error::TruncatedHeader { len: data.len() });
    }

    let header = ArchiveHeader {
        entry_count: reader.read_u32()?,
        table_offset: reader.read_u32()?,
    };
    reader.advance(RESERVED_SIZE);

    let needed = (header.entry_count as u64)
        .checked_mul(ENTRY_SIZE as u64)
        .and_then(|table| table.checked_add(HEADER_SIZE as u64));
    match needed {
        Some(needed) if needed <= data.len() as u64 => {}
        _ => {
            return Err(Error::TruncatedTable {
                entry_count: header.entry_count,
                needed: needed.unwrap_or(u64::MAX),
                len: data.len(),
            })
        }
    }

    let mut entries = Vec::with_capacity(header.entry_count as usize);
    for index in 0..header.entry_count as usize {
        let raw: RawEntry = reader.read_struct()?;
        entries.push(BigEntry::new(
            index,
            decode_name(&raw.name),
            raw.payload_size.get(),
            raw.payload_offset.get(),
        ));
    }

    log::debug!(
        "parsed BIGF header: {} entries, table offset {:#x}",
        header.entry_count,
        header.table_offset
    );

    Ok((header, entries))
}

/// Decode a descriptor name field.
///
/// Every NUL byte is dropped, including ones between other characters, so
/// `a\0b` decodes to `ab`. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_name(field: &[u8]) -> String {
    let bytes: Vec<u8> = field.iter().copied().filter(|&b| b != 0).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    use byteorder::{LittleEndian, WriteBytesExt};

    fn header(entry_count: u32, table_offset: u32) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.write_u32::<LittleEndian>(entry_count).unwrap();
        data.write_u32::<LittleEndian>(table_offset).unwrap();
        data.resize(HEADER_SIZE, 0);
        data
    }

    fn descriptor(data: &mut Vec<u8>, name: &[u8], size: u32, offset: u32) {
        let mut field = [0u8; NAME_SIZE];
        field[..name.len()].copy_from_slice(name);
        data.extend_from_slice(&field);
        data.write_u32::<LittleEndian>(size).unwrap();
        data.write_u32::<LittleEndian>(offset).unwrap();
    }

    #[test]
    fn test_struct_sizes() {
        assert_eq!(MAGIC.len() + 8 + RESERVED_SIZE, HEADER_SIZE);
        assert_eq!(std::mem::size_of::<RawEntry>(), ENTRY_SIZE);
    }

    #[test]
    fn test_parse_preserves_header_fields() {
        let mut data = header(2, 0x54);
        descriptor(&mut data, b"one.wav", 3, 0);
        descriptor(&mut data, b"two.wav", 5, 3);

        let (header, entries) = parse(&data).unwrap();
        assert_eq!(header.entry_count, 2);
        assert_eq!(header.table_offset, 0x54);
        assert_eq!(&data[4..8], &header.entry_count.to_le_bytes());
        assert_eq!(&data[8..12], &header.table_offset.to_le_bytes());

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name(), "one.wav");
        assert_eq!(entries[0].payload_size(), 3);
        assert_eq!(entries[0].payload_offset(), 0);
        assert_eq!(entries[1].name(), "two.wav");
        assert_eq!(entries[1].index(), 1);
        assert_eq!(entries[1].payload_size(), 5);
        assert_eq!(entries[1].payload_offset(), 3);
    }

    #[test]
    fn test_empty_table() {
        let data = header(0, HEADER_SIZE as u32);
        let (header, entries) = parse(&data).unwrap();
        assert_eq!(header.entry_count, 0);
        assert!(entries.is_empty());
    }

    #[test]
    fn test_invalid_magic() {
        for data in [&b""[..], &b"B"[..], &b"BIG"[..], &b"RIFF0000"[..], &b"bigf"[..]] {
            assert!(
                matches!(parse(data), Err(Error::InvalidMagic(_))),
                "{data:?}"
            );
        }

        let mut data = header(0, 0);
        data[3] = b'G';
        assert!(matches!(parse(&data), Err(Error::InvalidMagic(m)) if m == b"BIGG"));
    }

    #[test]
    fn test_truncated_header() {
        let data = header(0, 0);
        for len in [4, 12, HEADER_SIZE - 1] {
            match parse(&data[..len]) {
                Err(Error::TruncatedHeader { len: actual }) => assert_eq!(actual, len),
                other => panic!("expected TruncatedHeader for {len}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_truncated_table() {
        let mut data = header(2, 0x54);
        descriptor(&mut data, b"one.wav", 0, 0);
        data.extend_from_slice(&[0u8; ENTRY_SIZE - 1]);

        match parse(&data) {
            Err(Error::TruncatedTable {
                entry_count,
                needed,
                len,
            }) => {
                assert_eq!(entry_count, 2);
                assert_eq!(needed, (HEADER_SIZE + 2 * ENTRY_SIZE) as u64);
                assert_eq!(len, data.len());
            }
            other => panic!("expected TruncatedTable, got {other:?}"),
        }
    }

    #[test]
    fn test_huge_entry_count_is_truncated_table() {
        let data = header(u32::MAX, 0);
        assert!(matches!(parse(&data), Err(Error::TruncatedTable { .. })));
    }

    #[test]
    fn test_decode_name_strips_every_nul() {
        assert_eq!(decode_name(b"a\0b"), "ab");
        assert_eq!(decode_name(b"\0\0test.wav\0\0\0\0\0\0\0\0"), "test.wav");
        assert_eq!(decode_name(&[0u8; NAME_SIZE]), "");
        assert_eq!(decode_name(b"0123456789abcdef"), "0123456789abcdef");
    }

    #[test]
    fn test_name_with_embedded_nul_in_table() {
        let mut data = header(1, 0x3C);
        descriptor(&mut data, b"a\0b", 0, 0);

        let (_, entries) = parse(&data).unwrap();
        assert_eq!(entries[0].name(), "ab");
    }
}
