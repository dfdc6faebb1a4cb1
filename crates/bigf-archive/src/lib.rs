//! BIGF archive reader for Colin McRae Rally 04 game files.
//!
//! BIG archives bundle the game's audio assets. The format is a fixed 0x24-byte
//! header followed by a table of 0x18-byte descriptors, each naming a payload
//! by size and offset. WAV payloads are additionally obfuscated with a
//! repeating XOR key shipped alongside the game.
//!
//! - [`BigArchive`] - Parses the header and entry table, slices payloads
//! - [`CipherKey`] - Repeating XOR key for WAV payloads
//! - [`payload_window`] - Bounds-checked payload range computation
//!
//! Enable the `parallel` feature for rayon-backed extraction and `serde` to
//! serialize headers and entries.
//!
//! # Example
//!
//! ```no_run
//! use bigf_archive::{BigArchive, CipherKey};
//!
//! let archive = BigArchive::open("MUSIC.BIG")?;
//! let key = CipherKey::load("wav-key.bin")?;
//!
//! for entry in archive.iter() {
//!     let data = archive.extract(entry, Some(&key))?;
//!     println!("{}: {} bytes", entry.name(), data.len());
//! }
//! # Ok::<(), bigf_archive::Error>(())
//! ```

mod archive;
mod cipher;
mod entry;
mod error;
pub mod header;

pub use archive::{extract_payload, payload_window, BigArchive};
pub use cipher::{decipher, CipherKey};
pub use entry::{output_names, BigEntry};
pub use error::{Error, Result};
pub use header::{parse, ArchiveHeader};
