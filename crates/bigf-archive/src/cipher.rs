//! WAV payload deciphering with a repeating XOR key.
//!
//! Audio payloads are obfuscated by XORing byte `i` with `key[i % key.len()]`.
//! The key ships with the game as a separate file (commonly `wav-key.bin`).
//! XOR is its own inverse, so the same transform enciphers and deciphers.

use std::fs;
use std::path::Path;

use crate::{Error, Result};

/// A repeating XOR key.
///
/// Always holds at least one byte.
#[derive(Clone, PartialEq, Eq)]
pub struct CipherKey {
    bytes: Vec<u8>,
}

impl CipherKey {
    /// Create a key from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(Error::EmptyKey);
        }
        Ok(Self { bytes })
    }

    /// Load a key from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(fs::read(path)?)
    }

    /// Get the key bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Get the key length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the key is empty. Never true for a constructed key.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Transform data in place.
    pub fn apply_in_place(&self, data: &mut [u8]) {
        for (byte, k) in data.iter_mut().zip(self.bytes.iter().cycle()) {
            *byte ^= k;
        }
    }

    /// Transform data into a new buffer, leaving the input untouched.
    pub fn apply(&self, data: &[u8]) -> Vec<u8> {
        let mut buffer = data.to_vec();
        self.apply_in_place(&mut buffer);
        buffer
    }
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Decipher a payload, or copy it unchanged when no key is given.
pub fn decipher(data: &[u8], key: Option<&CipherKey>) -> Vec<u8> {
    match key {
        Some(key) => key.apply(data),
        None => data.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(CipherKey::new(Vec::<u8>::new()), Err(Error::EmptyKey)));
    }

    #[test]
    fn test_single_ff_key_is_bitwise_not() {
        let key = CipherKey::new([0xFFu8]).unwrap();
        let data = [0x00u8, 0x0F, 0xA5, 0xFF];
        assert_eq!(key.apply(&data), vec![0xFF, 0xF0, 0x5A, 0x00]);
    }

    #[test]
    fn test_key_repeats() {
        let key = CipherKey::new([0x01u8, 0x02, 0x03]).unwrap();
        let data = [0u8; 7];
        assert_eq!(key.apply(&data), vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_applying_twice_is_identity() {
        let key = CipherKey::new(b"\x13\x37\xC0\xDE\x42".to_vec()).unwrap();
        let data: Vec<u8> = (0..=255u8).cycle().take(1000).collect();

        let once = decipher(&data, Some(&key));
        assert_ne!(once, data);
        assert_eq!(decipher(&once, Some(&key)), data);
    }

    #[test]
    fn test_key_longer_than_data() {
        let key = CipherKey::new(vec![0xAAu8; 64]).unwrap();
        assert_eq!(key.apply(&[0xAA, 0x55]), vec![0x00, 0xFF]);
        assert!(key.apply(&[]).is_empty());
    }

    #[test]
    fn test_no_key_is_identity() {
        let data = [1u8, 2, 3, 4];
        assert_eq!(decipher(&data, None), data.to_vec());
    }

    #[test]
    fn test_load_key_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x10, 0x20]).unwrap();

        let key = CipherKey::load(file.path()).unwrap();
        assert_eq!(key.as_bytes(), &[0x10, 0x20]);
        assert_eq!(key.len(), 2);
    }

    #[test]
    fn test_load_missing_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = CipherKey::load(dir.path().join("wav-key.bin"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_load_empty_key_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(CipherKey::load(file.path()), Err(Error::EmptyKey)));
    }
}
