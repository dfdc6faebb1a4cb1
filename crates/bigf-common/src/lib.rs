//! Common utilities for bigf.
//!
//! This crate provides the foundational pieces shared by the archive crates:
//!
//! - [`BinaryReader`] - Bounds-checked, zero-copy reading from byte slices
//! - [`Error`] - Errors raised while reading binary data

mod error;
mod reader;

pub use error::{Error, Result};
pub use reader::BinaryReader;
