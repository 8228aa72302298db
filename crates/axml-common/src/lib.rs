//! Common utilities for the AXML crates.
//!
//! This crate provides the byte-level plumbing shared by the encoder and its test decoder:
//!
//! - [`BinaryWriter`] - Little-endian primitive sink over any [`std::io::Write`]
//! - [`BinaryReader`] - Zero-copy little-endian reading from byte slices

mod error;
mod reader;
mod writer;

pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};
