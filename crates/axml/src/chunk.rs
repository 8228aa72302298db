//! AXML chunk framing.
//!
//! Every unit of an AXML file is a chunk: a `u16` type tag, a `u16` header
//! size and a `u32` total size, followed by the chunk body. The fixed-layout
//! records below are written verbatim with zerocopy, so their sizes are the
//! wire-layout constants the prepare pass uses.

use std::mem::size_of;

use axml_common::BinaryReader;
use zerocopy::byteorder::little_endian::{I32, U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{Error, Result};

/// Chunk type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ChunkType {
    StringPool = 0x0001,
    Xml = 0x0003,
    StartNamespace = 0x0100,
    EndNamespace = 0x0101,
    StartElement = 0x0102,
    EndElement = 0x0103,
    Cdata = 0x0104,
    ResourceMap = 0x0180,
}

impl ChunkType {
    /// Map a raw type tag to a known chunk type.
    pub fn from_raw(raw: u16) -> Option<Self> {
        Some(match raw {
            0x0001 => Self::StringPool,
            0x0003 => Self::Xml,
            0x0100 => Self::StartNamespace,
            0x0101 => Self::EndNamespace,
            0x0102 => Self::StartElement,
            0x0103 => Self::EndElement,
            0x0104 => Self::Cdata,
            0x0180 => Self::ResourceMap,
            _ => return None,
        })
    }

    /// Size of this chunk type's header, as recorded in the chunk itself.
    pub const fn header_size(self) -> u16 {
        match self {
            Self::StringPool => STRING_POOL_HEADER_SIZE as u16,
            Self::Xml | Self::ResourceMap => size_of::<ChunkHeader>() as u16,
            _ => size_of::<NodeHeader>() as u16,
        }
    }
}

/// Common header at the start of every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ChunkHeader {
    pub chunk_type: U16,
    pub header_size: U16,
    pub size: U32,
}

impl ChunkHeader {
    pub fn new(chunk_type: ChunkType, size: u32) -> Self {
        Self {
            chunk_type: U16::new(chunk_type as u16),
            header_size: U16::new(chunk_type.header_size()),
            size: U32::new(size),
        }
    }
}

/// Header shared by namespace, element and text chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct NodeHeader {
    pub header: ChunkHeader,
    /// Source line, or `-1`.
    pub line_number: I32,
    /// Comment string index, always `-1`.
    pub comment: I32,
}

impl NodeHeader {
    pub fn new(chunk_type: ChunkType, size: u32, line_number: i32) -> Self {
        Self {
            header: ChunkHeader::new(chunk_type, size),
            line_number: I32::new(line_number),
            comment: I32::new(NO_INDEX),
        }
    }
}

/// Body of a namespace start or end chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct NamespaceExt {
    pub prefix: I32,
    pub uri: I32,
}

/// Body of a start-element chunk, before the attribute records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct StartElementExt {
    pub ns: I32,
    pub name: I32,
    /// Offset of the first attribute from the start of this struct.
    pub attribute_start: U16,
    pub attribute_size: U16,
    pub attribute_count: U16,
    pub id_index: U16,
    pub class_index: U16,
    pub style_index: U16,
}

/// Body of an end-element chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct EndElementExt {
    pub ns: I32,
    pub name: I32,
}

/// A typed resource value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct TypedValue {
    pub size: U16,
    pub res0: u8,
    pub data_type: u8,
    pub data: I32,
}

impl TypedValue {
    pub fn new(data_type: u8, data: i32) -> Self {
        Self {
            size: U16::new(size_of::<Self>() as u16),
            res0: 0,
            data_type,
            data: I32::new(data),
        }
    }
}

/// One attribute of a start-element chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct AttributeRecord {
    pub ns: I32,
    pub name: I32,
    /// String index of the raw value, or `-1`.
    pub raw_value: I32,
    pub typed_value: TypedValue,
}

/// Body of a text chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct CdataExt {
    pub data: I32,
    pub typed_value: TypedValue,
}

/// Index value meaning "no string".
pub const NO_INDEX: i32 = -1;

pub const DOCUMENT_HEADER_SIZE: u32 = size_of::<ChunkHeader>() as u32;
pub const RESOURCE_MAP_HEADER_SIZE: u32 = size_of::<ChunkHeader>() as u32;
/// Chunk header plus count, style count, flags, strings start, styles start.
pub const STRING_POOL_HEADER_SIZE: u32 = size_of::<ChunkHeader>() as u32 + 5 * 4;
pub const ATTRIBUTE_SIZE: u32 = size_of::<AttributeRecord>() as u32;
pub const START_TAG_SIZE: u32 = (size_of::<NodeHeader>() + size_of::<StartElementExt>()) as u32;
pub const END_TAG_SIZE: u32 = (size_of::<NodeHeader>() + size_of::<EndElementExt>()) as u32;
pub const TEXT_SIZE: u32 = (size_of::<NodeHeader>() + size_of::<CdataExt>()) as u32;
pub const NAMESPACE_SIZE: u32 = (size_of::<NodeHeader>() + size_of::<NamespaceExt>()) as u32;

/// Position and framing of one chunk inside a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub offset: usize,
    pub raw_type: u16,
    pub header_size: u16,
    pub size: u32,
}

impl ChunkInfo {
    pub fn kind(&self) -> Option<ChunkType> {
        ChunkType::from_raw(self.raw_type)
    }
}

/// Iterates the chunks nested directly inside an AXML document chunk.
///
/// Only framing is checked: every chunk must have a header of at least
/// eight bytes and must end inside the document.
#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    reader: BinaryReader<'a>,
    end: usize,
    failed: bool,
}

impl<'a> ChunkIter<'a> {
    /// Read the document header and position the iterator at the first chunk.
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let header: ChunkHeader = reader.read_struct()?;
        if header.chunk_type.get() != ChunkType::Xml as u16 {
            return Err(Error::MalformedChunk {
                offset: 0,
                reason: "not an XML document chunk",
            });
        }
        let end = header.size.get() as usize;
        if end > data.len() || end < DOCUMENT_HEADER_SIZE as usize {
            return Err(Error::MalformedChunk {
                offset: 0,
                reason: "document size does not match buffer",
            });
        }
        reader.seek(header.header_size.get() as usize);
        Ok(Self {
            reader,
            end,
            failed: false,
        })
    }

    /// Total size declared by the document header.
    pub fn document_size(&self) -> usize {
        self.end
    }

    fn next_chunk(&mut self) -> Result<ChunkInfo> {
        let offset = self.reader.position();
        let header: ChunkHeader = self.reader.read_struct()?;
        let info = ChunkInfo {
            offset,
            raw_type: header.chunk_type.get(),
            header_size: header.header_size.get(),
            size: header.size.get(),
        };
        let malformed = |reason| Error::MalformedChunk { offset, reason };
        if (info.header_size as u32) < DOCUMENT_HEADER_SIZE {
            return Err(malformed("header smaller than chunk header"));
        }
        if info.size < info.header_size as u32 {
            return Err(malformed("size smaller than header"));
        }
        if offset + info.size as usize > self.end {
            return Err(malformed("chunk runs past end of document"));
        }
        self.reader.seek(offset + info.size as usize);
        Ok(info)
    }
}

impl Iterator for ChunkIter<'_> {
    type Item = Result<ChunkInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.reader.position() >= self.end {
            return None;
        }
        let item = self.next_chunk();
        self.failed = item.is_err();
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(START_TAG_SIZE, 36);
        assert_eq!(ATTRIBUTE_SIZE, 20);
        assert_eq!(END_TAG_SIZE, 24);
        assert_eq!(TEXT_SIZE, 28);
        assert_eq!(NAMESPACE_SIZE, 24);
        assert_eq!(STRING_POOL_HEADER_SIZE, 28);
    }

    #[test]
    fn test_header_matches_packed_type_word() {
        let header = ChunkHeader::new(ChunkType::StartElement, 56);
        assert_eq!(header.as_bytes(), &[0x02, 0x01, 0x10, 0x00, 56, 0, 0, 0]);

        let header = ChunkHeader::new(ChunkType::StringPool, 0);
        assert_eq!(&header.as_bytes()[..4], &0x001C0001u32.to_le_bytes());

        let header = ChunkHeader::new(ChunkType::ResourceMap, 0);
        assert_eq!(&header.as_bytes()[..4], &0x00080180u32.to_le_bytes());
    }

    #[test]
    fn test_typed_value_word() {
        let value = TypedValue::new(0x03, 7);
        assert_eq!(&value.as_bytes()[..4], &((0x03u32 << 24) | 0x8).to_le_bytes());
    }

    #[test]
    fn test_iter_rejects_overrun() {
        let mut data = Vec::new();
        data.extend_from_slice(ChunkHeader::new(ChunkType::Xml, 16).as_bytes());
        data.extend_from_slice(ChunkHeader::new(ChunkType::ResourceMap, 12).as_bytes());

        let chunks: Vec<_> = ChunkIter::new(&data).unwrap().collect();
        assert_eq!(chunks.len(), 1);
        assert!(matches!(chunks[0], Err(Error::MalformedChunk { offset: 8, .. })));
    }

    #[test]
    fn test_iter_rejects_non_document() {
        let data = ChunkHeader::new(ChunkType::StringPool, 8);
        assert!(ChunkIter::new(data.as_bytes()).is_err());
    }
}
