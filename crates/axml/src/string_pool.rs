//! UTF-16 string pool chunk encoder.

use std::collections::HashMap;
use std::io::Write;

use axml_common::BinaryWriter;

use crate::chunk::{ChunkHeader, ChunkType, STRING_POOL_HEADER_SIZE};
use crate::{Error, Result};

/// Longest string a two-word length prefix can describe.
const MAX_UNITS: usize = 0x7FFF_FFFF;

/// An encoded string pool, ready to be written as a chunk.
///
/// Strings keep the order they were given in; their position is their pool
/// index. Identical strings share one data entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStringPool {
    offsets: Vec<u32>,
    data: Vec<u8>,
}

impl EncodedStringPool {
    /// Encode `strings` in order.
    pub fn encode<'a, I>(strings: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut offsets = Vec::new();
        let mut data = Vec::new();
        let mut seen: HashMap<&'a str, u32> = HashMap::new();

        for s in strings {
            if let Some(&offset) = seen.get(s) {
                offsets.push(offset);
                continue;
            }
            let offset = u32::try_from(data.len()).map_err(|_| Error::DocumentTooLarge {
                what: "string data",
                size: data.len(),
            })?;
            encode_one(s, &mut data)?;
            seen.insert(s, offset);
            offsets.push(offset);
        }

        Ok(Self { offsets, data })
    }

    /// Number of strings in the pool.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Chunk size before padding, header included.
    pub fn unpadded_size(&self) -> usize {
        STRING_POOL_HEADER_SIZE as usize + self.offsets.len() * 4 + self.data.len()
    }

    /// Zero bytes needed after the string data to reach a 4-byte boundary.
    pub fn padding(&self) -> usize {
        (4 - self.unpadded_size() % 4) % 4
    }

    /// Full chunk size as declared in its header.
    pub fn chunk_size(&self) -> usize {
        self.unpadded_size() + self.padding()
    }

    /// Write the complete chunk, padding included.
    pub fn write<W: Write>(&self, out: &mut BinaryWriter<W>) -> Result<()> {
        let size = to_u32(self.chunk_size(), "string pool")?;
        let count = to_u32(self.offsets.len(), "string pool")?;

        out.write_struct(&ChunkHeader::new(ChunkType::StringPool, size))?;
        out.write_u32(count)?;
        out.write_u32(0)?; // style count
        out.write_u32(0)?; // flags: UTF-16, unsorted
        out.write_u32(STRING_POOL_HEADER_SIZE + count * 4)?;
        out.write_u32(0)?; // styles start
        for &offset in &self.offsets {
            out.write_u32(offset)?;
        }
        out.write_bytes(&self.data)?;
        out.write_zeros(self.padding())?;
        Ok(())
    }
}

fn encode_one(s: &str, data: &mut Vec<u8>) -> Result<()> {
    let units: Vec<u16> = s.encode_utf16().collect();
    let len = units.len();
    if len > MAX_UNITS {
        return Err(Error::StringTooLong { units: len });
    }
    if len > 0x7FFF {
        let high = 0x8000 | (len >> 16) as u16;
        data.extend_from_slice(&high.to_le_bytes());
    }
    data.extend_from_slice(&(len as u16).to_le_bytes());
    for unit in units {
        data.extend_from_slice(&unit.to_le_bytes());
    }
    data.extend_from_slice(&[0, 0]);
    Ok(())
}

pub(crate) fn to_u32(size: usize, what: &'static str) -> Result<u32> {
    u32::try_from(size).map_err(|_| Error::DocumentTooLarge { what, size })
}
