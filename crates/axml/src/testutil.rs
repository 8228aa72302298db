//! Minimal decoder used by tests to check encoded documents.
//!
//! Panics on anything unexpected; every chunk's declared size is checked
//! against the bytes its fields actually occupy.

use axml_common::BinaryReader;

use crate::chunk::{
    AttributeRecord, CdataExt, ChunkInfo, ChunkIter, ChunkType, EndElementExt, NamespaceExt,
    NodeHeader, StartElementExt, ATTRIBUTE_SIZE, END_TAG_SIZE, NAMESPACE_SIZE, START_TAG_SIZE,
    TEXT_SIZE,
};

/// Attribute as `(namespace, name, raw string value, data type)`.
pub(crate) type DecodedAttr = (Option<String>, String, Option<String>, u8);

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    StartNamespace { prefix: String, uri: String, line: i32 },
    EndNamespace { prefix: String, uri: String, line: i32 },
    Start { ns: Option<String>, name: String, line: i32, attrs: Vec<DecodedAttr> },
    Text { value: String, line: i32 },
    End { ns: Option<String>, name: String },
}

#[derive(Debug, Default)]
pub(crate) struct Decoded {
    pub strings: Vec<String>,
    pub resource_ids: Vec<i32>,
    pub events: Vec<Event>,
    pub chunks: Vec<ChunkInfo>,
    /// `(raw value, data type, data)` of every attribute in document order.
    pub attribute_data: Vec<(i32, u8, i32)>,
}

pub(crate) fn decode(bytes: &[u8]) -> Decoded {
    let mut decoded = Decoded::default();
    for chunk in ChunkIter::new(bytes).unwrap() {
        let chunk = chunk.unwrap();
        let mut reader = BinaryReader::new_at(bytes, chunk.offset);
        match chunk.kind().unwrap() {
            ChunkType::StringPool => decoded.strings = read_strings(bytes, chunk),
            ChunkType::ResourceMap => {
                reader.seek(chunk.offset + chunk.header_size as usize);
                let count = (chunk.size - chunk.header_size as u32) / 4;
                decoded.resource_ids = (0..count).map(|_| reader.read_i32().unwrap()).collect();
            }
            kind => {
                let event = read_node(&mut reader, kind, chunk, &mut decoded);
                decoded.events.push(event);
            }
        }
        decoded.chunks.push(chunk);
    }
    decoded
}

fn read_strings(bytes: &[u8], chunk: ChunkInfo) -> Vec<String> {
    let mut reader = BinaryReader::new_at(bytes, chunk.offset + 8);
    let count = reader.read_u32().unwrap() as usize;
    let _styles = reader.read_u32().unwrap();
    let flags = reader.read_u32().unwrap();
    assert_eq!(flags, 0, "only UTF-16 pools are produced");
    let strings_start = reader.read_u32().unwrap() as usize;
    let _styles_start = reader.read_u32().unwrap();
    let offsets: Vec<_> = (0..count).map(|_| reader.read_u32().unwrap() as usize).collect();

    offsets
        .into_iter()
        .map(|offset| {
            reader.seek(chunk.offset + strings_start + offset);
            let mut len = reader.read_u16().unwrap() as usize;
            if len & 0x8000 != 0 {
                len = ((len & 0x7FFF) << 16) | reader.read_u16().unwrap() as usize;
            }
            let s = reader.read_utf16(len).unwrap();
            assert_eq!(reader.read_u16().unwrap(), 0, "missing terminator");
            s
        })
        .collect()
}

fn read_node(
    reader: &mut BinaryReader<'_>,
    kind: ChunkType,
    chunk: ChunkInfo,
    decoded: &mut Decoded,
) -> Event {
    let header: NodeHeader = reader.read_struct().unwrap();
    assert_eq!(header.comment.get(), -1);
    let line = header.line_number.get();
    let strings = &decoded.strings;
    let s = |index: i32| strings[index as usize].clone();
    let opt = |index: i32| (index >= 0).then(|| strings[index as usize].clone());

    let event = match kind {
        ChunkType::StartNamespace | ChunkType::EndNamespace => {
            assert_eq!(chunk.size, NAMESPACE_SIZE);
            let ext: NamespaceExt = reader.read_struct().unwrap();
            let (prefix, uri) = (s(ext.prefix.get()), s(ext.uri.get()));
            if kind == ChunkType::StartNamespace {
                Event::StartNamespace { prefix, uri, line }
            } else {
                Event::EndNamespace { prefix, uri, line }
            }
        }
        ChunkType::StartElement => {
            let ext: StartElementExt = reader.read_struct().unwrap();
            let count = ext.attribute_count.get() as u32;
            assert_eq!(chunk.size, START_TAG_SIZE + ATTRIBUTE_SIZE * count);
            assert_eq!(ext.attribute_start.get(), 20);
            assert_eq!(ext.attribute_size.get(), 20);
            let mut attrs = Vec::new();
            let mut data = Vec::new();
            for _ in 0..count {
                let record: AttributeRecord = reader.read_struct().unwrap();
                let ty = record.typed_value.data_type;
                assert_eq!(record.typed_value.size.get(), 8);
                attrs.push((
                    opt(record.ns.get()),
                    s(record.name.get()),
                    opt(record.raw_value.get()),
                    ty,
                ));
                data.push((record.raw_value.get(), ty, record.typed_value.data.get()));
            }
            decoded.attribute_data.extend(data);
            Event::Start {
                ns: opt(ext.ns.get()),
                name: s(ext.name.get()),
                line,
                attrs,
            }
        }
        ChunkType::Cdata => {
            assert_eq!(chunk.size, TEXT_SIZE);
            let ext: CdataExt = reader.read_struct().unwrap();
            Event::Text {
                value: s(ext.data.get()),
                line,
            }
        }
        ChunkType::EndElement => {
            assert_eq!(chunk.size, END_TAG_SIZE);
            assert_eq!(line, -1);
            let ext: EndElementExt = reader.read_struct().unwrap();
            Event::End {
                ns: opt(ext.ns.get()),
                name: s(ext.name.get()),
            }
        }
        other => panic!("unexpected chunk {other:?}"),
    };
    assert_eq!(reader.position(), chunk.offset + chunk.size as usize);
    event
}
