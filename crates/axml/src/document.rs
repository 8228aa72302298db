//! The top-level document: tree building, preparation and encoding.

use std::io::Write;

use axml_common::BinaryWriter;
use tracing::debug;
use zerocopy::byteorder::little_endian::I32;

use crate::chunk::{
    ChunkHeader, ChunkType, NamespaceExt, NodeHeader, DOCUMENT_HEADER_SIZE, NAMESPACE_SIZE,
    RESOURCE_MAP_HEADER_SIZE,
};
use crate::namespace::{NamespaceTable, ResolvedNamespace};
use crate::node::PreparedNode;
use crate::pool::{FrozenPool, ValuePool};
use crate::string_pool::to_u32;
use crate::visitor::{DocumentVisitor, NodeVisitor};
use crate::{Error, Node, Result};

/// An AXML document under construction.
///
/// Encoding is two passes. [`prepare`](Self::prepare) interns every string,
/// resolves namespace prefixes and computes the size of every chunk;
/// [`write`](Self::write) then streams the bytes. Any mutable access to the
/// tree after `prepare` invalidates the preparation, and `write` refuses to
/// run on a stale one.
///
/// # Example
///
/// ```
/// use axml::{AttrType, Document};
///
/// const ANDROID: &str = "http://schemas.android.com/apk/res/android";
///
/// let mut doc = Document::new();
/// doc.declare_namespace(Some("android"), ANDROID, 1)?;
/// let manifest = doc.new_root(None, "manifest")?;
/// manifest.add_attribute(None, "package", -1, AttrType::String, "com.example".into())?;
/// manifest
///     .add_child(None, "uses-permission")?
///     .add_attribute(Some(ANDROID), "name", 0x0101_0003, AttrType::String, "android.permission.INTERNET".into())?;
///
/// let bytes = doc.encode()?;
/// assert_eq!(&bytes[..4], &[0x03, 0x00, 0x08, 0x00]);
/// # Ok::<(), axml::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Document {
    roots: Vec<Node>,
    namespaces: NamespaceTable,
    revision: u64,
    prepared: Option<Prepared>,
}

/// Result of [`Document::prepare`]: the frozen pool and every computed size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prepared {
    revision: u64,
    pool: FrozenPool,
    namespaces: Vec<ResolvedNamespace>,
    roots: Vec<PreparedNode>,
    size: u32,
}

impl Prepared {
    pub fn pool(&self) -> &FrozenPool {
        &self.pool
    }

    /// Total document size, header included.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Encoded size of each root subtree.
    pub fn root_sizes(&self) -> impl Iterator<Item = u32> + '_ {
        self.roots.iter().map(|r| r.size)
    }

    /// Namespaces in the order their start records are written.
    pub fn namespaces(&self) -> &[ResolvedNamespace] {
        &self.namespaces
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    /// Declare a namespace. A later declaration of the same URI replaces the
    /// earlier one in place.
    pub fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str, line: i32) -> Result<()> {
        if uri.is_empty() {
            return Err(Error::InvalidArgument("namespace URI must not be empty"));
        }
        self.touch();
        self.namespaces.declare(prefix, uri, line);
        Ok(())
    }

    /// Append a root node and return it.
    pub fn new_root(&mut self, namespace: Option<&str>, name: &str) -> Result<&mut Node> {
        let node = Node::new(namespace, name)?;
        self.touch();
        self.roots.push(node);
        let last = self.roots.len() - 1;
        Ok(&mut self.roots[last])
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// Mutable access to a root. Invalidates any earlier preparation.
    pub fn root_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.touch();
        self.roots.get_mut(index)
    }

    /// Namespaces as declared; URIs only referenced by nodes are not listed.
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// The current preparation, if it still matches the tree.
    pub fn prepared(&self) -> Option<&Prepared> {
        self.prepared
            .as_ref()
            .filter(|prepared| prepared.revision == self.revision)
    }

    /// Intern all strings, resolve namespaces and compute every size.
    pub fn prepare(&mut self) -> Result<&Prepared> {
        let mut pool = ValuePool::with_namespaces(self.namespaces.clone());
        let roots = self
            .roots
            .iter()
            .map(|root| root.prepare(&mut pool))
            .collect::<Result<Vec<_>>>()?;
        let namespaces = pool.resolve_namespaces();
        let pool = pool.freeze()?;

        let size = DOCUMENT_HEADER_SIZE as usize
            + pool.encoded().chunk_size()
            + RESOURCE_MAP_HEADER_SIZE as usize
            + 4 * pool.resource_ids().len()
            + 2 * NAMESPACE_SIZE as usize * namespaces.len()
            + roots.iter().map(|r| r.size as usize).sum::<usize>();
        let size = to_u32(size, "document")?;

        debug!(
            roots = roots.len(),
            namespaces = namespaces.len(),
            strings = pool.strings().len(),
            size,
            "prepared document"
        );

        Ok(self.prepared.insert(Prepared {
            revision: self.revision,
            pool,
            namespaces,
            roots,
            size,
        }))
    }

    /// Stream the prepared document.
    ///
    /// On error the sink may hold a partial document, which must be discarded.
    pub fn write<W: Write>(&self, out: &mut BinaryWriter<W>) -> Result<()> {
        let prepared = self.prepared.as_ref().ok_or(Error::NotPrepared)?;
        if prepared.revision != self.revision {
            return Err(Error::StalePreparation {
                prepared: prepared.revision,
                current: self.revision,
            });
        }
        let pool = &prepared.pool;
        let start = out.position();

        out.write_struct(&ChunkHeader::new(ChunkType::Xml, prepared.size))?;
        pool.encoded().write(out)?;

        let ids = pool.resource_ids();
        let ids_size = to_u32(RESOURCE_MAP_HEADER_SIZE as usize + 4 * ids.len(), "resource map")?;
        out.write_struct(&ChunkHeader::new(ChunkType::ResourceMap, ids_size))?;
        for &id in ids {
            out.write_i32(id)?;
        }

        let mut stack = Vec::with_capacity(prepared.namespaces.len());
        for ns in &prepared.namespaces {
            out.write_struct(&NodeHeader::new(ChunkType::StartNamespace, NAMESPACE_SIZE, -1))?;
            out.write_struct(&namespace_ext(pool, ns))?;
            stack.push(ns);
        }

        for root in &prepared.roots {
            root.write(pool, out)?;
        }

        while let Some(ns) = stack.pop() {
            out.write_struct(&NodeHeader::new(ChunkType::EndNamespace, NAMESPACE_SIZE, ns.line))?;
            out.write_struct(&namespace_ext(pool, ns))?;
        }

        let written = out.position() - start;
        if written != prepared.size as u64 {
            return Err(Error::SizeMismatch {
                expected: prepared.size as u64,
                actual: written,
            });
        }
        debug!(bytes = written, "wrote document");
        Ok(())
    }

    /// Prepare and write into a fresh buffer.
    pub fn encode(&mut self) -> Result<Vec<u8>> {
        let size = self.prepare()?.size() as usize;
        let mut out = BinaryWriter::new(Vec::with_capacity(size));
        self.write(&mut out)?;
        Ok(out.into_inner())
    }
}

fn namespace_ext(pool: &FrozenPool, ns: &ResolvedNamespace) -> NamespaceExt {
    NamespaceExt {
        prefix: I32::new(pool.raw_index(ns.prefix)),
        uri: I32::new(pool.raw_index(ns.uri)),
    }
}

impl DocumentVisitor for Document {
    fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str, line: i32) -> Result<()> {
        Document::declare_namespace(self, prefix, uri, line)
    }

    fn new_root(&mut self, namespace: Option<&str>, name: &str) -> Result<Option<&mut dyn NodeVisitor>> {
        let root = Document::new_root(self, namespace, name)?;
        Ok(Some(root as &mut dyn NodeVisitor))
    }

    fn finish(&mut self) {}
}
