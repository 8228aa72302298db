//! Tree nodes and their prepared, size-annotated form.

use std::io::Write;
use std::mem::size_of;

use axml_common::BinaryWriter;
use indexmap::IndexMap;
use zerocopy::byteorder::little_endian::{I32, U16};

use crate::attribute::{is_resource_id, AttrKey};
use crate::chunk::{
    AttributeRecord, CdataExt, ChunkType, EndElementExt, NodeHeader, StartElementExt, TypedValue,
    ATTRIBUTE_SIZE, END_TAG_SIZE, NO_INDEX, START_TAG_SIZE, TEXT_SIZE,
};
use crate::pool::{FrozenPool, ValuePool, ValueString};
use crate::string_pool::to_u32;
use crate::visitor::NodeVisitor;
use crate::{AttrType, AttrValue, Attribute, Error, Result};

/// An element of the document tree.
///
/// Nodes are created through [`Document::new_root`](crate::Document::new_root)
/// and [`Node::add_child`]; a node owns its children exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    namespace: Option<String>,
    name: String,
    line: i32,
    attributes: IndexMap<AttrKey, Attribute>,
    children: Vec<Node>,
    text: Option<Text>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Text {
    value: String,
    line: i32,
}

impl Node {
    pub(crate) fn new(namespace: Option<&str>, name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("node name must not be empty"));
        }
        if namespace == Some("") {
            return Err(Error::InvalidArgument("namespace URI must not be empty"));
        }
        Ok(Self {
            namespace: namespace.map(str::to_owned),
            name: name.to_owned(),
            line: 0,
            attributes: IndexMap::new(),
            children: Vec::new(),
            text: None,
        })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn line(&self) -> i32 {
        self.line
    }

    /// Attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Attributes in the order they are written.
    pub fn sorted_attributes(&self) -> Vec<&Attribute> {
        let mut attrs: Vec<_> = self.attributes.values().collect();
        attrs.sort_by(|a, b| a.write_order(b));
        attrs
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child_mut(&mut self, index: usize) -> Option<&mut Node> {
        self.children.get_mut(index)
    }

    /// Text value and its line.
    pub fn text(&self) -> Option<(&str, i32)> {
        self.text.as_ref().map(|t| (t.value.as_str(), t.line))
    }

    pub fn set_line(&mut self, line: i32) {
        self.line = line;
    }

    /// Add an attribute unless one with the same key is already present.
    ///
    /// Returns `false` when the attribute was a duplicate and nothing changed.
    pub fn add_attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        resource_id: i32,
        ty: AttrType,
        value: AttrValue,
    ) -> Result<bool> {
        let attr = Attribute::new(namespace, name, resource_id, ty, value)?;
        let key = attr.key();
        if self.attributes.contains_key(&key) {
            return Ok(false);
        }
        self.attributes.insert(key, attr);
        Ok(true)
    }

    /// Append a new child and return it.
    pub fn add_child(&mut self, namespace: Option<&str>, name: &str) -> Result<&mut Node> {
        let child = Node::new(namespace, name)?;
        self.children.push(child);
        let last = self.children.len() - 1;
        Ok(&mut self.children[last])
    }

    /// Set the text content, replacing any earlier text.
    pub fn set_text(&mut self, line: i32, value: &str) {
        self.text = Some(Text {
            value: value.to_owned(),
            line,
        });
    }

    pub fn finish(&mut self) {}

    /// Intern every string of this subtree and compute its encoded size.
    pub(crate) fn prepare(&self, pool: &mut ValuePool) -> Result<PreparedNode> {
        let namespace = self.namespace.as_deref().map(|ns| pool.intern_namespace(ns));
        let name = pool.intern_general(&self.name);

        let sorted = self.sorted_attributes();
        if sorted.len() > u16::MAX as usize {
            return Err(Error::DocumentTooLarge {
                what: "attribute count",
                size: sorted.len(),
            });
        }
        let attributes = sorted
            .into_iter()
            .map(|attr| PreparedAttribute::new(attr, pool))
            .collect::<Vec<_>>();

        let text = self
            .text
            .as_ref()
            .map(|t| (pool.intern_general(&t.value), t.line));

        let mut size = (START_TAG_SIZE + END_TAG_SIZE) as usize
            + ATTRIBUTE_SIZE as usize * attributes.len();
        if text.is_some() {
            size += TEXT_SIZE as usize;
        }
        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            let prepared = child.prepare(pool)?;
            size += prepared.size as usize;
            children.push(prepared);
        }

        Ok(PreparedNode {
            namespace,
            name,
            line: self.line,
            attributes,
            text,
            children,
            size: to_u32(size, "node")?,
        })
    }
}

impl NodeVisitor for Node {
    fn set_line(&mut self, line: i32) {
        Node::set_line(self, line);
    }

    fn add_attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        resource_id: i32,
        ty: AttrType,
        value: AttrValue,
    ) -> Result<()> {
        Node::add_attribute(self, namespace, name, resource_id, ty, value).map(|_| ())
    }

    fn add_child(
        &mut self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<&mut dyn NodeVisitor>> {
        let child = Node::add_child(self, namespace, name)?;
        Ok(Some(child as &mut dyn NodeVisitor))
    }

    fn set_text(&mut self, line: i32, value: &str) {
        Node::set_text(self, line, value);
    }

    fn finish(&mut self) {
        Node::finish(self);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PreparedValue {
    String(ValueString),
    Int(i32),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PreparedAttribute {
    namespace: Option<ValueString>,
    name: ValueString,
    ty: AttrType,
    value: PreparedValue,
}

impl PreparedAttribute {
    fn new(attr: &Attribute, pool: &mut ValuePool) -> Self {
        let namespace = attr.namespace().map(|ns| pool.intern_namespace(ns));
        let name = if is_resource_id(attr.resource_id()) {
            pool.intern_resource_linked(attr.name(), attr.resource_id())
        } else {
            pool.intern_general(attr.name())
        };
        let value = match attr.value() {
            AttrValue::String(s) => PreparedValue::String(pool.intern_general(s)),
            AttrValue::Int(v) => PreparedValue::Int(*v),
            AttrValue::Bool(v) => PreparedValue::Bool(*v),
        };
        Self {
            namespace,
            name,
            ty: attr.ty(),
            value,
        }
    }

    fn record(&self, pool: &FrozenPool) -> AttributeRecord {
        let (raw_value, data) = match self.value {
            PreparedValue::String(s) => (pool.raw_index(s), pool.raw_index(s)),
            PreparedValue::Bool(v) => (NO_INDEX, if v { -1 } else { 0 }),
            PreparedValue::Int(v) => (NO_INDEX, v),
        };
        AttributeRecord {
            ns: I32::new(index_or_none(pool, self.namespace)),
            name: I32::new(pool.raw_index(self.name)),
            raw_value: I32::new(raw_value),
            typed_value: TypedValue::new(self.ty as u8, data),
        }
    }
}

/// A node with every string interned and its encoded size known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PreparedNode {
    namespace: Option<ValueString>,
    name: ValueString,
    line: i32,
    attributes: Vec<PreparedAttribute>,
    text: Option<(ValueString, i32)>,
    children: Vec<PreparedNode>,
    /// Bytes of this subtree, start tag through end tag.
    pub(crate) size: u32,
}

impl PreparedNode {
    pub(crate) fn write<W: Write>(&self, pool: &FrozenPool, out: &mut BinaryWriter<W>) -> Result<()> {
        let ns = index_or_none(pool, self.namespace);
        let name = pool.raw_index(self.name);
        let count = self.attributes.len() as u16;

        let start_size = START_TAG_SIZE + ATTRIBUTE_SIZE * count as u32;
        out.write_struct(&NodeHeader::new(ChunkType::StartElement, start_size, self.line))?;
        out.write_struct(&StartElementExt {
            ns: I32::new(ns),
            name: I32::new(name),
            attribute_start: U16::new(size_of::<StartElementExt>() as u16),
            attribute_size: U16::new(ATTRIBUTE_SIZE as u16),
            attribute_count: U16::new(count),
            id_index: U16::new(0),
            class_index: U16::new(0),
            style_index: U16::new(0),
        })?;
        for attr in &self.attributes {
            out.write_struct(&attr.record(pool))?;
        }

        if let Some((value, line)) = self.text {
            out.write_struct(&NodeHeader::new(ChunkType::Cdata, TEXT_SIZE, line))?;
            out.write_struct(&CdataExt {
                data: I32::new(pool.raw_index(value)),
                typed_value: TypedValue::new(0, 0),
            })?;
        }

        for child in &self.children {
            child.write(pool, out)?;
        }

        out.write_struct(&NodeHeader::new(ChunkType::EndElement, END_TAG_SIZE, -1))?;
        out.write_struct(&EndElementExt {
            ns: I32::new(ns),
            name: I32::new(name),
        })?;
        Ok(())
    }
}

fn index_or_none(pool: &FrozenPool, value: Option<ValueString>) -> i32 {
    value.map_or(NO_INDEX, |v| pool.raw_index(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Node {
        Node::new(None, "uses-permission").unwrap()
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(matches!(Node::new(None, ""), Err(Error::InvalidArgument(_))));
        assert!(Node::new(Some(""), "a").is_err());

        let mut n = node();
        assert!(n.add_child(None, "").is_err());
        let result = n.add_attribute(None, "", -1, AttrType::String, "x".into());
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert_eq!(n.attributes().count(), 0);
    }

    #[test]
    fn test_first_attribute_wins_by_resource_id() {
        let mut n = node();
        let ns = Some("urn:res");
        assert!(n.add_attribute(ns, "name", 0x0101_0003, AttrType::String, "first".into()).unwrap());
        assert!(!n.add_attribute(ns, "label", 0x0101_0003, AttrType::String, "second".into()).unwrap());

        let attrs: Vec<_> = n.attributes().collect();
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].name(), "name");
        assert_eq!(attrs[0].value(), &AttrValue::String("first".into()));
    }

    #[test]
    fn test_first_attribute_wins_by_name() {
        let mut n = node();
        n.add_attribute(None, "debug", -1, AttrType::IntBoolean, true.into()).unwrap();
        n.add_attribute(None, "debug", 0, AttrType::IntBoolean, false.into()).unwrap();
        n.add_attribute(Some("urn:x"), "debug", -1, AttrType::IntBoolean, false.into()).unwrap();

        assert_eq!(n.attributes().count(), 2);
        assert_eq!(n.attributes().next().unwrap().value(), &AttrValue::Bool(true));
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut n = node();
        n.add_child(None, "b").unwrap();
        n.add_child(None, "a").unwrap().set_line(4);
        let names: Vec<_> = n.children().iter().map(Node::name).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(n.children()[1].line(), 4);
    }

    #[test]
    fn test_prepared_size() {
        let mut root = Node::new(None, "manifest").unwrap();
        root.set_text(1, "hello");
        let child = root.add_child(None, "uses-permission").unwrap();
        child
            .add_attribute(Some("urn:res"), "name", 0x0101_000d, AttrType::String, "INTERNET".into())
            .unwrap();

        let mut pool = ValuePool::new();
        let prepared = root.prepare(&mut pool).unwrap();
        assert_eq!(prepared.children[0].size, 36 + 20 + 24);
        assert_eq!(prepared.size, 36 + 28 + 24 + 80);
    }
}
