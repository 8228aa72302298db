//! Compile XML text into an AXML document.
//!
//! The text is parsed with quick-xml into a small element tree, then replayed
//! through the [`DocumentVisitor`] contract, so any visitor chain can sit
//! between the parser and the [`Document`].

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::attribute::NO_RESOURCE_ID;
use crate::visitor::{DocumentVisitor, NodeVisitor};
use crate::{AttrType, AttrValue, Document, Error, Result, ANDROID_NS};

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Framework resource ids by local name, applied to attributes in the
/// Android namespace only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIds {
    ids: HashMap<String, i32>,
}

impl ResourceIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the framework attributes most manifests use.
    pub fn android() -> Self {
        let mut ids = Self::new();
        for (name, id) in [
            ("theme", 0x0101_0000),
            ("label", 0x0101_0001),
            ("icon", 0x0101_0002),
            ("name", 0x0101_0003),
            ("permission", 0x0101_0006),
            ("debuggable", 0x0101_000f),
            ("exported", 0x0101_0010),
            ("value", 0x0101_0024),
            ("minSdkVersion", 0x0101_020c),
            ("versionCode", 0x0101_021b),
            ("versionName", 0x0101_021c),
            ("targetSdkVersion", 0x0101_0270),
            ("allowBackup", 0x0101_0280),
        ] {
            ids.insert(name, id);
        }
        ids
    }

    /// Parse `name = id` lines. Ids are decimal or `0x` hex; `#` starts a comment.
    pub fn parse(text: &str) -> Result<Self> {
        let mut ids = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let invalid = |reason: &str| Error::InvalidResourceMap {
                line: index + 1,
                reason: reason.to_owned(),
            };
            let (name, id) = line
                .split_once('=')
                .ok_or_else(|| invalid("expected `name = id`"))?;
            let (name, id) = (name.trim(), id.trim());
            if name.is_empty() {
                return Err(invalid("empty attribute name"));
            }
            let id = parse_int(id).ok_or_else(|| invalid("id is not an integer"))?;
            ids.insert(name, id);
        }
        Ok(ids)
    }

    pub fn insert(&mut self, name: &str, id: i32) {
        self.ids.insert(name.to_owned(), id);
    }

    /// Merge `other` into `self`; entries of `other` win.
    pub fn extend(&mut self, other: ResourceIds) {
        self.ids.extend(other.ids);
    }

    pub fn get(&self, name: &str) -> Option<i32> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

fn parse_int(s: &str) -> Option<i32> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok().map(|v| v as i32),
        None => s.parse().ok(),
    }
}

impl Document {
    /// Parse XML text into a new document.
    ///
    /// # Example
    ///
    /// ```
    /// use axml::from_xml::ResourceIds;
    /// use axml::Document;
    ///
    /// let xml = r#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    ///     package="com.example">
    ///     <uses-permission android:name="android.permission.INTERNET"/>
    /// </manifest>"#;
    ///
    /// let mut doc = Document::from_xml(xml, &ResourceIds::android())?;
    /// let bytes = doc.encode()?;
    /// assert_eq!(bytes.len() as u32, doc.prepared().unwrap().size());
    /// assert_eq!(doc.prepared().unwrap().pool().resource_ids(), [0x0101_0003]);
    /// # Ok::<(), axml::Error>(())
    /// ```
    pub fn from_xml(xml: &str, resource_ids: &ResourceIds) -> Result<Self> {
        let mut doc = Document::new();
        compile_xml(xml, &mut doc, resource_ids)?;
        Ok(doc)
    }

    /// Parse XML bytes into a new document.
    pub fn from_xml_bytes(xml: &[u8], resource_ids: &ResourceIds) -> Result<Self> {
        let xml = std::str::from_utf8(xml)?;
        Self::from_xml(xml, resource_ids)
    }
}

/// Parse `xml` and replay it through `visitor`.
///
/// Namespace declarations are reported before any element, in document
/// order. Text segments split by child elements are concatenated into one
/// node text carrying the line of the first segment. Namespaces are global in AXML, so a prefix bound twice resolves to
/// its last binding everywhere.
pub fn compile_xml(
    xml: &str,
    visitor: &mut dyn DocumentVisitor,
    resource_ids: &ResourceIds,
) -> Result<()> {
    let parsed = parse_xml(xml)?;
    let scope = Scope::new(&parsed.declarations);

    for decl in &parsed.declarations {
        visitor.declare_namespace(decl.prefix.as_deref(), &decl.uri, decl.line)?;
    }
    for root in &parsed.roots {
        let (ns, name) = scope.element_name(&root.name)?;
        if let Some(node) = visitor.new_root(ns, name)? {
            emit(root, node, &scope, resource_ids)?;
        }
    }
    visitor.finish();
    Ok(())
}

fn emit(
    element: &Element,
    node: &mut dyn NodeVisitor,
    scope: &Scope,
    resource_ids: &ResourceIds,
) -> Result<()> {
    node.set_line(element.line);
    for (qname, raw) in &element.attributes {
        let (ns, name) = scope.attribute_name(qname)?;
        let resource_id = match ns {
            Some(ANDROID_NS) => resource_ids.get(name).unwrap_or(NO_RESOURCE_ID),
            _ => NO_RESOURCE_ID,
        };
        let (ty, value) = infer_value(raw);
        node.add_attribute(ns, name, resource_id, ty, value)?;
    }
    if let Some((text, line)) = &element.text {
        node.set_text(*line, text);
    }
    for child in &element.children {
        let (ns, name) = scope.element_name(&child.name)?;
        if let Some(child_node) = node.add_child(ns, name)? {
            emit(child, child_node, scope, resource_ids)?;
        }
    }
    node.finish();
    Ok(())
}

/// Pick the narrowest typed value for an attribute's text.
fn infer_value(raw: &str) -> (AttrType, AttrValue) {
    match raw {
        "true" => return (AttrType::IntBoolean, AttrValue::Bool(true)),
        "false" => return (AttrType::IntBoolean, AttrValue::Bool(false)),
        _ => {}
    }
    if let Some(id) = raw.strip_prefix('@').filter(|s| s.starts_with("0x")).and_then(parse_int) {
        return (AttrType::Reference, AttrValue::Int(id));
    }
    if raw.starts_with("0x") {
        if let Some(v) = parse_int(raw) {
            return (AttrType::IntHex, AttrValue::Int(v));
        }
    }
    // Only canonical decimals, so "007" or "+1" stay text.
    if let Ok(v) = raw.parse::<i32>() {
        if v.to_string() == raw {
            return (AttrType::FirstInt, AttrValue::Int(v));
        }
    }
    (AttrType::String, AttrValue::String(raw.to_owned()))
}

#[derive(Debug)]
struct Declaration {
    prefix: Option<String>,
    uri: String,
    line: i32,
}

#[derive(Debug)]
struct Element {
    name: String,
    line: i32,
    attributes: Vec<(String, String)>,
    text: Option<(String, i32)>,
    children: Vec<Element>,
}

#[derive(Debug, Default)]
struct Parsed {
    declarations: Vec<Declaration>,
    roots: Vec<Element>,
}

struct Scope<'a> {
    prefixes: HashMap<&'a str, &'a str>,
    default: Option<&'a str>,
}

impl<'a> Scope<'a> {
    fn new(declarations: &'a [Declaration]) -> Self {
        let mut prefixes = HashMap::from([("xml", XML_NS)]);
        let mut default = None;
        for decl in declarations {
            match &decl.prefix {
                Some(prefix) => {
                    prefixes.insert(prefix.as_str(), decl.uri.as_str());
                }
                None => default = Some(decl.uri.as_str()),
            }
        }
        Self { prefixes, default }
    }

    fn lookup(&self, prefix: &str) -> Result<&'a str> {
        self.prefixes
            .get(prefix)
            .copied()
            .ok_or_else(|| Error::UnknownPrefix(prefix.to_owned()))
    }

    /// Unprefixed element names take the default namespace.
    fn element_name<'n>(&self, qname: &'n str) -> Result<(Option<&'a str>, &'n str)> {
        match qname.split_once(':') {
            Some((prefix, local)) => Ok((Some(self.lookup(prefix)?), local)),
            None => Ok((self.default, qname)),
        }
    }

    /// Unprefixed attribute names have no namespace.
    fn attribute_name<'n>(&self, qname: &'n str) -> Result<(Option<&'a str>, &'n str)> {
        match qname.split_once(':') {
            Some((prefix, local)) => Ok((Some(self.lookup(prefix)?), local)),
            None => Ok((None, qname)),
        }
    }
}

/// Tracks the 1-based line of monotonically increasing byte offsets.
struct LineCounter<'a> {
    text: &'a [u8],
    consumed: usize,
    line: i32,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text: text.as_bytes(),
            consumed: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> i32 {
        let offset = offset.min(self.text.len());
        if offset > self.consumed {
            self.line += memchr::memchr_iter(b'\n', &self.text[self.consumed..offset]).count() as i32;
            self.consumed = offset;
        }
        self.line
    }
}

fn xml_err(e: impl std::fmt::Display) -> Error {
    Error::Xml(e.to_string())
}

fn parse_xml(xml: &str) -> Result<Parsed> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines = LineCounter::new(xml);
    let mut parsed = Parsed::default();
    let mut stack: Vec<Element> = Vec::new();

    loop {
        let before = reader.buffer_position() as usize;
        let event = reader.read_event().map_err(xml_err)?;
        // Skip whitespace the reader consumed ahead of the event.
        let skipped = xml[before..].len() - xml[before..].trim_start().len();
        let line = lines.line_at(before + skipped);

        match event {
            Event::Start(e) => {
                let element = start_element(&e, line, &mut parsed.declarations)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = start_element(&e, line, &mut parsed.declarations)?;
                close(element, &mut stack, &mut parsed.roots);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Xml("unbalanced end tag".to_owned()))?;
                close(element, &mut stack, &mut parsed.roots);
            }
            Event::Text(e) => {
                if let Some(element) = stack.last_mut() {
                    let text = e.unescape().map_err(xml_err)?;
                    if !text.trim().is_empty() {
                        append_text(element, &text, line);
                    }
                }
            }
            Event::CData(e) => {
                if let Some(element) = stack.last_mut() {
                    let text = std::str::from_utf8(&e)?;
                    append_text(element, text, line);
                }
            }
            Event::Eof => break,
            _ => {} // declarations, comments, processing instructions
        }
    }

    if !stack.is_empty() {
        return Err(Error::Xml("unclosed element at end of input".to_owned()));
    }
    if parsed.roots.is_empty() {
        return Err(Error::Xml("no root element found in XML".to_owned()));
    }
    Ok(parsed)
}

fn start_element(
    e: &quick_xml::events::BytesStart<'_>,
    line: i32,
    declarations: &mut Vec<Declaration>,
) -> Result<Element> {
    let name = std::str::from_utf8(e.name().as_ref())?.to_owned();
    let mut attributes = Vec::new();

    for attr in e.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = std::str::from_utf8(attr.key.as_ref())?;
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();

        if key == "xmlns" {
            declarations.push(Declaration {
                prefix: None,
                uri: value,
                line,
            });
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.push(Declaration {
                prefix: Some(prefix.to_owned()),
                uri: value,
                line,
            });
        } else {
            attributes.push((key.to_owned(), value));
        }
    }

    Ok(Element {
        name,
        line,
        attributes,
        text: None,
        children: Vec::new(),
    })
}

fn append_text(element: &mut Element, text: &str, line: i32) {
    match &mut element.text {
        Some((existing, _)) => existing.push_str(text),
        None => element.text = Some((text.to_owned(), line)),
    }
}

fn close(element: Element, stack: &mut [Element], roots: &mut Vec<Element>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => roots.push(element),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{decode, Event as Decoded};

    const MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.app"
    android:versionCode="3">
    <!-- permissions -->
    <uses-permission android:name="android.permission.INTERNET"/>
    <application android:debuggable="true" android:icon="@0x7f020000">
        <meta-data android:name="flavor" android:value="0x1f"/>
        <note>hello &amp; bye</note>
    </application>
</manifest>"#;

    #[test]
    fn test_manifest_tree() {
        let doc = Document::from_xml(MANIFEST, &ResourceIds::android()).unwrap();

        let ns = doc.namespaces().get(crate::ANDROID_NS).unwrap();
        assert_eq!(ns.prefix.as_deref(), Some("android"));
        assert_eq!(ns.line, 2);

        let root = &doc.roots()[0];
        assert_eq!(root.name(), "manifest");
        assert_eq!(root.line(), 2);
        assert_eq!(root.children().len(), 2);

        let permission = &root.children()[0];
        assert_eq!(permission.line(), 6);
        let attr = permission.attributes().next().unwrap();
        assert_eq!(attr.namespace(), Some(crate::ANDROID_NS));
        assert_eq!(attr.resource_id(), 0x0101_0003);

        let application = &root.children()[1];
        let note = &application.children()[1];
        assert_eq!(note.text(), Some(("hello & bye", 9)));
    }

    #[test]
    fn test_value_inference() {
        assert_eq!(infer_value("true"), (AttrType::IntBoolean, AttrValue::Bool(true)));
        assert_eq!(infer_value("-12"), (AttrType::FirstInt, AttrValue::Int(-12)));
        assert_eq!(infer_value("0x1f"), (AttrType::IntHex, AttrValue::Int(0x1f)));
        assert_eq!(infer_value("0xffffffff"), (AttrType::IntHex, AttrValue::Int(-1)));
        assert_eq!(
            infer_value("@0x7f020000"),
            (AttrType::Reference, AttrValue::Int(0x7f02_0000))
        );
        assert_eq!(infer_value("007").0, AttrType::String);
        assert_eq!(infer_value("0xzz").0, AttrType::String);
        assert_eq!(infer_value("@string/app_name").0, AttrType::String);
    }

    #[test]
    fn test_encoded_manifest() {
        let mut doc = Document::from_xml(MANIFEST, &ResourceIds::android()).unwrap();
        let decoded = decode(&doc.encode().unwrap());

        // versionCode, name, icon, debuggable, value
        assert_eq!(
            decoded.resource_ids,
            [0x0101_021b, 0x0101_0003, 0x0101_0002, 0x0101_000f, 0x0101_0024]
        );
        let Decoded::Start { attrs, .. } = &decoded.events[1] else {
            panic!("expected manifest start tag");
        };
        let names: Vec<_> = attrs.iter().map(|a| a.1.as_str()).collect();
        assert_eq!(names, ["versionCode", "package"]);
    }

    #[test]
    fn test_default_namespace_applies_to_elements_only() {
        let xml = r#"<root xmlns="urn:d" a="1"><child/></root>"#;
        let doc = Document::from_xml(xml, &ResourceIds::new()).unwrap();
        let root = &doc.roots()[0];
        assert_eq!(root.namespace(), Some("urn:d"));
        assert_eq!(root.children()[0].namespace(), Some("urn:d"));
        assert_eq!(root.attributes().next().unwrap().namespace(), None);
    }

    #[test]
    fn test_framework_ids_only_in_android_namespace() {
        let xml = r#"<Toolbar xmlns:android="http://schemas.android.com/apk/res/android"
            xmlns:app="http://schemas.android.com/apk/res-auto"
            android:theme="@0x7f0a0001" app:theme="@0x7f0a0002"/>"#;
        let mut doc = Document::from_xml(xml, &ResourceIds::android()).unwrap();

        let attrs: Vec<_> = doc.roots()[0]
            .attributes()
            .map(|a| (a.namespace().unwrap(), a.resource_id()))
            .collect();
        assert_eq!(
            attrs,
            [
                (crate::ANDROID_NS, 0x0101_0000),
                ("http://schemas.android.com/apk/res-auto", NO_RESOURCE_ID),
            ]
        );

        let decoded = decode(&doc.encode().unwrap());
        assert_eq!(decoded.resource_ids, [0x0101_0000]);
        let Decoded::Start { attrs, .. } = &decoded.events[2] else {
            panic!("expected Toolbar start tag");
        };
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_mixed_content_text_is_concatenated() {
        let xml = "<a>\n  x<b/>y<![CDATA[<z>]]>\n</a>";
        let doc = Document::from_xml(xml, &ResourceIds::new()).unwrap();
        let root = &doc.roots()[0];
        assert_eq!(root.text(), Some(("xy<z>", 2)));
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn test_unknown_prefix() {
        let result = Document::from_xml(r#"<root x:a="1"/>"#, &ResourceIds::new());
        assert!(matches!(result, Err(Error::UnknownPrefix(p)) if p == "x"));
    }

    #[test]
    fn test_empty_and_unbalanced_input() {
        assert!(matches!(Document::from_xml("", &ResourceIds::new()), Err(Error::Xml(_))));
        assert!(Document::from_xml("<a><b></a>", &ResourceIds::new()).is_err());
    }

    #[test]
    fn test_resource_id_map_parse() {
        let ids = ResourceIds::parse(
            "# framework\nname = 0x01010003\n\n  label=16842753  # decimal\n",
        )
        .unwrap();
        assert_eq!(ids.get("name"), Some(0x0101_0003));
        assert_eq!(ids.get("label"), Some(0x0101_0001));
        assert_eq!(ids.len(), 2);

        let err = ResourceIds::parse("name 0x01").unwrap_err();
        assert!(matches!(err, Error::InvalidResourceMap { line: 1, .. }));
        assert!(ResourceIds::parse("name = nope").is_err());
    }

    #[test]
    fn test_resource_ids_extend_overrides() {
        let mut ids = ResourceIds::android();
        ids.extend(ResourceIds::parse("name = 0x7f010000").unwrap());
        assert_eq!(ids.get("name"), Some(0x7f01_0000));
        assert_eq!(ids.get("label"), Some(0x0101_0001));
    }
}
