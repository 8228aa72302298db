//! Android binary XML (AXML) document builder and encoder.
//!
//! Manifests and resource XML inside Android packages are stored in a
//! compiled binary form. This crate builds such documents in memory and
//! encodes them byte-exactly for the platform's binary XML parser.
//!
//! # Layout
//!
//! An encoded document is a single `XML` chunk holding, in order:
//!
//! - the string pool (UTF-16, padded to four bytes)
//! - the resource map, one platform id per resource-linked string
//! - a start record per namespace
//! - the element tree: start tag, optional text, children, end tag
//! - the namespace end records, in reverse order
//!
//! # Example
//!
//! ```
//! use axml::{AttrType, Document};
//!
//! let mut doc = Document::new();
//! let root = doc.new_root(None, "manifest")?;
//! root.add_attribute(None, "package", -1, AttrType::String, "com.example".into())?;
//! root.add_child(None, "application")?.set_line(3);
//!
//! let bytes = doc.encode()?;
//! assert_eq!(bytes.len() as u32, doc.prepared().unwrap().size());
//! # Ok::<(), axml::Error>(())
//! ```

mod attribute;
mod document;
mod error;
mod namespace;
mod node;
mod pool;
mod visitor;

pub mod chunk;
pub mod string_pool;

#[cfg(feature = "xml-input")]
pub mod from_xml;

#[cfg(test)]
mod testutil;

pub use attribute::{is_resource_id, AttrKey, AttrType, AttrValue, Attribute, NO_RESOURCE_ID};
pub use document::{Document, Prepared};
pub use error::{Error, Result};
pub use namespace::{Namespace, NamespaceTable, ResolvedNamespace};
pub use node::Node;
pub use pool::{FrozenPool, ValuePool, ValueString};
pub use visitor::{DocumentVisitor, NodeVisitor};

/// Namespace URI of the Android framework attributes.
pub const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{AttrType, AttrValue, Document, DocumentVisitor, Node, NodeVisitor, ANDROID_NS};

    #[cfg(feature = "xml-input")]
    pub use crate::from_xml::{compile_xml, ResourceIds};
}
