//! Tree-building contract.
//!
//! A document is built by driving a [`DocumentVisitor`] and the
//! [`NodeVisitor`]s it hands out. Every method has a default that forwards
//! the call to [`next`](NodeVisitor::next) when a successor is present and
//! does nothing otherwise, so a handler only overrides what it cares about
//! and passes the rest down the chain.

use crate::{AttrType, AttrValue, Result};

/// Receives the contents of one node.
pub trait NodeVisitor {
    /// Successor receiving forwarded calls.
    fn next(&mut self) -> Option<&mut dyn NodeVisitor> {
        None
    }

    /// Source line of the start tag.
    fn set_line(&mut self, line: i32) {
        if let Some(next) = self.next() {
            next.set_line(line);
        }
    }

    /// Attach an attribute.
    fn add_attribute(
        &mut self,
        namespace: Option<&str>,
        name: &str,
        resource_id: i32,
        ty: AttrType,
        value: AttrValue,
    ) -> Result<()> {
        match self.next() {
            Some(next) => next.add_attribute(namespace, name, resource_id, ty, value),
            None => Ok(()),
        }
    }

    /// Create a child and return the visitor that receives its contents.
    fn add_child(
        &mut self,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<Option<&mut dyn NodeVisitor>> {
        match self.next() {
            Some(next) => next.add_child(namespace, name),
            None => Ok(None),
        }
    }

    /// Set the text content.
    fn set_text(&mut self, line: i32, value: &str) {
        if let Some(next) = self.next() {
            next.set_text(line, value);
        }
    }

    /// No more calls will be made for this node.
    fn finish(&mut self) {
        if let Some(next) = self.next() {
            next.finish();
        }
    }
}

/// Receives namespace declarations and root nodes.
pub trait DocumentVisitor {
    /// Successor receiving forwarded calls.
    fn next(&mut self) -> Option<&mut dyn DocumentVisitor> {
        None
    }

    /// Declare a namespace URI with an optional prefix.
    fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str, line: i32) -> Result<()> {
        match self.next() {
            Some(next) => next.declare_namespace(prefix, uri, line),
            None => Ok(()),
        }
    }

    /// Create a root node and return the visitor that receives its contents.
    fn new_root(&mut self, namespace: Option<&str>, name: &str) -> Result<Option<&mut dyn NodeVisitor>> {
        match self.next() {
            Some(next) => next.new_root(namespace, name),
            None => Ok(None),
        }
    }

    fn finish(&mut self) {
        if let Some(next) = self.next() {
            next.finish();
        }
    }
}
