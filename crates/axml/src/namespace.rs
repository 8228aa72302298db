//! Namespace table.

use indexmap::IndexMap;
use tracing::trace;

use crate::ValueString;

/// A namespace as declared or observed, keyed by URI in [`NamespaceTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Declared prefix. `None` until declared or synthesized.
    pub prefix: Option<String>,
    /// Line of the first use, `0` when only observed.
    pub line: i32,
}

/// A namespace with its prefix and URI interned, ready to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedNamespace {
    pub prefix: ValueString,
    pub uri: ValueString,
    pub line: i32,
}

/// URI → namespace map in insertion order.
///
/// Explicit declarations come first, in call order; URIs first seen while
/// preparing the tree follow in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceTable {
    entries: IndexMap<String, Namespace>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `uri`, replacing any earlier record but keeping its position.
    pub fn declare(&mut self, prefix: Option<&str>, uri: &str, line: i32) {
        self.entries.insert(
            uri.to_owned(),
            Namespace {
                prefix: prefix.map(str::to_owned),
                line,
            },
        );
    }

    /// Record that `uri` is referenced, adding a prefix-less placeholder if unknown.
    pub fn observe(&mut self, uri: &str) {
        if !self.entries.contains_key(uri) {
            trace!(uri, "namespace observed without declaration");
            self.entries.insert(
                uri.to_owned(),
                Namespace {
                    prefix: None,
                    line: 0,
                },
            );
        }
    }

    /// Give every prefix-less namespace an `axml_auto_NN` prefix, numbered in table order.
    pub fn assign_prefixes(&mut self) {
        let mut next = 0;
        for (uri, ns) in &mut self.entries {
            if ns.prefix.is_none() {
                let prefix = format!("axml_auto_{next:02}");
                trace!(uri = uri.as_str(), prefix = prefix.as_str(), "synthesized namespace prefix");
                ns.prefix = Some(prefix);
                next += 1;
            }
        }
    }

    pub fn get(&self, uri: &str) -> Option<&Namespace> {
        self.entries.get(uri)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(uri, namespace)` in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Namespace)> {
        self.entries.iter().map(|(uri, ns)| (uri.as_str(), ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_before_observed() {
        let mut table = NamespaceTable::new();
        table.declare(Some("android"), "urn:a", 2);
        table.observe("urn:b");
        table.observe("urn:a");

        let uris: Vec<_> = table.iter().map(|(uri, _)| uri).collect();
        assert_eq!(uris, ["urn:a", "urn:b"]);
        assert_eq!(table.get("urn:a").unwrap().prefix.as_deref(), Some("android"));
        assert_eq!(table.get("urn:b").unwrap().prefix, None);
    }

    #[test]
    fn test_redeclare_keeps_position() {
        let mut table = NamespaceTable::new();
        table.declare(None, "urn:a", 1);
        table.declare(None, "urn:b", 1);
        table.declare(Some("x"), "urn:a", 9);

        let first = table.iter().next().unwrap();
        assert_eq!(first.0, "urn:a");
        assert_eq!(first.1.prefix.as_deref(), Some("x"));
        assert_eq!(first.1.line, 9);
    }

    #[test]
    fn test_assign_prefixes_in_table_order() {
        let mut table = NamespaceTable::new();
        table.observe("urn:first");
        table.declare(Some("keep"), "urn:kept", 1);
        table.observe("urn:second");
        table.assign_prefixes();

        let prefixes: Vec<_> = table
            .iter()
            .map(|(_, ns)| ns.prefix.clone().unwrap())
            .collect();
        assert_eq!(prefixes, ["axml_auto_00", "keep", "axml_auto_01"]);
    }
}
