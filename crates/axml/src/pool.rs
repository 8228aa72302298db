//! String and resource-id interning.
//!
//! The pool has two segments. Resource-linked names come first in the final
//! ordering and carry a parallel list of platform resource ids; every other
//! string lives in the general segment. A [`ValueString`] handed out while
//! interning only names a slot; its pool index exists once the pool is frozen.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::namespace::{NamespaceTable, ResolvedNamespace};
use crate::string_pool::{to_u32, EncodedStringPool};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Segment {
    Resource,
    General,
}

/// Handle to an interned string.
///
/// Equal handles always denote equal content within a segment; the same
/// content interned into both segments yields two distinct handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueString {
    segment: Segment,
    slot: u32,
}

/// Interning pool used during preparation.
#[derive(Debug, Default)]
pub struct ValuePool {
    resource: Vec<String>,
    resource_ids: Vec<i32>,
    resource_lookup: HashMap<(String, i32), u32>,
    general: Vec<String>,
    general_lookup: HashMap<String, u32>,
    namespaces: NamespaceTable,
}

impl ValuePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing namespace table; observed URIs are added to it.
    pub fn with_namespaces(namespaces: NamespaceTable) -> Self {
        Self {
            namespaces,
            ..Self::default()
        }
    }

    /// Intern `s` into the general segment.
    pub fn intern_general(&mut self, s: &str) -> ValueString {
        let slot = match self.general_lookup.get(s) {
            Some(&slot) => slot,
            None => {
                let slot = self.general.len() as u32;
                trace!(slot, value = s, "interned general string");
                self.general.push(s.to_owned());
                self.general_lookup.insert(s.to_owned(), slot);
                slot
            }
        };
        ValueString {
            segment: Segment::General,
            slot,
        }
    }

    /// Intern `name` linked to `resource_id` into the resource segment.
    ///
    /// The same name with a different id gets its own entry.
    pub fn intern_resource_linked(&mut self, name: &str, resource_id: i32) -> ValueString {
        let key = (name.to_owned(), resource_id);
        let slot = match self.resource_lookup.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.resource.len() as u32;
                trace!(slot, name, resource_id, "interned resource name");
                self.resource.push(name.to_owned());
                self.resource_ids.push(resource_id);
                self.resource_lookup.insert(key, slot);
                slot
            }
        };
        ValueString {
            segment: Segment::Resource,
            slot,
        }
    }

    /// Record `uri` as a referenced namespace and intern it as a general string.
    pub fn intern_namespace(&mut self, uri: &str) -> ValueString {
        self.namespaces.observe(uri);
        self.intern_general(uri)
    }

    /// Give every namespace a prefix and intern its prefix and URI.
    ///
    /// Returns the namespaces in table order.
    pub fn resolve_namespaces(&mut self) -> Vec<ResolvedNamespace> {
        self.namespaces.assign_prefixes();
        let entries: Vec<(String, String, i32)> = self
            .namespaces
            .iter()
            .map(|(uri, ns)| (uri.to_owned(), ns.prefix.clone().unwrap_or_default(), ns.line))
            .collect();

        entries
            .into_iter()
            .map(|(uri, prefix, line)| ResolvedNamespace {
                prefix: self.intern_general(&prefix),
                uri: self.intern_general(&uri),
                line,
            })
            .collect()
    }

    /// The namespace table as observed so far.
    pub fn namespaces(&self) -> &NamespaceTable {
        &self.namespaces
    }

    /// Fix the final ordering, resource segment first, and encode the string pool.
    pub fn freeze(self) -> Result<FrozenPool> {
        let resource_len = to_u32(self.resource.len(), "resource segment")?;
        let mut strings = self.resource;
        strings.extend(self.general);

        let encoded = EncodedStringPool::encode(strings.iter().map(String::as_str))?;
        to_u32(encoded.chunk_size(), "string pool")?;
        debug!(
            strings = strings.len(),
            resource_ids = self.resource_ids.len(),
            pool_bytes = encoded.chunk_size(),
            "froze value pool"
        );

        Ok(FrozenPool {
            strings,
            resource_ids: self.resource_ids,
            resource_len,
            encoded,
        })
    }
}

/// The final, indexed string pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrozenPool {
    strings: Vec<String>,
    resource_ids: Vec<i32>,
    resource_len: u32,
    encoded: EncodedStringPool,
}

impl FrozenPool {
    /// Pool index of an interned string.
    pub fn index(&self, value: ValueString) -> u32 {
        match value.segment {
            Segment::Resource => value.slot,
            Segment::General => self.resource_len + value.slot,
        }
    }

    /// Pool index as written into records.
    pub(crate) fn raw_index(&self, value: ValueString) -> i32 {
        self.index(value) as i32
    }

    /// String at a pool index.
    pub fn get(&self, index: u32) -> Option<&str> {
        self.strings.get(index as usize).map(String::as_str)
    }

    /// All strings in pool order.
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// Resource ids, parallel to the first `resource_ids().len()` strings.
    pub fn resource_ids(&self) -> &[i32] {
        &self.resource_ids
    }

    pub fn encoded(&self) -> &EncodedStringPool {
        &self.encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_general_dedup() {
        let mut pool = ValuePool::new();
        let a = pool.intern_general("manifest");
        let b = pool.intern_general("package");
        let c = pool.intern_general("manifest");
        assert_eq!(a, c);
        assert_ne!(a, b);

        let frozen = pool.freeze().unwrap();
        assert_eq!(frozen.strings(), ["manifest", "package"]);
        assert_eq!(frozen.index(c), 0);
    }

    #[test]
    fn test_resource_segment_comes_first() {
        let mut pool = ValuePool::new();
        let general = pool.intern_general("name");
        let linked = pool.intern_resource_linked("name", 0x0101_0003);
        let again = pool.intern_resource_linked("name", 0x0101_0003);
        let other_id = pool.intern_resource_linked("name", 0x0101_0004);
        assert_eq!(linked, again);
        assert_ne!(linked, other_id);

        let frozen = pool.freeze().unwrap();
        assert_eq!(frozen.strings(), ["name", "name", "name"]);
        assert_eq!(frozen.resource_ids(), [0x0101_0003, 0x0101_0004]);
        assert_eq!(frozen.index(linked), 0);
        assert_eq!(frozen.index(other_id), 1);
        assert_eq!(frozen.index(general), 2);
    }

    #[test]
    fn test_intern_namespace_observes_uri() {
        let mut pool = ValuePool::new();
        let uri = pool.intern_namespace("urn:x");
        assert_eq!(pool.intern_general("urn:x"), uri);
        assert!(pool.namespaces().get("urn:x").is_some());

        let resolved = pool.resolve_namespaces();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].uri, uri);

        let frozen = pool.freeze().unwrap();
        assert_eq!(frozen.get(frozen.index(resolved[0].prefix)), Some("axml_auto_00"));
    }
}
