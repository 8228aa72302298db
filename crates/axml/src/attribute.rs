//! Attributes and their identity rules.

use std::cmp::Ordering;

use crate::{Error, Result};

/// Resource id meaning "no resource"; `0` is treated the same way.
pub const NO_RESOURCE_ID: i32 = -1;

/// Returns `true` for a real platform resource id.
#[inline]
pub fn is_resource_id(id: i32) -> bool {
    id != 0 && id != NO_RESOURCE_ID
}

/// Typed value tag of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttrType {
    Reference = 0x01,
    String = 0x03,
    FirstInt = 0x10,
    IntHex = 0x11,
    IntBoolean = 0x12,
}

/// Attribute value, checked against its [`AttrType`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrValue {
    String(String),
    Int(i32),
    Bool(bool),
}

impl AttrValue {
    fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "integer",
            Self::Bool(_) => "boolean",
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for AttrValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// A single attribute binding on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    namespace: Option<String>,
    name: String,
    resource_id: i32,
    ty: AttrType,
    value: AttrValue,
}

impl Attribute {
    /// Build an attribute, rejecting an empty name or a value that does not
    /// fit `ty`.
    pub fn new(
        namespace: Option<&str>,
        name: &str,
        resource_id: i32,
        ty: AttrType,
        value: AttrValue,
    ) -> Result<Self> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("attribute name must not be empty"));
        }
        if namespace == Some("") {
            return Err(Error::InvalidArgument("namespace URI must not be empty"));
        }
        let fits = matches!(
            (ty, &value),
            (AttrType::String, AttrValue::String(_))
                | (AttrType::IntBoolean, AttrValue::Bool(_))
                | (
                    AttrType::Reference | AttrType::FirstInt | AttrType::IntHex,
                    AttrValue::Int(_)
                )
        );
        if !fits {
            return Err(Error::TypeMismatch {
                name: name.to_owned(),
                ty,
                found: value.kind(),
            });
        }
        Ok(Self {
            namespace: namespace.map(str::to_owned),
            name: name.to_owned(),
            resource_id,
            ty,
            value,
        })
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_id(&self) -> i32 {
        self.resource_id
    }

    pub fn ty(&self) -> AttrType {
        self.ty
    }

    pub fn value(&self) -> &AttrValue {
        &self.value
    }

    /// Identity key: the resource id when it is real, else `(namespace, name)`.
    pub fn key(&self) -> AttrKey {
        if is_resource_id(self.resource_id) {
            AttrKey::Resource(self.resource_id)
        } else {
            AttrKey::Named {
                namespace: self.namespace.clone(),
                name: self.name.clone(),
            }
        }
    }

    /// Serialization order: namespaced first, ascending by URI, resource id
    /// and name; then non-namespaced, descending by name.
    pub fn write_order(&self, other: &Self) -> Ordering {
        match (&self.namespace, &other.namespace) {
            (None, None) => other.name.cmp(&self.name),
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => a
                .cmp(b)
                .then(self.resource_id.cmp(&other.resource_id))
                .then_with(|| self.name.cmp(&other.name)),
        }
    }
}

/// Key under which at most one attribute survives on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrKey {
    Resource(i32),
    Named {
        namespace: Option<String>,
        name: String,
    },
}
