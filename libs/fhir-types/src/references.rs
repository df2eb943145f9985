//! Reference extraction
//!
//! [`References`] walks an element tree with an explicit stack and yields the
//! `(type, id)` pair of every local reference it finds. The walk is lazy and
//! restartable: every call to `references()` starts a fresh walk.
//!
//! Scalars are never entered. Generic maps typed as `Bundle.entry` are not
//! entered either, because the resource embedded in an entry is a reference
//! target and its own references don't belong to the container.

use crate::value::{FieldValue, GenericMap};
use regex::Regex;
use std::sync::OnceLock;

/// A pointer to another resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceRef {
    pub resource_type: String,
    pub id: String,
}

impl ResourceRef {
    pub fn new(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

/// Something that can contain references.
pub trait RefSource {
    /// Push the children of `self` onto the walk and emit references it holds
    /// directly.
    fn expand<'a>(&'a self, refs: &mut References<'a>);
}

pub struct References<'a> {
    stack: Vec<&'a dyn RefSource>,
    found: Vec<ResourceRef>,
}

impl<'a> References<'a> {
    pub fn new(root: &'a dyn RefSource) -> Self {
        Self {
            stack: vec![root],
            found: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, node: &'a dyn RefSource) {
        self.stack.push(node);
    }

    pub(crate) fn emit(&mut self, reference: ResourceRef) {
        self.found.push(reference);
    }
}

impl Iterator for References<'_> {
    type Item = ResourceRef;

    fn next(&mut self) -> Option<ResourceRef> {
        loop {
            if let Some(found) = self.found.pop() {
                return Some(found);
            }
            let node = self.stack.pop()?;
            node.expand(self);
        }
    }
}

impl std::fmt::Debug for References<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("References")
            .field("pending", &self.stack.len())
            .field("found", &self.found)
            .finish()
    }
}

impl RefSource for FieldValue {
    fn expand<'a>(&'a self, refs: &mut References<'a>) {
        match self {
            FieldValue::Element(element) => refs.push(element),
            FieldValue::List(items) => {
                for item in items.iter().filter(|item| !item.is_scalar()) {
                    refs.push(item);
                }
            }
            FieldValue::Map(map) => refs.push(&**map),
            _ => {}
        }
    }
}

impl RefSource for GenericMap {
    fn expand<'a>(&'a self, refs: &mut References<'a>) {
        if self.is_bundle_entry() {
            return;
        }
        for value in self.values().filter(|value| !value.is_scalar()) {
            refs.push(value);
        }
    }
}

fn local_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Z][A-Za-z0-9_]{0,254})/([A-Za-z0-9\-.]{1,64})$")
            .expect("local reference regex must compile")
    })
}

/// Split a literal reference of the form `Type/id` into its parts.
///
/// Absolute URLs, `urn:` references, fragments and versioned references
/// don't match and yield `None`.
pub fn parse_local_reference(reference: &str) -> Option<(&str, &str)> {
    let caps = local_reference_regex().captures(reference)?;
    let resource_type = caps.get(1)?.as_str();
    let id = caps.get(2)?.as_str();
    Some((resource_type, id))
}
