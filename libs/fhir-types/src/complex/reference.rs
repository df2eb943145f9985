//! Reference: a pointer from one resource to another

use crate::complex::Identifier;
use crate::context::TypeContext;
use crate::element::{hash_slot, FhirType, Slot};
use crate::error::Result;
use crate::extension::ExtensionData;
use crate::hash::{markers, HashSink};
use crate::primitive::{FhirString, Uri};
use crate::references::{parse_local_reference, References, ResourceRef};
use crate::value::FieldValue;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Reference {
    extension_data: Arc<ExtensionData>,
    reference: Option<Arc<FhirString>>,
    type_: Option<Arc<Uri>>,
    identifier: Option<Arc<Identifier>>,
    display: Option<Arc<FhirString>>,
}

impl Reference {
    /// A literal reference such as `Patient/123`.
    pub fn new(ctx: &TypeContext, reference: &str) -> Result<Arc<Self>> {
        let mut value = Self::blank();
        value.reference = Some(FhirString::new(ctx, Arc::from(reference))?);
        Ok(Self::canonical(ctx, value))
    }

    pub fn reference(&self) -> Option<&Arc<FhirString>> {
        self.reference.as_ref()
    }

    pub fn type_(&self) -> Option<&Arc<Uri>> {
        self.type_.as_ref()
    }

    pub fn identifier(&self) -> Option<&Arc<Identifier>> {
        self.identifier.as_ref()
    }

    pub fn display(&self) -> Option<&Arc<FhirString>> {
        self.display.as_ref()
    }

    /// The `(type, id)` target if `reference` is a local `Type/id` literal.
    pub fn local_reference(&self) -> Option<ResourceRef> {
        let literal = self.reference.as_ref()?.value()?;
        let (resource_type, id) = parse_local_reference(literal)?;
        Some(ResourceRef::new(resource_type, id))
    }
}

impl FhirType for Reference {
    const TYPE_NAME: &'static str = "Reference";
    const HASH_MARKER: u8 = markers::REFERENCE;
    const FIELDS: &'static [&'static str] = &["reference", "type", "identifier", "display"];

    fn blank() -> Self {
        Reference {
            extension_data: ExtensionData::empty(),
            reference: None,
            type_: None,
            identifier: None,
            display: None,
        }
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "reference" => self.reference.to_value(),
            "type" => self.type_.to_value(),
            "identifier" => self.identifier.to_value(),
            "display" => self.display.to_value(),
            _ => None,
        }
    }

    fn set_field(
        &mut self,
        ctx: &TypeContext,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<bool> {
        let owner = Self::TYPE_NAME;
        match key {
            "reference" => self.reference = Slot::from_value(ctx, owner, key, value)?,
            "type" => self.type_ = Slot::from_value(ctx, owner, key, value)?,
            "identifier" => self.identifier = Slot::from_value(ctx, owner, key, value)?,
            "display" => self.display = Slot::from_value(ctx, owner, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        self.reference.is_some()
            || self.type_.is_some()
            || self.identifier.is_some()
            || self.display.is_some()
    }

    fn fields_internable(&self) -> bool {
        self.reference.is_internable()
            && self.type_.is_internable()
            && self.identifier.is_internable()
            && self.display.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        hash_slot(sink, 2, &self.reference);
        hash_slot(sink, 3, &self.type_);
        hash_slot(sink, 4, &self.identifier);
        hash_slot(sink, 5, &self.display);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        self.reference.write_json(out, "reference");
        self.type_.write_json(out, "type");
        self.identifier.write_json(out, "identifier");
        self.display.write_json(out, "display");
    }

    /// Only the `reference` literal is a pointer; the other fields describe it.
    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        if let Some(target) = self.local_reference() {
            refs.emit(target);
        }
    }

    composite_plumbing!(Reference, Reference, reference);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::value::GenericMap;

    fn refs_of(reference: Arc<Reference>) -> Vec<ResourceRef> {
        Element::from(reference).references().collect()
    }

    #[test]
    fn local_literal_yields_one_pair() {
        let ctx = TypeContext::default();
        let reference = Reference::new(&ctx, "Patient/123").unwrap();
        assert_eq!(refs_of(reference), vec![ResourceRef::new("Patient", "123")]);
    }

    #[test]
    fn urn_and_absolute_references_yield_nothing() {
        let ctx = TypeContext::default();
        for literal in [
            "urn:uuid:f81d4fae-7dec-11d0-a765-00a0c91e6bf6",
            "http://example.org/fhir/Patient/123",
        ] {
            let reference = Reference::new(&ctx, literal).unwrap();
            assert!(refs_of(reference).is_empty(), "{literal}");
        }
    }

    #[test]
    fn logical_identifier_is_not_followed() {
        let ctx = TypeContext::default();
        let map = GenericMap::new()
            .with("identifier", GenericMap::new().with("value", "123"))
            .with("display", "Someone");
        let reference = Reference::create(&ctx, &map).unwrap();
        assert!(refs_of(reference).is_empty());
    }
}
