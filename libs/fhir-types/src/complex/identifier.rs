//! Identifier: a business identifier within a namespace

use crate::complex::{CodeableConcept, Period, Reference};
use crate::context::TypeContext;
use crate::element::{hash_slot, FhirType, Slot};
use crate::error::Result;
use crate::extension::ExtensionData;
use crate::hash::{markers, HashSink};
use crate::primitive::{Code, FhirString, Uri};
use crate::references::References;
use crate::value::FieldValue;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Identifier {
    extension_data: Arc<ExtensionData>,
    use_: Option<Arc<Code>>,
    type_: Option<Arc<CodeableConcept>>,
    system: Option<Arc<Uri>>,
    value: Option<Arc<FhirString>>,
    period: Option<Arc<Period>>,
    assigner: Option<Arc<Reference>>,
}

impl Identifier {
    pub fn new(ctx: &TypeContext, system: &str, value: &str) -> Result<Arc<Self>> {
        let mut identifier = Self::blank();
        identifier.system = Some(Uri::new(ctx, Arc::from(system))?);
        identifier.value = Some(FhirString::new(ctx, Arc::from(value))?);
        Ok(Self::canonical(ctx, identifier))
    }

    pub fn use_(&self) -> Option<&Arc<Code>> {
        self.use_.as_ref()
    }

    pub fn type_(&self) -> Option<&Arc<CodeableConcept>> {
        self.type_.as_ref()
    }

    pub fn system(&self) -> Option<&Arc<Uri>> {
        self.system.as_ref()
    }

    pub fn value(&self) -> Option<&Arc<FhirString>> {
        self.value.as_ref()
    }

    pub fn period(&self) -> Option<&Arc<Period>> {
        self.period.as_ref()
    }

    pub fn assigner(&self) -> Option<&Arc<Reference>> {
        self.assigner.as_ref()
    }
}

impl FhirType for Identifier {
    const TYPE_NAME: &'static str = "Identifier";
    const HASH_MARKER: u8 = markers::IDENTIFIER;
    const FIELDS: &'static [&'static str] =
        &["use", "type", "system", "value", "period", "assigner"];

    fn blank() -> Self {
        Identifier {
            extension_data: ExtensionData::empty(),
            use_: None,
            type_: None,
            system: None,
            value: None,
            period: None,
            assigner: None,
        }
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "use" => self.use_.to_value(),
            "type" => self.type_.to_value(),
            "system" => self.system.to_value(),
            "value" => self.value.to_value(),
            "period" => self.period.to_value(),
            "assigner" => self.assigner.to_value(),
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
            "use" => self.use_ = Slot::from_value(ctx, owner, key, value)?,
            "type" => self.type_ = Slot::from_value(ctx, owner, key, value)?,
            "system" => self.system = Slot::from_value(ctx, owner, key, value)?,
            "value" => self.value = Slot::from_value(ctx, owner, key, value)?,
            "period" => self.period = Slot::from_value(ctx, owner, key, value)?,
            "assigner" => self.assigner = Slot::from_value(ctx, owner, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        self.use_.is_some()
            || self.type_.is_some()
            || self.system.is_some()
            || self.value.is_some()
            || self.period.is_some()
            || self.assigner.is_some()
    }

    fn fields_internable(&self) -> bool {
        self.use_.is_internable()
            && self.type_.is_internable()
            && self.system.is_internable()
            && self.value.is_internable()
            && self.period.is_internable()
            && self.assigner.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        hash_slot(sink, 2, &self.use_);
        hash_slot(sink, 3, &self.type_);
        hash_slot(sink, 4, &self.system);
        hash_slot(sink, 5, &self.value);
        hash_slot(sink, 6, &self.period);
        hash_slot(sink, 7, &self.assigner);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        self.use_.write_json(out, "use");
        self.type_.write_json(out, "type");
        self.system.write_json(out, "system");
        self.value.write_json(out, "value");
        self.period.write_json(out, "period");
        self.assigner.write_json(out, "assigner");
    }

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        self.use_.visit(refs);
        self.type_.visit(refs);
        self.system.visit(refs);
        self.value.visit(refs);
        self.period.visit(refs);
        self.assigner.visit(refs);
    }

    composite_plumbing!(Identifier, Identifier, identifier);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::references::ResourceRef;
    use crate::value::GenericMap;

    #[test]
    fn assigner_references_are_found() {
        let ctx = TypeContext::default();
        let assigner = Reference::new(&ctx, "Organization/acme").unwrap();
        let identifier = Identifier::new(&ctx, "urn:oid:1.2.36.146.595.217.0.1", "12345").unwrap();
        let assigner = Some(Element::from(assigner).into());
        let identifier = Identifier::assoc(&identifier, &ctx, "assigner", assigner).unwrap();
        let found: Vec<_> = Element::from(identifier).references().collect();
        assert_eq!(found, vec![ResourceRef::new("Organization", "acme")]);
    }

    #[test]
    fn nested_maps_build_typed_children() {
        let ctx = TypeContext::default();
        let map = GenericMap::new()
            .with("use", FieldValue::code("official"))
            .with("period", GenericMap::new().with("start", "2020-01-01"));
        let identifier = Identifier::create(&ctx, &map).unwrap();
        assert!(identifier.period().is_some());
        assert_eq!(identifier.keys(), vec!["use", "period"]);
        assert_eq!(identifier.to_json()["period"]["start"], "2020-01-01");
    }
}
