//! CodeableConcept: codings plus free text

use crate::complex::Coding;
use crate::context::TypeContext;
use crate::element::{hash_slot, FhirType, Slot};
use crate::error::Result;
use crate::extension::ExtensionData;
use crate::hash::{markers, HashSink};
use crate::primitive::FhirString;
use crate::references::References;
use crate::value::{Elements, FieldValue};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CodeableConcept {
    extension_data: Arc<ExtensionData>,
    coding: Elements<Coding>,
    text: Option<Arc<FhirString>>,
}

impl CodeableConcept {
    pub fn coding(&self) -> &Elements<Coding> {
        &self.coding
    }

    pub fn text(&self) -> Option<&Arc<FhirString>> {
        self.text.as_ref()
    }
}

impl FhirType for CodeableConcept {
    const TYPE_NAME: &'static str = "CodeableConcept";
    const HASH_MARKER: u8 = markers::CODEABLE_CONCEPT;
    const FIELDS: &'static [&'static str] = &["coding", "text"];
    const LIST_FIELDS: &'static [&'static str] = &["coding"];

    fn blank() -> Self {
        CodeableConcept {
            extension_data: ExtensionData::empty(),
            coding: Elements::empty(),
            text: None,
        }
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "coding" => self.coding.to_value(),
            "text" => self.text.to_value(),
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
            "coding" => self.coding = Slot::from_value(ctx, owner, key, value)?,
            "text" => self.text = Slot::from_value(ctx, owner, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        !self.coding.is_empty() || self.text.is_some()
    }

    fn fields_internable(&self) -> bool {
        Slot::is_internable(&self.coding) && self.text.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        hash_slot(sink, 2, &self.coding);
        hash_slot(sink, 3, &self.text);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        self.coding.write_json(out, "coding");
        self.text.write_json(out, "text");
    }

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        self.coding.visit(refs);
        self.text.visit(refs);
    }

    composite_plumbing!(CodeableConcept, CodeableConcept, codeable_concept);
}
