//! Quantity: a measured amount

use crate::context::TypeContext;
use crate::element::{hash_slot, FhirType, Slot};
use crate::error::Result;
use crate::extension::ExtensionData;
use crate::hash::{markers, HashSink};
use crate::primitive::{Code, FhirDecimal, FhirString, Uri};
use crate::references::References;
use crate::value::FieldValue;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Quantity {
    extension_data: Arc<ExtensionData>,
    value: Option<Arc<FhirDecimal>>,
    comparator: Option<Arc<Code>>,
    unit: Option<Arc<FhirString>>,
    system: Option<Arc<Uri>>,
    code: Option<Arc<Code>>,
}

impl Quantity {
    pub fn value(&self) -> Option<&Arc<FhirDecimal>> {
        self.value.as_ref()
    }

    pub fn comparator(&self) -> Option<&Arc<Code>> {
        self.comparator.as_ref()
    }

    pub fn unit(&self) -> Option<&Arc<FhirString>> {
        self.unit.as_ref()
    }

    pub fn system(&self) -> Option<&Arc<Uri>> {
        self.system.as_ref()
    }

    pub fn code(&self) -> Option<&Arc<Code>> {
        self.code.as_ref()
    }
}

impl FhirType for Quantity {
    const TYPE_NAME: &'static str = "Quantity";
    const HASH_MARKER: u8 = markers::QUANTITY;
    const FIELDS: &'static [&'static str] = &["value", "comparator", "unit", "system", "code"];

    fn blank() -> Self {
        Quantity {
            extension_data: ExtensionData::empty(),
            value: None,
            comparator: None,
            unit: None,
            system: None,
            code: None,
        }
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "value" => self.value.to_value(),
            "comparator" => self.comparator.to_value(),
            "unit" => self.unit.to_value(),
            "system" => self.system.to_value(),
            "code" => self.code.to_value(),
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
            "value" => self.value = Slot::from_value(ctx, owner, key, value)?,
            "comparator" => self.comparator = Slot::from_value(ctx, owner, key, value)?,
            "unit" => self.unit = Slot::from_value(ctx, owner, key, value)?,
            "system" => self.system = Slot::from_value(ctx, owner, key, value)?,
            "code" => self.code = Slot::from_value(ctx, owner, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        self.value.is_some()
            || self.comparator.is_some()
            || self.unit.is_some()
            || self.system.is_some()
            || self.code.is_some()
    }

    fn fields_internable(&self) -> bool {
        self.value.is_internable()
            && self.comparator.is_internable()
            && self.unit.is_internable()
            && self.system.is_internable()
            && self.code.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        hash_slot(sink, 2, &self.value);
        hash_slot(sink, 3, &self.comparator);
        hash_slot(sink, 4, &self.unit);
        hash_slot(sink, 5, &self.system);
        hash_slot(sink, 6, &self.code);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        self.value.write_json(out, "value");
        self.comparator.write_json(out, "comparator");
        self.unit.write_json(out, "unit");
        self.system.write_json(out, "system");
        self.code.write_json(out, "code");
    }

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        self.value.visit(refs);
        self.comparator.visit(refs);
        self.unit.visit(refs);
        self.system.visit(refs);
        self.code.visit(refs);
    }

    composite_plumbing!(Quantity, Quantity, quantity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::GenericMap;
    use rust_decimal::Decimal;

    fn quantity(ctx: &TypeContext, value: &str) -> Arc<Quantity> {
        let value: Decimal = value.parse().unwrap();
        let map = GenericMap::new()
            .with("value", value)
            .with("unit", "mg")
            .with("system", "http://unitsofmeasure.org")
            .with("code", FieldValue::code("mg"));
        Quantity::create(ctx, &map).unwrap()
    }

    #[test]
    fn decimal_scale_is_significant() {
        let ctx = TypeContext::default();
        let a = quantity(&ctx, "1.0");
        let b = quantity(&ctx, "1.00");
        assert_ne!(a, b);
        assert_ne!(
            crate::element::Element::from(a).hash(),
            crate::element::Element::from(b).hash()
        );
    }

    #[test]
    fn valued_quantities_are_not_shared() {
        let ctx = TypeContext::default();
        let a = quantity(&ctx, "5");
        let b = quantity(&ctx, "5");
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn decimal_json_is_exact() {
        let ctx = TypeContext::default();
        let json = quantity(&ctx, "0.10").to_json();
        assert_eq!(json["value"].to_string(), "0.10");
        assert_eq!(json["unit"], "mg");
    }
}
