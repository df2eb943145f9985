//! Coding: a reference to a code defined by a terminology system

use crate::context::TypeContext;
use crate::element::{hash_slot, FhirType, Slot};
use crate::error::Result;
use crate::extension::ExtensionData;
use crate::hash::{markers, HashSink};
use crate::primitive::{Boolean, Code, FhirString, Uri};
use crate::references::References;
use crate::value::FieldValue;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Coding {
    extension_data: Arc<ExtensionData>,
    system: Option<Arc<Uri>>,
    version: Option<Arc<FhirString>>,
    code: Option<Arc<Code>>,
    display: Option<Arc<FhirString>>,
    user_selected: Option<Arc<Boolean>>,
}

impl Coding {
    /// A coding with just `system` and `code`.
    pub fn new(ctx: &TypeContext, system: &str, code: &str) -> Result<Arc<Self>> {
        let mut coding = Self::blank();
        coding.system = Some(Uri::new(ctx, Arc::from(system))?);
        coding.code = Some(Code::new(ctx, Arc::from(code))?);
        Ok(Self::canonical(ctx, coding))
    }

    pub fn system(&self) -> Option<&Arc<Uri>> {
        self.system.as_ref()
    }

    pub fn version(&self) -> Option<&Arc<FhirString>> {
        self.version.as_ref()
    }

    pub fn code(&self) -> Option<&Arc<Code>> {
        self.code.as_ref()
    }

    pub fn display(&self) -> Option<&Arc<FhirString>> {
        self.display.as_ref()
    }

    pub fn user_selected(&self) -> Option<&Arc<Boolean>> {
        self.user_selected.as_ref()
    }
}

impl FhirType for Coding {
    const TYPE_NAME: &'static str = "Coding";
    const HASH_MARKER: u8 = markers::CODING;
    const FIELDS: &'static [&'static str] =
        &["system", "version", "code", "display", "userSelected"];

    fn blank() -> Self {
        Coding {
            extension_data: ExtensionData::empty(),
            system: None,
            version: None,
            code: None,
            display: None,
            user_selected: None,
        }
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "system" => self.system.to_value(),
            "version" => self.version.to_value(),
            "code" => self.code.to_value(),
            "display" => self.display.to_value(),
            "userSelected" => self.user_selected.to_value(),
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
            "system" => self.system = Slot::from_value(ctx, owner, key, value)?,
            "version" => self.version = Slot::from_value(ctx, owner, key, value)?,
            "code" => self.code = Slot::from_value(ctx, owner, key, value)?,
            "display" => self.display = Slot::from_value(ctx, owner, key, value)?,
            "userSelected" => self.user_selected = Slot::from_value(ctx, owner, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        self.system.is_some()
            || self.version.is_some()
            || self.code.is_some()
            || self.display.is_some()
            || self.user_selected.is_some()
    }

    fn fields_internable(&self) -> bool {
        self.system.is_internable()
            && self.version.is_internable()
            && self.code.is_internable()
            && self.display.is_internable()
            && self.user_selected.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        hash_slot(sink, 2, &self.system);
        hash_slot(sink, 3, &self.version);
        hash_slot(sink, 4, &self.code);
        hash_slot(sink, 5, &self.display);
        hash_slot(sink, 6, &self.user_selected);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        self.system.write_json(out, "system");
        self.version.write_json(out, "version");
        self.code.write_json(out, "code");
        self.display.write_json(out, "display");
        self.user_selected.write_json(out, "userSelected");
    }

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        self.system.visit(refs);
        self.version.visit(refs);
        self.code.visit(refs);
        self.display.visit(refs);
        self.user_selected.visit(refs);
    }

    composite_plumbing!(Coding, Coding, coding);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::GenericMap;

    #[test]
    fn plain_codings_are_shared() {
        let ctx = TypeContext::default();
        let a = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
        let b = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn long_display_is_not_interned() {
        let ctx = TypeContext::default();
        let map = GenericMap::new()
            .with("code", FieldValue::code("final"))
            .with("display", "Final result");
        let a = Coding::create(&ctx, &map).unwrap();
        let b = Coding::create(&ctx, &map).unwrap();
        assert_eq!(a, b);
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn keys_follow_declaration_order() {
        let ctx = TypeContext::default();
        let map = GenericMap::new()
            .with("userSelected", true)
            .with("code", FieldValue::code("x"))
            .with("id", "c1");
        let coding = Coding::create(&ctx, &map).unwrap();
        assert_eq!(coding.keys(), vec!["id", "code", "userSelected"]);
    }

    #[test]
    fn json_uses_fhir_names() {
        let ctx = TypeContext::default();
        let coding = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
        let coding = Coding::assoc(&coding, &ctx, "userSelected", Some(true.into())).unwrap();
        assert_eq!(
            coding.to_json(),
            serde_json::json!({
                "system": "http://loinc.org",
                "code": "8480-6",
                "userSelected": true
            })
        );
    }
}
