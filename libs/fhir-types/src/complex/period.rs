//! Period: a time range defined by start and end

use crate::context::TypeContext;
use crate::element::{hash_slot, FhirType, Slot};
use crate::error::Result;
use crate::extension::ExtensionData;
use crate::hash::{markers, HashSink};
use crate::primitive::DateTime;
use crate::references::References;
use crate::value::FieldValue;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Period {
    extension_data: Arc<ExtensionData>,
    start: Option<Arc<DateTime>>,
    end: Option<Arc<DateTime>>,
}

impl Period {
    pub fn start(&self) -> Option<&Arc<DateTime>> {
        self.start.as_ref()
    }

    pub fn end(&self) -> Option<&Arc<DateTime>> {
        self.end.as_ref()
    }
}

impl FhirType for Period {
    const TYPE_NAME: &'static str = "Period";
    const HASH_MARKER: u8 = markers::PERIOD;
    const FIELDS: &'static [&'static str] = &["start", "end"];

    fn blank() -> Self {
        Period {
            extension_data: ExtensionData::empty(),
            start: None,
            end: None,
        }
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "start" => self.start.to_value(),
            "end" => self.end.to_value(),
            _ => None,
        }
    }

    fn set_field(
        &mut self,
        ctx: &TypeContext,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<bool> {
        match key {
            "start" => self.start = Slot::from_value(ctx, Self::TYPE_NAME, key, value)?,
            "end" => self.end = Slot::from_value(ctx, Self::TYPE_NAME, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    fn fields_internable(&self) -> bool {
        self.start.is_internable() && self.end.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        hash_slot(sink, 2, &self.start);
        hash_slot(sink, 3, &self.end);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        self.start.write_json(out, "start");
        self.end.write_json(out, "end");
    }

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        self.start.visit(refs);
        self.end.visit(refs);
    }

    composite_plumbing!(Period, Period, period);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::GenericMap;

    #[test]
    fn all_absent_period_is_the_empty_singleton() {
        let ctx = TypeContext::default();
        let a = Period::create(&ctx, &GenericMap::new()).unwrap();
        let b = Period::create(&TypeContext::default(), &GenericMap::new()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.keys().is_empty());
    }

    #[test]
    fn start_parses_date_time_strings() {
        let ctx = TypeContext::default();
        let map = GenericMap::new().with("start", "2024-03-01T10:00:00+01:00");
        let period = Period::create(&ctx, &map).unwrap();
        assert_eq!(period.to_json()["start"], "2024-03-01T10:00:00+01:00");

        let bad = GenericMap::new().with("end", "March 2024");
        assert!(Period::create(&ctx, &bad).is_err());
    }

    #[test]
    fn start_accepts_plain_dates() {
        let ctx = TypeContext::default();
        let day: crate::primitive::DateValue = "2024-03-01".parse().unwrap();
        let map = GenericMap::new().with("start", FieldValue::Date(day));
        let period = Period::create(&ctx, &map).unwrap();
        assert_eq!(period.to_json()["start"], "2024-03-01");
    }
}
