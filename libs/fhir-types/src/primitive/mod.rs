//! FHIR primitive types
//!
//! A primitive is a single optional value plus the id and extensions every
//! element can carry. All primitives share [`Primitive`]; a [`PrimitiveKind`]
//! supplies the value type, its validation, its interning policy and its
//! scalar encodings.

mod kinds;
mod temporal;

pub use kinds::{
    Boolean, BooleanKind, Canonical, CanonicalKind, Code, CodeKind, Date, DateKind, DateTime,
    DateTimeKind, DecimalKind, ExactDecimal, FhirDecimal, FhirString, Id, IdKind, Integer,
    Integer64, Integer64Kind, IntegerKind, Markdown, MarkdownKind, PositiveInt, PositiveIntKind,
    StringKind, UnsignedInt, UnsignedIntKind, Uri, UriKind,
};
pub use temporal::{DateTimeValue, DateValue};

use crate::context::TypeContext;
use crate::element::{Element, FhirType};
use crate::error::{Error, Result};
use crate::extension::ExtensionData;
use crate::hash::{HashSink, FIELD_VALUE};
use crate::intern::ValueInterner;
use crate::references::References;
use crate::value::FieldValue;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

pub trait PrimitiveKind: Sized + Send + Sync + 'static {
    type Value: Clone + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static;

    const TYPE_NAME: &'static str;
    const HASH_MARKER: u8;

    /// Convert a raw field value. `Ok(None)` means the shape doesn't fit.
    fn from_field(value: &FieldValue) -> Result<Option<Self::Value>>;

    fn to_field(value: &Self::Value) -> FieldValue;

    /// Write the scalar encoding of `value`.
    fn hash_value(value: &Self::Value, sink: &mut dyn HashSink);

    fn json_value(value: &Self::Value) -> JsonValue;

    fn validate(_value: &Self::Value) -> Result<()> {
        Ok(())
    }

    /// Whether a primitive holding `value` may be shared.
    fn value_internable(_value: &Self::Value) -> bool {
        false
    }

    /// Whether the raw scalar of `value` hashes like this primitive.
    fn is_bare(_value: &Self::Value) -> bool {
        false
    }

    fn empty() -> Arc<Primitive<Self>>;

    fn interner(ctx: &TypeContext) -> &ValueInterner<Primitive<Self>>;

    fn wrap(value: Arc<Primitive<Self>>) -> Element;

    fn unwrap(element: &Element) -> Option<&Arc<Primitive<Self>>>;
}

/// A FHIR primitive element of kind `K`.
pub struct Primitive<K: PrimitiveKind> {
    extension_data: Arc<ExtensionData>,
    value: Option<K::Value>,
}

impl<K: PrimitiveKind> Primitive<K> {
    /// A primitive holding `value` without id or extensions.
    pub fn new(ctx: &TypeContext, value: K::Value) -> Result<Arc<Self>> {
        Self::with_extension_data(ctx, ExtensionData::empty(), Some(value))
    }

    pub fn with_extension_data(
        ctx: &TypeContext,
        extension_data: Arc<ExtensionData>,
        value: Option<K::Value>,
    ) -> Result<Arc<Self>> {
        if let Some(value) = &value {
            K::validate(value)?;
        }
        Ok(Self::canonical(
            ctx,
            Primitive {
                extension_data,
                value,
            },
        ))
    }

    pub fn value(&self) -> Option<&K::Value> {
        self.value.as_ref()
    }

    /// `true` if the primitive carries an id or extensions.
    pub fn is_extended(&self) -> bool {
        self.extension_data.has_content()
    }

    fn convert(value: &FieldValue) -> Result<K::Value> {
        let converted = match value {
            FieldValue::Element(element) => match element.bare_scalar() {
                Some(raw) => K::from_field(&raw)?,
                None => None,
            },
            other => K::from_field(other)?,
        };
        let converted =
            converted.ok_or_else(|| Error::invalid_field(K::TYPE_NAME, "value", K::TYPE_NAME))?;
        K::validate(&converted)?;
        Ok(converted)
    }
}

impl<K: PrimitiveKind> Clone for Primitive<K> {
    fn clone(&self) -> Self {
        Primitive {
            extension_data: Arc::clone(&self.extension_data),
            value: self.value.clone(),
        }
    }
}

impl<K: PrimitiveKind> PartialEq for Primitive<K> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.extension_data == other.extension_data
    }
}

impl<K: PrimitiveKind> Eq for Primitive<K> {}

impl<K: PrimitiveKind> std::hash::Hash for Primitive<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.extension_data, state);
        std::hash::Hash::hash(&self.value, state);
    }
}

impl<K: PrimitiveKind> fmt::Debug for Primitive<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(K::TYPE_NAME);
        if self.extension_data.has_content() {
            s.field("extension_data", &self.extension_data);
        }
        s.field("value", &self.value).finish()
    }
}

impl<K: PrimitiveKind> FhirType for Primitive<K> {
    const TYPE_NAME: &'static str = K::TYPE_NAME;
    const HASH_MARKER: u8 = K::HASH_MARKER;
    const FIELDS: &'static [&'static str] = &["value"];
    const STRICT_KEYS: bool = true;

    fn blank() -> Self {
        Primitive {
            extension_data: ExtensionData::empty(),
            value: None,
        }
    }

    fn extension_data(&self) -> &Arc<ExtensionData> {
        &self.extension_data
    }

    fn extension_data_mut(&mut self) -> &mut Arc<ExtensionData> {
        &mut self.extension_data
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "value" => self.value.as_ref().map(K::to_field),
            _ => None,
        }
    }

    fn set_field(
        &mut self,
        _ctx: &TypeContext,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<bool> {
        if key != "value" {
            return Ok(false);
        }
        self.value = value.as_ref().map(Self::convert).transpose()?;
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        self.value.is_some()
    }

    fn fields_internable(&self) -> bool {
        self.value.as_ref().map_or(true, K::value_internable)
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        if let Some(value) = &self.value {
            sink.put_byte(FIELD_VALUE);
            K::hash_value(value, sink);
        }
    }

    /// Primitives emit through `json_value` and `json_primitive_extension`.
    fn json_fields(&self, _out: &mut JsonMap<String, JsonValue>) {}

    fn visit_fields<'a>(&'a self, _refs: &mut References<'a>) {}

    fn empty() -> Option<Arc<Self>> {
        Some(K::empty())
    }

    fn interner(ctx: &TypeContext) -> &ValueInterner<Self> {
        K::interner(ctx)
    }

    fn into_element(this: Arc<Self>) -> Element {
        K::wrap(this)
    }

    fn from_element(element: &Element) -> Option<&Arc<Self>> {
        K::unwrap(element)
    }

    fn from_scalar(ctx: &TypeContext, value: &FieldValue) -> Result<Option<Arc<Self>>> {
        K::from_field(value)?
            .map(|value| Self::new(ctx, value))
            .transpose()
    }

    fn bare_scalar(&self) -> Option<FieldValue> {
        match &self.value {
            Some(value) if !self.extension_data.has_content() && K::is_bare(value) => {
                Some(K::to_field(value))
            }
            _ => None,
        }
    }

    fn json_value(&self) -> Option<JsonValue> {
        self.value.as_ref().map(K::json_value)
    }

    fn json_primitive_extension(&self) -> Option<JsonValue> {
        if !self.extension_data.has_content() {
            return None;
        }
        let mut out = JsonMap::new();
        self.extension_data.write_json(&mut out);
        Some(JsonValue::Object(out))
    }
}
