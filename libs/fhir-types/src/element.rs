//! The element protocol shared by every FHIR value type
//!
//! Concrete types implement [`FhirType`] by describing their own fields; the
//! trait's provided methods implement everything else once:
//!
//! - canonicalization (`canonical`): all-absent values collapse to the type's
//!   EMPTY singleton, internable values go through the type's interner
//! - the generic keyed view (`get`, `keys`) and copy-on-write `assoc`
//! - structural hashing (`hash_into`) and JSON emission (`to_json`)
//!
//! [`Element`] is the closed sum of all concrete types and is what generic
//! containers, choice fields and extension values hold.

use crate::complex::{
    Annotation, BundleEntrySearch, CodeableConcept, Coding, Identifier, Period, Quantity,
    Reference,
};
use crate::context::TypeContext;
use crate::error::{Error, Result};
use crate::extension::{Extension, ExtensionData};
use crate::hash::{self, Hash, HashSink, Sha256Sink, LIST_MARKER};
use crate::intern::ValueInterner;
use crate::primitive::{
    Boolean, Canonical, Code, Date, DateTime, FhirDecimal, FhirString, Id, Integer, Integer64,
    Markdown, PositiveInt, UnsignedInt, Uri,
};
use crate::references::{RefSource, References};
use crate::value::{Elements, FieldValue, GenericMap, Metadata, FHIR_TYPE_KEY};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use std::sync::Arc;

pub trait FhirType: Clone + Eq + std::hash::Hash + fmt::Debug + Send + Sync + 'static {
    const TYPE_NAME: &'static str;
    /// Frozen one-byte type marker of the structural hash.
    const HASH_MARKER: u8;
    /// Type-specific keys in declaration order, without `id` and `extension`.
    const FIELDS: &'static [&'static str];
    /// Primitives reject unknown keys, composites ignore them.
    const STRICT_KEYS: bool = false;
    /// Keys of [`FIELDS`](FhirType::FIELDS) holding lists. Reading one that is
    /// absent yields the empty list.
    const LIST_FIELDS: &'static [&'static str] = &[];

    /// A value with every field absent.
    fn blank() -> Self;

    fn extension_data(&self) -> &Arc<ExtensionData>;

    fn extension_data_mut(&mut self) -> &mut Arc<ExtensionData>;

    /// Read a type-specific field.
    fn field(&self, key: &str) -> Option<FieldValue>;

    /// Replace a type-specific field. Returns `Ok(false)` for unknown keys.
    fn set_field(&mut self, ctx: &TypeContext, key: &str, value: Option<FieldValue>)
        -> Result<bool>;

    /// `true` if any type-specific field is present.
    fn has_fields(&self) -> bool;

    fn fields_internable(&self) -> bool;

    /// Write the type-specific fields, each prefixed by its field marker.
    fn hash_fields(&self, sink: &mut dyn HashSink);

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>);

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>);

    /// The process-wide all-absent instance, if the type has one.
    fn empty() -> Option<Arc<Self>>;

    fn interner(ctx: &TypeContext) -> &ValueInterner<Self>;

    fn into_element(this: Arc<Self>) -> Element;

    fn from_element(element: &Element) -> Option<&Arc<Self>>;

    /// Build a value from a raw scalar. Only primitives accept scalars.
    fn from_scalar(_ctx: &TypeContext, _value: &FieldValue) -> Result<Option<Arc<Self>>> {
        Ok(None)
    }

    /// Checks that must hold after every construction and update.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// The raw scalar this value is interchangeable with, if it wraps only that.
    fn bare_scalar(&self) -> Option<FieldValue> {
        None
    }

    /// JSON emitted under the field name. `None` for primitives without value.
    fn json_value(&self) -> Option<JsonValue> {
        let mut out = JsonMap::new();
        self.extension_data().write_json(&mut out);
        self.json_fields(&mut out);
        Some(JsonValue::Object(out))
    }

    /// The sibling `_field` object of primitives carrying an id or extensions.
    fn json_primitive_extension(&self) -> Option<JsonValue> {
        None
    }

    fn visit_references<'a>(&'a self, refs: &mut References<'a>) {
        refs.push(&**self.extension_data());
        self.visit_fields(refs);
    }

    fn is_internable(&self) -> bool {
        self.extension_data().is_internable() && self.fields_internable()
    }

    /// The canonical instance for `value`.
    fn canonical(ctx: &TypeContext, value: Self) -> Arc<Self> {
        if !value.has_fields() && value.extension_data().is_empty() {
            if let Some(empty) = Self::empty() {
                return empty;
            }
        }
        let interner = Self::interner(ctx);
        if interner.is_enabled() && value.is_internable() {
            let mut sink = Sha256Sink::new();
            value.hash_into(&mut sink);
            return interner.intern_value(sink.finish(), value);
        }
        Arc::new(value)
    }

    /// Build a value from a generic field map.
    fn create(ctx: &TypeContext, map: &GenericMap) -> Result<Arc<Self>> {
        let mut value = Self::blank();
        *value.extension_data_mut() = ExtensionData::from_map(ctx, Self::TYPE_NAME, map)?;
        for (key, field) in map.iter() {
            if matches!(key, "id" | "extension" | FHIR_TYPE_KEY) {
                continue;
            }
            if !value.set_field(ctx, key, Some(field.clone()))? {
                unknown_key::<Self>(key)?;
            }
        }
        value.validate()?;
        Ok(Self::canonical(ctx, value))
    }

    /// A copy of `this` with `key` replaced by `value`.
    ///
    /// Untouched fields are shared with `this`. Absent values and empty lists
    /// clear the field. Unknown keys return `this` for composites and an
    /// [`Error::UnsupportedField`] for primitives.
    ///
    /// Raw scalars become the field's declared primitive, so `get` returns an
    /// element. It equals the raw scalar only where both hash alike: a string
    /// stored in a `uri` field reads back as a `uri`.
    fn assoc(
        this: &Arc<Self>,
        ctx: &TypeContext,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<Arc<Self>> {
        let value = value.filter(|v| !v.is_empty());
        let mut next = Self::clone(this);
        match key {
            "id" | "extension" => {
                *next.extension_data_mut() =
                    ExtensionData::assoc(this.extension_data(), ctx, Self::TYPE_NAME, key, value)?;
            }
            _ => {
                if !next.set_field(ctx, key, value)? {
                    unknown_key::<Self>(key)?;
                    return Ok(Arc::clone(this));
                }
            }
        }
        next.validate()?;
        Ok(Self::canonical(ctx, next))
    }

    fn without(this: &Arc<Self>, ctx: &TypeContext, key: &str) -> Result<Arc<Self>> {
        Self::assoc(this, ctx, key, None)
    }

    /// A copy of `this` carrying `meta`. Metadata never affects the hash.
    fn with_meta(this: &Arc<Self>, ctx: &TypeContext, meta: Option<Metadata>) -> Arc<Self> {
        let mut next = Self::clone(this);
        *next.extension_data_mut() = ExtensionData::with_meta(this.extension_data(), ctx, meta);
        Self::canonical(ctx, next)
    }

    /// Read a field. List fields never read as absent, only as empty.
    fn get(&self, key: &str) -> Option<FieldValue> {
        match key {
            "id" | "extension" => self.extension_data().get(key),
            _ => self.field(key).or_else(|| field_or_empty(Self::LIST_FIELDS, key)),
        }
    }

    /// Keys of present fields in declaration order.
    fn keys(&self) -> Vec<&'static str> {
        let mut keys = self.extension_data().keys();
        keys.extend(
            Self::FIELDS
                .iter()
                .copied()
                .filter(|key| self.field(key).is_some()),
        );
        keys
    }

    fn hash_into(&self, sink: &mut dyn HashSink) {
        sink.put_byte(Self::HASH_MARKER);
        self.extension_data().hash_into(sink);
        self.hash_fields(sink);
    }

    fn to_json(&self) -> JsonValue {
        self.json_value().unwrap_or(JsonValue::Null)
    }
}

/// The canonical empty list for list-valued `key`, `None` otherwise.
pub(crate) fn field_or_empty(list_fields: &[&str], key: &str) -> Option<FieldValue> {
    list_fields
        .contains(&key)
        .then(|| FieldValue::list([]))
}

fn unknown_key<T: FhirType>(key: &str) -> Result<()> {
    if T::STRICT_KEYS {
        return Err(Error::UnsupportedField {
            type_name: T::TYPE_NAME,
            key: key.to_string(),
        });
    }
    tracing::trace!(type_name = T::TYPE_NAME, key, "ignoring unknown key");
    Ok(())
}

impl<T: FhirType> RefSource for T {
    fn expand<'a>(&'a self, refs: &mut References<'a>) {
        self.visit_references(refs);
    }
}

/// Process-wide EMPTY instance stored in `cell`.
pub(crate) fn empty_singleton<T: FhirType>(cell: &'static std::sync::OnceLock<Arc<T>>) -> Arc<T> {
    Arc::clone(cell.get_or_init(|| Arc::new(T::blank())))
}

/// Convert a generic value into a typed element of type `T`.
pub(crate) fn element_from_value<T: FhirType>(
    ctx: &TypeContext,
    owner: &'static str,
    key: &str,
    value: FieldValue,
) -> Result<Arc<T>> {
    let converted = match &value {
        FieldValue::Element(element) => T::from_element(element).cloned(),
        FieldValue::Map(map) => Some(T::create(ctx, map)?),
        FieldValue::List(_) => None,
        scalar => T::from_scalar(ctx, scalar)?,
    };
    converted.ok_or_else(|| Error::invalid_field(owner, key, T::TYPE_NAME))
}

/// Writes `"name": value` and, for extended primitives, `"_name": {...}`.
pub(crate) fn write_property<T: FhirType>(
    out: &mut JsonMap<String, JsonValue>,
    name: &str,
    value: &T,
) {
    if let Some(json) = value.json_value() {
        out.insert(name.to_string(), json);
    }
    if let Some(ext) = value.json_primitive_extension() {
        out.insert(format!("_{name}"), ext);
    }
}

/// JSON name of a choice field, e.g. `value` + `dateTime` = `valueDateTime`.
pub(crate) fn choice_name(prefix: &str, type_name: &str) -> String {
    let mut chars = type_name.chars();
    match chars.next() {
        Some(first) => format!("{prefix}{}{}", first.to_ascii_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

/// A typed field of a composite.
pub(crate) trait Slot: Sized {
    fn is_absent(&self) -> bool;

    fn is_internable(&self) -> bool;

    fn to_value(&self) -> Option<FieldValue>;

    fn from_value(
        ctx: &TypeContext,
        owner: &'static str,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<Self>;

    /// Write the value encoding. Only called for present fields.
    fn write_hash(&self, sink: &mut dyn HashSink);

    fn write_json(&self, out: &mut JsonMap<String, JsonValue>, name: &str);

    fn visit<'a>(&'a self, refs: &mut References<'a>);
}

/// Writes `marker` and the field's encoding unless the field is absent.
pub(crate) fn hash_slot(sink: &mut dyn HashSink, marker: u8, slot: &impl Slot) {
    if !slot.is_absent() {
        sink.put_byte(marker);
        slot.write_hash(sink);
    }
}

impl<T: FhirType> Slot for Option<Arc<T>> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn is_internable(&self) -> bool {
        self.as_ref().map_or(true, |value| value.is_internable())
    }

    fn to_value(&self) -> Option<FieldValue> {
        self.as_ref()
            .map(|value| FieldValue::Element(T::into_element(Arc::clone(value))))
    }

    fn from_value(
        ctx: &TypeContext,
        owner: &'static str,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<Self> {
        value
            .map(|value| element_from_value::<T>(ctx, owner, key, value))
            .transpose()
    }

    fn write_hash(&self, sink: &mut dyn HashSink) {
        if let Some(value) = self {
            value.hash_into(sink);
        }
    }

    fn write_json(&self, out: &mut JsonMap<String, JsonValue>, name: &str) {
        if let Some(value) = self {
            write_property(out, name, &**value);
        }
    }

    fn visit<'a>(&'a self, refs: &mut References<'a>) {
        if let Some(value) = self {
            refs.push(&**value);
        }
    }
}

impl<T: FhirType> Slot for Elements<T> {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }

    fn is_internable(&self) -> bool {
        self.iter().all(|value| value.is_internable())
    }

    fn to_value(&self) -> Option<FieldValue> {
        if self.is_empty() {
            return None;
        }
        Some(FieldValue::list(self.iter().map(|value| {
            FieldValue::Element(T::into_element(Arc::clone(value)))
        })))
    }

    fn from_value(
        ctx: &TypeContext,
        owner: &'static str,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<Self> {
        match value {
            None => Ok(Elements::empty()),
            Some(FieldValue::List(items)) => items
                .iter()
                .map(|item| element_from_value::<T>(ctx, owner, key, item.clone()))
                .collect(),
            Some(_) => Err(Error::invalid_field(owner, key, "list")),
        }
    }

    fn write_hash(&self, sink: &mut dyn HashSink) {
        sink.put_byte(LIST_MARKER);
        for value in self {
            value.hash_into(sink);
        }
    }

    fn write_json(&self, out: &mut JsonMap<String, JsonValue>, name: &str) {
        if self.is_empty() {
            return;
        }
        let values: Vec<JsonValue> = self
            .iter()
            .map(|value| value.json_value().unwrap_or(JsonValue::Null))
            .collect();
        let extensions: Vec<Option<JsonValue>> = self
            .iter()
            .map(|value| value.json_primitive_extension())
            .collect();

        if values.iter().any(|v| !v.is_null()) {
            out.insert(name.to_string(), JsonValue::Array(values));
        }
        if extensions.iter().any(Option::is_some) {
            let extensions = extensions
                .into_iter()
                .map(|ext| ext.unwrap_or(JsonValue::Null))
                .collect();
            out.insert(format!("_{name}"), JsonValue::Array(extensions));
        }
    }

    fn visit<'a>(&'a self, refs: &mut References<'a>) {
        for value in self {
            refs.push(&**value);
        }
    }
}

/// Open choice over every element type except Extension.
impl Slot for Option<Element> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn is_internable(&self) -> bool {
        self.as_ref().map_or(true, Element::is_internable)
    }

    fn to_value(&self) -> Option<FieldValue> {
        self.clone().map(FieldValue::Element)
    }

    fn from_value(
        ctx: &TypeContext,
        owner: &'static str,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<Self> {
        let Some(value) = value else {
            return Ok(None);
        };
        match value {
            FieldValue::Element(Element::Extension(_)) => {
                Err(Error::invalid_field(owner, key, "a non-Extension element"))
            }
            FieldValue::Element(element) => Ok(Some(element)),
            scalar if scalar.is_scalar() => Element::from_scalar(ctx, &scalar).map(Some),
            _ => Err(Error::invalid_field(owner, key, "an element")),
        }
    }

    fn write_hash(&self, sink: &mut dyn HashSink) {
        if let Some(element) = self {
            element.hash_into(sink);
        }
    }

    fn write_json(&self, out: &mut JsonMap<String, JsonValue>, name: &str) {
        if let Some(element) = self {
            element.write_property(out, &choice_name(name, element.type_name()));
        }
    }

    fn visit<'a>(&'a self, refs: &mut References<'a>) {
        if let Some(element) = self {
            refs.push(element);
        }
    }
}

/// Any FHIR element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Element {
    Boolean(Arc<Boolean>),
    Integer(Arc<Integer>),
    Integer64(Arc<Integer64>),
    String(Arc<FhirString>),
    Decimal(Arc<FhirDecimal>),
    Uri(Arc<Uri>),
    Canonical(Arc<Canonical>),
    Date(Arc<Date>),
    DateTime(Arc<DateTime>),
    Code(Arc<Code>),
    Id(Arc<Id>),
    Markdown(Arc<Markdown>),
    UnsignedInt(Arc<UnsignedInt>),
    PositiveInt(Arc<PositiveInt>),
    Coding(Arc<Coding>),
    CodeableConcept(Arc<CodeableConcept>),
    Quantity(Arc<Quantity>),
    Period(Arc<Period>),
    Identifier(Arc<Identifier>),
    Reference(Arc<Reference>),
    Annotation(Arc<Annotation>),
    BundleEntrySearch(Arc<BundleEntrySearch>),
    Extension(Arc<Extension>),
}

macro_rules! dispatch {
    ($element:expr, $inner:ident => $body:expr) => {
        match $element {
            Element::Boolean($inner) => $body,
            Element::Integer($inner) => $body,
            Element::Integer64($inner) => $body,
            Element::String($inner) => $body,
            Element::Decimal($inner) => $body,
            Element::Uri($inner) => $body,
            Element::Canonical($inner) => $body,
            Element::Date($inner) => $body,
            Element::DateTime($inner) => $body,
            Element::Code($inner) => $body,
            Element::Id($inner) => $body,
            Element::Markdown($inner) => $body,
            Element::UnsignedInt($inner) => $body,
            Element::PositiveInt($inner) => $body,
            Element::Coding($inner) => $body,
            Element::CodeableConcept($inner) => $body,
            Element::Quantity($inner) => $body,
            Element::Period($inner) => $body,
            Element::Identifier($inner) => $body,
            Element::Reference($inner) => $body,
            Element::Annotation($inner) => $body,
            Element::BundleEntrySearch($inner) => $body,
            Element::Extension($inner) => $body,
        }
    };
}

fn type_name_of<T: FhirType>(_: &T) -> &'static str {
    T::TYPE_NAME
}

fn keys_of<T: FhirType>(value: &T) -> Vec<&'static str> {
    value.keys()
}

impl Element {
    pub fn type_name(&self) -> &'static str {
        dispatch!(self, e => type_name_of(&**e))
    }

    pub fn extension_data(&self) -> &Arc<ExtensionData> {
        dispatch!(self, e => e.extension_data())
    }

    pub fn meta(&self) -> Option<&Metadata> {
        self.extension_data().meta()
    }

    pub fn get(&self, key: &str) -> Option<FieldValue> {
        dispatch!(self, e => e.get(key))
    }

    /// Keys of present fields: `id`, `extension`, then the type's fields.
    pub fn keys(&self) -> Vec<&'static str> {
        dispatch!(self, e => keys_of(&**e))
    }

    pub fn count(&self) -> usize {
        self.keys().len()
    }

    /// `true` if `key` is present. Empty lists don't count.
    pub fn contains_key(&self, key: &str) -> bool {
        self.keys().contains(&key)
    }

    /// Present fields with their values, in declaration order.
    pub fn entries(&self) -> Vec<(&'static str, FieldValue)> {
        self.keys()
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .collect()
    }

    pub fn assoc(&self, ctx: &TypeContext, key: &str, value: Option<FieldValue>) -> Result<Element> {
        dispatch!(self, e => FhirType::assoc(e, ctx, key, value).map(|v| FhirType::into_element(v)))
    }

    pub fn without(&self, ctx: &TypeContext, key: &str) -> Result<Element> {
        self.assoc(ctx, key, None)
    }

    pub fn with_meta(&self, ctx: &TypeContext, meta: Option<Metadata>) -> Element {
        dispatch!(self, e => FhirType::into_element(FhirType::with_meta(e, ctx, meta)))
    }

    pub fn is_internable(&self) -> bool {
        dispatch!(self, e => e.is_internable())
    }

    pub fn hash_into(&self, sink: &mut dyn HashSink) {
        dispatch!(self, e => e.hash_into(sink))
    }

    pub fn hash(&self) -> Hash {
        hash::hash(self)
    }

    pub fn to_json(&self) -> JsonValue {
        dispatch!(self, e => e.to_json())
    }

    /// Lazily extract the `(type, id)` pairs of all local references.
    pub fn references(&self) -> References<'_> {
        References::new(self)
    }

    /// `true` if both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Element) -> bool {
        self.data_ptr() == other.data_ptr()
    }

    fn data_ptr(&self) -> *const () {
        dispatch!(self, e => Arc::as_ptr(e) as *const ())
    }

    pub(crate) fn bare_scalar(&self) -> Option<FieldValue> {
        dispatch!(self, e => e.bare_scalar())
    }

    pub(crate) fn write_property(&self, out: &mut JsonMap<String, JsonValue>, name: &str) {
        dispatch!(self, e => write_property(out, name, &**e))
    }

    /// Wrap a raw scalar into the primitive element it hashes like.
    pub fn from_scalar(ctx: &TypeContext, value: &FieldValue) -> Result<Element> {
        let element = match value {
            FieldValue::Boolean(b) => Element::Boolean(Boolean::new(ctx, *b)?),
            FieldValue::Integer(n) => match i32::try_from(*n) {
                Ok(n) => Element::Integer(Integer::new(ctx, n)?),
                Err(_) => Element::Integer64(Integer64::new(ctx, *n)?),
            },
            FieldValue::Decimal(d) => Element::Decimal(FhirDecimal::new(ctx, (*d).into())?),
            FieldValue::String(s) => Element::String(FhirString::new(ctx, Arc::clone(s))?),
            FieldValue::Code(s) => Element::Code(Code::new(ctx, Arc::clone(s))?),
            FieldValue::Date(d) => Element::Date(Date::new(ctx, *d)?),
            FieldValue::DateTime(dt) => Element::DateTime(DateTime::new(ctx, *dt)?),
            other => return Err(Error::validation("Element", format!("{} is not a scalar", other.kind()))),
        };
        Ok(element)
    }
}

impl RefSource for Element {
    fn expand<'a>(&'a self, refs: &mut References<'a>) {
        dispatch!(self, e => e.visit_references(refs))
    }
}

impl<T: FhirType> From<Arc<T>> for Element {
    fn from(value: Arc<T>) -> Self {
        T::into_element(value)
    }
}
