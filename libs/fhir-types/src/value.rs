//! Generic field values
//!
//! Every element can be read and updated through a keyed view whose values are
//! [`FieldValue`]s. Raw scalars (`Boolean` to `DateTime`) are the plain value of
//! a primitive, `Element` holds a typed FHIR element, and `List`/`Map` are the
//! generic containers used by parsers and host bookkeeping.

use crate::element::Element;
use crate::primitive::{DateTimeValue, DateValue};
use crate::references::References;
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Key carrying the FHIR type of a generic map, e.g. `Bundle.entry`.
pub const FHIR_TYPE_KEY: &str = "fhir/type";

/// FHIR type of a bundle entry wrapping a complete embedded resource.
pub const BUNDLE_ENTRY_TYPE: &str = "Bundle.entry";

/// Host bookkeeping attached to an element. Never part of its FHIR content.
pub type Metadata = Arc<GenericMap>;

#[derive(Clone, Debug)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Decimal(Decimal),
    String(Arc<str>),
    /// A symbolic code, e.g. an enumerated value or a FHIR type name.
    Code(Arc<str>),
    Date(DateValue),
    DateTime(DateTimeValue),
    Element(Element),
    List(Arc<[FieldValue]>),
    Map(Arc<GenericMap>),
}

impl FieldValue {
    pub fn code(value: impl AsRef<str>) -> Self {
        FieldValue::Code(Arc::from(value.as_ref()))
    }

    pub fn list(values: impl IntoIterator<Item = FieldValue>) -> Self {
        FieldValue::List(values.into_iter().collect())
    }

    /// `true` for empty lists and maps, which count as absent.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::List(items) => items.is_empty(),
            FieldValue::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// `true` for raw scalars, which can never contain references.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self,
            FieldValue::Element(_) | FieldValue::List(_) | FieldValue::Map(_)
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) | FieldValue::Code(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            FieldValue::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&GenericMap> {
        match self {
            FieldValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Lazily extract the `(type, id)` pairs of all local references.
    pub fn references(&self) -> References<'_> {
        References::new(self)
    }

    /// Short description of the value's shape for error messages.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            FieldValue::Boolean(_) => "boolean",
            FieldValue::Integer(_) => "integer",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::String(_) => "string",
            FieldValue::Code(_) => "code",
            FieldValue::Date(_) => "date",
            FieldValue::DateTime(_) => "dateTime",
            FieldValue::Element(e) => e.type_name(),
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
        }
    }
}

/// Decimals are equal only with equal scale, `1.0` and `1.00` differ.
pub(crate) fn decimal_eq(a: &Decimal, b: &Decimal) -> bool {
    a.mantissa() == b.mantissa() && a.scale() == b.scale()
}

impl PartialEq for FieldValue {
    fn eq(&self, other: &Self) -> bool {
        use FieldValue as V;
        match (self, other) {
            (V::Boolean(a), V::Boolean(b)) => a == b,
            (V::Integer(a), V::Integer(b)) => a == b,
            (V::Decimal(a), V::Decimal(b)) => decimal_eq(a, b),
            (V::String(a), V::String(b)) | (V::Code(a), V::Code(b)) => a == b,
            (V::Date(a), V::Date(b)) => a == b,
            (V::DateTime(a), V::DateTime(b)) => a == b,
            (V::Element(a), V::Element(b)) => a == b,
            (V::List(a), V::List(b)) => a == b,
            (V::Map(a), V::Map(b)) => a == b,
            // a raw scalar equals a primitive element that wraps only that scalar
            (V::Element(e), scalar) | (scalar, V::Element(e)) if scalar.is_scalar() => {
                e.bare_scalar().as_ref() == Some(scalar)
            }
            _ => false,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(value.into())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(Arc::from(value))
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(Arc::from(value))
    }
}

impl From<Element> for FieldValue {
    fn from(value: Element) -> Self {
        FieldValue::Element(value)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(values: Vec<FieldValue>) -> Self {
        FieldValue::List(values.into())
    }
}

impl From<GenericMap> for FieldValue {
    fn from(map: GenericMap) -> Self {
        FieldValue::Map(Arc::new(map))
    }
}

/// An insertion-ordered map of field values.
///
/// Absent and empty values are never stored, so a key mapped to an empty list
/// and a missing key are the same map. Equality ignores insertion order.
#[derive(Clone, Debug, Default)]
pub struct GenericMap {
    entries: IndexMap<Arc<str>, FieldValue>,
}

impl GenericMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `value` under `key`; an empty value removes the key instead.
    pub fn insert(&mut self, key: impl AsRef<str>, value: FieldValue) {
        let key = key.as_ref();
        if value.is_empty() {
            self.entries.shift_remove(key);
        } else {
            self.entries.insert(Arc::from(key), value);
        }
    }

    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<FieldValue>) -> Self {
        self.insert(key, value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.entries.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (&**k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| &**k)
    }

    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.entries.values()
    }

    /// Entries ordered by key, independent of insertion order.
    pub fn sorted_entries(&self) -> Vec<(&str, &FieldValue)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// The FHIR type stored under [`FHIR_TYPE_KEY`], if any.
    pub fn fhir_type(&self) -> Option<&str> {
        self.get(FHIR_TYPE_KEY).and_then(FieldValue::as_str)
    }

    pub fn is_bundle_entry(&self) -> bool {
        self.fhir_type() == Some(BUNDLE_ENTRY_TYPE)
    }
}

impl PartialEq for GenericMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|v| v == value))
    }
}

impl<K: AsRef<str>> FromIterator<(K, FieldValue)> for GenericMap {
    fn from_iter<I: IntoIterator<Item = (K, FieldValue)>>(iter: I) -> Self {
        let mut map = GenericMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

/// An ordered, possibly empty list of elements.
///
/// The empty list is always represented as `None`, so there is exactly one
/// canonical empty value per element type and it never allocates.
#[derive(Debug)]
pub struct Elements<T>(Option<Arc<[Arc<T>]>>);

impl<T> Elements<T> {
    pub const fn empty() -> Self {
        Elements(None)
    }

    pub fn as_slice(&self) -> &[Arc<T>] {
        self.0.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<T>> {
        self.as_slice().iter()
    }
}

impl<T> Default for Elements<T> {
    fn default() -> Self {
        Elements(None)
    }
}

impl<T> Clone for Elements<T> {
    fn clone(&self) -> Self {
        Elements(self.0.clone())
    }
}

impl<T> From<Vec<Arc<T>>> for Elements<T> {
    fn from(items: Vec<Arc<T>>) -> Self {
        if items.is_empty() {
            Elements(None)
        } else {
            Elements(Some(items.into()))
        }
    }
}

impl<T> FromIterator<Arc<T>> for Elements<T> {
    fn from_iter<I: IntoIterator<Item = Arc<T>>>(iter: I) -> Self {
        iter.into_iter().collect::<Vec<_>>().into()
    }
}

impl<'a, T> IntoIterator for &'a Elements<T> {
    type Item = &'a Arc<T>;
    type IntoIter = std::slice::Iter<'a, Arc<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for Elements<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for Elements<T> {}

impl<T: std::hash::Hash> std::hash::Hash for Elements<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(self.as_slice(), state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_values_are_not_stored() {
        let mut map = GenericMap::new().with("a", 1);
        map.insert("b", FieldValue::list([]));
        map.insert("a", FieldValue::Map(Arc::new(GenericMap::new())));
        assert!(map.is_empty());
    }

    #[test]
    fn map_equality_ignores_order() {
        let a = GenericMap::new().with("x", 1).with("y", "b");
        let b = GenericMap::new().with("y", "b").with("x", 1);
        assert_eq!(a, b);
        assert_eq!(
            b.sorted_entries().iter().map(|e| e.0).collect::<Vec<_>>(),
            vec!["x", "y"]
        );
    }

    #[test]
    fn decimal_equality_respects_scale() {
        let one: Decimal = "1.0".parse().unwrap();
        let one_00: Decimal = "1.00".parse().unwrap();
        assert_ne!(FieldValue::from(one), FieldValue::from(one_00));
        assert_eq!(FieldValue::from(one), FieldValue::from(one));
    }

    #[test]
    fn empty_elements_are_canonical() {
        let items: Elements<u8> = Vec::new().into();
        assert!(items.is_empty());
        assert_eq!(items, Elements::empty());
        assert_eq!(items.len(), 0);
    }
}
