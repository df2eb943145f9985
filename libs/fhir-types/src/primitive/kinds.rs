//! The concrete primitive kinds
//!
//! Interning policy: boolean, code, uri and canonical values are always
//! shared, strings only up to four bytes, every other kind only without a
//! value.

use super::temporal::{DateTimeValue, DateValue};
use super::{Primitive, PrimitiveKind};
use crate::context::TypeContext;
use crate::element::{empty_singleton, Element};
use crate::error::{Error, Result};
use crate::hash::{
    markers, write_bool, write_decimal, write_int, write_long, write_string, HashSink,
};
use crate::intern::ValueInterner;
use crate::value::{decimal_eq, FieldValue};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};

pub type Boolean = Primitive<BooleanKind>;
pub type Integer = Primitive<IntegerKind>;
pub type Integer64 = Primitive<Integer64Kind>;
pub type FhirString = Primitive<StringKind>;
pub type FhirDecimal = Primitive<DecimalKind>;
pub type Uri = Primitive<UriKind>;
pub type Canonical = Primitive<CanonicalKind>;
pub type Date = Primitive<DateKind>;
pub type DateTime = Primitive<DateTimeKind>;
pub type Code = Primitive<CodeKind>;
pub type Id = Primitive<IdKind>;
pub type Markdown = Primitive<MarkdownKind>;
pub type UnsignedInt = Primitive<UnsignedIntKind>;
pub type PositiveInt = Primitive<PositiveIntKind>;

/// Maximum byte length of string values that are still interned.
const MAX_INTERNED_STRING_LEN: usize = 4;

macro_rules! kind_plumbing {
    ($kind:ty, $variant:ident, $table:ident) => {
        fn empty() -> Arc<Primitive<Self>> {
            static EMPTY: OnceLock<Arc<Primitive<$kind>>> = OnceLock::new();
            empty_singleton(&EMPTY)
        }

        fn interner(ctx: &TypeContext) -> &ValueInterner<Primitive<Self>> {
            &ctx.$table
        }

        fn wrap(value: Arc<Primitive<Self>>) -> Element {
            Element::$variant(value)
        }

        fn unwrap(element: &Element) -> Option<&Arc<Primitive<Self>>> {
            match element {
                Element::$variant(value) => Some(value),
                _ => None,
            }
        }
    };
}

fn string_value(value: &FieldValue) -> Option<Arc<str>> {
    match value {
        FieldValue::String(s) | FieldValue::Code(s) => Some(Arc::clone(s)),
        _ => None,
    }
}

fn int32_value(type_name: &'static str, value: &FieldValue) -> Result<Option<i32>> {
    match value {
        FieldValue::Integer(n) => i32::try_from(*n)
            .map(Some)
            .map_err(|_| Error::validation(type_name, format!("{n} doesn't fit 32 bits"))),
        _ => Ok(None),
    }
}

fn string_json(value: &Arc<str>) -> JsonValue {
    JsonValue::String(value.to_string())
}

#[derive(Clone, Copy, Debug)]
pub struct BooleanKind;

impl PrimitiveKind for BooleanKind {
    type Value = bool;
    const TYPE_NAME: &'static str = "boolean";
    const HASH_MARKER: u8 = markers::BOOLEAN;

    fn from_field(value: &FieldValue) -> Result<Option<bool>> {
        Ok(match value {
            FieldValue::Boolean(b) => Some(*b),
            _ => None,
        })
    }

    fn to_field(value: &bool) -> FieldValue {
        FieldValue::Boolean(*value)
    }

    fn hash_value(value: &bool, sink: &mut dyn HashSink) {
        write_bool(sink, *value);
    }

    fn json_value(value: &bool) -> JsonValue {
        JsonValue::Bool(*value)
    }

    fn value_internable(_value: &bool) -> bool {
        true
    }

    fn is_bare(_value: &bool) -> bool {
        true
    }

    kind_plumbing!(BooleanKind, Boolean, boolean);
}

#[derive(Clone, Copy, Debug)]
pub struct IntegerKind;

impl PrimitiveKind for IntegerKind {
    type Value = i32;
    const TYPE_NAME: &'static str = "integer";
    const HASH_MARKER: u8 = markers::INTEGER;

    fn from_field(value: &FieldValue) -> Result<Option<i32>> {
        int32_value(Self::TYPE_NAME, value)
    }

    fn to_field(value: &i32) -> FieldValue {
        FieldValue::Integer((*value).into())
    }

    fn hash_value(value: &i32, sink: &mut dyn HashSink) {
        write_int(sink, *value);
    }

    fn json_value(value: &i32) -> JsonValue {
        JsonValue::from(*value)
    }

    fn is_bare(_value: &i32) -> bool {
        true
    }

    kind_plumbing!(IntegerKind, Integer, integer);
}

#[derive(Clone, Copy, Debug)]
pub struct Integer64Kind;

impl PrimitiveKind for Integer64Kind {
    type Value = i64;
    const TYPE_NAME: &'static str = "integer64";
    const HASH_MARKER: u8 = markers::INTEGER64;

    fn from_field(value: &FieldValue) -> Result<Option<i64>> {
        Ok(match value {
            FieldValue::Integer(n) => Some(*n),
            _ => None,
        })
    }

    fn to_field(value: &i64) -> FieldValue {
        FieldValue::Integer(*value)
    }

    fn hash_value(value: &i64, sink: &mut dyn HashSink) {
        write_long(sink, *value);
    }

    /// integer64 is a JSON string so that readers without 64-bit numbers
    /// don't lose precision.
    fn json_value(value: &i64) -> JsonValue {
        JsonValue::String(value.to_string())
    }

    fn is_bare(value: &i64) -> bool {
        i32::try_from(*value).is_err()
    }

    kind_plumbing!(Integer64Kind, Integer64, integer64);
}

#[derive(Clone, Copy, Debug)]
pub struct StringKind;

impl PrimitiveKind for StringKind {
    type Value = Arc<str>;
    const TYPE_NAME: &'static str = "string";
    const HASH_MARKER: u8 = markers::STRING;

    fn from_field(value: &FieldValue) -> Result<Option<Arc<str>>> {
        Ok(string_value(value))
    }

    fn to_field(value: &Arc<str>) -> FieldValue {
        FieldValue::String(Arc::clone(value))
    }

    fn hash_value(value: &Arc<str>, sink: &mut dyn HashSink) {
        write_string(sink, value);
    }

    fn json_value(value: &Arc<str>) -> JsonValue {
        string_json(value)
    }

    fn value_internable(value: &Arc<str>) -> bool {
        value.len() <= MAX_INTERNED_STRING_LEN
    }

    fn is_bare(_value: &Arc<str>) -> bool {
        true
    }

    kind_plumbing!(StringKind, String, string);
}

#[derive(Clone, Copy, Debug)]
pub struct CodeKind;

impl PrimitiveKind for CodeKind {
    type Value = Arc<str>;
    const TYPE_NAME: &'static str = "code";
    const HASH_MARKER: u8 = markers::CODE;

    fn from_field(value: &FieldValue) -> Result<Option<Arc<str>>> {
        Ok(string_value(value))
    }

    fn to_field(value: &Arc<str>) -> FieldValue {
        FieldValue::Code(Arc::clone(value))
    }

    fn hash_value(value: &Arc<str>, sink: &mut dyn HashSink) {
        write_string(sink, value);
    }

    fn json_value(value: &Arc<str>) -> JsonValue {
        string_json(value)
    }

    fn value_internable(_value: &Arc<str>) -> bool {
        true
    }

    fn is_bare(_value: &Arc<str>) -> bool {
        true
    }

    kind_plumbing!(CodeKind, Code, code);
}

#[derive(Clone, Copy, Debug)]
pub struct UriKind;

impl PrimitiveKind for UriKind {
    type Value = Arc<str>;
    const TYPE_NAME: &'static str = "uri";
    const HASH_MARKER: u8 = markers::URI;

    fn from_field(value: &FieldValue) -> Result<Option<Arc<str>>> {
        Ok(string_value(value))
    }

    fn to_field(value: &Arc<str>) -> FieldValue {
        FieldValue::String(Arc::clone(value))
    }

    fn hash_value(value: &Arc<str>, sink: &mut dyn HashSink) {
        write_string(sink, value);
    }

    fn json_value(value: &Arc<str>) -> JsonValue {
        string_json(value)
    }

    fn value_internable(_value: &Arc<str>) -> bool {
        true
    }

    kind_plumbing!(UriKind, Uri, uri);
}

#[derive(Clone, Copy, Debug)]
pub struct CanonicalKind;

impl PrimitiveKind for CanonicalKind {
    type Value = Arc<str>;
    const TYPE_NAME: &'static str = "canonical";
    const HASH_MARKER: u8 = markers::CANONICAL;

    fn from_field(value: &FieldValue) -> Result<Option<Arc<str>>> {
        Ok(string_value(value))
    }

    fn to_field(value: &Arc<str>) -> FieldValue {
        FieldValue::String(Arc::clone(value))
    }

    fn hash_value(value: &Arc<str>, sink: &mut dyn HashSink) {
        write_string(sink, value);
    }

    fn json_value(value: &Arc<str>) -> JsonValue {
        string_json(value)
    }

    fn value_internable(_value: &Arc<str>) -> bool {
        true
    }

    kind_plumbing!(CanonicalKind, Canonical, canonical);
}

#[derive(Clone, Copy, Debug)]
pub struct IdKind;

impl PrimitiveKind for IdKind {
    type Value = Arc<str>;
    const TYPE_NAME: &'static str = "id";
    const HASH_MARKER: u8 = markers::ID;

    fn from_field(value: &FieldValue) -> Result<Option<Arc<str>>> {
        Ok(string_value(value))
    }

    fn to_field(value: &Arc<str>) -> FieldValue {
        FieldValue::String(Arc::clone(value))
    }

    fn hash_value(value: &Arc<str>, sink: &mut dyn HashSink) {
        write_string(sink, value);
    }

    fn json_value(value: &Arc<str>) -> JsonValue {
        string_json(value)
    }

    kind_plumbing!(IdKind, Id, id);
}

#[derive(Clone, Copy, Debug)]
pub struct MarkdownKind;

impl PrimitiveKind for MarkdownKind {
    type Value = Arc<str>;
    const TYPE_NAME: &'static str = "markdown";
    const HASH_MARKER: u8 = markers::MARKDOWN;

    fn from_field(value: &FieldValue) -> Result<Option<Arc<str>>> {
        Ok(string_value(value))
    }

    fn to_field(value: &Arc<str>) -> FieldValue {
        FieldValue::String(Arc::clone(value))
    }

    fn hash_value(value: &Arc<str>, sink: &mut dyn HashSink) {
        write_string(sink, value);
    }

    fn json_value(value: &Arc<str>) -> JsonValue {
        string_json(value)
    }

    kind_plumbing!(MarkdownKind, Markdown, markdown);
}

#[derive(Clone, Copy, Debug)]
pub struct UnsignedIntKind;

impl PrimitiveKind for UnsignedIntKind {
    type Value = i32;
    const TYPE_NAME: &'static str = "unsignedInt";
    const HASH_MARKER: u8 = markers::UNSIGNED_INT;

    fn from_field(value: &FieldValue) -> Result<Option<i32>> {
        int32_value(Self::TYPE_NAME, value)
    }

    fn to_field(value: &i32) -> FieldValue {
        FieldValue::Integer((*value).into())
    }

    fn hash_value(value: &i32, sink: &mut dyn HashSink) {
        write_int(sink, *value);
    }

    fn json_value(value: &i32) -> JsonValue {
        JsonValue::from(*value)
    }

    fn validate(value: &i32) -> Result<()> {
        if *value < 0 {
            return Err(Error::validation(
                Self::TYPE_NAME,
                format!("{value} is negative"),
            ));
        }
        Ok(())
    }

    kind_plumbing!(UnsignedIntKind, UnsignedInt, unsigned_int);
}

#[derive(Clone, Copy, Debug)]
pub struct PositiveIntKind;

impl PrimitiveKind for PositiveIntKind {
    type Value = i32;
    const TYPE_NAME: &'static str = "positiveInt";
    const HASH_MARKER: u8 = markers::POSITIVE_INT;

    fn from_field(value: &FieldValue) -> Result<Option<i32>> {
        int32_value(Self::TYPE_NAME, value)
    }

    fn to_field(value: &i32) -> FieldValue {
        FieldValue::Integer((*value).into())
    }

    fn hash_value(value: &i32, sink: &mut dyn HashSink) {
        write_int(sink, *value);
    }

    fn json_value(value: &i32) -> JsonValue {
        JsonValue::from(*value)
    }

    fn validate(value: &i32) -> Result<()> {
        if *value < 1 {
            return Err(Error::validation(
                Self::TYPE_NAME,
                format!("{value} is not positive"),
            ));
        }
        Ok(())
    }

    kind_plumbing!(PositiveIntKind, PositiveInt, positive_int);
}

/// A decimal that keeps its scale: `1.0` and `1.00` are different values.
#[derive(Clone, Copy, Debug)]
pub struct ExactDecimal(Decimal);

impl ExactDecimal {
    pub fn new(mut value: Decimal) -> Self {
        if value.is_zero() {
            value.set_sign_positive(true);
        }
        ExactDecimal(value)
    }

    pub fn get(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for ExactDecimal {
    fn from(value: Decimal) -> Self {
        ExactDecimal::new(value)
    }
}

impl FromStr for ExactDecimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Decimal::from_str(s.trim())
            .map(ExactDecimal::new)
            .map_err(|e| Error::validation("decimal", format!("`{s}`: {e}")))
    }
}

impl PartialEq for ExactDecimal {
    fn eq(&self, other: &Self) -> bool {
        decimal_eq(&self.0, &other.0)
    }
}

impl Eq for ExactDecimal {}

impl std::hash::Hash for ExactDecimal {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&(self.0.mantissa(), self.0.scale()), state);
    }
}

impl fmt::Display for ExactDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DecimalKind;

impl PrimitiveKind for DecimalKind {
    type Value = ExactDecimal;
    const TYPE_NAME: &'static str = "decimal";
    const HASH_MARKER: u8 = markers::DECIMAL;

    fn from_field(value: &FieldValue) -> Result<Option<ExactDecimal>> {
        Ok(match value {
            FieldValue::Decimal(d) => Some(ExactDecimal::new(*d)),
            FieldValue::Integer(n) => Some(ExactDecimal::new(Decimal::from(*n))),
            _ => None,
        })
    }

    fn to_field(value: &ExactDecimal) -> FieldValue {
        FieldValue::Decimal(value.0)
    }

    fn hash_value(value: &ExactDecimal, sink: &mut dyn HashSink) {
        write_decimal(sink, &value.0);
    }

    fn json_value(value: &ExactDecimal) -> JsonValue {
        let text = value.to_string();
        match text.parse::<serde_json::Number>() {
            Ok(number) => JsonValue::Number(number),
            Err(_) => JsonValue::String(text),
        }
    }

    fn is_bare(_value: &ExactDecimal) -> bool {
        true
    }

    kind_plumbing!(DecimalKind, Decimal, decimal);
}

#[derive(Clone, Copy, Debug)]
pub struct DateKind;

impl PrimitiveKind for DateKind {
    type Value = DateValue;
    const TYPE_NAME: &'static str = "date";
    const HASH_MARKER: u8 = markers::DATE;

    fn from_field(value: &FieldValue) -> Result<Option<DateValue>> {
        match value {
            FieldValue::Date(d) => Ok(Some(*d)),
            FieldValue::String(s) => s.parse().map(Some),
            _ => Ok(None),
        }
    }

    fn to_field(value: &DateValue) -> FieldValue {
        FieldValue::Date(*value)
    }

    fn hash_value(value: &DateValue, sink: &mut dyn HashSink) {
        value.hash_into(sink);
    }

    fn json_value(value: &DateValue) -> JsonValue {
        JsonValue::String(value.to_string())
    }

    fn is_bare(_value: &DateValue) -> bool {
        true
    }

    kind_plumbing!(DateKind, Date, date);
}

#[derive(Clone, Copy, Debug)]
pub struct DateTimeKind;

impl PrimitiveKind for DateTimeKind {
    type Value = DateTimeValue;
    const TYPE_NAME: &'static str = "dateTime";
    const HASH_MARKER: u8 = markers::DATE_TIME;

    fn from_field(value: &FieldValue) -> Result<Option<DateTimeValue>> {
        match value {
            FieldValue::DateTime(dt) => Ok(Some(*dt)),
            FieldValue::Date(d) => Ok(Some((*d).into())),
            FieldValue::String(s) => s.parse().map(Some),
            _ => Ok(None),
        }
    }

    fn to_field(value: &DateTimeValue) -> FieldValue {
        FieldValue::DateTime(*value)
    }

    fn hash_value(value: &DateTimeValue, sink: &mut dyn HashSink) {
        value.hash_into(sink);
    }

    fn json_value(value: &DateTimeValue) -> JsonValue {
        JsonValue::String(value.to_string())
    }

    fn is_bare(_value: &DateTimeValue) -> bool {
        true
    }

    kind_plumbing!(DateTimeKind, DateTime, date_time);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::FhirType;

    #[test]
    fn exact_decimal_equality_respects_scale() {
        let a: ExactDecimal = "1.0".parse().unwrap();
        let b: ExactDecimal = "1.00".parse().unwrap();
        let c: ExactDecimal = "1.0".parse().unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!("-0".parse::<ExactDecimal>().unwrap(), "0".parse().unwrap());
    }

    #[test]
    fn bounded_integers_validate() {
        assert!(PositiveIntKind::validate(&0).is_err());
        assert!(PositiveIntKind::validate(&1).is_ok());
        assert!(UnsignedIntKind::validate(&-1).is_err());
        assert!(UnsignedIntKind::validate(&0).is_ok());
    }

    #[test]
    fn integer_rejects_64_bit_values() {
        let err = IntegerKind::from_field(&FieldValue::Integer(i64::MAX)).unwrap_err();
        assert!(matches!(err, Error::Validation { type_name: "integer", .. }));
    }

    #[test]
    fn interning_policy() {
        assert!(StringKind::value_internable(&Arc::from("abcd")));
        assert!(!StringKind::value_internable(&Arc::from("abcde")));
        assert!(CodeKind::value_internable(&Arc::from("a-long-code-value")));
        assert!(!IdKind::value_internable(&Arc::from("a")));
    }

    #[test]
    fn decimal_json_keeps_scale() {
        let value: ExactDecimal = "1.50".parse().unwrap();
        assert_eq!(DecimalKind::json_value(&value).to_string(), "1.50");
    }

    #[test]
    fn type_names_feed_the_element_protocol() {
        assert_eq!(<FhirString as FhirType>::TYPE_NAME, "string");
        assert_eq!(<DateTime as FhirType>::HASH_MARKER, markers::DATE_TIME);
    }
}
