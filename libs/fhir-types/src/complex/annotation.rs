//! Annotation: a text note with author and time

use crate::complex::Reference;
use crate::context::TypeContext;
use crate::element::{choice_name, hash_slot, write_property, Element, FhirType, Slot};
use crate::error::{Error, Result};
use crate::extension::ExtensionData;
use crate::hash::{markers, HashSink};
use crate::primitive::{DateTime, FhirString, Markdown};
use crate::references::References;
use crate::value::FieldValue;
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

/// The closed choice `author[x]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnnotationAuthor {
    Reference(Arc<Reference>),
    String(Arc<FhirString>),
}

impl AnnotationAuthor {
    pub fn to_element(&self) -> Element {
        match self {
            AnnotationAuthor::Reference(r) => Element::Reference(Arc::clone(r)),
            AnnotationAuthor::String(s) => Element::String(Arc::clone(s)),
        }
    }

    fn type_name(&self) -> &'static str {
        match self {
            AnnotationAuthor::Reference(_) => Reference::TYPE_NAME,
            AnnotationAuthor::String(_) => FhirString::TYPE_NAME,
        }
    }

    fn from_value(ctx: &TypeContext, value: FieldValue) -> Result<Self> {
        let author = match value {
            FieldValue::Element(Element::Reference(r)) => AnnotationAuthor::Reference(r),
            FieldValue::Element(Element::String(s)) => AnnotationAuthor::String(s),
            FieldValue::Map(map) => AnnotationAuthor::Reference(Reference::create(ctx, &map)?),
            FieldValue::String(s) | FieldValue::Code(s) => {
                AnnotationAuthor::String(FhirString::new(ctx, s)?)
            }
            _ => {
                return Err(Error::invalid_field(
                    Annotation::TYPE_NAME,
                    "author",
                    "Reference or string",
                ))
            }
        };
        Ok(author)
    }
}

impl Slot for Option<AnnotationAuthor> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn is_internable(&self) -> bool {
        match self {
            None => true,
            Some(AnnotationAuthor::Reference(r)) => r.is_internable(),
            Some(AnnotationAuthor::String(s)) => s.is_internable(),
        }
    }

    fn to_value(&self) -> Option<FieldValue> {
        self.as_ref()
            .map(|author| FieldValue::Element(author.to_element()))
    }

    fn from_value(
        ctx: &TypeContext,
        _owner: &'static str,
        _key: &str,
        value: Option<FieldValue>,
    ) -> Result<Self> {
        value
            .map(|value| AnnotationAuthor::from_value(ctx, value))
            .transpose()
    }

    fn write_hash(&self, sink: &mut dyn HashSink) {
        match self {
            Some(AnnotationAuthor::Reference(r)) => r.hash_into(sink),
            Some(AnnotationAuthor::String(s)) => s.hash_into(sink),
            None => {}
        }
    }

    fn write_json(&self, out: &mut JsonMap<String, JsonValue>, name: &str) {
        let Some(author) = self else {
            return;
        };
        let name = choice_name(name, author.type_name());
        match author {
            AnnotationAuthor::Reference(r) => write_property(out, &name, &**r),
            AnnotationAuthor::String(s) => write_property(out, &name, &**s),
        }
    }

    fn visit<'a>(&'a self, refs: &mut References<'a>) {
        match self {
            Some(AnnotationAuthor::Reference(r)) => refs.push(&**r),
            Some(AnnotationAuthor::String(s)) => refs.push(&**s),
            None => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Annotation {
    extension_data: Arc<ExtensionData>,
    author: Option<AnnotationAuthor>,
    time: Option<Arc<DateTime>>,
    text: Option<Arc<Markdown>>,
}

impl Annotation {
    pub fn author(&self) -> Option<&AnnotationAuthor> {
        self.author.as_ref()
    }

    pub fn time(&self) -> Option<&Arc<DateTime>> {
        self.time.as_ref()
    }

    pub fn text(&self) -> Option<&Arc<Markdown>> {
        self.text.as_ref()
    }
}

impl FhirType for Annotation {
    const TYPE_NAME: &'static str = "Annotation";
    const HASH_MARKER: u8 = markers::ANNOTATION;
    const FIELDS: &'static [&'static str] = &["author", "time", "text"];

    fn blank() -> Self {
        Annotation {
            extension_data: ExtensionData::empty(),
            author: None,
            time: None,
            text: None,
        }
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "author" => self.author.to_value(),
            "time" => self.time.to_value(),
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
            "author" => self.author = Slot::from_value(ctx, owner, key, value)?,
            "time" => self.time = Slot::from_value(ctx, owner, key, value)?,
            "text" => self.text = Slot::from_value(ctx, owner, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        self.author.is_some() || self.time.is_some() || self.text.is_some()
    }

    fn fields_internable(&self) -> bool {
        Slot::is_internable(&self.author) && self.time.is_internable() && self.text.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        hash_slot(sink, 2, &self.author);
        hash_slot(sink, 3, &self.time);
        hash_slot(sink, 4, &self.text);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        self.author.write_json(out, "author");
        self.time.write_json(out, "time");
        self.text.write_json(out, "text");
    }

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        self.author.visit(refs);
        self.time.visit(refs);
        self.text.visit(refs);
    }

    composite_plumbing!(Annotation, Annotation, annotation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::ResourceRef;
    use crate::value::GenericMap;

    #[test]
    fn author_choice_names() {
        let ctx = TypeContext::default();
        let by_name = Annotation::create(
            &ctx,
            &GenericMap::new().with("author", "Dr. Who").with("text", "ok"),
        )
        .unwrap();
        assert_eq!(by_name.to_json()["authorString"], "Dr. Who");

        let author = Reference::new(&ctx, "Practitioner/7").unwrap();
        let author = Some(Element::from(author).into());
        let by_ref = Annotation::assoc(&by_name, &ctx, "author", author).unwrap();
        let json = by_ref.to_json();
        assert_eq!(json["authorReference"]["reference"], "Practitioner/7");
        assert!(json.get("authorString").is_none());
    }

    #[test]
    fn author_reference_is_extracted() {
        let ctx = TypeContext::default();
        let map = GenericMap::new()
            .with("author", GenericMap::new().with("reference", "Practitioner/7"));
        let note = Annotation::create(&ctx, &map).unwrap();
        let found: Vec<_> = Element::from(note).references().collect();
        assert_eq!(found, vec![ResourceRef::new("Practitioner", "7")]);
    }

    #[test]
    fn code_author_is_a_string() {
        let ctx = TypeContext::default();
        let map = GenericMap::new().with("author", FieldValue::code("nurse"));
        let note = Annotation::create(&ctx, &map).unwrap();
        assert_eq!(note.to_json()["authorString"], "nurse");
    }

    #[test]
    fn author_rejects_other_types() {
        let ctx = TypeContext::default();
        let map = GenericMap::new().with("author", true);
        assert!(matches!(
            Annotation::create(&ctx, &map),
            Err(Error::InvalidFieldValue { field, .. }) if field == "author"
        ));
    }
}
