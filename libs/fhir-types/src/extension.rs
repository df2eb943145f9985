//! Extensions and the id/extension/meta triple every element carries

use crate::context::TypeContext;
use crate::element::{hash_slot, Element, FhirType, Slot};
use crate::error::{Error, Result};
use crate::hash::{markers, write_string, HashSink, Sha256Sink, FIELD_EXTENSION, FIELD_ID};
use crate::intern::ValueInterner;
use crate::references::{RefSource, References};
use crate::value::{Elements, FieldValue, GenericMap, Metadata};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::{Arc, OnceLock};

/// The `id`, `extension` and host metadata of an element.
///
/// Metadata is not FHIR content: equality and hashing ignore it. Data without
/// id, extensions or metadata is always the shared [`ExtensionData::empty`]
/// instance.
#[derive(Clone, Debug, Default)]
pub struct ExtensionData {
    id: Option<Arc<str>>,
    extension: Elements<Extension>,
    meta: Option<Metadata>,
}

impl PartialEq for ExtensionData {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.extension == other.extension
    }
}

impl Eq for ExtensionData {}

impl std::hash::Hash for ExtensionData {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.id, state);
        std::hash::Hash::hash(&self.extension, state);
    }
}

impl ExtensionData {
    pub fn empty() -> Arc<Self> {
        static EMPTY: OnceLock<Arc<ExtensionData>> = OnceLock::new();
        Arc::clone(EMPTY.get_or_init(|| Arc::new(ExtensionData::default())))
    }

    pub fn new(
        ctx: &TypeContext,
        id: Option<&str>,
        extension: impl IntoIterator<Item = Arc<Extension>>,
    ) -> Arc<Self> {
        Self::canonical(
            ctx,
            ExtensionData {
                id: id.map(Arc::from),
                extension: extension.into_iter().collect(),
                meta: None,
            },
        )
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn extension(&self) -> &Elements<Extension> {
        &self.extension
    }

    pub fn meta(&self) -> Option<&Metadata> {
        self.meta.as_ref()
    }

    /// `true` without id, extensions and metadata.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.extension.is_empty() && self.meta.is_none()
    }

    /// `true` if an id or extensions are present. Metadata doesn't count.
    pub fn has_content(&self) -> bool {
        self.id.is_some() || !self.extension.is_empty()
    }

    pub fn is_internable(&self) -> bool {
        self.id.is_none()
            && self.meta.is_none()
            && self.extension.iter().all(|ext| ext.is_internable())
    }

    pub(crate) fn canonical(ctx: &TypeContext, data: ExtensionData) -> Arc<Self> {
        if data.is_empty() {
            return Self::empty();
        }
        if ctx.extension_data.is_enabled() && data.is_internable() {
            let mut sink = Sha256Sink::new();
            data.hash_into(&mut sink);
            return ctx.extension_data.intern_value(sink.finish(), data);
        }
        Arc::new(data)
    }

    pub fn with_id(this: &Arc<Self>, ctx: &TypeContext, id: Option<Arc<str>>) -> Arc<Self> {
        if this.id == id {
            return Arc::clone(this);
        }
        let mut next = Self::clone(this);
        next.id = id;
        Self::canonical(ctx, next)
    }

    pub fn with_extension(
        this: &Arc<Self>,
        ctx: &TypeContext,
        extension: Elements<Extension>,
    ) -> Arc<Self> {
        let mut next = Self::clone(this);
        next.extension = extension;
        Self::canonical(ctx, next)
    }

    pub fn with_meta(this: &Arc<Self>, ctx: &TypeContext, meta: Option<Metadata>) -> Arc<Self> {
        let mut next = Self::clone(this);
        next.meta = meta.filter(|m| !m.is_empty());
        Self::canonical(ctx, next)
    }

    /// Copy-on-write update of `id` or `extension` on behalf of `owner`.
    pub(crate) fn assoc(
        this: &Arc<Self>,
        ctx: &TypeContext,
        owner: &'static str,
        key: &str,
        value: Option<FieldValue>,
    ) -> Result<Arc<Self>> {
        match key {
            "id" => Ok(Self::with_id(this, ctx, id_from_value(owner, value)?)),
            "extension" => {
                let extension = Elements::from_value(ctx, owner, key, value)?;
                Ok(Self::with_extension(this, ctx, extension))
            }
            _ => Err(Error::UnsupportedField {
                type_name: owner,
                key: key.to_string(),
            }),
        }
    }

    pub(crate) fn from_map(
        ctx: &TypeContext,
        owner: &'static str,
        map: &GenericMap,
    ) -> Result<Arc<Self>> {
        let id = id_from_value(owner, map.get("id").cloned())?;
        let extension = Elements::from_value(ctx, owner, "extension", map.get("extension").cloned())?;
        Ok(Self::canonical(
            ctx,
            ExtensionData {
                id,
                extension,
                meta: None,
            },
        ))
    }

    pub(crate) fn get(&self, key: &str) -> Option<FieldValue> {
        match key {
            "id" => self.id.clone().map(FieldValue::String),
            "extension" => Some(
                self.extension
                    .to_value()
                    .unwrap_or_else(|| FieldValue::list([])),
            ),
            _ => None,
        }
    }

    pub(crate) fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::with_capacity(2);
        if self.id.is_some() {
            keys.push("id");
        }
        if !self.extension.is_empty() {
            keys.push("extension");
        }
        keys
    }

    pub(crate) fn hash_into(&self, sink: &mut dyn HashSink) {
        if let Some(id) = &self.id {
            sink.put_byte(FIELD_ID);
            write_string(sink, id);
        }
        hash_slot(sink, FIELD_EXTENSION, &self.extension);
    }

    pub(crate) fn write_json(&self, out: &mut JsonMap<String, JsonValue>) {
        if let Some(id) = &self.id {
            out.insert("id".to_string(), JsonValue::String(id.to_string()));
        }
        self.extension.write_json(out, "extension");
    }
}

fn id_from_value(owner: &'static str, value: Option<FieldValue>) -> Result<Option<Arc<str>>> {
    match value {
        None => Ok(None),
        Some(FieldValue::String(id)) | Some(FieldValue::Code(id)) => Ok(Some(id)),
        Some(_) => Err(Error::invalid_field(owner, "id", "string")),
    }
}

impl RefSource for ExtensionData {
    fn expand<'a>(&'a self, refs: &mut References<'a>) {
        self.extension.visit(refs);
    }
}

/// A FHIR extension: a url and an optional value of any element type.
///
/// The url is required and shared through the context's url interner.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Extension {
    extension_data: Arc<ExtensionData>,
    url: Option<Arc<str>>,
    value: Option<Element>,
}

impl Extension {
    pub fn new(ctx: &TypeContext, url: &str, value: Option<Element>) -> Result<Arc<Self>> {
        let mut ext = Self::blank();
        ext.set_field(ctx, "url", Some(FieldValue::from(url)))?;
        ext.set_field(ctx, "value", value.map(FieldValue::Element))?;
        Ok(Self::canonical(ctx, ext))
    }

    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    pub fn value(&self) -> Option<&Element> {
        self.value.as_ref()
    }
}

impl FhirType for Extension {
    const TYPE_NAME: &'static str = "Extension";
    const HASH_MARKER: u8 = markers::EXTENSION;
    const FIELDS: &'static [&'static str] = &["url", "value"];

    fn blank() -> Self {
        Extension {
            extension_data: ExtensionData::empty(),
            url: None,
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
            "url" => self.url.clone().map(FieldValue::String),
            "value" => self.value.to_value(),
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
            "url" => {
                let url = match value {
                    None => {
                        return Err(Error::MissingField {
                            type_name: Self::TYPE_NAME,
                            field: "url",
                        })
                    }
                    Some(value) => value
                        .as_str()
                        .map(|url| ctx.urls.intern_str(url))
                        .ok_or_else(|| Error::invalid_field(Self::TYPE_NAME, key, "string"))?,
                };
                self.url = Some(url);
            }
            "value" => self.value = Slot::from_value(ctx, Self::TYPE_NAME, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        self.url.is_some() || self.value.is_some()
    }

    fn fields_internable(&self) -> bool {
        self.value.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        if let Some(url) = &self.url {
            sink.put_byte(2);
            write_string(sink, url);
        }
        hash_slot(sink, 3, &self.value);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        if let Some(url) = &self.url {
            out.insert("url".to_string(), JsonValue::String(url.to_string()));
        }
        self.value.write_json(out, "value");
    }

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        self.value.visit(refs);
    }

    fn empty() -> Option<Arc<Self>> {
        None
    }

    fn interner(ctx: &TypeContext) -> &ValueInterner<Self> {
        &ctx.extension
    }

    fn into_element(this: Arc<Self>) -> Element {
        Element::Extension(this)
    }

    fn from_element(element: &Element) -> Option<&Arc<Self>> {
        match element {
            Element::Extension(ext) => Some(ext),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.url.is_none() {
            return Err(Error::MissingField {
                type_name: Self::TYPE_NAME,
                field: "url",
            });
        }
        Ok(())
    }
}

