//! Bundle.entry.search: why an entry is in a search result set

use crate::context::TypeContext;
use crate::element::{hash_slot, FhirType, Slot};
use crate::error::Result;
use crate::extension::{Extension, ExtensionData};
use crate::hash::{markers, HashSink};
use crate::primitive::{Code, FhirDecimal};
use crate::references::References;
use crate::value::{Elements, FieldValue};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::sync::Arc;

/// A backbone element, so it carries `modifierExtension` besides `extension`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct BundleEntrySearch {
    extension_data: Arc<ExtensionData>,
    modifier_extension: Elements<Extension>,
    mode: Option<Arc<Code>>,
    score: Option<Arc<FhirDecimal>>,
}

impl BundleEntrySearch {
    pub fn modifier_extension(&self) -> &Elements<Extension> {
        &self.modifier_extension
    }

    pub fn mode(&self) -> Option<&Arc<Code>> {
        self.mode.as_ref()
    }

    pub fn score(&self) -> Option<&Arc<FhirDecimal>> {
        self.score.as_ref()
    }
}

impl FhirType for BundleEntrySearch {
    const TYPE_NAME: &'static str = "BundleEntrySearch";
    const HASH_MARKER: u8 = markers::BUNDLE_ENTRY_SEARCH;
    const FIELDS: &'static [&'static str] = &["modifierExtension", "mode", "score"];
    const LIST_FIELDS: &'static [&'static str] = &["modifierExtension"];

    fn blank() -> Self {
        BundleEntrySearch {
            extension_data: ExtensionData::empty(),
            modifier_extension: Elements::empty(),
            mode: None,
            score: None,
        }
    }

    fn field(&self, key: &str) -> Option<FieldValue> {
        match key {
            "modifierExtension" => self.modifier_extension.to_value(),
            "mode" => self.mode.to_value(),
            "score" => self.score.to_value(),
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
            "modifierExtension" => {
                self.modifier_extension = Slot::from_value(ctx, owner, key, value)?
            }
            "mode" => self.mode = Slot::from_value(ctx, owner, key, value)?,
            "score" => self.score = Slot::from_value(ctx, owner, key, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn has_fields(&self) -> bool {
        !self.modifier_extension.is_empty() || self.mode.is_some() || self.score.is_some()
    }

    fn fields_internable(&self) -> bool {
        Slot::is_internable(&self.modifier_extension)
            && self.mode.is_internable()
            && self.score.is_internable()
    }

    fn hash_fields(&self, sink: &mut dyn HashSink) {
        hash_slot(sink, 2, &self.modifier_extension);
        hash_slot(sink, 3, &self.mode);
        hash_slot(sink, 4, &self.score);
    }

    fn json_fields(&self, out: &mut JsonMap<String, JsonValue>) {
        self.modifier_extension.write_json(out, "modifierExtension");
        self.mode.write_json(out, "mode");
        self.score.write_json(out, "score");
    }

    fn visit_fields<'a>(&'a self, refs: &mut References<'a>) {
        self.modifier_extension.visit(refs);
        self.mode.visit(refs);
        self.score.visit(refs);
    }

    composite_plumbing!(BundleEntrySearch, BundleEntrySearch, bundle_entry_search);
}
