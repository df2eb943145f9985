//! The canonicalization context
//!
//! A [`TypeContext`] owns one weak interner per concrete type plus the shared
//! url interner. Values built through the same context are canonical with
//! respect to each other; contexts are independent, so tests and tenants can
//! use their own.

use crate::complex::{
    Annotation, BundleEntrySearch, CodeableConcept, Coding, Identifier, Period, Quantity,
    Reference,
};
use crate::config::TypesConfig;
use crate::extension::{Extension, ExtensionData};
use crate::intern::{Interner, InternerStats, StringInterner, Table, ValueInterner};
use crate::primitive::{
    Boolean, Canonical, Code, Date, DateTime, FhirDecimal, FhirString, Id, Integer, Integer64,
    Markdown, PositiveInt, UnsignedInt, Uri,
};
use std::sync::{Arc, OnceLock};

/// Thread-safe; share it behind an `Arc` or use [`TypeContext::global`].
#[derive(Debug)]
pub struct TypeContext {
    config: TypesConfig,
    pub(crate) urls: StringInterner,
    pub(crate) extension_data: ValueInterner<ExtensionData>,
    pub(crate) extension: ValueInterner<Extension>,

    pub(crate) boolean: ValueInterner<Boolean>,
    pub(crate) integer: ValueInterner<Integer>,
    pub(crate) integer64: ValueInterner<Integer64>,
    pub(crate) string: ValueInterner<FhirString>,
    pub(crate) decimal: ValueInterner<FhirDecimal>,
    pub(crate) uri: ValueInterner<Uri>,
    pub(crate) canonical: ValueInterner<Canonical>,
    pub(crate) date: ValueInterner<Date>,
    pub(crate) date_time: ValueInterner<DateTime>,
    pub(crate) code: ValueInterner<Code>,
    pub(crate) id: ValueInterner<Id>,
    pub(crate) markdown: ValueInterner<Markdown>,
    pub(crate) unsigned_int: ValueInterner<UnsignedInt>,
    pub(crate) positive_int: ValueInterner<PositiveInt>,

    pub(crate) coding: ValueInterner<Coding>,
    pub(crate) codeable_concept: ValueInterner<CodeableConcept>,
    pub(crate) quantity: ValueInterner<Quantity>,
    pub(crate) period: ValueInterner<Period>,
    pub(crate) identifier: ValueInterner<Identifier>,
    pub(crate) reference: ValueInterner<Reference>,
    pub(crate) annotation: ValueInterner<Annotation>,
    pub(crate) bundle_entry_search: ValueInterner<BundleEntrySearch>,
}

impl TypeContext {
    pub fn new(config: TypesConfig) -> Self {
        tracing::debug!(
            interning = config.interning,
            initial_capacity = config.initial_capacity,
            sweep_threshold = config.sweep_threshold,
            "creating type context"
        );
        let c = &config;
        Self {
            urls: Interner::new("url", c),
            extension_data: Interner::new("ExtensionData", c),
            extension: Interner::new("Extension", c),
            boolean: Interner::new("boolean", c),
            integer: Interner::new("integer", c),
            integer64: Interner::new("integer64", c),
            string: Interner::new("string", c),
            decimal: Interner::new("decimal", c),
            uri: Interner::new("uri", c),
            canonical: Interner::new("canonical", c),
            date: Interner::new("date", c),
            date_time: Interner::new("dateTime", c),
            code: Interner::new("code", c),
            id: Interner::new("id", c),
            markdown: Interner::new("markdown", c),
            unsigned_int: Interner::new("unsignedInt", c),
            positive_int: Interner::new("positiveInt", c),
            coding: Interner::new("Coding", c),
            codeable_concept: Interner::new("CodeableConcept", c),
            quantity: Interner::new("Quantity", c),
            period: Interner::new("Period", c),
            identifier: Interner::new("Identifier", c),
            reference: Interner::new("Reference", c),
            annotation: Interner::new("Annotation", c),
            bundle_entry_search: Interner::new("BundleEntrySearch", c),
            config,
        }
    }

    /// The process-wide context, configured from the environment on first use.
    pub fn global() -> Arc<TypeContext> {
        static GLOBAL: OnceLock<Arc<TypeContext>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(TypeContext::new(TypesConfig::from_env()))))
    }

    pub fn config(&self) -> &TypesConfig {
        &self.config
    }

    fn tables(&self) -> [&dyn Table; 25] {
        [
            &self.urls,
            &self.extension_data,
            &self.extension,
            &self.boolean,
            &self.integer,
            &self.integer64,
            &self.string,
            &self.decimal,
            &self.uri,
            &self.canonical,
            &self.date,
            &self.date_time,
            &self.code,
            &self.id,
            &self.markdown,
            &self.unsigned_int,
            &self.positive_int,
            &self.coding,
            &self.codeable_concept,
            &self.quantity,
            &self.period,
            &self.identifier,
            &self.reference,
            &self.annotation,
            &self.bundle_entry_search,
        ]
    }

    /// Statistics of every interner of this context.
    pub fn stats(&self) -> Vec<InternerStats> {
        self.tables().iter().map(|table| table.stats()).collect()
    }

    /// Sweep dead entries from every interner now.
    pub fn purge(&self) -> usize {
        let removed: usize = self.tables().iter().map(|table| table.purge()).sum();
        tracing::debug!(removed, "purged type context");
        removed
    }
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new(TypesConfig::default())
    }
}
