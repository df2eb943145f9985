//! Immutable FHIR values with structural sharing
//!
//! Every value built through a [`TypeContext`] is canonical: values whose
//! fields are all absent are a per-type EMPTY singleton, and values small and
//! common enough to be shared (plain codings, codes, booleans, short strings)
//! come out of a weak-reference interner, so equal values are usually the same
//! allocation. Updates are copy-on-write through `assoc`, which returns a new
//! canonical value and never touches the original.
//!
//! ```text
//! GenericMap --create--> Coding ---assoc("code", ..)---> Coding'
//!                          |                               |
//!                    TypeContext (interners, EMPTY singletons)
//!                          |
//!            hash() --> SHA-256 over a frozen byte encoding
//!      references() --> (type, id) pairs of local references
//! ```
//!
//! # Example
//!
//! ```
//! use ferrum_types::{Coding, Element, FhirType, FieldValue, TypeContext};
//!
//! let ctx = TypeContext::default();
//! let bp = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
//! let same = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
//! assert!(std::sync::Arc::ptr_eq(&bp, &same));
//!
//! let other = Coding::assoc(&bp, &ctx, "code", Some(FieldValue::code("8462-4"))).unwrap();
//! assert_ne!(Element::from(bp).hash(), Element::from(other).hash());
//! ```

#![forbid(unsafe_code)]

mod complex;
mod config;
mod context;
mod element;
mod error;
mod extension;
pub mod hash;
mod intern;
pub mod primitive;
mod references;
mod value;

pub use complex::{
    Annotation, AnnotationAuthor, BundleEntrySearch, CodeableConcept, Coding, Identifier, Period,
    Quantity, Reference,
};
pub use config::TypesConfig;
pub use context::TypeContext;
pub use element::{Element, FhirType};
pub use error::{Error, Result};
pub use extension::{Extension, ExtensionData};
pub use hash::{Hash, HashSink};
pub use intern::InternerStats;
pub use primitive::{
    Boolean, Canonical, Code, Date, DateTime, DateTimeValue, DateValue, ExactDecimal, FhirDecimal,
    FhirString, Id, Integer, Integer64, Markdown, PositiveInt, UnsignedInt, Uri,
};
pub use references::{parse_local_reference, RefSource, ResourceRef, References};
pub use value::{Elements, FieldValue, GenericMap, Metadata, BUNDLE_ENTRY_TYPE, FHIR_TYPE_KEY};
