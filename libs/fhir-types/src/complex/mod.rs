//! FHIR complex (composite) data types
//!
//! Each composite lists its fields in canonical order: the order of the
//! `FIELDS` constant, the keyed view and the field markers of the structural
//! hash (first field = 2) all agree and are frozen.

macro_rules! composite_plumbing {
    ($ty:ty, $variant:ident, $table:ident) => {
        fn extension_data(&self) -> &std::sync::Arc<$crate::extension::ExtensionData> {
            &self.extension_data
        }

        fn extension_data_mut(&mut self) -> &mut std::sync::Arc<$crate::extension::ExtensionData> {
            &mut self.extension_data
        }

        fn empty() -> Option<std::sync::Arc<Self>> {
            static EMPTY: std::sync::OnceLock<std::sync::Arc<$ty>> = std::sync::OnceLock::new();
            Some($crate::element::empty_singleton(&EMPTY))
        }

        fn interner(ctx: &$crate::context::TypeContext) -> &$crate::intern::ValueInterner<Self> {
            &ctx.$table
        }

        fn into_element(this: std::sync::Arc<Self>) -> $crate::element::Element {
            $crate::element::Element::$variant(this)
        }

        fn from_element(element: &$crate::element::Element) -> Option<&std::sync::Arc<Self>> {
            match element {
                $crate::element::Element::$variant(value) => Some(value),
                _ => None,
            }
        }
    };
}

mod annotation;
mod bundle_entry_search;
mod codeable_concept;
mod coding;
mod identifier;
mod period;
mod quantity;
mod reference;

pub use annotation::{Annotation, AnnotationAuthor};
pub use bundle_entry_search::BundleEntrySearch;
pub use codeable_concept::CodeableConcept;
pub use coding::Coding;
pub use identifier::Identifier;
pub use period::Period;
pub use quantity::Quantity;
pub use reference::Reference;
