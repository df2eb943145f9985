//! Copy-on-write updates through `assoc`

use ferrum_types::{
    Code, CodeableConcept, Coding, Element, Error, Extension, FhirString, FhirType, FieldValue,
    GenericMap, Integer, PositiveInt, TypeContext, UnsignedInt,
};
use std::sync::Arc;

fn ctx() -> TypeContext {
    TypeContext::default()
}

#[test]
fn assoc_leaves_the_original_untouched() {
    let ctx = ctx();
    let original = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    let updated = Coding::assoc(&original, &ctx, "code", Some(FieldValue::code("8462-4"))).unwrap();

    let code = |c: &Coding| c.get("code").and_then(|v| v.as_element().cloned());
    assert_eq!(
        code(&original).and_then(|e| e.get("value")),
        Some(FieldValue::code("8480-6"))
    );
    assert_eq!(
        code(&updated).and_then(|e| e.get("value")),
        Some(FieldValue::code("8462-4"))
    );
    // untouched fields are shared, not copied
    assert!(Arc::ptr_eq(
        original.system().unwrap(),
        updated.system().unwrap()
    ));
}

#[test]
fn empty_list_clears_the_field() {
    let ctx = ctx();
    let coding = Coding::new(&ctx, "http://snomed.info/sct", "1").unwrap();
    let concept = CodeableConcept::create(
        &ctx,
        &GenericMap::new().with("coding", vec![Element::from(coding).into()]),
    )
    .unwrap();

    let cleared = CodeableConcept::assoc(&concept, &ctx, "coding", Some(FieldValue::list([])));
    let removed = CodeableConcept::without(&concept, &ctx, "coding");
    let cleared = cleared.unwrap();
    assert_eq!(cleared, removed.unwrap());
    assert_eq!(cleared.get("coding"), Some(FieldValue::list([])));
    assert!(cleared.keys().is_empty());
    assert_eq!(cleared.to_json(), serde_json::json!({}));
    assert!(Arc::ptr_eq(&cleared, &CodeableConcept::create(&ctx, &GenericMap::new()).unwrap()));
}

#[test]
fn absent_extensions_read_as_the_empty_list() {
    let ctx = ctx();
    let coding = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    assert_eq!(coding.get("extension"), Some(FieldValue::list([])));
    assert_eq!(coding.get("id"), None);

    let element = Element::from(coding);
    assert!(!element.contains_key("extension"));
    assert!(element.entries().iter().all(|(key, _)| *key != "extension"));
}

#[test]
fn get_returns_what_assoc_stored() {
    let ctx = ctx();
    let coding = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();

    // typed values come back as stored
    let display: FieldValue = Element::from(FhirString::new(&ctx, "Systolic".into()).unwrap()).into();
    let updated = Coding::assoc(&coding, &ctx, "display", Some(display.clone())).unwrap();
    assert_eq!(updated.get("display"), Some(display));

    // raw scalars of a bare kind compare equal to the primitive they became
    let code = Some(FieldValue::code("8462-4"));
    let updated = Coding::assoc(&coding, &ctx, "code", code.clone()).unwrap();
    assert_eq!(updated.get("code"), code);

    // a raw string stored in a uri field is promoted to a uri element
    let updated = Coding::assoc(&coding, &ctx, "system", Some("http://x".into())).unwrap();
    let system = updated.get("system").unwrap();
    let system = system.as_element().unwrap();
    assert_eq!(system.type_name(), "uri");
    assert_eq!(system.get("value"), Some(FieldValue::from("http://x")));

    // and storing what was read back changes nothing
    let again = Coding::assoc(&updated, &ctx, "system", updated.get("system")).unwrap();
    assert!(Arc::ptr_eq(&updated, &again));
}

#[test]
fn unknown_keys_on_composites_are_ignored() {
    let ctx = ctx();
    let coding = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    let same = Coding::assoc(&coding, &ctx, "colour", Some("blue".into())).unwrap();
    assert!(Arc::ptr_eq(&coding, &same));
}

#[test]
fn unknown_keys_on_primitives_are_errors() {
    let ctx = ctx();
    let code = Code::new(&ctx, "x".into()).unwrap();
    let err = Code::assoc(&code, &ctx, "colour", Some("blue".into())).unwrap_err();
    assert_eq!(
        err,
        Error::UnsupportedField {
            type_name: "code",
            key: "colour".to_string()
        }
    );
}

#[test]
fn positive_int_bounds() {
    let ctx = ctx();
    assert!(matches!(
        PositiveInt::new(&ctx, 0),
        Err(Error::Validation { type_name: "positiveInt", .. })
    ));
    assert!(PositiveInt::new(&ctx, -1).is_err());
    let one = PositiveInt::new(&ctx, 1).unwrap();
    assert_eq!(one.value(), Some(&1));

    let err = PositiveInt::assoc(&one, &ctx, "value", Some(0.into())).unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    assert!(UnsignedInt::new(&ctx, 0).is_ok());
    assert!(UnsignedInt::new(&ctx, -1).is_err());
}

#[test]
fn integer_rejects_values_beyond_32_bits() {
    let ctx = ctx();
    let n = Integer::new(&ctx, 1).unwrap();
    let err = Integer::assoc(&n, &ctx, "value", Some(FieldValue::from(1_i64 << 40))).unwrap_err();
    assert!(matches!(err, Error::Validation { type_name: "integer", .. }));
}

#[test]
fn extension_requires_a_url() {
    let ctx = ctx();
    let err = Extension::create(&ctx, &GenericMap::new().with("value", true)).unwrap_err();
    assert_eq!(
        err,
        Error::MissingField {
            type_name: "Extension",
            field: "url"
        }
    );

    let ext = Extension::new(&ctx, "http://example.org/flag", None).unwrap();
    assert!(matches!(
        Extension::without(&ext, &ctx, "url"),
        Err(Error::MissingField { .. })
    ));
}

#[test]
fn extension_value_cannot_be_an_extension() {
    let ctx = ctx();
    let inner = Extension::new(&ctx, "http://example.org/inner", None).unwrap();
    let outer = Extension::new(&ctx, "http://example.org/outer", None).unwrap();
    let err = Extension::assoc(&outer, &ctx, "value", Some(Element::from(inner).into())).unwrap_err();
    assert!(matches!(err, Error::InvalidFieldValue { .. }));
}

#[test]
fn wrong_shapes_are_rejected() {
    let ctx = ctx();
    let coding = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    let list = FieldValue::list([FieldValue::code("a")]);
    let err = Coding::assoc(&coding, &ctx, "code", Some(list)).unwrap_err();
    assert_eq!(
        err,
        Error::InvalidFieldValue {
            type_name: "Coding",
            field: "code".to_string(),
            expected: "code"
        }
    );
}

#[test]
fn removing_the_last_non_internable_field_recanonicalizes() {
    let ctx = ctx();
    let plain = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    let described = Coding::assoc(&plain, &ctx, "display", Some("Systolic blood pressure".into()))
        .unwrap();
    assert!(!described.is_internable());

    let back = Coding::without(&described, &ctx, "display").unwrap();
    assert!(Arc::ptr_eq(&plain, &back));
}

#[test]
fn primitive_id_and_extension_updates() {
    let ctx = ctx();
    let s = FhirString::new(&ctx, "hello".into()).unwrap();
    let flag = Extension::new(&ctx, "http://example.org/flag", None).unwrap();
    let extended = FhirString::assoc(
        &s,
        &ctx,
        "extension",
        Some(FieldValue::list([Element::from(flag).into()])),
    )
    .unwrap();
    assert!(extended.is_extended());
    assert_eq!(extended.keys(), vec!["extension", "value"]);

    let plain = FhirString::without(&extended, &ctx, "extension").unwrap();
    assert!(!plain.is_extended());
    assert_eq!(plain, s);
}

#[test]
fn generic_view_helpers() {
    let ctx = ctx();
    let coding: Element = Coding::create(
        &ctx,
        &GenericMap::new()
            .with("display", "Systolic")
            .with("system", "http://loinc.org"),
    )
    .unwrap()
    .into();
    assert_eq!(coding.keys(), vec!["system", "display"]);
    assert_eq!(coding.count(), 2);
    assert!(coding.contains_key("display"));
    assert!(!coding.contains_key("code"));
    assert_eq!(coding.entries().len(), 2);
    assert_eq!(coding.type_name(), "Coding");

    let removed = coding.without(&ctx, "display").unwrap();
    assert_eq!(removed.count(), 1);
    assert_eq!(coding.count(), 2);
}
