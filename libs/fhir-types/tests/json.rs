//! FHIR JSON emission

use ferrum_types::{
    Code, Coding, DateTime, Element, Extension, ExtensionData, FhirDecimal, FhirType, FieldValue,
    GenericMap, Integer64, TypeContext,
};
use serde_json::json;
use std::sync::Arc;

#[test]
fn extended_primitive_gets_an_underscore_sibling() {
    let ctx = TypeContext::default();
    let data = ExtensionData::new(&ctx, Some("c1"), Vec::new());
    let code = Code::with_extension_data(&ctx, data, Some("final".into())).unwrap();
    let coding = Coding::create(
        &ctx,
        &GenericMap::new()
            .with("system", "http://hl7.org/fhir/observation-status")
            .with("code", Element::from(code)),
    )
    .unwrap();

    assert_eq!(
        coding.to_json(),
        json!({
            "system": "http://hl7.org/fhir/observation-status",
            "code": "final",
            "_code": { "id": "c1" }
        })
    );
}

#[test]
fn value_less_primitive_emits_only_the_sibling() {
    let ctx = TypeContext::default();
    let absent = Extension::new(
        &ctx,
        "http://hl7.org/fhir/StructureDefinition/data-absent-reason",
        Some(Element::from(Code::new(&ctx, "unknown".into()).unwrap())),
    )
    .unwrap();
    let data = ExtensionData::new(&ctx, None, vec![absent]);
    let code = Code::with_extension_data(&ctx, data, None).unwrap();
    let coding = Coding::create(&ctx, &GenericMap::new().with("code", Element::from(code))).unwrap();

    assert_eq!(
        coding.to_json(),
        json!({
            "_code": {
                "extension": [{
                    "url": "http://hl7.org/fhir/StructureDefinition/data-absent-reason",
                    "valueCode": "unknown"
                }]
            }
        })
    );
}

#[test]
fn extension_values_use_choice_names() {
    let ctx = TypeContext::default();
    let when: Element = DateTime::new(&ctx, "2024-01-02T03:04:05Z".parse().unwrap())
        .unwrap()
        .into();
    let ext = Extension::new(&ctx, "http://example.org/when", Some(when)).unwrap();
    assert_eq!(
        ext.to_json(),
        json!({ "url": "http://example.org/when", "valueDateTime": "2024-01-02T03:04:05Z" })
    );

    let concept = ferrum_types::CodeableConcept::create(
        &ctx,
        &GenericMap::new().with("text", "Hypertension"),
    )
    .unwrap();
    let ext = Extension::new(&ctx, "http://example.org/dx", Some(concept.into())).unwrap();
    assert_eq!(
        ext.to_json(),
        json!({ "url": "http://example.org/dx", "valueCodeableConcept": { "text": "Hypertension" } })
    );
}

#[test]
fn numbers_keep_their_exact_form() {
    let ctx = TypeContext::default();
    let decimal = FhirDecimal::new(&ctx, "3.140".parse().unwrap()).unwrap();
    assert_eq!(decimal.to_json().to_string(), "3.140");

    let big = Integer64::new(&ctx, 9_007_199_254_740_993).unwrap();
    assert_eq!(big.to_json(), json!("9007199254740993"));
}

#[test]
fn element_to_json_matches_typed_to_json() {
    let ctx = TypeContext::default();
    let coding = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    let id = Some(FieldValue::from("bp"));
    let coding = Coding::assoc(&coding, &ctx, "id", id).unwrap();
    let expected = json!({ "id": "bp", "system": "http://loinc.org", "code": "8480-6" });
    assert_eq!(coding.to_json(), expected);
    assert_eq!(Element::from(Arc::clone(&coding)).to_json(), expected);
}
