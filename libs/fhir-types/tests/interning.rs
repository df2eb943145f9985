//! Canonicalization and interning behavior

use ferrum_types::{
    Code, Coding, Element, Extension, ExtensionData, FhirString, FhirType, FieldValue,
    GenericMap, Period, TypeContext, TypesConfig,
};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn equal_internable_values_are_one_instance() {
    let ctx = TypeContext::default();
    let a = Code::new(&ctx, "amended".into()).unwrap();
    let b = Code::new(&ctx, "amended".into()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let coding = Coding::new(&ctx, "http://hl7.org/fhir/observation-status", "amended").unwrap();
    assert!(Arc::ptr_eq(coding.code().unwrap(), &a));
}

#[test]
fn all_absent_values_are_empty_singletons() {
    let enabled = TypeContext::default();
    let disabled = TypeContext::new(TypesConfig::default().with_interning(false));

    let a = Period::create(&enabled, &GenericMap::new()).unwrap();
    let b = Period::create(&disabled, &GenericMap::new()).unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    let coding = Coding::new(&enabled, "http://loinc.org", "8480-6").unwrap();
    let stripped = Coding::without(&coding, &enabled, "system").unwrap();
    let stripped = Coding::without(&stripped, &enabled, "code").unwrap();
    assert!(Arc::ptr_eq(&stripped, &Coding::create(&disabled, &GenericMap::new()).unwrap()));
}

#[test]
fn ids_prevent_sharing() {
    let ctx = TypeContext::default();
    let map = GenericMap::new()
        .with("id", "c1")
        .with("code", FieldValue::code("x"));
    let a = Coding::create(&ctx, &map).unwrap();
    let b = Coding::create(&ctx, &map).unwrap();
    assert_eq!(a, b);
    assert!(!a.is_internable());
    assert!(!Arc::ptr_eq(&a, &b));
}

#[test]
fn string_length_bounds_sharing() {
    let ctx = TypeContext::default();
    let short_a = FhirString::new(&ctx, "abcd".into()).unwrap();
    let short_b = FhirString::new(&ctx, "abcd".into()).unwrap();
    let long_a = FhirString::new(&ctx, "abcde".into()).unwrap();
    let long_b = FhirString::new(&ctx, "abcde".into()).unwrap();
    assert!(Arc::ptr_eq(&short_a, &short_b));
    assert!(!Arc::ptr_eq(&long_a, &long_b));
    assert_eq!(long_a, long_b);
}

#[test]
fn disabled_interning_still_compares_equal() {
    let ctx = TypeContext::new(TypesConfig::default().with_interning(false));
    let a = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    let b = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    assert_eq!(a, b);
    assert!(!Arc::ptr_eq(&a, &b));
    assert!(ctx.stats().iter().all(|s| s.entries == 0));
}

#[test]
fn concurrent_interning_yields_one_instance() {
    let ctx = Arc::new(TypeContext::default());
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                Coding::new(&ctx, "http://snomed.info/sct", "38341003").unwrap()
            })
        })
        .collect();

    let codings: Vec<Arc<Coding>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for coding in &codings[1..] {
        assert!(Arc::ptr_eq(&codings[0], coding));
    }
    let stats = ctx.stats();
    let coding_stats = stats.iter().find(|s| s.name == "Coding").unwrap();
    assert_eq!(coding_stats.misses, 1);
    assert_eq!(coding_stats.hits, threads as u64 - 1);
}

#[test]
fn dropped_values_are_rebuilt_and_purged() {
    let ctx = TypeContext::default();
    let first = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    let weak = Arc::downgrade(&first);
    drop(first);
    assert!(weak.upgrade().is_none());

    let second = Coding::new(&ctx, "http://loinc.org", "8480-6").unwrap();
    assert_eq!(second.code().and_then(|c| c.value()).map(|v| &**v), Some("8480-6"));
    drop(second);

    assert!(ctx.purge() >= 1);
    assert!(ctx.stats().iter().all(|s| s.entries == 0));
}

#[test]
fn dead_entries_release_their_children() {
    let ctx = TypeContext::default();
    let code = Code::new(&ctx, "zz-unique-code".into()).unwrap();
    let weak_code = Arc::downgrade(&code);
    let coding = Coding::create(&ctx, &GenericMap::new().with("code", Element::from(code))).unwrap();
    let weak_coding = Arc::downgrade(&coding);
    drop(coding);

    assert!(weak_coding.upgrade().is_none());
    assert!(weak_code.upgrade().is_none());
    // the dead entries are still in their tables, but hold nothing
    let stats = ctx.stats();
    let entries = |name: &str| stats.iter().find(|s| s.name == name).unwrap().entries;
    assert_eq!(entries("Coding"), 1);
    assert_eq!(entries("code"), 1);

    // rebuilding finds nothing to resurrect
    let fresh = Code::new(&ctx, "zz-unique-code".into()).unwrap();
    assert_eq!(Arc::strong_count(&fresh), 1);
}

#[test]
fn extension_urls_are_shared() {
    let ctx = TypeContext::default();
    let url = "http://hl7.org/fhir/StructureDefinition/data-absent-reason";
    let long = |text: &str| Some(Element::from(FhirString::new(&ctx, text.into()).unwrap()));
    let a = Extension::new(&ctx, url, long("not asked")).unwrap();
    let b = Extension::new(&ctx, url, long("masked value")).unwrap();
    assert_ne!(a, b);
    assert!(std::ptr::eq(a.url().as_ptr(), b.url().as_ptr()));
}

#[test]
fn extension_data_follows_its_extensions() {
    let ctx = TypeContext::default();
    let flag = Extension::new(&ctx, "http://example.org/flag", None).unwrap();
    let a = ExtensionData::new(&ctx, None, vec![Arc::clone(&flag)]);
    let b = ExtensionData::new(&ctx, None, vec![flag]);
    assert!(Arc::ptr_eq(&a, &b));

    let with_id = ExtensionData::new(&ctx, Some("x"), Vec::new());
    assert!(!with_id.is_internable());
    assert!(ExtensionData::new(&ctx, None, Vec::new()).is_empty());
}
