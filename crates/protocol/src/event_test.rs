//! Tests for Event and AttrValue

use bytes::Bytes;

use crate::event::{AttrValue, Attributes, Event};

// =============================================================================
// Construction
// =============================================================================

#[test]
fn test_event_new_has_no_attributes() {
    let event = Event::new("hello");

    assert_eq!(event.body().as_ref(), b"hello");
    assert_eq!(event.body_len(), 5);
    assert!(event.attributes().is_empty());
}

#[test]
fn test_event_builder_sets_attributes() {
    let event = Event::builder(Bytes::from_static(b"body"))
        .attribute("host", "web-01")
        .attribute("status", 200_i64)
        .attribute("ratio", 0.25_f64)
        .attribute("sampled", true)
        .attribute("trace", vec![0xde_u8, 0xad])
        .build();

    assert_eq!(event.attributes().len(), 5);
    assert_eq!(event.attribute("host").and_then(AttrValue::as_str), Some("web-01"));
    assert_eq!(event.attribute("status").and_then(AttrValue::as_int), Some(200));
    assert_eq!(event.attribute("ratio").and_then(AttrValue::as_float), Some(0.25));
    assert_eq!(event.attribute("sampled").and_then(AttrValue::as_bool), Some(true));
    assert_eq!(
        event.attribute("trace").and_then(AttrValue::as_bytes),
        Some(&[0xde, 0xad][..])
    );
    assert!(event.attribute("missing").is_none());
}

#[test]
fn test_event_builder_last_value_wins() {
    let event = Event::builder("x")
        .attribute("k", 1_i64)
        .attribute("k", 2_i64)
        .build();

    assert_eq!(event.attributes().len(), 1);
    assert_eq!(event.attribute("k"), Some(&AttrValue::Int(2)));
}

#[test]
fn test_event_with_attributes() {
    let mut attrs = Attributes::new();
    attrs.insert("a".into(), AttrValue::from("b"));

    let event = Event::with_attributes("body", attrs.clone());
    assert_eq!(event.attributes(), &attrs);
}

// =============================================================================
// Equality and sharing
// =============================================================================

#[test]
fn test_event_clone_shares_body() {
    let event = Event::builder(vec![7u8; 1024]).attribute("k", "v").build();
    let clone = event.clone();

    assert_eq!(event, clone);
    // Bytes clones point at the same allocation
    assert_eq!(event.body().as_ptr(), clone.body().as_ptr());
}

#[test]
fn test_event_equality_compares_attributes() {
    let a = Event::builder("x").attribute("k", 1_i64).build();
    let b = Event::builder("x").attribute("k", 2_i64).build();
    let c = Event::builder("x").attribute("k", 1_i64).build();

    assert_ne!(a, b);
    assert_eq!(a, c);
}

#[test]
fn test_attr_value_type_mismatch_returns_none() {
    let value = AttrValue::Int(5);

    assert!(value.as_str().is_none());
    assert!(value.as_bool().is_none());
    assert!(value.as_bytes().is_none());
    assert_eq!(value.type_name(), "int");
}

#[test]
fn test_attr_value_display() {
    assert_eq!(AttrValue::from("abc").to_string(), "abc");
    assert_eq!(AttrValue::Int(-3).to_string(), "-3");
    assert_eq!(AttrValue::Bool(false).to_string(), "false");
    assert_eq!(AttrValue::Bytes(Bytes::from_static(b"xyz")).to_string(), "<3 bytes>");
}
