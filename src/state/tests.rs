use rstest::rstest;
use serde_json::json;

use super::*;
use crate::{args, patch, state};

#[test]
fn merge_overwrites_patched_fields_only() {
    let s0 = state! { "a" => 1, "b" => 2 };
    let s1 = s0.merge(patch! { "b" => 3, "c" => 4 });
    assert_eq!(s1.to_value(), json!({ "a": 1, "b": 3, "c": 4 }));
    assert_eq!(s0.to_value(), json!({ "a": 1, "b": 2 }));
}

#[test]
fn merge_keeps_identity_of_untouched_fields() {
    let s0 = state! { "a" => json!([1, 2]), "b" => 2 };
    let s1 = s0.merge(patch! { "b" => 3 });
    let (Some(a0), Some(a1)) = (s0.field("a"), s1.field("a")) else {
        panic!("field `a` missing");
    };
    assert!(Rc::ptr_eq(&a0, &a1));
    assert!(!Rc::ptr_eq(&s0.field("b").unwrap(), &s1.field("b").unwrap()));
}

#[test]
fn merge_always_produces_new_aggregate() {
    let s0 = state! { "a" => 1 };
    let s1 = s0.merge(Patch::new());
    assert!(!State::ptr_eq(&s0, &s1));
    assert_eq!(s0, s1);
}

#[test]
fn merge_stores_null() {
    let s = state! { "a" => 1 }.merge(patch! { "a" => Value::Null });
    assert!(s.contains("a"));
    assert_eq!(s["a"], Value::Null);
    assert_eq!(s.len(), 1);
}

#[test]
fn index_absent_is_null() {
    let s = state! { "a" => 1 };
    assert_eq!(s["missing"], Value::Null);
    assert_eq!(s.get("missing"), None);
}

#[test]
fn value_deserializes_field() {
    let s = state! { "n" => 5, "items" => json!(["x", "y"]) };
    assert_eq!(s.value::<i64>("n"), Some(5));
    assert_eq!(s.value::<Vec<String>>("items"), Some(vec!["x".into(), "y".into()]));
    assert_eq!(s.value::<String>("n"), None);
    assert_eq!(s.value::<i64>("missing"), None);
}

#[test]
fn from_value_object() {
    let s = State::from_value(json!({ "a": 1 })).unwrap();
    assert_eq!(s["a"], 1);
}

#[rstest]
#[case(json!(null), "null")]
#[case(json!(1), "a number")]
#[case(json!([1]), "an array")]
#[case(json!("s"), "a string")]
fn from_value_rejects_non_object(#[case] value: Value, #[case] kind: &str) {
    assert_eq!(
        State::from_value(value),
        Err(StoreError::InvalidState(kind.into()))
    );
}

#[test]
fn serialize_as_object() {
    let s = state! { "b" => 2, "a" => "x" };
    assert_eq!(serde_json::to_value(&s).unwrap(), json!({ "a": "x", "b": 2 }));
}

#[test]
fn args_get() {
    let a = args![1, Value::Null, "s"];
    assert_eq!(a.get::<i64>(0), Ok(Some(1)));
    assert_eq!(a.get::<i64>(1), Ok(None));
    assert_eq!(a.get::<i64>(3), Ok(None));
    assert!(a.get::<i64>(2).is_err());
}

#[test]
fn args_require() {
    let a = args![1];
    assert_eq!(a.require::<i64>(0), Ok(1));
    assert_eq!(
        a.require::<i64>(1),
        Err(ActionError::new("argument 1 is missing"))
    );
}

#[test]
fn args_from_unit_is_empty() {
    assert!(Args::from(()).is_empty());
}
