// Hash and Vector Surface Integration Tests
//
// These tests drive the container classes through the bound module the way
// host code would.

mod common;

use common::{call, module, new_hash, no_args};
use finbridge::bridge::exception::{OVERFLOW_ERROR, RUNTIME_ERROR, TYPE_ERROR};
use finbridge::bridge::{CallArgs, HostValue};
use std::collections::BTreeMap;

// ============================================================================
// Hash
// ============================================================================

#[test]
fn test_store_then_fetch() {
    let module = module();
    let hash = new_hash(module);

    call(module, &hash, "store", CallArgs::new().arg("foo").arg(42_i64));
    assert_eq!(
        call(module, &hash, "fetch", CallArgs::new().arg("foo")),
        HostValue::Int(42)
    );
    assert_eq!(call(module, &hash, "get_size", no_args()), HostValue::Int(1));
}

#[test]
fn test_fetch_missing_key_is_none() {
    let module = module();
    let hash = new_hash(module);
    assert_eq!(
        call(module, &hash, "fetch", CallArgs::new().arg("absent")),
        HostValue::None
    );
}

#[test]
fn test_store_rejects_non_string_key_without_mutation() {
    let module = module();
    let hash = new_hash(module);

    let err = module
        .call_method(&hash, "store", &CallArgs::new().arg(42_i64).arg("x"))
        .unwrap_err();
    assert!(err.is_instance(&TYPE_ERROR));
    assert_eq!(err.frames(), ["Hash.store"]);
    assert_eq!(call(module, &hash, "get_size", no_args()), HostValue::Int(0));
}

#[test]
fn test_store_missing_value_is_type_error() {
    let module = module();
    let hash = new_hash(module);

    let err = module
        .call_method(&hash, "store", &CallArgs::new().arg("k"))
        .unwrap_err();
    assert!(err.is_instance(&TYPE_ERROR));

    let err = module
        .call_method(&hash, "store", &CallArgs::new().arg("k").arg(HostValue::None))
        .unwrap_err();
    assert!(err.is_instance(&TYPE_ERROR));
    assert_eq!(err.message(), "Required argument 'value' cannot be None");
}

#[test]
fn test_keyword_arguments_and_replacement() {
    let module = module();
    let hash = new_hash(module);

    call(
        module,
        &hash,
        "store",
        CallArgs::new().kwarg("value", "first").kwarg("key", "k"),
    );
    call(module, &hash, "store", CallArgs::new().arg("k").kwarg("value", 2.5));
    assert_eq!(
        call(module, &hash, "fetch", CallArgs::new().kwarg("key", "k")),
        HostValue::Float(2.5)
    );

    let err = module
        .call_method(&hash, "fetch", &CallArgs::new().arg("k").kwarg("key", "k"))
        .unwrap_err();
    assert!(err.is_instance(&TYPE_ERROR));

    let err = module
        .call_method(&hash, "fetch", &CallArgs::new().kwarg("name", "k"))
        .unwrap_err();
    assert!(err.is_instance(&TYPE_ERROR));
}

#[test]
fn test_nested_values_round_trip() {
    let module = module();
    let hash = new_hash(module);

    let mut inner = BTreeMap::new();
    inner.insert("n".to_string(), HostValue::Int(1));
    let nested = HostValue::List(vec![
        HostValue::Str("a".into()),
        HostValue::None,
        HostValue::Dict(inner),
        HostValue::Bool(true),
    ]);

    call(module, &hash, "store", CallArgs::new().arg("list").arg(nested.clone()));
    assert_eq!(call(module, &hash, "fetch", CallArgs::new().arg("list")), nested);
}

#[test]
fn test_keys_and_delete() {
    let module = module();
    let hash = new_hash(module);
    for key in ["b", "a", "c"] {
        call(module, &hash, "store", CallArgs::new().arg(key).arg(key));
    }

    assert_eq!(
        call(module, &hash, "keys", no_args()),
        HostValue::List(vec!["a".into(), "b".into(), "c".into()])
    );
    assert_eq!(
        call(module, &hash, "delete", CallArgs::new().arg("b")),
        HostValue::Str("b".into())
    );
    assert_eq!(
        call(module, &hash, "has_key", CallArgs::new().arg("b")),
        HostValue::Bool(false)
    );
    assert_eq!(call(module, &hash, "delete", CallArgs::new().arg("b")), HostValue::None);
}

#[test]
fn test_store_host_object_keeps_identity() {
    let module = module();
    let hash = new_hash(module);
    let err = module
        .construct("Clownfish::Err", &CallArgs::new().arg("stored"))
        .unwrap();

    call(module, &hash, "store", CallArgs::new().arg("e").arg(err.clone()));
    assert_eq!(err.refcount().unwrap(), 2);

    let fetched = call(module, &hash, "fetch", CallArgs::new().arg("e"));
    let fetched = fetched.as_object().unwrap();
    assert!(fetched.ptr_eq(&err));
    assert_eq!(call(module, fetched, "get_mess", no_args()), HostValue::Str("stored".into()));
}

// ============================================================================
// Vector
// ============================================================================

#[test]
fn test_vector_push_fetch_pop() {
    let module = module();
    let vector = module
        .construct("Clownfish::Vector", &CallArgs::new().arg(4_i64))
        .unwrap();

    call(module, &vector, "push", CallArgs::new().arg(1_i64));
    call(module, &vector, "push", CallArgs::new().arg(HostValue::None));
    call(module, &vector, "insert", CallArgs::new().arg(0_i64).arg("zero"));

    assert_eq!(call(module, &vector, "get_size", no_args()), HostValue::Int(3));
    assert_eq!(
        call(module, &vector, "fetch", CallArgs::new().arg(0_i64)),
        HostValue::Str("zero".into())
    );
    assert_eq!(
        call(module, &vector, "fetch", CallArgs::new().arg(9_i64)),
        HostValue::None
    );
    assert_eq!(call(module, &vector, "pop", no_args()), HostValue::None);
    assert_eq!(call(module, &vector, "pop", no_args()), HostValue::Int(1));
}

#[test]
fn test_vector_argument_checks() {
    let module = module();
    let vector = module
        .construct("Clownfish::Vector", &CallArgs::new())
        .unwrap();

    let err = module
        .call_method(&vector, "fetch", &CallArgs::new().arg(-1_i64))
        .unwrap_err();
    assert!(err.is_instance(&OVERFLOW_ERROR));

    let err = module
        .call_method(&vector, "insert", &CallArgs::new().arg(3_i64).arg("x"))
        .unwrap_err();
    assert!(err.is_instance(&RUNTIME_ERROR));
    assert_eq!(err.message(), "Tick 3 out of bounds for vector of size 0");
    assert_eq!(err.native_class(), Some("Clownfish::Err"));

    let err = module
        .call_method(&vector, "push_all", &CallArgs::new().arg("not a vector"))
        .unwrap_err();
    assert!(err.is_instance(&TYPE_ERROR));

    call(
        module,
        &vector,
        "push_all",
        CallArgs::new().arg(HostValue::List(vec![1_i64.into(), 2_i64.into()])),
    );
    assert_eq!(call(module, &vector, "get_size", no_args()), HostValue::Int(2));
}
