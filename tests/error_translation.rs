// Error Translation Integration Tests
//
// These tests verify that native errors reach host code as exceptions with
// the right class, message and traceback, and that registered mappings pick
// the most specific exception class.

mod common;

use common::{fresh_module, module, register_error_class, register_subclass, unique_name};
use finbridge::bridge::exception::{
    ATTRIBUTE_ERROR, EXCEPTION, ExceptionClass, RUNTIME_ERROR, TYPE_ERROR, UNKNOWN_TYPE_ERROR,
};
use finbridge::bridge::{BoundModule, CallArgs, HostException, HostObject, HostResult, HostValue};
use finbridge::runtime::{Thrown, core, registry};
use finbridge::Error;
use std::ptr;

fn new_error(module: &BoundModule, class_name: &str, message: &str) -> HostObject {
    module
        .construct(class_name, &CallArgs::new().arg(message))
        .unwrap()
}

fn rethrow(module: &BoundModule, err: &HostObject) -> HostException {
    module
        .call_static(
            "Clownfish::Err",
            "rethrow",
            &CallArgs::new().arg(err.clone()),
        )
        .unwrap_err()
}

// ============================================================================
// Default Translation
// ============================================================================

#[test]
fn test_unmapped_error_is_runtime_error() {
    let module = module();
    let err = new_error(module, "Clownfish::Err", "plain failure");

    let exception = rethrow(module, &err);
    assert!(ptr::eq(exception.class(), &RUNTIME_ERROR));
    assert_eq!(exception.message(), "plain failure");
    assert_eq!(exception.native_class(), Some("Clownfish::Err"));
    assert_eq!(exception.frames(), ["Err.rethrow"]);
}

#[test]
fn test_message_bytes_survive() {
    let module = module();
    for message in ["", "caf\u{e9} \u{1F41F}", "nul\0inside", "line\nbreak"] {
        let err = new_error(module, "Clownfish::Err", message);
        assert_eq!(rethrow(module, &err).message(), message);
    }
}

#[test]
fn test_translation_releases_native_error() {
    let module = module();
    let err = new_error(module, "Clownfish::Err", "counted");
    let before = err.refcount().unwrap();

    for _ in 0..10 {
        rethrow(module, &err);
    }
    assert_eq!(err.refcount().unwrap(), before);
}

#[test]
fn test_every_exception_is_an_exception() {
    let module = module();
    let int = common::new_integer(module, 1);

    let exceptions = [
        module
            .call_method(&int, "missing", &CallArgs::new())
            .unwrap_err(),
        module
            .call_method(&int, "is_a", &CallArgs::new().arg("Nope"))
            .unwrap_err(),
        module
            .call_method(&int, "equals", &CallArgs::new().arg(1_i64).arg(2_i64))
            .unwrap_err(),
    ];
    let classes: [&ExceptionClass; 3] = [&ATTRIBUTE_ERROR, &UNKNOWN_TYPE_ERROR, &TYPE_ERROR];
    for (exception, class) in exceptions.iter().zip(classes) {
        assert!(exception.is_instance(&EXCEPTION));
        assert!(ptr::eq(exception.class(), class), "{exception}");
    }
}

// ============================================================================
// Registered Mappings
// ============================================================================

#[test]
fn test_custom_mapping_for_host_defined_error() {
    let module = fresh_module();
    let class = register_error_class("MyErr");
    let my_error = ExceptionClass::subclass("MyError", &RUNTIME_ERROR);

    module
        .exceptions()
        .register_exception_mapping(module.registry(), class.name(), move |message| {
            HostException::new(my_error, message)
        })
        .unwrap();

    let err = new_error(&module, class.name(), "custom");
    assert_eq!(err.class().name(), class.name());

    let exception = rethrow(&module, &err);
    assert!(ptr::eq(exception.class(), my_error));
    assert!(exception.is_instance(&RUNTIME_ERROR));
    assert_eq!(exception.message(), "custom");
    assert_eq!(exception.native_class(), Some(class.name()));
}

#[test]
fn test_most_specific_mapping_wins() {
    let module = fresh_module();
    let base = register_error_class("BaseErr");
    let leaf = register_subclass("LeafErr", base, Vec::new());
    let unmapped_leaf = register_subclass("OtherLeafErr", base, Vec::new());

    let base_exc = ExceptionClass::subclass("BaseError", &EXCEPTION);
    let leaf_exc = ExceptionClass::subclass("LeafError", base_exc);
    let exceptions = module.exceptions();
    exceptions
        .register_exception_mapping(module.registry(), base.name(), move |m| {
            HostException::new(base_exc, m)
        })
        .unwrap();
    exceptions
        .register_exception_mapping(module.registry(), leaf.name(), move |m| {
            HostException::new(leaf_exc, m)
        })
        .unwrap();

    let from_leaf = rethrow(&module, &new_error(&module, leaf.name(), "leaf"));
    assert!(ptr::eq(from_leaf.class(), leaf_exc));
    assert!(from_leaf.is_instance(base_exc));

    let from_other = rethrow(&module, &new_error(&module, unmapped_leaf.name(), "other"));
    assert!(ptr::eq(from_other.class(), base_exc));

    let from_plain = rethrow(&module, &new_error(&module, "Clownfish::Err", "plain"));
    assert!(ptr::eq(from_plain.class(), &RUNTIME_ERROR));
}

#[test]
fn test_mapping_is_per_module() {
    let mapped = fresh_module();
    let class = register_error_class("ScopedErr");
    let scoped = ExceptionClass::subclass("ScopedError", &EXCEPTION);
    mapped
        .exceptions()
        .register_exception_mapping(mapped.registry(), class.name(), move |m| {
            HostException::new(scoped, m)
        })
        .unwrap();

    let other = fresh_module();
    let exception = rethrow(&other, &new_error(&other, class.name(), "scoped"));
    assert!(ptr::eq(exception.class(), &RUNTIME_ERROR));
}

#[test]
fn test_mapping_rejects_bad_names() {
    let module = fresh_module();
    let exceptions = module.exceptions();

    let err = exceptions
        .register_exception_mapping(module.registry(), &unique_name("Ghost"), |m| {
            HostException::new(&RUNTIME_ERROR, m)
        })
        .unwrap_err();
    assert!(matches!(err, Error::UnknownType { .. }));

    let err = exceptions
        .register_exception_mapping(module.registry(), "Clownfish::Vector", |m| {
            HostException::new(&RUNTIME_ERROR, m)
        })
        .unwrap_err();
    assert!(matches!(err, Error::NotAnErrorClass { .. }));
}

#[test]
fn test_unallocatable_capacity_is_runtime_error() {
    let module = module();
    for class_name in ["Clownfish::Hash", "Clownfish::Vector"] {
        let args = CallArgs::new().kwarg("capacity", i64::MAX);
        let exception = module.construct(class_name, &args).unwrap_err();
        assert!(ptr::eq(exception.class(), &RUNTIME_ERROR));
        assert!(exception.message().starts_with("Cannot allocate"));
        assert!(exception.frames().last().is_some_and(|frame| frame.ends_with(".__init__")));
    }

    // Modest capacities still construct.
    let args = CallArgs::new().kwarg("capacity", 16_i64);
    assert!(module.construct("Clownfish::Hash", &args).is_ok());
}

// ============================================================================
// Host-Side Propagation
// ============================================================================

fn host_helper(module: &BoundModule) -> HostResult<HostValue> {
    module.exceptions().raise_from::<()>(Thrown::msg("from helper"))?;
    Ok(HostValue::None)
}

#[test]
fn test_raise_from_equals_host_raise() {
    let module = module();
    let raised = host_helper(module).unwrap_err();
    let direct = HostException::new(&RUNTIME_ERROR, "from helper");

    assert!(ptr::eq(raised.class(), direct.class()));
    assert_eq!(raised.message(), direct.message());
    assert_eq!(raised.native_class(), Some(core().err.name()));
}

#[test]
fn test_host_defined_exception_is_caught_by_base() {
    let custom = ExceptionClass::subclass("HostOnlyError", &TYPE_ERROR);
    let exception = HostException::new(custom, "raised by host").with_frame("host.fn");

    assert!(exception.is_instance(&EXCEPTION));
    assert!(exception.is_instance(&TYPE_ERROR));
    assert!(!exception.is_instance(&RUNTIME_ERROR));
    assert_eq!(exception.frames(), ["host.fn"]);
    assert_eq!(exception.to_string(), "HostOnlyError: raised by host");
}

#[test]
fn test_registry_is_shared_with_module() {
    assert!(ptr::eq(module().registry(), registry::global()));
}
