// Common test utilities for integration tests
//
// Shared fixtures: the core module, unique class names and helpers that
// register host-defined native classes into the global registry. Tests never
// freeze the global registry, since every test binary shares it.

#![allow(dead_code)]

use finbridge::binding::clownfish_module;
use finbridge::bridge::{BoundModule, CallArgs, HostObject, HostValue};
use finbridge::runtime::class::Method;
use finbridge::runtime::{ClassDescriptor, core, registry};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

static NAME_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Returns a class name no other test uses, e.g. `Test::MyErr7`.
pub fn unique_name(prefix: &str) -> String {
    let id = NAME_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("Test::{prefix}{id}")
}

/// The core module, emitted once per test binary.
pub fn module() -> &'static BoundModule {
    static MODULE: OnceLock<BoundModule> = OnceLock::new();
    MODULE.get_or_init(|| clownfish_module().expect("core bindings emit"))
}

/// A fresh core module, for tests that register exception mappings.
pub fn fresh_module() -> BoundModule {
    clownfish_module().expect("core bindings emit")
}

/// Registers a subclass of `parent` with the given methods.
pub fn register_subclass(
    prefix: &str,
    parent: &'static ClassDescriptor,
    methods: Vec<finbridge::Result<Method>>,
) -> &'static ClassDescriptor {
    let name = unique_name(prefix);
    let builder = methods
        .into_iter()
        .fold(ClassDescriptor::builder(&name, "Test").parent(parent), |b, m| {
            b.method(m)
        });
    let class = builder.build().expect("test class builds");
    registry::global()
        .register(class)
        .expect("test class registers");
    class
}

/// Registers a host-defined subclass of `Clownfish::Err`.
pub fn register_error_class(prefix: &str) -> &'static ClassDescriptor {
    register_subclass(prefix, core().err, Vec::new())
}

pub fn no_args() -> CallArgs {
    CallArgs::new()
}

pub fn new_integer(module: &BoundModule, value: i64) -> HostObject {
    module
        .construct("Clownfish::Integer", &CallArgs::new().arg(value))
        .expect("integer constructs")
}

pub fn new_hash(module: &BoundModule) -> HostObject {
    module
        .construct("Clownfish::Hash", &CallArgs::new())
        .expect("hash constructs")
}

pub fn call(module: &BoundModule, obj: &HostObject, name: &str, args: CallArgs) -> HostValue {
    module
        .call_method(obj, name, &args)
        .unwrap_or_else(|e| panic!("{name} failed: {e}"))
}
