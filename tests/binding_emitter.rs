// Binding Emitter Integration Tests
//
// These tests bind host-defined native classes next to the core parcel and
// check table layout, inheritance through bound ancestors, vtable dispatch
// and build-time directive errors.

mod common;

use common::{module, no_args, register_subclass};
use finbridge::binding::{BindingRegistry, ClassBinding, MethodDef, core_bindings};
use finbridge::bridge::exception::{ATTRIBUTE_ERROR, RUNTIME_ERROR};
use finbridge::bridge::{BoundModule, CallArgs, EntryKind, HostException, HostObject, HostResult, HostValue};
use finbridge::runtime::class::Method;
use finbridge::runtime::{Arg, ClassDescriptor, NativeResult, Obj, Ret, core, registry};
use finbridge::Error;

fn zero(_obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Int(0))
}

fn doubled(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Int(obj.as_integer().unwrap_or_default() * 2))
}

fn shout(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    let text = obj.as_text().unwrap_or_default().to_uppercase();
    Ok(Ret::Incremented(finbridge::runtime::string::new_string(text)))
}

fn emit_with(binding: ClassBinding) -> BoundModule {
    let mut bindings = core_bindings().unwrap();
    bindings.register(binding).unwrap();
    bindings.emit("test", registry::global()).unwrap()
}

// ============================================================================
// Inheritance and Dispatch
// ============================================================================

#[test]
fn test_bound_subclass_declares_only_its_own_entries() {
    let class = register_subclass(
        "Doubler",
        core().integer,
        vec![
            Method::instance("Get_Value", "q", &[], doubled),
            Method::instance("Get_Zero", "q", &[], zero),
        ],
    );
    let module = emit_with(ClassBinding::new("Test", class.name()));

    let table = module.bound_class(class.name()).unwrap().unwrap();
    assert_eq!(table.entry_names(), ["get_value", "get_zero"]);
    assert!(table.constructor().is_none());

    let obj = module
        .construct(class.name(), &CallArgs::new().arg(21_i64))
        .unwrap();
    assert_eq!(module.call_method(&obj, "get_value", &no_args()).unwrap(), HostValue::Int(42));
    assert_eq!(module.call_method(&obj, "get_zero", &no_args()).unwrap(), HostValue::Int(0));

    // Inherited through the bound ancestors.
    assert_eq!(
        module.call_method(&obj, "get_class_name", &no_args()).unwrap(),
        HostValue::Str(class.name().to_string())
    );
    assert_eq!(
        module
            .call_method(&obj, "is_a", &CallArgs::new().arg("Clownfish::Integer"))
            .unwrap(),
        HostValue::Bool(true)
    );
}

#[test]
fn test_unbound_subclass_override_wins() {
    let class = register_subclass(
        "Quiet",
        core().integer,
        vec![Method::instance("Get_Value", "q", &[], zero)],
    );
    let module = module();
    assert!(module.bound_class(class.name()).unwrap().is_none());

    let obj = module
        .construct(class.name(), &CallArgs::new().arg(5_i64))
        .unwrap();
    assert_eq!(module.call_method(&obj, "get_value", &no_args()).unwrap(), HostValue::Int(0));
    assert!(module.call_method(&obj, "get_zero", &no_args()).is_err());
}

#[test]
fn test_unbound_root_class_is_not_constructible() {
    let class = ClassDescriptor::builder(&common::unique_name("Island"), "Test")
        .build()
        .unwrap();
    registry::global().register(class).unwrap();

    let err = module().construct(class.name(), &no_args()).unwrap_err();
    assert!(err.is_instance(&ATTRIBUTE_ERROR));

    let err = module().construct("Clownfish::Boolean", &no_args()).unwrap_err();
    assert!(err.is_instance(&ATTRIBUTE_ERROR));
}

#[test]
fn test_excluded_override_still_dispatches() {
    let class = register_subclass(
        "Loud",
        core().string,
        vec![Method::instance("To_String", "T", &[], shout)],
    );
    let module = emit_with(ClassBinding::new("Test", class.name()).exclude_method("To_String"));
    let obj = module
        .construct(class.name(), &CallArgs::new().arg("hey"))
        .unwrap();

    // Excluded on the subclass, so the String entry is found and dispatches
    // through the subclass vtable.
    assert_eq!(
        module.call_method(&obj, "to_string", &no_args()).unwrap(),
        HostValue::Str("HEY".into())
    );
    assert_eq!(module.call_method(&obj, "length", &no_args()).unwrap(), HostValue::Int(3));
}

// ============================================================================
// Extensions
// ============================================================================

fn describe(module: &BoundModule, obj: &HostObject, args: &CallArgs) -> HostResult<HostValue> {
    args.bind(&[])?;
    let size = module.call_method(obj, "get_size", &no_args())?;
    Ok(HostValue::Str(format!("{} of {size:?}", obj.class().short_name())))
}

#[test]
fn test_extension_hook_sees_class() {
    let class = register_subclass("Bag", core().hash, Vec::new());
    let binding = ClassBinding::new("Test", class.name()).set_pre_code(
        |class: &'static ClassDescriptor| {
            let entry = format!("describe_{}", class.short_name().to_lowercase());
            vec![MethodDef::new(&entry, describe)]
        },
    );
    let module = emit_with(binding);

    let entry = format!("describe_{}", class.short_name().to_lowercase());
    let table = module.bound_class(class.name()).unwrap().unwrap();
    assert!(matches!(table.entry(&entry), Some(EntryKind::Custom(_))));

    let bag = module.construct(class.name(), &no_args()).unwrap();
    let value = module.call_method(&bag, &entry, &no_args()).unwrap();
    assert_eq!(value, HostValue::Str(format!("{} of Int(0)", class.short_name())));

    let err = module
        .call_method(&bag, &entry, &CallArgs::new().arg(1_i64))
        .unwrap_err();
    assert_eq!(err.frames(), [format!("{}.{entry}", class.short_name())]);
}

#[test]
fn test_custom_entry_errors_carry_nested_frames() {
    fn failing(module: &BoundModule, obj: &HostObject, _: &CallArgs) -> HostResult<HostValue> {
        module.call_method(obj, "insert", &CallArgs::new().arg(10_i64).arg("x"))
    }

    let class = register_subclass("Failing", core().vector, Vec::new());
    let module = emit_with(
        ClassBinding::new("Test", class.name()).add_method_def(MethodDef::new("explode", failing)),
    );
    let obj = module.construct(class.name(), &no_args()).unwrap();

    let err: HostException = module.call_method(&obj, "explode", &no_args()).unwrap_err();
    assert!(err.is_instance(&RUNTIME_ERROR));
    let short = class.short_name();
    assert_eq!(err.frames(), [format!("{short}.insert"), format!("{short}.explode")]);
}

// ============================================================================
// Directive Errors
// ============================================================================

#[test]
fn test_duplicate_binding_is_rejected() {
    let mut bindings = core_bindings().unwrap();
    assert_eq!(
        bindings
            .register(ClassBinding::new("Clownfish", "Clownfish::Hash"))
            .unwrap_err(),
        Error::BindingAlreadyRegistered {
            class: "Clownfish::Hash".into()
        }
    );
}

#[test]
fn test_excluding_inherited_method_is_rejected() {
    let class = register_subclass("Narrow", core().hash, Vec::new());
    let mut bindings = BindingRegistry::new();
    bindings
        .register(ClassBinding::new("Test", class.name()).exclude_method("Store"))
        .unwrap();

    assert_eq!(
        bindings.emit("test", registry::global()).unwrap_err(),
        Error::UnknownMethod {
            class: class.name().to_string(),
            method: "Store".into()
        }
    );
}

#[test]
fn test_emit_twice_gives_same_tables() {
    let bindings = core_bindings().unwrap();
    let first = bindings.emit("clownfish", registry::global()).unwrap();
    let second = bindings.emit("clownfish", registry::global()).unwrap();

    let layout = |module: &BoundModule| {
        module
            .classes()
            .map(|table| (table.class().name().to_string(), table.entry_names().join(",")))
            .collect::<Vec<_>>()
    };
    assert_eq!(layout(&first), layout(&second));
}
