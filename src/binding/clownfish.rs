//! Bindings for the core `Clownfish` parcel.

use crate::binding::class_binding::{BindingRegistry, ClassBinding, MethodDef};
use crate::bridge::exception::HostResult;
use crate::bridge::host::{CallArgs, HostObject};
use crate::bridge::identity;
use crate::bridge::marshal::HostValue;
use crate::bridge::module::BoundModule;
use crate::error::Result;
use crate::runtime::{ClassDescriptor, registry};

const PARCEL: &str = "Clownfish";

/// Core classes bound without directives, in emission order.
const PLAIN: [&str; 8] = [
    "Clownfish::String",
    "Clownfish::Integer",
    "Clownfish::Float",
    "Clownfish::Boolean",
    "Clownfish::Vector",
    "Clownfish::Hash",
    "Clownfish::Err",
    "Clownfish::Util::StringHelper",
];

/// `obj.is_a(class_name)`: strict identity query, unknown names raise.
fn is_a(module: &BoundModule, obj: &HostObject, args: &CallArgs) -> HostResult<HostValue> {
    let name = args.single_str("class_name")?;
    let matched = obj.with_handle(|handle| identity::is_a_in(module.registry(), handle, name))?;
    Ok(HostValue::Bool(matched))
}

/// `obj.dec_refcount()`: releases the host's reference through its handle.
fn dec_refcount(_: &BoundModule, obj: &HostObject, args: &CallArgs) -> HostResult<HostValue> {
    args.bind(&[])?;
    obj.release()?;
    Ok(HostValue::None)
}

/// The bindings of the `clownfish` module.
///
/// `Clownfish::Obj` hides its native `Is_A`, which answers `false` for
/// unknown names, behind a host `is_a` that raises `UnknownTypeError`
/// instead. Its native `Dec_RefCount` is replaced by one that goes through
/// the handle, so it cannot release a reference the host does not own.
///
/// # Errors
///
/// Never fails for the built-in table; the `Result` covers registration.
pub fn core_bindings() -> Result<BindingRegistry> {
    let mut bindings = BindingRegistry::new();
    bindings.register(
        ClassBinding::new(PARCEL, "Clownfish::Obj")
            .exclude_method("Is_A")
            .exclude_method("Dec_RefCount")
            .set_pre_code(|_: &'static ClassDescriptor| vec![MethodDef::new("is_a", is_a)])
            .add_method_def(MethodDef::new("dec_refcount", dec_refcount)),
    )?;
    for class_name in PLAIN {
        bindings.register(ClassBinding::new(PARCEL, class_name))?;
    }
    Ok(bindings)
}

/// Emits the `clownfish` module against the global registry.
///
/// # Errors
///
/// See [`BindingRegistry::emit`].
pub fn clownfish_module() -> Result<BoundModule> {
    core_bindings()?.emit("clownfish", registry::global())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::exception::{ATTRIBUTE_ERROR, TYPE_ERROR, UNKNOWN_TYPE_ERROR};
    use crate::bridge::module::EntryKind;

    #[test]
    fn test_core_module_layout() {
        let module = clownfish_module().unwrap();
        assert_eq!(module.name(), "clownfish");
        assert_eq!(module.classes().count(), 9);

        let obj = module.bound_class("Clownfish::Obj").unwrap().unwrap();
        assert!(matches!(obj.entry("is_a"), Some(EntryKind::Custom(_))));
        assert!(matches!(obj.entry("dec_refcount"), Some(EntryKind::Custom(_))));
        assert!(obj.entry("destroy").is_none());

        let helper = module
            .bound_class("Clownfish::Util::StringHelper")
            .unwrap()
            .unwrap();
        assert!(matches!(helper.entry("is_whitespace"), Some(EntryKind::Function(_))));
    }

    #[test]
    fn test_integer_surface() {
        let module = clownfish_module().unwrap();
        let int = module
            .construct("Clownfish::Integer", &CallArgs::new().arg(42_i64))
            .unwrap();

        let value = module.call_method(&int, "get_value", &CallArgs::new()).unwrap();
        assert_eq!(value, HostValue::Int(42));

        let yes = module
            .call_method(&int, "is_a", &CallArgs::new().arg("Clownfish::Obj"))
            .unwrap();
        assert_eq!(yes, HostValue::Bool(true));

        let err = module
            .call_method(&int, "is_a", &CallArgs::new().arg("Clownfish::Nope"))
            .unwrap_err();
        assert!(err.is_instance(&UNKNOWN_TYPE_ERROR));
        assert_eq!(err.frames(), ["Integer.is_a"]);

        let err = module.call_method(&int, "is_a", &CallArgs::new()).unwrap_err();
        assert!(err.is_instance(&TYPE_ERROR));

        let err = module.call_method(&int, "frobnicate", &CallArgs::new()).unwrap_err();
        assert!(err.is_instance(&ATTRIBUTE_ERROR));
    }

    #[test]
    fn test_dec_refcount_goes_through_the_handle() {
        let module = clownfish_module().unwrap();
        let text = module
            .construct("Clownfish::String", &CallArgs::new().arg("abc"))
            .unwrap();

        module.call_method(&text, "dec_refcount", &CallArgs::new()).unwrap();
        assert!(text.is_released());
        assert!(module.call_method(&text, "length", &CallArgs::new()).is_err());
    }

    #[test]
    fn test_static_function() {
        let module = clownfish_module().unwrap();
        let value = module
            .call_static(
                "Clownfish::Util::StringHelper",
                "to_base36",
                &CallArgs::new().kwarg("num", 46_655_i64),
            )
            .unwrap();
        assert_eq!(value, HostValue::Str("zzz".into()));

        let err = module
            .call_static("Clownfish::Hash", "fetch", &CallArgs::new().arg("k"))
            .unwrap_err();
        assert!(err.is_instance(&ATTRIBUTE_ERROR));
    }
}
