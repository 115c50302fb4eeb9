//! `Clownfish::Obj`, the root of every instantiable class.

use crate::error::Result;
use crate::runtime::class::{ClassDescriptor, Method};
use crate::runtime::object::{Arg, NativeResult, Obj, Ret};
use crate::runtime::{registry, string};
use std::ptr;

pub(crate) fn build() -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::Obj", "Clownfish")
        .method(Method::instance("Get_RefCount", "q", &[], get_refcount))
        .method(Method::instance("Inc_RefCount", "@", &[], inc_refcount))
        .method(Method::instance("Dec_RefCount", "q", &[], dec_refcount))
        .method(Method::instance("Get_Class_Name", "T", &[], get_class_name))
        .method(Method::instance("Is_A", "BT", &["class_name"], is_a))
        .method(Method::instance("Equals", "B?@", &["other"], equals))
        .method(Method::instance("To_String", "T", &[], to_string))
        .method(Method::instance("Destroy", "v", &[], destroy).map(Method::private))
        .build()
}

fn get_refcount(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Int(i64::from(obj.refcount())))
}

fn inc_refcount(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Incremented(obj.inc_ref()?))
}

/// Gives up the caller's reference. The receiver must not be used again
/// unless the caller holds another one.
fn dec_refcount(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    // SAFETY: the caller passes in the reference it owns and does not touch
    // `obj` after the call
    let left = unsafe { obj.as_ptr().dec_ref() };
    Ok(Ret::Int(i64::from(left)))
}

fn get_class_name(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Incremented(string::new_string(obj.class().name())))
}

/// Native-side check: unknown class names are simply not matched.
fn is_a(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let name = Arg::at(args, 0)?.text()?;
    let matched = registry::global()
        .fetch_singleton(name)
        .is_ok_and(|class| obj.is_a(class));
    Ok(Ret::Bool(matched))
}

fn equals(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let other = Arg::at(args, 0)?.obj()?;
    Ok(Ret::Bool(other.is_some_and(|other| ptr::eq(obj, other))))
}

fn to_string(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    let text = format!("{}@{:#x}", obj.class().name(), obj.as_ptr().addr());
    Ok(Ret::Incremented(string::new_string(text)))
}

fn destroy(_obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Void)
}
