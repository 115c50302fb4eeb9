//! Numeric wrappers: `Clownfish::Integer`, `Clownfish::Float` and the
//! immortal `Clownfish::Boolean` singletons.

use crate::error::Result;
use crate::runtime::class::{ClassDescriptor, Method, flags};
use crate::runtime::object::{Arg, NativeResult, Obj, ObjPtr, Payload, Ret};
use crate::runtime::string;

pub(crate) fn build_integer(
    parent: &'static ClassDescriptor,
) -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::Integer", "Clownfish")
        .parent(parent)
        .method(Method::constructor("@q", &["value"], integer_init))
        .method(Method::instance("Get_Value", "q", &[], integer_get_value))
        .method(Method::instance("Equals", "B?@", &["other"], equals))
        .method(Method::instance("To_String", "T", &[], to_string))
        .build()
}

pub(crate) fn build_float(
    parent: &'static ClassDescriptor,
) -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::Float", "Clownfish")
        .parent(parent)
        .method(Method::constructor("@d", &["value"], float_init))
        .method(Method::instance("Get_Value", "d", &[], float_get_value))
        .method(Method::instance("Equals", "B?@", &["other"], equals))
        .method(Method::instance("To_String", "T", &[], to_string))
        .build()
}

pub(crate) fn build_boolean(
    parent: &'static ClassDescriptor,
) -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::Boolean", "Clownfish")
        .parent(parent)
        .flags(flags::IMMORTAL)
        .method(Method::instance("Get_Value", "B", &[], boolean_get_value))
        .method(Method::instance("To_String", "T", &[], to_string))
        .build()
}

/// Numeric value of a wrapper object, widened to `f64`.
#[allow(clippy::cast_precision_loss)]
fn numeric(obj: &Obj) -> Option<f64> {
    match obj.payload() {
        Payload::Integer(value) => Some(*value as f64),
        Payload::Float(value) => Some(*value),
        _ => None,
    }
}

fn integer_init(class: &'static ClassDescriptor, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let value = Arg::at(args, 0)?.int()?;
    Ok(Ret::Incremented(ObjPtr::new(class, Payload::Integer(value))))
}

fn integer_get_value(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Int(obj.as_integer().unwrap_or_default()))
}

fn float_init(class: &'static ClassDescriptor, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let value = Arg::at(args, 0)?.float()?;
    Ok(Ret::Incremented(ObjPtr::new(class, Payload::Float(value))))
}

fn float_get_value(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Float(obj.as_float().unwrap_or_default()))
}

fn boolean_get_value(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Bool(obj.as_bool().unwrap_or_default()))
}

#[allow(clippy::float_cmp)]
fn equals(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let other = Arg::at(args, 0)?.obj()?;
    let same = match (numeric(obj), other.and_then(numeric)) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => false,
    };
    Ok(Ret::Bool(same))
}

fn to_string(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    let text = match obj.payload() {
        Payload::Integer(value) => value.to_string(),
        Payload::Float(value) => value.to_string(),
        Payload::Boolean(value) => value.to_string(),
        _ => obj.class().name().to_string(),
    };
    Ok(Ret::Incremented(string::new_string(text)))
}
