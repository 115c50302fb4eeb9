//! `Clownfish::String` and the inert `Clownfish::Util::StringHelper`.

use crate::error::Result;
use crate::runtime::bootstrap;
use crate::runtime::class::{ClassDescriptor, Method, flags};
use crate::runtime::object::{Arg, NativeResult, Obj, ObjPtr, Payload, Ret, Thrown};

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Allocates a string object owned by the caller.
#[must_use]
pub fn new_string(text: impl Into<String>) -> ObjPtr {
    ObjPtr::new(bootstrap::core().string, Payload::Str(text.into()))
}

pub(crate) fn build(parent: &'static ClassDescriptor) -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::String", "Clownfish")
        .parent(parent)
        .method(Method::constructor("@T", &["value"], init))
        .method(Method::instance("Length", "q", &[], length))
        .method(Method::instance("Starts_With", "BT", &["prefix"], starts_with))
        .method(Method::instance("Cat", "TT", &["other"], cat))
        .method(Method::instance("Equals", "B?@", &["other"], equals))
        .method(Method::instance("To_String", "T", &[], to_string))
        .method(Method::instance("Get_Ptr8", "^", &[], get_ptr8))
        .build()
}

pub(crate) fn build_helper() -> Result<&'static ClassDescriptor> {
    ClassDescriptor::builder("Clownfish::Util::StringHelper", "Clownfish")
        .flags(flags::INERT)
        .method(Method::inert("is_whitespace", "Bi", &["code_point"], is_whitespace))
        .method(Method::inert("to_base36", "Tz", &["num"], to_base36))
        .build()
}

fn text_of(obj: &Obj) -> NativeResult<&str> {
    Arg::Obj(obj).text()
}

fn init(class: &'static ClassDescriptor, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let value = Arg::at(args, 0)?.text()?;
    Ok(Ret::Incremented(ObjPtr::new(class, Payload::Str(value.to_string()))))
}

fn length(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    let count = text_of(obj)?.chars().count();
    Ok(Ret::Int(i64::try_from(count).unwrap_or(i64::MAX)))
}

fn starts_with(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let prefix = Arg::at(args, 0)?.text()?;
    Ok(Ret::Bool(text_of(obj)?.starts_with(prefix)))
}

fn cat(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let other = Arg::at(args, 0)?.text()?;
    let joined = format!("{}{other}", text_of(obj)?);
    Ok(Ret::Incremented(ObjPtr::new(obj.class(), Payload::Str(joined))))
}

fn equals(obj: &Obj, args: &[Arg<'_>]) -> NativeResult<Ret> {
    let other = Arg::at(args, 0)?.obj()?;
    let same = other
        .and_then(Obj::as_text)
        .is_some_and(|other| Some(other) == obj.as_text());
    Ok(Ret::Bool(same))
}

fn to_string(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Incremented(obj.inc_ref()?))
}

fn get_ptr8(obj: &Obj, _args: &[Arg<'_>]) -> NativeResult<Ret> {
    Ok(Ret::Pointer(text_of(obj)?.as_ptr()))
}

fn is_whitespace(args: &[Arg<'_>]) -> NativeResult<Ret> {
    let code_point = Arg::at(args, 0)?.int()?;
    let matched = u32::try_from(code_point)
        .ok()
        .and_then(char::from_u32)
        .is_some_and(char::is_whitespace);
    Ok(Ret::Bool(matched))
}

fn to_base36(args: &[Arg<'_>]) -> NativeResult<Ret> {
    let mut num = u64::try_from(Arg::at(args, 0)?.int()?)
        .map_err(|_| Thrown::msg("to_base36 requires a non-negative number"))?;

    let mut digits = Vec::new();
    loop {
        digits.push(BASE36_DIGITS[(num % 36) as usize]);
        num /= 36;
        if num == 0 {
            break;
        }
    }
    digits.reverse();

    let text = String::from_utf8_lossy(&digits).into_owned();
    Ok(Ret::Incremented(new_string(text)))
}
